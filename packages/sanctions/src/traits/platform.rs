//! Contracts for the host platform's discussion, account and notification
//! services. The sanctions core only ever talks to these traits.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::{AccountStanding, Notification, SanctionId, UserRef};

/// One post in a discussion topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicPost {
    pub post_id: String,
    pub author: UserRef,

    /// Raw wikitext of the post's latest revision
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl TopicPost {
    pub fn new(
        post_id: impl Into<String>,
        author: UserRef,
        content: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            post_id: post_id.into(),
            author,
            content: content.into(),
            created_at,
        }
    }
}

/// Discussion platform: supplies the posts of a topic.
#[async_trait]
pub trait TopicSource: Send + Sync {
    /// All posts in the topic, in any order. Empty if the topic is gone.
    async fn topic_posts(&self, topic: SanctionId) -> Result<Vec<TopicPost>>;
}

/// Account service: supplies the standing used for vote rights.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Standing of a user, or `None` for unknown accounts.
    async fn standing(&self, user: &UserRef) -> Result<Option<AccountStanding>>;
}

/// Notification platform: accepts structured notifications.
///
/// Delivery failures belong to the platform; callers log and move on.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: &Notification) -> Result<()>;
}
