//! Testing utilities including mock implementations.
//!
//! These are useful for testing platform adapters without a real discussion
//! platform, account service or notification pipeline.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use crate::config::SanctionsConfig;
use crate::deps::SanctionDeps;
use crate::error::{Result, SanctionError};
use crate::service::SanctionService;
use crate::stores::MemoryStore;
use crate::traits::platform::{Notifier, TopicPost, TopicSource, UserDirectory};
use crate::types::{AccountStanding, Notification, SanctionId, UserId, UserRef};

/// Topic source backed by a map of posts per topic.
#[derive(Default)]
pub struct MockTopicSource {
    posts: RwLock<HashMap<SanctionId, Vec<TopicPost>>>,
    failing: AtomicBool,
}

impl MockTopicSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a post to a topic.
    pub fn add_post(&self, topic: SanctionId, post: TopicPost) {
        self.posts
            .write()
            .unwrap()
            .entry(topic)
            .or_default()
            .push(post);
    }

    /// Builder form of [`add_post`](Self::add_post).
    pub fn with_post(self, topic: SanctionId, post: TopicPost) -> Self {
        self.add_post(topic, post);
        self
    }

    /// Make every fetch fail until switched back.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl TopicSource for MockTopicSource {
    async fn topic_posts(&self, topic: SanctionId) -> Result<Vec<TopicPost>> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(SanctionError::Topic("mock topic source unavailable".into()));
        }
        Ok(self
            .posts
            .read()
            .unwrap()
            .get(&topic)
            .cloned()
            .unwrap_or_default())
    }
}

/// Account service with explicitly granted standings.
///
/// Users that were never granted are unknown accounts.
#[derive(Default)]
pub struct MockUserDirectory {
    standings: RwLock<HashMap<UserId, AccountStanding>>,
    failing: AtomicBool,
}

impl MockUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a long-standing account in good standing.
    pub fn grant(&self, user: &UserRef) {
        self.set_standing(AccountStanding {
            user: user.clone(),
            edit_count: 1_000,
            registered_at: Utc::now() - Duration::days(365),
            email_confirmed: true,
            blocked: false,
        });
    }

    pub fn set_standing(&self, standing: AccountStanding) {
        self.standings
            .write()
            .unwrap()
            .insert(standing.user.id, standing);
    }

    /// Make every lookup fail until switched back.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl UserDirectory for MockUserDirectory {
    async fn standing(&self, user: &UserRef) -> Result<Option<AccountStanding>> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(SanctionError::Directory("mock directory unavailable".into()));
        }
        Ok(self.standings.read().unwrap().get(&user.id).cloned())
    }
}

/// Notifier that records everything it is given.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: RwLock<Vec<Notification>>,
    failing: AtomicBool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Notifications delivered so far, in order.
    pub fn sent(&self) -> Vec<Notification> {
        self.sent.read().unwrap().clone()
    }

    /// Reject deliveries (they are still not recorded).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, notification: &Notification) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(SanctionError::storage("mock notifier unavailable"));
        }
        self.sent.write().unwrap().push(notification.clone());
        Ok(())
    }
}

/// A service over a memory store and mocks, with default config.
pub fn test_service() -> (
    SanctionService,
    Arc<MockTopicSource>,
    Arc<MockUserDirectory>,
    Arc<RecordingNotifier>,
) {
    test_service_with_config(SanctionsConfig::default())
}

pub fn test_service_with_config(
    config: SanctionsConfig,
) -> (
    SanctionService,
    Arc<MockTopicSource>,
    Arc<MockUserDirectory>,
    Arc<RecordingNotifier>,
) {
    let topics = Arc::new(MockTopicSource::new());
    let users = Arc::new(MockUserDirectory::new());
    let notifier = Arc::new(RecordingNotifier::new());

    let deps = SanctionDeps::new(
        Arc::new(MemoryStore::new()),
        topics.clone(),
        users.clone(),
        notifier.clone(),
        &config,
    );

    (SanctionService::new(deps, config), topics, users, notifier)
}
