use serde::{Deserialize, Serialize};

use super::ids::SanctionId;
use super::user::UserRef;

/// Notification categories registered with the notification platform.
pub mod category {
    pub const VOTE_CAST: &str = "sanctions-vote-cast";
    pub const VOTE_CHANGED: &str = "sanctions-vote-changed";
    pub const PROPOSED: &str = "sanctions-proposed";
}

/// A structured notification handed to the notification platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub category: String,
    pub sanction_id: SanctionId,

    /// User whose action caused the notification
    pub actor: UserRef,

    /// Users who should receive it
    pub recipients: Vec<UserRef>,
}
