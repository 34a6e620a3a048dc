use serde::{Deserialize, Serialize};

use super::ids::SanctionId;
use super::sanction::SanctionStatus;
use super::user::UserRef;
use super::vote::{VoteChange, VoteChoice};

/// Sanction events - FACT EVENTS ONLY
///
/// Immutable facts about what happened to a sanction. The notification
/// trigger watches these; nothing here is a request to do something.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SanctionEvent {
    /// A proposal topic was opened and the sanction stored
    SanctionProposed {
        sanction_id: SanctionId,
        target: UserRef,
        author: UserRef,
    },

    /// A voter's first vote was recorded
    VoteRecorded {
        sanction_id: SanctionId,
        voter: UserRef,
        choice: VoteChoice,
    },

    /// A voter replaced an earlier vote with a different one
    VoteChanged {
        sanction_id: SanctionId,
        voter: UserRef,
        previous: VoteChoice,
        choice: VoteChoice,
    },

    /// Status left `Proposed`
    SanctionClosed {
        sanction_id: SanctionId,
        status: SanctionStatus,
    },
}

impl SanctionEvent {
    pub fn from_change(sanction_id: SanctionId, change: VoteChange) -> Self {
        match change.previous {
            None => SanctionEvent::VoteRecorded {
                sanction_id,
                voter: change.vote.voter,
                choice: change.vote.choice,
            },
            Some(previous) => SanctionEvent::VoteChanged {
                sanction_id,
                voter: change.vote.voter,
                previous,
                choice: change.vote.choice,
            },
        }
    }

    pub fn sanction_id(&self) -> SanctionId {
        match self {
            SanctionEvent::SanctionProposed { sanction_id, .. }
            | SanctionEvent::VoteRecorded { sanction_id, .. }
            | SanctionEvent::VoteChanged { sanction_id, .. }
            | SanctionEvent::SanctionClosed { sanction_id, .. } => *sanction_id,
        }
    }
}
