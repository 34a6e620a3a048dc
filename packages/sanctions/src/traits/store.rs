//! Persistence for sanctions and their votes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::types::{Sanction, SanctionId, SanctionStatus, Vote, VoteChange};

/// Store for sanction records and the vote log.
///
/// `apply_votes` is the only write path for votes and must be atomic per
/// sanction: two concurrent calls for the same id may not both report the
/// same vote as a change, and neither may drop a vote the other wrote.
#[async_trait]
pub trait SanctionStore: Send + Sync {
    /// Get a sanction (with its votes) by id.
    async fn get_sanction(&self, id: SanctionId) -> Result<Option<Sanction>>;

    /// Store a new sanction.
    ///
    /// Fails with `AlreadyExists` if the id is taken.
    async fn insert_sanction(&self, sanction: &Sanction) -> Result<()>;

    /// Record votes, last-write-wins by `cast_at` per voter.
    ///
    /// A vote is written when the voter has none yet, or when it is at least
    /// as recent as the stored one and differs from it. Returns only the
    /// votes that were actually written.
    async fn apply_votes(&self, id: SanctionId, votes: &[Vote]) -> Result<Vec<VoteChange>>;

    /// Move a sanction out of `Proposed`.
    ///
    /// Fails with `InvalidTransition` for any other move.
    async fn update_status(&self, id: SanctionId, status: SanctionStatus) -> Result<Sanction>;

    /// Sanctions still `Proposed` whose deadline is after `now`.
    async fn list_open(&self, now: DateTime<Utc>) -> Result<Vec<Sanction>>;

    /// Sanctions still `Proposed` whose deadline has passed.
    async fn list_awaiting_closure(&self, now: DateTime<Utc>) -> Result<Vec<Sanction>>;

    /// Create tables or other backing structures. No-op by default.
    async fn migrate(&self) -> Result<()> {
        Ok(())
    }
}

/// Decide whether an incoming vote replaces the stored one.
pub(crate) fn merge_vote(stored: Option<&Vote>, incoming: &Vote) -> Option<VoteChange> {
    match stored {
        None => Some(VoteChange {
            vote: incoming.clone(),
            previous: None,
        }),
        Some(current) if incoming.cast_at >= current.cast_at && incoming.differs_from(current) => {
            Some(VoteChange {
                vote: incoming.clone(),
                previous: Some(current.choice),
            })
        }
        Some(_) => None,
    }
}
