//! Sanction lifecycle: expiry and vote reconciliation.
//!
//! Expiry and reconciliation are pure functions of a sanction and its
//! inputs; the service wraps them with locking and IO. Closing is the one
//! write, shared by the service and the operator CLI.

use chrono::{DateTime, Utc};
use tracing::info;

use crate::error::{Result, SanctionError};
use crate::traits::store::{merge_vote, SanctionStore};
use crate::types::{latest_per_voter, Sanction, SanctionEvent, SanctionId, SanctionStatus, Vote};

/// Whether voting on `sanction` is over at `now`.
///
/// True once the deadline is reached, or as soon as the status is terminal.
pub fn is_expired(sanction: &Sanction, now: DateTime<Utc>) -> bool {
    sanction.is_expired(now)
}

/// Scanned votes that would change the recorded vote state.
///
/// `scanned` must already hold at most one vote per voter. A scanned vote is
/// a candidate when its voter has no recorded vote, or when it is at least as
/// recent as the recorded one and says something different. Voters missing
/// from `scanned` keep their recorded vote.
pub fn reconcile(recorded: &[Vote], scanned: &[Vote]) -> Vec<Vote> {
    let latest = latest_per_voter(recorded);

    scanned
        .iter()
        .filter(|vote| merge_vote(latest.get(&vote.voter.id).copied(), vote).is_some())
        .cloned()
        .collect()
}

/// Move a sanction whose voting is over to its final status.
///
/// The outcome is the caller's decision. Fails with `VotingOpen` before the
/// deadline and with `InvalidTransition` if the sanction is already closed.
pub async fn close<S>(
    store: &S,
    id: SanctionId,
    status: SanctionStatus,
    now: DateTime<Utc>,
) -> Result<(Sanction, SanctionEvent)>
where
    S: SanctionStore + ?Sized,
{
    let current = store
        .get_sanction(id)
        .await?
        .ok_or(SanctionError::NotFound { id })?;
    if !current.is_expired(now) {
        return Err(SanctionError::VotingOpen {
            id,
            deadline: current.voting_deadline,
        });
    }

    let closed = store.update_status(id, status).await?;
    info!(sanction_id = %id, %status, tally = ?closed.tally(), "Sanction closed");

    let event = SanctionEvent::SanctionClosed {
        sanction_id: id,
        status,
    };
    Ok((closed, event))
}
