//! Sanction records and their status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use std::str::FromStr;

use super::ids::SanctionId;
use super::user::UserRef;
use super::vote::{Tally, Vote};
use crate::error::{Result, SanctionError};

/// Where a sanction is in its lifecycle.
///
/// The only legal moves are `Proposed -> Expired` and `Proposed -> Enacted`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SanctionStatus {
    Proposed,
    Expired,
    Enacted,
}

impl SanctionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SanctionStatus::Proposed => "proposed",
            SanctionStatus::Expired => "expired",
            SanctionStatus::Enacted => "enacted",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, SanctionStatus::Proposed)
    }

    pub fn can_transition_to(&self, next: SanctionStatus) -> bool {
        matches!(
            (self, next),
            (SanctionStatus::Proposed, SanctionStatus::Expired)
                | (SanctionStatus::Proposed, SanctionStatus::Enacted)
        )
    }
}

impl Display for SanctionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SanctionStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "proposed" => Ok(SanctionStatus::Proposed),
            "expired" => Ok(SanctionStatus::Expired),
            "enacted" => Ok(SanctionStatus::Enacted),
            other => Err(format!("unknown sanction status: {}", other)),
        }
    }
}

/// What the sanction would do to its target if enacted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SanctionKind {
    /// Block the account for a period decided by the votes
    Block,

    /// Force a rename away from an insulting user name
    InsultingName { original_name: String },
}

impl SanctionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SanctionKind::Block => "block",
            SanctionKind::InsultingName { .. } => "insulting_name",
        }
    }
}

/// A moderation proposal against one user, decided by vote before a deadline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sanction {
    pub id: SanctionId,
    pub kind: SanctionKind,
    pub target: UserRef,
    pub author: UserRef,
    pub proposed_at: DateTime<Utc>,
    pub voting_deadline: DateTime<Utc>,
    pub status: SanctionStatus,

    /// Recorded votes, at most one per voter
    #[serde(default)]
    pub votes: Vec<Vote>,
}

impl Sanction {
    pub fn new(
        id: SanctionId,
        kind: SanctionKind,
        target: UserRef,
        author: UserRef,
        proposed_at: DateTime<Utc>,
        voting_deadline: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            kind,
            target,
            author,
            proposed_at,
            voting_deadline,
            status: SanctionStatus::Proposed,
            votes: Vec::new(),
        }
    }

    /// Voting is over once the deadline passes or the status left `Proposed`.
    ///
    /// Monotonic in `now`: once true it stays true for every later instant.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.status.is_terminal() || now >= self.voting_deadline
    }

    pub fn tally(&self) -> Tally {
        Tally::from_votes(&self.votes)
    }

    /// Move out of `Proposed`. Any other move is rejected.
    pub fn transition(&mut self, next: SanctionStatus) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(SanctionError::InvalidTransition {
                id: self.id,
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }

    /// Everyone who has voted so far, in recorded order.
    pub fn voters(&self) -> impl Iterator<Item = &UserRef> {
        self.votes.iter().map(|v| &v.voter)
    }
}
