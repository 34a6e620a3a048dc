//! Vote rights.
//!
//! A vote right is a capability computed at check time from account
//! standing. It is never stored.

use chrono::{DateTime, Duration, Utc};

use crate::config::SanctionsConfig;
use crate::types::AccountStanding;

/// Decides whether an account may vote on (and see tooling for) sanctions.
pub trait VoteRightPolicy: Send + Sync {
    fn has_vote_right(&self, standing: &AccountStanding, now: DateTime<Utc>) -> bool;
}

/// Tenure-based policy: enough edits, an old enough account, not blocked,
/// and optionally a confirmed email address.
#[derive(Debug, Clone)]
pub struct TenurePolicy {
    pub min_edit_count: u64,
    pub min_account_age: Duration,
    pub require_confirmed_email: bool,
}

impl TenurePolicy {
    pub fn from_config(config: &SanctionsConfig) -> Self {
        Self {
            min_edit_count: config.min_edit_count,
            min_account_age: config.min_account_age(),
            require_confirmed_email: config.require_confirmed_email,
        }
    }
}

impl VoteRightPolicy for TenurePolicy {
    fn has_vote_right(&self, standing: &AccountStanding, now: DateTime<Utc>) -> bool {
        if standing.blocked {
            return false;
        }
        if self.require_confirmed_email && !standing.email_confirmed {
            return false;
        }
        standing.edit_count >= self.min_edit_count
            && now - standing.registered_at >= self.min_account_age
    }
}

/// Grants everyone a vote right. Handy for tests and closed wikis.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl VoteRightPolicy for AllowAll {
    fn has_vote_right(&self, standing: &AccountStanding, _now: DateTime<Utc>) -> bool {
        !standing.blocked
    }
}
