//! Typed errors for the sanctions library.
//!
//! "Not a sanction topic", malformed vote markers and missing vote rights are
//! ordinary outcomes and never show up here. These variants cover genuine
//! failures: a backend that could not be reached, or a caller asking for a
//! transition the lifecycle forbids.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::types::{SanctionId, SanctionStatus};

/// Errors that can occur during sanction operations.
#[derive(Debug, Error)]
pub enum SanctionError {
    /// Storage operation failed
    #[error("storage error: {0}")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Discussion platform could not supply topic content
    #[error("topic source error: {0}")]
    Topic(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Account service could not supply user standing
    #[error("user directory error: {0}")]
    Directory(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Sanction record does not exist
    #[error("sanction not found: {id}")]
    NotFound { id: SanctionId },

    /// A sanction with this id already exists
    #[error("sanction already exists: {id}")]
    AlreadyExists { id: SanctionId },

    /// Status may only move forward out of `Proposed`
    #[error("invalid status transition for {id}: {from} -> {to}")]
    InvalidTransition {
        id: SanctionId,
        from: SanctionStatus,
        to: SanctionStatus,
    },

    /// Closing was requested before the voting deadline
    #[error("voting on {id} is open until {deadline}")]
    VotingOpen {
        id: SanctionId,
        deadline: DateTime<Utc>,
    },

    /// Topic title could not be turned into a sanction id
    #[error("invalid topic title: {title}")]
    InvalidTitle { title: String },
}

impl SanctionError {
    /// Wrap any backend error as a storage failure.
    pub fn storage(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Storage(err.into())
    }
}

#[cfg(feature = "postgres")]
impl From<sqlx::Error> for SanctionError {
    fn from(err: sqlx::Error) -> Self {
        Self::Storage(Box::new(err))
    }
}

/// Result type alias for sanction operations.
pub type Result<T> = std::result::Result<T, SanctionError>;
