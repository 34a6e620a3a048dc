//! In-memory storage implementation for testing and development.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::{Result, SanctionError};
use crate::traits::store::{merge_vote, SanctionStore};
use crate::types::{Sanction, SanctionId, SanctionStatus, Vote, VoteChange};

/// In-memory storage for sanctions and votes.
///
/// Useful for testing and development. Not suitable for production
/// as data is lost on restart.
pub struct MemoryStore {
    sanctions: RwLock<HashMap<SanctionId, Sanction>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Create a new empty memory store.
    pub fn new() -> Self {
        Self {
            sanctions: RwLock::new(HashMap::new()),
        }
    }

    /// Get the number of stored sanctions.
    pub fn sanction_count(&self) -> usize {
        self.read().map(|s| s.len()).unwrap_or(0)
    }

    /// Get the number of stored votes across all sanctions.
    pub fn vote_count(&self) -> usize {
        self.read()
            .map(|s| s.values().map(|sanction| sanction.votes.len()).sum())
            .unwrap_or(0)
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<SanctionId, Sanction>>> {
        self.sanctions
            .read()
            .map_err(|_| SanctionError::storage("memory store lock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<SanctionId, Sanction>>> {
        self.sanctions
            .write()
            .map_err(|_| SanctionError::storage("memory store lock poisoned"))
    }
}

#[async_trait]
impl SanctionStore for MemoryStore {
    async fn get_sanction(&self, id: SanctionId) -> Result<Option<Sanction>> {
        Ok(self.read()?.get(&id).cloned())
    }

    async fn insert_sanction(&self, sanction: &Sanction) -> Result<()> {
        let mut sanctions = self.write()?;
        if sanctions.contains_key(&sanction.id) {
            return Err(SanctionError::AlreadyExists { id: sanction.id });
        }
        sanctions.insert(sanction.id, sanction.clone());
        Ok(())
    }

    async fn apply_votes(&self, id: SanctionId, votes: &[Vote]) -> Result<Vec<VoteChange>> {
        let mut sanctions = self.write()?;
        let sanction = sanctions
            .get_mut(&id)
            .ok_or(SanctionError::NotFound { id })?;

        let mut changes = Vec::new();
        for incoming in votes {
            let position = sanction
                .votes
                .iter()
                .position(|v| v.voter.id == incoming.voter.id);
            let stored = position.map(|i| &sanction.votes[i]);

            if let Some(change) = merge_vote(stored, incoming) {
                if let Some(i) = position {
                    sanction.votes.remove(i);
                }
                sanction.votes.push(change.vote.clone());
                changes.push(change);
            }
        }

        Ok(changes)
    }

    async fn update_status(&self, id: SanctionId, status: SanctionStatus) -> Result<Sanction> {
        let mut sanctions = self.write()?;
        let sanction = sanctions
            .get_mut(&id)
            .ok_or(SanctionError::NotFound { id })?;

        sanction.transition(status)?;
        Ok(sanction.clone())
    }

    async fn list_open(&self, now: DateTime<Utc>) -> Result<Vec<Sanction>> {
        let mut open: Vec<_> = self
            .read()?
            .values()
            .filter(|s| !s.is_expired(now))
            .cloned()
            .collect();
        open.sort_by_key(|s| s.voting_deadline);
        Ok(open)
    }

    async fn list_awaiting_closure(&self, now: DateTime<Utc>) -> Result<Vec<Sanction>> {
        let mut due: Vec<_> = self
            .read()?
            .values()
            .filter(|s| s.status == SanctionStatus::Proposed && s.is_expired(now))
            .cloned()
            .collect();
        due.sort_by_key(|s| s.voting_deadline);
        Ok(due)
    }
}
