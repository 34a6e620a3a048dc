//! Dependency container for the sanctions service (traits for testability).

use std::sync::Arc;

use crate::config::SanctionsConfig;
use crate::rights::{TenurePolicy, VoteRightPolicy};
use crate::traits::platform::{Notifier, TopicSource, UserDirectory};
use crate::traits::store::SanctionStore;

/// Platform services the sanctions core depends on.
#[derive(Clone)]
pub struct SanctionDeps {
    pub store: Arc<dyn SanctionStore>,
    pub topics: Arc<dyn TopicSource>,
    pub users: Arc<dyn UserDirectory>,
    pub notifier: Arc<dyn Notifier>,
    pub vote_rights: Arc<dyn VoteRightPolicy>,
}

impl SanctionDeps {
    /// Wire platform services with the tenure policy from `config`.
    pub fn new(
        store: Arc<dyn SanctionStore>,
        topics: Arc<dyn TopicSource>,
        users: Arc<dyn UserDirectory>,
        notifier: Arc<dyn Notifier>,
        config: &SanctionsConfig,
    ) -> Self {
        Self {
            store,
            topics,
            users,
            notifier,
            vote_rights: Arc::new(TenurePolicy::from_config(config)),
        }
    }

    /// Replace the vote-right policy.
    pub fn with_vote_rights(mut self, policy: Arc<dyn VoteRightPolicy>) -> Self {
        self.vote_rights = policy;
        self
    }
}
