//! Community sanctions decided by vote inside discussion topics.
//!
//! A sanction is a moderation proposal against one user. It lives in its own
//! discussion topic, shares that topic's id, and stays open for a fixed
//! voting window. Participants vote by transcluding an agree or disagree
//! template in their posts; every view of an open topic re-scans the posts
//! and records new or changed votes.
//!
//! # Usage
//!
//! ```rust,ignore
//! use sanctions::{SanctionDeps, SanctionHooks, SanctionService, SanctionsConfig};
//!
//! let config = SanctionsConfig::from_env()?;
//! let deps = SanctionDeps::new(store, topics, users, notifier, &config);
//! let hooks = SanctionHooks::new(Arc::new(SanctionService::new(deps, config)));
//!
//! // Platform calls this on every topic page view
//! let view = hooks.on_topic_viewed("topic:s1w2x3y4z5", Utc::now()).await?;
//! ```
//!
//! # Modules
//!
//! - [`types`] - Sanctions, votes, users, events
//! - [`resolver`] - Topic title → sanction lookup
//! - [`scanner`] - Vote markers in topic posts
//! - [`lifecycle`] - Expiry and vote reconciliation
//! - [`rights`] - Vote-right policies
//! - [`service`] - The sanction service
//! - [`notify`] - Notification trigger and bot exemption
//! - [`hooks`] - Adapter for platform lifecycle hooks
//! - [`stores`] - Storage implementations (MemoryStore, PostgresStore)
//! - [`testing`] - Mock implementations for testing

pub mod config;
pub mod deps;
pub mod error;
pub mod hooks;
pub mod lifecycle;
pub mod notify;
pub mod resolver;
pub mod rights;
pub mod scanner;
pub mod service;
pub mod stores;
pub mod templates;
pub mod testing;
pub mod traits;
pub mod types;

pub use config::SanctionsConfig;
pub use deps::SanctionDeps;
pub use error::{Result, SanctionError};
pub use hooks::{SanctionHooks, ToolLink, TopicView};
pub use lifecycle::{is_expired, reconcile};
pub use notify::{BotIdentity, NotificationTrigger};
pub use resolver::{resolve, Resolution};
pub use rights::{AllowAll, TenurePolicy, VoteRightPolicy};
pub use scanner::{ParsedVote, VoteTemplates};
pub use service::SanctionService;
pub use templates::{seed_pages, TemplatePage};
pub use traits::{
    platform::{Notifier, TopicPost, TopicSource, UserDirectory},
    store::SanctionStore,
};
pub use types::{
    AccountStanding, Notification, Sanction, SanctionEvent, SanctionId, SanctionKind,
    SanctionStatus, Tally, UserId, UserRef, Vote, VoteChange, VoteChoice,
};

pub use stores::MemoryStore;

#[cfg(feature = "postgres")]
pub use stores::PostgresStore;
