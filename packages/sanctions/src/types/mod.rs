//! Domain types for sanctions, votes and users.

pub mod events;
pub mod ids;
pub mod notification;
pub mod sanction;
pub mod user;
pub mod vote;

pub use events::SanctionEvent;
pub use ids::SanctionId;
pub use notification::Notification;
pub use sanction::{Sanction, SanctionKind, SanctionStatus};
pub use user::{normalize_user_name, AccountStanding, UserId, UserRef};
pub use vote::{latest_per_voter, Tally, Vote, VoteChange, VoteChoice};
