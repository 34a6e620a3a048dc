//! User references and account standing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

/// Numeric account id assigned by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub u64);

impl Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

/// A user as seen by the sanctions core: stable id plus display name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserRef {
    pub id: UserId,
    pub name: String,
}

impl UserRef {
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id: UserId(id),
            name: normalize_user_name(&name.into()),
        }
    }
}

impl Display for UserRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (#{})", self.name, self.id)
    }
}

/// Canonical form of a user name: trimmed, underscores as spaces, first
/// letter upper-cased. Two names that differ only in these respects refer to
/// the same account.
pub fn normalize_user_name(name: &str) -> String {
    let collapsed = name.trim().replace('_', " ");
    let mut chars = collapsed.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Account-level facts used to decide vote rights.
///
/// Computed per check by the account service; never persisted here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountStanding {
    pub user: UserRef,
    pub edit_count: u64,
    pub registered_at: DateTime<Utc>,
    pub email_confirmed: bool,
    pub blocked: bool,
}
