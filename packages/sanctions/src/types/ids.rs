//! Sanction identifiers.
//!
//! A sanction shares its identity with the discussion topic it was proposed
//! in. Topic titles carry the topic's 128-bit id either as UUID text or in the
//! discussion platform's compact base-36 ("alphadecimal") form, so parsing
//! accepts both. Parsing is total: anything that is not an id yields `None`.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use std::str::FromStr;
use uuid::Uuid;

use crate::error::SanctionError;

/// Namespace prefix the platform puts in front of topic titles.
const TOPIC_PREFIX: &str = "topic:";

/// 36^25 exceeds u128::MAX, so no valid id is longer than this.
const MAX_ALPHADECIMAL_LEN: usize = 25;

/// Identifier of a sanction (and of the topic it lives in).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SanctionId(Uuid);

impl SanctionId {
    /// Creates a `SanctionId` from a raw `Uuid`.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the inner `Uuid`.
    pub fn into_uuid(self) -> Uuid {
        self.0
    }

    /// Fresh random id, for topics created outside the platform (tests, CLI).
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a topic title into an id.
    ///
    /// The caller is expected to lower-case the title first; this function
    /// lower-cases ASCII again so mixed-case input maps to the same id.
    pub fn parse(title: &str) -> Option<Self> {
        let text = title.trim().to_ascii_lowercase();
        let text = text.strip_prefix(TOPIC_PREFIX).unwrap_or(&text).trim();

        if text.is_empty() {
            return None;
        }

        if let Ok(uuid) = Uuid::try_parse(text) {
            return Some(Self(uuid));
        }

        parse_alphadecimal(text).map(|value| Self(Uuid::from_u128(value)))
    }

    /// Compact base-36 form used in topic titles.
    pub fn to_alphadecimal(&self) -> String {
        let mut value = self.0.as_u128();
        if value == 0 {
            return "0".to_string();
        }

        let mut digits = Vec::with_capacity(MAX_ALPHADECIMAL_LEN);
        while value > 0 {
            let digit = (value % 36) as u32;
            digits.push(std::char::from_digit(digit, 36).unwrap_or('0'));
            value /= 36;
        }
        digits.iter().rev().collect()
    }

    /// Topic title for this id, as the platform addresses it.
    pub fn topic_title(&self) -> String {
        format!("Topic:{}", self.to_alphadecimal())
    }
}

fn parse_alphadecimal(text: &str) -> Option<u128> {
    if text.len() > MAX_ALPHADECIMAL_LEN {
        return None;
    }

    text.chars().try_fold(0u128, |acc, c| {
        let digit = c.to_digit(36)?;
        acc.checked_mul(36)?.checked_add(u128::from(digit))
    })
}

impl Display for SanctionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl FromStr for SanctionId {
    type Err = SanctionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| SanctionError::InvalidTitle {
            title: s.to_string(),
        })
    }
}

impl From<Uuid> for SanctionId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}
