//! Topic title → sanction lookup.

use tracing::debug;

use crate::error::Result;
use crate::traits::store::SanctionStore;
use crate::types::{Sanction, SanctionId};

/// Outcome of resolving a topic title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Sanction(Sanction),

    /// The title is not an id, or no sanction lives in that topic.
    /// Expected for most topics; not an error.
    NotASanction,
}

impl Resolution {
    pub fn into_sanction(self) -> Option<Sanction> {
        match self {
            Resolution::Sanction(sanction) => Some(sanction),
            Resolution::NotASanction => None,
        }
    }

    pub fn is_sanction(&self) -> bool {
        matches!(self, Resolution::Sanction(_))
    }
}

/// Resolve a (lower-cased) topic title to its sanction.
///
/// Only a failing store produces `Err`; malformed titles and unknown ids are
/// `NotASanction`.
pub async fn resolve<S>(store: &S, title: &str) -> Result<Resolution>
where
    S: SanctionStore + ?Sized,
{
    let Some(id) = SanctionId::parse(title) else {
        debug!(title, "Title is not a topic id");
        return Ok(Resolution::NotASanction);
    };

    match store.get_sanction(id).await? {
        Some(sanction) => Ok(Resolution::Sanction(sanction)),
        None => {
            debug!(sanction_id = %id, "No sanction for topic");
            Ok(Resolution::NotASanction)
        }
    }
}
