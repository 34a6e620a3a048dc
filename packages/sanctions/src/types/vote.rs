//! Votes and tallies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{self, Display};
use std::str::FromStr;

use super::user::{UserId, UserRef};

/// Position taken by a voter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteChoice {
    Agree,
    Disagree,
}

impl VoteChoice {
    pub fn as_str(&self) -> &'static str {
        match self {
            VoteChoice::Agree => "agree",
            VoteChoice::Disagree => "disagree",
        }
    }
}

impl Display for VoteChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VoteChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "agree" => Ok(VoteChoice::Agree),
            "disagree" => Ok(VoteChoice::Disagree),
            other => Err(format!("unknown vote choice: {}", other)),
        }
    }
}

/// One voter's position on a sanction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub voter: UserRef,
    pub choice: VoteChoice,
    pub cast_at: DateTime<Utc>,

    /// Block length in days proposed alongside an Agree vote
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period: Option<u32>,
}

impl Vote {
    pub fn new(voter: UserRef, choice: VoteChoice, cast_at: DateTime<Utc>) -> Self {
        Self {
            voter,
            choice,
            cast_at,
            period: None,
        }
    }

    pub fn with_period(mut self, days: u32) -> Self {
        self.period = Some(days);
        self
    }

    /// True when `self` carries a different position than `other`.
    pub fn differs_from(&self, other: &Vote) -> bool {
        self.choice != other.choice || self.period != other.period
    }
}

/// A vote that the store actually recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteChange {
    pub vote: Vote,

    /// Choice this vote replaced; `None` for a voter's first vote
    pub previous: Option<VoteChoice>,
}

/// Collapse votes to the latest one per voter.
///
/// Latest means greatest `cast_at`; on equal timestamps the vote appearing
/// later in the sequence wins.
pub fn latest_per_voter<'a, I>(votes: I) -> BTreeMap<UserId, &'a Vote>
where
    I: IntoIterator<Item = &'a Vote>,
{
    let mut latest: BTreeMap<UserId, &Vote> = BTreeMap::new();
    for vote in votes {
        match latest.get(&vote.voter.id) {
            Some(current) if current.cast_at > vote.cast_at => {}
            _ => {
                latest.insert(vote.voter.id, vote);
            }
        }
    }
    latest
}

/// Vote counts for a sanction, one vote per distinct voter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tally {
    pub agree: usize,
    pub disagree: usize,

    /// Median block length among Agree votes that named one; the lower of
    /// the two middle values when their count is even
    pub median_period: Option<u32>,
}

impl Tally {
    pub fn from_votes(votes: &[Vote]) -> Self {
        let latest = latest_per_voter(votes);

        let mut tally = Tally::default();
        let mut periods = Vec::new();
        for vote in latest.values() {
            match vote.choice {
                VoteChoice::Agree => {
                    tally.agree += 1;
                    periods.extend(vote.period);
                }
                VoteChoice::Disagree => tally.disagree += 1,
            }
        }

        periods.sort_unstable();
        tally.median_period = periods
            .len()
            .checked_sub(1)
            .and_then(|last| periods.get(last / 2))
            .copied();
        tally
    }

    pub fn total(&self) -> usize {
        self.agree + self.disagree
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(minutes: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap() + Duration::minutes(minutes)
    }

    #[test]
    fn test_same_voter_latest_vote_counts() {
        let alice = UserRef::new(1, "Alice");
        let votes = vec![
            Vote::new(alice.clone(), VoteChoice::Agree, at(0)),
            Vote::new(alice, VoteChoice::Disagree, at(5)),
        ];

        let tally = Tally::from_votes(&votes);
        assert_eq!(tally.agree, 0);
        assert_eq!(tally.disagree, 1);
    }

    #[test]
    fn test_latest_by_timestamp_not_position() {
        let alice = UserRef::new(1, "Alice");
        let votes = vec![
            Vote::new(alice.clone(), VoteChoice::Disagree, at(5)),
            Vote::new(alice, VoteChoice::Agree, at(0)),
        ];

        let tally = Tally::from_votes(&votes);
        assert_eq!((tally.agree, tally.disagree), (0, 1));
    }

    #[test]
    fn test_equal_timestamps_resolve_to_later_position() {
        let alice = UserRef::new(1, "Alice");
        let votes = vec![
            Vote::new(alice.clone(), VoteChoice::Disagree, at(0)),
            Vote::new(alice, VoteChoice::Agree, at(0)),
        ];

        assert_eq!(Tally::from_votes(&votes).agree, 1);
    }

    #[test]
    fn test_median_period() {
        let votes = vec![
            Vote::new(UserRef::new(1, "A"), VoteChoice::Agree, at(0)).with_period(1),
            Vote::new(UserRef::new(2, "B"), VoteChoice::Agree, at(1)).with_period(7),
            Vote::new(UserRef::new(3, "C"), VoteChoice::Agree, at(2)).with_period(3),
            Vote::new(UserRef::new(4, "D"), VoteChoice::Disagree, at(3)),
        ];

        let tally = Tally::from_votes(&votes);
        assert_eq!(tally.agree, 3);
        assert_eq!(tally.median_period, Some(3));
        assert_eq!(tally.total(), 4);
    }

    #[test]
    fn test_median_period_even_count_takes_lower_middle() {
        let votes = vec![
            Vote::new(UserRef::new(1, "A"), VoteChoice::Agree, at(0)).with_period(14),
            Vote::new(UserRef::new(2, "B"), VoteChoice::Agree, at(1)).with_period(3),
            Vote::new(UserRef::new(3, "C"), VoteChoice::Agree, at(2)).with_period(7),
            Vote::new(UserRef::new(4, "D"), VoteChoice::Agree, at(3)).with_period(30),
        ];

        assert_eq!(Tally::from_votes(&votes).median_period, Some(7));
    }

    #[test]
    fn test_empty_tally() {
        assert_eq!(Tally::from_votes(&[]), Tally::default());
    }

    #[test]
    fn test_vote_choice_parse() {
        assert_eq!("agree".parse::<VoteChoice>(), Ok(VoteChoice::Agree));
        assert!("maybe".parse::<VoteChoice>().is_err());
    }
}
