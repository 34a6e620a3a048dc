//! Vote markers in topic posts.
//!
//! A vote is cast by transcluding the agree or disagree template in a post,
//! e.g. `{{Agree}}`, `{{Agree|7}}` or `{{Disagree}}`. The optional first
//! parameter of an Agree vote is a block length in days. This module only
//! understands that micro-syntax; it never renders wikitext.

use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;

use crate::config::SanctionsConfig;
use crate::traits::platform::TopicPost;
use crate::types::{latest_per_voter, Vote, VoteChoice};

lazy_static! {
    // {{Name}} or {{Name|param|...}}; nested braces are not transclusions we care about
    static ref TRANSCLUSION_REGEX: Regex = Regex::new(
        r"\{\{\s*([^{}|]+?)\s*(?:\|([^{}]*))?\}\}"
    ).unwrap();
}

/// Namespace prefixes that may precede a template name.
const TEMPLATE_PREFIXES: &[&str] = &["template:", "틀:"];

/// A vote marker found in a single post.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedVote {
    pub choice: VoteChoice,
    pub period: Option<u32>,
}

/// Recognized vote templates.
#[derive(Debug, Clone)]
pub struct VoteTemplates {
    agree: String,
    disagree: String,
    max_period: u32,
}

impl VoteTemplates {
    pub fn new(agree: &str, disagree: &str, max_period: u32) -> Self {
        Self {
            agree: normalize_template_name(agree),
            disagree: normalize_template_name(disagree),
            max_period,
        }
    }

    pub fn from_config(config: &SanctionsConfig) -> Self {
        Self::new(
            &config.agree_template,
            &config.disagree_template,
            config.max_block_period_days,
        )
    }

    /// Find the vote expressed by a post, if exactly one position is expressed.
    ///
    /// Repeating the same template is fine; mixing agree and disagree in one
    /// post is ambiguous and yields `None`, as does a post with no marker.
    pub fn parse_post(&self, content: &str) -> Option<ParsedVote> {
        let mut found: Option<ParsedVote> = None;

        for caps in TRANSCLUSION_REGEX.captures_iter(content) {
            let name = normalize_template_name(&caps[1]);
            let choice = if name == self.agree {
                VoteChoice::Agree
            } else if name == self.disagree {
                VoteChoice::Disagree
            } else {
                continue;
            };

            let period = match choice {
                VoteChoice::Agree => caps.get(2).and_then(|p| self.parse_period(p.as_str())),
                VoteChoice::Disagree => None,
            };

            match found {
                None => found = Some(ParsedVote { choice, period }),
                Some(prev) if prev.choice == choice => {
                    if prev.period.is_none() {
                        found = Some(ParsedVote { choice, period });
                    }
                }
                Some(_) => return None,
            }
        }

        found
    }

    /// First positional parameter as a day count, clamped to the maximum.
    fn parse_period(&self, params: &str) -> Option<u32> {
        let first = params.split('|').next()?.trim();
        let days: u32 = first.parse().ok()?;
        if days == 0 {
            return None;
        }
        Some(days.min(self.max_period))
    }

    /// Turn topic posts into at most one vote per author.
    ///
    /// `eligible` decides whether a post's author may vote at all. Posts made
    /// at or after `deadline` are ignored. Posts with the same timestamp are
    /// ordered by post id, shorter ids first, so base-36 ids sort numerically.
    pub fn scan<F>(&self, posts: &[TopicPost], deadline: DateTime<Utc>, eligible: F) -> Vec<Vote>
    where
        F: Fn(&TopicPost) -> bool,
    {
        let mut sorted: Vec<&TopicPost> = posts.iter().collect();
        sorted.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.post_id.len().cmp(&b.post_id.len()))
                .then_with(|| a.post_id.cmp(&b.post_id))
        });

        let votes: Vec<Vote> = sorted
            .into_iter()
            .filter(|post| post.created_at < deadline)
            .filter(|post| eligible(post))
            .filter_map(|post| {
                let parsed = self.parse_post(&post.content)?;
                Some(Vote {
                    voter: post.author.clone(),
                    choice: parsed.choice,
                    cast_at: post.created_at,
                    period: parsed.period,
                })
            })
            .collect();

        let mut latest: Vec<Vote> = latest_per_voter(&votes).into_values().cloned().collect();
        latest.sort_by_key(|v| v.cast_at);
        latest
    }
}

/// Template names compare trimmed, with underscores as spaces, without a
/// namespace prefix and ignoring the case of the first letter.
pub fn normalize_template_name(name: &str) -> String {
    let mut name = name.trim().replace('_', " ");

    for prefix in TEMPLATE_PREFIXES {
        let has_prefix = name
            .get(..prefix.len())
            .is_some_and(|head| head.to_lowercase() == *prefix);
        if has_prefix {
            name = name[prefix.len()..].trim().to_string();
            break;
        }
    }

    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}
