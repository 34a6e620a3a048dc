//! Configuration for the sanctions workflow.

use anyhow::{Context, Result};
use chrono::Duration;
use dotenvy::dotenv;
use serde::{Deserialize, Serialize};
use std::env;

/// Sanctions configuration.
///
/// Template names, labels and thresholds are plain strings and numbers so
/// they can be sourced from localizable messages on the platform side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SanctionsConfig {
    /// Template whose transclusion marks an Agree vote
    pub agree_template: String,

    /// Template whose transclusion marks a Disagree vote
    pub disagree_template: String,

    /// Label for the insulting-name sanction type
    pub insulting_name_label: String,

    /// Upper bound for block lengths named in Agree votes (days)
    pub max_block_period_days: u32,

    /// How long a proposal stays open for voting (hours)
    pub voting_period_hours: u32,

    /// Display name of the system account exempt from notifications
    /// and email confirmation
    pub bot_name: String,

    /// Board that hosts sanction topics
    pub board_title: String,

    /// Minimum edits before a user may vote
    pub min_edit_count: u64,

    /// Minimum account age before a user may vote (days)
    pub min_account_age_days: u32,

    /// Whether voters need a confirmed email address
    pub require_confirmed_email: bool,
}

impl Default for SanctionsConfig {
    fn default() -> Self {
        Self {
            agree_template: "Agree".to_string(),
            disagree_template: "Disagree".to_string(),
            insulting_name_label: "Insulting name".to_string(),
            max_block_period_days: 30,
            voting_period_hours: 7 * 24,
            bot_name: "Sanction bot".to_string(),
            board_title: "Project:Sanctions".to_string(),
            min_edit_count: 3,
            min_account_age_days: 20,
            require_confirmed_email: true,
        }
    }
}

impl SanctionsConfig {
    /// Create a new config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset.
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        let defaults = Self::default();
        Ok(Self {
            agree_template: env::var("SANCTIONS_AGREE_TEMPLATE")
                .unwrap_or(defaults.agree_template),
            disagree_template: env::var("SANCTIONS_DISAGREE_TEMPLATE")
                .unwrap_or(defaults.disagree_template),
            insulting_name_label: env::var("SANCTIONS_INSULTING_NAME_LABEL")
                .unwrap_or(defaults.insulting_name_label),
            max_block_period_days: parse_var(
                "SANCTIONS_MAX_BLOCK_DAYS",
                defaults.max_block_period_days,
            )?,
            voting_period_hours: parse_var(
                "SANCTIONS_VOTING_PERIOD_HOURS",
                defaults.voting_period_hours,
            )?,
            bot_name: env::var("SANCTIONS_BOT_NAME").unwrap_or(defaults.bot_name),
            board_title: env::var("SANCTIONS_BOARD_TITLE").unwrap_or(defaults.board_title),
            min_edit_count: parse_var("SANCTIONS_MIN_EDIT_COUNT", defaults.min_edit_count)?,
            min_account_age_days: parse_var(
                "SANCTIONS_MIN_ACCOUNT_AGE_DAYS",
                defaults.min_account_age_days,
            )?,
            require_confirmed_email: parse_var(
                "SANCTIONS_REQUIRE_CONFIRMED_EMAIL",
                defaults.require_confirmed_email,
            )?,
        })
    }

    pub fn voting_period(&self) -> Duration {
        Duration::hours(i64::from(self.voting_period_hours))
    }

    pub fn min_account_age(&self) -> Duration {
        Duration::days(i64::from(self.min_account_age_days))
    }

    /// Set the vote templates.
    pub fn with_templates(mut self, agree: impl Into<String>, disagree: impl Into<String>) -> Self {
        self.agree_template = agree.into();
        self.disagree_template = disagree.into();
        self
    }

    /// Set the bot display name.
    pub fn with_bot_name(mut self, name: impl Into<String>) -> Self {
        self.bot_name = name.into();
        self
    }

    /// Set the voting window.
    pub fn with_voting_period_hours(mut self, hours: u32) -> Self {
        self.voting_period_hours = hours;
        self
    }

    /// Set the vote-right thresholds.
    pub fn with_vote_thresholds(mut self, min_edit_count: u64, min_account_age_days: u32) -> Self {
        self.min_edit_count = min_edit_count;
        self.min_account_age_days = min_account_age_days;
        self
    }

    /// Set the maximum block period.
    pub fn with_max_block_period_days(mut self, days: u32) -> Self {
        self.max_block_period_days = days;
        self
    }
}

fn parse_var<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} must be a valid {}", name, std::any::type_name::<T>())),
        Err(_) => Ok(default),
    }
}
