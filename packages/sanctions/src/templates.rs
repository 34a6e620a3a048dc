//! Seed pages created on install.
//!
//! The vote templates have to exist on the wiki for `{{Agree}}` and
//! `{{Disagree}}` to render; the platform creates these pages during its
//! schema update step.

use serde::{Deserialize, Serialize};

use crate::config::SanctionsConfig;

/// A page the platform should create if it does not exist yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplatePage {
    pub title: String,
    pub content: String,
}

pub fn seed_pages(config: &SanctionsConfig) -> Vec<TemplatePage> {
    vec![
        TemplatePage {
            title: format!("Template:{}", config.agree_template),
            content: format!(
                "<span class=\"sanctions-vote sanctions-vote-agree\">'''{}'''\
                 {{{{#if:{{{{{{1|}}}}}}| ({{{{{{1}}}}}} days)}}}}</span>\
                 <noinclude>\nMarks an agree vote on a sanction. \
                 The optional first parameter is a block length in days (at most {}).\n</noinclude>",
                config.agree_template, config.max_block_period_days
            ),
        },
        TemplatePage {
            title: format!("Template:{}", config.disagree_template),
            content: format!(
                "<span class=\"sanctions-vote sanctions-vote-disagree\">'''{}'''</span>\
                 <noinclude>\nMarks a disagree vote on a sanction.\n</noinclude>",
                config.disagree_template
            ),
        },
    ]
}
