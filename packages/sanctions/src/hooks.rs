//! Platform hook adapter.
//!
//! The host platform owns the event loop and calls into the extension at
//! named lifecycle points. Each method here is one such point: it takes the
//! event payload, consults the core, and returns what the platform should do
//! (modules to load, links to render, pages to create) instead of doing it.
//!
//! Hook                          | Method
//! ------------------------------|---------------------------
//! topic page view               | [`SanctionHooks::on_topic_viewed`]
//! sanction proposal             | [`SanctionHooks::on_sanction_proposed`]
//! notification insertion        | [`SanctionHooks::on_before_notification`]
//! email confirmation check      | [`SanctionHooks::on_email_confirmed`]
//! contributions/diff/history    | [`SanctionHooks::user_tool_link`]
//! sidebar rendering             | [`SanctionHooks::sidebar_link`]
//! page output (front-end vars)  | [`SanctionHooks::front_end_config`]
//! schema update                 | [`SanctionHooks::on_schema_update`]

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::Result;
use crate::notify::NotificationTrigger;
use crate::resolver::Resolution;
use crate::service::SanctionService;
use crate::templates::{seed_pages, TemplatePage};
use crate::types::{
    Notification, Sanction, SanctionEvent, SanctionId, SanctionKind, Tally, UserRef,
};

/// Front-end module loaded on open sanction topics.
pub const TOPIC_MODULE: &str = "ext.sanctions.topic";

/// What the platform should do for a viewed topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopicView {
    /// Ordinary topic; nothing to do
    NotASanction,

    /// Voting is over; show the final tally
    Closed { sanction_id: SanctionId, tally: Tally },

    /// Voting is open; load `modules` on the page
    Active {
        sanction_id: SanctionId,
        events: Vec<SanctionEvent>,
        modules: Vec<&'static str>,
    },
}

/// A link the platform renders in its navigation or user tools.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolLink {
    pub label: String,
    pub href: String,
}

pub struct SanctionHooks {
    trigger: NotificationTrigger,
}

impl SanctionHooks {
    pub fn new(service: Arc<SanctionService>) -> Self {
        Self {
            trigger: NotificationTrigger::new(service),
        }
    }

    fn service(&self) -> &SanctionService {
        self.trigger.service()
    }

    /// A topic page was viewed.
    pub async fn on_topic_viewed(&self, title: &str, now: DateTime<Utc>) -> Result<TopicView> {
        let sanction = match self.service().resolve(&title.to_lowercase()).await? {
            Resolution::Sanction(sanction) => sanction,
            Resolution::NotASanction => return Ok(TopicView::NotASanction),
        };

        if sanction.is_expired(now) {
            return Ok(TopicView::Closed {
                sanction_id: sanction.id,
                tally: sanction.tally(),
            });
        }

        let events = self.trigger.on_topic_viewed(&sanction, now).await?;
        Ok(TopicView::Active {
            sanction_id: sanction.id,
            events,
            modules: vec![TOPIC_MODULE],
        })
    }

    /// A proposal topic was saved; record it and tell the target.
    pub async fn on_sanction_proposed(
        &self,
        topic: SanctionId,
        kind: SanctionKind,
        target: UserRef,
        author: UserRef,
        now: DateTime<Utc>,
    ) -> Result<Sanction> {
        let (sanction, event) = self
            .service()
            .propose(topic, kind, target, author, now)
            .await?;
        self.trigger.on_sanction_proposed(&sanction, &event).await;
        Ok(sanction)
    }

    /// The platform is about to insert a notification. Returns `false` to
    /// drop it: anything the bot did is never notified.
    pub fn on_before_notification(&self, notification: &Notification) -> bool {
        let allowed = !self.service().bot().is_bot(&notification.actor);
        if !allowed {
            debug!(category = %notification.category, "Dropping notification caused by bot");
        }
        allowed
    }

    /// The platform asks whether `user` has a confirmed email address.
    /// The bot always counts as confirmed.
    pub fn on_email_confirmed(&self, user: &UserRef, confirmed: bool) -> bool {
        confirmed || self.service().bot().is_bot(user)
    }

    /// The "sanction" link shown beside `target` on contribution, diff and
    /// history views. Hidden unless `viewer` may vote and is someone else.
    pub async fn user_tool_link(
        &self,
        viewer: &UserRef,
        target: &UserRef,
        now: DateTime<Utc>,
    ) -> Result<Option<ToolLink>> {
        if viewer.id == target.id || self.service().bot().is_bot(target) {
            return Ok(None);
        }
        if !self.service().has_vote_right(viewer, now).await? {
            return Ok(None);
        }

        Ok(Some(ToolLink {
            label: "sanction".to_string(),
            href: format!(
                "{}?target={}",
                page_path(&self.service().config().board_title),
                page_path(&target.name)
            ),
        }))
    }

    /// Link to the sanctions board for the sidebar.
    pub fn sidebar_link(&self) -> ToolLink {
        let board = &self.service().config().board_title;
        ToolLink {
            label: "Sanctions".to_string(),
            href: page_path(board),
        }
    }

    /// Variables exported to the front-end on every page.
    pub fn front_end_config(&self) -> BTreeMap<String, String> {
        let config = self.service().config();
        BTreeMap::from([
            (
                "sanctionsAgreeTemplate".to_string(),
                config.agree_template.clone(),
            ),
            (
                "sanctionsDisagreeTemplate".to_string(),
                config.disagree_template.clone(),
            ),
            (
                "sanctionsInsultingNameLabel".to_string(),
                config.insulting_name_label.clone(),
            ),
            (
                "sanctionsMaxBlockPeriod".to_string(),
                config.max_block_period_days.to_string(),
            ),
        ])
    }

    /// Install or upgrade: create storage and return the pages to seed.
    pub async fn on_schema_update(&self) -> Result<Vec<TemplatePage>> {
        self.service().deps().store.migrate().await?;
        let pages = seed_pages(self.service().config());
        info!(pages = pages.len(), "Sanctions schema updated");
        Ok(pages)
    }
}

/// Page title as it appears in a path: spaces become underscores.
fn page_path(title: &str) -> String {
    title.trim().replace(' ', "_")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::test_service;
    use crate::traits::platform::TopicPost;
    use crate::types::{notification::category, VoteChoice};
    use chrono::Duration;

    fn hooks() -> (
        SanctionHooks,
        Arc<crate::testing::MockTopicSource>,
        Arc<crate::testing::MockUserDirectory>,
        Arc<crate::testing::RecordingNotifier>,
    ) {
        let (service, topics, users, notifier) = test_service();
        (SanctionHooks::new(Arc::new(service)), topics, users, notifier)
    }

    #[tokio::test]
    async fn test_ordinary_topic_is_ignored() {
        let (hooks, _, _, _) = hooks();
        let view = hooks.on_topic_viewed("Topic:Not a sanction", Utc::now()).await.unwrap();
        assert_eq!(view, TopicView::NotASanction);
    }

    #[tokio::test]
    async fn test_active_topic_records_votes_and_notifies() {
        let (hooks, topics, users, notifier) = hooks();
        let now = Utc::now();
        let target = UserRef::new(2, "Target");
        let voter = UserRef::new(5, "Voter");
        users.grant(&voter);

        let sanction = hooks
            .on_sanction_proposed(
                SanctionId::new_random(),
                SanctionKind::Block,
                target.clone(),
                UserRef::new(1, "Author"),
                now - Duration::hours(2),
            )
            .await
            .unwrap();
        assert_eq!(notifier.sent().len(), 1);
        assert_eq!(notifier.sent()[0].category, category::PROPOSED);

        topics.add_post(sanction.id, TopicPost::new("p1", voter.clone(), "{{Agree|3}}", now));

        let view = hooks
            .on_topic_viewed(&sanction.id.topic_title(), now)
            .await
            .unwrap();
        match view {
            TopicView::Active {
                events, modules, ..
            } => {
                assert_eq!(events.len(), 1);
                assert_eq!(modules, vec![TOPIC_MODULE]);
            }
            other => panic!("expected active view, got {:?}", other),
        }

        let sent = notifier.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[1].category, category::VOTE_CAST);
        assert_eq!(sent[1].actor, voter);
        assert_eq!(sent[1].recipients, vec![target]);
    }

    #[tokio::test]
    async fn test_closed_topic_shows_tally() {
        let (hooks, _, _, _) = hooks();
        let now = Utc::now();
        let sanction = hooks
            .on_sanction_proposed(
                SanctionId::new_random(),
                SanctionKind::Block,
                UserRef::new(2, "Target"),
                UserRef::new(1, "Author"),
                now - Duration::days(30),
            )
            .await
            .unwrap();
        hooks
            .service()
            .deps()
            .store
            .apply_votes(
                sanction.id,
                &[crate::types::Vote::new(
                    UserRef::new(5, "Voter"),
                    VoteChoice::Disagree,
                    now - Duration::days(29),
                )],
            )
            .await
            .unwrap();

        let view = hooks
            .on_topic_viewed(&sanction.id.to_alphadecimal(), now)
            .await
            .unwrap();
        match view {
            TopicView::Closed { tally, .. } => assert_eq!(tally.disagree, 1),
            other => panic!("expected closed view, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_bot_is_exempt() {
        let (hooks, _, _, _) = hooks();
        let bot = UserRef::new(99, hooks.service().bot().name());
        let human = UserRef::new(5, "Human");

        assert!(hooks.on_email_confirmed(&bot, false));
        assert!(!hooks.on_email_confirmed(&human, false));
        assert!(hooks.on_email_confirmed(&human, true));

        let notification = Notification {
            category: category::VOTE_CAST.to_string(),
            sanction_id: SanctionId::new_random(),
            actor: bot,
            recipients: vec![human.clone()],
        };
        assert!(!hooks.on_before_notification(&notification));

        let from_human = Notification {
            actor: human,
            ..notification
        };
        assert!(hooks.on_before_notification(&from_human));
    }

    #[tokio::test]
    async fn test_user_tool_link_requires_vote_right() {
        let (hooks, _, users, _) = hooks();
        let now = Utc::now();
        let viewer = UserRef::new(5, "Viewer");
        let target = UserRef::new(6, "Some target");

        assert_eq!(hooks.user_tool_link(&viewer, &target, now).await.unwrap(), None);

        users.grant(&viewer);
        let link = hooks.user_tool_link(&viewer, &target, now).await.unwrap().unwrap();
        assert_eq!(link.href, "Project:Sanctions?target=Some_target");

        assert_eq!(hooks.user_tool_link(&viewer, &viewer, now).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_front_end_config_and_sidebar() {
        let (hooks, _, _, _) = hooks();
        let vars = hooks.front_end_config();
        assert_eq!(vars["sanctionsAgreeTemplate"], "Agree");
        assert_eq!(vars["sanctionsDisagreeTemplate"], "Disagree");
        assert_eq!(vars["sanctionsMaxBlockPeriod"], "30");
        assert!(vars.contains_key("sanctionsInsultingNameLabel"));

        assert_eq!(hooks.sidebar_link().href, "Project:Sanctions");
    }

    #[tokio::test]
    async fn test_schema_update_returns_seed_pages() {
        let (hooks, _, _, _) = hooks();
        let pages = hooks.on_schema_update().await.unwrap();
        assert_eq!(pages.len(), 2);
    }
}
