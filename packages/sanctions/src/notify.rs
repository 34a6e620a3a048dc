//! Notification trigger and the bot exemption.
//!
//! Fact events from the service are turned into notifications for the
//! sanction's target and earlier voters. One designated system account (the
//! bot) never causes notifications; the same predicate also exempts it from
//! email confirmation in the hook adapter.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::SanctionsConfig;
use crate::error::Result;
use crate::service::SanctionService;
use crate::types::{
    normalize_user_name, notification::category, Notification, Sanction, SanctionEvent, UserRef,
};

/// The system account exempt from notification and email side effects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotIdentity {
    name: String,
}

impl BotIdentity {
    pub fn new(name: &str) -> Self {
        Self {
            name: normalize_user_name(name),
        }
    }

    pub fn from_config(config: &SanctionsConfig) -> Self {
        Self::new(&config.bot_name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_bot(&self, user: &UserRef) -> bool {
        self.is_bot_name(&user.name)
    }

    pub fn is_bot_name(&self, name: &str) -> bool {
        !self.name.is_empty() && normalize_user_name(name) == self.name
    }
}

/// Reacts to topic views and proposals by scanning votes and notifying.
pub struct NotificationTrigger {
    service: Arc<SanctionService>,
}

impl NotificationTrigger {
    pub fn new(service: Arc<SanctionService>) -> Self {
        Self { service }
    }

    pub fn service(&self) -> &Arc<SanctionService> {
        &self.service
    }

    /// Check for new votes on an open sanction and notify about them.
    ///
    /// Expired sanctions are left alone. Returns the events that were
    /// recorded, whether or not their notifications were delivered.
    pub async fn on_topic_viewed(
        &self,
        sanction: &Sanction,
        now: DateTime<Utc>,
    ) -> Result<Vec<SanctionEvent>> {
        if sanction.is_expired(now) {
            return Ok(Vec::new());
        }

        let events = self.service.check_new_votes(sanction, now).await?;
        for notification in notifications_for_batch(sanction, &events) {
            self.deliver(&notification).await;
        }

        Ok(events)
    }

    /// Tell the target that a sanction against them was opened.
    pub async fn on_sanction_proposed(&self, sanction: &Sanction, event: &SanctionEvent) {
        if let Some(notification) = notification_for(sanction, event) {
            self.deliver(&notification).await;
        }
    }

    /// Hand a notification to the platform unless the bot caused it.
    ///
    /// Delivery failures are the platform's to handle; they are logged and
    /// not retried.
    pub async fn deliver(&self, notification: &Notification) {
        if self.service.bot().is_bot(&notification.actor) {
            debug!(category = %notification.category, "Suppressed notification from bot");
            return;
        }
        if notification.recipients.is_empty() {
            return;
        }

        if let Err(e) = self.service.deps().notifier.notify(notification).await {
            warn!(
                category = %notification.category,
                sanction_id = %notification.sanction_id,
                error = %e,
                "Notification delivery failed"
            );
        }
    }
}

/// Build the notification for an event, if it warrants one.
///
/// Vote events go to the target and every earlier voter except the actor.
pub fn notification_for(sanction: &Sanction, event: &SanctionEvent) -> Option<Notification> {
    build_notification(sanction, sanction.voters(), event)
}

/// Notifications for events recorded together by one scan, in event order.
///
/// A voter whose vote appears in the batch is an earlier voter for every
/// event after it.
pub fn notifications_for_batch<'a>(
    sanction: &'a Sanction,
    events: &'a [SanctionEvent],
) -> Vec<Notification> {
    let mut voters: Vec<&UserRef> = sanction.voters().collect();
    let mut notifications = Vec::new();

    for event in events {
        notifications.extend(build_notification(sanction, voters.iter().copied(), event));

        if let SanctionEvent::VoteRecorded { voter, .. } | SanctionEvent::VoteChanged { voter, .. } =
            event
        {
            if !voters.iter().any(|v| v.id == voter.id) {
                voters.push(voter);
            }
        }
    }

    notifications
}

fn build_notification<'a, I>(
    sanction: &'a Sanction,
    voters: I,
    event: &SanctionEvent,
) -> Option<Notification>
where
    I: IntoIterator<Item = &'a UserRef>,
{
    let (category, actor) = match event {
        SanctionEvent::SanctionProposed { author, .. } => (category::PROPOSED, author),
        SanctionEvent::VoteRecorded { voter, .. } => (category::VOTE_CAST, voter),
        SanctionEvent::VoteChanged { voter, .. } => (category::VOTE_CHANGED, voter),
        SanctionEvent::SanctionClosed { .. } => return None,
    };

    let mut candidates = vec![&sanction.target];
    if !matches!(event, SanctionEvent::SanctionProposed { .. }) {
        candidates.extend(voters);
    }

    let mut recipients: Vec<UserRef> = Vec::new();
    for user in candidates {
        if user.id != actor.id && !recipients.iter().any(|r| r.id == user.id) {
            recipients.push(user.clone());
        }
    }

    Some(Notification {
        category: category.to_string(),
        sanction_id: event.sanction_id(),
        actor: actor.clone(),
        recipients,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{SanctionId, SanctionKind, Vote, VoteChoice};
    use chrono::Duration;

    fn sanction_with_voters(voters: &[UserRef]) -> Sanction {
        let now = Utc::now();
        let mut sanction = Sanction::new(
            SanctionId::new_random(),
            SanctionKind::Block,
            UserRef::new(2, "Target"),
            UserRef::new(1, "Author"),
            now,
            now + Duration::days(7),
        );
        sanction.votes = voters
            .iter()
            .map(|v| Vote::new(v.clone(), VoteChoice::Agree, now))
            .collect();
        sanction
    }

    #[test]
    fn test_bot_identity_matches_normalized_names() {
        let bot = BotIdentity::new("Sanction_bot");
        assert!(bot.is_bot_name("sanction bot"));
        assert!(bot.is_bot(&UserRef::new(9, "Sanction bot")));
        assert!(!bot.is_bot_name("Sanction bots"));
    }

    #[test]
    fn test_empty_bot_name_matches_nobody() {
        let bot = BotIdentity::new("  ");
        assert!(!bot.is_bot_name(""));
    }

    #[test]
    fn test_vote_notification_recipients() {
        let alice = UserRef::new(10, "Alice");
        let bob = UserRef::new(11, "Bob");
        let sanction = sanction_with_voters(&[alice.clone(), bob.clone()]);
        let event = SanctionEvent::VoteRecorded {
            sanction_id: sanction.id,
            voter: bob.clone(),
            choice: VoteChoice::Agree,
        };

        let notification = notification_for(&sanction, &event).unwrap();
        assert_eq!(notification.category, category::VOTE_CAST);
        assert_eq!(notification.actor, bob);
        let ids: Vec<u64> = notification.recipients.iter().map(|u| u.id.0).collect();
        assert_eq!(ids, vec![2, 10]);
    }

    #[test]
    fn test_batch_counts_voters_recorded_earlier_in_the_batch() {
        let alice = UserRef::new(10, "Alice");
        let bob = UserRef::new(11, "Bob");
        let carol = UserRef::new(12, "Carol");
        let sanction = sanction_with_voters(&[carol.clone()]);
        let events = vec![
            SanctionEvent::VoteRecorded {
                sanction_id: sanction.id,
                voter: alice.clone(),
                choice: VoteChoice::Agree,
            },
            SanctionEvent::VoteRecorded {
                sanction_id: sanction.id,
                voter: bob.clone(),
                choice: VoteChoice::Disagree,
            },
        ];

        let notifications = notifications_for_batch(&sanction, &events);
        assert_eq!(notifications.len(), 2);

        let first: Vec<u64> = notifications[0].recipients.iter().map(|u| u.id.0).collect();
        assert_eq!(first, vec![2, 12]);
        let second: Vec<u64> = notifications[1].recipients.iter().map(|u| u.id.0).collect();
        assert_eq!(second, vec![2, 12, 10]);
    }

    #[test]
    fn test_proposal_notifies_only_target() {
        let sanction = sanction_with_voters(&[UserRef::new(10, "Alice")]);
        let event = SanctionEvent::SanctionProposed {
            sanction_id: sanction.id,
            target: sanction.target.clone(),
            author: sanction.author.clone(),
        };

        let notification = notification_for(&sanction, &event).unwrap();
        assert_eq!(notification.category, category::PROPOSED);
        assert_eq!(notification.recipients, vec![sanction.target.clone()]);
    }

    #[test]
    fn test_closed_event_has_no_notification() {
        let sanction = sanction_with_voters(&[]);
        let event = SanctionEvent::SanctionClosed {
            sanction_id: sanction.id,
            status: crate::types::SanctionStatus::Expired,
        };
        assert!(notification_for(&sanction, &event).is_none());
    }
}
