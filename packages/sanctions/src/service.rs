//! Sanction service: resolution, proposals, vote reconciliation and tallies.
//!
//! Vote reconciliation is a read-scan-reconcile-write sequence that runs on
//! page views, so several viewers can trigger it for the same sanction at
//! once. Each sanction id gets its own async lock for the duration of the
//! sequence; the store's `apply_votes` is atomic on top of that, which keeps
//! separate processes sharing one database consistent too.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use futures::future::join_all;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::config::SanctionsConfig;
use crate::deps::SanctionDeps;
use crate::error::{Result, SanctionError};
use crate::lifecycle::{self, reconcile};
use crate::notify::BotIdentity;
use crate::resolver::{self, Resolution};
use crate::scanner::VoteTemplates;
use crate::types::{
    Sanction, SanctionEvent, SanctionId, SanctionKind, SanctionStatus, Tally, UserId, UserRef,
};

pub struct SanctionService {
    deps: SanctionDeps,
    config: SanctionsConfig,
    templates: VoteTemplates,
    bot: BotIdentity,
    locks: DashMap<SanctionId, Arc<Mutex<()>>>,
}

impl SanctionService {
    pub fn new(deps: SanctionDeps, config: SanctionsConfig) -> Self {
        Self {
            templates: VoteTemplates::from_config(&config),
            bot: BotIdentity::from_config(&config),
            deps,
            config,
            locks: DashMap::new(),
        }
    }

    pub fn config(&self) -> &SanctionsConfig {
        &self.config
    }

    pub fn deps(&self) -> &SanctionDeps {
        &self.deps
    }

    pub fn bot(&self) -> &BotIdentity {
        &self.bot
    }

    /// Resolve a (lower-cased) topic title to its sanction.
    pub async fn resolve(&self, title: &str) -> Result<Resolution> {
        resolver::resolve(self.deps.store.as_ref(), title).await
    }

    /// Record a new proposal opened in `topic`.
    #[instrument(skip(self, kind, target, author), fields(target = %target, author = %author))]
    pub async fn propose(
        &self,
        topic: SanctionId,
        kind: SanctionKind,
        target: UserRef,
        author: UserRef,
        now: DateTime<Utc>,
    ) -> Result<(Sanction, SanctionEvent)> {
        let sanction = Sanction::new(
            topic,
            kind,
            target,
            author,
            now,
            now + self.config.voting_period(),
        );
        self.deps.store.insert_sanction(&sanction).await?;

        info!(
            sanction_id = %sanction.id,
            deadline = %sanction.voting_deadline,
            "Sanction proposed"
        );

        let event = SanctionEvent::SanctionProposed {
            sanction_id: sanction.id,
            target: sanction.target.clone(),
            author: sanction.author.clone(),
        };
        Ok((sanction, event))
    }

    pub fn is_expired(&self, sanction: &Sanction, now: DateTime<Utc>) -> bool {
        sanction.is_expired(now)
    }

    pub fn tally(&self, sanction: &Sanction) -> Tally {
        sanction.tally()
    }

    /// Whether `user` may vote on sanctions at `now`.
    ///
    /// Unknown accounts have no vote right.
    pub async fn has_vote_right(&self, user: &UserRef, now: DateTime<Utc>) -> Result<bool> {
        let standing = self.deps.users.standing(user).await?;
        Ok(standing.is_some_and(|s| self.deps.vote_rights.has_vote_right(&s, now)))
    }

    /// Re-scan the sanction's topic and record new or changed votes.
    ///
    /// Returns one event per vote actually written. Posts without a valid
    /// marker, by ineligible authors, or after the deadline are skipped
    /// silently. Does nothing once the sanction is expired.
    #[instrument(skip(self, sanction), fields(sanction_id = %sanction.id))]
    pub async fn check_new_votes(
        &self,
        sanction: &Sanction,
        now: DateTime<Utc>,
    ) -> Result<Vec<SanctionEvent>> {
        let id = sanction.id;
        let entry = LockEntry::acquire(&self.locks, id);
        let _guard = entry.mutex().lock().await;
        self.check_new_votes_locked(id, now).await
    }

    async fn check_new_votes_locked(
        &self,
        id: SanctionId,
        now: DateTime<Utc>,
    ) -> Result<Vec<SanctionEvent>> {
        // Re-read under the lock; the caller's copy may be stale
        let current = self
            .deps
            .store
            .get_sanction(id)
            .await?
            .ok_or(SanctionError::NotFound { id })?;
        if current.is_expired(now) {
            debug!("Sanction expired, skipping vote scan");
            return Ok(Vec::new());
        }

        let posts = self.deps.topics.topic_posts(id).await?;
        let eligible = self.eligible_voters(&current, posts.iter().map(|p| &p.author), now).await;

        let scanned = self
            .templates
            .scan(&posts, current.voting_deadline, |post| {
                eligible.contains(&post.author.id)
            });

        let candidates = reconcile(&current.votes, &scanned);
        if candidates.is_empty() {
            debug!(posts = posts.len(), "No new votes");
            return Ok(Vec::new());
        }

        let changes = self.deps.store.apply_votes(id, &candidates).await?;
        info!(
            posts = posts.len(),
            recorded = changes.len(),
            "Recorded sanction votes"
        );

        Ok(changes
            .into_iter()
            .map(|change| SanctionEvent::from_change(id, change))
            .collect())
    }

    /// Authors allowed to vote on `sanction`: not the target, not the bot,
    /// and holding a vote right. Directory failures exclude the author for
    /// this scan only; the next view will try again.
    async fn eligible_voters<'a, I>(
        &self,
        sanction: &Sanction,
        authors: I,
        now: DateTime<Utc>,
    ) -> HashSet<UserId>
    where
        I: Iterator<Item = &'a UserRef>,
    {
        let mut seen = HashSet::new();
        let candidates: Vec<&UserRef> = authors
            .filter(|author| seen.insert(author.id))
            .filter(|author| author.id != sanction.target.id && !self.bot.is_bot(author))
            .collect();

        let checks = candidates.into_iter().map(|author| async move {
            (author, self.has_vote_right(author, now).await)
        });

        let mut eligible = HashSet::new();
        for (author, result) in join_all(checks).await {
            match result {
                Ok(true) => {
                    eligible.insert(author.id);
                }
                Ok(false) => debug!(voter = %author, "Author has no vote right"),
                Err(e) => warn!(voter = %author, error = %e, "Could not check vote right"),
            }
        }

        eligible
    }

    /// Close a sanction with the outcome decided by the enactment step.
    #[instrument(skip(self))]
    pub async fn close(
        &self,
        id: SanctionId,
        status: SanctionStatus,
        now: DateTime<Utc>,
    ) -> Result<SanctionEvent> {
        let (_, event) = lifecycle::close(self.deps.store.as_ref(), id, status, now).await?;
        Ok(event)
    }

    /// Sanctions still taking votes, soonest deadline first.
    pub async fn open_sanctions(&self, now: DateTime<Utc>) -> Result<Vec<Sanction>> {
        self.deps.store.list_open(now).await
    }

    /// Sanctions whose voting window has passed but which are still open.
    pub async fn awaiting_closure(&self, now: DateTime<Utc>) -> Result<Vec<Sanction>> {
        self.deps.store.list_awaiting_closure(now).await
    }

    #[cfg(test)]
    pub(crate) fn lock_count(&self) -> usize {
        self.locks.len()
    }
}

/// One holder's share of a per-sanction lock.
///
/// Dropping the last share removes the map entry, including when the owning
/// future is cancelled while waiting for the lock or while it holds it.
struct LockEntry<'a> {
    locks: &'a DashMap<SanctionId, Arc<Mutex<()>>>,
    id: SanctionId,
    mutex: Arc<Mutex<()>>,
}

impl<'a> LockEntry<'a> {
    fn acquire(locks: &'a DashMap<SanctionId, Arc<Mutex<()>>>, id: SanctionId) -> Self {
        let mutex = locks
            .entry(id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        Self { locks, id, mutex }
    }

    fn mutex(&self) -> &Mutex<()> {
        &self.mutex
    }
}

impl Drop for LockEntry<'_> {
    fn drop(&mut self) {
        // Two owners left means the map and us; new shares need the shard
        // lock that remove_if holds
        self.locks
            .remove_if(&self.id, |_, mutex| Arc::strong_count(mutex) == 2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::test_service;
    use crate::traits::platform::TopicPost;
    use crate::types::VoteChoice;
    use chrono::Duration;

    #[tokio::test]
    async fn test_propose_sets_deadline_from_config() {
        let (service, _, _, _) = test_service();
        let now = Utc::now();
        let (sanction, event) = service
            .propose(
                SanctionId::new_random(),
                SanctionKind::Block,
                UserRef::new(2, "Target"),
                UserRef::new(1, "Author"),
                now,
            )
            .await
            .unwrap();

        assert_eq!(sanction.voting_deadline, now + Duration::days(7));
        assert!(matches!(event, SanctionEvent::SanctionProposed { .. }));
        assert!(service.resolve(&sanction.id.to_alphadecimal()).await.unwrap().is_sanction());
    }

    #[tokio::test]
    async fn test_target_and_bot_cannot_vote() {
        let (service, topics, users, _) = test_service();
        let now = Utc::now();
        let target = UserRef::new(2, "Target");
        let bot = UserRef::new(3, service.bot().name());
        users.grant(&target);
        users.grant(&bot);

        let (sanction, _) = service
            .propose(
                SanctionId::new_random(),
                SanctionKind::Block,
                target.clone(),
                UserRef::new(1, "Author"),
                now - Duration::hours(1),
            )
            .await
            .unwrap();

        topics.add_post(sanction.id, TopicPost::new("p1", target, "{{Disagree}}", now));
        topics.add_post(sanction.id, TopicPost::new("p2", bot, "{{Agree}}", now));

        let events = service.check_new_votes(&sanction, now).await.unwrap();
        assert!(events.is_empty());
    }

    #[tokio::test]
    async fn test_expired_sanction_is_not_scanned() {
        let (service, topics, users, _) = test_service();
        let now = Utc::now();
        let voter = UserRef::new(5, "Voter");
        users.grant(&voter);

        let (sanction, _) = service
            .propose(
                SanctionId::new_random(),
                SanctionKind::Block,
                UserRef::new(2, "Target"),
                UserRef::new(1, "Author"),
                now - Duration::days(8),
            )
            .await
            .unwrap();
        topics.add_post(
            sanction.id,
            TopicPost::new("p1", voter, "{{Agree}}", now - Duration::days(7) - Duration::hours(1)),
        );

        assert!(service.check_new_votes(&sanction, now).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_lock_entries_are_released() {
        let (service, topics, users, _) = test_service();
        let now = Utc::now();
        let voter = UserRef::new(5, "Voter");
        users.grant(&voter);

        let (sanction, _) = service
            .propose(
                SanctionId::new_random(),
                SanctionKind::Block,
                UserRef::new(2, "Target"),
                UserRef::new(1, "Author"),
                now - Duration::hours(1),
            )
            .await
            .unwrap();
        topics.add_post(sanction.id, TopicPost::new("p1", voter, "{{Agree|5}}", now));

        let events = service.check_new_votes(&sanction, now).await.unwrap();
        assert_eq!(events.len(), 1);
        assert!(matches!(
            events[0],
            SanctionEvent::VoteRecorded {
                choice: VoteChoice::Agree,
                ..
            }
        ));
        assert_eq!(service.lock_count(), 0);
    }

    #[tokio::test]
    async fn test_cancelled_view_releases_lock_entry() {
        let (service, _, _, _) = test_service();
        let service = Arc::new(service);
        let now = Utc::now();
        let (sanction, _) = service
            .propose(
                SanctionId::new_random(),
                SanctionKind::Block,
                UserRef::new(2, "Target"),
                UserRef::new(1, "Author"),
                now - Duration::hours(1),
            )
            .await
            .unwrap();

        // Another view is mid-scan and holds the lock
        let held = LockEntry::acquire(&service.locks, sanction.id);
        let guard = held.mutex().lock().await;

        let waiting = {
            let service = service.clone();
            let sanction = sanction.clone();
            tokio::spawn(async move { service.check_new_votes(&sanction, now).await })
        };
        while Arc::strong_count(&held.mutex) < 3 {
            tokio::task::yield_now().await;
        }

        waiting.abort();
        assert!(waiting.await.unwrap_err().is_cancelled());
        assert_eq!(service.lock_count(), 1);

        drop(guard);
        drop(held);
        assert_eq!(service.lock_count(), 0);
    }

    #[tokio::test]
    async fn test_close_after_deadline() {
        let (service, _, _, _) = test_service();
        let now = Utc::now();
        let (sanction, _) = service
            .propose(
                SanctionId::new_random(),
                SanctionKind::Block,
                UserRef::new(2, "Target"),
                UserRef::new(1, "Author"),
                now - Duration::days(8),
            )
            .await
            .unwrap();

        let due = service.awaiting_closure(now).await.unwrap();
        assert_eq!(due.len(), 1);
        assert!(service.open_sanctions(now).await.unwrap().is_empty());

        let event = service
            .close(sanction.id, SanctionStatus::Enacted, now)
            .await
            .unwrap();
        assert_eq!(
            event,
            SanctionEvent::SanctionClosed {
                sanction_id: sanction.id,
                status: SanctionStatus::Enacted,
            }
        );
        assert!(service.awaiting_closure(now).await.unwrap().is_empty());

        let err = service
            .close(sanction.id, SanctionStatus::Expired, now)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SanctionError::InvalidTransition {
                from: SanctionStatus::Enacted,
                to: SanctionStatus::Expired,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_close_refused_while_voting_is_open() {
        let (service, _, _, _) = test_service();
        let now = Utc::now();
        let (sanction, _) = service
            .propose(
                SanctionId::new_random(),
                SanctionKind::Block,
                UserRef::new(2, "Target"),
                UserRef::new(1, "Author"),
                now - Duration::hours(1),
            )
            .await
            .unwrap();

        let err = service
            .close(sanction.id, SanctionStatus::Enacted, now)
            .await
            .unwrap_err();
        assert!(matches!(err, SanctionError::VotingOpen { .. }));

        let open = service.open_sanctions(now).await.unwrap();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].status, SanctionStatus::Proposed);

        let missing = service
            .close(SanctionId::new_random(), SanctionStatus::Expired, now)
            .await
            .unwrap_err();
        assert!(matches!(missing, SanctionError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_has_vote_right_for_unknown_user() {
        let (service, _, _, _) = test_service();
        let stranger = UserRef::new(77, "Stranger");
        assert!(!service.has_vote_right(&stranger, Utc::now()).await.unwrap());
    }

    #[tokio::test]
    async fn test_directory_failure_skips_author_for_this_scan() {
        let (service, topics, users, _) = test_service();
        let now = Utc::now();
        let voter = UserRef::new(5, "Voter");
        users.grant(&voter);
        users.set_failing(true);

        let (sanction, _) = service
            .propose(
                SanctionId::new_random(),
                SanctionKind::Block,
                UserRef::new(2, "Target"),
                UserRef::new(1, "Author"),
                now - Duration::hours(1),
            )
            .await
            .unwrap();
        topics.add_post(sanction.id, TopicPost::new("p1", voter, "{{Agree}}", now));

        assert!(service.check_new_votes(&sanction, now).await.unwrap().is_empty());

        users.set_failing(false);
        assert_eq!(service.check_new_votes(&sanction, now).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_topic_source_failure_is_an_error() {
        let (service, topics, _, _) = test_service();
        let now = Utc::now();
        let (sanction, _) = service
            .propose(
                SanctionId::new_random(),
                SanctionKind::Block,
                UserRef::new(2, "Target"),
                UserRef::new(1, "Author"),
                now - Duration::hours(1),
            )
            .await
            .unwrap();
        topics.set_failing(true);

        let err = service.check_new_votes(&sanction, now).await.unwrap_err();
        assert!(matches!(err, SanctionError::Topic(_)));
        assert_eq!(service.lock_count(), 0);
    }
}
