// crates/store/src/store.rs
//! The rating store
//!
//! Single owner of every rating, both battle queues and the session metadata.
//! Operations act on in-memory state synchronously, persist the whole record, emit
//! a [`StoreEvent`], and ask the injected [`SyncScheduler`] for a push. Persistence
//! failures are logged; the caller never sees them.

use crate::battle::{BattleOutcome, SkillRater};
use crate::error::{StoreError, StoreResult};
use crate::events::{StoreEvent, EVENT_CAPACITY};
use crate::persistence::StatePersistence;
use crate::scheduler::SyncScheduler;
use crate::state::{PersistedState, Session};
use duelrank_core::{
    sanitize_skill, ItemId, PendingBattles, RankedItem, Rating, RatingSet, RatingUpdate,
    RefinementBattle, RefinementQueue, SessionId, StoreSnapshot, Timestamp,
};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::broadcast;

/// Handle to the rating store. Clones share the same state.
#[derive(Clone)]
pub struct RatingStore {
    state: Arc<Mutex<PersistedState>>,
    persistence: Arc<dyn StatePersistence>,
    scheduler: Arc<dyn SyncScheduler>,
    events: broadcast::Sender<StoreEvent>,
}

/// What a commit should announce
enum Notify {
    Nothing,
    /// Persist only; nothing a consumer needs to re-read
    Quiet,
    Event(StoreEvent),
    EventAndPush(StoreEvent),
}

/// Stamp for a write that replaces a value stamped `previous`.
///
/// Never goes backwards, so a local write always beats what it overwrote even
/// when the overwritten value came from a device with a faster clock.
fn next_stamp(now: Timestamp, previous: Option<Timestamp>) -> Timestamp {
    match previous {
        Some(prev) if prev >= now => Timestamp::from_millis(prev.as_millis() + 1),
        _ => now,
    }
}

fn check_session(state: &PersistedState, session: SessionId) -> StoreResult<()> {
    if state.session_id == session {
        Ok(())
    } else {
        Err(StoreError::StaleSession {
            expected: session.to_string(),
            current: state.session_id.to_string(),
        })
    }
}

fn clean_skill(item: &ItemId, mu: f64, sigma: f64) -> (f64, f64) {
    let (skill, changed) = sanitize_skill(mu, sigma);
    if changed {
        log::warn!(
            "Clamped rating for {}: ({}, {}) -> ({}, {})",
            item,
            mu,
            sigma,
            skill.mu,
            skill.sigma
        );
    }
    (skill.mu, skill.sigma)
}

impl RatingStore {
    /// Opens the store from `persistence`.
    ///
    /// A missing or unreadable record starts a fresh anonymous session. When the
    /// record carries a signed-in identity, its ratings, queues and counters are
    /// dropped and the session must be reconciled again before anything is
    /// pushed: the remote copy is the source of truth for signed-in users.
    pub fn open(
        persistence: Arc<dyn StatePersistence>,
        scheduler: Arc<dyn SyncScheduler>,
    ) -> Self {
        let mut state = match persistence.load() {
            Ok(Some(state)) => state,
            Ok(None) => PersistedState::new(SessionId::new()),
            Err(e) => {
                log::error!("Could not load state from {}: {}", persistence.location(), e);
                PersistedState::new(SessionId::new())
            }
        };

        let mut dirty = false;
        if let Some(identity) = &state.identity {
            log::info!(
                "Signed in as {}, discarding cached state until session {} is reconciled",
                identity,
                state.session_id
            );
            state.discard_data();
            dirty = true;
        }

        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let store = Self {
            state: Arc::new(Mutex::new(state)),
            persistence,
            scheduler,
            events,
        };
        if dirty {
            store.persist(&store.lock());
        }
        store
    }

    fn lock(&self) -> MutexGuard<'_, PersistedState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn persist(&self, state: &PersistedState) {
        if let Err(e) = self.persistence.save(state) {
            log::error!("Failed to persist state to {}: {}", self.persistence.location(), e);
        }
    }

    /// Runs `f` under the lock and, when it reports a change, persists and notifies
    fn mutate<T>(&self, f: impl FnOnce(&mut PersistedState) -> (T, Notify)) -> T {
        let (value, notify) = {
            let mut state = self.lock();
            let (value, notify) = f(&mut state);
            if !matches!(notify, Notify::Nothing) {
                self.persist(&state);
            }
            (value, notify)
        };

        match notify {
            Notify::Nothing | Notify::Quiet => {}
            Notify::Event(event) => self.emit(event),
            Notify::EventAndPush(event) => {
                self.emit(event);
                self.scheduler.schedule_push();
            }
        }
        value
    }

    fn emit(&self, event: StoreEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    // ===== Ratings =====

    /// Writes `(mu, sigma)` for an item, keeping its battle count
    pub fn set_rating(&self, item: &ItemId, mu: f64, sigma: f64) {
        let (mu, sigma) = clean_skill(item, mu, sigma);
        self.mutate(|state| {
            let now = Timestamp::now();
            let ratings = &mut state.data.ratings;
            let previous = ratings.get(item).copied();
            let rating = Rating {
                mu,
                sigma,
                battle_count: previous.map_or(0, |r| r.battle_count),
                last_updated: Some(next_stamp(now, previous.and_then(|r| r.last_updated))),
            };
            ratings.insert(item.clone(), rating);
            ((), Notify::EventAndPush(StoreEvent::Updated))
        });
    }

    /// Bumps the battle count, creating a default entry when the item is new
    pub fn increment_battle_count(&self, item: &ItemId) {
        self.mutate(|state| {
            let now = Timestamp::now();
            let ratings = &mut state.data.ratings;
            let mut rating = ratings.get(item).copied().unwrap_or_default();
            rating.battle_count = rating.battle_count.saturating_add(1);
            rating.last_updated = Some(next_stamp(now, rating.last_updated));
            ratings.insert(item.clone(), rating);
            ((), Notify::EventAndPush(StoreEvent::Updated))
        });
    }

    /// The stored rating, or the unrated prior
    pub fn get_rating(&self, item: &ItemId) -> Rating {
        self.lock()
            .data
            .ratings
            .get(item)
            .copied()
            .unwrap_or_default()
    }

    /// Whether the item has a stored rating
    pub fn contains(&self, item: &ItemId) -> bool {
        self.lock().data.ratings.contains(item)
    }

    /// Commits several rating writes atomically.
    ///
    /// All writes share one timestamp and readers observe either none or all of
    /// them.
    pub fn apply_updates(&self, updates: &[RatingUpdate]) {
        self.update_with(|_| (updates.to_vec(), ()));
    }

    /// Computes rating writes from the current ratings and commits them in one step.
    ///
    /// `f` runs under the store lock, so no other mutation can slip in between
    /// reading the ratings and writing the result.
    pub fn update_with<T>(&self, f: impl FnOnce(&RatingSet) -> (Vec<RatingUpdate>, T)) -> T {
        self.mutate(|state| {
            let (updates, value) = f(&state.data.ratings);
            if updates.is_empty() {
                return (value, Notify::Nothing);
            }

            let now = Timestamp::now();
            let ratings = &mut state.data.ratings;
            let stamp = updates
                .iter()
                .filter_map(|u| ratings.get(&u.item).and_then(|r| r.last_updated))
                .fold(now, |stamp, prev| next_stamp(stamp, Some(prev)));

            for update in &updates {
                let (mu, sigma) = clean_skill(&update.item, update.mu, update.sigma);
                let battle_count = ratings.get(&update.item).map_or(0, |r| r.battle_count);
                ratings.insert(
                    update.item.clone(),
                    Rating {
                        mu,
                        sigma,
                        battle_count,
                        last_updated: Some(stamp),
                    },
                );
            }
            log::debug!("Committed {} rating update(s)", updates.len());
            (value, Notify::EventAndPush(StoreEvent::Updated))
        })
    }

    /// Records a battle result in one atomic step.
    ///
    /// Both items get the rater's new skills and one more battle, the total battle
    /// counter goes up by one and both items leave the pending set.
    pub fn record_battle(
        &self,
        winner: &ItemId,
        loser: &ItemId,
        rater: &impl SkillRater,
    ) -> StoreResult<BattleOutcome> {
        if winner == loser {
            return Err(StoreError::SelfBattle(winner.to_string()));
        }

        let outcome = self.mutate(|state| {
            let now = Timestamp::now();
            let data = &mut state.data;
            let old_winner = data.ratings.get(winner).copied().unwrap_or_default();
            let old_loser = data.ratings.get(loser).copied().unwrap_or_default();

            let (new_winner, new_loser) = rater.rate(old_winner.skill(), old_loser.skill());

            let stamp = next_stamp(
                next_stamp(now, old_winner.last_updated),
                old_loser.last_updated,
            );
            let rated = |old: Rating, id: &ItemId, mu: f64, sigma: f64| {
                let (mu, sigma) = clean_skill(id, mu, sigma);
                Rating {
                    mu,
                    sigma,
                    battle_count: old.battle_count.saturating_add(1),
                    last_updated: Some(stamp),
                }
            };
            let winner_rating = rated(old_winner, winner, new_winner.mu, new_winner.sigma);
            let loser_rating = rated(old_loser, loser, new_loser.mu, new_loser.sigma);

            data.ratings.insert(winner.clone(), winner_rating);
            data.ratings.insert(loser.clone(), loser_rating);
            data.pending_battles.remove(winner);
            data.pending_battles.remove(loser);
            data.total_battles = data.total_battles.saturating_add(1);
            data.total_battles_last_updated =
                Some(next_stamp(now, data.total_battles_last_updated));

            let outcome = BattleOutcome {
                winner: winner_rating,
                loser: loser_rating,
            };
            (outcome, Notify::EventAndPush(StoreEvent::Updated))
        });

        log::info!(
            "{} beat {} ({:.3} / {:.3})",
            winner,
            loser,
            outcome.winner.conservative_score(),
            outcome.loser.conservative_score()
        );
        Ok(outcome)
    }

    /// Empties the rating set and resets the battle counter
    pub fn clear_all(&self) {
        self.mutate(|state| {
            let data = &mut state.data;
            data.ratings.clear();
            data.total_battles = 0;
            data.total_battles_last_updated =
                Some(next_stamp(Timestamp::now(), data.total_battles_last_updated));
            ((), Notify::EventAndPush(StoreEvent::RatingsCleared))
        });
        log::info!("Cleared all ratings");
    }

    // ===== Counters =====

    pub fn increment_total_battles(&self) {
        self.mutate(|state| {
            let data = &mut state.data;
            data.total_battles = data.total_battles.saturating_add(1);
            data.total_battles_last_updated =
                Some(next_stamp(Timestamp::now(), data.total_battles_last_updated));
            ((), Notify::EventAndPush(StoreEvent::Updated))
        });
    }

    pub fn total_battles(&self) -> u64 {
        self.lock().data.total_battles
    }

    // ===== Pending battles =====

    /// Marks an item as awaiting a battle; false if it already was
    pub fn add_pending_battle(&self, item: &ItemId) -> bool {
        self.mutate(|state| {
            if state.data.pending_battles.insert(item.clone()) {
                (true, Notify::EventAndPush(StoreEvent::Updated))
            } else {
                (false, Notify::Nothing)
            }
        })
    }

    /// Clears the pending mark; false if the item was not pending
    pub fn remove_pending_battle(&self, item: &ItemId) -> bool {
        self.mutate(|state| {
            if state.data.pending_battles.remove(item) {
                (true, Notify::EventAndPush(StoreEvent::Updated))
            } else {
                (false, Notify::Nothing)
            }
        })
    }

    pub fn pending_battles(&self) -> PendingBattles {
        self.lock().data.pending_battles.clone()
    }

    // ===== Refinement queue =====

    /// Queues one refinement battle per opponent and returns the new queue length
    pub fn queue_refinement_battles(
        &self,
        primary: &ItemId,
        opponents: &[ItemId],
        priority: i64,
    ) -> usize {
        self.mutate(|state| {
            let len = state
                .data
                .refinement_queue
                .enqueue(primary, opponents, priority);
            let notify = if opponents.is_empty() {
                Notify::Nothing
            } else {
                Notify::EventAndPush(StoreEvent::Updated)
            };
            (len, notify)
        })
    }

    /// Removes and returns the most urgent refinement battle
    pub fn pop_refinement_battle(&self) -> Option<RefinementBattle> {
        self.mutate(|state| match state.data.refinement_queue.pop() {
            Some(battle) => (Some(battle), Notify::EventAndPush(StoreEvent::Updated)),
            None => (None, Notify::Nothing),
        })
    }

    /// The most urgent refinement battle, left in place
    pub fn peek_next_refinement_battle(&self) -> Option<RefinementBattle> {
        self.lock().data.refinement_queue.peek().cloned()
    }

    pub fn refinement_queue(&self) -> RefinementQueue {
        self.lock().data.refinement_queue.clone()
    }

    // ===== Session =====

    /// Switches to another remote record.
    ///
    /// A different id wipes ratings, queues and counters and requires a fresh
    /// reconciliation. The same id is a no-op.
    pub fn set_session_id(&self, session_id: SessionId) {
        self.mutate(|state| {
            if state.session_id == session_id {
                return ((), Notify::Nothing);
            }
            log::info!("Switching session {} -> {}", state.session_id, session_id);
            state.session_id = session_id;
            state.discard_data();
            ((), Notify::Event(StoreEvent::RatingsCleared))
        });
    }

    /// Associates the store with a signed-in identity.
    ///
    /// The first time an identity is attached, whatever was stored locally is
    /// discarded, not merged, and the session has to be reconciled before pushes
    /// resume. Returns true when local state was discarded.
    pub fn attach_identity(&self, identity: &str, session_id: SessionId) -> bool {
        self.mutate(|state| {
            let same_identity = state.identity.as_deref() == Some(identity);
            if same_identity && state.session_id == session_id {
                return (false, Notify::Nothing);
            }

            log::info!(
                "Attaching identity {} with session {}, local state discarded",
                identity,
                session_id
            );
            state.identity = Some(identity.to_string());
            state.session_id = session_id;
            state.discard_data();
            (true, Notify::Event(StoreEvent::RatingsCleared))
        })
    }

    /// Forgets the signed-in identity, keeping local data
    pub fn detach_identity(&self) -> Option<String> {
        self.mutate(|state| match state.identity.take() {
            Some(identity) => {
                log::info!("Detached identity {}", identity);
                (Some(identity), Notify::Event(StoreEvent::Updated))
            }
            None => (None, Notify::Nothing),
        })
    }

    pub fn session(&self) -> Session {
        self.lock().session()
    }

    pub fn session_id(&self) -> SessionId {
        self.lock().session_id
    }

    pub fn is_reconciled(&self) -> bool {
        self.lock().reconciled
    }

    // ===== Reads =====

    /// Items sorted by descending conservative score
    pub fn ranked(&self) -> Vec<RankedItem> {
        self.lock().data.ratings.ranked()
    }

    /// Copy of everything that is pushed to and merged from the remote store
    pub fn snapshot(&self) -> StoreSnapshot {
        self.lock().data.clone()
    }

    /// Session id and snapshot read together
    pub fn session_snapshot(&self) -> (SessionId, StoreSnapshot) {
        let state = self.lock();
        (state.session_id, state.data.clone())
    }

    /// Session id and snapshot, or `None` while the session is unreconciled.
    ///
    /// Checked and read under one lock, so a session switch cannot slip an empty
    /// snapshot into a push.
    pub fn reconciled_snapshot(&self) -> Option<(SessionId, StoreSnapshot)> {
        let state = self.lock();
        state
            .reconciled
            .then(|| (state.session_id, state.data.clone()))
    }

    pub fn len(&self) -> usize {
        self.lock().data.ratings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().data.ratings.is_empty()
    }

    /// Change notifications from now on
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    // ===== Sync hooks =====

    /// Asks for a push without changing anything
    pub fn request_push(&self) {
        self.scheduler.schedule_push();
    }

    /// Replaces the mergeable content with `merge(current, last_remote_queue)`.
    ///
    /// `merge` sees the state as it is now, not as it was when the pull started,
    /// so mutations made while a pull was in flight go through the merge rule.
    /// The second argument is the refinement queue the remote held the last
    /// time this store saw it; afterwards that becomes `remote_queue`.
    /// Fails with [`StoreError::StaleSession`] when `session` is no longer
    /// current.
    pub fn merge_remote(
        &self,
        session: SessionId,
        remote_queue: &RefinementQueue,
        merge: impl FnOnce(&StoreSnapshot, &RefinementQueue) -> StoreSnapshot,
    ) -> StoreResult<()> {
        self.mutate(|state| {
            if let Err(err) = check_session(state, session) {
                return (Err(err), Notify::Nothing);
            }
            state.data = merge(&state.data, &state.remote_queue);
            state.remote_queue = remote_queue.clone();
            (Ok(()), Notify::Event(StoreEvent::LoadedFromRemote))
        })
    }

    /// Records that the remote accepted `queue` as its refinement queue
    pub fn acknowledge_push(&self, session: SessionId, queue: RefinementQueue) -> StoreResult<()> {
        self.mutate(|state| {
            if let Err(err) = check_session(state, session) {
                return (Err(err), Notify::Nothing);
            }
            if state.remote_queue == queue {
                return (Ok(()), Notify::Nothing);
            }
            state.remote_queue = queue;
            (Ok(()), Notify::Quiet)
        })
    }

    /// Refinement queue the remote was last seen holding
    pub fn last_remote_queue(&self) -> RefinementQueue {
        self.lock().remote_queue.clone()
    }

    /// Marks `session` as reconciled, unblocking pushes
    pub fn mark_reconciled(&self, session: SessionId) -> StoreResult<()> {
        self.mutate(|state| {
            if let Err(err) = check_session(state, session) {
                return (Err(err), Notify::Nothing);
            }
            if state.reconciled {
                return (Ok(()), Notify::Nothing);
            }
            state.reconciled = true;
            log::info!("Session {} reconciled", session);
            (Ok(()), Notify::Event(StoreEvent::Updated))
        })
    }
}

impl std::fmt::Debug for RatingStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("RatingStore")
            .field("session_id", &state.session_id)
            .field("reconciled", &state.reconciled)
            .field("ratings", &state.data.ratings.len())
            .field("persistence", &self.persistence.location())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::MemoryStatePersistence;
    use crate::scheduler::{ChannelScheduler, NoopScheduler, PushSignals};
    use duelrank_core::{Skill, DEFAULT_MU, MIN_SIGMA};

    fn store() -> (RatingStore, MemoryStatePersistence, PushSignals) {
        let persistence = MemoryStatePersistence::new();
        let (scheduler, signals) = ChannelScheduler::new();
        let store = RatingStore::open(Arc::new(persistence.clone()), Arc::new(scheduler));
        (store, persistence, signals)
    }

    fn id(s: &str) -> ItemId {
        ItemId::from(s)
    }

    #[test]
    fn test_get_missing_returns_prior() {
        let (store, _, _) = store();
        assert_eq!(store.get_rating(&id("nobody")), Rating::default());
        assert!(!store.contains(&id("nobody")));
    }

    #[test]
    fn test_set_rating_keeps_battle_count() {
        let (store, _, mut signals) = store();
        store.increment_battle_count(&id("a"));
        store.increment_battle_count(&id("a"));
        store.set_rating(&id("a"), 30.0, 3.0);

        let rating = store.get_rating(&id("a"));
        assert_eq!(rating.mu, 30.0);
        assert_eq!(rating.battle_count, 2);
        assert!(rating.last_updated.is_some());
        assert_eq!(signals.drain(), 3);
    }

    #[test]
    fn test_timestamps_never_go_backwards() {
        let (store, _, _) = store();
        let future = Timestamp::from_millis(Timestamp::now().as_millis() + 60_000);
        store
            .merge_remote(store.session_id(), &RefinementQueue::new(), |_, _| {
                let mut snapshot = StoreSnapshot::new();
                snapshot
                    .ratings
                    .insert(id("a"), Rating::new(20.0, 2.0).stamped(future));
                snapshot
            })
            .unwrap();

        store.set_rating(&id("a"), 21.0, 2.0);
        assert!(store.get_rating(&id("a")).last_updated.unwrap() > future);
    }

    #[test]
    fn test_invalid_sigma_is_clamped() {
        let (store, _, _) = store();
        store.set_rating(&id("a"), 10.0, 0.0);
        store.set_rating(&id("b"), f64::NAN, -1.0);

        assert_eq!(store.get_rating(&id("a")).sigma, MIN_SIGMA);
        let b = store.get_rating(&id("b"));
        assert_eq!(b.mu, DEFAULT_MU);
        assert!(b.sigma > 0.0);
    }

    #[test]
    fn test_clear_all_resets_counter_and_notifies() {
        let (store, _, mut signals) = store();
        let mut events = store.subscribe();
        store.set_rating(&id("a"), 30.0, 3.0);
        store.increment_total_battles();
        signals.drain();

        store.clear_all();
        assert!(store.is_empty());
        assert_eq!(store.total_battles(), 0);
        assert_eq!(signals.drain(), 1);

        assert_eq!(events.try_recv().unwrap(), StoreEvent::Updated);
        assert_eq!(events.try_recv().unwrap(), StoreEvent::Updated);
        assert_eq!(events.try_recv().unwrap(), StoreEvent::RatingsCleared);
    }

    #[test]
    fn test_pending_only_syncs_on_change() {
        let (store, persistence, mut signals) = store();
        assert!(store.add_pending_battle(&id("a")));
        assert!(!store.add_pending_battle(&id("a")));
        assert_eq!(signals.drain(), 1);
        assert_eq!(persistence.save_count(), 1);

        assert!(store.remove_pending_battle(&id("a")));
        assert!(!store.remove_pending_battle(&id("a")));
        assert_eq!(signals.drain(), 1);
        assert!(store.pending_battles().is_empty());
    }

    #[test]
    fn test_refinement_queue_round_trip() {
        let (store, _, mut signals) = store();
        assert_eq!(store.queue_refinement_battles(&id("p"), &[id("x"), id("y")], 5), 2);
        assert_eq!(store.queue_refinement_battles(&id("q"), &[id("z")], 1), 3);
        assert_eq!(signals.drain(), 2);

        assert_eq!(store.peek_next_refinement_battle().unwrap().primary_item_id, id("q"));
        assert_eq!(store.pop_refinement_battle().unwrap().opponent_item_id, id("z"));
        assert_eq!(store.pop_refinement_battle().unwrap().opponent_item_id, id("x"));
        assert_eq!(store.refinement_queue().len(), 1);
        assert_eq!(signals.drain(), 2);
    }

    #[test]
    fn test_pop_empty_queue_is_silent() {
        let (store, _, mut signals) = store();
        assert!(store.pop_refinement_battle().is_none());
        assert_eq!(signals.drain(), 0);
    }

    #[test]
    fn test_record_battle_is_one_commit() {
        let (store, persistence, mut signals) = store();
        store.add_pending_battle(&id("w"));
        store.add_pending_battle(&id("l"));
        signals.drain();
        let saves = persistence.save_count();

        let rater = |w: Skill, l: Skill| {
            (
                Skill::new(w.mu + 2.0, w.sigma * 0.9),
                Skill::new(l.mu - 2.0, l.sigma * 0.9),
            )
        };
        let outcome = store.record_battle(&id("w"), &id("l"), &rater).unwrap();

        assert_eq!(outcome.winner.mu, DEFAULT_MU + 2.0);
        assert_eq!(outcome.winner.battle_count, 1);
        assert_eq!(outcome.loser.battle_count, 1);
        assert_eq!(outcome.winner.last_updated, outcome.loser.last_updated);
        assert_eq!(store.total_battles(), 1);
        assert!(store.pending_battles().is_empty());
        assert_eq!(persistence.save_count(), saves + 1);
        assert_eq!(signals.drain(), 1);
    }

    #[test]
    fn test_self_battle_is_rejected() {
        let (store, _, _) = store();
        let rater = |w: Skill, l: Skill| (w, l);
        assert!(matches!(
            store.record_battle(&id("a"), &id("a"), &rater),
            Err(StoreError::SelfBattle(_))
        ));
    }

    #[test]
    fn test_apply_updates_shares_one_stamp() {
        let (store, _, mut signals) = store();
        store.increment_battle_count(&id("a"));
        signals.drain();

        store.apply_updates(&[
            RatingUpdate::new(id("a"), 30.0, 2.0),
            RatingUpdate::new(id("b"), 20.0, 2.0),
        ]);

        let a = store.get_rating(&id("a"));
        let b = store.get_rating(&id("b"));
        assert_eq!(a.last_updated, b.last_updated);
        assert_eq!(a.battle_count, 1);
        assert_eq!(signals.drain(), 1);

        store.apply_updates(&[]);
        assert_eq!(signals.drain(), 0);
    }

    #[test]
    fn test_set_session_id_wipes_and_unreconciles() {
        let (store, _, _) = store();
        store.mark_reconciled(store.session_id()).unwrap();
        store.set_rating(&id("a"), 30.0, 3.0);
        store.add_pending_battle(&id("b"));
        store.queue_refinement_battles(&id("a"), &[id("b")], 0);
        store.increment_total_battles();

        let next = SessionId::new();
        store.set_session_id(next);

        assert_eq!(store.session_id(), next);
        assert!(!store.is_reconciled());
        assert!(store.is_empty());
        assert!(store.pending_battles().is_empty());
        assert!(store.refinement_queue().is_empty());
        assert_eq!(store.total_battles(), 0);
    }

    #[test]
    fn test_same_session_id_is_noop() {
        let (store, _, _) = store();
        store.mark_reconciled(store.session_id()).unwrap();
        store.set_rating(&id("a"), 30.0, 3.0);

        store.set_session_id(store.session_id());
        assert!(store.is_reconciled());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_attach_identity_discards_anonymous_state() {
        let (store, persistence, _) = store();
        store.mark_reconciled(store.session_id()).unwrap();
        store.set_rating(&id("anon"), 30.0, 3.0);

        let session = SessionId::new();
        assert!(store.attach_identity("ash@example.com", session));
        assert!(store.is_empty());
        assert!(!store.is_reconciled());
        assert_eq!(store.session().identity.as_deref(), Some("ash@example.com"));

        // already attached
        assert!(!store.attach_identity("ash@example.com", session));
        assert_eq!(
            persistence.stored().unwrap().identity.as_deref(),
            Some("ash@example.com")
        );
    }

    #[test]
    fn test_detach_identity_keeps_data() {
        let (store, _, _) = store();
        store.attach_identity("misty", SessionId::new());
        store.set_rating(&id("a"), 30.0, 3.0);

        assert_eq!(store.detach_identity().as_deref(), Some("misty"));
        assert_eq!(store.len(), 1);
        assert!(store.detach_identity().is_none());
    }

    #[test]
    fn test_open_with_identity_discards_cached_state() {
        let mut cached = PersistedState::new(SessionId::new());
        cached.identity = Some("brock".to_string());
        cached.reconciled = true;
        cached.data.ratings.insert(id("onix"), Rating::new(40.0, 1.0));
        let persistence = MemoryStatePersistence::with_state(cached.clone());

        let store = RatingStore::open(Arc::new(persistence.clone()), Arc::new(NoopScheduler));

        assert!(store.is_empty());
        assert!(!store.is_reconciled());
        assert_eq!(store.session_id(), cached.session_id);
        assert!(persistence.stored().unwrap().data.ratings.is_empty());
    }

    #[test]
    fn test_open_anonymous_keeps_state() {
        let mut cached = PersistedState::new(SessionId::new());
        cached.reconciled = true;
        cached.data.ratings.insert(id("onix"), Rating::new(40.0, 1.0));
        let persistence = MemoryStatePersistence::with_state(cached);

        let store = RatingStore::open(Arc::new(persistence), Arc::new(NoopScheduler));
        assert_eq!(store.len(), 1);
        assert!(store.is_reconciled());
    }

    #[test]
    fn test_merge_remote_rejects_stale_session() {
        let (store, _, _) = store();
        let old = store.session_id();
        store.set_session_id(SessionId::new());

        let result = store.merge_remote(old, &RefinementQueue::new(), |local, _| local.clone());
        assert!(matches!(result, Err(StoreError::StaleSession { .. })));
        assert!(store.mark_reconciled(old).is_err());
        assert!(!store.is_reconciled());
    }

    #[test]
    fn test_merge_remote_emits_loaded() {
        let (store, _, _) = store();
        let mut events = store.subscribe();
        store
            .merge_remote(store.session_id(), &RefinementQueue::new(), |local, _| {
                local.clone()
            })
            .unwrap();
        assert_eq!(events.try_recv().unwrap(), StoreEvent::LoadedFromRemote);
    }

    #[test]
    fn test_remote_queue_tracks_pulls_and_pushes() {
        let (store, persistence, _) = store();
        let session = store.session_id();
        let mut pulled = RefinementQueue::new();
        pulled.enqueue(&id("p"), &[id("o")], 1);

        store
            .merge_remote(session, &pulled, |local, base| {
                assert!(base.is_empty());
                local.clone()
            })
            .unwrap();
        assert_eq!(store.last_remote_queue(), pulled);

        store.acknowledge_push(session, RefinementQueue::new()).unwrap();
        assert!(store.last_remote_queue().is_empty());
        assert!(persistence.stored().unwrap().remote_queue.is_empty());

        store.set_session_id(SessionId::new());
        assert!(store.acknowledge_push(session, pulled).is_err());
    }

    #[test]
    fn test_session_switch_forgets_remote_queue() {
        let (store, _, _) = store();
        let mut pushed = RefinementQueue::new();
        pushed.enqueue(&id("p"), &[id("o")], 1);
        store.acknowledge_push(store.session_id(), pushed).unwrap();

        store.set_session_id(SessionId::new());
        assert!(store.last_remote_queue().is_empty());
    }

    #[test]
    fn test_persistence_failure_is_not_surfaced() {
        let (store, persistence, _) = store();
        persistence.fail_saves(true);

        store.set_rating(&id("a"), 30.0, 3.0);
        assert_eq!(store.get_rating(&id("a")).mu, 30.0);
        assert!(persistence.stored().is_none());
    }

    #[test]
    fn test_clones_share_state() {
        let (store, _, _) = store();
        let other = store.clone();
        other.set_rating(&id("a"), 30.0, 3.0);
        assert_eq!(store.get_rating(&id("a")).mu, 30.0);
    }

    #[test]
    fn test_next_stamp() {
        let now = Timestamp::from_millis(100);
        assert_eq!(next_stamp(now, None), now);
        assert_eq!(next_stamp(now, Some(Timestamp::from_millis(50))), now);
        assert_eq!(
            next_stamp(now, Some(Timestamp::from_millis(100))),
            Timestamp::from_millis(101)
        );
    }
}
