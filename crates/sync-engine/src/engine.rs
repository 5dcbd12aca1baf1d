// crates/sync-engine/src/engine.rs
//! Main sync engine

use crate::breaker::{CircuitBreaker, CircuitState};
use crate::error::{SyncError, SyncResult};
use crate::merge::{merge_snapshots, MergeStats};
use crate::protocol::{PullRequest, PushRequest};
use crate::transport::{RemoteStore, TransportError};
use crate::types::{PullOutcome, PushOutcome, SkipReason, SyncNotice, SyncStatus};
use duelrank_core::{SessionId, Timestamp};
use duelrank_store::{PushSignals, RatingStore, StoreError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

/// Buffered notices per subscriber
const NOTICE_CAPACITY: usize = 32;

/// Configuration for the sync engine
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Consecutive transport failures before the remote is left alone
    pub failure_threshold: u32,
    /// How long the remote is left alone
    pub cooldown: Duration,
    /// Wait before `hydrate` retries a pull that lost the in-flight race
    pub hydrate_retry_delay: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            cooldown: Duration::from_secs(30),
            hydrate_retry_delay: Duration::from_millis(100),
        }
    }
}

/// Clears the in-flight flag when dropped
struct FlightGuard<'a>(&'a AtomicBool);

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

struct Inner<R> {
    store: RatingStore,
    remote: R,
    config: SyncConfig,
    in_flight: AtomicBool,
    breaker: CircuitBreaker,
    hydrated: watch::Sender<bool>,
    notices: broadcast::Sender<SyncNotice>,
    status: Mutex<SyncStatus>,
}

/// Keeps a [`RatingStore`] and a [`RemoteStore`] converging.
///
/// Pushes send the whole store and are skipped until the session has been
/// reconciled by a pull. Push and pull share one in-flight flag, so at most one
/// request is outstanding; a push requested meanwhile is dropped, not queued.
/// Clones share everything.
pub struct SyncEngine<R: RemoteStore> {
    inner: Arc<Inner<R>>,
}

impl<R: RemoteStore> Clone for SyncEngine<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<R: RemoteStore> SyncEngine<R> {
    /// Creates a new sync engine
    pub fn new(store: RatingStore, remote: R, config: SyncConfig) -> Self {
        let breaker = CircuitBreaker::new(config.failure_threshold, config.cooldown);
        let (hydrated, _) = watch::channel(false);
        let (notices, _) = broadcast::channel(NOTICE_CAPACITY);

        Self {
            inner: Arc::new(Inner {
                store,
                remote,
                config,
                in_flight: AtomicBool::new(false),
                breaker,
                hydrated,
                notices,
                status: Mutex::new(SyncStatus::default()),
            }),
        }
    }

    pub fn store(&self) -> &RatingStore {
        &self.inner.store
    }

    pub fn remote(&self) -> &R {
        &self.inner.remote
    }

    fn begin(&self) -> Option<FlightGuard<'_>> {
        self.inner
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| FlightGuard(&self.inner.in_flight))
    }

    /// Whether a push or pull is outstanding
    pub fn is_syncing(&self) -> bool {
        self.inner.in_flight.load(Ordering::Acquire)
    }

    fn update_status(&self, f: impl FnOnce(&mut SyncStatus)) {
        if let Ok(mut status) = self.inner.status.lock() {
            f(&mut status);
        }
    }

    fn warn(&self, operation: &str, error: &SyncError) {
        log::warn!("{} failed: {}", operation, error);
        self.update_status(|s| s.record_failure(error.to_string()));
        let _ = self.inner.notices.send(SyncNotice::Warning {
            message: format!("{} failed: {}", operation, error),
        });
    }

    fn mark_hydrated(&self) {
        self.inner.hydrated.send_replace(true);
    }

    /// Pushes the whole store to the remote.
    ///
    /// Never retries on its own; the next mutation or reconciliation tick will.
    pub async fn sync_to_cloud(&self) -> SyncResult<PushOutcome> {
        let Some((session, snapshot)) = self.inner.store.reconciled_snapshot() else {
            log::debug!("Push skipped, session not reconciled yet");
            return Ok(PushOutcome::Skipped(SkipReason::NotReconciled));
        };

        let Some(_guard) = self.begin() else {
            log::debug!("Push skipped, another sync in flight");
            return Ok(PushOutcome::Skipped(SkipReason::InFlight));
        };

        if !self.inner.breaker.allow() {
            log::debug!("Push skipped, circuit open");
            return Ok(PushOutcome::Skipped(SkipReason::CircuitOpen));
        }

        let items = snapshot.ratings.len();
        let pushed_queue = snapshot.refinement_queue.clone();
        let request = PushRequest::new(session, snapshot, Timestamp::now());

        match self.inner.remote.push(request).await {
            Ok(response) if response.success => {
                self.inner.breaker.record_success();
                if let Err(e) = self.inner.store.acknowledge_push(session, pushed_queue) {
                    log::debug!("Push acknowledged after session change: {}", e);
                }
                self.update_status(SyncStatus::record_push);
                log::info!("Pushed {} rating(s) for session {}", items, session);
                let _ = self.inner.notices.send(SyncNotice::Pushed { items });
                Ok(PushOutcome::Pushed { items })
            }
            Ok(response) => {
                self.inner.breaker.record_success();
                let err = SyncError::rejected("push", response.error);
                self.warn("Push", &err);
                Err(err)
            }
            Err(e) => {
                self.inner.breaker.record_failure();
                let err = SyncError::from(e);
                self.warn("Push", &err);
                Err(err)
            }
        }
    }

    /// Pulls the remote record and merges it into the store.
    ///
    /// Whatever happens, hydration is signalled afterwards so nobody waits forever.
    /// A successful merge schedules a push so the remote converges on the result.
    pub async fn load_from_cloud(&self) -> SyncResult<PullOutcome> {
        let result = {
            let Some(_guard) = self.begin() else {
                log::debug!("Pull skipped, another sync in flight");
                return Ok(PullOutcome::Skipped(SkipReason::InFlight));
            };
            self.pull_and_merge().await
        };

        self.mark_hydrated();
        match &result {
            Ok(PullOutcome::Merged(stats)) => {
                let _ = self.inner.notices.send(SyncNotice::Merged {
                    changed: stats.changed(),
                });
                self.inner.store.request_push();
            }
            Ok(_) => {}
            Err(e) => self.warn("Pull", e),
        }
        result
    }

    async fn pull_and_merge(&self) -> SyncResult<PullOutcome> {
        if !self.inner.breaker.allow() {
            log::debug!("Pull skipped, circuit open");
            return Ok(PullOutcome::Skipped(SkipReason::CircuitOpen));
        }

        let session = self.inner.store.session_id();
        let response = match self.inner.remote.pull(PullRequest { session_id: session }).await {
            Ok(response) => response,
            Err(TransportError::Malformed(details)) => {
                self.inner.breaker.record_success();
                log::warn!("Remote sent an unreadable record ({}), keeping local state", details);
                return self.finish_without_data(session);
            }
            Err(e) => {
                self.inner.breaker.record_failure();
                return Err(e.into());
            }
        };

        self.inner.breaker.record_success();
        if !response.success {
            return Err(SyncError::rejected("pull", response.error));
        }

        let Some(remote) = response.into_snapshot() else {
            log::info!("No remote data for session {}", session);
            return self.finish_without_data(session);
        };

        let mut stats = MergeStats::default();
        let remote_queue = remote.refinement_queue.clone();
        let merged = self.inner.store.merge_remote(session, &remote_queue, |local, base| {
            let (merged, merge_stats) = merge_snapshots(local, &remote, base);
            stats = merge_stats;
            merged
        });
        if let Some(outcome) = self.discard_if_stale(merged)? {
            return Ok(outcome);
        }
        if let Some(outcome) = self.discard_if_stale(self.inner.store.mark_reconciled(session))? {
            return Ok(outcome);
        }

        self.update_status(SyncStatus::record_pull);
        log::info!(
            "Merged remote state for session {}: {} taken, {} added, {} kept",
            session,
            stats.took_remote,
            stats.added_remote,
            stats.kept_local
        );
        Ok(PullOutcome::Merged(stats))
    }

    fn finish_without_data(&self, session: SessionId) -> SyncResult<PullOutcome> {
        if let Some(outcome) = self.discard_if_stale(self.inner.store.mark_reconciled(session))? {
            return Ok(outcome);
        }
        self.update_status(SyncStatus::record_pull);
        Ok(PullOutcome::NoRemoteData)
    }

    /// Turns a stale-session rejection into a discarded pull
    fn discard_if_stale(&self, result: Result<(), StoreError>) -> SyncResult<Option<PullOutcome>> {
        match result {
            Ok(()) => Ok(None),
            Err(StoreError::StaleSession { expected, current }) => {
                log::info!(
                    "Dropped pull for session {}, store moved on to {}",
                    expected,
                    current
                );
                Ok(Some(PullOutcome::Discarded))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Cold start and sign-in: pulls once and reports whether the session is
    /// reconciled afterwards.
    ///
    /// A pull that loses the in-flight race is retried once.
    pub async fn hydrate(&self) -> bool {
        let mut attempt = self.load_from_cloud().await;
        if matches!(attempt, Ok(PullOutcome::Skipped(SkipReason::InFlight))) {
            tokio::time::sleep(self.inner.config.hydrate_retry_delay).await;
            attempt = self.load_from_cloud().await;
        }

        match attempt {
            Ok(PullOutcome::Skipped(reason)) => {
                log::info!("Hydration skipped: {}", reason);
                // Consumers waiting on hydration must not hang
                self.mark_hydrated();
            }
            Ok(_) => {}
            Err(e) => log::debug!("Hydration pull failed: {}", e),
        }
        self.inner.store.is_reconciled()
    }

    /// Hydration flag; becomes `true` after the first pull attempt completes
    pub fn hydration(&self) -> watch::Receiver<bool> {
        self.inner.hydrated.subscribe()
    }

    pub fn is_hydrated(&self) -> bool {
        *self.inner.hydrated.borrow()
    }

    /// Waits until hydration has been signalled
    pub async fn wait_hydrated(&self) {
        let mut rx = self.hydration();
        // The sender lives in `self`, so this cannot fail while we wait
        let _ = rx.wait_for(|hydrated| *hydrated).await;
    }

    /// Warnings and progress for display
    pub fn subscribe(&self) -> broadcast::Receiver<SyncNotice> {
        self.inner.notices.subscribe()
    }

    pub fn status(&self) -> SyncStatus {
        let mut status = self
            .inner
            .status
            .lock()
            .map(|s| s.clone())
            .unwrap_or_default();
        status.circuit = self.circuit_state();
        status
    }

    pub fn circuit_state(&self) -> CircuitState {
        self.inner.breaker.state()
    }

    /// Consumes every queued push request and performs at most one push.
    ///
    /// Returns `None` when nothing was queued.
    pub async fn drain_pending(&self, signals: &mut PushSignals) -> SyncResult<Option<PushOutcome>> {
        if signals.drain() == 0 {
            return Ok(None);
        }
        self.sync_to_cloud().await.map(Some)
    }

    /// Pushes whenever the store asks for it, coalescing bursts into one push.
    ///
    /// Ends when every scheduler handle is gone.
    pub fn spawn_push_worker(&self, mut signals: PushSignals) -> JoinHandle<()> {
        let engine = self.clone();
        tokio::spawn(async move {
            while signals.recv().await.is_some() {
                let coalesced = signals.drain();
                if coalesced > 0 {
                    log::debug!("Coalesced {} extra push request(s)", coalesced);
                }
                if let Err(e) = engine.sync_to_cloud().await {
                    log::debug!("Background push failed: {}", e);
                }
            }
            log::debug!("Push worker stopped");
        })
    }

    /// Pulls then pushes every `interval`. A zero interval disables it.
    pub fn spawn_reconciler(&self, interval: Duration) -> Option<JoinHandle<()>> {
        if interval.is_zero() {
            return None;
        }

        let engine = self.clone();
        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                log::debug!("Periodic reconciliation");
                if let Err(e) = engine.load_from_cloud().await {
                    log::debug!("Periodic pull failed: {}", e);
                }
                if let Err(e) = engine.sync_to_cloud().await {
                    log::debug!("Periodic push failed: {}", e);
                }
            }
        }))
    }
}
