// crates/cli/src/app.rs
//! Wiring of store, view and sync engine for one CLI invocation

use anyhow::{Context, Result};
use console::style;
use duelrank_config::Config;
use duelrank_core::AppError;
use duelrank_reorder::ReorderTuning;
use duelrank_store::{
    ChannelScheduler, FileStatePersistence, NoopScheduler, PushSignals, RankingView, RatingStore,
    StatePersistence,
};
use duelrank_sync_engine::{
    HttpRemote, HttpRemoteConfig, RemoteStore, SyncConfig, SyncEngine, SyncError, SyncNotice,
};
use tokio::sync::broadcast;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

pub struct App<R: RemoteStore> {
    pub view: RankingView,
    engine: Option<SyncEngine<R>>,
    signals: Option<PushSignals>,
    reconcile_interval: Option<Duration>,
}

impl App<HttpRemote> {
    /// Opens the state file and, when enabled in `config`, the HTTP remote
    pub fn open(state_path: &Path, config: &Config) -> Result<Self> {
        let persistence = Arc::new(FileStatePersistence::new(state_path));

        let remote = if config.remote.enabled {
            let remote = HttpRemote::new(HttpRemoteConfig {
                endpoint: config.remote.endpoint.clone(),
                timeout: config.remote.request_timeout(),
                ..HttpRemoteConfig::default()
            })
            .context("Failed to create HTTP client")?;
            Some(remote)
        } else {
            None
        };

        let sync = SyncConfig {
            failure_threshold: config.remote.failure_threshold,
            cooldown: config.remote.cooldown(),
            ..SyncConfig::default()
        };
        let mut app = Self::with_remote(persistence, remote, sync, config.reorder.tuning());
        app.reconcile_interval = config.remote.reconcile_interval();
        Ok(app)
    }
}

impl<R: RemoteStore> App<R> {
    pub fn with_remote(
        persistence: Arc<dyn StatePersistence>,
        remote: Option<R>,
        sync: SyncConfig,
        tuning: ReorderTuning,
    ) -> Self {
        match remote {
            Some(remote) => {
                let (scheduler, signals) = ChannelScheduler::new();
                let store = RatingStore::open(persistence, Arc::new(scheduler));
                Self {
                    view: RankingView::new(store.clone(), tuning),
                    engine: Some(SyncEngine::new(store, remote, sync)),
                    signals: Some(signals),
                    reconcile_interval: None,
                }
            }
            None => {
                let store = RatingStore::open(persistence, Arc::new(NoopScheduler));
                Self {
                    view: RankingView::new(store, tuning),
                    engine: None,
                    signals: None,
                    reconcile_interval: None,
                }
            }
        }
    }

    pub fn store(&self) -> &RatingStore {
        self.view.store()
    }

    pub fn engine(&self) -> Option<&SyncEngine<R>> {
        self.engine.as_ref()
    }

    /// Pulls the remote record before anything else touches the store
    pub async fn start(&self) {
        if let Some(engine) = &self.engine {
            if !engine.hydrate().await {
                warn_user("Working offline: rankings will sync once the server is reachable.");
            }
        }
    }

    /// Re-runs hydration, used after the session changed
    pub async fn rehydrate(&self) -> bool {
        match &self.engine {
            Some(engine) => engine.hydrate().await,
            None => false,
        }
    }

    /// Configured background reconciliation period
    pub fn reconcile_interval(&self) -> Option<Duration> {
        self.reconcile_interval
    }

    /// Keeps pushing and reconciling in the background until Ctrl-C
    pub async fn watch(&mut self, interval: Duration) -> Result<()> {
        let Some(engine) = &self.engine else {
            anyhow::bail!("Remote sync is disabled");
        };
        let Some(signals) = self.signals.take() else {
            anyhow::bail!("Push worker already running");
        };

        let worker = engine.spawn_push_worker(signals);
        let reconciler = engine.spawn_reconciler(interval);
        let mut notices = engine.subscribe();

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => break,
                notice = notices.recv() => match notice {
                    Ok(SyncNotice::Warning { message }) => warn_user(&message),
                    Ok(notice) => log::info!("{:?}", notice),
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        log::debug!("Missed {} sync notice(s)", n)
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
            }
        }

        worker.abort();
        if let Some(reconciler) = reconciler {
            reconciler.abort();
        }
        // One last attempt for anything written since the final tick
        if let Err(e) = engine.sync_to_cloud().await {
            report_sync_error(e);
        }
        Ok(())
    }

    /// Sends whatever the command changed
    pub async fn finish(&mut self) {
        let (Some(engine), Some(signals)) = (&self.engine, self.signals.as_mut()) else {
            return;
        };
        match engine.drain_pending(signals).await {
            Ok(Some(outcome)) => log::debug!("Final push: {:?}", outcome),
            Ok(None) => {}
            Err(e) => report_sync_error(e),
        }
    }
}

/// Prints a sync failure the way the user should see it
pub fn report_sync_error(error: SyncError) {
    let error = AppError::from(error);
    log::debug!("Sync error: {}", error);
    warn_user(&error.user_message());
}

pub fn warn_user(message: &str) {
    eprintln!("{} {}", style("!").yellow().bold(), message);
}
