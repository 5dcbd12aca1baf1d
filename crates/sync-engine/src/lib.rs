// crates/sync-engine/src/lib.rs
//! Synchronization between the local rating store and a remote copy
//!
//! - Push: the whole store, only once the session has been reconciled
//! - Pull: per-item last-write-wins merge applied to the current local state
//! - One in-flight request at a time, a circuit breaker after repeated failures
//! - Background push worker and optional periodic reconciliation
//!
//! # Example
//!
//! ```rust
//! use duelrank_core::ItemId;
//! use duelrank_store::{MemoryStatePersistence, NoopScheduler, RatingStore};
//! use duelrank_sync_engine::{InMemoryRemote, PushOutcome, SyncConfig, SyncEngine};
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let store = RatingStore::open(
//!     Arc::new(MemoryStatePersistence::new()),
//!     Arc::new(NoopScheduler),
//! );
//! let engine = SyncEngine::new(store, InMemoryRemote::new(), SyncConfig::default());
//!
//! // Nothing is pushed before the first pull
//! assert!(engine.hydrate().await);
//!
//! engine.store().set_rating(&ItemId::from("charizard"), 32.0, 3.0);
//! let outcome = engine.sync_to_cloud().await.unwrap();
//! assert_eq!(outcome, PushOutcome::Pushed { items: 1 });
//! # }
//! ```

mod breaker;
mod engine;
mod error;
mod merge;
mod protocol;
mod transport;
mod types;

pub use breaker::{CircuitBreaker, CircuitState};
pub use engine::{SyncConfig, SyncEngine};
pub use error::{SyncError, SyncResult};
pub use merge::{merge_snapshots, MergeStats};
pub use protocol::{PullRequest, PullResponse, PushRequest, PushResponse};
pub use transport::{
    HttpRemote, HttpRemoteConfig, InMemoryRemote, RemoteCall, RemoteStore, TransportError,
    TransportResult,
};
pub use types::{PullOutcome, PushOutcome, SkipReason, SyncNotice, SyncStatus};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_exports_accessible() {
        let _: SyncConfig = SyncConfig::default();
        let _: SyncStatus = SyncStatus::default();
        let _: InMemoryRemote = InMemoryRemote::new();
        let _: HttpRemoteConfig = HttpRemoteConfig::default();
    }
}
