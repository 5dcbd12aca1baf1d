//! Local rating store for duelrank
//!
//! [`RatingStore`] is the single owner of item ratings, the pending battle set,
//! the refinement queue and the session metadata. It persists every change through
//! a [`StatePersistence`] backend and requests a push through a [`SyncScheduler`]
//! after each mutation; it never talks to the network itself.
//!
//! # Example
//!
//! ```rust
//! use duelrank_core::ItemId;
//! use duelrank_store::{MemoryStatePersistence, NoopScheduler, RatingStore};
//! use std::sync::Arc;
//!
//! let store = RatingStore::open(
//!     Arc::new(MemoryStatePersistence::new()),
//!     Arc::new(NoopScheduler),
//! );
//! store.set_rating(&ItemId::from("pikachu"), 30.0, 4.0);
//!
//! assert_eq!(store.ranked()[0].id, ItemId::from("pikachu"));
//! ```

mod battle;
mod error;
mod events;
mod persistence;
mod scheduler;
mod state;
mod store;
mod view;

pub use battle::{BattleOutcome, SkillRater};
pub use error::{StoreError, StoreResult};
pub use events::{StoreEvent, EVENT_CAPACITY};
pub use persistence::{FileStatePersistence, MemoryStatePersistence, StatePersistence};
pub use scheduler::{ChannelScheduler, NoopScheduler, PushSignals, SyncScheduler};
pub use state::{PersistedState, Session, STATE_VERSION};
pub use store::RatingStore;
pub use view::{DragEvent, RankingView};
