//! Core domain types for duelrank
//!
//! Everything the rating store, the reorder adjuster and the sync engine agree on
//! lives here: item ratings and their conservative score, the auxiliary battle
//! queues, session identifiers, the mergeable store snapshot, and the shared
//! error taxonomy.

pub mod error;
pub mod types;

// Re-export commonly used types
pub use error::{AppError, ErrorSeverity, RecoveryAction, Result};
pub use types::{
    sanitize_skill, ItemId, PendingBattles, RankedItem, Rating, RatingSet, RatingUpdate,
    RefinementBattle, RefinementQueue, SessionId, Skill, StoreSnapshot, Timestamp, DEFAULT_MU,
    DEFAULT_SIGMA, MIN_SIGMA,
};
