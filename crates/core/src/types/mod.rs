//! Domain types for duelrank
//!
//! - `rating`: item ids, ratings, the rating set and ranked views of it
//! - `queue`: pending battles and the refinement queue
//! - `session`: session identifiers
//! - `snapshot`: the mergeable store content
//! - `common`: timestamps

mod common;
mod queue;
mod rating;
mod session;
mod snapshot;

// Re-export all public types
pub use common::Timestamp;
pub use queue::{PendingBattles, RefinementBattle, RefinementQueue};
pub use rating::{
    sanitize_skill, ItemId, RankedItem, Rating, RatingSet, RatingUpdate, Skill, DEFAULT_MU,
    DEFAULT_SIGMA, MIN_SIGMA,
};
pub use session::SessionId;
pub use snapshot::StoreSnapshot;
