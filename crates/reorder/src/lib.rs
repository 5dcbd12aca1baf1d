//! Manual reorder adjustment
//!
//! Turns "move item P to index N" into new ratings so that sorting by conservative
//! score (`mu - sigma`) reproduces exactly the requested arrangement.
//!
//! - P lands at the midpoint between its new neighbors, keeping its sigma
//! - At either end it is offset from the single neighbor by `edge_offset`
//! - When both neighbors share a score, the contiguous tied runs around the gap are
//!   spread apart first (cascading tie-break), shrinking their sigma slightly
//!
//! The adjuster is pure: it never touches the rating store. It returns a
//! [`ReorderPlan`] that the caller commits atomically.
//!
//! # Example
//!
//! ```rust
//! use duelrank_core::{ItemId, RankedItem, Rating};
//! use duelrank_reorder::{ReorderAdjuster, ReorderTuning};
//!
//! let items = vec![
//!     RankedItem::new(ItemId::from("a"), Rating::with_score(10.0, 1.0)),
//!     RankedItem::new(ItemId::from("b"), Rating::with_score(5.0, 1.0)),
//! ];
//! let adjuster = ReorderAdjuster::new(ReorderTuning::default());
//! let plan = adjuster.plan(&items, &ItemId::from("new"), Rating::default(), 0);
//!
//! let moved = plan.moved_update().unwrap();
//! assert!(moved.conservative_score() > 10.0);
//! ```

mod adjuster;
mod cascade;
mod plan;
mod tuning;

pub use adjuster::ReorderAdjuster;
pub use plan::ReorderPlan;
pub use tuning::ReorderTuning;
