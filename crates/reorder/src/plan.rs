//! Result of a reorder computation

use duelrank_core::{ItemId, RatingUpdate};

/// Rating writes produced by one reorder request.
///
/// Tie-break neighbors come first in list order, the moved item last. Writes that
/// would not change anything are left out, so an empty plan means the list is
/// already arranged as requested.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReorderPlan {
    updates: Vec<RatingUpdate>,
    moved: Option<ItemId>,
    tie_break_count: usize,
}

impl ReorderPlan {
    pub(crate) fn new(updates: Vec<RatingUpdate>, moved: ItemId, tie_break_count: usize) -> Self {
        Self {
            updates,
            moved: Some(moved),
            tie_break_count,
        }
    }

    /// All writes, in commit order
    pub fn updates(&self) -> &[RatingUpdate] {
        &self.updates
    }

    pub fn into_updates(self) -> Vec<RatingUpdate> {
        self.updates
    }

    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
    }

    pub fn len(&self) -> usize {
        self.updates.len()
    }

    /// The write for the moved item, if it changed
    pub fn moved_update(&self) -> Option<&RatingUpdate> {
        let moved = self.moved.as_ref()?;
        self.updates.iter().rev().find(|u| &u.item == moved)
    }

    /// Writes made to neighbors by the tie-break
    pub fn neighbor_updates(&self) -> impl Iterator<Item = &RatingUpdate> {
        let moved = self.moved.clone();
        self.updates
            .iter()
            .filter(move |u| Some(&u.item) != moved.as_ref())
    }

    /// Number of neighbors whose scores were spread apart
    pub fn tie_break_count(&self) -> usize {
        self.tie_break_count
    }
}
