//! Ranked list view with manual reordering
//!
//! The list is never stored. It is derived from the ratings every time, and a
//! drag-and-drop is turned into rating updates by the reorder adjuster.

use crate::store::RatingStore;
use duelrank_core::{ItemId, RankedItem};
use duelrank_reorder::{ReorderAdjuster, ReorderPlan, ReorderTuning};

/// Drag-and-drop gesture on the ranked list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DragEvent {
    Started { item: ItemId },
    /// `over` is the row the item was released on, if any
    Dropped { item: ItemId, over: Option<ItemId> },
}

#[derive(Debug, Clone)]
pub struct RankingView {
    store: RatingStore,
    adjuster: ReorderAdjuster,
    dragging: Option<ItemId>,
}

impl RankingView {
    pub fn new(store: RatingStore, tuning: ReorderTuning) -> Self {
        Self {
            store,
            adjuster: ReorderAdjuster::new(tuning),
            dragging: None,
        }
    }

    pub fn store(&self) -> &RatingStore {
        &self.store
    }

    /// Current ranked list, best first
    pub fn items(&self) -> Vec<RankedItem> {
        self.store.ranked()
    }

    pub fn position_of(&self, item: &ItemId) -> Option<usize> {
        self.items().iter().position(|ranked| &ranked.id == item)
    }

    /// Item currently being dragged
    pub fn dragging(&self) -> Option<&ItemId> {
        self.dragging.as_ref()
    }

    /// Moves `item` so that it ends up at `index` and commits the new ratings.
    ///
    /// `index` counts positions in the list without `item`. An unrated item is
    /// inserted with the default prior.
    ///
    /// # Panics
    ///
    /// Panics if `index` is past the end of that list.
    pub fn move_item(&self, item: &ItemId, index: usize) -> ReorderPlan {
        let plan = self.store.update_with(|ratings| {
            let current = ratings.get(item).copied().unwrap_or_default();
            let plan = self.adjuster.plan(&ratings.ranked(), item, current, index);
            (plan.updates().to_vec(), plan)
        });

        if plan.is_empty() {
            log::debug!("{} already at position {}", item, index);
        } else {
            log::info!(
                "Moved {} to position {} ({} tie-break adjustment(s))",
                item,
                index,
                plan.tie_break_count()
            );
        }
        plan
    }

    /// Applies a drag gesture; returns the committed plan for a real move
    pub fn handle_drag(&mut self, event: DragEvent) -> Option<ReorderPlan> {
        match event {
            DragEvent::Started { item } => {
                self.dragging = Some(item);
                None
            }
            DragEvent::Dropped { item, over } => {
                self.dragging = None;
                let over = over?;
                if over == item {
                    return None;
                }
                let target = self.position_of(&over)?;
                Some(self.move_item(&item, target))
            }
        }
    }
}
