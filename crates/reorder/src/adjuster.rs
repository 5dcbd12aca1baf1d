//! The reorder adjuster

use crate::cascade;
use crate::plan::ReorderPlan;
use crate::tuning::ReorderTuning;
use duelrank_core::{ItemId, RankedItem, Rating, RatingUpdate};

/// Working copy of one list entry while a move is computed
#[derive(Debug, Clone)]
pub(crate) struct Slot {
    pub id: ItemId,
    pub mu: f64,
    pub sigma: f64,
    original: Rating,
}

impl Slot {
    pub fn new(id: ItemId, rating: Rating) -> Self {
        Self {
            id,
            mu: rating.mu,
            sigma: rating.sigma,
            original: rating,
        }
    }

    pub fn score(&self) -> f64 {
        self.mu - self.sigma
    }

    /// Moves the slot to `score`, shrinking its uncertainty
    pub fn reassign(&mut self, score: f64, tuning: &ReorderTuning) {
        self.sigma = tuning.shrink_sigma(self.sigma);
        self.mu = score + self.sigma;
    }

    fn changed(&self) -> bool {
        self.mu != self.original.mu || self.sigma != self.original.sigma
    }

    fn to_update(&self) -> RatingUpdate {
        RatingUpdate::new(self.id.clone(), self.mu, self.sigma)
    }
}

/// Computes rating changes for manual moves
#[derive(Debug, Clone, Default)]
pub struct ReorderAdjuster {
    tuning: ReorderTuning,
}

impl ReorderAdjuster {
    /// Creates an adjuster with the given tuning
    pub fn new(tuning: ReorderTuning) -> Self {
        Self { tuning }
    }

    /// Returns the tuning in use
    pub fn tuning(&self) -> &ReorderTuning {
        &self.tuning
    }

    /// Plans moving `moved` so it ends up at `target` in `items`.
    ///
    /// `items` must be sorted by descending conservative score. `moved` may be
    /// absent from it, in which case it is inserted; `moved_rating` is its current
    /// rating (the default prior for a new item). `target` indexes the list after
    /// `moved` has been taken out of it.
    ///
    /// # Panics
    ///
    /// Panics if `target` is past the end of the list. That is a caller bug, not a
    /// recoverable condition.
    pub fn plan(
        &self,
        items: &[RankedItem],
        moved: &ItemId,
        moved_rating: Rating,
        target: usize,
    ) -> ReorderPlan {
        debug_assert!(
            items.windows(2).all(|w| w[0].score() >= w[1].score()),
            "reorder input must be sorted by descending score"
        );

        let is_new = !items.iter().any(|item| &item.id == moved);
        let mut order: Vec<Slot> = items
            .iter()
            .filter(|item| &item.id != moved)
            .map(|item| Slot::new(item.id.clone(), item.rating))
            .collect();

        assert!(
            target <= order.len(),
            "reorder target {} out of bounds for {} other items",
            target,
            order.len()
        );

        // Neighbors in the hypothetical order: `above` sits right before the
        // insertion point, `below` right after it.
        let above = target.checked_sub(1);
        let below = (target < order.len()).then_some(target);

        let mut touched = Vec::new();
        let score = match (above, below) {
            (Some(a), Some(b)) => {
                if self.tuning.is_tie(order[a].score(), order[b].score()) {
                    touched = cascade::break_ties(&mut order, a, &self.tuning);
                }
                (order[a].score() + order[b].score()) / 2.0
            }
            (Some(a), None) => order[a].score() - self.tuning.edge_offset,
            (None, Some(b)) => order[b].score() + self.tuning.edge_offset,
            (None, None) => {
                // Only item in the list: keep its rating, but still create it
                let updates = if is_new {
                    vec![RatingUpdate::new(
                        moved.clone(),
                        moved_rating.mu,
                        moved_rating.sigma,
                    )]
                } else {
                    Vec::new()
                };
                return ReorderPlan::new(updates, moved.clone(), 0);
            }
        };

        let mut updates: Vec<RatingUpdate> = touched
            .iter()
            .map(|&idx| &order[idx])
            .filter(|slot| slot.changed())
            .map(Slot::to_update)
            .collect();
        let tie_break_count = touched.len();

        let sigma = moved_rating.sigma;
        let mu = score + sigma;
        if is_new || mu != moved_rating.mu {
            updates.push(RatingUpdate::new(moved.clone(), mu, sigma));
        }

        log::debug!(
            "move {} to {}: score {:.6}, {} neighbor(s) adjusted",
            moved,
            target,
            score,
            tie_break_count
        );

        ReorderPlan::new(updates, moved.clone(), tie_break_count)
    }
}
