//! Cascading tie-break
//!
//! When the two neighbors of the drop gap are tied, the tied runs on each side of
//! the gap are fanned out around their common score so the gap has room for the
//! moved item. Only the runs themselves change; the nearest distinct scores above
//! and below act as hard bounds.

use crate::adjuster::Slot;
use crate::tuning::ReorderTuning;

/// Contiguous tied items on one side of the gap, as an inclusive index range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TiedRun {
    pub first: usize,
    pub last: usize,
}

impl TiedRun {
    pub fn len(&self) -> usize {
        self.last - self.first + 1
    }
}

/// Walks up from `above` while scores stay tied with it
pub(crate) fn upper_run(order: &[Slot], above: usize, tuning: &ReorderTuning) -> TiedRun {
    let score = order[above].score();
    let mut first = above;
    while first > 0 && tuning.is_tie(order[first - 1].score(), score) {
        first -= 1;
    }
    TiedRun { first, last: above }
}

/// Walks down from `below` while scores stay tied with it
pub(crate) fn lower_run(order: &[Slot], below: usize, tuning: &ReorderTuning) -> TiedRun {
    let score = order[below].score();
    let mut last = below;
    while last + 1 < order.len() && tuning.is_tie(order[last + 1].score(), score) {
        last += 1;
    }
    TiedRun { first: below, last }
}

/// Spacing for `len` items fanned out from an anchor towards a bound `room` away.
///
/// Uses the preferred step unless the outermost item would reach the bound.
fn fit_step(room: f64, len: usize, preferred: f64) -> f64 {
    let slots = len as f64 + 1.0;
    if preferred * slots <= room {
        preferred
    } else {
        room / slots
    }
}

/// Spreads the tied runs around the gap between `above` and `above + 1`.
///
/// Returns the indices of every slot that was reassigned, in list order.
pub(crate) fn break_ties(order: &mut [Slot], above: usize, tuning: &ReorderTuning) -> Vec<usize> {
    let below = above + 1;
    let score_above = order[above].score();
    let score_below = order[below].score();
    let anchor = (score_above + score_below) / 2.0;

    let upper = upper_run(order, above, tuning);
    let lower = lower_run(order, below, tuning);

    let upper_bound = if upper.first > 0 {
        order[upper.first - 1].score()
    } else {
        score_above + tuning.open_boundary_gap
    };
    let lower_bound = if lower.last + 1 < order.len() {
        order[lower.last + 1].score()
    } else {
        score_below - tuning.open_boundary_gap
    };
    debug_assert!(upper_bound > anchor, "list above the gap is not sorted");
    debug_assert!(lower_bound < anchor, "list below the gap is not sorted");

    let step_up = fit_step(upper_bound - anchor, upper.len(), tuning.cascade_step);
    let step_down = fit_step(anchor - lower_bound, lower.len(), tuning.cascade_step);

    log::debug!(
        "tie-break around {:.6}: {} above (step {:e}), {} below (step {:e})",
        anchor,
        upper.len(),
        step_up,
        lower.len(),
        step_down
    );

    // Item directly above the gap is closest to the anchor
    for (k, idx) in (upper.first..=upper.last).rev().enumerate() {
        order[idx].reassign(anchor + (k as f64 + 1.0) * step_up, tuning);
    }
    for (k, idx) in (lower.first..=lower.last).enumerate() {
        order[idx].reassign(anchor - (k as f64 + 1.0) * step_down, tuning);
    }

    (upper.first..=lower.last).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use duelrank_core::{ItemId, Rating};

    fn slots(scores: &[f64]) -> Vec<Slot> {
        scores
            .iter()
            .enumerate()
            .map(|(i, s)| Slot::new(ItemId::new(format!("i{}", i)), Rating::with_score(*s, 2.0)))
            .collect()
    }

    #[test]
    fn test_runs_stop_at_distinct_scores() {
        let tuning = ReorderTuning::default();
        let order = slots(&[9.0, 5.0, 5.0, 5.0, 5.0, 1.0]);
        assert_eq!(upper_run(&order, 2, &tuning), TiedRun { first: 1, last: 2 });
        assert_eq!(lower_run(&order, 3, &tuning), TiedRun { first: 3, last: 4 });
    }

    #[test]
    fn test_fit_step_prefers_configured_step() {
        assert_eq!(fit_step(1.0, 3, 1e-5), 1e-5);
    }

    #[test]
    fn test_fit_step_shrinks_in_tight_room() {
        let step = fit_step(4e-6, 3, 1e-5);
        assert!((step - 1e-6).abs() < 1e-18);
    }

    #[test]
    fn test_two_tied_items_fan_out_around_their_score() {
        let tuning = ReorderTuning::default();
        let mut order = slots(&[5.0, 5.0]);
        let touched = break_ties(&mut order, 0, &tuning);

        assert_eq!(touched, vec![0, 1]);
        assert!((order[0].score() - 5.00001).abs() < 1e-9);
        assert!((order[1].score() - 4.99999).abs() < 1e-9);
        assert!((order[0].sigma - 1.9998).abs() < 1e-12);
    }

    #[test]
    fn test_runs_stay_inside_bounds() {
        let tuning = ReorderTuning::default();
        // Bounds only 3e-6 away from the tie
        let mut order = slots(&[5.000003, 5.0, 5.0, 5.0, 5.0, 4.999997]);
        break_ties(&mut order, 2, &tuning);

        for pair in order.windows(2) {
            assert!(pair[0].score() > pair[1].score());
        }
        // bounds are not part of either run
        assert_eq!(order[0].sigma, 2.0);
        assert_eq!(order[5].sigma, 2.0);
    }
}
