//! Manual reorder tuning section

use crate::validation::{ConfigSection, ValidationError, Validator};
use duelrank_reorder::ReorderTuning;
use serde::{Deserialize, Serialize};

/// Numeric knobs of the reorder adjuster, see [`ReorderTuning`]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ReorderConfig {
    /// Scores closer than this count as tied
    pub tie_epsilon: f64,

    /// Preferred spacing of items spread apart by a tie-break
    pub cascade_step: f64,

    /// Offset from the neighbor when moving to either end of the list
    pub edge_offset: f64,

    /// Room assumed past the end of the list for a tied run
    pub open_boundary_gap: f64,

    /// Sigma factor for items touched by a tie-break, in (0, 1]
    pub sigma_shrink: f64,

    /// Floor for shrunk sigma
    pub min_sigma: f64,
}

impl ReorderConfig {
    /// The adjuster tuning described by this section
    pub fn tuning(&self) -> ReorderTuning {
        ReorderTuning {
            tie_epsilon: self.tie_epsilon,
            cascade_step: self.cascade_step,
            edge_offset: self.edge_offset,
            open_boundary_gap: self.open_boundary_gap,
            sigma_shrink: self.sigma_shrink,
            min_sigma: self.min_sigma,
        }
    }
}

impl From<ReorderTuning> for ReorderConfig {
    fn from(tuning: ReorderTuning) -> Self {
        Self {
            tie_epsilon: tuning.tie_epsilon,
            cascade_step: tuning.cascade_step,
            edge_offset: tuning.edge_offset,
            open_boundary_gap: tuning.open_boundary_gap,
            sigma_shrink: tuning.sigma_shrink,
            min_sigma: tuning.min_sigma,
        }
    }
}

impl Default for ReorderConfig {
    fn default() -> Self {
        ReorderTuning::default().into()
    }
}

impl ConfigSection for ReorderConfig {
    fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut results = vec![
            Validator::positive(self.tie_epsilon, "reorder.tie_epsilon"),
            Validator::positive(self.cascade_step, "reorder.cascade_step"),
            Validator::positive(self.edge_offset, "reorder.edge_offset"),
            Validator::positive(self.open_boundary_gap, "reorder.open_boundary_gap"),
            Validator::positive(self.min_sigma, "reorder.min_sigma"),
        ];

        if !(self.sigma_shrink > 0.0 && self.sigma_shrink <= 1.0) {
            results.push(Err(ValidationError::with_value(
                "reorder.sigma_shrink",
                "must be in (0, 1]",
                self.sigma_shrink,
            )));
        }

        // A step inside the tie window would leave the spread items tied
        if self.cascade_step <= self.tie_epsilon {
            results.push(Err(ValidationError::with_value(
                "reorder.cascade_step",
                format!("must be larger than tie_epsilon ({})", self.tie_epsilon),
                self.cascade_step,
            )));
        }

        Validator::collect_errors(results)
    }

    fn merge(&mut self, other: Self) {
        *self = other;
    }

    fn section_name(&self) -> &'static str {
        "reorder"
    }
}
