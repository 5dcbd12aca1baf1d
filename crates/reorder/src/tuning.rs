//! Numeric constants that drive manual reordering

use serde::{Deserialize, Serialize};

/// Tuning knobs for the adjuster.
///
/// The defaults are the values rankings have always been produced with. Changing
/// them affects long-run numeric stability under many repeated reorders, so they
/// are exposed through configuration rather than baked in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReorderTuning {
    /// Two scores closer than this are considered tied
    pub tie_epsilon: f64,
    /// Preferred spacing between items spread apart by a tie-break
    pub cascade_step: f64,
    /// Offset from the single neighbor when moving to the first or last slot
    pub edge_offset: f64,
    /// Room assumed above (or below) a tied run that reaches the end of the list
    pub open_boundary_gap: f64,
    /// Factor applied to sigma of every item touched by a tie-break
    pub sigma_shrink: f64,
    /// Floor for shrunk sigma values
    pub min_sigma: f64,
}

impl Default for ReorderTuning {
    fn default() -> Self {
        Self {
            tie_epsilon: 1e-6,
            cascade_step: 1e-5,
            edge_offset: 0.001,
            open_boundary_gap: 1.0,
            sigma_shrink: 0.9999,
            min_sigma: 1e-4,
        }
    }
}

impl ReorderTuning {
    /// True when two conservative scores are tied
    pub fn is_tie(&self, a: f64, b: f64) -> bool {
        (a - b).abs() <= self.tie_epsilon
    }

    /// Sigma after a tie-break touched the item
    pub fn shrink_sigma(&self, sigma: f64) -> f64 {
        (sigma * self.sigma_shrink).max(self.min_sigma)
    }

    /// Checks the knobs for values that would break ordering guarantees
    pub fn check(&self) -> Result<(), String> {
        let positive = [
            ("tie_epsilon", self.tie_epsilon),
            ("cascade_step", self.cascade_step),
            ("edge_offset", self.edge_offset),
            ("open_boundary_gap", self.open_boundary_gap),
            ("min_sigma", self.min_sigma),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(format!("{} must be a positive number (got {})", name, value));
            }
        }
        if !(self.sigma_shrink > 0.0 && self.sigma_shrink <= 1.0) {
            return Err(format!(
                "sigma_shrink must be in (0, 1] (got {})",
                self.sigma_shrink
            ));
        }
        if self.cascade_step <= self.tie_epsilon {
            return Err(format!(
                "cascade_step ({}) must be larger than tie_epsilon ({})",
                self.cascade_step, self.tie_epsilon
            ));
        }
        Ok(())
    }
}
