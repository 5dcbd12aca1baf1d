// crates/cli/src/rater.rs
//! Weng-Lin skill updates backed by `skillratings`

use duelrank_core::{Skill, MIN_SIGMA};
use duelrank_store::SkillRater;
use skillratings::weng_lin::{expected_score, weng_lin, WengLinConfig, WengLinRating};
use skillratings::Outcomes;

/// Skill model used by the `battle` command
#[derive(Debug, Clone, Copy, Default)]
pub struct WengLinRater {
    config: WengLinConfig,
}

impl WengLinRater {
    /// Probability that `a` beats `b`
    pub fn win_probability(&self, a: Skill, b: Skill) -> f64 {
        expected_score(&to_rating(a), &to_rating(b), &self.config).0
    }
}

fn to_rating(skill: Skill) -> WengLinRating {
    WengLinRating {
        rating: skill.mu,
        uncertainty: skill.sigma,
    }
}

fn to_skill(rating: WengLinRating) -> Skill {
    Skill::new(rating.rating, rating.uncertainty.max(MIN_SIGMA))
}

impl SkillRater for WengLinRater {
    fn rate(&self, winner: Skill, loser: Skill) -> (Skill, Skill) {
        let (winner, loser) = weng_lin(
            &to_rating(winner),
            &to_rating(loser),
            &Outcomes::WIN,
            &self.config,
        );
        (to_skill(winner), to_skill(loser))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use duelrank_core::{DEFAULT_MU, DEFAULT_SIGMA};

    fn prior() -> Skill {
        Skill::new(DEFAULT_MU, DEFAULT_SIGMA)
    }

    #[test]
    fn test_priors_match_library_defaults() {
        let (w, l) = WengLinRater::default().rate(prior(), prior());

        assert!((w.mu - 27.635231383473374).abs() < 1e-9);
        assert!((l.mu - 22.364768616526626).abs() < 1e-9);
        assert!((w.sigma - 8.065506316323548).abs() < 1e-9);
        assert!((w.sigma - l.sigma).abs() < 1e-9);
    }

    #[test]
    fn test_winner_goes_first_in_result() {
        let rater = WengLinRater::default();
        let strong = Skill::new(35.0, 3.0);
        let weak = Skill::new(15.0, 3.0);

        let (w, l) = rater.rate(weak, strong);
        assert!(w.mu > weak.mu);
        assert!(l.mu < strong.mu);
    }

    #[test]
    fn test_upset_moves_more_than_expected_win() {
        let rater = WengLinRater::default();
        let strong = Skill::new(35.0, 3.0);
        let weak = Skill::new(15.0, 3.0);

        let (expected_win, _) = rater.rate(strong, weak);
        let (upset_win, _) = rater.rate(weak, strong);
        assert!(upset_win.mu - weak.mu > expected_win.mu - strong.mu);
    }

    #[test]
    fn test_win_probability_is_complementary() {
        let rater = WengLinRater::default();
        let a = Skill::new(30.0, 4.0);
        let b = Skill::new(20.0, 6.0);
        let sum = rater.win_probability(a, b) + rater.win_probability(b, a);
        assert!((sum - 1.0).abs() < 1e-12);
        assert!(rater.win_probability(a, b) > 0.5);
    }

    #[test]
    fn test_sigma_stays_positive_after_many_battles() {
        let rater = WengLinRater::default();
        let (mut a, mut b) = (prior(), prior());
        for _ in 0..1_000 {
            (a, b) = rater.rate(a, b);
        }
        assert!(a.sigma >= MIN_SIGMA);
        assert!(b.sigma >= MIN_SIGMA);
        assert!(a.mu.is_finite());
    }
}
