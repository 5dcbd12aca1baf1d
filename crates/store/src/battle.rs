//! Battle outcomes
//!
//! The skill model is external. The store only needs something that maps the two
//! current skills to two new ones.

use duelrank_core::{Rating, Skill};

/// Skill-rating model: given (winner, loser) returns (new winner, new loser)
pub trait SkillRater {
    fn rate(&self, winner: Skill, loser: Skill) -> (Skill, Skill);
}

impl<F> SkillRater for F
where
    F: Fn(Skill, Skill) -> (Skill, Skill),
{
    fn rate(&self, winner: Skill, loser: Skill) -> (Skill, Skill) {
        self(winner, loser)
    }
}

/// Both ratings after a recorded battle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BattleOutcome {
    pub winner: Rating,
    pub loser: Rating,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closures_are_raters() {
        let rater = |w: Skill, l: Skill| (Skill::new(w.mu + 1.0, w.sigma), Skill::new(l.mu - 1.0, l.sigma));
        let (w, l) = rater.rate(Skill::new(25.0, 8.0), Skill::new(25.0, 8.0));
        assert_eq!(w.mu, 26.0);
        assert_eq!(l.mu, 24.0);
    }
}
