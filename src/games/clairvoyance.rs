//! The clairvoyance game, a one half-street game.
//!
//! - The pot holds `P` bets; Y may bet `B` once.
//! - Y is clairvoyant: a fair chance move gives Y either the nuts or a hand
//!   that loses to X, and Y sees which.
//! - X checks in the dark. Y checks (showdown) or bets.
//! - Facing a bet, X calls or folds without knowing Y's hand.
//!
//! Both of X's decision nodes (after a value bet and after a bluff) share the
//! key `X:bet_response`.
//!
//! At equilibrium Y always bets the nuts and bluffs with probability
//! `B / (2P + B)`; X calls with probability `2P / (2P + B)`. X's value is
//! `-PB / (2P + B)`.

use serde::{Deserialize, Serialize};

use crate::cfr::error::{Result, SolverError};
use crate::cfr::game::{Game, Reference};
use crate::cfr::tree::{Node, Player, Tree};

/// Clairvoyance game with pot `pot_size` and a single bet of `bet_size`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClairvoyanceGame {
    /// Pot before Y acts.
    pub pot_size: f64,
    /// Size of Y's bet.
    pub bet_size: f64,
}

impl Default for ClairvoyanceGame {
    fn default() -> Self {
        Self {
            pot_size: 1.0,
            bet_size: 1.0,
        }
    }
}

impl ClairvoyanceGame {
    /// Create a game with the given pot and bet sizes.
    pub fn new(pot_size: f64, bet_size: f64) -> Self {
        Self { pot_size, bet_size }
    }

    /// Probability that Y bets a losing hand.
    pub fn bluff_frequency(&self) -> f64 {
        self.bet_size / (2.0 * self.pot_size + self.bet_size)
    }

    /// Probability that X calls a bet.
    pub fn call_frequency(&self) -> f64 {
        2.0 * self.pot_size / (2.0 * self.pot_size + self.bet_size)
    }

    /// X's equilibrium value.
    pub fn value_x(&self) -> f64 {
        -self.pot_size * self.bet_size / (2.0 * self.pot_size + self.bet_size)
    }

    fn validate(&self) -> Result<()> {
        if !self.pot_size.is_finite() || self.pot_size < 0.0 {
            return Err(SolverError::invalid_config(format!(
                "pot size must be non-negative, got {}",
                self.pot_size
            )));
        }
        if !self.bet_size.is_finite() || self.bet_size <= 0.0 {
            return Err(SolverError::invalid_config(format!(
                "bet size must be positive, got {}",
                self.bet_size
            )));
        }
        Ok(())
    }
}

impl Game for ClairvoyanceGame {
    fn name(&self) -> String {
        format!("clairvoyance (P={}, B={})", self.pot_size, self.bet_size)
    }

    fn build_tree(&self) -> Result<Tree> {
        self.validate()?;

        let pot = self.pot_size;
        let bet = self.bet_size;

        // X's payoff after calling is the pot plus the bet, signed by who holds the winner.
        let respond = |showdown: f64| {
            Node::decision(
                Player::X,
                "X:bet_response",
                [
                    ("fold", Node::terminal(-pot)),
                    ("call", Node::terminal(showdown * (pot + bet))),
                ],
            )
        };
        let y_turn = |key: &str, showdown: f64| {
            Node::decision(
                Player::Y,
                key,
                [
                    ("check", Node::terminal(showdown * pot)),
                    ("bet", respond(showdown)),
                ],
            )
        };

        let root = Node::chance([
            ("Y hand = nuts", 0.5, y_turn("Y:nuts", -1.0)),
            ("Y hand = bluff", 0.5, y_turn("Y:bluff", 1.0)),
        ]);

        Ok(Tree::new(root)
            .with_description("Y:nuts", "Y decisions with winning hand")
            .with_description("Y:bluff", "Y decisions with losing hand")
            .with_description("X:bet_response", "X response after Y bets"))
    }

    fn reference(&self) -> Option<Reference> {
        self.validate().ok()?;

        let bluff = self.bluff_frequency();
        let call = self.call_frequency();
        Some(
            Reference::new()
                .with_strategy("Y:nuts", [0.0, 1.0])
                .with_strategy("Y:bluff", [1.0 - bluff, bluff])
                .with_strategy("X:bet_response", [1.0 - call, call])
                .with_value(self.value_x()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cfr::solver::solve;

    #[test]
    fn test_tree_shape() {
        let tree = ClairvoyanceGame::default().build_tree().unwrap();
        let specs = tree.info_sets().unwrap();

        assert_eq!(specs.len(), 3);
        assert_eq!(specs["X:bet_response"].nodes, 2);
        assert_eq!(specs["Y:nuts"].actions, vec!["check", "bet"]);
        assert_eq!(tree.depth(), 3);
    }

    #[test]
    fn test_payoffs() {
        let tree = ClairvoyanceGame::new(2.0, 1.0).build_tree().unwrap();
        let root = tree.root();
        let payoff = |path: &[&str]| {
            path.iter()
                .try_fold(root, |node, label| node.child(label))
                .and_then(|n| n.payoff())
        };

        assert_eq!(payoff(&["Y hand = nuts", "check"]), Some(-2.0));
        assert_eq!(payoff(&["Y hand = nuts", "bet", "fold"]), Some(-2.0));
        assert_eq!(payoff(&["Y hand = nuts", "bet", "call"]), Some(-3.0));
        assert_eq!(payoff(&["Y hand = bluff", "check"]), Some(2.0));
        assert_eq!(payoff(&["Y hand = bluff", "bet", "fold"]), Some(-2.0));
        assert_eq!(payoff(&["Y hand = bluff", "bet", "call"]), Some(3.0));
    }

    #[test]
    fn test_closed_form() {
        let game = ClairvoyanceGame::default();
        assert!((game.bluff_frequency() - 1.0 / 3.0).abs() < 1e-12);
        assert!((game.call_frequency() - 2.0 / 3.0).abs() < 1e-12);
        assert!((game.value_x() + 1.0 / 3.0).abs() < 1e-12);

        // Playing the reference profile by hand yields the closed-form value.
        let (p, b) = (game.pot_size, game.bet_size);
        let (bluff, call) = (game.bluff_frequency(), game.call_frequency());
        let facing_bet = |showdown: f64| (1.0 - call) * -p + call * showdown * (p + b);
        let nuts = facing_bet(-1.0);
        let weak = (1.0 - bluff) * p + bluff * facing_bet(1.0);
        assert!((0.5 * nuts + 0.5 * weak - game.value_x()).abs() < 1e-12);
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(ClairvoyanceGame::new(-1.0, 1.0).build_tree().is_err());
        assert!(ClairvoyanceGame::new(1.0, 0.0).build_tree().is_err());
        assert!(ClairvoyanceGame::new(1.0, 0.0).reference().is_none());
        // A zero pot is still a game.
        assert!(ClairvoyanceGame::new(0.0, 1.0).build_tree().is_ok());
    }

    #[test]
    fn test_mccfr_matches_closed_form() {
        let game = ClairvoyanceGame::default();
        let tree = game.build_tree().unwrap();
        let report = solve(&tree, 200_000, 42).unwrap();

        let reference = game.reference().unwrap();
        let deviation = reference.max_deviation(&report).unwrap();
        assert!(deviation < 0.05, "deviation {}\n{}", deviation, report);

        let error = reference.value_error(&report, &tree).unwrap().unwrap();
        assert!(error < 0.02, "value error {}", error);
        assert!((report.game_value(Player::X) - game.value_x()).abs() < 0.02);
    }
}
