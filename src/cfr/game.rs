//! Game construction interface.
//!
//! A game supplies the tree; the solver never sees its parameters. Games with
//! an analytic solution also expose it as a [`Reference`], so every bundled
//! game is cross-checked through the same oracle.
//!
//! # Example
//! ```
//! use toy_game_cfr::cfr::{solve, Game, Node, Player, Reference, Result, Tree};
//!
//! /// One player picks left (+1) or right (-1).
//! struct Choice;
//!
//! impl Game for Choice {
//!     fn name(&self) -> String {
//!         "choice".to_string()
//!     }
//!
//!     fn build_tree(&self) -> Result<Tree> {
//!         Ok(Tree::new(Node::decision(
//!             Player::X,
//!             "X:pick",
//!             [("left", Node::terminal(1.0)), ("right", Node::terminal(-1.0))],
//!         )))
//!     }
//!
//!     fn reference(&self) -> Option<Reference> {
//!         Some(Reference::new().with_strategy("X:pick", [1.0, 0.0]).with_value(1.0))
//!     }
//! }
//!
//! let game = Choice;
//! let report = solve(&game.build_tree().unwrap(), 1_000, 1).unwrap();
//! let deviation = game.reference().unwrap().max_deviation(&report).unwrap();
//! assert!(deviation < 0.01);
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::cfr::error::Result;
use crate::cfr::report::EquilibriumReport;
use crate::cfr::tree::{Player, Tree};

/// A parameterised toy game that can build its extensive-form tree.
pub trait Game: Send + Sync {
    /// Short human-readable name, including parameters.
    fn name(&self) -> String;

    /// Build the full tree.
    ///
    /// # Errors
    /// [`SolverError::InvalidConfiguration`](crate::cfr::SolverError::InvalidConfiguration)
    /// when the game parameters cannot describe a game.
    fn build_tree(&self) -> Result<Tree>;

    /// Closed-form equilibrium, if the game has one.
    fn reference(&self) -> Option<Reference> {
        None
    }
}

/// Analytic equilibrium of a game: expected strategies for some information
/// sets and, optionally, X's game value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Reference {
    /// Expected probabilities per information set, in action order.
    pub strategies: BTreeMap<String, Vec<f64>>,
    /// Expected value for X.
    pub value_x: Option<f64>,
}

impl Reference {
    /// Empty reference.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the expected strategy of one information set.
    pub fn with_strategy<I>(mut self, info_key: impl Into<String>, probabilities: I) -> Self
    where
        I: IntoIterator<Item = f64>,
    {
        self.strategies
            .insert(info_key.into(), probabilities.into_iter().collect());
        self
    }

    /// Set the expected value for X.
    pub fn with_value(mut self, value_x: f64) -> Self {
        self.value_x = Some(value_x);
        self
    }

    /// Expected value for `player`.
    pub fn value(&self, player: Player) -> Option<f64> {
        self.value_x.map(|v| player.sign() * v)
    }

    /// Largest absolute difference between a reference probability and the
    /// reported one.
    ///
    /// Returns `None` if the report lacks a referenced information set or an
    /// action count differs. The game value is not included.
    pub fn max_deviation(&self, report: &EquilibriumReport) -> Option<f64> {
        let mut worst: f64 = 0.0;
        for (key, expected) in &self.strategies {
            let actual = &report.strategy(key)?.probabilities;
            if actual.len() != expected.len() {
                return None;
            }
            for (a, e) in actual.iter().zip(expected) {
                worst = worst.max((a - e).abs());
            }
        }
        Some(worst)
    }

    /// Absolute difference between the reference value and X's value when
    /// the reported profile is played exactly on `tree`.
    pub fn value_error(&self, report: &EquilibriumReport, tree: &Tree) -> Result<Option<f64>> {
        match self.value_x {
            Some(expected) => Ok(Some((report.evaluate(tree)? - expected).abs())),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cfr::solver::solve;
    use crate::cfr::tree::Node;

    fn pick_tree() -> Tree {
        Tree::new(Node::decision(
            Player::Y,
            "Y:pick",
            [("low", Node::terminal(2.0)), ("high", Node::terminal(-1.0))],
        ))
    }

    #[test]
    fn test_reference_builders() {
        let reference = Reference::new()
            .with_strategy("Y:pick", [0.0, 1.0])
            .with_value(-1.0);
        assert_eq!(reference.strategies["Y:pick"], vec![0.0, 1.0]);
        assert_eq!(reference.value(Player::X), Some(-1.0));
        assert_eq!(reference.value(Player::Y), Some(1.0));
    }

    #[test]
    fn test_max_deviation_and_value_error() {
        let tree = pick_tree();
        let report = solve(&tree, 2_000, 3).unwrap();

        let reference = Reference::new()
            .with_strategy("Y:pick", [0.0, 1.0])
            .with_value(-1.0);
        assert!(reference.max_deviation(&report).unwrap() < 0.01);
        assert!(reference.value_error(&report, &tree).unwrap().unwrap() < 0.05);

        let missing = Reference::new().with_strategy("X:other", [1.0]);
        assert_eq!(missing.max_deviation(&report), None);

        let wrong_arity = Reference::new().with_strategy("Y:pick", [1.0, 0.0, 0.0]);
        assert_eq!(wrong_arity.max_deviation(&report), None);

        assert_eq!(Reference::new().value_error(&report, &tree).unwrap(), None);
    }
}
