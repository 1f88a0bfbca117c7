//! The [0,1] jam-or-fold games.
//!
//! Y (the small blind) either folds or jams its whole stack; X (the big blind)
//! calls or folds facing a jam. Hand strengths are uniform on [0,1] with
//! **lower values stronger**, discretised into `num_buckets` equal buckets
//! whose midpoints decide the showdown.
//!
//! Two showdown rules are supported (see [`Showdown`]). With
//! `WinnerTakesAll` the better hand wins the whole stack; with
//! `TwoThirdsEquity` it only holds two thirds of the pot, so a showdown
//! moves a third of the stack. Call the chips moved at showdown `k`.
//!
//! Payoffs are divided by the stack:
//!
//! | outcome | X payoff |
//! |---|---|
//! | Y folds | `+small_blind / stack` |
//! | Y jams, X folds | `-big_blind / stack` |
//! | showdown | `+k / stack` if X's bucket is stronger, `-k / stack` if weaker, 0 on a tie |
//!
//! Closed form for the continuous game, with blinds `bb` and `sb`:
//!
//! - if `k >= bb`, X calls below `c = (bb + sb) / (bb + k)` and Y jams a
//!   fraction `2ck / (k + bb)` of hands;
//! - if `k < bb`, calling always beats folding, so X calls everything and Y
//!   jams its best `(k + sb) / 2k` of hands.
//!
//! With the default blinds this gives `1.5 / (S + 1)` and `3S / (S + 1)²`
//! for the first rule, `S` being the stack in big blinds. While X's threshold
//! is below 1, every hand weaker than it has the same jam value, so only Y's
//! *strong* hands are pinned to jamming.

use serde::{Deserialize, Serialize};

use crate::cfr::error::{Result, SolverError};
use crate::cfr::game::{Game, Reference};
use crate::cfr::report::EquilibriumReport;
use crate::cfr::tree::{Node, Player, Tree};

/// How a called jam is settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Showdown {
    /// The better hand wins the whole stack.
    #[default]
    WinnerTakesAll,
    /// The better hand holds two thirds of the pot.
    TwoThirdsEquity,
}

/// Jam-or-fold game parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JamOrFoldGame {
    /// Effective stack.
    pub stack_size: f64,
    /// X's blind.
    pub big_blind: f64,
    /// Y's blind.
    pub small_blind: f64,
    /// Number of hand-strength buckets per player.
    pub num_buckets: usize,
    /// Showdown rule.
    #[serde(default)]
    pub showdown: Showdown,
}

impl Default for JamOrFoldGame {
    fn default() -> Self {
        Self {
            stack_size: 10.0,
            big_blind: 1.0,
            small_blind: 0.5,
            num_buckets: 40,
            showdown: Showdown::WinnerTakesAll,
        }
    }
}

impl JamOrFoldGame {
    /// Create a game.
    pub fn new(stack_size: f64, big_blind: f64, small_blind: f64, num_buckets: usize) -> Self {
        Self {
            stack_size,
            big_blind,
            small_blind,
            num_buckets,
            showdown: Showdown::WinnerTakesAll,
        }
    }

    /// Builder method: set the number of buckets.
    pub fn with_buckets(mut self, num_buckets: usize) -> Self {
        self.num_buckets = num_buckets;
        self
    }

    /// Builder method: set the showdown rule.
    pub fn with_showdown(mut self, showdown: Showdown) -> Self {
        self.showdown = showdown;
        self
    }

    /// Chips that change hands at showdown.
    pub fn showdown_stake(&self) -> f64 {
        match self.showdown {
            Showdown::WinnerTakesAll => self.stack_size,
            Showdown::TwoThirdsEquity => self.stack_size / 3.0,
        }
    }

    /// Midpoint strength of bucket `index`.
    pub fn bucket_value(&self, index: usize) -> f64 {
        (index as f64 + 0.5) / self.num_buckets as f64
    }

    /// Information-set key of `player` holding bucket `index`.
    pub fn bucket_key(player: Player, index: usize) -> String {
        format!("{}:bucket[{}]", player, index)
    }

    /// X calls with hands stronger (lower) than this.
    pub fn call_threshold(&self) -> f64 {
        let stake = self.showdown_stake();
        if stake < self.big_blind {
            return 1.0;
        }
        ((self.big_blind + self.small_blind) / (self.big_blind + stake)).min(1.0)
    }

    /// Fraction of hands Y jams.
    pub fn jam_frequency(&self) -> f64 {
        let stake = self.showdown_stake();
        if stake < self.big_blind {
            return ((stake + self.small_blind) / (2.0 * stake)).min(1.0);
        }
        (2.0 * self.call_threshold() * stake / (stake + self.big_blind)).min(1.0)
    }

    /// X's equilibrium value, in stacks.
    pub fn value_x(&self) -> f64 {
        let stake = self.showdown_stake();
        let y_chips = if stake < self.big_blind {
            let jam = self.jam_frequency();
            stake * (jam - jam * jam) - (1.0 - jam) * self.small_blind
        } else {
            let call = self.call_threshold();
            (1.0 - call) * (call * self.big_blind - self.small_blind)
        };
        -y_chips / self.stack_size
    }

    /// Mean probability of the aggressive action (Y jam, X call) over all of
    /// `player`'s buckets in `report`.
    ///
    /// `None` if any bucket is missing from the report.
    pub fn estimated_frequency(&self, report: &EquilibriumReport, player: Player) -> Option<f64> {
        let action = match player {
            Player::X => "call",
            Player::Y => "jam",
        };
        let mut total = 0.0;
        for i in 0..self.num_buckets {
            total += report
                .strategy(&Self::bucket_key(player, i))?
                .probability(action)?;
        }
        Some(total / self.num_buckets as f64)
    }

    fn showdown(&self, y_value: f64, x_value: f64) -> f64 {
        let stake = self.showdown_stake() / self.stack_size;
        if x_value < y_value {
            stake
        } else if y_value < x_value {
            -stake
        } else {
            0.0
        }
    }

    fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("stack_size", self.stack_size),
            ("big_blind", self.big_blind),
            ("small_blind", self.small_blind),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(SolverError::invalid_config(format!(
                    "{} must be positive, got {}",
                    name, value
                )));
            }
        }
        if self.stack_size < self.big_blind {
            return Err(SolverError::invalid_config(
                "stack_size must be at least the big blind",
            ));
        }
        if self.small_blind >= self.big_blind {
            return Err(SolverError::invalid_config(
                "small_blind must be below the big blind",
            ));
        }
        if self.num_buckets < 2 {
            return Err(SolverError::invalid_config("num_buckets must be at least 2"));
        }
        Ok(())
    }
}

impl Game for JamOrFoldGame {
    fn name(&self) -> String {
        let variant = match self.showdown {
            Showdown::WinnerTakesAll => "jam-or-fold",
            Showdown::TwoThirdsEquity => "jam-or-fold #2",
        };
        format!(
            "{} (S={}, {} buckets)",
            variant, self.stack_size, self.num_buckets
        )
    }

    fn build_tree(&self) -> Result<Tree> {
        self.validate()?;

        let n = self.num_buckets;
        let p = 1.0 / n as f64;
        let scale = 1.0 / self.stack_size;
        let y_folds = self.small_blind * scale;
        let x_folds = -self.big_blind * scale;

        let root = Node::chance((0..n).map(|y| {
            let y_value = self.bucket_value(y);
            let x_deal = Node::chance((0..n).map(|x| {
                let x_node = Node::decision(
                    Player::X,
                    Self::bucket_key(Player::X, x),
                    [
                        ("fold", Node::terminal(x_folds)),
                        ("call", Node::terminal(self.showdown(y_value, self.bucket_value(x)))),
                    ],
                );
                (format!("X bucket {}", x), p, x_node)
            }));
            let y_node = Node::decision(
                Player::Y,
                Self::bucket_key(Player::Y, y),
                [("fold", Node::terminal(y_folds)), ("jam", x_deal)],
            );
            (format!("Y bucket {}", y), p, y_node)
        }));

        let mut tree = Tree::new(root);
        for i in 0..n {
            let value = self.bucket_value(i);
            tree = tree
                .with_description(
                    Self::bucket_key(Player::Y, i),
                    format!("Y decision with hand bucket {} (~{:.3})", i, value),
                )
                .with_description(
                    Self::bucket_key(Player::X, i),
                    format!("X response with hand bucket {} (~{:.3})", i, value),
                );
        }
        Ok(tree)
    }

    /// Pure threshold strategies for every bucket that lies entirely on one
    /// side of a threshold, plus X's value. Y's hands weaker than X's calling
    /// threshold are left out since any mix with the right total jam
    /// frequency is an equilibrium; when X calls everything, Y's folding
    /// range is pinned too.
    fn reference(&self) -> Option<Reference> {
        self.validate().ok()?;

        let call = self.call_threshold();
        let jam = self.jam_frequency();
        let calls_everything = self.showdown_stake() < self.big_blind;
        let width = 1.0 / self.num_buckets as f64;
        let mut reference = Reference::new().with_value(self.value_x());

        for i in 0..self.num_buckets {
            let low = i as f64 * width;
            let high = low + width;
            if high <= call {
                reference = reference.with_strategy(Self::bucket_key(Player::X, i), [0.0, 1.0]);
            } else if low >= call {
                reference = reference.with_strategy(Self::bucket_key(Player::X, i), [1.0, 0.0]);
            }
            if high <= call.min(jam) {
                reference = reference.with_strategy(Self::bucket_key(Player::Y, i), [0.0, 1.0]);
            } else if calls_everything && low >= jam {
                reference = reference.with_strategy(Self::bucket_key(Player::Y, i), [1.0, 0.0]);
            }
        }
        Some(reference)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cfr::solver::solve;

    #[test]
    fn test_tree_shape() {
        let game = JamOrFoldGame::default().with_buckets(4);
        let tree = game.build_tree().unwrap();
        let specs = tree.info_sets().unwrap();

        assert_eq!(specs.len(), 8);
        assert_eq!(specs["Y:bucket[0]"].nodes, 1);
        assert_eq!(specs["X:bucket[3]"].nodes, 4);
        assert_eq!(specs["X:bucket[3]"].actions, vec!["fold", "call"]);
        assert_eq!(tree.depth(), 4);
        assert!(tree.description("X:bucket[2]").unwrap().contains("0.625"));
    }

    #[test]
    fn test_payoffs_are_scaled() {
        let game = JamOrFoldGame::default().with_buckets(2);
        let tree = game.build_tree().unwrap();
        let y_strong = tree.root().child("Y bucket 0").unwrap();

        assert_eq!(y_strong.child("fold").unwrap().payoff(), Some(0.05));
        let x_weak = y_strong
            .child("jam")
            .and_then(|n| n.child("X bucket 1"))
            .unwrap();
        assert_eq!(x_weak.child("fold").unwrap().payoff(), Some(-0.1));
        assert_eq!(x_weak.child("call").unwrap().payoff(), Some(-1.0));

        let tie = y_strong
            .child("jam")
            .and_then(|n| n.child("X bucket 0"))
            .and_then(|n| n.child("call"))
            .and_then(|n| n.payoff());
        assert_eq!(tie, Some(0.0));
    }

    #[test]
    fn test_closed_form_thresholds() {
        let game = JamOrFoldGame::default();
        assert!((game.call_threshold() - 1.5 / 11.0).abs() < 1e-12);
        assert!((game.jam_frequency() - 30.0 / 121.0).abs() < 1e-12);

        // Short stacks jam everything.
        let short = JamOrFoldGame::new(1.0, 1.0, 0.5, 10);
        assert_eq!(short.jam_frequency(), 0.75);
        assert_eq!(short.call_threshold(), 0.75);

        let reference = game.reference().unwrap();
        // 40 buckets of width 0.025: buckets 0..=4 lie below 0.136.
        assert_eq!(reference.strategies["X:bucket[4]"], vec![0.0, 1.0]);
        assert!(!reference.strategies.contains_key("X:bucket[5]"));
        assert_eq!(reference.strategies["X:bucket[6]"], vec![1.0, 0.0]);
        assert!(!reference.strategies.contains_key("Y:bucket[20]"));
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(JamOrFoldGame::new(0.5, 1.0, 0.5, 10).build_tree().is_err());
        assert!(JamOrFoldGame::new(10.0, 1.0, 0.0, 10).build_tree().is_err());
        assert!(JamOrFoldGame::new(10.0, 1.0, 1.0, 10).build_tree().is_err());
        assert!(JamOrFoldGame::default().with_buckets(1).build_tree().is_err());
        assert!(JamOrFoldGame::default().with_buckets(1).reference().is_none());
    }

    #[test]
    fn test_mccfr_extreme_buckets() {
        let game = JamOrFoldGame::default().with_buckets(10);
        let tree = game.build_tree().unwrap();
        let report = solve(&tree, 200_000, 5).unwrap();

        let prob = |key: &str, action: &str| {
            report.strategy(key).and_then(|s| s.probability(action)).unwrap()
        };
        assert!(prob("Y:bucket[0]", "jam") > 0.9);
        assert!(prob("X:bucket[0]", "call") > 0.9);
        assert!(prob("X:bucket[9]", "fold") > 0.9);

        let call = game.estimated_frequency(&report, Player::X).unwrap();
        assert!((call - game.call_threshold()).abs() < 0.15, "call frequency {}", call);
        assert!(game.estimated_frequency(&report, Player::Y).is_some());

        let error = game.reference().unwrap().value_error(&report, &tree).unwrap().unwrap();
        assert!(error < 0.01, "value error {}", error);
    }

    #[test]
    fn test_value_winner_takes_all() {
        let game = JamOrFoldGame::default();
        let call = 1.5 / 11.0;
        let expected = (1.0 - call) * (0.5 - call) / 10.0;
        assert!((game.value_x() - expected).abs() < 1e-12);
        assert_eq!(game.reference().unwrap().value_x, Some(game.value_x()));
    }

    #[test]
    fn test_two_thirds_equity_thresholds() {
        let game = |stack: f64| {
            JamOrFoldGame::new(stack, 1.0, 0.5, 10).with_showdown(Showdown::TwoThirdsEquity)
        };

        let deep = game(10.0);
        assert!((deep.showdown_stake() - 10.0 / 3.0).abs() < 1e-12);
        assert!((deep.call_threshold() - 4.5 / 13.0).abs() < 1e-12);
        assert!((deep.jam_frequency() - 90.0 / 169.0).abs() < 1e-12);
        assert!((deep.value_x() - 0.010059).abs() < 1e-6);
        assert!(deep.name().starts_with("jam-or-fold #2"));

        let medium = game(4.0);
        assert!((medium.call_threshold() - 9.0 / 14.0).abs() < 1e-12);
        assert!((medium.jam_frequency() - 36.0 / 49.0).abs() < 1e-12);

        // A third of one big blind at showdown costs X less than folding.
        let short = game(1.0);
        assert_eq!(short.call_threshold(), 1.0);
        assert_eq!(short.jam_frequency(), 1.0);
        let reference = short.reference().unwrap();
        assert_eq!(reference.strategies["X:bucket[9]"], vec![0.0, 1.0]);
        assert_eq!(reference.strategies["Y:bucket[9]"], vec![0.0, 1.0]);

        let tree = deep.with_buckets(2).build_tree().unwrap();
        let x_weak = tree
            .root()
            .child("Y bucket 0")
            .and_then(|n| n.child("jam"))
            .and_then(|n| n.child("X bucket 1"))
            .unwrap();
        let call = x_weak.child("call").and_then(|n| n.payoff()).unwrap();
        assert!((call + 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_mccfr_two_thirds_equity() {
        let game = JamOrFoldGame::default()
            .with_buckets(10)
            .with_showdown(Showdown::TwoThirdsEquity);
        let tree = game.build_tree().unwrap();
        let report = solve(&tree, 200_000, 5).unwrap();
        let reference = game.reference().unwrap();

        let deviation = reference.max_deviation(&report).unwrap();
        assert!(deviation < 0.05, "max deviation {}", deviation);
        let error = reference.value_error(&report, &tree).unwrap().unwrap();
        assert!(error < 0.005, "value error {}", error);

        let call = game.estimated_frequency(&report, Player::X).unwrap();
        assert!((call - game.call_threshold()).abs() < 0.1, "call frequency {}", call);
        let jam = game.estimated_frequency(&report, Player::Y).unwrap();
        assert!((jam - game.jam_frequency()).abs() < 0.1, "jam frequency {}", jam);
    }
}
