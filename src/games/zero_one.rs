//! The [0,1] half-street games.
//!
//! Both players hold a hand uniform on [0,1], **lower values stronger**,
//! discretised into `num_buckets` equal buckets whose midpoints decide the
//! showdown. The pot holds `P`; X checks in the dark and Y may check
//! (showdown for the pot) or bet `B`.
//!
//! - [`ZeroOneGame1`]: X must call a bet. Y bets exactly the hands better
//!   than the median, and X's value is `-B / 4`.
//! - [`ZeroOneGame2`]: X may fold to a bet and lose the pot. Y value-bets
//!   below `a`, checks between `a` and `b` and bluffs above `b`, with
//!
//!   ```text
//!   b = (2P + B)² / ((2P + B)² + PB)
//!   a = P b / (2P + B)
//!   ```
//!
//!   X calls a total fraction `c = 2a` of hands. Every X hand between `a` and
//!   `b` beats the same bluffs and loses to the same value bets, so only the
//!   calls below `a` and folds above `b` are pinned.
//!
//! Payoffs are in pot units from X's view: ±P for a checked showdown, -P when
//! X folds, ±(P + B) for a called bet and 0 on a tie.

use serde::{Deserialize, Serialize};

use crate::cfr::error::{Result, SolverError};
use crate::cfr::game::{Game, Reference};
use crate::cfr::report::EquilibriumReport;
use crate::cfr::tree::{Node, Player, Tree};

/// Zero-one game #1: X always calls.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZeroOneGame1 {
    /// Pot before Y acts.
    pub pot_size: f64,
    /// Size of Y's bet.
    pub bet_size: f64,
    /// Number of hand-strength buckets per player.
    pub num_buckets: usize,
}

/// Zero-one game #2: X calls or folds facing a bet.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZeroOneGame2 {
    /// Pot before Y acts.
    pub pot_size: f64,
    /// Size of Y's bet.
    pub bet_size: f64,
    /// Number of hand-strength buckets per player.
    pub num_buckets: usize,
}

impl Default for ZeroOneGame1 {
    fn default() -> Self {
        Self::new(1.0, 1.0, 40)
    }
}

impl Default for ZeroOneGame2 {
    fn default() -> Self {
        Self::new(1.0, 1.0, 40)
    }
}

/// Bucket edges this close to a threshold count as lying on it.
const EDGE_TOLERANCE: f64 = 1e-9;

fn bucket_value(num_buckets: usize, index: usize) -> f64 {
    (index as f64 + 0.5) / num_buckets as f64
}

/// `[low, high)` range of hand strengths in bucket `index`, shrunk by
/// [`EDGE_TOLERANCE`] so threshold comparisons ignore rounding.
fn bucket_range(num_buckets: usize, index: usize) -> (f64, f64) {
    let width = 1.0 / num_buckets as f64;
    let low = index as f64 * width;
    (low + EDGE_TOLERANCE, low + width - EDGE_TOLERANCE)
}

/// Information-set key of `player` holding bucket `index`.
fn bucket_key(player: Player, index: usize) -> String {
    format!("{}:bucket[{}]", player, index)
}

fn showdown(stake: f64, y_value: f64, x_value: f64) -> f64 {
    if x_value < y_value {
        stake
    } else if y_value < x_value {
        -stake
    } else {
        0.0
    }
}

fn validate(pot_size: f64, bet_size: f64, num_buckets: usize) -> Result<()> {
    if !pot_size.is_finite() || pot_size < 0.0 {
        return Err(SolverError::invalid_config(format!(
            "pot size must be non-negative, got {}",
            pot_size
        )));
    }
    if !bet_size.is_finite() || bet_size <= 0.0 {
        return Err(SolverError::invalid_config(format!(
            "bet size must be positive, got {}",
            bet_size
        )));
    }
    if num_buckets < 2 {
        return Err(SolverError::invalid_config("num_buckets must be at least 2"));
    }
    Ok(())
}

/// Mean probability of `action` over all of `player`'s buckets.
fn mean_probability(
    report: &EquilibriumReport,
    num_buckets: usize,
    player: Player,
    action: &str,
) -> Option<f64> {
    let mut total = 0.0;
    for i in 0..num_buckets {
        total += report.strategy(&bucket_key(player, i))?.probability(action)?;
    }
    Some(total / num_buckets as f64)
}

/// Chance node dealing X a bucket, then `after_deal` for each X bucket.
fn deal_x<F>(num_buckets: usize, mut after_deal: F) -> Node
where
    F: FnMut(usize) -> Node,
{
    let p = 1.0 / num_buckets as f64;
    Node::chance((0..num_buckets).map(|x| (format!("X bucket {}", x), p, after_deal(x))))
}

impl ZeroOneGame1 {
    /// Create a game.
    pub fn new(pot_size: f64, bet_size: f64, num_buckets: usize) -> Self {
        Self {
            pot_size,
            bet_size,
            num_buckets,
        }
    }

    /// Builder method: set the number of buckets.
    pub fn with_buckets(mut self, num_buckets: usize) -> Self {
        self.num_buckets = num_buckets;
        self
    }

    /// Y bets hands stronger (lower) than this.
    pub fn bet_threshold(&self) -> f64 {
        0.5
    }

    /// X's equilibrium value.
    pub fn value_x(&self) -> f64 {
        let t = self.bet_threshold();
        self.bet_size * (t * t - t)
    }

    /// Mean probability that Y bets, over all buckets.
    pub fn estimated_bet_frequency(&self, report: &EquilibriumReport) -> Option<f64> {
        mean_probability(report, self.num_buckets, Player::Y, "bet")
    }
}

impl Game for ZeroOneGame1 {
    fn name(&self) -> String {
        format!(
            "zero-one #1 (P={}, B={}, {} buckets)",
            self.pot_size, self.bet_size, self.num_buckets
        )
    }

    fn build_tree(&self) -> Result<Tree> {
        validate(self.pot_size, self.bet_size, self.num_buckets)?;

        let n = self.num_buckets;
        let p = 1.0 / n as f64;
        let called = self.pot_size + self.bet_size;

        let root = Node::chance((0..n).map(|y| {
            let y_value = bucket_value(n, y);
            let settle = |stake: f64| {
                deal_x(n, |x| Node::terminal(showdown(stake, y_value, bucket_value(n, x))))
            };
            let y_node = Node::decision(
                Player::Y,
                bucket_key(Player::Y, y),
                [("bet", settle(called)), ("check", settle(self.pot_size))],
            );
            (format!("Y bucket {}", y), p, y_node)
        }));

        let mut tree = Tree::new(root);
        for i in 0..n {
            tree = tree.with_description(
                bucket_key(Player::Y, i),
                format!("Y decision with hand bucket {} (~{:.3})", i, bucket_value(n, i)),
            );
        }
        Ok(tree)
    }

    /// Every bucket lies on one side of the median except the middle one of
    /// an odd count, which is indifferent.
    fn reference(&self) -> Option<Reference> {
        validate(self.pot_size, self.bet_size, self.num_buckets).ok()?;

        let threshold = self.bet_threshold();
        let mut reference = Reference::new().with_value(self.value_x());
        for i in 0..self.num_buckets {
            let (low, high) = bucket_range(self.num_buckets, i);
            if high <= threshold {
                reference = reference.with_strategy(bucket_key(Player::Y, i), [1.0, 0.0]);
            } else if low >= threshold {
                reference = reference.with_strategy(bucket_key(Player::Y, i), [0.0, 1.0]);
            }
        }
        Some(reference)
    }
}

impl ZeroOneGame2 {
    /// Create a game.
    pub fn new(pot_size: f64, bet_size: f64, num_buckets: usize) -> Self {
        Self {
            pot_size,
            bet_size,
            num_buckets,
        }
    }

    /// Builder method: set the number of buckets.
    pub fn with_buckets(mut self, num_buckets: usize) -> Self {
        self.num_buckets = num_buckets;
        self
    }

    /// Y value-bets hands stronger (lower) than this.
    pub fn value_threshold(&self) -> f64 {
        self.pot_size * self.bluff_threshold() / (2.0 * self.pot_size + self.bet_size)
    }

    /// Y bluffs with hands weaker (higher) than this.
    pub fn bluff_threshold(&self) -> f64 {
        let bettor = 2.0 * self.pot_size + self.bet_size;
        bettor * bettor / (bettor * bettor + self.pot_size * self.bet_size)
    }

    /// Fraction of hands X calls a bet with.
    pub fn call_threshold(&self) -> f64 {
        2.0 * self.value_threshold()
    }

    /// Fraction of hands Y bets.
    pub fn bet_frequency(&self) -> f64 {
        self.value_threshold() + 1.0 - self.bluff_threshold()
    }

    /// X's equilibrium value.
    pub fn value_x(&self) -> f64 {
        let (pot, bet) = (self.pot_size, self.bet_size);
        let a = self.value_threshold();
        let b = self.bluff_threshold();
        let c = self.call_threshold();

        (pot + bet) * (a * a - c * a) - pot * (1.0 - c) * a
            + pot * ((b * b - b) - (a * a - a))
            + (1.0 - b) * ((pot + bet) * c - pot * (1.0 - c))
    }

    /// Mean probability of the aggressive action (Y bet, X call) over all of
    /// `player`'s buckets.
    pub fn estimated_frequency(&self, report: &EquilibriumReport, player: Player) -> Option<f64> {
        let action = match player {
            Player::X => "call",
            Player::Y => "bet",
        };
        mean_probability(report, self.num_buckets, player, action)
    }
}

impl Game for ZeroOneGame2 {
    fn name(&self) -> String {
        format!(
            "zero-one #2 (P={}, B={}, {} buckets)",
            self.pot_size, self.bet_size, self.num_buckets
        )
    }

    fn build_tree(&self) -> Result<Tree> {
        validate(self.pot_size, self.bet_size, self.num_buckets)?;

        let n = self.num_buckets;
        let p = 1.0 / n as f64;
        let pot = self.pot_size;
        let called = self.pot_size + self.bet_size;

        let root = Node::chance((0..n).map(|y| {
            let y_value = bucket_value(n, y);
            let check = deal_x(n, |x| Node::terminal(showdown(pot, y_value, bucket_value(n, x))));
            let bet = deal_x(n, |x| {
                Node::decision(
                    Player::X,
                    bucket_key(Player::X, x),
                    [
                        ("fold", Node::terminal(-pot)),
                        ("call", Node::terminal(showdown(called, y_value, bucket_value(n, x)))),
                    ],
                )
            });
            let y_node = Node::decision(
                Player::Y,
                bucket_key(Player::Y, y),
                [("check", check), ("bet", bet)],
            );
            (format!("Y bucket {}", y), p, y_node)
        }));

        let mut tree = Tree::new(root);
        for i in 0..n {
            let value = bucket_value(n, i);
            tree = tree
                .with_description(
                    bucket_key(Player::Y, i),
                    format!("Y decision with hand bucket {} (~{:.3})", i, value),
                )
                .with_description(
                    bucket_key(Player::X, i),
                    format!("X response to a bet with hand bucket {} (~{:.3})", i, value),
                );
        }
        Ok(tree)
    }

    fn reference(&self) -> Option<Reference> {
        validate(self.pot_size, self.bet_size, self.num_buckets).ok()?;

        let a = self.value_threshold();
        let b = self.bluff_threshold();
        let mut reference = Reference::new().with_value(self.value_x());

        for i in 0..self.num_buckets {
            let (low, high) = bucket_range(self.num_buckets, i);
            let (y_key, x_key) = (bucket_key(Player::Y, i), bucket_key(Player::X, i));
            if high <= a {
                reference = reference
                    .with_strategy(y_key, [0.0, 1.0])
                    .with_strategy(x_key, [0.0, 1.0]);
            } else if low >= b {
                reference = reference
                    .with_strategy(y_key, [0.0, 1.0])
                    .with_strategy(x_key, [1.0, 0.0]);
            } else if low >= a && high <= b {
                reference = reference.with_strategy(y_key, [1.0, 0.0]);
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
    fn test_tree_shapes() {
        let first = ZeroOneGame1::default().with_buckets(4).build_tree().unwrap();
        let specs = first.info_sets().unwrap();
        assert_eq!(specs.len(), 4);
        assert_eq!(specs["Y:bucket[0]"].actions, vec!["bet", "check"]);
        assert_eq!(first.depth(), 3);

        let called = first
            .root()
            .child("Y bucket 3")
            .and_then(|n| n.child("bet"))
            .and_then(|n| n.child("X bucket 0"))
            .and_then(|n| n.payoff());
        assert_eq!(called, Some(2.0));

        let second = ZeroOneGame2::default().with_buckets(4).build_tree().unwrap();
        let specs = second.info_sets().unwrap();
        assert_eq!(specs.len(), 8);
        assert_eq!(specs["X:bucket[1]"].nodes, 4);
        assert_eq!(specs["X:bucket[1]"].actions, vec!["fold", "call"]);
        assert_eq!(second.depth(), 4);
        assert!(second.description("X:bucket[2]").unwrap().contains("0.625"));

        let fold = second
            .root()
            .child("Y bucket 0")
            .and_then(|n| n.child("bet"))
            .and_then(|n| n.child("X bucket 0"))
            .and_then(|n| n.child("fold"))
            .and_then(|n| n.payoff());
        assert_eq!(fold, Some(-1.0));
    }

    #[test]
    fn test_closed_forms() {
        let first = ZeroOneGame1::default();
        assert_eq!(first.value_x(), -0.25);
        let reference = first.with_buckets(5).reference().unwrap();
        assert_eq!(reference.strategies["Y:bucket[1]"], vec![1.0, 0.0]);
        assert!(!reference.strategies.contains_key("Y:bucket[2]"));
        assert_eq!(reference.strategies["Y:bucket[3]"], vec![0.0, 1.0]);

        let second = ZeroOneGame2::default();
        assert!((second.value_threshold() - 0.3).abs() < 1e-12);
        assert!((second.bluff_threshold() - 0.9).abs() < 1e-12);
        assert!((second.call_threshold() - 0.6).abs() < 1e-12);
        assert!((second.bet_frequency() - 0.4).abs() < 1e-12);
        assert!((second.value_x() + 0.1).abs() < 1e-12);

        let reference = second.with_buckets(10).reference().unwrap();
        assert_eq!(reference.strategies["Y:bucket[2]"], vec![0.0, 1.0]);
        assert_eq!(reference.strategies["X:bucket[2]"], vec![0.0, 1.0]);
        assert_eq!(reference.strategies["Y:bucket[5]"], vec![1.0, 0.0]);
        assert!(!reference.strategies.contains_key("X:bucket[5]"));
        assert_eq!(reference.strategies["Y:bucket[9]"], vec![0.0, 1.0]);
        assert_eq!(reference.strategies["X:bucket[9]"], vec![1.0, 0.0]);
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(ZeroOneGame1::new(-1.0, 1.0, 10).build_tree().is_err());
        assert!(ZeroOneGame1::new(1.0, 0.0, 10).build_tree().is_err());
        assert!(ZeroOneGame1::new(1.0, 1.0, 1).reference().is_none());
        assert!(ZeroOneGame2::new(1.0, f64::NAN, 10).build_tree().is_err());
        assert!(ZeroOneGame2::new(1.0, 1.0, 0).build_tree().is_err());
    }

    #[test]
    fn test_mccfr_game_one() {
        let game = ZeroOneGame1::default().with_buckets(10);
        let tree = game.build_tree().unwrap();
        let report = solve(&tree, 200_000, 9).unwrap();
        let reference = game.reference().unwrap();

        let deviation = reference.max_deviation(&report).unwrap();
        assert!(deviation < 0.05, "max deviation {}", deviation);
        let error = reference.value_error(&report, &tree).unwrap().unwrap();
        assert!(error < 0.01, "value error {}", error);

        let bet = game.estimated_bet_frequency(&report).unwrap();
        assert!((bet - 0.5).abs() < 0.05, "bet frequency {}", bet);
    }

    #[test]
    fn test_mccfr_game_two() {
        // With P = 2 no threshold falls on a bucket edge.
        let game = ZeroOneGame2::new(2.0, 1.0, 10);
        let tree = game.build_tree().unwrap();
        let report = solve(&tree, 200_000, 9).unwrap();
        let reference = game.reference().unwrap();

        let deviation = reference.max_deviation(&report).unwrap();
        assert!(deviation < 0.1, "max deviation {}", deviation);
        let error = reference.value_error(&report, &tree).unwrap().unwrap();
        assert!(error < 0.015, "value error {}", error);

        let call = game.estimated_frequency(&report, Player::X).unwrap();
        assert!((call - game.call_threshold()).abs() < 0.05, "call frequency {}", call);
        let bet = game.estimated_frequency(&report, Player::Y).unwrap();
        assert!((bet - game.bet_frequency()).abs() < 0.06, "bet frequency {}", bet);
    }
}
