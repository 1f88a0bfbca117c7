//! Simultaneous-move zero-sum matrix games.
//!
//! A matrix game becomes a three-level tree: a trivial chance node, the first
//! mover's decision, and one second-mover decision per first-mover action.
//! All second-mover nodes share one information-set key, so the second mover
//! cannot see the first move and play is effectively simultaneous.
//!
//! ```text
//! chance ── start (p=1)
//!   └── Y [Y:choice]
//!       ├── rock     ── X [X:choice] ── rock / paper / scissors
//!       ├── paper    ── X [X:choice] ── rock / paper / scissors
//!       └── scissors ── X [X:choice] ── rock / paper / scissors
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::cfr::error::{Result, SolverError};
use crate::cfr::game::{Game, Reference};
use crate::cfr::tree::{Node, Player, Tree};

const HEADS_TAILS: &[&str] = &["heads", "tails"];
const NONE_PENNY: &[&str] = &["none", "penny"];
const RPS: &[&str] = &["rock", "paper", "scissors"];
const RPSF: &[&str] = &["rock", "paper", "scissors", "flower"];
const COP: &[&str] = &["patrol", "stand_down"];
const ROBBER: &[&str] = &["rob", "stay_home"];

/// X's payoff in roshambo-F, indexed `[y_action][x_action]`.
const FLOWER_TABLE: [[f64; 4]; 4] = [
    [0.0, 1.0, -1.0, -1.0],
    [-1.0, 0.0, 1.0, 0.0],
    [1.0, -1.0, 0.0, -1.0],
    [1.0, 0.0, 1.0, 0.0],
];

/// The bundled matrix games and their parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "game", rename_all = "snake_case")]
pub enum MatrixKind {
    /// X wins `payoff` when both coins match, Y wins otherwise. X moves first.
    MatchingPennies {
        /// Stake.
        payoff: f64,
    },
    /// Each player shows a penny or none; X ("odds") wins `payoff` when the
    /// number of pennies is odd. Y moves first.
    OddsAndEvens {
        /// Stake.
        payoff: f64,
    },
    /// Rock-paper-scissors. Y moves first.
    Roshambo {
        /// Stake.
        payoff: f64,
    },
    /// Rock-paper-scissors where winning with scissors pays `scissors_bonus`.
    RoshamboS {
        /// Stake for rock and paper wins.
        payoff: f64,
        /// Stake for scissors wins.
        scissors_bonus: f64,
    },
    /// Rock-paper-scissors plus a dominated "flower" action.
    RoshamboF {
        /// Stake.
        payoff: f64,
    },
    /// A cop (X) decides to patrol, a robber (Y) decides to rob. X moves first.
    CopsAndRobbers {
        /// Cost to the cop of a wasted patrol.
        patrol_cost: f64,
        /// Cop's reward for catching a robbery.
        arrest_reward: f64,
        /// Robber's gain from an unpatrolled robbery.
        robbery_reward: f64,
    },
}

/// A two-player zero-sum matrix game played as an extensive-form tree.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatrixGame {
    kind: MatrixKind,
}

impl MatrixGame {
    /// Wrap a game kind.
    pub fn new(kind: MatrixKind) -> Self {
        Self { kind }
    }

    /// Matching pennies.
    pub fn matching_pennies(payoff: f64) -> Self {
        Self::new(MatrixKind::MatchingPennies { payoff })
    }

    /// Odds and evens.
    pub fn odds_and_evens(payoff: f64) -> Self {
        Self::new(MatrixKind::OddsAndEvens { payoff })
    }

    /// Rock-paper-scissors.
    pub fn roshambo(payoff: f64) -> Self {
        Self::new(MatrixKind::Roshambo { payoff })
    }

    /// Rock-paper-scissors with a scissors bonus.
    pub fn roshambo_s(payoff: f64, scissors_bonus: f64) -> Self {
        Self::new(MatrixKind::RoshamboS {
            payoff,
            scissors_bonus,
        })
    }

    /// Rock-paper-scissors-flower.
    pub fn roshambo_f(payoff: f64) -> Self {
        Self::new(MatrixKind::RoshamboF { payoff })
    }

    /// Cops and robbers.
    pub fn cops_and_robbers(patrol_cost: f64, arrest_reward: f64, robbery_reward: f64) -> Self {
        Self::new(MatrixKind::CopsAndRobbers {
            patrol_cost,
            arrest_reward,
            robbery_reward,
        })
    }

    /// The game kind and parameters.
    pub fn kind(&self) -> MatrixKind {
        self.kind
    }

    /// Player at the root decision.
    pub fn first_mover(&self) -> Player {
        match self.kind {
            MatrixKind::MatchingPennies { .. } | MatrixKind::CopsAndRobbers { .. } => Player::X,
            _ => Player::Y,
        }
    }

    /// Action labels for `player`.
    pub fn actions(&self, player: Player) -> &'static [&'static str] {
        match (self.kind, player) {
            (MatrixKind::MatchingPennies { .. }, _) => HEADS_TAILS,
            (MatrixKind::OddsAndEvens { .. }, _) => NONE_PENNY,
            (MatrixKind::Roshambo { .. }, _) | (MatrixKind::RoshamboS { .. }, _) => RPS,
            (MatrixKind::RoshamboF { .. }, _) => RPSF,
            (MatrixKind::CopsAndRobbers { .. }, Player::X) => COP,
            (MatrixKind::CopsAndRobbers { .. }, Player::Y) => ROBBER,
        }
    }

    /// X's payoff when X plays action `x` and Y plays action `y` (indices).
    pub fn payoff(&self, x: usize, y: usize) -> f64 {
        match self.kind {
            MatrixKind::MatchingPennies { payoff } => {
                if x == y {
                    payoff
                } else {
                    -payoff
                }
            }
            MatrixKind::OddsAndEvens { payoff } => {
                // Index 1 is "penny".
                if (x + y) % 2 == 1 {
                    payoff
                } else {
                    -payoff
                }
            }
            MatrixKind::Roshambo { payoff } => payoff * rps_outcome(x, y),
            MatrixKind::RoshamboS {
                payoff,
                scissors_bonus,
            } => {
                let stake = |winner: usize| if winner == 2 { scissors_bonus } else { payoff };
                match rps_outcome(x, y) {
                    o if o > 0.0 => stake(x),
                    o if o < 0.0 => -stake(y),
                    _ => 0.0,
                }
            }
            MatrixKind::RoshamboF { payoff } => payoff * FLOWER_TABLE[y][x],
            MatrixKind::CopsAndRobbers {
                patrol_cost,
                arrest_reward,
                robbery_reward,
            } => match (x, y) {
                (0, 0) => arrest_reward,
                (0, _) => -patrol_cost,
                (_, 0) => -robbery_reward,
                _ => 0.0,
            },
        }
    }

    fn validate(&self) -> Result<()> {
        let positive = |name: &str, value: f64| {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(SolverError::invalid_config(format!(
                    "{} must be positive, got {}",
                    name, value
                )))
            }
        };

        match self.kind {
            MatrixKind::MatchingPennies { payoff }
            | MatrixKind::OddsAndEvens { payoff }
            | MatrixKind::Roshambo { payoff }
            | MatrixKind::RoshamboF { payoff } => positive("payoff", payoff),
            MatrixKind::RoshamboS {
                payoff,
                scissors_bonus,
            } => {
                positive("payoff", payoff)?;
                positive("scissors_bonus", scissors_bonus)
            }
            MatrixKind::CopsAndRobbers {
                patrol_cost,
                arrest_reward,
                robbery_reward,
            } => {
                positive("patrol_cost", patrol_cost)?;
                positive("arrest_reward", arrest_reward)?;
                positive("robbery_reward", robbery_reward)
            }
        }
    }
}

/// +1 if action `x` beats `y` in rock-paper-scissors, -1 if it loses, 0 on a tie.
fn rps_outcome(x: usize, y: usize) -> f64 {
    if x == y {
        0.0
    } else if (x + 3 - y) % 3 == 1 {
        // paper > rock, scissors > paper, rock > scissors
        1.0
    } else {
        -1.0
    }
}

impl fmt::Display for MatrixGame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            MatrixKind::MatchingPennies { payoff } => write!(f, "matching pennies ({})", payoff),
            MatrixKind::OddsAndEvens { payoff } => write!(f, "odds and evens ({})", payoff),
            MatrixKind::Roshambo { payoff } => write!(f, "roshambo ({})", payoff),
            MatrixKind::RoshamboS {
                payoff,
                scissors_bonus,
            } => write!(f, "roshambo-S ({}, scissors {})", payoff, scissors_bonus),
            MatrixKind::RoshamboF { payoff } => write!(f, "roshambo-F ({})", payoff),
            MatrixKind::CopsAndRobbers {
                patrol_cost,
                arrest_reward,
                robbery_reward,
            } => write!(
                f,
                "cops and robbers (patrol {}, arrest {}, robbery {})",
                patrol_cost, arrest_reward, robbery_reward
            ),
        }
    }
}

impl Game for MatrixGame {
    fn name(&self) -> String {
        self.to_string()
    }

    fn build_tree(&self) -> Result<Tree> {
        self.validate()?;

        let first = self.first_mover();
        let second = first.opponent();
        let first_key = format!("{}:choice", first);
        let second_key = format!("{}:choice", second);

        let first_node = Node::decision(
            first,
            first_key.as_str(),
            self.actions(first).iter().enumerate().map(|(i, &first_action)| {
                let second_node = Node::decision(
                    second,
                    second_key.as_str(),
                    self.actions(second).iter().enumerate().map(|(j, &second_action)| {
                        let (x, y) = match first {
                            Player::X => (i, j),
                            Player::Y => (j, i),
                        };
                        (second_action, Node::terminal(self.payoff(x, y)))
                    }),
                );
                (first_action, second_node)
            }),
        );

        let describe = |player: Player| format!("{} chooses {}", player, self.actions(player).join("/"));
        Ok(Tree::new(Node::chance([("start", 1.0, first_node)]))
            .with_description(first_key.as_str(), describe(first))
            .with_description(second_key.as_str(), describe(second)))
    }

    fn reference(&self) -> Option<Reference> {
        self.validate().ok()?;

        let symmetric = |mix: Vec<f64>| {
            Reference::new()
                .with_strategy("X:choice", mix.clone())
                .with_strategy("Y:choice", mix)
                .with_value(0.0)
        };

        let reference = match self.kind {
            MatrixKind::MatchingPennies { .. } | MatrixKind::OddsAndEvens { .. } => {
                symmetric(vec![0.5, 0.5])
            }
            MatrixKind::Roshambo { .. } => symmetric(vec![1.0 / 3.0; 3]),
            MatrixKind::RoshamboS {
                payoff,
                scissors_bonus,
            } => {
                let ratio = scissors_bonus / payoff;
                let denom = 2.0 + ratio;
                symmetric(vec![ratio / denom, 1.0 / denom, 1.0 / denom])
            }
            MatrixKind::RoshamboF { .. } => symmetric(vec![1.0 / 3.0, 1.0 / 3.0, 1.0 / 3.0, 0.0]),
            MatrixKind::CopsAndRobbers {
                patrol_cost,
                arrest_reward,
                robbery_reward,
            } => {
                let total = patrol_cost + arrest_reward + robbery_reward;
                let patrol = robbery_reward / total;
                let rob = patrol_cost / total;
                Reference::new()
                    .with_strategy("X:choice", [patrol, 1.0 - patrol])
                    .with_strategy("Y:choice", [rob, 1.0 - rob])
                    .with_value(rob * arrest_reward - (1.0 - rob) * patrol_cost)
            }
        };
        Some(reference)
    }
}
