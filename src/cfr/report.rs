//! Equilibrium report produced by a completed solve.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::cfr::error::{Result, SolverError};
use crate::cfr::storage::InfoSetRegistry;
use crate::cfr::tree::{Node, Player, Tree};

/// Probability distribution over the actions of one information set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Strategy {
    /// Action labels.
    pub actions: Vec<String>,
    /// Probability of each action, same order as `actions`.
    pub probabilities: Vec<f64>,
}

impl Strategy {
    /// Probability of the action labelled `action`.
    pub fn probability(&self, action: &str) -> Option<f64> {
        self.actions
            .iter()
            .position(|a| a == action)
            .and_then(|i| self.probabilities.get(i).copied())
    }

    /// `(label, probability)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.actions
            .iter()
            .map(String::as_str)
            .zip(self.probabilities.iter().copied())
    }

    /// Sum of the probabilities (1.0 up to rounding).
    pub fn total(&self) -> f64 {
        self.probabilities.iter().sum()
    }
}

/// Average strategies of every visited information set plus the estimated
/// game value. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquilibriumReport {
    strategies: BTreeMap<String, Strategy>,
    value_x: f64,
    iterations: u64,
    replicas: usize,
}

impl EquilibriumReport {
    /// Normalise the cumulative strategy of every visited set.
    ///
    /// Sets that never accumulated strategy weight are left out.
    pub(crate) fn from_registry(registry: &InfoSetRegistry, iterations: u64, value_x: f64) -> Self {
        let strategies = registry
            .iter()
            .filter_map(|set| {
                let probabilities = set.average_strategy()?;
                let actions = if set.actions().is_empty() {
                    (0..probabilities.len()).map(|i| i.to_string()).collect()
                } else {
                    set.actions().to_vec()
                };
                Some((
                    set.key().to_string(),
                    Strategy {
                        actions,
                        probabilities,
                    },
                ))
            })
            .collect();

        Self {
            strategies,
            value_x,
            iterations,
            replicas: 1,
        }
    }

    /// Average strategy for `info_key`, `None` if it was never visited.
    pub fn strategy(&self, info_key: &str) -> Option<&Strategy> {
        self.strategies.get(info_key)
    }

    /// All strategies, sorted by key.
    pub fn strategies(&self) -> impl Iterator<Item = (&str, &Strategy)> {
        self.strategies.iter().map(|(k, s)| (k.as_str(), s))
    }

    /// Estimated game value for `player`: the mean root payoff observed over
    /// every traversal of the run.
    pub fn game_value(&self, player: Player) -> f64 {
        player.sign() * self.value_x
    }

    /// Iterations behind this report (summed over merged replicas).
    pub fn iterations(&self) -> u64 {
        self.iterations
    }

    /// Number of independent replicas merged into this report.
    pub fn replicas(&self) -> usize {
        self.replicas
    }

    /// Number of reported information sets.
    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    /// True if no information set was visited.
    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    /// Exact expected payoff to X when both players follow the reported
    /// average strategies on `tree`.
    ///
    /// Information sets missing from the report are played uniformly.
    pub fn evaluate(&self, tree: &Tree) -> Result<f64> {
        self.expected_value(tree.root())
    }

    fn expected_value(&self, node: &Node) -> Result<f64> {
        match node {
            Node::Terminal { payoff } => Ok(*payoff),
            Node::Chance { outcomes } => {
                let mut value = 0.0;
                for outcome in outcomes {
                    value += outcome.probability * self.expected_value(&outcome.child)?;
                }
                Ok(value)
            }
            Node::Decision {
                info_key, edges, ..
            } => {
                let uniform;
                let probabilities: &[f64] = match self.strategies.get(info_key) {
                    Some(s) if s.probabilities.len() == edges.len() => &s.probabilities,
                    Some(s) => {
                        return Err(SolverError::InconsistentActionSpace {
                            key: info_key.clone(),
                            expected: s.probabilities.len(),
                            found: edges.len(),
                        })
                    }
                    None => {
                        uniform = vec![1.0 / edges.len() as f64; edges.len()];
                        &uniform
                    }
                };

                let mut value = 0.0;
                for (edge, &p) in edges.iter().zip(probabilities) {
                    value += p * self.expected_value(&edge.child)?;
                }
                Ok(value)
            }
        }
    }

    /// Combine reports from independent replicas.
    ///
    /// Each key's strategy is the mean over the replicas that visited it; the
    /// game value is the mean over all replicas.
    pub fn merge(reports: &[EquilibriumReport]) -> Result<Self> {
        if reports.is_empty() {
            return Err(SolverError::invalid_config("cannot merge zero reports"));
        }

        let mut sums: BTreeMap<String, (Strategy, usize)> = BTreeMap::new();
        for report in reports {
            for (key, strategy) in &report.strategies {
                match sums.get_mut(key) {
                    Some((acc, count)) => {
                        if acc.probabilities.len() != strategy.probabilities.len() {
                            return Err(SolverError::InconsistentActionSpace {
                                key: key.clone(),
                                expected: acc.probabilities.len(),
                                found: strategy.probabilities.len(),
                            });
                        }
                        for (a, p) in acc.probabilities.iter_mut().zip(&strategy.probabilities) {
                            *a += p;
                        }
                        *count += 1;
                    }
                    None => {
                        sums.insert(key.clone(), (strategy.clone(), 1));
                    }
                }
            }
        }

        let strategies = sums
            .into_iter()
            .map(|(key, (mut strategy, count))| {
                for p in &mut strategy.probabilities {
                    *p /= count as f64;
                }
                (key, strategy)
            })
            .collect();

        let value_x = reports.iter().map(|r| r.value_x).sum::<f64>() / reports.len() as f64;

        Ok(Self {
            strategies,
            value_x,
            iterations: reports.iter().map(|r| r.iterations).sum(),
            replicas: reports.iter().map(|r| r.replicas).sum(),
        })
    }

    /// Pretty-printed JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for EquilibriumReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .strategies
            .keys()
            .map(String::len)
            .max()
            .unwrap_or(0)
            .max("Info set".len());

        writeln!(f, "{:<width$}  Average strategy", "Info set", width = width)?;
        for (key, strategy) in &self.strategies {
            write!(f, "{:<width$} ", key, width = width)?;
            for (action, p) in strategy.iter() {
                write!(f, " {}={:.3}", action, p)?;
            }
            writeln!(f)?;
        }
        write!(
            f,
            "Game value: X={:+.4} Y={:+.4} ({} iterations, {} replica(s))",
            self.game_value(Player::X),
            self.game_value(Player::Y),
            self.iterations,
            self.replicas
        )
    }
}
