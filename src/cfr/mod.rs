//! MCCFR solver core.
//!
//! This module provides the game-independent part of the crate: the
//! extensive-form tree model, the information set registry, regret matching,
//! the external-sampling MCCFR engine and the equilibrium report.
//!
//! # Overview
//!
//! 1. A [`Game`] builds a [`Tree`] of chance, decision and terminal nodes.
//!    Decision nodes carry an information-set key; nodes sharing a key share
//!    one strategy.
//! 2. [`MccfrSolver`] walks the tree repeatedly, sampling chance and opponent
//!    moves, and accumulates regrets and strategy weights in an
//!    [`InfoSetRegistry`] private to the run.
//! 3. The time-averaged strategies become an [`EquilibriumReport`].
//!
//! # Example
//!
//! ```
//! use toy_game_cfr::cfr::{solve, Game, Player};
//! use toy_game_cfr::games::MatrixGame;
//!
//! let tree = MatrixGame::matching_pennies(1.0).build_tree().unwrap();
//! let report = solve(&tree, 50_000, 42).unwrap();
//!
//! let heads = report.strategy("X:choice").unwrap().probability("heads").unwrap();
//! assert!((heads - 0.5).abs() < 0.05);
//! println!("{}", report);
//! # let _ = report.game_value(Player::Y);
//! ```
//!
//! # Theory
//!
//! **Regret**: how much better an action would have done than the current
//! strategy.
//! ```text
//! Regret(a) = Value(a) - Value(current_strategy)
//! ```
//!
//! **Regret Matching**: play proportionally to positive regret.
//! ```text
//! Strategy(a) = max(0, Regret(a)) / sum(max(0, Regret(a')))
//! ```
//!
//! Average regret shrinks as O(1/sqrt(T)), and the average strategy converges
//! to a Nash equilibrium of a two-player zero-sum game.
//!
//! # References
//!
//! - Zinkevich, M., et al. "Regret Minimization in Games with Incomplete Information" (2007)
//! - Lanctot, M., et al. "Monte Carlo Sampling for Regret Minimization in Extensive Games" (2009)
//! - Tammelin, O. "Solving Large Imperfect Information Games Using CFR+" (2014)

pub mod config;
pub mod error;
pub mod game;
pub mod regret;
pub mod report;
pub mod solver;
pub mod storage;
pub mod tree;

// Re-export main types for convenient access
pub use config::{ConvergencePoint, SolveStats, SolverConfig, UpdateSchedule};
pub use error::{Result, SolverError};
pub use game::{Game, Reference};
pub use report::{EquilibriumReport, Strategy};
pub use solver::{solve, solve_replicas, solve_with_config, Diagnostics, MccfrSolver};
pub use storage::{InfoSetRegistry, InformationSet, RegistrySnapshot, SnapshotEntry};
pub use tree::{ChanceOutcome, Edge, InfoSetSpec, Node, NodeKind, Player, Tree};
