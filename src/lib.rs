//! # Toy Game CFR
//!
//! External-sampling Monte Carlo CFR for small two-player zero-sum poker toy
//! games: matrix games, half-street clairvoyance, jam-or-fold and Kuhn poker.
//!
//! ## Features
//!
//! - **Explicit game trees**: chance, decision and terminal nodes, with
//!   information sets shared by key (simultaneous moves included)
//! - **External-sampling MCCFR**: seeded, reproducible, optional CFR+ and
//!   linear averaging
//! - **Parallel replicas**: independent seeded solves merged into one report
//! - **Reference oracle**: closed-form equilibria for cross-checking
//!
//! ## Quick Start
//!
//! ```
//! use toy_game_cfr::{solve, Game};
//! use toy_game_cfr::games::ClairvoyanceGame;
//!
//! let game = ClairvoyanceGame::new(1.0, 1.0);
//! let tree = game.build_tree().unwrap();
//! let report = solve(&tree, 20_000, 7).unwrap();
//!
//! let reference = game.reference().unwrap();
//! assert!(reference.max_deviation(&report).unwrap() < 0.1);
//! ```
//!
//! ## Modules
//!
//! - [`cfr`]: tree model, registry, MCCFR engine and report
//! - [`games`]: tree builders for the bundled toy games
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      MCCFR Solver (Generic)                     │
//! │  - Information set registry  - Regret matching                  │
//! │  - External sampling         - Equilibrium report               │
//! └─────────────────────────────────────────────────────────────────┘
//!                               ▲
//!                               │ Game::build_tree() -> Tree
//!                               │
//!      ┌───────────────┬────────┴──────┬───────────────┐
//!      │               │               │               │
//! ┌─────────┐   ┌─────────────┐  ┌────────────┐  ┌─────────┐
//! │ Matrix  │   │ Half-street │  │ Jam-or-fold│  │  Kuhn   │
//! │ games   │   │ clairv, 0-1 │  │  #1, #2    │  │  Poker  │
//! └─────────┘   └─────────────┘  └────────────┘  └─────────┘
//! ```

#![warn(missing_docs)]

/// MCCFR solver core.
///
/// Game-independent: anything that can build a [`cfr::Tree`] can be solved.
pub mod cfr;

/// Game implementations module.
///
/// Tree builders for the toy games, each with its closed-form reference.
pub mod games;

// Re-export commonly used types at crate root for convenience
pub use cfr::{
    solve, solve_replicas, solve_with_config, EquilibriumReport, Game, MccfrSolver, Player,
    SolverConfig, SolverError, Tree,
};
