//! Game implementations for the MCCFR solver.
//!
//! Each game builds an explicit tree through the [`Game`](crate::cfr::Game)
//! trait and, where a closed-form solution exists, exposes it as a
//! [`Reference`](crate::cfr::Reference). They serve as:
//!
//! 1. **Validation**: known equilibria verify that the solver is correct.
//!
//! 2. **Examples**: they show how to model simultaneous moves, hidden
//!    information and card-bucket chance nodes as trees.
//!
//! 3. **Benchmarks**: small, fixed games for performance testing.
//!
//! ## Available Games
//!
//! - [`matrix`]: simultaneous-move matrix games (matching pennies, odds and
//!   evens, roshambo and its variants, cops and robbers)
//! - [`clairvoyance`]: the half-street clairvoyance game
//! - [`zero_one`]: the [0,1] half-street games #1 and #2 with uniform buckets
//! - [`jam_or_fold`]: the [0,1] jam-or-fold games #1 and #2 with uniform buckets
//! - [`kuhn`]: Kuhn Poker, a 3-card poker game with a known equilibrium
//!
//! ## Adding New Games
//!
//! 1. Create a new module under `src/games/`
//! 2. Implement [`Game::build_tree`](crate::cfr::Game::build_tree), giving
//!    indistinguishable decision nodes the same information-set key
//! 3. Return the analytic solution from `reference()` if there is one
//! 4. Add tests that solve the tree and compare against the reference

pub mod clairvoyance;
pub mod jam_or_fold;
pub mod kuhn;
pub mod matrix;
pub mod zero_one;

pub use clairvoyance::ClairvoyanceGame;
pub use jam_or_fold::{JamOrFoldGame, Showdown};
pub use kuhn::KuhnPoker;
pub use matrix::{MatrixGame, MatrixKind};
pub use zero_one::{ZeroOneGame1, ZeroOneGame2};
