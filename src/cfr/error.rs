//! Error types for the CFR core.
//!
//! Every error is a local contract violation: a solve either returns a complete
//! report or fails fast with one of these, never a partial result.

use thiserror::Error;

/// Errors raised while validating or solving a game tree.
#[derive(Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum SolverError {
    /// The tree breaks a structural rule (empty action set, bad chance
    /// probabilities, excessive depth, ...).
    #[error("malformed tree: {reason}")]
    MalformedTree {
        /// What was wrong and where.
        reason: String,
    },

    /// One information-set key was reached with different action spaces.
    #[error("information set '{key}' has {found} actions, expected {expected}")]
    InconsistentActionSpace {
        /// The offending key.
        key: String,
        /// Action count recorded on first sight.
        expected: usize,
        /// Action count seen now.
        found: usize,
    },

    /// Solver or game parameters rejected before any traversal.
    #[error("invalid configuration: {message}")]
    InvalidConfiguration {
        /// Which parameter and why.
        message: String,
    },
}

impl SolverError {
    /// Shorthand for [`SolverError::MalformedTree`].
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedTree {
            reason: reason.into(),
        }
    }

    /// Shorthand for [`SolverError::InvalidConfiguration`].
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            message: message.into(),
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, SolverError>;
