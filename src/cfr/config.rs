//! Configuration options for the MCCFR solver.
//!
//! This module provides the solve configuration (iteration count, seed,
//! updating-player schedule and the optional CFR refinements) and the
//! statistics recorded while training.

use serde::{Deserialize, Serialize};

use crate::cfr::error::{Result, SolverError};
use crate::cfr::tree::{Player, DEFAULT_CHANCE_TOLERANCE};

/// Which player(s) update regrets in each iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateSchedule {
    /// Odd iterations update X, even iterations update Y.
    Alternate,
    /// Every iteration runs one traversal for X, then one for Y.
    #[default]
    Both,
}

impl UpdateSchedule {
    /// Players traversed in the given (1-based) iteration.
    pub fn players(self, iteration: u64) -> &'static [Player] {
        match self {
            UpdateSchedule::Both => &[Player::X, Player::Y],
            UpdateSchedule::Alternate if iteration % 2 == 1 => &[Player::X],
            UpdateSchedule::Alternate => &[Player::Y],
        }
    }
}

/// Configuration for the MCCFR solver.
///
/// # Example
/// ```
/// use toy_game_cfr::cfr::{SolverConfig, UpdateSchedule};
///
/// let config = SolverConfig::default().with_iterations(50_000).with_seed(7);
/// assert_eq!(config.schedule, UpdateSchedule::Both);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Number of iterations to run. Must be positive.
    pub iterations: u64,

    /// Random seed for reproducibility.
    ///
    /// If set, two solves of the same tree produce identical reports.
    /// If `None`, the generator is seeded from entropy.
    pub seed: Option<u64>,

    /// Reject configurations without a seed.
    pub require_seed: bool,

    /// Updating-player schedule.
    pub schedule: UpdateSchedule,

    /// Exploration probability for opponent sampling.
    ///
    /// Opponent actions are drawn from `ε·uniform + (1−ε)·σ`; updates are
    /// importance-weighted so the estimator stays unbiased. 0 is plain
    /// external sampling.
    pub exploration: f64,

    /// Use CFR+ (floor cumulative regrets at zero).
    pub use_cfr_plus: bool,

    /// Weight strategy-sum contributions by iteration number.
    pub use_linear_averaging: bool,

    /// Allowed `|Σp − 1|` at chance nodes.
    pub chance_tolerance: f64,

    /// Thread pool size for replica solves.
    ///
    /// `None` uses rayon's global pool.
    pub num_threads: Option<usize>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            iterations: 10_000,
            seed: None,
            require_seed: false,
            schedule: UpdateSchedule::Both,
            exploration: 0.0,
            use_cfr_plus: false,
            use_linear_averaging: false,
            chance_tolerance: DEFAULT_CHANCE_TOLERANCE,
            num_threads: None,
        }
    }
}

impl SolverConfig {
    /// Create a new SolverConfig with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeded configuration that refuses to run unseeded.
    pub fn reproducible(iterations: u64, seed: u64) -> Self {
        Self {
            iterations,
            seed: Some(seed),
            require_seed: true,
            ..Default::default()
        }
    }

    /// Parse a JSON configuration and validate it.
    ///
    /// Missing fields take their default values.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| SolverError::invalid_config(format!("cannot parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Builder method: set iteration count.
    pub fn with_iterations(mut self, iterations: u64) -> Self {
        self.iterations = iterations;
        self
    }

    /// Builder method: set random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Builder method: set updating-player schedule.
    pub fn with_schedule(mut self, schedule: UpdateSchedule) -> Self {
        self.schedule = schedule;
        self
    }

    /// Builder method: set exploration probability.
    pub fn with_exploration(mut self, exploration: f64) -> Self {
        self.exploration = exploration;
        self
    }

    /// Builder method: set whether to use CFR+.
    pub fn with_cfr_plus(mut self, enable: bool) -> Self {
        self.use_cfr_plus = enable;
        self
    }

    /// Builder method: set whether to use linear averaging.
    pub fn with_linear_averaging(mut self, enable: bool) -> Self {
        self.use_linear_averaging = enable;
        self
    }

    /// Builder method: set number of threads for replica solves.
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.num_threads = Some(threads);
        self
    }

    /// Validate the configuration.
    ///
    /// # Errors
    /// [`SolverError::InvalidConfiguration`] naming the first bad field.
    pub fn validate(&self) -> Result<()> {
        if self.iterations == 0 {
            return Err(SolverError::invalid_config("iterations must be positive"));
        }

        if self.require_seed && self.seed.is_none() {
            return Err(SolverError::invalid_config(
                "a seed is required for a reproducible solve",
            ));
        }

        if !(0.0..=1.0).contains(&self.exploration) {
            return Err(SolverError::invalid_config(format!(
                "exploration {} is out of range [0, 1]",
                self.exploration
            )));
        }

        if !self.chance_tolerance.is_finite() || self.chance_tolerance < 0.0 {
            return Err(SolverError::invalid_config(format!(
                "chance tolerance {} must be finite and non-negative",
                self.chance_tolerance
            )));
        }

        if self.num_threads == Some(0) {
            return Err(SolverError::invalid_config("num_threads must be positive"));
        }

        Ok(())
    }
}

/// Statistics tracked during training.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SolveStats {
    /// Total number of iterations completed.
    pub iterations: u64,

    /// Number of information sets discovered.
    pub info_sets: usize,

    /// Total time spent training (in seconds).
    pub elapsed_seconds: f64,

    /// Iterations per second.
    pub iterations_per_second: f64,

    /// Running estimate of X's game value.
    pub estimated_value: f64,

    /// History of convergence-indicator measurements.
    pub convergence_history: Vec<ConvergencePoint>,
}

/// A single convergence-indicator measurement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConvergencePoint {
    /// Iteration number when this measurement was taken.
    pub iteration: u64,
    /// Convergence indicator (see [`RegistrySnapshot::convergence_indicator`](crate::cfr::RegistrySnapshot::convergence_indicator)).
    pub ci: f64,
}

impl SolveStats {
    /// Create new empty stats.
    pub fn new() -> Self {
        Self::default()
    }

    /// Update iterations per second based on elapsed time.
    pub fn update_rate(&mut self) {
        if self.elapsed_seconds > 0.0 {
            self.iterations_per_second = self.iterations as f64 / self.elapsed_seconds;
        }
    }

    /// Record a convergence-indicator measurement.
    pub fn record_convergence(&mut self, iteration: u64, ci: f64) {
        self.convergence_history.push(ConvergencePoint { iteration, ci });
    }
}
