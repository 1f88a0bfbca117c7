//! External-sampling Monte Carlo Counterfactual Regret Minimization.
//!
//! One traversal walks the tree for a single *updating* player:
//! - chance nodes and the opponent's decisions are sampled (one child each),
//! - every action of the updating player is expanded,
//! - regrets at the updating player's information sets are credited with
//!   `action_value - node_value`, weighted by the opponent reach of the path
//!   divided by the probability of having sampled it,
//! - a value passed up through a sampled opponent action `a` is scaled by
//!   `σ(a) / q(a)`, where `q` is the sampling distribution, so action values
//!   below the updating player's nodes are estimates under σ as well.
//!
//! With `exploration = 0` the sampling distribution is the current profile, so
//! both corrections are exactly one. The time-averaged strategy accumulated at the
//! updating player's sets converges to a Nash equilibrium in two-player
//! zero-sum games with perfect recall.

use std::time::Instant;

use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;

use crate::cfr::config::{SolveStats, SolverConfig};
use crate::cfr::error::{Result, SolverError};
use crate::cfr::regret;
use crate::cfr::report::EquilibriumReport;
use crate::cfr::storage::{InfoSetRegistry, RegistrySnapshot};
use crate::cfr::tree::{Node, Player, Tree};

/// Read-only view of a running solve, handed to diagnostics callbacks.
pub struct Diagnostics<'a> {
    /// Iterations completed so far.
    pub iteration: u64,
    /// Running estimate of X's game value.
    pub estimated_value: f64,
    /// Seconds since the current training call started.
    pub elapsed_seconds: f64,
    /// The registry, for inspecting regrets and strategies.
    pub registry: &'a InfoSetRegistry,
}

impl Diagnostics<'_> {
    /// Copy of every information set's tables at this iteration.
    pub fn snapshot(&self) -> RegistrySnapshot {
        self.registry.snapshot(self.iteration)
    }
}

/// MCCFR solver bound to one tree.
///
/// Owns the registry and the random generator for the whole run; nothing is
/// shared with other solvers.
///
/// # Example
/// ```
/// use toy_game_cfr::cfr::{MccfrSolver, Node, Player, SolverConfig, Tree};
///
/// let respond = |sign: f64| {
///     Node::decision(
///         Player::Y,
///         "Y:choice",
///         [("heads", Node::terminal(sign)), ("tails", Node::terminal(-sign))],
///     )
/// };
/// let tree = Tree::new(Node::decision(
///     Player::X,
///     "X:choice",
///     [("heads", respond(1.0)), ("tails", respond(-1.0))],
/// ));
///
/// let config = SolverConfig::reproducible(5_000, 42);
/// let mut solver = MccfrSolver::new(&tree, config).unwrap();
/// solver.train(5_000).unwrap();
/// let report = solver.report();
/// assert_eq!(report.len(), 2);
/// ```
pub struct MccfrSolver<'t> {
    /// The game being solved.
    tree: &'t Tree,

    /// Configuration for the solver.
    config: SolverConfig,

    /// Regret and strategy tables, keyed by information set.
    registry: InfoSetRegistry,

    /// Random number generator.
    rng: StdRng,

    /// Current iteration count.
    iteration: u64,

    /// Statistics tracking.
    stats: SolveStats,

    /// Sum of root payoffs (X's view) over all traversals.
    root_value_sum: f64,

    /// Number of traversals behind `root_value_sum`.
    root_samples: u64,
}

impl<'t> MccfrSolver<'t> {
    /// Create a solver after validating `config` and `tree`.
    ///
    /// # Errors
    /// [`SolverError::InvalidConfiguration`] for a bad configuration,
    /// [`SolverError::MalformedTree`] or [`SolverError::InconsistentActionSpace`]
    /// for a bad tree. Nothing is traversed in either case.
    pub fn new(tree: &'t Tree, config: SolverConfig) -> Result<Self> {
        config.validate()?;
        let specs = tree.info_sets()?;
        tree.validate(config.chance_tolerance)?;

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(Self {
            tree,
            config,
            registry: InfoSetRegistry::with_capacity(specs.len()),
            rng,
            iteration: 0,
            stats: SolveStats::new(),
            root_value_sum: 0.0,
            root_samples: 0,
        })
    }

    /// Run one iteration: one traversal per player scheduled for it.
    pub fn run_iteration(&mut self) -> Result<()> {
        self.iteration += 1;

        let tree = self.tree;
        for &player in self.config.schedule.players(self.iteration) {
            let value = self.traverse(tree.root(), player, 1.0, 1.0, 1.0)?;
            self.root_value_sum += player.sign() * value;
            self.root_samples += 1;
        }

        Ok(())
    }

    /// Train the solver for a specified number of iterations.
    pub fn train(&mut self, iterations: u64) -> Result<&SolveStats> {
        let start_time = Instant::now();

        for _ in 0..iterations {
            self.run_iteration()?;
        }

        self.refresh_stats(start_time);
        Ok(&self.stats)
    }

    /// Train with a read-only diagnostics callback.
    ///
    /// `callback` runs every `callback_interval` iterations (and not at all if
    /// the interval is zero). Between two callbacks the convergence indicator
    /// of the average strategies is appended to the stats history.
    pub fn train_with_callback<F>(
        &mut self,
        iterations: u64,
        callback_interval: u64,
        mut callback: F,
    ) -> Result<&SolveStats>
    where
        F: FnMut(&Diagnostics<'_>),
    {
        let start_time = Instant::now();
        let mut previous: Option<RegistrySnapshot> = None;

        for i in 0..iterations {
            self.run_iteration()?;

            if callback_interval > 0 && (i + 1) % callback_interval == 0 {
                let snapshot = self.registry.snapshot(self.iteration);
                if let Some(prev) = &previous {
                    let ci = snapshot.convergence_indicator(prev);
                    self.stats.record_convergence(self.iteration, ci);
                }
                previous = Some(snapshot);

                callback(&Diagnostics {
                    iteration: self.iteration,
                    estimated_value: self.estimated_value(),
                    elapsed_seconds: start_time.elapsed().as_secs_f64(),
                    registry: &self.registry,
                });
            }
        }

        self.refresh_stats(start_time);
        Ok(&self.stats)
    }

    fn refresh_stats(&mut self, start_time: Instant) {
        self.stats.iterations = self.iteration;
        self.stats.info_sets = self.registry.len();
        self.stats.elapsed_seconds += start_time.elapsed().as_secs_f64();
        self.stats.estimated_value = self.estimated_value();
        self.stats.update_rate();
    }

    /// Run the remaining configured iterations and build the report.
    pub fn solve(mut self) -> Result<EquilibriumReport> {
        let remaining = self.config.iterations.saturating_sub(self.iteration);
        info!(
            "solving {} iterations ({:?} schedule, seed {:?})",
            remaining, self.config.schedule, self.config.seed
        );

        let stats = self.train(remaining)?;
        info!(
            "solved {} iterations in {:.2}s: {} information sets, value X={:+.4}",
            stats.iterations, stats.elapsed_seconds, stats.info_sets, stats.estimated_value
        );

        Ok(self.report())
    }

    /// Report of the average strategies so far.
    pub fn report(&self) -> EquilibriumReport {
        let report =
            EquilibriumReport::from_registry(&self.registry, self.iteration, self.estimated_value());
        if report.is_empty() {
            warn!("no information set was visited after {} iterations", self.iteration);
        }
        report
    }

    /// Mean root payoff to X over every traversal so far (0 before the first).
    pub fn estimated_value(&self) -> f64 {
        if self.root_samples == 0 {
            0.0
        } else {
            self.root_value_sum / self.root_samples as f64
        }
    }

    /// Recursive walk returning the sampled value of `node` for `updating`.
    ///
    /// `own_reach` is the updating player's reach, `opponent_reach` the product
    /// of chance and opponent probabilities along the path, and `sample_reach`
    /// the probability with which the path was sampled.
    fn traverse(
        &mut self,
        node: &'t Node,
        updating: Player,
        own_reach: f64,
        opponent_reach: f64,
        sample_reach: f64,
    ) -> Result<f64> {
        match node {
            Node::Terminal { payoff } => Ok(updating.sign() * payoff),

            Node::Chance { outcomes } => {
                if outcomes.is_empty() {
                    return Err(SolverError::malformed("chance node has no outcomes"));
                }
                let probabilities: Vec<f64> = outcomes.iter().map(|o| o.probability).collect();
                let outcome = &outcomes[regret::sample_index(&probabilities, &mut self.rng)];

                self.traverse(
                    &outcome.child,
                    updating,
                    own_reach,
                    opponent_reach * outcome.probability,
                    sample_reach * outcome.probability,
                )
            }

            Node::Decision {
                player,
                info_key,
                edges,
            } => {
                if edges.is_empty() {
                    return Err(SolverError::malformed(format!(
                        "decision node '{}' has no legal actions",
                        info_key
                    )));
                }

                let strategy = {
                    let set = self.registry.get_or_create(info_key, edges.len())?;
                    set.set_action_names(edges.iter().map(|e| e.action.as_str()));
                    set.current_strategy()
                };

                if *player == updating {
                    let mut action_values = Vec::with_capacity(edges.len());
                    for (edge, &p) in edges.iter().zip(&strategy) {
                        action_values.push(self.traverse(
                            &edge.child,
                            updating,
                            own_reach * p,
                            opponent_reach,
                            sample_reach,
                        )?);
                    }

                    let node_value: f64 = strategy
                        .iter()
                        .zip(&action_values)
                        .map(|(&s, &v)| s * v)
                        .sum();

                    let weight = opponent_reach / sample_reach;
                    let mut averaging_weight = own_reach * weight;
                    if self.config.use_linear_averaging {
                        averaging_weight *= self.iteration as f64;
                    }

                    let use_cfr_plus = self.config.use_cfr_plus;
                    let set = self.registry.get_or_create(info_key, edges.len())?;
                    set.update_regrets(&action_values, node_value, weight, use_cfr_plus);
                    set.update_strategy_sum(&strategy, averaging_weight);

                    Ok(node_value)
                } else {
                    let sampling = regret::explore(&strategy, self.config.exploration);
                    let index = regret::sample_index(&sampling, &mut self.rng);

                    let value = self.traverse(
                        &edges[index].child,
                        updating,
                        own_reach,
                        opponent_reach * strategy[index],
                        sample_reach * sampling[index],
                    )?;

                    // Unbiased estimate of this node's value under σ, whatever
                    // distribution the action was drawn from.
                    Ok(value * strategy[index] / sampling[index])
                }
            }
        }
    }

    /// Get the current iteration count.
    pub fn iteration(&self) -> u64 {
        self.iteration
    }

    /// Get current statistics.
    pub fn stats(&self) -> &SolveStats {
        &self.stats
    }

    /// Read-only access to the information set tables.
    pub fn registry(&self) -> &InfoSetRegistry {
        &self.registry
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// The tree being solved.
    pub fn tree(&self) -> &'t Tree {
        self.tree
    }
}

/// Solve `tree` for `iterations` iterations from `seed`.
///
/// Two calls with the same arguments return identical reports.
pub fn solve(tree: &Tree, iterations: u64, seed: u64) -> Result<EquilibriumReport> {
    solve_with_config(tree, &SolverConfig::reproducible(iterations, seed))
}

/// Solve `tree` with a full configuration.
pub fn solve_with_config(tree: &Tree, config: &SolverConfig) -> Result<EquilibriumReport> {
    MccfrSolver::new(tree, config.clone())?.solve()
}

/// Run `replicas` independent solves in parallel and merge their reports.
///
/// Replica `i` owns its registry and a generator seeded with `seed + i`
/// (entropy when unseeded). Runs on a dedicated pool of `num_threads` threads
/// if configured, otherwise on rayon's global pool.
pub fn solve_replicas(
    tree: &Tree,
    config: &SolverConfig,
    replicas: usize,
) -> Result<EquilibriumReport> {
    if replicas == 0 {
        return Err(SolverError::invalid_config("replicas must be positive"));
    }
    config.validate()?;
    tree.validate(config.chance_tolerance)?;

    let run = || -> Result<Vec<EquilibriumReport>> {
        (0..replicas)
            .into_par_iter()
            .map(|i| {
                let mut replica_config = config.clone();
                replica_config.seed = config.seed.map(|seed| seed.wrapping_add(i as u64));
                let report = solve_with_config(tree, &replica_config)?;
                debug!("replica {} finished ({} information sets)", i, report.len());
                Ok(report)
            })
            .collect()
    };

    let reports = match config.num_threads {
        Some(threads) => ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .map_err(|e| SolverError::invalid_config(format!("cannot build thread pool: {}", e)))?
            .install(run)?,
        None => run()?,
    };

    EquilibriumReport::merge(&reports)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cfr::config::UpdateSchedule;
    use crate::cfr::game::Game;
    use crate::games::matrix::MatrixGame;

    fn matching_pennies() -> Tree {
        MatrixGame::matching_pennies(1.0).build_tree().unwrap()
    }

    #[test]
    fn test_matching_pennies_converges() {
        let report = solve(&matching_pennies(), 200_000, 42).unwrap();

        for key in ["X:choice", "Y:choice"] {
            let strategy = report.strategy(key).unwrap();
            for (action, p) in strategy.iter() {
                assert!(
                    (0.48..=0.52).contains(&p),
                    "{} {} = {}",
                    key,
                    action,
                    p
                );
            }
        }

        let value = report.game_value(Player::X);
        assert!((-0.01..=0.01).contains(&value), "value {}", value);
    }

    #[test]
    fn test_odds_and_evens_converges() {
        let tree = MatrixGame::odds_and_evens(1.0).build_tree().unwrap();
        let report = solve(&tree, 200_000, 7).unwrap();

        for key in ["X:choice", "Y:choice"] {
            let penny = report.strategy(key).unwrap().probability("penny").unwrap();
            assert!((penny - 0.5).abs() < 0.02, "{} penny = {}", key, penny);
        }
    }

    #[test]
    fn test_odds_and_evens_error_shrinks_with_iterations() {
        let tree = MatrixGame::odds_and_evens(1.0).build_tree().unwrap();

        for (iterations, tolerance) in [(2_000, 0.1), (20_000, 0.04), (200_000, 0.02)] {
            let report = solve(&tree, iterations, 7).unwrap();
            for key in ["X:choice", "Y:choice"] {
                let penny = report.strategy(key).unwrap().probability("penny").unwrap();
                assert!(
                    (penny - 0.5).abs() < tolerance,
                    "{} penny = {} after {} iterations",
                    key,
                    penny,
                    iterations
                );
            }
        }
    }

    #[test]
    fn test_seeded_solves_are_identical() {
        let tree = MatrixGame::roshambo(1.0).build_tree().unwrap();
        let a = solve(&tree, 5_000, 11).unwrap();
        let b = solve(&tree, 5_000, 11).unwrap();
        assert_eq!(a, b);

        let c = solve(&tree, 5_000, 12).unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn test_dominated_action_is_eliminated() {
        let tree = MatrixGame::roshambo_f(1.0).build_tree().unwrap();
        let report = solve(&tree, 200_000, 3).unwrap();

        for key in ["X:choice", "Y:choice"] {
            let flower = report.strategy(key).unwrap().probability("flower").unwrap();
            assert!(flower < 0.01, "{} flower = {}", key, flower);
        }
    }

    #[test]
    fn test_strategies_sum_to_one_and_values_are_symmetric() {
        let tree = MatrixGame::roshambo_s(1.0, 2.0).build_tree().unwrap();
        let report = solve(&tree, 20_000, 5).unwrap();

        assert_eq!(report.len(), 2);
        for (key, strategy) in report.strategies() {
            assert!((strategy.total() - 1.0).abs() < 1e-9, "{} sums to {}", key, strategy.total());
        }
        let sum = report.game_value(Player::X) + report.game_value(Player::Y);
        assert!(sum.abs() < 1e-12);
    }

    #[test]
    fn test_malformed_trees_fail_before_solving() {
        let empty = Tree::new(Node::decision(
            Player::X,
            "X:empty",
            Vec::<(String, Node)>::new(),
        ));
        assert!(matches!(
            solve(&empty, 10, 1),
            Err(SolverError::MalformedTree { .. })
        ));

        let bad_chance = Tree::new(Node::chance([
            ("a", 0.5, Node::terminal(1.0)),
            ("b", 0.4, Node::terminal(-1.0)),
        ]));
        assert!(matches!(
            solve(&bad_chance, 10, 1),
            Err(SolverError::MalformedTree { .. })
        ));

        let inconsistent = Tree::new(Node::decision(
            Player::Y,
            "Y:choice",
            [
                (
                    "left",
                    Node::decision(
                        Player::X,
                        "X:choice",
                        [("a", Node::terminal(1.0)), ("b", Node::terminal(0.0))],
                    ),
                ),
                (
                    "right",
                    Node::decision(
                        Player::X,
                        "X:choice",
                        [
                            ("a", Node::terminal(1.0)),
                            ("b", Node::terminal(0.0)),
                            ("c", Node::terminal(0.0)),
                        ],
                    ),
                ),
            ],
        ));
        assert!(matches!(
            solve(&inconsistent, 10, 1),
            Err(SolverError::InconsistentActionSpace { .. })
        ));
    }

    #[test]
    fn test_invalid_configuration_rejected() {
        let tree = matching_pennies();
        assert!(matches!(
            solve(&tree, 0, 1),
            Err(SolverError::InvalidConfiguration { .. })
        ));

        let mut config = SolverConfig::reproducible(100, 1);
        config.seed = None;
        assert!(matches!(
            solve_with_config(&tree, &config),
            Err(SolverError::InvalidConfiguration { .. })
        ));

        assert!(solve_replicas(&tree, &SolverConfig::reproducible(10, 1), 0).is_err());
    }

    #[test]
    fn test_alternate_schedule_updates_one_player_per_iteration() {
        let tree = matching_pennies();
        let config = SolverConfig::reproducible(1, 9).with_schedule(UpdateSchedule::Alternate);
        let mut solver = MccfrSolver::new(&tree, config).unwrap();

        solver.run_iteration().unwrap();
        let registry = solver.registry();
        assert!(registry.get("X:choice").unwrap().is_visited());
        // Y was only sampled, so it holds no strategy weight yet.
        assert!(!registry.get("Y:choice").unwrap().is_visited());

        solver.run_iteration().unwrap();
        assert!(solver.registry().get("Y:choice").unwrap().is_visited());
        assert_eq!(solver.iteration(), 2);

        let report = solve_with_config(
            &tree,
            &SolverConfig::reproducible(100_000, 9).with_schedule(UpdateSchedule::Alternate),
        )
        .unwrap();
        let heads = report.strategy("X:choice").unwrap().probability("heads").unwrap();
        assert!((heads - 0.5).abs() < 0.03, "heads = {}", heads);
    }

    #[test]
    fn test_cfr_plus_and_linear_averaging_converge() {
        let tree = MatrixGame::cops_and_robbers(1.0, 1.0, 1.0).build_tree().unwrap();
        let config = SolverConfig::reproducible(100_000, 21)
            .with_cfr_plus(true)
            .with_linear_averaging(true);
        let report = solve_with_config(&tree, &config).unwrap();

        let patrol = report.strategy("X:choice").unwrap().probability("patrol").unwrap();
        let rob = report.strategy("Y:choice").unwrap().probability("rob").unwrap();
        assert!((patrol - 1.0 / 3.0).abs() < 0.05, "patrol = {}", patrol);
        assert!((rob - 1.0 / 3.0).abs() < 0.05, "rob = {}", rob);
    }

    #[test]
    fn test_exploration_stays_unbiased() {
        // Heavy exploration: half of every opponent sample is uniform.
        let tree = MatrixGame::cops_and_robbers(1.0, 1.0, 1.0).build_tree().unwrap();
        let config = SolverConfig::reproducible(200_000, 21).with_exploration(0.5);
        let report = solve_with_config(&tree, &config).unwrap();

        let patrol = report.strategy("X:choice").unwrap().probability("patrol").unwrap();
        let rob = report.strategy("Y:choice").unwrap().probability("rob").unwrap();
        assert!((patrol - 1.0 / 3.0).abs() < 0.03, "patrol = {}", patrol);
        assert!((rob - 1.0 / 3.0).abs() < 0.03, "rob = {}", rob);
    }

    #[test]
    fn test_stats_accumulate_across_training_calls() {
        let tree = matching_pennies();
        let mut solver = MccfrSolver::new(&tree, SolverConfig::reproducible(10_000, 3)).unwrap();

        let first = solver.train(5_000).unwrap().clone();
        let second = solver.train(5_000).unwrap().clone();

        assert_eq!(first.iterations, 5_000);
        assert_eq!(second.iterations, 10_000);
        assert!(second.elapsed_seconds >= first.elapsed_seconds);
        if second.elapsed_seconds > 0.0 {
            let rate = second.iterations as f64 / second.elapsed_seconds;
            assert!((second.iterations_per_second - rate).abs() < 1e-6 * rate.max(1.0));
        }
    }

    #[test]
    fn test_callback_is_read_only() {
        let tree = matching_pennies();
        let config = SolverConfig::reproducible(2_000, 4);

        let plain = solve_with_config(&tree, &config).unwrap();

        let mut solver = MccfrSolver::new(&tree, config).unwrap();
        let mut seen = Vec::new();
        solver
            .train_with_callback(2_000, 500, |diag| {
                seen.push((diag.iteration, diag.snapshot().entries.len()));
            })
            .unwrap();

        assert_eq!(seen, vec![(500, 2), (1_000, 2), (1_500, 2), (2_000, 2)]);
        assert_eq!(solver.stats().convergence_history.len(), 3);
        assert_eq!(solver.report(), plain);
    }

    #[test]
    fn test_replicas_are_deterministic_and_merged() {
        let tree = matching_pennies();
        let config = SolverConfig::reproducible(20_000, 100).with_threads(2);

        let a = solve_replicas(&tree, &config, 4).unwrap();
        let b = solve_replicas(&tree, &config, 4).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.replicas(), 4);
        assert_eq!(a.iterations(), 80_000);

        let heads = a.strategy("Y:choice").unwrap().probability("heads").unwrap();
        assert!((heads - 0.5).abs() < 0.05, "heads = {}", heads);
    }
}
