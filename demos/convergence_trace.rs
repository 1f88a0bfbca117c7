//! Trace Kuhn Poker convergence through the diagnostics callback.

use toy_game_cfr::cfr::{Game, MccfrSolver, SolverConfig};
use toy_game_cfr::games::KuhnPoker;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let game = KuhnPoker::new();
    let tree = match game.build_tree() {
        Ok(tree) => tree,
        Err(e) => {
            eprintln!("Error building tree: {}", e);
            return;
        }
    };
    let config = SolverConfig::reproducible(100_000, 42);
    let mut solver = match MccfrSolver::new(&tree, config) {
        Ok(solver) => solver,
        Err(e) => {
            eprintln!("Error creating solver: {}", e);
            return;
        }
    };

    let result = solver.train_with_callback(100_000, 10_000, |diagnostics| {
        let snapshot = diagnostics.snapshot();
        let bet = |key: &str| {
            snapshot
                .entries
                .get(key)
                .and_then(|entry| entry.average.as_ref())
                .map_or(f64::NAN, |strategy| strategy[1])
        };

        println!("After {} iterations:", diagnostics.iteration);
        println!("  Value for X: {:+.4}", diagnostics.estimated_value);
        println!("  X Jack  bet: {:.3}", bet("0:"));
        println!("  X King  bet: {:.3}", bet("2:"));
        println!("  Y Queen call: {:.3}", bet("1:b"));
        println!("  Y Jack  bluff: {:.3}", bet("0:p"));
        println!();
    });

    let stats = match result {
        Ok(stats) => stats.clone(),
        Err(e) => {
            eprintln!("Error during training: {}", e);
            return;
        }
    };

    println!("Convergence indicator history:");
    for point in &stats.convergence_history {
        println!("  iteration {:>7}: CI {:.3}", point.iteration, point.ci);
    }
    println!("Speed: {:.0} iterations/second", stats.iterations_per_second);

    if let Some(reference) = game.reference() {
        let report = solver.report();
        if let Some(deviation) = reference.max_deviation(&report) {
            println!("Max deviation from known equilibrium: {:.4}", deviation);
        }
    }

    println!("\nExpected Nash Equilibrium (Y is unique):");
    println!("  Y Queen vs bet: Fold=0.667, Call=0.333");
    println!("  Y Jack vs pass: Pass=0.667, Bet=0.333");
    println!("  X King bet = 3 × X Jack bet, X Jack bet in [0, 1/3]");
}
