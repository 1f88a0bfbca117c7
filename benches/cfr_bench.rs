//! Benchmarks for the MCCFR solver.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use toy_game_cfr::cfr::{Game, MccfrSolver, SolverConfig};
use toy_game_cfr::games::{ClairvoyanceGame, KuhnPoker, MatrixGame};

fn kuhn_iteration_benchmark(c: &mut Criterion) {
    let tree = KuhnPoker::new().build_tree().unwrap();
    let config = SolverConfig::default().with_seed(42);
    let mut solver = MccfrSolver::new(&tree, config).unwrap();

    c.bench_function("kuhn_single_iteration", |b| {
        b.iter(|| {
            solver.run_iteration().unwrap();
            black_box(solver.iteration())
        })
    });
}

fn kuhn_1000_iterations_benchmark(c: &mut Criterion) {
    let tree = KuhnPoker::new().build_tree().unwrap();

    c.bench_function("kuhn_1000_iterations", |b| {
        b.iter(|| {
            let config = SolverConfig::default().with_seed(42);
            let mut solver = MccfrSolver::new(&tree, config).unwrap();
            solver.train(black_box(1000)).unwrap().iterations
        })
    });
}

fn small_games_benchmark(c: &mut Criterion) {
    let odds = MatrixGame::odds_and_evens(1.0).build_tree().unwrap();
    let clairvoyance = ClairvoyanceGame::default().build_tree().unwrap();

    c.bench_function("odds_and_evens_1000_iterations", |b| {
        b.iter(|| {
            let mut solver = MccfrSolver::new(&odds, SolverConfig::default().with_seed(7)).unwrap();
            solver.train(black_box(1000)).unwrap().iterations
        })
    });

    c.bench_function("clairvoyance_report", |b| {
        let mut solver =
            MccfrSolver::new(&clairvoyance, SolverConfig::default().with_seed(7)).unwrap();
        solver.train(10_000).unwrap();
        b.iter(|| black_box(solver.report()).evaluate(&clairvoyance).unwrap())
    });
}

criterion_group!(
    benches,
    kuhn_iteration_benchmark,
    kuhn_1000_iterations_benchmark,
    small_games_benchmark
);
criterion_main!(benches);
