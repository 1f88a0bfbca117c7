//! Solves every bundled toy game and compares against the known solutions.
//!
//! Usage:
//!   cargo run --release --bin solve_toy_games -- [OPTIONS]
//!
//! Options:
//!   --config <FILE>      Solver configuration JSON file (optional)
//!   --iterations <N>     Iterations per game (overrides the config)
//!   --seed <N>           Random seed (overrides the config)
//!   --replicas <N>       Independent replicas per game (default: 1)
//!   --threads <N>        Number of threads for replicas (default: auto)
//!   --output <FILE>      Output file (default: toy_games.json)

use std::env;
use std::error::Error;
use std::fs;
use std::str::FromStr;
use std::time::Instant;

use indicatif::{ProgressBar, ProgressStyle};
use log::info;
use serde::Serialize;

use toy_game_cfr::cfr::{solve_replicas, Game, MccfrSolver, SolverConfig};
use toy_game_cfr::games::{
    ClairvoyanceGame, JamOrFoldGame, KuhnPoker, MatrixGame, Showdown, ZeroOneGame1, ZeroOneGame2,
};
use toy_game_cfr::{EquilibriumReport, Player, Tree};

/// One game's entry in the output file.
#[derive(Serialize)]
struct GameResult {
    game: String,
    info_sets: usize,
    elapsed_seconds: f64,
    max_deviation: Option<f64>,
    value_error: Option<f64>,
    report: EquilibriumReport,
}

#[derive(Debug, PartialEq)]
struct Options {
    config_file: Option<String>,
    iterations: Option<u64>,
    seed: Option<u64>,
    replicas: usize,
    threads: Option<usize>,
    output_file: String,
}

fn bundled_games() -> Vec<Box<dyn Game>> {
    vec![
        Box::new(MatrixGame::matching_pennies(1.0)),
        Box::new(MatrixGame::odds_and_evens(1.0)),
        Box::new(MatrixGame::roshambo(1.0)),
        Box::new(MatrixGame::roshambo_s(1.0, 2.0)),
        Box::new(MatrixGame::roshambo_f(1.0)),
        Box::new(MatrixGame::cops_and_robbers(1.0, 1.0, 1.0)),
        Box::new(ClairvoyanceGame::default()),
        Box::new(ZeroOneGame1::default()),
        Box::new(ZeroOneGame2::default()),
        Box::new(JamOrFoldGame::default()),
        Box::new(JamOrFoldGame::default().with_showdown(Showdown::TwoThirdsEquity)),
        Box::new(KuhnPoker::new()),
    ]
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = env::args().skip(1).collect();
    let options = match parse_args(&args) {
        Ok(Some(options)) => options,
        Ok(None) => {
            print_help();
            return;
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!();
            print_help();
            std::process::exit(1);
        }
    };

    if let Err(e) = run(&options) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Parse command-line arguments (without the program name).
///
/// `Ok(None)` means help was requested.
fn parse_args(args: &[String]) -> Result<Option<Options>, String> {
    let mut options = Options {
        config_file: None,
        iterations: None,
        seed: None,
        replicas: 1,
        threads: None,
        output_file: "toy_games.json".to_string(),
    };

    let mut i = 0;
    while i < args.len() {
        let flag = args[i].as_str();
        let value = args.get(i + 1).map(String::as_str);
        match flag {
            "--config" | "-c" => options.config_file = Some(required(flag, value)?.to_string()),
            "--iterations" | "-i" => options.iterations = Some(parse_value(flag, value)?),
            "--seed" | "-s" => options.seed = Some(parse_value(flag, value)?),
            "--replicas" | "-r" => options.replicas = parse_value(flag, value)?,
            "--threads" | "-t" => options.threads = Some(parse_value(flag, value)?),
            "--output" | "-o" => options.output_file = required(flag, value)?.to_string(),
            "--help" | "-h" => return Ok(None),
            other => return Err(format!("unknown argument: {}", other)),
        }
        i += 2;
    }
    Ok(Some(options))
}

fn required<'a>(flag: &str, value: Option<&'a str>) -> Result<&'a str, String> {
    value.ok_or_else(|| format!("{} needs a value", flag))
}

fn parse_value<T: FromStr>(flag: &str, value: Option<&str>) -> Result<T, String> {
    let value = required(flag, value)?;
    value
        .parse()
        .map_err(|_| format!("invalid value for {}: {:?}", flag, value))
}

fn run(options: &Options) -> Result<(), Box<dyn Error>> {
    let mut config = match &options.config_file {
        Some(path) => {
            info!("loading solver configuration from {}", path);
            SolverConfig::from_json(&fs::read_to_string(path)?)?
        }
        None => SolverConfig::default().with_iterations(200_000),
    };
    if let Some(iterations) = options.iterations {
        config = config.with_iterations(iterations);
    }
    if let Some(seed) = options.seed {
        config = config.with_seed(seed);
    }
    if let Some(threads) = options.threads {
        config = config.with_threads(threads);
    }
    config.validate()?;

    println!("=================================================");
    println!("  Toy Game MCCFR Solver");
    println!("=================================================");
    println!();
    println!("Iterations: {}", config.iterations);
    println!("Schedule:   {:?}", config.schedule);
    println!("Seed:       {}", config.seed.map_or("entropy".to_string(), |s| s.to_string()));
    println!("Replicas:   {}", options.replicas);
    println!();

    let mut results = Vec::new();
    for game in bundled_games() {
        let tree = game.build_tree()?;
        println!("--- {} ---", game.name());

        let start = Instant::now();
        let report = if options.replicas > 1 {
            solve_replicas(&tree, &config, options.replicas)?
        } else {
            solve_with_progress(&tree, &config)?
        };
        let elapsed_seconds = start.elapsed().as_secs_f64();

        println!("{}", report);

        let reference = game.reference();
        let max_deviation = reference.as_ref().and_then(|r| r.max_deviation(&report));
        let value_error = match &reference {
            Some(r) => r.value_error(&report, &tree)?,
            None => None,
        };
        if let Some(deviation) = max_deviation {
            println!("Max deviation from known solution: {:.4}", deviation);
        }
        if let Some(error) = value_error {
            println!("Value error (exact evaluation):    {:.4}", error);
        }
        println!(
            "Value for Y: {:+.4}  ({:.2}s)",
            report.game_value(Player::Y),
            elapsed_seconds
        );
        println!();

        results.push(GameResult {
            game: game.name(),
            info_sets: report.len(),
            elapsed_seconds,
            max_deviation,
            value_error,
            report,
        });
    }

    println!("Exporting results to {}...", options.output_file);
    fs::write(&options.output_file, serde_json::to_string_pretty(&results)?)?;
    println!("Done!");
    Ok(())
}

fn solve_with_progress(
    tree: &Tree,
    config: &SolverConfig,
) -> Result<EquilibriumReport, Box<dyn Error>> {
    let progress = ProgressBar::new(config.iterations);
    progress.set_style(
        ProgressStyle::with_template(
            "{bar:40.cyan/blue} {pos:>8}/{len:8} [{elapsed_precise}] {per_sec} {msg}",
        )?
        .progress_chars("=>-"),
    );

    let mut solver = MccfrSolver::new(tree, config.clone())?;
    let interval = (config.iterations / 100).max(1);
    let stats = solver.train_with_callback(config.iterations, interval, |diagnostics| {
        progress.set_position(diagnostics.iteration);
        progress.set_message(format!("value X={:+.4}", diagnostics.estimated_value));
    })?;
    progress.finish_and_clear();

    if let Some(last) = stats.convergence_history.last() {
        info!("final convergence indicator {:.3} at iteration {}", last.ci, last.iteration);
    }
    Ok(solver.report())
}

fn print_help() {
    println!("Toy Game MCCFR Solver");
    println!();
    println!("Usage: solve_toy_games [OPTIONS]");
    println!();
    println!("Options:");
    println!("  -c, --config <FILE>      Solver configuration JSON file");
    println!("  -i, --iterations <N>     Iterations per game (default: 200000)");
    println!("  -s, --seed <N>           Random seed");
    println!("  -r, --replicas <N>       Independent replicas per game (default: 1)");
    println!("  -t, --threads <N>        Number of threads for replicas (default: auto)");
    println!("  -o, --output <FILE>      Output file (default: toy_games.json)");
    println!("  -h, --help               Show this help");
    println!();
    println!("Set RUST_LOG=debug to trace information-set creation.");
}
