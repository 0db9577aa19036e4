//! GridStream CLI - exercise the cache engine against a synthetic
//! dataset and report how it behaved.

mod sim;

use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use gridstream::{logging, CacheHints, EngineConfig, LoadingStrategy};

use sim::{Simulation, SyntheticSource};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum StrategyArg {
    /// Return stale data, load in the background
    Volatile,
    /// Load synchronously on every miss
    Blocking,
    /// Load synchronously while the frame budget lasts
    Budgeted,
    /// Never load; placeholders only
    DontLoad,
}

impl From<StrategyArg> for LoadingStrategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Volatile => LoadingStrategy::Volatile,
            StrategyArg::Blocking => LoadingStrategy::Blocking,
            StrategyArg::Budgeted => LoadingStrategy::Budgeted,
            StrategyArg::DontLoad => LoadingStrategy::DontLoad,
        }
    }
}

#[derive(Parser)]
#[command(name = "gridstream")]
#[command(about = "Stream a synthetic gridded dataset through the cache engine", long_about = None)]
struct Args {
    /// Number of frames to simulate
    #[arg(long, default_value = "120")]
    frames: u64,

    /// Total cells in the synthetic dataset
    #[arg(long, default_value = "4096")]
    cells: u64,

    /// Cells accessed per frame
    #[arg(long, default_value = "64")]
    window: u64,

    /// Window advance per frame (cells)
    #[arg(long, default_value = "16")]
    step: u64,

    /// Loading strategy applied to every access
    #[arg(long, value_enum, default_value = "volatile")]
    strategy: StrategyArg,

    /// Number of fetch-queue priority levels
    #[arg(long, default_value = "2")]
    priorities: usize,

    /// Queue priority (and budget group) used by the accesses
    #[arg(long, default_value = "0")]
    priority: usize,

    /// Background fetcher threads (default: cores minus one)
    #[arg(long)]
    fetchers: Option<usize>,

    /// Per-frame synchronous-load budget for the chosen group, in
    /// milliseconds (budgeted strategy only)
    #[arg(long, default_value = "5")]
    budget_ms: u64,

    /// Simulated load latency per cell, in milliseconds
    #[arg(long, default_value = "2")]
    load_delay_ms: u64,

    /// Payload size per cell, in bytes
    #[arg(long, default_value = "4096")]
    payload_bytes: usize,

    /// Make every n-th cell fail to load
    #[arg(long)]
    fail_every: Option<u64>,

    /// Wall-clock frame pacing in milliseconds (0 = unpaced)
    #[arg(long, default_value = "0")]
    frame_ms: u64,

    /// Also write a log file into this directory
    #[arg(long)]
    log_dir: Option<PathBuf>,
}

fn main() {
    let args = Args::parse();

    let _guard = match logging::init_logging(args.log_dir.as_deref()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Error initializing logging: {e}");
            process::exit(1);
        }
    };

    if args.priority >= args.priorities {
        eprintln!(
            "Error: --priority {} is out of range for {} priority levels",
            args.priority, args.priorities
        );
        process::exit(1);
    }

    let mut config = EngineConfig::new().with_priorities(args.priorities);
    if let Some(fetchers) = args.fetchers {
        config = config.with_fetcher_threads(fetchers);
    }
    let mut budget = vec![Duration::ZERO; args.priorities];
    budget[args.priority] = Duration::from_millis(args.budget_ms);
    config = config.with_frame_budget(budget);

    let hints = CacheHints::new(args.strategy.into(), args.priority, false);
    let source = Arc::new(SyntheticSource::new(
        args.payload_bytes,
        Duration::from_millis(args.load_delay_ms),
        args.fail_every,
    ));

    let simulation = Simulation {
        frames: args.frames,
        cells: args.cells,
        window: args.window,
        step: args.step,
        hints,
        frame_time: Duration::from_millis(args.frame_ms),
        drain_timeout: Duration::from_secs(5),
    };

    tracing::info!(
        frames = args.frames,
        cells = args.cells,
        strategy = ?args.strategy,
        "starting simulation"
    );

    println!("Simulating {} frames over {} cells", args.frames, args.cells);
    println!(
        "  window: {} cells, step: {}, strategy: {:?}, priority: {}",
        args.window, args.step, args.strategy, args.priority
    );
    println!();

    let report = match simulation.run(config, source) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("Error running simulation: {e}");
            process::exit(1);
        }
    };

    println!(
        "Completed {} frames in {:.2}s ({:.1} fps)",
        report.frames,
        report.elapsed.as_secs_f64(),
        report.frames as f64 / report.elapsed.as_secs_f64().max(f64::EPSILON)
    );
    println!("  loader calls:  {}", report.loader_calls);
    println!("  access errors: {}", report.access_errors);
    println!();
    println!("{}", report.stats);
}
