use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info, warn};

use nhpp::analysis;
use nhpp::config::SimulationConfig;
use nhpp::error::SimResult;
use nhpp::intensity::{Intensity, Superposed};
use nhpp::plot;
use nhpp::simulation::{Simulation, SimulationOutcome};

/// Simulate two non-homogeneous Poisson processes and their superposition,
/// then chart the cumulative counts against Λ(t).
#[derive(Debug, Parser)]
#[command(version)]
struct Args {
    /// RNG seed [default: 42]
    #[arg(long)]
    seed: Option<u64>,

    /// Horizon T [default: 10]
    #[arg(long)]
    horizon: Option<f64>,

    /// Bin width dt [default: 0.01]
    #[arg(long)]
    dt: Option<f64>,

    /// Print the summary table instead of opening the chart.
    #[arg(long)]
    no_plot: bool,
}

fn main() -> ExitCode {
    nhpp::init_tracing();
    let args = Args::parse();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> SimResult<()> {
    let mut config = SimulationConfig::canonical();
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if let Some(horizon) = args.horizon {
        config.horizon = horizon;
    }
    if let Some(dt) = args.dt {
        config.dt = dt;
    }
    info!(config = %config.to_json()?, "starting run");

    let (first, second) = (config.first, config.second);
    let mut sim = Simulation::from_config(config)?;
    let outcome = sim.run()?;

    let violations = analysis::verify_outcome(&outcome);
    for v in &violations {
        warn!("invariant violated: {v}");
    }

    if args.no_plot {
        print_summary(&outcome, &first, &second);
        if violations.is_empty() {
            println!("\n  All invariants: PASS");
        } else {
            println!("\n  {} violation(s):", violations.len());
            for v in &violations {
                println!("    {v}");
            }
        }
        Ok(())
    } else {
        plot::show(&outcome)
    }
}

fn print_summary(outcome: &SimulationOutcome, first: &impl Intensity, second: &impl Intensity) {
    let horizon = outcome.grid.horizon();
    let both = Superposed(first, second);

    println!("=== Run summary ({}) ===", outcome.grid);
    println!("{:<18} | {:>8} | {:>10} | {:>8}", "Process", "Events", "Λ(T)", "Diff%");
    println!("{}", "-".repeat(18 + 3 + 8 + 3 + 10 + 3 + 8));

    let rows: [(&str, usize, f64); 3] = [
        ("Process 1", outcome.first.len(), first.cumulative(horizon)),
        ("Process 2", outcome.second.len(), second.cumulative(horizon)),
        ("Combined Process", outcome.combined.len(), both.cumulative(horizon)),
    ];
    for (name, events, expected) in rows {
        let diff = if expected == 0.0 { 0.0 } else { (events as f64 - expected) / expected * 100.0 };
        println!("{name:<18} | {events:>8} | {expected:>10.2} | {diff:>7.1}%");
    }
}
