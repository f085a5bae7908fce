//! Headroom CLI - drive the arbitration library from the command line.
//!
//! Two jobs: replay scripted commit sequences against a `CorePerf` context
//! (`simulate`) and inspect platform tables (`table`). The binary owns the
//! tracing subscriber; the library only emits.

use clap::{Parser, Subcommand};

mod commands;
mod error;
mod scenario;

use commands::simulate::SimulateArgs;
use commands::table::TableArgs;

#[derive(Parser)]
#[command(
    name = "headroom",
    version,
    about = "Bandwidth and clock arbitration sandbox for multi-pipe scanout"
)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Replay a JSON scenario through the arbitrator and print the outcome
    Simulate(SimulateArgs),
    /// Load, validate and print a platform table
    Table(TableArgs),
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Command::Simulate(args) => commands::simulate::run(args),
        Command::Table(args) => commands::table::run(args),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

/// Install the fmt subscriber. `RUST_LOG` wins over the verbosity flag.
fn init_tracing(verbose: u8) {
    let fallback = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(fallback));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
