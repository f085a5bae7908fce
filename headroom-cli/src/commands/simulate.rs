//! Simulate command - replay a scenario file through the arbitrator.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use tracing::info;

use headroom::{
    CorePerf, PerfError, PerfSnapshot, PerfTable, PipeId, TracingClock,
    TracingInterconnect, TuningMode, UpdatePhase,
};

use crate::error::CliError;
use crate::scenario::{Scenario, Step};

/// Arguments for the simulate command.
#[derive(Debug, Args)]
pub struct SimulateArgs {
    /// Path to the scenario JSON file.
    pub scenario: PathBuf,

    /// Platform table JSON file (overrides a table embedded in the scenario).
    #[arg(long)]
    pub table: Option<PathBuf>,

    /// Print the final snapshot as JSON.
    #[arg(long)]
    pub json: bool,

    /// Abort at the first rejected step instead of logging and continuing.
    #[arg(long)]
    pub strict: bool,
}

/// Run the simulate command.
pub fn run(args: SimulateArgs) -> Result<(), CliError> {
    let text = fs::read_to_string(&args.scenario)?;
    let scenario: Scenario = serde_json::from_str(&text)?;
    info!(
        scenario = %args.scenario.display(),
        steps = scenario.steps.len(),
        "Replaying scenario"
    );

    let table = match &args.table {
        Some(path) => PerfTable::load(path)?,
        None => {
            let table = scenario.table.clone().unwrap_or_default();
            table.validate()?;
            table
        }
    };

    let perf = CorePerf::new(
        table,
        Arc::new(TracingInterconnect),
        Arc::new(TracingClock),
    );

    for (index, step) in scenario.steps.iter().enumerate() {
        match apply_step(&perf, step) {
            Ok(()) => {}
            Err(e) if args.strict => {
                return Err(CliError::Scenario(format!("step {index} failed: {e}")));
            }
            Err(e) => println!("step {index}: rejected: {e}"),
        }
    }

    let snapshot = perf.snapshot();
    if args.json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    } else {
        print_snapshot(&snapshot);
    }
    Ok(())
}

/// Map one scenario step onto the arbitrator API.
fn apply_step(perf: &CorePerf, step: &Step) -> Result<(), PerfError> {
    match step {
        Step::Check { pipe, demand } => perf.check(PipeId(*pipe), demand),
        Step::Prepare { pipe, demand } => {
            perf.update(PipeId(*pipe), UpdatePhase::Prepare(demand))
        }
        Step::Complete { pipe } => perf.update(PipeId(*pipe), UpdatePhase::Complete),
        Step::Release { pipe } => {
            perf.release(PipeId(*pipe));
            Ok(())
        }
        Step::SetMode { mode } => perf.set_tuning_mode(TuningMode::try_from(*mode)?),
        Step::SetFixedClock { hz } => perf.set_fixed_clock_rate(*hz),
        Step::SetFixedAb { kbps } => perf.set_fixed_ab_vote(*kbps),
        Step::SetFixedIb { kbps } => perf.set_fixed_ib_vote(*kbps),
        Step::SetBandwidthRelease { enabled } => {
            perf.set_bandwidth_release(*enabled);
            Ok(())
        }
    }
}

fn print_snapshot(s: &PerfSnapshot) {
    println!();
    println!("Arbitration state");
    println!("=================");
    println!("Mode:              {}", s.mode);
    println!("Bandwidth release: {}", s.bandwidth_release_enabled);
    println!("Applied ab vote:   {} KB/s", s.applied_ab_kbps);
    println!("Applied ib vote:   {} KB/s", s.applied_ib_kbps);
    println!("Core clock:        {} Hz (ceiling {})", s.core_clk_hz, s.max_core_clk_hz);
    println!(
        "Computed aggregate: ab {} KB/s, ib {} KB/s, clk {} Hz",
        s.computed.bandwidth_kbps, s.computed.max_per_pipe_ib_kbps, s.computed.core_clk_hz
    );
    if let Some(fixed) = &s.fixed {
        println!(
            "Fixed override:    ab {} KB/s, ib {} KB/s, clk {} Hz",
            fixed.ab_kbps, fixed.ib_kbps, fixed.core_clk_hz
        );
    }
    println!("Active pipes:      {}", s.pipes.len());
    for pipe in &s.pipes {
        println!(
            "  {}: ab {} KB/s, ib {} KB/s, clk {} Hz{}",
            pipe.id,
            pipe.last_applied.bandwidth_kbps,
            pipe.last_applied.max_per_pipe_ib_kbps,
            pipe.last_applied.core_clk_hz,
            if pipe.pending.is_some() {
                " (commit in flight)"
            } else {
                ""
            }
        );
    }
    println!(
        "Counters:          {} rejected checks, {} applied updates, {} apply failures, {} releases",
        s.counters.checks_rejected,
        s.counters.updates_applied,
        s.counters.apply_failures,
        s.counters.releases
    );
}
