//! Table command - inspect a platform performance table.

use std::path::PathBuf;

use clap::Args;

use headroom::PerfTable;

use crate::error::CliError;

/// Arguments for the table command.
#[derive(Debug, Args)]
pub struct TableArgs {
    /// Platform table JSON file. Omit to show the built-in defaults.
    pub path: Option<PathBuf>,

    /// Print the table as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Run the table command.
pub fn run(args: TableArgs) -> Result<(), CliError> {
    let table = match &args.path {
        Some(path) => PerfTable::load(path)?,
        None => PerfTable::default(),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&table)?);
        return Ok(());
    }

    println!();
    println!("Platform performance table");
    println!("==========================");
    println!("Bandwidth overhead:  {}%", table.bw_overhead_pct);
    println!("Clock overhead:      {}%", table.clk_overhead_pct);
    println!("Per-pipe ib floor:   {} KB/s", table.min_pipe_ib_kbps);
    println!("Per-pipe ib ceiling: {} KB/s", table.max_pipe_ib_kbps);
    println!("Aggregate bw limit:  {} KB/s", table.max_bandwidth_kbps);
    println!("Core clock limit:    {} Hz", table.max_core_clk_hz);
    println!("Formats:");
    for cost in &table.formats {
        println!("  {:<9} {} bpp", cost.format, cost.bits_per_pixel);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_run_with_defaults() {
        let args = TableArgs {
            path: None,
            json: false,
        };
        assert!(run(args).is_ok());
    }

    #[test]
    fn test_run_rejects_bad_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{\"min_pipe_ib_kbps\": 9999999}}").unwrap();

        let args = TableArgs {
            path: Some(file.path().to_path_buf()),
            json: true,
        };
        assert!(matches!(run(args), Err(CliError::Table(_))));
    }
}
