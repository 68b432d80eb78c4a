//! Host simulator for the tether serial driver.
//!
//! Usage:
//!   tether-sim run <scenario.toml>    - Run a scenario and print its transcript
//!   tether-sim check <scenario.toml>  - Validate a scenario file only

mod config;
mod scenario;

use std::fmt;
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tether_serial::log::{self, LogLevel};

use crate::config::SimConfig;

#[derive(Parser)]
#[command(name = "tether-sim")]
#[command(about = "Drive the tether serial driver through scripted scenarios")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scenario and print its transcript
    Run {
        /// Scenario file
        scenario: PathBuf,

        /// Hide driver log output
        #[arg(short, long)]
        quiet: bool,
    },

    /// Validate a scenario file without running it
    Check {
        /// Scenario file
        scenario: PathBuf,
    },
}

fn print_log(level: LogLevel, args: fmt::Arguments<'_>) {
    eprintln!("[{}] {args}", level.name());
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { scenario, quiet } => {
            let config = SimConfig::load(&scenario)?;
            if !quiet {
                log::set_max_level(config.log_level.into());
                // SAFETY: `print_log` only writes to stderr, which is safe from
                // any context in this single-threaded tool.
                unsafe { log::set_log_fn(print_log) };
            }

            let outcome = scenario::run(&config)?;
            for line in &outcome.transcript {
                println!("{line}");
            }
        }
        Commands::Check { scenario } => {
            let config = SimConfig::load(&scenario)?;
            println!(
                "{}: ok ({} step(s), rx {} / tx {} bytes)",
                scenario.display(),
                config.steps.len(),
                config.queues.rx_capacity,
                config.queues.tx_capacity,
            );
        }
    }

    Ok(())
}
