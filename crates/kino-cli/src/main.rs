//! Kino CLI - Playback Session Simulator
//!
//! Features:
//! - Scripted session scenarios on a virtual clock
//! - Buffering, error and failover timelines
//! - Configuration inspection and validation

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod output;
mod scenario;

/// Kino CLI - Playback session toolkit
#[derive(Parser)]
#[command(name = "kino-cli")]
#[command(author = "Purple Squirrel Media")]
#[command(version)]
#[command(about = "Playback session simulator", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Output format (text, json, table)
    #[arg(short, long, default_value = "text")]
    format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scenario file against the simulated strategy
    Simulate {
        /// Path to scenario JSON
        scenario: PathBuf,

        /// Also log plugin notifications through tracing
        #[arg(long)]
        trace_plugins: bool,
    },

    /// Show the default session configuration, or validate a file
    Config {
        /// Configuration JSON to validate
        path: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)),
        )
        .with_writer(std::io::stderr)
        .init();
    kino_session::init();

    let format = output::OutputFormat::from(cli.format.as_str());

    match cli.command {
        Commands::Simulate {
            scenario,
            trace_plugins,
        } => {
            commands::simulate(&scenario, format, trace_plugins)?;
        }
        Commands::Config { path } => {
            commands::config(path.as_deref())?;
        }
    }

    Ok(())
}
