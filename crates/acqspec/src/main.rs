//! acqspec launcher
//!
//! Builds acquisition schemas from flattened scan headers:
//! - **acquisitions**: list what a record file contains
//! - **init**: select fields and derive the starting schema
//! - **apply**: run an edit script against an exported document

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::debug;

mod cli;

#[derive(Parser, Debug)]
#[command(name = "acqspec", version, about = "Build acquisition schemas from scan headers")]
struct Cli {
    /// Enable verbose logging (info/debug to stderr)
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List acquisitions and available fields in a record file
    Acquisitions {
        /// JSON array of flat header records, one per file
        records: PathBuf,

        /// Field that names each record's acquisition
        #[arg(long)]
        acquisition_field: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Derive a schema for one acquisition
    Init(cli::init::InitArgs),

    /// Apply an edit script to an exported schema document
    Apply(cli::apply::ApplyArgs),

    /// Show resolved configuration
    Config {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn run_command(cli: Cli, config: &cli::config::AcqspecConfig) -> Result<()> {
    match cli.command {
        Commands::Acquisitions {
            records,
            acquisition_field,
            json,
        } => cli::acquisitions::run(
            cli::acquisitions::AcquisitionsArgs {
                records,
                acquisition_field,
                json,
            },
            config,
        ),
        Commands::Init(args) => cli::init::run(args, config),
        Commands::Apply(args) => cli::apply::run(args),
        Commands::Config { json } => cli::config::run(config, json),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match cli::config::AcqspecConfig::load() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            return ExitCode::from(2);
        }
    };

    if let Err(err) = acqspec_logging::init_logging(acqspec_logging::LogConfig {
        app_name: "acqspec",
        verbose: cli.verbose,
        filter: config.log_filter.as_deref(),
    }) {
        eprintln!("Warning: logging disabled: {:#}", err);
    }
    debug!(command = ?cli.command, "starting");

    match run_command(cli, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            ExitCode::from(1)
        }
    }
}
