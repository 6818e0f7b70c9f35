//! ZNE Command-Line Interface
//!
//! The main entry point for the `zne` tool.
//!
//! ```text
//!   ⟨O⟩
//!    │ ●  mitigated
//!    │   ╲
//!    │     ○ λ=1
//!    │       ╲ ○ λ=3
//!    │            ╲ ○ λ=5
//!    └──────────────────── λ
//!     0   1   2   3   4   5
//! ```

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use console::style;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{fit, fold, run, version};
use zne_mitigation::ZneConfig;

/// Zero-noise extrapolation for noisy quantum circuits
#[derive(Parser)]
#[command(name = "zne")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// YAML configuration file
    #[arg(short, long, global = true, env = "ZNE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare raw and mitigated expectation values on the noisy simulator
    Run(run::RunArgs),

    /// Fold a circuit and print the result
    Fold(fold::FoldArgs),

    /// Fit a dataset of (scale factor, value) samples read from JSON
    Fit(fit::FitArgs),

    /// Show version information
    Version,
}

/// Pick the log filter: `ZNE_LOG` wins, then `-v` counts, then the config.
fn log_filter(verbose: u8, configured: &str) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_env("ZNE_LOG") {
        return filter;
    }
    let level = match verbose {
        0 => configured,
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    EnvFilter::new(level)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match ZneConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(log_filter(cli.verbose, &config.logging.level))
        .with_target(false)
        .init();

    // Execute command
    let result = match cli.command {
        Commands::Run(args) => run::execute(&args, &config).await,
        Commands::Fold(args) => fold::execute(&args, &config),
        Commands::Fit(args) => fit::execute(&args, &config),
        Commands::Version => {
            version::execute();
            Ok(())
        }
    };

    // Handle errors
    if let Err(e) = result {
        eprintln!("{} {:#}", style("Error:").red().bold(), e);
        std::process::exit(1);
    }

    Ok(())
}
