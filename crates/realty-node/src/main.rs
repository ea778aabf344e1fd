//! realty-node: command-line host for the settlement ledger.
//!
//! Subcommands: init, deploy, show, verify.

mod commands;
mod logging;
mod state;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use realty_types::constants::{DEFAULT_CONFIG_FILE, DEFAULT_LOG_LEVEL};
use realty_types::{LedgerConfig, LogFormat};

/// Four-party escrow for tokenized property sales.
#[derive(Parser, Debug)]
#[command(name = "realty-node", version, about, long_about = None)]
struct Cli {
    /// Ledger configuration file.
    #[arg(long, short, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write a default configuration.
    Init(commands::init::InitArgs),
    /// Mint demo properties, list them, and save the ledger.
    Deploy(commands::deploy::DeployArgs),
    /// Print escrow records from the saved ledger.
    Show(commands::show::ShowArgs),
    /// Reload the saved ledger and check its integrity.
    Verify(commands::verify::VerifyArgs),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match &cli.command {
        Commands::Init(args) => {
            logging::init_logging(DEFAULT_LOG_LEVEL, LogFormat::Pretty)?;
            commands::init::run(args)
        }
        Commands::Deploy(args) => commands::deploy::run(&bootstrap(&cli.config)?, args),
        Commands::Show(args) => commands::show::run(&bootstrap(&cli.config)?, args),
        Commands::Verify(args) => commands::verify::run(&bootstrap(&cli.config)?, args),
    }
}

/// Load the config and start logging with its settings.
fn bootstrap(path: &Path) -> anyhow::Result<LedgerConfig> {
    let config = commands::load_config(path)?;
    logging::init_logging(&config.log_level, config.log_format)?;
    Ok(config)
}
