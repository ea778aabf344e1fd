//! `realty-node init`: write a default ledger configuration.

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use realty_settlement::save_json;
use realty_types::constants::DEFAULT_CONFIG_FILE;
use realty_types::{LedgerConfig, PartyRoles};

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Directory to initialize (defaults to current directory).
    #[arg(default_value = ".")]
    pub dir: PathBuf,

    /// Account under which the ledger holds custody.
    #[arg(long, default_value = "escrow-ledger")]
    pub ledger_account: String,

    /// Asset registry the ledger is bound to.
    #[arg(long, default_value = "property-registry")]
    pub registry_id: String,

    #[arg(long, default_value = "seller")]
    pub seller: String,

    #[arg(long, default_value = "inspector")]
    pub inspector: String,

    #[arg(long, default_value = "lender")]
    pub lender: String,

    /// Overwrite an existing configuration.
    #[arg(long)]
    pub force: bool,
}

pub fn run(args: &InitArgs) -> anyhow::Result<()> {
    let config_path = args.dir.join(DEFAULT_CONFIG_FILE);

    if config_path.exists() && !args.force {
        anyhow::bail!(
            "configuration file already exists at {} (use --force to overwrite)",
            config_path.display()
        );
    }

    let roles = PartyRoles::new(args.seller.as_str(), args.inspector.as_str(), args.lender.as_str());
    let config = LedgerConfig::new(args.ledger_account.as_str(), args.registry_id.as_str(), roles)
        .with_data_dir(args.dir.join("data"));
    config.validate().context("refusing to write an invalid configuration")?;

    std::fs::create_dir_all(&config.storage.data_dir)?;
    save_json(&config_path, &config)?;

    println!("Initialized realty ledger config at {}", config_path.display());
    println!("Run 'realty-node --config {} deploy' to list the demo properties.", config_path.display());
    Ok(())
}
