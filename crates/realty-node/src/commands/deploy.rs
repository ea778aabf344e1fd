//! `realty-node deploy`: mint the demo properties, hand them to the ledger,
//! list them for one buyer, and save the resulting state.

use anyhow::Context;
use clap::Args;
use realty_custody::{PropertyRegistry, Vault};
use realty_settlement::SettlementLedger;
use realty_types::{LedgerConfig, PartyId};
use rust_decimal::Decimal;
use tracing::info;

use crate::state;

/// Metadata location of the demo properties; `/{n}.json` is appended.
const PROPERTY_URI_BASE: &str = "https://ipfs.io/ipfs/QmQVcpsjrA6cr1iJjZAodYwmPekYgbnXGo4DFubJiLc2EB";

/// `(purchase price, escrow amount)` of each demo listing.
const LISTINGS: [(i64, i64); 3] = [(20, 10), (15, 5), (10, 5)];

#[derive(Args, Debug)]
pub struct DeployArgs {
    /// Buyer the demo properties are listed for.
    #[arg(long, default_value = "buyer")]
    pub buyer: String,

    /// Starting wallet balance of the buyer.
    #[arg(long, default_value = "100")]
    pub buyer_funds: Decimal,

    /// Starting wallet balance of the lender.
    #[arg(long, default_value = "100")]
    pub lender_funds: Decimal,

    /// Replace an existing saved ledger.
    #[arg(long)]
    pub force: bool,
}

pub fn run(config: &LedgerConfig, args: &DeployArgs) -> anyhow::Result<()> {
    let path = config.storage.snapshot_path();
    if path.exists() && !args.force {
        anyhow::bail!(
            "a ledger is already saved at {} (use --force to replace it)",
            path.display()
        );
    }

    let seller = config.roles.seller.clone();
    let buyer = PartyId::new(args.buyer.as_str());

    let mut registry = PropertyRegistry::new(config.registry_id.clone());
    let assets: Vec<_> = (1..=LISTINGS.len())
        .map(|n| registry.mint(&seller, format!("{PROPERTY_URI_BASE}/{n}.json")))
        .collect();
    info!(count = assets.len(), registry = %config.registry_id, "properties minted");

    for asset_id in &assets {
        registry.approve(&seller, *asset_id, &config.ledger_account)?;
    }

    let mut vault = Vault::new();
    for (party, funds) in [(&buyer, args.buyer_funds), (&config.roles.lender, args.lender_funds)] {
        if funds > Decimal::ZERO {
            vault.credit(party, funds)?;
        }
    }

    let mut ledger = SettlementLedger::new(config.clone(), registry, vault)?;
    for (asset_id, (price, earnest)) in assets.iter().zip(LISTINGS) {
        ledger
            .list(&seller, *asset_id, &buyer, Decimal::from(price), Decimal::from(earnest))
            .with_context(|| format!("listing {asset_id}"))?;
    }

    state::save(&ledger, &path)?;
    println!(
        "Deployed {} listings for {buyer} to {}",
        assets.len(),
        path.display()
    );
    Ok(())
}
