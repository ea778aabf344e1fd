//! `realty-node show`: print escrow records from the saved ledger.

use clap::Args;
use realty_types::{ApprovalRole, AssetId, EscrowRecord, LedgerConfig};

use crate::state;

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Show a single asset.
    #[arg(long)]
    pub asset: Option<u64>,

    /// Print records as JSON.
    #[arg(long)]
    pub json: bool,
}

pub fn run(config: &LedgerConfig, args: &ShowArgs) -> anyhow::Result<()> {
    let ledger = state::load(&config.storage.snapshot_path())?;

    let records: Vec<&EscrowRecord> = match args.asset {
        Some(n) => vec![ledger.record(AssetId(n))?],
        None => ledger.records().collect(),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    println!(
        "registry {}  seller {}  inspector {}  lender {}",
        ledger.registry_id(),
        ledger.seller(),
        ledger.inspector(),
        ledger.lender()
    );
    for rec in records {
        println!("{}", summary_line(rec));
    }
    Ok(())
}

fn summary_line(rec: &EscrowRecord) -> String {
    let flags: String = ApprovalRole::ALL
        .iter()
        .map(|role| if rec.approval(*role) { 'Y' } else { '-' })
        .collect();
    format!(
        "{:<10} {:<10} buyer={} price={} earnest={} held={} inspection={} approvals[BSL]={}",
        rec.asset_id.to_string(),
        rec.state.to_string(),
        rec.buyer,
        rec.purchase_price,
        rec.escrow_amount,
        rec.deposited_balance,
        if rec.inspection_passed { "passed" } else { "pending" },
        flags
    )
}
