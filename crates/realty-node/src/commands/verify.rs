//! `realty-node verify`: reload the saved ledger and check its integrity.
//!
//! Loading alone re-verifies the journal chain, per-record flow identities
//! and custody of listed assets; this command adds a full conservation pass.

use clap::Args;
use realty_types::LedgerConfig;
use tracing::info;

use crate::state;

#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Also print every journal event.
    #[arg(long)]
    pub events: bool,
}

pub fn run(config: &LedgerConfig, args: &VerifyArgs) -> anyhow::Result<()> {
    let path = config.storage.snapshot_path();
    let ledger = state::load(&path)?;
    ledger.verify_conservation()?;

    let journal = ledger.journal();
    if args.events {
        for event in journal.events() {
            println!(
                "#{:<4} {:<10} {:<20} actor={} amount={} hash={}",
                event.sequence,
                event.asset_id.to_string(),
                event.kind.to_string(),
                event.actor,
                event.amount,
                event.hash_hex()
            );
        }
    }

    let listed = ledger.records().filter(|r| r.is_listed()).count();
    info!(records = ledger.records().count(), events = journal.len(), "ledger verified");
    println!(
        "OK: {} records ({listed} listed), {} events, head {}",
        ledger.records().count(),
        journal.len(),
        journal.head_hash_hex()
    );
    Ok(())
}
