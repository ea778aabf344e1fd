//! Node state file: the ledger snapshot together with the reference
//! collaborators it runs against.

use std::path::Path;

use realty_custody::{PropertyRegistry, Vault};
use realty_settlement::{load_json, save_json, LedgerSnapshot, SettlementLedger};
use realty_types::{Account, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub type Ledger = SettlementLedger<PropertyRegistry, Vault>;

#[derive(Debug, Serialize, Deserialize)]
pub struct NodeState {
    pub ledger: LedgerSnapshot,
    pub registry: PropertyRegistry,
    pub vault: Vec<(Account, Decimal)>,
}

pub fn save(ledger: &Ledger, path: &Path) -> Result<()> {
    let state = NodeState {
        ledger: ledger.snapshot(),
        registry: ledger.registry().clone(),
        vault: ledger.vault().entries(),
    };
    save_json(path, &state)
}

/// Load and fully verify a saved ledger.
pub fn load(path: &Path) -> Result<Ledger> {
    let state: NodeState = load_json(path)?;
    let vault = Vault::from_entries(state.vault)?;
    SettlementLedger::restore(state.ledger, state.registry, vault)
}
