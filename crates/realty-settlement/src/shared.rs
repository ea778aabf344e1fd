//! Thread-safe handle over one ledger.
//!
//! A single mutex covers the whole ledger: every operation, mutating or
//! not, runs to completion before the next one starts. Operations never
//! wait on each other for anything other than this lock.

use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};
use realty_custody::{AssetRegistry, ValueTransfer};
use realty_types::{AssetId, EscrowRecord, PartyId, Result};
use rust_decimal::Decimal;

use crate::ledger::SettlementLedger;
use crate::snapshot::LedgerSnapshot;

/// Cloneable, coarse-locked ledger handle.
pub struct SharedLedger<R: AssetRegistry, V: ValueTransfer> {
    inner: Arc<Mutex<SettlementLedger<R, V>>>,
}

impl<R: AssetRegistry, V: ValueTransfer> Clone for SharedLedger<R, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<R: AssetRegistry, V: ValueTransfer> SharedLedger<R, V> {
    #[must_use]
    pub fn new(ledger: SettlementLedger<R, V>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ledger)),
        }
    }

    /// Hold the lock across several calls.
    pub fn lock(&self) -> MutexGuard<'_, SettlementLedger<R, V>> {
        self.inner.lock()
    }

    /// Run a read-only closure under the lock.
    pub fn read<T>(&self, f: impl FnOnce(&SettlementLedger<R, V>) -> T) -> T {
        f(&self.inner.lock())
    }

    pub fn list(
        &self,
        caller: &PartyId,
        asset_id: AssetId,
        buyer: &PartyId,
        purchase_price: Decimal,
        escrow_amount: Decimal,
    ) -> Result<()> {
        self.inner
            .lock()
            .list(caller, asset_id, buyer, purchase_price, escrow_amount)
    }

    pub fn deposit_earnest(&self, caller: &PartyId, asset_id: AssetId, value: Decimal) -> Result<()> {
        self.inner.lock().deposit_earnest(caller, asset_id, value)
    }

    pub fn fund_loan(&self, caller: &PartyId, asset_id: AssetId, value: Decimal) -> Result<()> {
        self.inner.lock().fund_loan(caller, asset_id, value)
    }

    pub fn approve_sale(&self, caller: &PartyId, asset_id: AssetId) -> Result<()> {
        self.inner.lock().approve_sale(caller, asset_id)
    }

    pub fn update_inspection_status(&self, caller: &PartyId, asset_id: AssetId, passed: bool) -> Result<()> {
        self.inner
            .lock()
            .update_inspection_status(caller, asset_id, passed)
    }

    pub fn finalize_sale(&self, caller: &PartyId, asset_id: AssetId) -> Result<()> {
        self.inner.lock().finalize_sale(caller, asset_id)
    }

    pub fn cancel_sale(&self, caller: &PartyId, asset_id: AssetId) -> Result<()> {
        self.inner.lock().cancel_sale(caller, asset_id)
    }

    #[must_use]
    pub fn is_listed(&self, asset_id: AssetId) -> bool {
        self.inner.lock().is_listed(asset_id)
    }

    #[must_use]
    pub fn deposited_balance(&self, asset_id: AssetId) -> Decimal {
        self.inner.lock().deposited_balance(asset_id)
    }

    /// Owned copy of one record.
    pub fn record(&self, asset_id: AssetId) -> Result<EscrowRecord> {
        self.inner.lock().record(asset_id).cloned()
    }

    #[must_use]
    pub fn snapshot(&self) -> LedgerSnapshot {
        self.inner.lock().snapshot()
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use realty_custody::{PropertyRegistry, Vault};
    use realty_types::LedgerConfig;

    use super::*;

    #[test]
    fn clones_share_state() {
        let config = LedgerConfig::dummy();
        let mut registry = PropertyRegistry::new(config.registry_id.clone());
        let asset = registry.mint(&config.ledger_account, "uri");
        let ledger = SettlementLedger::new(config, registry, Vault::new()).unwrap();
        let a = SharedLedger::new(ledger);
        let b = a.clone();

        a.list(
            &PartyId::new("seller"),
            asset,
            &PartyId::new("buyer"),
            Decimal::new(10, 0),
            Decimal::ZERO,
        )
        .unwrap();
        assert!(b.is_listed(asset));
        assert_eq!(b.read(|l| l.journal().len()), 1);
    }

    #[test]
    fn concurrent_approvals_serialize() {
        let config = LedgerConfig::dummy();
        let mut registry = PropertyRegistry::new(config.registry_id.clone());
        let asset = registry.mint(&config.ledger_account, "uri");
        let ledger = SettlementLedger::new(config, registry, Vault::new()).unwrap();
        let shared = SharedLedger::new(ledger);
        shared
            .list(
                &PartyId::new("seller"),
                asset,
                &PartyId::new("buyer"),
                Decimal::new(10, 0),
                Decimal::ZERO,
            )
            .unwrap();

        let handles: Vec<_> = ["buyer", "seller", "lender", "buyer", "seller", "lender"]
            .into_iter()
            .map(|who| {
                let s = shared.clone();
                thread::spawn(move || s.approve_sale(&PartyId::new(who), asset))
            })
            .collect();
        for h in handles {
            h.join().unwrap().unwrap();
        }

        let rec = shared.record(asset).unwrap();
        assert!(rec.approvals.first_missing().is_none());
        // One Listed event plus exactly one Approved event per role.
        assert_eq!(shared.read(|l| l.journal().len()), 4);
        assert!(shared.read(|l| l.journal().verify_chain().is_ok()));
    }
}
