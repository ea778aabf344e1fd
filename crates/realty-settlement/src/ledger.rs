//! The settlement ledger.
//!
//! Holds one [`EscrowRecord`] per listed asset and drives it through
//! `LISTED → FINALIZED | CANCELLED`. Every mutating operation:
//! 1. Checks the caller's role
//! 2. Checks record existence and state
//! 3. Validates arguments
//! 4. Calls collaborators (registry, vault)
//! 5. Commits the record change and appends a journal event
//!
//! Steps 1-3 never touch state. Close operations first check that custody
//! and the escrow scope match the record, then move funds and custody
//! together. If a collaborator call fails, completed moves are undone before
//! the error is returned. If an undo itself fails the caller gets
//! `RollbackIncomplete` naming the stranded amount. Once a close has
//! committed it always returns `Ok`.

use std::collections::BTreeMap;

use chrono::Utc;
use realty_custody::{AssetRegistry, ValueTransfer};
use realty_types::constants::SNAPSHOT_FORMAT_VERSION;
use realty_types::{
    ApprovalRole, AssetId, EarnestPolicy, EscrowError, EscrowRecord, EscrowState, EventKind,
    LedgerConfig, PartyId, Result, Role,
};
use rust_decimal::Decimal;
use tracing::{debug, error, info, warn};

use crate::conservation::Conservation;
use crate::journal::Journal;
use crate::snapshot::LedgerSnapshot;

/// Four-party escrow over tokenized properties.
///
/// All methods take `&self`/`&mut self`; wrap in
/// [`SharedLedger`](crate::SharedLedger) for concurrent callers.
pub struct SettlementLedger<R: AssetRegistry, V: ValueTransfer> {
    config: LedgerConfig,
    records: BTreeMap<AssetId, EscrowRecord>,
    registry: R,
    vault: V,
    journal: Journal,
    conservation: Conservation,
}

impl<R: AssetRegistry, V: ValueTransfer> SettlementLedger<R, V> {
    /// Create an empty ledger bound to `registry` and `vault`.
    ///
    /// # Errors
    /// `Configuration` if the config is invalid or names a different registry.
    pub fn new(config: LedgerConfig, registry: R, vault: V) -> Result<Self> {
        config.validate()?;
        check_registry_binding(&config, &registry)?;
        info!(
            ledger = %config.ledger_account,
            registry = %config.registry_id,
            seller = %config.roles.seller,
            inspector = %config.roles.inspector,
            lender = %config.roles.lender,
            "settlement ledger created"
        );
        Ok(Self {
            config,
            records: BTreeMap::new(),
            registry,
            vault,
            journal: Journal::new(),
            conservation: Conservation::new(),
        })
    }

    /// Rebuild a ledger from a snapshot and the collaborators it was taken with.
    ///
    /// Verifies the journal chain, each record's flow identity, and that every
    /// listed record is still held in custody with a matching escrow balance.
    pub fn restore(snapshot: LedgerSnapshot, registry: R, vault: V) -> Result<Self> {
        snapshot.check_version()?;
        let LedgerSnapshot {
            config,
            records,
            journal,
            ..
        } = snapshot;
        config.validate()?;
        check_registry_binding(&config, &registry)?;
        let journal = Journal::from_events(journal)?;

        let mut by_id = BTreeMap::new();
        for rec in records {
            if !rec.is_balanced() {
                return Err(EscrowError::ConservationViolation {
                    reason: format!(
                        "{}: earnest {} + loan {} != held {} + disbursed {}",
                        rec.asset_id,
                        rec.earnest_total,
                        rec.loan_total,
                        rec.deposited_balance,
                        rec.disbursed_total
                    ),
                });
            }
            if rec.is_listed() {
                let custodian = registry.custodian_of(rec.asset_id)?;
                if custodian != config.ledger_account {
                    return Err(EscrowError::RegistryFailure {
                        asset_id: rec.asset_id,
                        reason: format!("listed asset is held by {custodian}, not the ledger"),
                    });
                }
            }
            let asset_id = rec.asset_id;
            if by_id.insert(asset_id, rec).is_some() {
                return Err(EscrowError::Serialization(format!(
                    "duplicate record for {asset_id} in snapshot"
                )));
            }
        }

        let conservation = Conservation::from_records(by_id.values());
        for asset_id in by_id.keys() {
            conservation.verify(*asset_id, vault.balance_of(*asset_id))?;
        }

        info!(
            records = by_id.len(),
            events = journal.len(),
            head = %journal.head_hash_hex(),
            "settlement ledger restored"
        );
        Ok(Self {
            config,
            records: by_id,
            registry,
            vault,
            journal,
            conservation,
        })
    }

    /// Capture the ledger's own state.
    #[must_use]
    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            format_version: SNAPSHOT_FORMAT_VERSION,
            config: self.config.clone(),
            records: self.records.values().cloned().collect(),
            journal: self.journal.events().to_vec(),
            taken_at: Utc::now(),
        }
    }

    // -----------------------------------------------------------------------
    // Mutating operations
    // -----------------------------------------------------------------------

    /// Open an escrow for `asset_id` in favour of `buyer`. Seller only.
    ///
    /// The ledger must already hold custody, or the seller must hold it and
    /// have approved the ledger, in which case custody is pulled here.
    pub fn list(
        &mut self,
        caller: &PartyId,
        asset_id: AssetId,
        buyer: &PartyId,
        purchase_price: Decimal,
        escrow_amount: Decimal,
    ) -> Result<()> {
        let result = self.try_list(caller, asset_id, buyer, purchase_price, escrow_amount);
        rejected("list", caller, asset_id, result)
    }

    fn try_list(
        &mut self,
        caller: &PartyId,
        asset_id: AssetId,
        buyer: &PartyId,
        purchase_price: Decimal,
        escrow_amount: Decimal,
    ) -> Result<()> {
        self.require_role(caller, Role::Seller, "list")?;
        if let Some(existing) = self.records.get(&asset_id) {
            if existing.state.is_terminal() {
                return Err(EscrowError::InvalidState {
                    asset_id,
                    state: existing.state,
                    operation: "list",
                });
            }
            return Err(EscrowError::AlreadyListed(asset_id));
        }
        if purchase_price <= Decimal::ZERO {
            return Err(EscrowError::InvalidAmount {
                reason: format!("purchase price must be positive, got {purchase_price}"),
            });
        }
        if escrow_amount < Decimal::ZERO {
            return Err(EscrowError::InvalidAmount {
                reason: format!("escrow amount must not be negative, got {escrow_amount}"),
            });
        }
        self.check_buyer(buyer)?;
        self.take_custody(asset_id)?;

        let now = Utc::now();
        self.records.insert(
            asset_id,
            EscrowRecord::new(asset_id, buyer.clone(), purchase_price, escrow_amount, now),
        );
        self.journal
            .append(asset_id, EventKind::Listed, caller, Decimal::ZERO, now);
        info!(%asset_id, %buyer, %purchase_price, %escrow_amount, "asset listed");
        Ok(())
    }

    /// Add earnest funds from the record's buyer.
    pub fn deposit_earnest(&mut self, caller: &PartyId, asset_id: AssetId, value: Decimal) -> Result<()> {
        let result = self.try_deposit_earnest(caller, asset_id, value);
        rejected("deposit_earnest", caller, asset_id, result)
    }

    fn try_deposit_earnest(&mut self, caller: &PartyId, asset_id: AssetId, value: Decimal) -> Result<()> {
        let rec = self.get(asset_id)?;
        if *caller != rec.buyer {
            return Err(unauthorized(caller, "deposit earnest"));
        }
        ensure_listed(rec, "deposit earnest")?;
        ensure_positive(value)?;
        if self.config.earnest_policy == EarnestPolicy::AtLeastEscrowAmount {
            let offered = rec.earnest_total + value;
            if offered < rec.escrow_amount {
                return Err(EscrowError::EarnestBelowMinimum {
                    required: rec.escrow_amount,
                    offered,
                });
            }
        }

        self.vault.deposit(caller, asset_id, value)?;
        let rec = self.get_mut(asset_id)?;
        rec.record_earnest(value);
        let held = rec.deposited_balance;
        self.conservation.record_inflow(asset_id, value);
        self.journal
            .append(asset_id, EventKind::EarnestDeposited, caller, value, Utc::now());
        info!(%asset_id, %value, %held, "earnest deposited");
        Ok(())
    }

    /// Add the lender's contribution. Lender only.
    pub fn fund_loan(&mut self, caller: &PartyId, asset_id: AssetId, value: Decimal) -> Result<()> {
        let result = self.try_fund_loan(caller, asset_id, value);
        rejected("fund_loan", caller, asset_id, result)
    }

    fn try_fund_loan(&mut self, caller: &PartyId, asset_id: AssetId, value: Decimal) -> Result<()> {
        self.require_role(caller, Role::Lender, "fund loan")?;
        ensure_listed(self.get(asset_id)?, "fund loan")?;
        ensure_positive(value)?;

        self.vault.deposit(caller, asset_id, value)?;
        let rec = self.get_mut(asset_id)?;
        rec.record_loan(value);
        let held = rec.deposited_balance;
        self.conservation.record_inflow(asset_id, value);
        self.journal
            .append(asset_id, EventKind::LoanFunded, caller, value, Utc::now());
        info!(%asset_id, %value, %held, "loan funded");
        Ok(())
    }

    /// Record the caller's approval. Buyer of the record, seller or lender.
    ///
    /// Approving twice is a no-op.
    pub fn approve_sale(&mut self, caller: &PartyId, asset_id: AssetId) -> Result<()> {
        let result = self.try_approve_sale(caller, asset_id);
        rejected("approve_sale", caller, asset_id, result)
    }

    fn try_approve_sale(&mut self, caller: &PartyId, asset_id: AssetId) -> Result<()> {
        let rec = self.get(asset_id)?;
        let role = self
            .approval_role_of(rec, caller)
            .ok_or_else(|| unauthorized(caller, "approve"))?;
        ensure_listed(rec, "approve")?;

        let fresh = self.get_mut(asset_id)?.approvals.approve(role);
        if fresh {
            self.journal
                .append(asset_id, EventKind::Approved(role), caller, Decimal::ZERO, Utc::now());
            info!(%asset_id, %role, "sale approved");
        } else {
            debug!(%asset_id, %role, "approval already recorded");
        }
        Ok(())
    }

    /// Record the inspection outcome. Inspector only.
    ///
    /// A pass may be retracted while the record is listed.
    pub fn update_inspection_status(&mut self, caller: &PartyId, asset_id: AssetId, passed: bool) -> Result<()> {
        let result = self.try_update_inspection_status(caller, asset_id, passed);
        rejected("update_inspection_status", caller, asset_id, result)
    }

    fn try_update_inspection_status(&mut self, caller: &PartyId, asset_id: AssetId, passed: bool) -> Result<()> {
        self.require_role(caller, Role::Inspector, "update inspection")?;
        ensure_listed(self.get(asset_id)?, "update inspection")?;

        let rec = self.get_mut(asset_id)?;
        let previous = rec.inspection_passed;
        rec.inspection_passed = passed;
        self.journal.append(
            asset_id,
            EventKind::InspectionUpdated { passed },
            caller,
            Decimal::ZERO,
            Utc::now(),
        );
        if previous && !passed {
            warn!(%asset_id, "inspection pass retracted");
        } else {
            info!(%asset_id, passed, "inspection updated");
        }
        Ok(())
    }

    /// Close the sale: pay the whole held balance to the seller and move
    /// custody to the buyer, or change nothing. Seller only.
    pub fn finalize_sale(&mut self, caller: &PartyId, asset_id: AssetId) -> Result<()> {
        let result = self.try_finalize_sale(caller, asset_id);
        rejected("finalize_sale", caller, asset_id, result)
    }

    fn try_finalize_sale(&mut self, caller: &PartyId, asset_id: AssetId) -> Result<()> {
        self.require_role(caller, Role::Seller, "finalize")?;
        let rec = self.get(asset_id)?;
        ensure_listed(rec, "finalize")?;
        if let Some(condition) = rec.finalize_blocker() {
            return Err(EscrowError::PreconditionNotMet { asset_id, condition });
        }

        let amount = rec.deposited_balance;
        let buyer = rec.buyer.clone();
        let seller = self.config.roles.seller.clone();
        self.preflight_close(asset_id, amount)?;
        self.settle(asset_id, &[(seller.clone(), amount)], &buyer)?;

        let now = Utc::now();
        let released = self.get_mut(asset_id)?.mark_finalized(now)?;
        self.conservation.record_outflow(asset_id, released);
        self.journal
            .append(asset_id, EventKind::Finalized, caller, released, now);
        self.audit_scope(asset_id);
        info!(%asset_id, %buyer, %seller, amount = %released, "sale finalized");
        Ok(())
    }

    /// Abort the sale: refund held funds and return custody to the seller.
    /// Seller or the record's buyer.
    ///
    /// Lender funds always go back to the lender. Earnest goes back to the
    /// buyer unless inspection has passed, in which case the seller keeps it.
    pub fn cancel_sale(&mut self, caller: &PartyId, asset_id: AssetId) -> Result<()> {
        let result = self.try_cancel_sale(caller, asset_id);
        rejected("cancel_sale", caller, asset_id, result)
    }

    fn try_cancel_sale(&mut self, caller: &PartyId, asset_id: AssetId) -> Result<()> {
        let rec = self.get(asset_id)?;
        if *caller != self.config.roles.seller && *caller != rec.buyer {
            return Err(unauthorized(caller, "cancel"));
        }
        ensure_listed(rec, "cancel")?;

        let earnest_to = if rec.inspection_passed {
            self.config.roles.seller.clone()
        } else {
            rec.buyer.clone()
        };
        let payouts = [
            (self.config.roles.lender.clone(), rec.loan_total),
            (earnest_to.clone(), rec.earnest_total),
        ];
        let held = rec.deposited_balance;
        let seller = self.config.roles.seller.clone();
        self.preflight_close(asset_id, held)?;
        self.settle(asset_id, &payouts, &seller)?;

        let now = Utc::now();
        let released = self.get_mut(asset_id)?.mark_cancelled(now)?;
        self.conservation.record_outflow(asset_id, released);
        self.journal
            .append(asset_id, EventKind::Cancelled, caller, released, now);
        self.audit_scope(asset_id);
        info!(%asset_id, %caller, refunded = %released, earnest_to = %earnest_to, "sale cancelled");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    #[must_use]
    pub fn is_listed(&self, asset_id: AssetId) -> bool {
        self.records.get(&asset_id).is_some_and(EscrowRecord::is_listed)
    }

    #[must_use]
    pub fn buyer(&self, asset_id: AssetId) -> Option<&PartyId> {
        self.records.get(&asset_id).map(|r| &r.buyer)
    }

    #[must_use]
    pub fn seller(&self) -> &PartyId {
        &self.config.roles.seller
    }

    #[must_use]
    pub fn inspector(&self) -> &PartyId {
        &self.config.roles.inspector
    }

    #[must_use]
    pub fn lender(&self) -> &PartyId {
        &self.config.roles.lender
    }

    #[must_use]
    pub fn purchase_price(&self, asset_id: AssetId) -> Decimal {
        self.records.get(&asset_id).map_or(Decimal::ZERO, |r| r.purchase_price)
    }

    #[must_use]
    pub fn escrow_amount(&self, asset_id: AssetId) -> Decimal {
        self.records.get(&asset_id).map_or(Decimal::ZERO, |r| r.escrow_amount)
    }

    /// Whether `party` has approved the sale of `asset_id`. False for parties
    /// without an approval role on that record.
    #[must_use]
    pub fn approval(&self, asset_id: AssetId, party: &PartyId) -> bool {
        self.records.get(&asset_id).is_some_and(|rec| {
            self.approval_role_of(rec, party)
                .is_some_and(|role| rec.approval(role))
        })
    }

    #[must_use]
    pub fn inspection_passed(&self, asset_id: AssetId) -> bool {
        self.records.get(&asset_id).is_some_and(|r| r.inspection_passed)
    }

    #[must_use]
    pub fn deposited_balance(&self, asset_id: AssetId) -> Decimal {
        self.records.get(&asset_id).map_or(Decimal::ZERO, |r| r.deposited_balance)
    }

    /// The full record.
    ///
    /// # Errors
    /// `NotFound` if the asset was never listed.
    pub fn record(&self, asset_id: AssetId) -> Result<&EscrowRecord> {
        self.get(asset_id)
    }

    /// All records in asset id order.
    pub fn records(&self) -> impl Iterator<Item = &EscrowRecord> {
        self.records.values()
    }

    #[must_use]
    pub fn registry_id(&self) -> &str {
        &self.config.registry_id
    }

    #[must_use]
    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    #[must_use]
    pub fn journal(&self) -> &Journal {
        &self.journal
    }

    #[must_use]
    pub fn registry(&self) -> &R {
        &self.registry
    }

    #[must_use]
    pub fn vault(&self) -> &V {
        &self.vault
    }

    /// Check every record's flow identity and every scope against the vault.
    ///
    /// # Errors
    /// `ConservationViolation` at the first mismatch.
    pub fn verify_conservation(&self) -> Result<()> {
        for rec in self.records.values() {
            if !rec.is_balanced() {
                return Err(EscrowError::ConservationViolation {
                    reason: format!("{}: record flows do not balance", rec.asset_id),
                });
            }
        }
        let mut scopes = self.conservation.tracked_scopes();
        scopes.extend(self.records.keys().copied());
        scopes.sort_unstable();
        scopes.dedup();
        for asset_id in scopes {
            self.check_scope(asset_id)?;
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn get(&self, asset_id: AssetId) -> Result<&EscrowRecord> {
        self.records.get(&asset_id).ok_or(EscrowError::NotFound(asset_id))
    }

    fn get_mut(&mut self, asset_id: AssetId) -> Result<&mut EscrowRecord> {
        self.records
            .get_mut(&asset_id)
            .ok_or(EscrowError::NotFound(asset_id))
    }

    fn require_role(&self, caller: &PartyId, role: Role, operation: &'static str) -> Result<()> {
        if self.config.roles.holds(caller, role) {
            Ok(())
        } else {
            Err(unauthorized(caller, operation))
        }
    }

    fn approval_role_of(&self, rec: &EscrowRecord, party: &PartyId) -> Option<ApprovalRole> {
        if *party == rec.buyer {
            Some(ApprovalRole::Buyer)
        } else if *party == self.config.roles.seller {
            Some(ApprovalRole::Seller)
        } else if *party == self.config.roles.lender {
            Some(ApprovalRole::Lender)
        } else {
            None
        }
    }

    fn check_buyer(&self, buyer: &PartyId) -> Result<()> {
        if !buyer.is_valid() {
            return Err(EscrowError::InvalidListing {
                reason: format!("buyer {buyer:?} is not a valid party id"),
            });
        }
        if let Some(role) = self.config.roles.global_role_of(buyer) {
            return Err(EscrowError::InvalidListing {
                reason: format!("buyer {buyer} already holds the {role} role"),
            });
        }
        if *buyer == self.config.ledger_account {
            return Err(EscrowError::InvalidListing {
                reason: "buyer cannot be the ledger account".into(),
            });
        }
        Ok(())
    }

    /// Ensure the ledger holds custody, pulling it from a seller who
    /// approved the ledger.
    fn take_custody(&mut self, asset_id: AssetId) -> Result<()> {
        let ledger = &self.config.ledger_account;
        let seller = &self.config.roles.seller;
        let custodian = self.registry.custodian_of(asset_id)?;
        if custodian == *ledger {
            return Ok(());
        }
        if custodian == *seller && self.registry.approved_transferee(asset_id).as_ref() == Some(ledger) {
            self.registry.transfer_custody(ledger, asset_id, seller, ledger)?;
            debug!(%asset_id, "custody pulled from seller");
            return Ok(());
        }
        Err(EscrowError::RegistryFailure {
            asset_id,
            reason: format!("ledger is not custodian (held by {custodian}) and holds no approval"),
        })
    }

    /// Read-only checks that the collaborators can carry out a close: the
    /// ledger holds custody and the escrow scope holds exactly what the
    /// record says it does.
    fn preflight_close(&self, asset_id: AssetId, amount: Decimal) -> Result<()> {
        let custodian = self.registry.custodian_of(asset_id)?;
        if custodian != self.config.ledger_account {
            return Err(EscrowError::RegistryFailure {
                asset_id,
                reason: format!("ledger is not custodian (held by {custodian})"),
            });
        }
        self.check_scope(asset_id)?;
        let available = self.vault.balance_of(asset_id);
        if available < amount {
            return Err(EscrowError::InsufficientFunds {
                needed: amount,
                available,
            });
        }
        Ok(())
    }

    /// Pay out of the escrow scope, then hand custody to `custody_to`.
    /// Any failure undoes the payouts already made.
    fn settle(&mut self, asset_id: AssetId, payouts: &[(PartyId, Decimal)], custody_to: &PartyId) -> Result<()> {
        let mut paid: Vec<(PartyId, Decimal)> = Vec::with_capacity(payouts.len());
        for (to, amount) in payouts.iter().filter(|(_, a)| !a.is_zero()) {
            if let Err(err) = self.vault.disburse(asset_id, to, *amount) {
                self.undo_payouts(asset_id, &paid, &err)?;
                return Err(err);
            }
            paid.push((to.clone(), *amount));
        }
        let ledger = self.config.ledger_account.clone();
        if let Err(err) = self
            .registry
            .transfer_custody(&ledger, asset_id, &ledger, custody_to)
        {
            self.undo_payouts(asset_id, &paid, &err)?;
            return Err(err);
        }
        Ok(())
    }

    /// Put completed payouts back into the escrow scope.
    ///
    /// Every reversal is attempted. If any fail, the amounts they leave
    /// outside the scope are reported as `RollbackIncomplete`, with `cause`
    /// naming the failure that started the rollback.
    fn undo_payouts(&mut self, asset_id: AssetId, paid: &[(PartyId, Decimal)], cause: &EscrowError) -> Result<()> {
        let mut stranded = Decimal::ZERO;
        for (from, amount) in paid.iter().rev() {
            match self.vault.deposit(from, asset_id, *amount) {
                Ok(()) => debug!(%asset_id, %from, %amount, "payout reversed"),
                Err(err) => {
                    error!(%asset_id, %from, %amount, %err, "payout reversal failed");
                    stranded += *amount;
                }
            }
        }
        if stranded.is_zero() {
            return Ok(());
        }
        Err(EscrowError::RollbackIncomplete {
            asset_id,
            stranded,
            cause: cause.to_string(),
        })
    }

    fn check_scope(&self, asset_id: AssetId) -> Result<()> {
        self.conservation.verify(asset_id, self.vault.balance_of(asset_id))
    }

    /// Post-commit scope check. The close already happened, so a mismatch
    /// is logged and never returned.
    fn audit_scope(&self, asset_id: AssetId) {
        if let Err(err) = self.check_scope(asset_id) {
            error!(%asset_id, %err, "conservation check failed after commit");
        }
    }
}

fn check_registry_binding<R: AssetRegistry>(config: &LedgerConfig, registry: &R) -> Result<()> {
    if registry.registry_id() != config.registry_id {
        return Err(EscrowError::Configuration(format!(
            "ledger is bound to registry {:?} but was given {:?}",
            config.registry_id,
            registry.registry_id()
        )));
    }
    Ok(())
}

fn unauthorized(caller: &PartyId, operation: &'static str) -> EscrowError {
    EscrowError::Unauthorized {
        caller: caller.clone(),
        operation,
    }
}

fn ensure_listed(rec: &EscrowRecord, operation: &'static str) -> Result<()> {
    if rec.state == EscrowState::Listed {
        Ok(())
    } else {
        Err(EscrowError::InvalidState {
            asset_id: rec.asset_id,
            state: rec.state,
            operation,
        })
    }
}

fn ensure_positive(value: Decimal) -> Result<()> {
    if value <= Decimal::ZERO {
        return Err(EscrowError::InvalidAmount {
            reason: format!("value must be positive, got {value}"),
        });
    }
    Ok(())
}

/// Log a rejected operation and pass the result through.
fn rejected<T>(operation: &'static str, caller: &PartyId, asset_id: AssetId, result: Result<T>) -> Result<T> {
    if let Err(err) = &result {
        warn!(operation, %caller, %asset_id, code = err.code(), %err, "operation rejected");
    }
    result
}

#[cfg(test)]
mod tests {
    use realty_custody::{PropertyRegistry, Vault};

    use super::*;

    fn dec(n: i64) -> Decimal {
        Decimal::new(n, 0)
    }

    fn p(s: &str) -> PartyId {
        PartyId::new(s)
    }

    /// Ledger with asset 1 held by the ledger and a funded buyer and lender.
    fn setup() -> (SettlementLedger<PropertyRegistry, Vault>, AssetId) {
        let config = LedgerConfig::dummy();
        let mut registry = PropertyRegistry::new(config.registry_id.clone());
        let asset = registry.mint(&config.ledger_account, "ipfs://1.json");
        let mut vault = Vault::new();
        vault.credit(&p("buyer"), dec(100)).unwrap();
        vault.credit(&p("lender"), dec(100)).unwrap();
        (SettlementLedger::new(config, registry, vault).unwrap(), asset)
    }

    #[test]
    fn new_rejects_foreign_registry() {
        let err = SettlementLedger::new(LedgerConfig::dummy(), PropertyRegistry::new("other"), Vault::new())
            .err()
            .unwrap();
        assert!(matches!(err, EscrowError::Configuration(_)));
    }

    #[test]
    fn list_creates_fresh_record() {
        let (mut ledger, asset) = setup();
        ledger.list(&p("seller"), asset, &p("buyer"), dec(10), dec(5)).unwrap();
        assert!(ledger.is_listed(asset));
        assert_eq!(ledger.buyer(asset), Some(&p("buyer")));
        assert_eq!(ledger.purchase_price(asset), dec(10));
        assert_eq!(ledger.escrow_amount(asset), dec(5));
        assert!(!ledger.inspection_passed(asset));
        assert!(!ledger.approval(asset, &p("buyer")));
        assert_eq!(ledger.journal().len(), 1);
    }

    #[test]
    fn list_twice_is_already_listed() {
        let (mut ledger, asset) = setup();
        ledger.list(&p("seller"), asset, &p("buyer"), dec(10), dec(5)).unwrap();
        let err = ledger
            .list(&p("seller"), asset, &p("buyer"), dec(10), dec(5))
            .unwrap_err();
        assert!(matches!(err, EscrowError::AlreadyListed(_)));
    }

    #[test]
    fn closed_record_cannot_be_relisted() {
        let (mut ledger, asset) = setup();
        ledger.list(&p("seller"), asset, &p("buyer"), dec(10), dec(5)).unwrap();
        ledger.cancel_sale(&p("seller"), asset).unwrap();
        let err = ledger
            .list(&p("seller"), asset, &p("buyer"), dec(10), dec(5))
            .unwrap_err();
        assert!(matches!(
            err,
            EscrowError::InvalidState {
                state: EscrowState::Cancelled,
                ..
            }
        ));
    }

    #[test]
    fn list_validates_amounts_and_buyer() {
        let (mut ledger, asset) = setup();
        assert!(matches!(
            ledger.list(&p("seller"), asset, &p("buyer"), Decimal::ZERO, Decimal::ZERO),
            Err(EscrowError::InvalidAmount { .. })
        ));
        assert!(matches!(
            ledger.list(&p("seller"), asset, &p("buyer"), dec(10), dec(-1)),
            Err(EscrowError::InvalidAmount { .. })
        ));
        assert!(matches!(
            ledger.list(&p("seller"), asset, &p("lender"), dec(10), dec(5)),
            Err(EscrowError::InvalidListing { .. })
        ));
        assert!(matches!(
            ledger.list(&p("seller"), asset, &p("escrow-ledger"), dec(10), dec(5)),
            Err(EscrowError::InvalidListing { .. })
        ));
        assert!(!ledger.is_listed(asset));
    }

    #[test]
    fn deposit_below_escrow_amount_rejected() {
        let (mut ledger, asset) = setup();
        ledger.list(&p("seller"), asset, &p("buyer"), dec(10), dec(5)).unwrap();
        let err = ledger.deposit_earnest(&p("buyer"), asset, dec(4)).unwrap_err();
        assert!(matches!(err, EscrowError::EarnestBelowMinimum { .. }));
        assert_eq!(ledger.deposited_balance(asset), Decimal::ZERO);
    }

    #[test]
    fn unchecked_policy_accepts_small_deposit() {
        let config = LedgerConfig::dummy().with_earnest_policy(EarnestPolicy::Unchecked);
        let mut registry = PropertyRegistry::new(config.registry_id.clone());
        let asset = registry.mint(&config.ledger_account, "uri");
        let mut vault = Vault::new();
        vault.credit(&p("buyer"), dec(10)).unwrap();
        let mut ledger = SettlementLedger::new(config, registry, vault).unwrap();
        ledger.list(&p("seller"), asset, &p("buyer"), dec(10), dec(5)).unwrap();
        ledger.deposit_earnest(&p("buyer"), asset, dec(1)).unwrap();
        assert_eq!(ledger.deposited_balance(asset), dec(1));
    }

    #[test]
    fn approve_is_idempotent_and_journaled_once() {
        let (mut ledger, asset) = setup();
        ledger.list(&p("seller"), asset, &p("buyer"), dec(10), dec(5)).unwrap();
        ledger.approve_sale(&p("lender"), asset).unwrap();
        ledger.approve_sale(&p("lender"), asset).unwrap();
        assert!(ledger.approval(asset, &p("lender")));
        assert!(!ledger.approval(asset, &p("inspector")));
        assert_eq!(ledger.journal().len(), 2);
    }

    #[test]
    fn inspection_can_be_retracted() {
        let (mut ledger, asset) = setup();
        ledger.list(&p("seller"), asset, &p("buyer"), dec(10), dec(5)).unwrap();
        ledger.update_inspection_status(&p("inspector"), asset, true).unwrap();
        ledger.update_inspection_status(&p("inspector"), asset, false).unwrap();
        assert!(!ledger.inspection_passed(asset));
    }

    #[test]
    fn queries_default_for_unknown_asset() {
        let (ledger, _) = setup();
        let ghost = AssetId(99);
        assert!(!ledger.is_listed(ghost));
        assert_eq!(ledger.buyer(ghost), None);
        assert_eq!(ledger.purchase_price(ghost), Decimal::ZERO);
        assert_eq!(ledger.deposited_balance(ghost), Decimal::ZERO);
        assert!(!ledger.approval(ghost, &p("seller")));
        assert!(matches!(ledger.record(ghost), Err(EscrowError::NotFound(_))));
        assert_eq!(ledger.seller(), &p("seller"));
        assert_eq!(ledger.inspector(), &p("inspector"));
        assert_eq!(ledger.lender(), &p("lender"));
        assert_eq!(ledger.registry_id(), "property-registry");
    }

    #[test]
    fn finalize_pays_seller_and_moves_custody() {
        let (mut ledger, asset) = setup();
        ledger.list(&p("seller"), asset, &p("buyer"), dec(10), dec(5)).unwrap();
        ledger.deposit_earnest(&p("buyer"), asset, dec(5)).unwrap();
        ledger.fund_loan(&p("lender"), asset, dec(5)).unwrap();
        ledger.update_inspection_status(&p("inspector"), asset, true).unwrap();
        for who in ["buyer", "seller", "lender"] {
            ledger.approve_sale(&p(who), asset).unwrap();
        }
        ledger.finalize_sale(&p("seller"), asset).unwrap();

        assert!(!ledger.is_listed(asset));
        assert_eq!(ledger.registry().custodian_of(asset).unwrap(), p("buyer"));
        assert_eq!(ledger.vault().wallet(&p("seller")), dec(10));
        assert_eq!(ledger.vault().balance_of(asset), Decimal::ZERO);
        assert_eq!(ledger.record(asset).unwrap().state, EscrowState::Finalized);
        assert!(ledger.verify_conservation().is_ok());
        assert!(ledger.journal().verify_chain().is_ok());
    }

    #[test]
    fn snapshot_restore_roundtrip() {
        let (mut ledger, asset) = setup();
        ledger.list(&p("seller"), asset, &p("buyer"), dec(10), dec(5)).unwrap();
        ledger.deposit_earnest(&p("buyer"), asset, dec(5)).unwrap();
        let snap = ledger.snapshot();
        let registry = ledger.registry().clone();
        let vault = ledger.vault().clone();

        let restored = SettlementLedger::restore(snap, registry, vault).unwrap();
        assert_eq!(restored.deposited_balance(asset), dec(5));
        assert_eq!(restored.journal().head_hash(), ledger.journal().head_hash());
        assert!(restored.verify_conservation().is_ok());
    }

    #[test]
    fn restore_detects_vault_drift() {
        let (mut ledger, asset) = setup();
        ledger.list(&p("seller"), asset, &p("buyer"), dec(10), dec(5)).unwrap();
        ledger.deposit_earnest(&p("buyer"), asset, dec(5)).unwrap();
        let snap = ledger.snapshot();
        let registry = ledger.registry().clone();
        let mut vault = ledger.vault().clone();
        vault.disburse(asset, &p("buyer"), dec(1)).unwrap();

        let err = SettlementLedger::restore(snap, registry, vault).err().unwrap();
        assert!(matches!(err, EscrowError::ConservationViolation { .. }));
    }
}
