//! Balance conservation checker.
//!
//! Invariant enforced after every close and on demand:
//! ```text
//! ∀ scope: vault.balance_of(scope) == Σ(inflows) - Σ(outflows)
//! ```
//!
//! A violation means funds were moved around the ledger; the offending
//! operation reports `ConservationViolation` and the node must be inspected.

use std::collections::BTreeMap;

use realty_types::{AssetId, EscrowError, EscrowRecord, Result};
use rust_decimal::Decimal;

/// Per-scope inflow/outflow totals since listing.
#[derive(Debug, Clone, Default)]
pub struct Conservation {
    inflows: BTreeMap<AssetId, Decimal>,
    outflows: BTreeMap<AssetId, Decimal>,
}

impl Conservation {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild totals from persisted records.
    #[must_use]
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a EscrowRecord>) -> Self {
        let mut c = Self::new();
        for rec in records {
            c.record_inflow(rec.asset_id, rec.earnest_total + rec.loan_total);
            c.record_outflow(rec.asset_id, rec.disbursed_total);
        }
        c
    }

    pub fn record_inflow(&mut self, scope: AssetId, amount: Decimal) {
        *self.inflows.entry(scope).or_insert(Decimal::ZERO) += amount;
    }

    pub fn record_outflow(&mut self, scope: AssetId, amount: Decimal) {
        *self.outflows.entry(scope).or_insert(Decimal::ZERO) += amount;
    }

    #[must_use]
    pub fn total_inflows(&self, scope: AssetId) -> Decimal {
        self.inflows.get(&scope).copied().unwrap_or(Decimal::ZERO)
    }

    #[must_use]
    pub fn total_outflows(&self, scope: AssetId) -> Decimal {
        self.outflows.get(&scope).copied().unwrap_or(Decimal::ZERO)
    }

    /// Funds the scope should hold right now.
    #[must_use]
    pub fn expected_held(&self, scope: AssetId) -> Decimal {
        self.total_inflows(scope) - self.total_outflows(scope)
    }

    /// Compare the vault's actual scope balance against the expectation.
    ///
    /// # Errors
    /// Returns [`EscrowError::ConservationViolation`] if actual ≠ expected or
    /// outflows exceed inflows.
    pub fn verify(&self, scope: AssetId, actual_held: Decimal) -> Result<()> {
        let expected = self.expected_held(scope);
        if expected < Decimal::ZERO {
            return Err(EscrowError::ConservationViolation {
                reason: format!(
                    "{scope}: outflows {} exceed inflows {}",
                    self.total_outflows(scope),
                    self.total_inflows(scope),
                ),
            });
        }
        if actual_held != expected {
            return Err(EscrowError::ConservationViolation {
                reason: format!(
                    "{scope}: vault holds {actual_held} != expected {expected} \
                     (inflows={}, outflows={})",
                    self.total_inflows(scope),
                    self.total_outflows(scope),
                ),
            });
        }
        Ok(())
    }

    /// Every scope that ever saw a flow, in id order.
    #[must_use]
    pub fn tracked_scopes(&self) -> Vec<AssetId> {
        let mut scopes: Vec<AssetId> = self.inflows.keys().copied().collect();
        scopes.extend(self.outflows.keys().copied());
        scopes.sort_unstable();
        scopes.dedup();
        scopes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(n: i64) -> Decimal {
        Decimal::new(n, 0)
    }

    #[test]
    fn empty_scope_holds_zero() {
        let c = Conservation::new();
        assert_eq!(c.expected_held(AssetId(1)), Decimal::ZERO);
        assert!(c.verify(AssetId(1), Decimal::ZERO).is_ok());
    }

    #[test]
    fn inflows_minus_outflows() {
        let mut c = Conservation::new();
        c.record_inflow(AssetId(1), dec(5));
        c.record_inflow(AssetId(1), dec(15));
        c.record_outflow(AssetId(1), dec(20));
        assert_eq!(c.expected_held(AssetId(1)), Decimal::ZERO);
        assert!(c.verify(AssetId(1), Decimal::ZERO).is_ok());
    }

    #[test]
    fn mismatch_detected() {
        let mut c = Conservation::new();
        c.record_inflow(AssetId(2), dec(10));
        let err = c.verify(AssetId(2), dec(9)).unwrap_err();
        assert!(matches!(err, EscrowError::ConservationViolation { .. }));
        assert!(format!("{err}").contains("expected 10"));
    }

    #[test]
    fn overdraw_detected() {
        let mut c = Conservation::new();
        c.record_inflow(AssetId(3), dec(1));
        c.record_outflow(AssetId(3), dec(2));
        assert!(c.verify(AssetId(3), dec(-1)).is_err());
    }

    #[test]
    fn rebuilt_from_records() {
        let mut rec = EscrowRecord::dummy(AssetId(4), dec(10), dec(5));
        rec.record_earnest(dec(5));
        rec.record_loan(dec(5));
        let c = Conservation::from_records([&rec]);
        assert_eq!(c.expected_held(AssetId(4)), dec(10));
        assert_eq!(c.tracked_scopes(), vec![AssetId(4)]);
    }
}
