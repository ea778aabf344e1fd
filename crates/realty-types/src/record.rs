//! # EscrowRecord: per-asset settlement state
//!
//! ## State Machine
//!
//! ```text
//!   (no record)   list    ┌────────┐  finalize   ┌───────────┐
//!   ─────────────────────▶│ LISTED ├────────────▶│ FINALIZED │
//!                         └───┬────┘             └───────────┘
//!                             │ cancel
//!                             ▼
//!                       ┌───────────┐
//!                       │ CANCELLED │
//!                       └───────────┘
//! ```
//!
//! Both terminal states are final: the record is frozen and the asset id
//! cannot be listed again on the same ledger.

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{ApprovalRole, AssetId, EscrowError, PartyId, Result};

/// Lifecycle state of an escrow record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EscrowState {
    /// The ledger holds custody; deposits, approvals and inspection accepted.
    Listed,
    /// Funds went to the seller and custody to the buyer. **Irreversible.**
    Finalized,
    /// The sale was aborted; funds refunded and custody returned.
    Cancelled,
}

impl EscrowState {
    /// Can a record in this state move to `target`?
    #[must_use]
    pub fn can_transition_to(&self, target: Self) -> bool {
        matches!((self, target), (Self::Listed, Self::Finalized | Self::Cancelled))
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finalized | Self::Cancelled)
    }
}

impl fmt::Display for EscrowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Listed => write!(f, "LISTED"),
            Self::Finalized => write!(f, "FINALIZED"),
            Self::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

/// Approval flags keyed by the closed set of approving roles.
///
/// Flags only ever go from `false` to `true`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Approvals {
    buyer: bool,
    seller: bool,
    lender: bool,
}

impl Approvals {
    #[must_use]
    pub fn get(&self, role: ApprovalRole) -> bool {
        match role {
            ApprovalRole::Buyer => self.buyer,
            ApprovalRole::Seller => self.seller,
            ApprovalRole::Lender => self.lender,
        }
    }

    /// Record an approval. Returns `true` if the flag was newly set.
    pub fn approve(&mut self, role: ApprovalRole) -> bool {
        let slot = match role {
            ApprovalRole::Buyer => &mut self.buyer,
            ApprovalRole::Seller => &mut self.seller,
            ApprovalRole::Lender => &mut self.lender,
        };
        let fresh = !*slot;
        *slot = true;
        fresh
    }

    /// First approving role that has not yet approved, in check order.
    #[must_use]
    pub fn first_missing(&self) -> Option<ApprovalRole> {
        ApprovalRole::ALL.into_iter().find(|role| !self.get(*role))
    }
}

/// The finalization condition that blocked a close.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FinalizeCondition {
    InspectionNotPassed,
    ApprovalMissing(ApprovalRole),
    InsufficientDeposit { deposited: Decimal, required: Decimal },
}

impl fmt::Display for FinalizeCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InspectionNotPassed => write!(f, "inspection has not passed"),
            Self::ApprovalMissing(role) => write!(f, "{role} approval missing"),
            Self::InsufficientDeposit {
                deposited,
                required,
            } => write!(f, "deposited {deposited} is below purchase price {required}"),
        }
    }
}

/// Settlement state for one listed asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowRecord {
    pub asset_id: AssetId,
    pub state: EscrowState,
    /// Counterparty authorized to purchase; fixed at listing.
    pub buyer: PartyId,
    /// Total consideration required to close.
    pub purchase_price: Decimal,
    /// Earnest deposit expected from the buyer.
    pub escrow_amount: Decimal,
    pub approvals: Approvals,
    pub inspection_passed: bool,
    /// Funds currently held for this settlement.
    pub deposited_balance: Decimal,
    /// Cumulative earnest received from the buyer.
    pub earnest_total: Decimal,
    /// Cumulative contribution received from the lender.
    pub loan_total: Decimal,
    /// Cumulative funds paid out of this settlement.
    pub disbursed_total: Decimal,
    pub listed_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

impl EscrowRecord {
    /// A freshly listed record: no approvals, no inspection, nothing held.
    #[must_use]
    pub fn new(
        asset_id: AssetId,
        buyer: PartyId,
        purchase_price: Decimal,
        escrow_amount: Decimal,
        listed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            asset_id,
            state: EscrowState::Listed,
            buyer,
            purchase_price,
            escrow_amount,
            approvals: Approvals::default(),
            inspection_passed: false,
            deposited_balance: Decimal::ZERO,
            earnest_total: Decimal::ZERO,
            loan_total: Decimal::ZERO,
            disbursed_total: Decimal::ZERO,
            listed_at,
            closed_at: None,
        }
    }

    #[must_use]
    pub fn is_listed(&self) -> bool {
        self.state == EscrowState::Listed
    }

    #[must_use]
    pub fn approval(&self, role: ApprovalRole) -> bool {
        self.approvals.get(role)
    }

    /// Credit an earnest deposit.
    pub fn record_earnest(&mut self, amount: Decimal) {
        self.earnest_total += amount;
        self.deposited_balance += amount;
    }

    /// Credit a lender contribution.
    pub fn record_loan(&mut self, amount: Decimal) {
        self.loan_total += amount;
        self.deposited_balance += amount;
    }

    /// The first unmet finalization condition, or `None` if the record can
    /// close. Checked in a fixed order: inspection, buyer, seller and lender
    /// approvals, then funds.
    #[must_use]
    pub fn finalize_blocker(&self) -> Option<FinalizeCondition> {
        if !self.inspection_passed {
            return Some(FinalizeCondition::InspectionNotPassed);
        }
        if let Some(role) = self.approvals.first_missing() {
            return Some(FinalizeCondition::ApprovalMissing(role));
        }
        if self.deposited_balance < self.purchase_price {
            return Some(FinalizeCondition::InsufficientDeposit {
                deposited: self.deposited_balance,
                required: self.purchase_price,
            });
        }
        None
    }

    /// `inflows == held + outflows`. Holds for every record at all times.
    #[must_use]
    pub fn is_balanced(&self) -> bool {
        self.earnest_total + self.loan_total == self.deposited_balance + self.disbursed_total
    }

    /// Transition to FINALIZED, moving the whole held balance to outflows.
    ///
    /// # Errors
    /// Returns `InvalidState` if the record is not LISTED.
    pub fn mark_finalized(&mut self, at: DateTime<Utc>) -> Result<Decimal> {
        self.close(EscrowState::Finalized, "finalize", at)
    }

    /// Transition to CANCELLED, moving the whole held balance to outflows.
    ///
    /// # Errors
    /// Returns `InvalidState` if the record is not LISTED.
    pub fn mark_cancelled(&mut self, at: DateTime<Utc>) -> Result<Decimal> {
        self.close(EscrowState::Cancelled, "cancel", at)
    }

    fn close(&mut self, target: EscrowState, operation: &'static str, at: DateTime<Utc>) -> Result<Decimal> {
        if !self.state.can_transition_to(target) {
            return Err(EscrowError::InvalidState {
                asset_id: self.asset_id,
                state: self.state,
                operation,
            });
        }
        let released = self.deposited_balance;
        self.disbursed_total += released;
        self.deposited_balance = Decimal::ZERO;
        self.state = target;
        self.closed_at = Some(at);
        Ok(released)
    }
}

/// Dummy record for unit tests. **Never use in production.**
#[cfg(any(test, feature = "test-helpers"))]
impl EscrowRecord {
    pub fn dummy(asset_id: AssetId, purchase_price: Decimal, escrow_amount: Decimal) -> Self {
        Self::new(
            asset_id,
            PartyId::random("buyer"),
            purchase_price,
            escrow_amount,
            Utc::now(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(n: i64) -> Decimal {
        Decimal::new(n, 0)
    }

    fn ready_record() -> EscrowRecord {
        let mut rec = EscrowRecord::dummy(AssetId(1), dec(10), dec(5));
        rec.record_earnest(dec(5));
        rec.record_loan(dec(5));
        for role in ApprovalRole::ALL {
            rec.approvals.approve(role);
        }
        rec.inspection_passed = true;
        rec
    }

    #[test]
    fn state_transitions_valid() {
        assert!(EscrowState::Listed.can_transition_to(EscrowState::Finalized));
        assert!(EscrowState::Listed.can_transition_to(EscrowState::Cancelled));
    }

    #[test]
    fn state_transitions_invalid() {
        assert!(!EscrowState::Finalized.can_transition_to(EscrowState::Listed));
        assert!(!EscrowState::Finalized.can_transition_to(EscrowState::Cancelled));
        assert!(!EscrowState::Cancelled.can_transition_to(EscrowState::Finalized));
        assert!(!EscrowState::Listed.can_transition_to(EscrowState::Listed));
    }

    #[test]
    fn approvals_are_idempotent() {
        let mut approvals = Approvals::default();
        assert!(approvals.approve(ApprovalRole::Seller));
        assert!(!approvals.approve(ApprovalRole::Seller));
        assert!(approvals.get(ApprovalRole::Seller));
        assert_eq!(approvals.first_missing(), Some(ApprovalRole::Buyer));
    }

    #[test]
    fn fresh_record_is_blocked_on_inspection() {
        let rec = EscrowRecord::dummy(AssetId(1), dec(10), dec(5));
        assert!(rec.is_listed());
        assert_eq!(rec.deposited_balance, Decimal::ZERO);
        assert_eq!(
            rec.finalize_blocker(),
            Some(FinalizeCondition::InspectionNotPassed)
        );
    }

    #[test]
    fn blocker_order_is_approvals_then_funds() {
        let mut rec = EscrowRecord::dummy(AssetId(1), dec(10), dec(5));
        rec.inspection_passed = true;
        assert_eq!(
            rec.finalize_blocker(),
            Some(FinalizeCondition::ApprovalMissing(ApprovalRole::Buyer))
        );
        rec.approvals.approve(ApprovalRole::Buyer);
        rec.approvals.approve(ApprovalRole::Seller);
        assert_eq!(
            rec.finalize_blocker(),
            Some(FinalizeCondition::ApprovalMissing(ApprovalRole::Lender))
        );
        rec.approvals.approve(ApprovalRole::Lender);
        rec.record_earnest(dec(5));
        assert_eq!(
            rec.finalize_blocker(),
            Some(FinalizeCondition::InsufficientDeposit {
                deposited: dec(5),
                required: dec(10),
            })
        );
    }

    #[test]
    fn ready_record_finalizes_once() {
        let mut rec = ready_record();
        assert_eq!(rec.finalize_blocker(), None);

        let released = rec.mark_finalized(Utc::now()).unwrap();
        assert_eq!(released, dec(10));
        assert_eq!(rec.state, EscrowState::Finalized);
        assert_eq!(rec.deposited_balance, Decimal::ZERO);
        assert!(rec.closed_at.is_some());
        assert!(rec.is_balanced());

        let err = rec.mark_finalized(Utc::now()).unwrap_err();
        assert!(matches!(err, EscrowError::InvalidState { .. }));
    }

    #[test]
    fn cancelled_cannot_finalize() {
        let mut rec = ready_record();
        rec.mark_cancelled(Utc::now()).unwrap();
        assert!(rec.mark_finalized(Utc::now()).is_err());
        assert!(rec.is_balanced());
    }

    #[test]
    fn serde_roundtrip() {
        let rec = ready_record();
        let json = serde_json::to_string(&rec).unwrap();
        let back: EscrowRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(rec, back);
    }
}
