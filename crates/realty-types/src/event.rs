//! Journal event types for the ledger audit trail.
//!
//! Every accepted mutation (listing, deposit, approval, inspection update,
//! close) appends one [`LedgerEvent`]. Events are hash-chained: each carries
//! the hash of its predecessor, so the trail can be verified offline.

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{ApprovalRole, AssetId, PartyId};

/// What a journal entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    /// A record was created and custody moved to the ledger.
    Listed,
    /// The buyer added earnest funds.
    EarnestDeposited,
    /// The lender added funds.
    LoanFunded,
    /// A party set its approval flag.
    Approved(ApprovalRole),
    /// The inspector recorded an outcome.
    InspectionUpdated { passed: bool },
    /// Custody went to the buyer, funds to the seller.
    Finalized,
    /// Custody went back to the seller, funds refunded.
    Cancelled,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Listed => write!(f, "LISTED"),
            Self::EarnestDeposited => write!(f, "EARNEST_DEPOSITED"),
            Self::LoanFunded => write!(f, "LOAN_FUNDED"),
            Self::Approved(role) => write!(f, "APPROVED_{role}"),
            Self::InspectionUpdated { passed: true } => write!(f, "INSPECTION_PASSED"),
            Self::InspectionUpdated { passed: false } => write!(f, "INSPECTION_FAILED"),
            Self::Finalized => write!(f, "FINALIZED"),
            Self::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

/// One entry of the append-only journal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEvent {
    /// Position in the journal, starting at 0.
    pub sequence: u64,
    pub asset_id: AssetId,
    pub kind: EventKind,
    /// The caller whose operation produced the event.
    pub actor: PartyId,
    /// Funds moved by the operation; zero when none moved.
    pub amount: Decimal,
    pub recorded_at: DateTime<Utc>,
    /// Hash of the previous event (all zeros for the first).
    pub prev_hash: [u8; 32],
    /// SHA-256 over the domain tag, `prev_hash` and [`Self::payload_bytes`].
    pub hash: [u8; 32],
}

impl LedgerEvent {
    /// Canonical byte encoding of the hashed fields, excluding both hashes.
    ///
    /// Length-prefixed strings keep the encoding unambiguous.
    #[must_use]
    pub fn payload_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(128);
        buf.extend_from_slice(&self.sequence.to_be_bytes());
        buf.extend_from_slice(&self.asset_id.0.to_be_bytes());
        push_str(&mut buf, &self.kind.to_string());
        push_str(&mut buf, self.actor.as_str());
        push_str(&mut buf, &self.amount.normalize().to_string());
        buf.extend_from_slice(&self.recorded_at.timestamp_micros().to_be_bytes());
        buf
    }

    #[must_use]
    pub fn hash_hex(&self) -> String {
        hex::encode(self.hash)
    }

    #[must_use]
    pub fn prev_hash_hex(&self) -> String {
        hex::encode(self.prev_hash)
    }
}

fn push_str(buf: &mut Vec<u8>, s: &str) {
    let len = u32::try_from(s.len()).unwrap_or(u32::MAX);
    buf.extend_from_slice(&len.to_be_bytes());
    buf.extend_from_slice(s.as_bytes());
}
