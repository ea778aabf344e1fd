//! Append-only, hash-chained event journal.
//!
//! ```text
//! hash[n] = SHA-256( tag || hash[n-1] || payload[n] )      hash[-1] = 0^32
//! ```
//!
//! The journal gives every accepted mutation a sequence number, which is
//! the externally observable total order of ledger operations. Any edit to
//! a past event breaks every later hash.

use chrono::{DateTime, Utc};
use realty_types::constants::JOURNAL_DOMAIN_TAG;
use realty_types::{AssetId, EscrowError, EventKind, LedgerEvent, PartyId, Result};
use rust_decimal::Decimal;
use sha2::{Digest, Sha256};

/// Hash of the event preceding the first one.
pub const GENESIS_HASH: [u8; 32] = [0u8; 32];

/// Compute the chained hash of `event` given its predecessor's hash.
///
/// Depends on the domain tag, `prev_hash` and [`LedgerEvent::payload_bytes`];
/// the event's own `prev_hash`/`hash` fields are ignored.
#[must_use]
pub fn compute_event_hash(prev_hash: &[u8; 32], event: &LedgerEvent) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(JOURNAL_DOMAIN_TAG);
    hasher.update(prev_hash);
    hasher.update(event.payload_bytes());

    let result = hasher.finalize();
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&result);
    hash
}

/// The ledger's audit trail.
#[derive(Debug, Clone, Default)]
pub struct Journal {
    events: Vec<LedgerEvent>,
}

impl Journal {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adopt persisted events after verifying the chain.
    ///
    /// # Errors
    /// `JournalCorrupted` at the first bad sequence number or hash.
    pub fn from_events(events: Vec<LedgerEvent>) -> Result<Self> {
        let journal = Self { events };
        journal.verify_chain()?;
        Ok(journal)
    }

    /// Append an event and return it.
    pub fn append(
        &mut self,
        asset_id: AssetId,
        kind: EventKind,
        actor: &PartyId,
        amount: Decimal,
        recorded_at: DateTime<Utc>,
    ) -> &LedgerEvent {
        let prev_hash = self.head_hash();
        let mut event = LedgerEvent {
            sequence: self.events.len() as u64,
            asset_id,
            kind,
            actor: actor.clone(),
            amount,
            recorded_at,
            prev_hash,
            hash: GENESIS_HASH,
        };
        event.hash = compute_event_hash(&prev_hash, &event);
        self.events.push(event);
        &self.events[self.events.len() - 1]
    }

    /// Hash of the latest event, or [`GENESIS_HASH`] when empty.
    #[must_use]
    pub fn head_hash(&self) -> [u8; 32] {
        self.events.last().map_or(GENESIS_HASH, |e| e.hash)
    }

    #[must_use]
    pub fn head_hash_hex(&self) -> String {
        hex::encode(self.head_hash())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    #[must_use]
    pub fn events(&self) -> &[LedgerEvent] {
        &self.events
    }

    /// Events touching one asset, in order.
    pub fn for_asset(&self, asset_id: AssetId) -> impl Iterator<Item = &LedgerEvent> {
        self.events.iter().filter(move |e| e.asset_id == asset_id)
    }

    /// Recompute every hash and check sequence numbers and back-links.
    ///
    /// # Errors
    /// `JournalCorrupted` at the first inconsistent event.
    pub fn verify_chain(&self) -> Result<()> {
        let mut prev = GENESIS_HASH;
        for (index, event) in self.events.iter().enumerate() {
            let expected_seq = index as u64;
            if event.sequence != expected_seq {
                return Err(EscrowError::JournalCorrupted {
                    sequence: event.sequence,
                    reason: format!("expected sequence {expected_seq}"),
                });
            }
            if event.prev_hash != prev {
                return Err(EscrowError::JournalCorrupted {
                    sequence: event.sequence,
                    reason: "prev_hash does not link to predecessor".into(),
                });
            }
            let recomputed = compute_event_hash(&prev, event);
            if recomputed != event.hash {
                return Err(EscrowError::JournalCorrupted {
                    sequence: event.sequence,
                    reason: format!(
                        "hash mismatch: stored {}, computed {}",
                        event.hash_hex(),
                        hex::encode(recomputed)
                    ),
                });
            }
            prev = event.hash;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use realty_types::ApprovalRole;

    use super::*;

    fn sample() -> Journal {
        let mut j = Journal::new();
        let seller = PartyId::new("seller");
        let buyer = PartyId::new("buyer");
        j.append(AssetId(1), EventKind::Listed, &seller, Decimal::ZERO, Utc::now());
        j.append(AssetId(1), EventKind::EarnestDeposited, &buyer, Decimal::new(5, 0), Utc::now());
        j.append(
            AssetId(2),
            EventKind::Approved(ApprovalRole::Seller),
            &seller,
            Decimal::ZERO,
            Utc::now(),
        );
        j
    }

    #[test]
    fn empty_journal_verifies() {
        let j = Journal::new();
        assert!(j.verify_chain().is_ok());
        assert_eq!(j.head_hash(), GENESIS_HASH);
        assert!(j.is_empty());
    }

    #[test]
    fn append_links_hashes() {
        let j = sample();
        assert_eq!(j.len(), 3);
        assert_eq!(j.events()[0].prev_hash, GENESIS_HASH);
        assert_eq!(j.events()[1].prev_hash, j.events()[0].hash);
        assert_eq!(j.events()[2].sequence, 2);
        assert_eq!(j.head_hash(), j.events()[2].hash);
        assert!(j.verify_chain().is_ok());
    }

    #[test]
    fn hash_is_deterministic() {
        let j = sample();
        let e = &j.events()[1];
        assert_eq!(compute_event_hash(&e.prev_hash, e), e.hash);
        assert_ne!(compute_event_hash(&GENESIS_HASH, e), e.hash);
    }

    #[test]
    fn tampered_amount_detected() {
        let j = sample();
        let mut events = j.events().to_vec();
        events[1].amount = Decimal::new(500, 0);
        let err = Journal::from_events(events).unwrap_err();
        assert!(matches!(err, EscrowError::JournalCorrupted { sequence: 1, .. }));
    }

    #[test]
    fn dropped_event_detected() {
        let j = sample();
        let mut events = j.events().to_vec();
        events.remove(1);
        assert!(Journal::from_events(events).is_err());
    }

    #[test]
    fn filter_by_asset() {
        let j = sample();
        assert_eq!(j.for_asset(AssetId(1)).count(), 2);
        assert_eq!(j.for_asset(AssetId(9)).count(), 0);
        assert_eq!(j.head_hash_hex().len(), 64);
    }
}
