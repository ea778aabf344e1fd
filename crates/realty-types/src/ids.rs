//! Identifiers used throughout the settlement ledger.
//!
//! Assets are named by a registry-assigned integer; parties by an opaque
//! string authenticated out-of-band by the hosting environment.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// AssetId
// ---------------------------------------------------------------------------

/// Unique identifier for one tokenized property, assigned monotonically by
/// the asset registry (first mint is `AssetId(1)`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct AssetId(pub u64);

impl AssetId {
    #[must_use]
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "asset:{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// PartyId
// ---------------------------------------------------------------------------

/// Identity of a caller or counterparty (an account address, a key
/// fingerprint or a user handle; the ledger only compares them).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct PartyId(String);

impl PartyId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the identifier is usable: non-empty, no surrounding whitespace.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.0.is_empty() && self.0.trim() == self.0
    }
}

impl fmt::Display for PartyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for PartyId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for PartyId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Random party for unit tests. **Never use in production.**
#[cfg(any(test, feature = "test-helpers"))]
impl PartyId {
    pub fn random(prefix: &str) -> Self {
        Self(format!("{prefix}-{:016x}", rand::random::<u64>()))
    }
}

// ---------------------------------------------------------------------------
// Account
// ---------------------------------------------------------------------------

/// A balance holder inside the value-transfer layer: either a party's wallet
/// or the escrow scope attributed to one asset's settlement.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum Account {
    Party(PartyId),
    Escrow(AssetId),
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Party(party) => write!(f, "party:{party}"),
            Self::Escrow(asset_id) => write!(f, "escrow:{}", asset_id.0),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
