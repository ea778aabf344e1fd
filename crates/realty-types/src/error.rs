//! Error types for the settlement ledger.
//!
//! All errors use the `ESC_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by subsystem:
//! - 1xx: Authorization errors
//! - 2xx: Escrow record state errors
//! - 3xx: Settlement / funds errors
//! - 4xx: Collaborator (asset registry) errors
//! - 5xx: Journal / persistence integrity errors
//! - 9xx: General / internal errors

use rust_decimal::Decimal;
use thiserror::Error;

use crate::{AssetId, EscrowState, FinalizeCondition, PartyId};

/// Central error enum for all ledger operations.
#[derive(Debug, Error)]
pub enum EscrowError {
    // =================================================================
    // Authorization Errors (1xx)
    // =================================================================
    /// The caller does not hold the role the operation requires.
    #[error("ESC_ERR_100: Unauthorized: {caller} may not {operation}")]
    Unauthorized {
        caller: PartyId,
        operation: &'static str,
    },

    // =================================================================
    // Record Errors (2xx)
    // =================================================================
    /// No escrow record exists for this asset.
    #[error("ESC_ERR_200: No escrow record for {0}")]
    NotFound(AssetId),

    /// The asset is already listed and not yet closed.
    #[error("ESC_ERR_201: {0} is already listed")]
    AlreadyListed(AssetId),

    /// The record's state does not admit the operation.
    #[error("ESC_ERR_202: Cannot {operation} {asset_id} in state {state}")]
    InvalidState {
        asset_id: AssetId,
        state: EscrowState,
        operation: &'static str,
    },

    /// Listing parameters are inconsistent with the role assignments.
    #[error("ESC_ERR_203: Invalid listing: {reason}")]
    InvalidListing { reason: String },

    // =================================================================
    // Settlement Errors (3xx)
    // =================================================================
    /// A finalization condition does not hold.
    #[error("ESC_ERR_300: Cannot finalize {asset_id}: {condition}")]
    PreconditionNotMet {
        asset_id: AssetId,
        condition: FinalizeCondition,
    },

    /// A debit exceeds the funds held by the source.
    #[error("ESC_ERR_301: Insufficient funds: need {needed}, have {available}")]
    InsufficientFunds { needed: Decimal, available: Decimal },

    /// Amount is zero, negative, or otherwise unusable.
    #[error("ESC_ERR_302: Invalid amount: {reason}")]
    InvalidAmount { reason: String },

    /// Earnest deposit would leave the buyer below the required amount.
    #[error("ESC_ERR_303: Earnest below minimum: required {required}, would hold {offered}")]
    EarnestBelowMinimum { required: Decimal, offered: Decimal },

    /// Held funds do not match recorded inflows and outflows.
    #[error("ESC_ERR_304: Balance conservation violated: {reason}")]
    ConservationViolation { reason: String },

    /// A close failed and some payouts could not be reversed. `stranded` is
    /// the total now missing from the escrow scope.
    #[error("ESC_ERR_305: Rollback incomplete for {asset_id}: {stranded} stranded after {cause}")]
    RollbackIncomplete {
        asset_id: AssetId,
        stranded: Decimal,
        cause: String,
    },

    // =================================================================
    // Collaborator Errors (4xx)
    // =================================================================
    /// The asset registry rejected or could not perform a custody operation.
    #[error("ESC_ERR_400: Registry failure for {asset_id}: {reason}")]
    RegistryFailure { asset_id: AssetId, reason: String },

    // =================================================================
    // Journal Errors (5xx)
    // =================================================================
    /// The event journal's hash chain does not verify.
    #[error("ESC_ERR_500: Journal corrupted at sequence {sequence}: {reason}")]
    JournalCorrupted { sequence: u64, reason: String },

    // =================================================================
    // General / Internal (9xx)
    // =================================================================
    /// Unrecoverable internal error.
    #[error("ESC_ERR_900: Internal error: {0}")]
    Internal(String),

    /// Serialization / deserialization error.
    #[error("ESC_ERR_901: Serialization error: {0}")]
    Serialization(String),

    /// Configuration error (invalid config file, missing fields, etc.).
    #[error("ESC_ERR_902: Configuration error: {0}")]
    Configuration(String),

    /// I/O error (disk).
    #[error("ESC_ERR_903: I/O error: {0}")]
    Io(String),
}

impl EscrowError {
    /// Stable short code for protocol responses and metrics labels.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unauthorized { .. } => "UNAUTHORIZED",
            Self::NotFound(_) => "NOT_FOUND",
            Self::AlreadyListed(_) => "ALREADY_LISTED",
            Self::InvalidState { .. } => "INVALID_STATE",
            Self::InvalidListing { .. } => "INVALID_LISTING",
            Self::PreconditionNotMet { .. } => "PRECONDITION_NOT_MET",
            Self::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            Self::InvalidAmount { .. } => "INVALID_AMOUNT",
            Self::EarnestBelowMinimum { .. } => "EARNEST_BELOW_MINIMUM",
            Self::ConservationViolation { .. } => "CONSERVATION_VIOLATION",
            Self::RollbackIncomplete { .. } => "ROLLBACK_INCOMPLETE",
            Self::RegistryFailure { .. } => "REGISTRY_FAILURE",
            Self::JournalCorrupted { .. } => "JOURNAL_CORRUPTED",
            Self::Internal(_) => "INTERNAL",
            Self::Serialization(_) => "SERIALIZATION",
            Self::Configuration(_) => "CONFIGURATION",
            Self::Io(_) => "IO",
        }
    }
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, EscrowError>;

// Conversion from std::io::Error
impl From<std::io::Error> for EscrowError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for EscrowError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
