//! # realty-custody
//!
//! The two external collaborators of the settlement ledger, each as a trait
//! seam plus an in-process reference binding:
//!
//! 1. **[`AssetRegistry`]**: who holds custody of a tokenized property, and
//!    custody transfer. Bound by [`PropertyRegistry`].
//! 2. **[`ValueTransfer`]**: moves funds between party wallets and per-asset
//!    escrow scopes. Bound by [`Vault`].
//!
//! ```text
//! SettlementLedger ──▶ AssetRegistry::transfer_custody()
//!                  └─▶ ValueTransfer::deposit() / disburse()
//! ```
//!
//! Any error from a collaborator aborts the enclosing ledger operation.

pub mod registry;
pub mod vault;

pub use registry::{AssetRegistry, PropertyRegistry};
pub use vault::{ValueTransfer, Vault};
