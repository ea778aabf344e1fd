//! # realty-types
//!
//! Shared types, errors, and configuration for the **realty settlement
//! ledger**.
//!
//! This crate is the leaf dependency of the workspace. Every other crate
//! depends on it. It defines:
//!
//! - **Identifiers**: [`AssetId`], [`PartyId`], [`Account`]
//! - **Roles**: [`Role`], [`ApprovalRole`], [`PartyRoles`]
//! - **Escrow model**: [`EscrowRecord`], [`EscrowState`], [`Approvals`], [`FinalizeCondition`]
//! - **Event model**: [`LedgerEvent`], [`EventKind`]
//! - **Configuration**: [`LedgerConfig`], [`EarnestPolicy`], [`StorageConfig`], [`LogFormat`]
//! - **Errors**: [`EscrowError`] with `ESC_ERR_` prefix codes
//! - **Constants**: system-wide defaults

pub mod config;
pub mod constants;
pub mod error;
pub mod event;
pub mod ids;
pub mod record;
pub mod role;

// Re-export all primary types at crate root for ergonomic imports:
//   use realty_types::{AssetId, PartyId, EscrowRecord, ...};

pub use config::*;
pub use error::*;
pub use event::*;
pub use ids::*;
pub use record::*;
pub use role::*;

/// Funds are an opaque transferable balance.
pub type Amount = rust_decimal::Decimal;

// Constants are accessed via `realty_types::constants::FOO`
// (not re-exported to avoid name collisions).
