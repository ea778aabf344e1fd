//! # realty-settlement
//!
//! **Settlement plane** for tokenized property sales: the four-party escrow
//! ledger and everything that keeps it honest.
//!
//! ## Architecture
//!
//! The [`SettlementLedger`] owns one escrow record per listed asset and two
//! collaborators from `realty-custody`:
//! 1. **Roles**: seller, inspector and lender are fixed at construction;
//!    the buyer is fixed per record at listing
//! 2. **Custody**: the ledger holds the asset while it is listed
//! 3. **Funds**: earnest and loan contributions sit in a per-asset escrow scope
//! 4. **Journal**: every accepted mutation appends a hash-chained event
//! 5. **Conservation**: scope balances are checked against recorded flows
//!
//! ## Lifecycle
//!
//! ```text
//! list → deposit_earnest / fund_loan / approve_sale / update_inspection_status
//!      → finalize_sale  (funds → seller, custody → buyer)
//!      | cancel_sale    (refunds, custody → seller)
//! ```
//!
//! [`SharedLedger`] puts the whole ledger behind one lock.

pub mod conservation;
pub mod journal;
pub mod ledger;
pub mod shared;
pub mod snapshot;

pub use conservation::Conservation;
pub use journal::Journal;
pub use ledger::SettlementLedger;
pub use shared::SharedLedger;
pub use snapshot::{load_json, save_json, LedgerSnapshot};
