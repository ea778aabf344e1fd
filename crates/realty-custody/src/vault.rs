//! Value transfer: party wallets and per-asset escrow scopes.
//!
//! Every balance lives under an [`Account`]. A deposit debits a party wallet
//! and credits an escrow scope; a disbursement does the reverse. All
//! mutations are atomic: either the full move succeeds or both balances are
//! unchanged.

use std::collections::HashMap;

use realty_types::{Account, Amount, AssetId, EscrowError, PartyId, Result};
use rust_decimal::Decimal;
use tracing::debug;

/// Funds seam consumed by the settlement ledger.
pub trait ValueTransfer: Send {
    /// Move `amount` from `from`'s wallet into the escrow scope of `scope`.
    ///
    /// # Errors
    /// `InvalidAmount` if `amount <= 0`; `InsufficientFunds` if the wallet
    /// holds less than `amount`.
    fn deposit(&mut self, from: &PartyId, scope: AssetId, amount: Amount) -> Result<()>;

    /// Funds currently attributed to `scope`.
    fn balance_of(&self, scope: AssetId) -> Amount;

    /// Pay `amount` out of `scope` into `to`'s wallet.
    ///
    /// # Errors
    /// `InvalidAmount` if `amount <= 0`; `InsufficientFunds` if
    /// `amount > balance_of(scope)`.
    fn disburse(&mut self, scope: AssetId, to: &PartyId, amount: Amount) -> Result<()>;
}

/// In-process reference vault.
#[derive(Debug, Clone, Default)]
pub struct Vault {
    balances: HashMap<Account, Decimal>,
}

impl Vault {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fund a party wallet from outside the system.
    ///
    /// # Errors
    /// `InvalidAmount` if `amount <= 0`.
    pub fn credit(&mut self, party: &PartyId, amount: Decimal) -> Result<()> {
        ensure_positive(amount)?;
        *self.balances.entry(Account::Party(party.clone())).or_default() += amount;
        Ok(())
    }

    #[must_use]
    pub fn wallet(&self, party: &PartyId) -> Decimal {
        self.get(&Account::Party(party.clone()))
    }

    /// Sum over every account. Internal moves never change it.
    #[must_use]
    pub fn total_supply(&self) -> Decimal {
        self.balances.values().copied().sum()
    }

    /// All non-zero balances, sorted by account.
    #[must_use]
    pub fn entries(&self) -> Vec<(Account, Decimal)> {
        let mut out: Vec<_> = self
            .balances
            .iter()
            .filter(|(_, v)| !v.is_zero())
            .map(|(k, v)| (k.clone(), *v))
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }

    /// Rebuild a vault from [`Self::entries`] output.
    ///
    /// # Errors
    /// `InvalidAmount` on a negative balance.
    pub fn from_entries(entries: impl IntoIterator<Item = (Account, Decimal)>) -> Result<Self> {
        let mut vault = Self::new();
        for (account, amount) in entries {
            if amount.is_sign_negative() {
                return Err(EscrowError::InvalidAmount {
                    reason: format!("negative balance {amount} for {account}"),
                });
            }
            *vault.balances.entry(account).or_default() += amount;
        }
        Ok(vault)
    }

    fn get(&self, account: &Account) -> Decimal {
        self.balances.get(account).copied().unwrap_or_default()
    }

    /// Check-then-mutate move between two accounts.
    fn transfer(&mut self, from: Account, to: Account, amount: Decimal) -> Result<()> {
        ensure_positive(amount)?;
        let available = self.get(&from);
        if available < amount {
            return Err(EscrowError::InsufficientFunds {
                needed: amount,
                available,
            });
        }
        *self.balances.entry(from.clone()).or_default() -= amount;
        *self.balances.entry(to.clone()).or_default() += amount;
        debug!(%from, %to, %amount, "vault transfer");
        Ok(())
    }
}

fn ensure_positive(amount: Decimal) -> Result<()> {
    if amount <= Decimal::ZERO {
        return Err(EscrowError::InvalidAmount {
            reason: format!("amount must be positive, got {amount}"),
        });
    }
    Ok(())
}

impl ValueTransfer for Vault {
    fn deposit(&mut self, from: &PartyId, scope: AssetId, amount: Amount) -> Result<()> {
        self.transfer(Account::Party(from.clone()), Account::Escrow(scope), amount)
    }

    fn balance_of(&self, scope: AssetId) -> Amount {
        self.get(&Account::Escrow(scope))
    }

    fn disburse(&mut self, scope: AssetId, to: &PartyId, amount: Amount) -> Result<()> {
        self.transfer(Account::Escrow(scope), Account::Party(to.clone()), amount)
    }
}
