//! Asset registry: custody of tokenized properties.
//!
//! A registry maps each [`AssetId`] to exactly one custodian. Custody moves
//! only through [`AssetRegistry::transfer_custody`], which the current
//! custodian or its single approved transferee may invoke.

use realty_types::{AssetId, EscrowError, PartyId, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Custody seam consumed by the settlement ledger.
pub trait AssetRegistry: Send {
    /// Stable identifier of this registry; the ledger is bound to one.
    fn registry_id(&self) -> &str;

    /// Current custodian of `asset_id`.
    ///
    /// # Errors
    /// `RegistryFailure` if the asset does not exist.
    fn custodian_of(&self, asset_id: AssetId) -> Result<PartyId>;

    /// The party the custodian has pre-approved to move this asset, if any.
    fn approved_transferee(&self, asset_id: AssetId) -> Option<PartyId>;

    /// Move custody of `asset_id` from `from` to `to` on behalf of `operator`.
    ///
    /// `operator` must be `from` itself or the asset's approved transferee.
    ///
    /// # Errors
    /// `RegistryFailure` if the asset is unknown, `from` is not the current
    /// custodian, or `operator` is not authorized. Custody is unchanged on error.
    fn transfer_custody(
        &mut self,
        operator: &PartyId,
        asset_id: AssetId,
        from: &PartyId,
        to: &PartyId,
    ) -> Result<()>;
}

/// One minted property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyToken {
    pub asset_id: AssetId,
    pub custodian: PartyId,
    /// Metadata location (deed document, listing JSON).
    pub uri: String,
    /// Single-asset approval; cleared on every transfer.
    pub approved: Option<PartyId>,
}

/// In-process reference registry. Assets are minted with ids `1, 2, 3, ...`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertyRegistry {
    id: String,
    /// Index `n` holds `AssetId(n + 1)`.
    tokens: Vec<PropertyToken>,
}

impl PropertyRegistry {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            tokens: Vec::new(),
        }
    }

    /// Mint a new property into the custody of `owner`.
    pub fn mint(&mut self, owner: &PartyId, uri: impl Into<String>) -> AssetId {
        let asset_id = self.tokens.last().map_or(AssetId(1), |t| t.asset_id.next());
        self.tokens.push(PropertyToken {
            asset_id,
            custodian: owner.clone(),
            uri: uri.into(),
            approved: None,
        });
        debug!(%asset_id, %owner, "property minted");
        asset_id
    }

    /// Let `operator` move `asset_id` once. Only the custodian may approve.
    ///
    /// # Errors
    /// `RegistryFailure` if the asset is unknown or `caller` is not the custodian.
    pub fn approve(&mut self, caller: &PartyId, asset_id: AssetId, operator: &PartyId) -> Result<()> {
        let token = self.token_mut(asset_id)?;
        if token.custodian != *caller {
            return Err(EscrowError::RegistryFailure {
                asset_id,
                reason: format!("{caller} is not the custodian and cannot approve"),
            });
        }
        token.approved = Some(operator.clone());
        Ok(())
    }

    #[must_use]
    pub fn token(&self, asset_id: AssetId) -> Option<&PropertyToken> {
        let index = usize::try_from(asset_id.0.checked_sub(1)?).ok()?;
        self.tokens.get(index)
    }

    #[must_use]
    pub fn token_uri(&self, asset_id: AssetId) -> Option<&str> {
        self.token(asset_id).map(|t| t.uri.as_str())
    }

    /// Number of minted properties.
    #[must_use]
    pub fn total_supply(&self) -> u64 {
        self.tokens.len() as u64
    }

    /// Assets currently held by `party`, in id order.
    #[must_use]
    pub fn assets_of(&self, party: &PartyId) -> Vec<AssetId> {
        self.tokens
            .iter()
            .filter(|t| t.custodian == *party)
            .map(|t| t.asset_id)
            .collect()
    }

    fn token_mut(&mut self, asset_id: AssetId) -> Result<&mut PropertyToken> {
        let index = asset_id
            .0
            .checked_sub(1)
            .and_then(|i| usize::try_from(i).ok())
            .filter(|i| *i < self.tokens.len())
            .ok_or_else(|| unknown_asset(asset_id))?;
        Ok(&mut self.tokens[index])
    }
}

fn unknown_asset(asset_id: AssetId) -> EscrowError {
    EscrowError::RegistryFailure {
        asset_id,
        reason: "asset does not exist".into(),
    }
}

impl AssetRegistry for PropertyRegistry {
    fn registry_id(&self) -> &str {
        &self.id
    }

    fn custodian_of(&self, asset_id: AssetId) -> Result<PartyId> {
        self.token(asset_id)
            .map(|t| t.custodian.clone())
            .ok_or_else(|| unknown_asset(asset_id))
    }

    fn approved_transferee(&self, asset_id: AssetId) -> Option<PartyId> {
        self.token(asset_id).and_then(|t| t.approved.clone())
    }

    fn transfer_custody(
        &mut self,
        operator: &PartyId,
        asset_id: AssetId,
        from: &PartyId,
        to: &PartyId,
    ) -> Result<()> {
        let token = self.token_mut(asset_id)?;
        if token.custodian != *from {
            return Err(EscrowError::RegistryFailure {
                asset_id,
                reason: format!("{from} is not the custodian"),
            });
        }
        let authorized = operator == from || token.approved.as_ref() == Some(operator);
        if !authorized {
            return Err(EscrowError::RegistryFailure {
                asset_id,
                reason: format!("{operator} is neither custodian nor approved"),
            });
        }
        token.custodian = to.clone();
        token.approved = None;
        debug!(%asset_id, %from, %to, "custody transferred");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn party(s: &str) -> PartyId {
        PartyId::new(s)
    }

    #[test]
    fn mint_assigns_sequential_ids() {
        let mut reg = PropertyRegistry::new("reg");
        let a = reg.mint(&party("seller"), "ipfs://house-1.json");
        let b = reg.mint(&party("seller"), "ipfs://house-2.json");
        assert_eq!(a, AssetId(1));
        assert_eq!(b, AssetId(2));
        assert_eq!(reg.total_supply(), 2);
        assert_eq!(reg.token_uri(b), Some("ipfs://house-2.json"));
        assert_eq!(reg.assets_of(&party("seller")), vec![a, b]);
    }

    #[test]
    fn unknown_asset_fails() {
        let reg = PropertyRegistry::new("reg");
        assert!(matches!(
            reg.custodian_of(AssetId(1)),
            Err(EscrowError::RegistryFailure { .. })
        ));
        assert!(reg.custodian_of(AssetId(0)).is_err());
        assert_eq!(reg.approved_transferee(AssetId(5)), None);
    }

    #[test]
    fn approved_operator_can_pull_custody() {
        let mut reg = PropertyRegistry::new("reg");
        let id = reg.mint(&party("seller"), "uri");
        reg.approve(&party("seller"), id, &party("escrow")).unwrap();
        assert_eq!(reg.approved_transferee(id), Some(party("escrow")));

        reg.transfer_custody(&party("escrow"), id, &party("seller"), &party("escrow"))
            .unwrap();
        assert_eq!(reg.custodian_of(id).unwrap(), party("escrow"));
        assert_eq!(reg.approved_transferee(id), None);
    }

    #[test]
    fn stranger_cannot_move_custody() {
        let mut reg = PropertyRegistry::new("reg");
        let id = reg.mint(&party("seller"), "uri");
        let err = reg
            .transfer_custody(&party("mallory"), id, &party("seller"), &party("mallory"))
            .unwrap_err();
        assert!(matches!(err, EscrowError::RegistryFailure { .. }));
        assert_eq!(reg.custodian_of(id).unwrap(), party("seller"));
    }

    #[test]
    fn wrong_from_rejected() {
        let mut reg = PropertyRegistry::new("reg");
        let id = reg.mint(&party("seller"), "uri");
        assert!(reg
            .transfer_custody(&party("buyer"), id, &party("buyer"), &party("escrow"))
            .is_err());
    }

    #[test]
    fn only_custodian_can_approve() {
        let mut reg = PropertyRegistry::new("reg");
        let id = reg.mint(&party("seller"), "uri");
        assert!(reg.approve(&party("buyer"), id, &party("buyer")).is_err());
        assert_eq!(reg.approved_transferee(id), None);
    }

    #[test]
    fn registry_serde_roundtrip() {
        let mut reg = PropertyRegistry::new("reg");
        let id = reg.mint(&party("seller"), "uri");
        let json = serde_json::to_string(&reg).unwrap();
        let back: PropertyRegistry = serde_json::from_str(&json).unwrap();
        assert_eq!(back.registry_id(), "reg");
        assert_eq!(back.custodian_of(id).unwrap(), party("seller"));
    }
}
