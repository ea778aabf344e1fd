//! Party roles and their authorization classes.
//!
//! `seller`, `inspector` and `lender` are ledger-wide singletons fixed at
//! construction. `buyer` is assigned per escrow record at listing time.
//! Only buyer, seller and lender carry an approval flag.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{EscrowError, PartyId, Result};

/// The four authorization classes of the protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Seller,
    Buyer,
    Inspector,
    Lender,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Seller => write!(f, "SELLER"),
            Self::Buyer => write!(f, "BUYER"),
            Self::Inspector => write!(f, "INSPECTOR"),
            Self::Lender => write!(f, "LENDER"),
        }
    }
}

/// The closed set of roles whose approval gates finalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ApprovalRole {
    Buyer,
    Seller,
    Lender,
}

impl ApprovalRole {
    /// All approval roles, in the order finalization checks them.
    pub const ALL: [Self; 3] = [Self::Buyer, Self::Seller, Self::Lender];
}

impl From<ApprovalRole> for Role {
    fn from(role: ApprovalRole) -> Self {
        match role {
            ApprovalRole::Buyer => Self::Buyer,
            ApprovalRole::Seller => Self::Seller,
            ApprovalRole::Lender => Self::Lender,
        }
    }
}

impl fmt::Display for ApprovalRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&Role::from(*self), f)
    }
}

/// Ledger-wide role assignments. Immutable once the ledger is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartyRoles {
    pub seller: PartyId,
    pub inspector: PartyId,
    pub lender: PartyId,
}

impl PartyRoles {
    #[must_use]
    pub fn new(seller: impl Into<PartyId>, inspector: impl Into<PartyId>, lender: impl Into<PartyId>) -> Self {
        Self {
            seller: seller.into(),
            inspector: inspector.into(),
            lender: lender.into(),
        }
    }

    /// Which global role `party` holds, if any.
    #[must_use]
    pub fn global_role_of(&self, party: &PartyId) -> Option<Role> {
        if *party == self.seller {
            Some(Role::Seller)
        } else if *party == self.inspector {
            Some(Role::Inspector)
        } else if *party == self.lender {
            Some(Role::Lender)
        } else {
            None
        }
    }

    /// Whether `party` holds the given global role.
    #[must_use]
    pub fn holds(&self, party: &PartyId, role: Role) -> bool {
        match role {
            Role::Seller => *party == self.seller,
            Role::Inspector => *party == self.inspector,
            Role::Lender => *party == self.lender,
            Role::Buyer => false,
        }
    }

    /// Roles must be valid identifiers and pairwise distinct, so that a
    /// caller resolves to at most one global role.
    pub fn validate(&self) -> Result<()> {
        for (role, party) in [
            (Role::Seller, &self.seller),
            (Role::Inspector, &self.inspector),
            (Role::Lender, &self.lender),
        ] {
            if !party.is_valid() {
                return Err(EscrowError::Configuration(format!(
                    "{role} identity {party:?} is not a valid party id"
                )));
            }
        }
        if self.seller == self.inspector || self.seller == self.lender || self.inspector == self.lender {
            return Err(EscrowError::Configuration(
                "seller, inspector and lender must be distinct parties".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roles() -> PartyRoles {
        PartyRoles::new("seller", "inspector", "lender")
    }

    #[test]
    fn global_role_resolution() {
        let r = roles();
        assert_eq!(r.global_role_of(&"seller".into()), Some(Role::Seller));
        assert_eq!(r.global_role_of(&"inspector".into()), Some(Role::Inspector));
        assert_eq!(r.global_role_of(&"lender".into()), Some(Role::Lender));
        assert_eq!(r.global_role_of(&"mallory".into()), None);
    }

    #[test]
    fn buyer_is_never_a_global_role() {
        let r = roles();
        assert!(!r.holds(&"seller".into(), Role::Buyer));
        assert!(r.holds(&"seller".into(), Role::Seller));
    }

    #[test]
    fn duplicate_roles_rejected() {
        let r = PartyRoles::new("alice", "alice", "lender");
        assert!(matches!(r.validate(), Err(EscrowError::Configuration(_))));
    }

    #[test]
    fn empty_role_rejected() {
        let r = PartyRoles::new("", "inspector", "lender");
        assert!(r.validate().is_err());
        assert!(roles().validate().is_ok());
    }

    #[test]
    fn approval_role_display_matches_role() {
        assert_eq!(ApprovalRole::Lender.to_string(), "LENDER");
        assert_eq!(Role::from(ApprovalRole::Buyer), Role::Buyer);
    }
}
