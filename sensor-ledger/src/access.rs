//! Single fixed authority
//!
//! The authority is captured once when the ledger is created and never
//! changes. There is no ownership transfer and no role hierarchy.

use crate::{types::Address, Error, Result};

/// The only principal allowed to register or revoke sensors
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authority {
    address: Address,
}

impl Authority {
    /// Fix the authority identity
    pub fn new(address: Address) -> Result<Self> {
        if address.is_empty() {
            return Err(Error::Config("authority address must not be empty".to_string()));
        }
        Ok(Self { address })
    }

    /// Authority identity
    pub fn address(&self) -> &Address {
        &self.address
    }

    /// Fail with `Unauthorized` unless `caller` is the authority
    pub fn ensure(&self, caller: &Address) -> Result<()> {
        if caller != &self.address {
            return Err(Error::Unauthorized);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_authority_passes() {
        let authority = Authority::new(Address::new("admin")).unwrap();
        assert!(authority.ensure(&Address::new("admin")).is_ok());
        assert!(matches!(
            authority.ensure(&Address::new("sensor1")),
            Err(Error::Unauthorized)
        ));
    }

    #[test]
    fn test_empty_authority_rejected() {
        assert!(matches!(Authority::new(Address::new("")), Err(Error::Config(_))));
    }
}
