//! Asset registry: which fungible tokens may receive deposits, and who may change that.
//!
//! The native currency is always eligible and never stored. Removal flips the flag to
//! false; entries are never deleted.

use crate::asset::{normalize_account, AccountId, AssetId};
use crate::error::LedgerError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct AssetRegistry {
    owner: AccountId,
    supported: BTreeMap<AssetId, bool>,
}

impl AssetRegistry {
    pub fn new(owner: AccountId) -> Self {
        Self {
            owner: normalize_account(&owner),
            supported: BTreeMap::new(),
        }
    }

    pub fn owner(&self) -> &AccountId {
        &self.owner
    }

    fn ensure_owner(&self, caller: &AccountId) -> Result<(), LedgerError> {
        let caller = normalize_account(caller);
        if caller != self.owner {
            return Err(LedgerError::Unauthorized { caller });
        }
        Ok(())
    }

    /// Admit a token. Idempotent; the native identifier is rejected.
    pub fn add_supported_asset(
        &mut self,
        caller: &AccountId,
        asset: &AssetId,
    ) -> Result<(), LedgerError> {
        self.ensure_owner(caller)?;
        if asset.is_native() {
            return Err(LedgerError::InvalidAsset);
        }
        self.supported.insert(asset.clone(), true);
        Ok(())
    }

    /// Mark a token unsupported, whatever its prior state. Existing positions are untouched.
    /// The native currency cannot be unlisted.
    pub fn remove_supported_asset(
        &mut self,
        caller: &AccountId,
        asset: &AssetId,
    ) -> Result<(), LedgerError> {
        self.ensure_owner(caller)?;
        if asset.is_native() {
            return Err(LedgerError::InvalidAsset);
        }
        self.supported.insert(asset.clone(), false);
        Ok(())
    }

    pub fn is_supported(&self, asset: &AssetId) -> bool {
        asset.is_native() || self.supported.get(asset).copied().unwrap_or(false)
    }

    /// Hand the administrative role to `new_owner`.
    pub fn transfer_ownership(
        &mut self,
        caller: &AccountId,
        new_owner: AccountId,
    ) -> Result<(), LedgerError> {
        self.ensure_owner(caller)?;
        self.owner = normalize_account(&new_owner);
        Ok(())
    }

    /// Tokens currently flagged supported, sorted.
    pub fn supported_tokens(&self) -> Vec<AssetId> {
        self.supported
            .iter()
            .filter(|(_, on)| **on)
            .map(|(a, _)| a.clone())
            .collect()
    }

    /// Every stored flag, including tokens toggled off.
    pub fn entries(&self) -> impl Iterator<Item = (&AssetId, bool)> {
        self.supported.iter().map(|(a, on)| (a, *on))
    }

    pub(crate) fn from_entries(
        owner: AccountId,
        entries: impl IntoIterator<Item = (AssetId, bool)>,
    ) -> Self {
        Self {
            owner: normalize_account(&owner),
            supported: entries
                .into_iter()
                .filter(|(a, _)| !a.is_native())
                .collect(),
        }
    }
}
