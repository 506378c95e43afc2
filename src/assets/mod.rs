//! Interfaces of the two asset collaborators the protocol moves value through.
//!
//! Both follow the approve-then-transfer_from pattern: the protocol never
//! debits an account directly, it spends an allowance or approval that the
//! account's owner granted beforehand.

pub mod memory;

use crate::decimal::Amount;
use crate::errors::AssetError;
use crate::types::{AccountId, CollateralRef};

pub use memory::{InMemoryCollection, InMemoryToken};

/// a fungible token in which loans are denominated
pub trait FungibleAsset {
    fn balance_of(&self, owner: &AccountId) -> Amount;

    fn allowance(&self, owner: &AccountId, spender: &AccountId) -> Amount;

    /// move `amount` out of `owner`'s own balance
    fn transfer(&mut self, owner: &AccountId, to: &AccountId, amount: Amount) -> Result<(), AssetError>;

    /// set the amount `spender` may move on `owner`'s behalf
    fn approve(&mut self, owner: &AccountId, spender: &AccountId, amount: Amount) -> Result<(), AssetError>;

    /// move `amount` from `from` to `to`, spending `spender`'s allowance
    fn transfer_from(
        &mut self,
        spender: &AccountId,
        from: &AccountId,
        to: &AccountId,
        amount: Amount,
    ) -> Result<(), AssetError>;
}

/// a registry of single-owner tokens, possibly spanning several collections
pub trait NonFungibleAsset {
    fn owner_of(&self, asset: &CollateralRef) -> Result<AccountId, AssetError>;

    fn get_approved(&self, asset: &CollateralRef) -> Option<AccountId>;

    /// let `spender` move `asset`; only the current owner may approve
    fn approve(&mut self, owner: &AccountId, spender: &AccountId, asset: &CollateralRef) -> Result<(), AssetError>;

    /// move `asset` from `from` to `to`; `operator` must be the owner or approved.
    /// Clears any approval on success.
    fn transfer_from(
        &mut self,
        operator: &AccountId,
        from: &AccountId,
        to: &AccountId,
        asset: &CollateralRef,
    ) -> Result<(), AssetError>;
}
