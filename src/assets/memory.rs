use std::collections::HashMap;

use crate::assets::{FungibleAsset, NonFungibleAsset};
use crate::decimal::Amount;
use crate::errors::AssetError;
use crate::types::{AccountId, CollateralRef};

/// in-memory fungible token with balances and allowances
#[derive(Debug, Clone, Default)]
pub struct InMemoryToken {
    pub symbol: String,
    balances: HashMap<AccountId, Amount>,
    allowances: HashMap<(AccountId, AccountId), Amount>,
    total_supply: Amount,
}

impl InMemoryToken {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            ..Self::default()
        }
    }

    /// create new units for `to`
    pub fn mint(&mut self, to: &AccountId, amount: Amount) -> Result<(), AssetError> {
        let supply = self
            .total_supply
            .checked_add(amount)
            .ok_or_else(|| AssetError::BalanceOverflow { owner: to.clone() })?;
        let balance = self
            .balance_of(to)
            .checked_add(amount)
            .ok_or_else(|| AssetError::BalanceOverflow { owner: to.clone() })?;

        self.total_supply = supply;
        self.balances.insert(to.clone(), balance);
        Ok(())
    }

    pub fn total_supply(&self) -> Amount {
        self.total_supply
    }

    fn move_balance(&mut self, from: &AccountId, to: &AccountId, amount: Amount) -> Result<(), AssetError> {
        let available = self.balance_of(from);
        let remaining = available
            .checked_sub(amount)
            .ok_or_else(|| AssetError::InsufficientBalance {
                owner: from.clone(),
                available,
                required: amount,
            })?;

        if from == to {
            return Ok(());
        }

        let credited = self
            .balance_of(to)
            .checked_add(amount)
            .ok_or_else(|| AssetError::BalanceOverflow { owner: to.clone() })?;

        self.balances.insert(from.clone(), remaining);
        self.balances.insert(to.clone(), credited);
        Ok(())
    }
}

impl FungibleAsset for InMemoryToken {
    fn balance_of(&self, owner: &AccountId) -> Amount {
        self.balances.get(owner).copied().unwrap_or(Amount::ZERO)
    }

    fn allowance(&self, owner: &AccountId, spender: &AccountId) -> Amount {
        self.allowances
            .get(&(owner.clone(), spender.clone()))
            .copied()
            .unwrap_or(Amount::ZERO)
    }

    fn transfer(&mut self, owner: &AccountId, to: &AccountId, amount: Amount) -> Result<(), AssetError> {
        self.move_balance(owner, to, amount)
    }

    fn approve(&mut self, owner: &AccountId, spender: &AccountId, amount: Amount) -> Result<(), AssetError> {
        self.allowances.insert((owner.clone(), spender.clone()), amount);
        Ok(())
    }

    fn transfer_from(
        &mut self,
        spender: &AccountId,
        from: &AccountId,
        to: &AccountId,
        amount: Amount,
    ) -> Result<(), AssetError> {
        let allowed = self.allowance(from, spender);
        let remaining_allowance = allowed
            .checked_sub(amount)
            .ok_or_else(|| AssetError::InsufficientAllowance {
                owner: from.clone(),
                spender: spender.clone(),
                allowed,
                required: amount,
            })?;

        self.move_balance(from, to, amount)?;
        self.allowances
            .insert((from.clone(), spender.clone()), remaining_allowance);
        Ok(())
    }
}

/// in-memory registry of non-fungible tokens across collections
#[derive(Debug, Clone, Default)]
pub struct InMemoryCollection {
    owners: HashMap<CollateralRef, AccountId>,
    approvals: HashMap<CollateralRef, AccountId>,
}

impl InMemoryCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// create a new token owned by `owner`
    pub fn mint(&mut self, asset: CollateralRef, owner: &AccountId) -> Result<(), AssetError> {
        if self.owners.contains_key(&asset) {
            return Err(AssetError::AlreadyExists { asset });
        }
        self.owners.insert(asset, owner.clone());
        Ok(())
    }

    /// tokens currently held by `owner`
    pub fn tokens_of(&self, owner: &AccountId) -> Vec<CollateralRef> {
        let mut tokens: Vec<CollateralRef> = self
            .owners
            .iter()
            .filter(|(_, o)| *o == owner)
            .map(|(asset, _)| asset.clone())
            .collect();
        tokens.sort();
        tokens
    }
}

impl NonFungibleAsset for InMemoryCollection {
    fn owner_of(&self, asset: &CollateralRef) -> Result<AccountId, AssetError> {
        self.owners
            .get(asset)
            .cloned()
            .ok_or_else(|| AssetError::UnknownToken { asset: asset.clone() })
    }

    fn get_approved(&self, asset: &CollateralRef) -> Option<AccountId> {
        self.approvals.get(asset).cloned()
    }

    fn approve(&mut self, owner: &AccountId, spender: &AccountId, asset: &CollateralRef) -> Result<(), AssetError> {
        let current = self.owner_of(asset)?;
        if &current != owner {
            return Err(AssetError::NotOwner {
                asset: asset.clone(),
                owner: current,
                claimed: owner.clone(),
            });
        }
        self.approvals.insert(asset.clone(), spender.clone());
        Ok(())
    }

    fn transfer_from(
        &mut self,
        operator: &AccountId,
        from: &AccountId,
        to: &AccountId,
        asset: &CollateralRef,
    ) -> Result<(), AssetError> {
        let current = self.owner_of(asset)?;
        if &current != from {
            return Err(AssetError::NotOwner {
                asset: asset.clone(),
                owner: current,
                claimed: from.clone(),
            });
        }

        let approved = self.approvals.get(asset) == Some(operator);
        if operator != from && !approved {
            return Err(AssetError::NotApproved {
                asset: asset.clone(),
                operator: operator.clone(),
            });
        }

        self.approvals.remove(asset);
        self.owners.insert(asset.clone(), to.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> AccountId {
        AccountId::new("alice")
    }

    fn bob() -> AccountId {
        AccountId::new("bob")
    }

    #[test]
    fn test_token_transfer_from_spends_allowance() {
        let spender = AccountId::new("protocol");
        let mut token = InMemoryToken::new("USDC");
        token.mint(&alice(), Amount::new(500)).unwrap();

        // no allowance yet
        let err = token
            .transfer_from(&spender, &alice(), &bob(), Amount::new(100))
            .unwrap_err();
        assert!(matches!(err, AssetError::InsufficientAllowance { .. }));

        token.approve(&alice(), &spender, Amount::new(150)).unwrap();
        token
            .transfer_from(&spender, &alice(), &bob(), Amount::new(100))
            .unwrap();

        assert_eq!(token.balance_of(&alice()), Amount::new(400));
        assert_eq!(token.balance_of(&bob()), Amount::new(100));
        assert_eq!(token.allowance(&alice(), &spender), Amount::new(50));
        assert_eq!(token.total_supply(), Amount::new(500));
    }

    #[test]
    fn test_token_failed_transfer_has_no_effect() {
        let spender = AccountId::new("protocol");
        let mut token = InMemoryToken::new("USDC");
        token.mint(&alice(), Amount::new(50)).unwrap();
        token.approve(&alice(), &spender, Amount::new(100)).unwrap();

        let err = token
            .transfer_from(&spender, &alice(), &bob(), Amount::new(100))
            .unwrap_err();

        assert!(matches!(err, AssetError::InsufficientBalance { .. }));
        assert_eq!(token.balance_of(&alice()), Amount::new(50));
        assert_eq!(token.balance_of(&bob()), Amount::ZERO);
        assert_eq!(token.allowance(&alice(), &spender), Amount::new(100));
    }

    #[test]
    fn test_token_overflow_rejected() {
        let mut token = InMemoryToken::new("USDC");
        token.mint(&alice(), Amount::MAX).unwrap();
        assert!(matches!(
            token.mint(&bob(), Amount::new(1)),
            Err(AssetError::BalanceOverflow { .. })
        ));
    }

    #[test]
    fn test_collection_transfer_requires_approval() {
        let punk = CollateralRef::new("punks", 1);
        let operator = AccountId::new("protocol");
        let mut nfts = InMemoryCollection::new();
        nfts.mint(punk.clone(), &alice()).unwrap();

        let err = nfts
            .transfer_from(&operator, &alice(), &operator, &punk)
            .unwrap_err();
        assert!(matches!(err, AssetError::NotApproved { .. }));

        nfts.approve(&alice(), &operator, &punk).unwrap();
        nfts.transfer_from(&operator, &alice(), &operator, &punk).unwrap();

        assert_eq!(nfts.owner_of(&punk).unwrap(), operator);
        assert_eq!(nfts.get_approved(&punk), None);
        assert_eq!(nfts.tokens_of(&operator), vec![punk]);
    }

    #[test]
    fn test_collection_rejects_wrong_owner() {
        let punk = CollateralRef::new("punks", 1);
        let mut nfts = InMemoryCollection::new();
        nfts.mint(punk.clone(), &alice()).unwrap();

        assert!(matches!(
            nfts.approve(&bob(), &bob(), &punk),
            Err(AssetError::NotOwner { .. })
        ));
        assert!(matches!(
            nfts.transfer_from(&bob(), &bob(), &bob(), &punk),
            Err(AssetError::NotOwner { .. })
        ));
        assert!(matches!(
            nfts.owner_of(&CollateralRef::new("punks", 2)),
            Err(AssetError::UnknownToken { .. })
        ));
        assert!(matches!(
            nfts.mint(punk, &bob()),
            Err(AssetError::AlreadyExists { .. })
        ));
    }
}
