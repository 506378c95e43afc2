use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::assets::{FungibleAsset, NonFungibleAsset};
use crate::decimal::Amount;
use crate::errors::{AssetError, Result};
use crate::types::{AccountId, CollateralRef};

/// a single asset movement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Leg {
    Fungible {
        from: AccountId,
        to: AccountId,
        amount: Amount,
    },
    Collateral {
        from: AccountId,
        to: AccountId,
        asset: CollateralRef,
    },
}

impl Leg {
    pub fn from(&self) -> &AccountId {
        match self {
            Leg::Fungible { from, .. } | Leg::Collateral { from, .. } => from,
        }
    }

    pub fn to(&self) -> &AccountId {
        match self {
            Leg::Fungible { to, .. } | Leg::Collateral { to, .. } => to,
        }
    }
}

/// ordered set of legs that either all happen or none do
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settlement {
    legs: Vec<Leg>,
}

impl Settlement {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fungible(mut self, from: &AccountId, to: &AccountId, amount: Amount) -> Self {
        self.legs.push(Leg::Fungible {
            from: from.clone(),
            to: to.clone(),
            amount,
        });
        self
    }

    pub fn collateral(mut self, from: &AccountId, to: &AccountId, asset: &CollateralRef) -> Self {
        self.legs.push(Leg::Collateral {
            from: from.clone(),
            to: to.clone(),
            asset: asset.clone(),
        });
        self
    }

    pub fn legs(&self) -> &[Leg] {
        &self.legs
    }

    pub fn is_empty(&self) -> bool {
        self.legs.is_empty()
    }
}

/// working copy of collaborator state used to verify a settlement before committing it
struct Preflight<'a, F, N> {
    escrow: &'a AccountId,
    fungible: &'a F,
    collateral: &'a N,
    balances: HashMap<AccountId, Amount>,
    allowances: HashMap<AccountId, Amount>,
    owners: HashMap<CollateralRef, AccountId>,
    approvals: HashMap<CollateralRef, Option<AccountId>>,
}

impl<'a, F: FungibleAsset, N: NonFungibleAsset> Preflight<'a, F, N> {
    fn new(escrow: &'a AccountId, fungible: &'a F, collateral: &'a N) -> Self {
        Self {
            escrow,
            fungible,
            collateral,
            balances: HashMap::new(),
            allowances: HashMap::new(),
            owners: HashMap::new(),
            approvals: HashMap::new(),
        }
    }

    fn balance(&mut self, owner: &AccountId) -> Amount {
        let fungible = self.fungible;
        *self
            .balances
            .entry(owner.clone())
            .or_insert_with(|| fungible.balance_of(owner))
    }

    /// allowance granted by `owner` to the escrow
    fn allowance(&mut self, owner: &AccountId) -> Amount {
        let (fungible, escrow) = (self.fungible, self.escrow);
        *self
            .allowances
            .entry(owner.clone())
            .or_insert_with(|| fungible.allowance(owner, escrow))
    }

    fn owner(&mut self, asset: &CollateralRef) -> std::result::Result<AccountId, AssetError> {
        if let Some(owner) = self.owners.get(asset) {
            return Ok(owner.clone());
        }
        let owner = self.collateral.owner_of(asset)?;
        self.owners.insert(asset.clone(), owner.clone());
        Ok(owner)
    }

    fn approved(&mut self, asset: &CollateralRef) -> Option<AccountId> {
        let collateral = self.collateral;
        self.approvals
            .entry(asset.clone())
            .or_insert_with(|| collateral.get_approved(asset))
            .clone()
    }

    fn apply(&mut self, leg: &Leg) -> std::result::Result<(), AssetError> {
        match leg {
            Leg::Fungible { from, to, amount } => {
                if from != self.escrow {
                    let allowed = self.allowance(from);
                    let remaining = allowed.checked_sub(*amount).ok_or_else(|| {
                        AssetError::InsufficientAllowance {
                            owner: from.clone(),
                            spender: self.escrow.clone(),
                            allowed,
                            required: *amount,
                        }
                    })?;
                    self.allowances.insert(from.clone(), remaining);
                }

                let available = self.balance(from);
                let debited = available.checked_sub(*amount).ok_or_else(|| {
                    AssetError::InsufficientBalance {
                        owner: from.clone(),
                        available,
                        required: *amount,
                    }
                })?;
                self.balances.insert(from.clone(), debited);

                let credited = self
                    .balance(to)
                    .checked_add(*amount)
                    .ok_or_else(|| AssetError::BalanceOverflow { owner: to.clone() })?;
                self.balances.insert(to.clone(), credited);
            }
            Leg::Collateral { from, to, asset } => {
                let owner = self.owner(asset)?;
                if &owner != from {
                    return Err(AssetError::NotOwner {
                        asset: asset.clone(),
                        owner,
                        claimed: from.clone(),
                    });
                }
                if from != self.escrow && self.approved(asset).as_ref() != Some(self.escrow) {
                    return Err(AssetError::NotApproved {
                        asset: asset.clone(),
                        operator: self.escrow.clone(),
                    });
                }
                self.owners.insert(asset.clone(), to.clone());
                self.approvals.insert(asset.clone(), None);
            }
        }
        Ok(())
    }
}

/// protocol custody over the loan currency and the collateral registry.
///
/// Every movement is made by the escrow account: inbound legs spend an
/// allowance or approval the source granted to the escrow, outbound legs are
/// plain transfers of what the escrow owns.
#[derive(Debug)]
pub struct AssetCustody<F, N> {
    escrow: AccountId,
    fungible: F,
    collateral: N,
}

impl<F: FungibleAsset, N: NonFungibleAsset> AssetCustody<F, N> {
    pub fn new(escrow: AccountId, fungible: F, collateral: N) -> Self {
        Self {
            escrow,
            fungible,
            collateral,
        }
    }

    /// identity that holds collateral while loans are open
    pub fn escrow(&self) -> &AccountId {
        &self.escrow
    }

    pub fn fungible(&self) -> &F {
        &self.fungible
    }

    /// direct access to the token, as any account holder would have
    pub fn fungible_mut(&mut self) -> &mut F {
        &mut self.fungible
    }

    pub fn collateral(&self) -> &N {
        &self.collateral
    }

    /// direct access to the collateral registry, as any account holder would have
    pub fn collateral_mut(&mut self) -> &mut N {
        &mut self.collateral
    }

    /// whether the escrow currently owns `asset`
    pub fn holds_collateral(&self, asset: &CollateralRef) -> bool {
        self.collateral
            .owner_of(asset)
            .map(|owner| owner == self.escrow)
            .unwrap_or(false)
    }

    /// move `amount` of the loan currency from `from` to `to`
    pub fn move_fungible(&mut self, from: &AccountId, to: &AccountId, amount: Amount) -> Result<Vec<Leg>> {
        self.settle(Settlement::new().fungible(from, to, amount))
    }

    /// move one collateral unit from `from` to `to`
    pub fn move_non_fungible(&mut self, from: &AccountId, to: &AccountId, asset: &CollateralRef) -> Result<Vec<Leg>> {
        self.settle(Settlement::new().collateral(from, to, asset))
    }

    /// verify every leg, then execute them; returns the legs in execution order.
    ///
    /// Legs sourced from the escrow run after all others. Zero-amount fungible
    /// legs are dropped.
    pub fn settle(&mut self, settlement: Settlement) -> Result<Vec<Leg>> {
        let (mut ordered, outbound): (Vec<Leg>, Vec<Leg>) = settlement
            .legs
            .into_iter()
            .filter(|leg| !matches!(leg, Leg::Fungible { amount, .. } if amount.is_zero()))
            .partition(|leg| leg.from() != &self.escrow);
        ordered.extend(outbound);

        let mut preflight = Preflight::new(&self.escrow, &self.fungible, &self.collateral);
        for leg in &ordered {
            preflight.apply(leg)?;
        }

        for leg in &ordered {
            self.execute(leg)?;
        }

        Ok(ordered)
    }

    fn execute(&mut self, leg: &Leg) -> std::result::Result<(), AssetError> {
        match leg {
            Leg::Fungible { from, to, amount } if from == &self.escrow => {
                self.fungible.transfer(from, to, *amount)
            }
            Leg::Fungible { from, to, amount } => {
                self.fungible.transfer_from(&self.escrow, from, to, *amount)
            }
            Leg::Collateral { from, to, asset } => {
                self.collateral.transfer_from(&self.escrow, from, to, asset)
            }
        }
    }
}
