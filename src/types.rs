use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// unique identifier for a loan, assigned in increasing order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LoanId(u64);

impl LoanId {
    pub const FIRST: LoanId = LoanId(1);

    pub const fn new(id: u64) -> Self {
        LoanId(id)
    }

    pub const fn value(&self) -> u64 {
        self.0
    }

    /// following identifier, if the counter has room
    pub fn next(&self) -> Option<LoanId> {
        self.0.checked_add(1).map(LoanId)
    }
}

impl fmt::Display for LoanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "loan-{}", self.0)
    }
}

/// identity of a participant (borrower, lender, liquidator, or the escrow itself)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    pub fn new(id: impl Into<String>) -> Self {
        AccountId(id.into())
    }

    /// fresh escrow identity
    pub fn escrow() -> Self {
        AccountId(format!("escrow-{}", &Uuid::new_v4().to_string()[..8]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AccountId {
    fn from(s: &str) -> Self {
        AccountId::new(s)
    }
}

impl From<String> for AccountId {
    fn from(s: String) -> Self {
        AccountId(s)
    }
}

/// identifier of a non-fungible collection (the asset contract)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CollectionId(String);

impl CollectionId {
    pub fn new(id: impl Into<String>) -> Self {
        CollectionId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CollectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CollectionId {
    fn from(s: &str) -> Self {
        CollectionId::new(s)
    }
}

/// identifier of a single unit within a collection
pub type TokenId = u64;

/// a specific collateral unit: collection plus token id
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CollateralRef {
    pub collection: CollectionId,
    pub token_id: TokenId,
}

impl CollateralRef {
    pub fn new(collection: impl Into<CollectionId>, token_id: TokenId) -> Self {
        Self {
            collection: collection.into(),
            token_id,
        }
    }
}

impl fmt::Display for CollateralRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.collection, self.token_id)
    }
}

/// loan status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LoanStatus {
    /// collateral escrowed, waiting for a lender
    Listed,
    /// principal delivered to the borrower, term running
    Active,
    /// principal and interest paid, collateral returned
    Repaid,
    /// withdrawn by the borrower before funding
    Cancelled,
    /// term elapsed unpaid, collateral claimed
    Liquidated,
}

impl LoanStatus {
    /// no transition leaves a terminal status
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            LoanStatus::Repaid | LoanStatus::Cancelled | LoanStatus::Liquidated
        )
    }

    /// collateral sits with the escrow in these statuses
    pub fn holds_collateral(&self) -> bool {
        matches!(self, LoanStatus::Listed | LoanStatus::Active)
    }

    /// the one-way transition table
    pub fn can_transition_to(&self, next: LoanStatus) -> bool {
        matches!(
            (self, next),
            (LoanStatus::Listed, LoanStatus::Active)
                | (LoanStatus::Listed, LoanStatus::Cancelled)
                | (LoanStatus::Active, LoanStatus::Repaid)
                | (LoanStatus::Active, LoanStatus::Liquidated)
        )
    }
}

impl fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LoanStatus::Listed => "Listed",
            LoanStatus::Active => "Active",
            LoanStatus::Repaid => "Repaid",
            LoanStatus::Cancelled => "Cancelled",
            LoanStatus::Liquidated => "Liquidated",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_table() {
        use LoanStatus::*;
        let all = [Listed, Active, Repaid, Cancelled, Liquidated];

        let allowed: Vec<(LoanStatus, LoanStatus)> = all
            .iter()
            .flat_map(|from| all.iter().map(move |to| (*from, *to)))
            .filter(|(from, to)| from.can_transition_to(*to))
            .collect();

        assert_eq!(
            allowed,
            vec![(Listed, Active), (Listed, Cancelled), (Active, Repaid), (Active, Liquidated)]
        );

        for status in all.iter().filter(|s| s.is_terminal()) {
            assert!(all.iter().all(|to| !status.can_transition_to(*to)));
        }
    }

    #[test]
    fn test_loan_id_sequence() {
        assert_eq!(LoanId::FIRST.next(), Some(LoanId::new(2)));
        assert_eq!(LoanId::new(u64::MAX).next(), None);
        assert_eq!(LoanId::new(7).to_string(), "loan-7");
    }

    #[test]
    fn test_escrow_ids_are_distinct() {
        assert_ne!(AccountId::escrow(), AccountId::escrow());
        assert!(AccountId::escrow().as_str().starts_with("escrow-"));
    }
}
