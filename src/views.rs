/// serialization support for loans and the protocol as a whole
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::assets::{FungibleAsset, NonFungibleAsset};
use crate::decimal::{Amount, Rate};
use crate::errors::{LendingError, Result};
use crate::loan::Loan;
use crate::state_machine::LoanStateMachine;
use crate::types::{AccountId, CollateralRef, LoanId, LoanStatus};

/// serializable view of a single loan
#[derive(Debug, Serialize, Deserialize)]
pub struct LoanView {
    pub id: LoanId,
    pub status: LoanStatus,
    pub borrower: AccountId,
    pub lender: Option<AccountId>,
    pub collateral: CollateralRef,
    pub terms: TermsView,
    pub timeline: TimelineView,
    pub repayment: RepaymentView,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TermsView {
    pub principal: Amount,
    pub interest_rate: Rate,
    pub duration_secs: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TimelineView {
    pub created_at: DateTime<Utc>,
    pub funded_at: Option<DateTime<Utc>>,
    pub maturity: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
    pub closed_by: Option<AccountId>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RepaymentView {
    pub interest_due: Option<Amount>,
    pub amount_due: Option<Amount>,
    pub liquidatable: bool,
}

impl LoanView {
    pub fn from_loan(loan: &Loan, now: DateTime<Utc>) -> Self {
        LoanView {
            id: loan.id(),
            status: loan.status(),
            borrower: loan.borrower().clone(),
            lender: loan.lender().cloned(),
            collateral: loan.collateral().clone(),
            terms: TermsView {
                principal: loan.principal(),
                interest_rate: loan.interest_rate(),
                duration_secs: loan.terms().duration_secs,
            },
            timeline: TimelineView {
                created_at: loan.created_at(),
                funded_at: loan.funded_at(),
                maturity: loan.maturity(),
                closed_at: loan.closed_at(),
                closed_by: loan.closed_by().cloned(),
            },
            repayment: RepaymentView {
                interest_due: loan.interest_due(),
                amount_due: loan.amount_due(),
                liquidatable: loan.is_liquidatable(now),
            },
        }
    }

    /// convert to pretty-printed json string
    pub fn to_json_pretty(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// loan counts per status
#[derive(Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub listed: usize,
    pub active: usize,
    pub repaid: usize,
    pub cancelled: usize,
    pub liquidated: usize,
}

impl StatusCounts {
    fn record(&mut self, status: LoanStatus) {
        let slot = match status {
            LoanStatus::Listed => &mut self.listed,
            LoanStatus::Active => &mut self.active,
            LoanStatus::Repaid => &mut self.repaid,
            LoanStatus::Cancelled => &mut self.cancelled,
            LoanStatus::Liquidated => &mut self.liquidated,
        };
        *slot += 1;
    }
}

/// serializable view of every loan the protocol tracks
#[derive(Debug, Serialize, Deserialize)]
pub struct ProtocolView {
    pub escrow: AccountId,
    pub as_of: DateTime<Utc>,
    pub counts: StatusCounts,
    /// principal currently lent out on active loans
    pub principal_outstanding: Amount,
    pub loans: Vec<LoanView>,
}

impl ProtocolView {
    pub fn from_machine<F: FungibleAsset, N: NonFungibleAsset>(
        machine: &LoanStateMachine<F, N>,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        let mut counts = StatusCounts::default();
        let mut principal_outstanding = Amount::ZERO;
        let mut loans = Vec::with_capacity(machine.ledger().len());

        for loan in machine.ledger().loans() {
            counts.record(loan.status());
            if loan.status() == LoanStatus::Active {
                principal_outstanding = principal_outstanding
                    .checked_add(loan.principal())
                    .ok_or_else(|| LendingError::overflow("outstanding principal"))?;
            }
            loans.push(LoanView::from_loan(loan, now));
        }

        Ok(ProtocolView {
            escrow: machine.custody().escrow().clone(),
            as_of: now,
            counts,
            principal_outstanding,
            loans,
        })
    }

    /// convert to pretty-printed json string
    pub fn to_json_pretty(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
