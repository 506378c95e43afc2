use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::{Amount, Rate};
use crate::types::{AccountId, CollateralRef, LoanId, LoanStatus};

/// terms a borrower lists a loan with
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanTerms {
    pub collateral: CollateralRef,
    pub principal: Amount,
    pub interest_rate: Rate,
    pub duration_secs: i64,
}

impl LoanTerms {
    /// `duration` is kept in whole seconds; listings with a fractional second are refused
    pub fn new(collateral: CollateralRef, principal: Amount, interest_rate: Rate, duration: Duration) -> Self {
        Self {
            collateral,
            principal,
            interest_rate,
            duration_secs: duration.num_seconds(),
        }
    }

    pub fn duration(&self) -> Duration {
        Duration::seconds(self.duration_secs)
    }
}

/// a loan record.
///
/// Only constructible in the `Listed` status. The status-changing methods are
/// crate-private and are only invoked on the staged copy inside
/// `LoanLedger::transition`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Loan {
    id: LoanId,
    borrower: AccountId,
    terms: LoanTerms,
    lender: Option<AccountId>,
    created_at: DateTime<Utc>,
    funded_at: Option<DateTime<Utc>>,
    interest_due: Option<Amount>,
    closed_at: Option<DateTime<Utc>>,
    closed_by: Option<AccountId>,
    status: LoanStatus,
}

impl Loan {
    pub(crate) fn list(id: LoanId, borrower: AccountId, terms: LoanTerms, now: DateTime<Utc>) -> Self {
        Self {
            id,
            borrower,
            terms,
            lender: None,
            created_at: now,
            funded_at: None,
            interest_due: None,
            closed_at: None,
            closed_by: None,
            status: LoanStatus::Listed,
        }
    }

    pub fn id(&self) -> LoanId {
        self.id
    }

    pub fn borrower(&self) -> &AccountId {
        &self.borrower
    }

    pub fn lender(&self) -> Option<&AccountId> {
        self.lender.as_ref()
    }

    pub fn terms(&self) -> &LoanTerms {
        &self.terms
    }

    pub fn collateral(&self) -> &CollateralRef {
        &self.terms.collateral
    }

    pub fn principal(&self) -> Amount {
        self.terms.principal
    }

    pub fn interest_rate(&self) -> Rate {
        self.terms.interest_rate
    }

    pub fn duration(&self) -> Duration {
        self.terms.duration()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn funded_at(&self) -> Option<DateTime<Utc>> {
        self.funded_at
    }

    /// interest frozen at funding
    pub fn interest_due(&self) -> Option<Amount> {
        self.interest_due
    }

    pub fn closed_at(&self) -> Option<DateTime<Utc>> {
        self.closed_at
    }

    /// repayer, liquidator, or cancelling borrower
    pub fn closed_by(&self) -> Option<&AccountId> {
        self.closed_by.as_ref()
    }

    pub fn status(&self) -> LoanStatus {
        self.status
    }

    /// end of the agreed term; set once funded
    pub fn maturity(&self) -> Option<DateTime<Utc>> {
        self.funded_at
            .and_then(|at| at.checked_add_signed(self.duration()))
    }

    /// principal plus frozen interest; set once funded
    pub fn amount_due(&self) -> Option<Amount> {
        self.interest_due
            .and_then(|interest| self.terms.principal.checked_add(interest))
    }

    /// active and past maturity
    pub fn is_liquidatable(&self, now: DateTime<Utc>) -> bool {
        self.status == LoanStatus::Active
            && self.maturity().map(|m| now >= m).unwrap_or(false)
    }

    pub(crate) fn activate(&mut self, lender: AccountId, now: DateTime<Utc>, interest_due: Amount) {
        self.lender = Some(lender);
        self.funded_at = Some(now);
        self.interest_due = Some(interest_due);
        self.status = LoanStatus::Active;
    }

    pub(crate) fn cancel(&mut self, now: DateTime<Utc>) {
        self.closed_at = Some(now);
        self.closed_by = Some(self.borrower.clone());
        self.status = LoanStatus::Cancelled;
    }

    pub(crate) fn repay(&mut self, payer: AccountId, now: DateTime<Utc>) {
        self.closed_at = Some(now);
        self.closed_by = Some(payer);
        self.status = LoanStatus::Repaid;
    }

    pub(crate) fn liquidate(&mut self, liquidator: AccountId, now: DateTime<Utc>) {
        self.closed_at = Some(now);
        self.closed_by = Some(liquidator);
        self.status = LoanStatus::Liquidated;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn listed() -> Loan {
        let terms = LoanTerms::new(
            CollateralRef::new("punks", 1),
            Amount::new(100),
            Rate::from_percentage(20),
            Duration::days(10),
        );
        Loan::list(
            LoanId::FIRST,
            AccountId::new("alice"),
            terms,
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        )
    }

    #[test]
    fn test_new_loan_is_listed_without_lender() {
        let loan = listed();
        assert_eq!(loan.status(), LoanStatus::Listed);
        assert!(loan.lender().is_none());
        assert!(loan.funded_at().is_none());
        assert!(loan.maturity().is_none());
        assert!(loan.amount_due().is_none());
    }

    #[test]
    fn test_activation_fixes_maturity_and_amount_due() {
        let mut loan = listed();
        let funded = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        loan.activate(AccountId::new("bob"), funded, Amount::new(20));

        assert_eq!(loan.status(), LoanStatus::Active);
        assert_eq!(loan.lender(), Some(&AccountId::new("bob")));
        assert_eq!(loan.maturity(), Some(Utc.with_ymd_and_hms(2024, 1, 12, 0, 0, 0).unwrap()));
        assert_eq!(loan.amount_due(), Some(Amount::new(120)));

        assert!(!loan.is_liquidatable(Utc.with_ymd_and_hms(2024, 1, 11, 23, 59, 59).unwrap()));
        assert!(loan.is_liquidatable(Utc.with_ymd_and_hms(2024, 1, 12, 0, 0, 0).unwrap()));
    }
}
