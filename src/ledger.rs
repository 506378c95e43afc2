use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{LendingError, Result};
use crate::loan::{Loan, LoanTerms};
use crate::types::{AccountId, LoanId, LoanStatus};

/// copy of a loan captured at a committed change, for audit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanSnapshot {
    pub snapshot_id: Uuid,
    pub loan_id: LoanId,
    pub timestamp: DateTime<Utc>,
    pub loan: Loan,
    pub trigger: String,
}

impl LoanSnapshot {
    pub fn capture(loan: &Loan, timestamp: DateTime<Utc>, trigger: String) -> Self {
        Self {
            snapshot_id: Uuid::new_v4(),
            loan_id: loan.id(),
            timestamp,
            loan: loan.clone(),
            trigger,
        }
    }
}

/// authoritative store of loans.
///
/// Loans are only inserted by `create_with` and only changed by `transition`;
/// both stage the work on a copy and commit only when every step succeeded.
#[derive(Debug)]
pub struct LoanLedger {
    loans: BTreeMap<LoanId, Loan>,
    next_id: LoanId,
    snapshots: Vec<LoanSnapshot>,
}

impl Default for LoanLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl LoanLedger {
    pub fn new() -> Self {
        Self {
            loans: BTreeMap::new(),
            next_id: LoanId::FIRST,
            snapshots: Vec::new(),
        }
    }

    /// store a new listed loan
    pub fn create(&mut self, borrower: AccountId, terms: LoanTerms, now: DateTime<Utc>) -> Result<LoanId> {
        self.create_with(borrower, terms, now, |_| Ok(()))
            .map(|(id, ())| id)
    }

    /// store a new listed loan once `escrow` succeeds for it; nothing is stored otherwise
    pub fn create_with<T>(
        &mut self,
        borrower: AccountId,
        terms: LoanTerms,
        now: DateTime<Utc>,
        escrow: impl FnOnce(&Loan) -> Result<T>,
    ) -> Result<(LoanId, T)> {
        let id = self.next_id;
        let following = id
            .next()
            .ok_or_else(|| LendingError::overflow("loan identifier space exhausted"))?;

        let loan = Loan::list(id, borrower, terms, now);
        let out = escrow(&loan)?;

        self.snapshots
            .push(LoanSnapshot::capture(&loan, now, "listed".to_string()));
        self.loans.insert(id, loan);
        self.next_id = following;

        Ok((id, out))
    }

    pub fn get(&self, id: LoanId) -> Result<&Loan> {
        self.loans
            .get(&id)
            .ok_or(LendingError::LoanNotFound { loan_id: id })
    }

    /// apply `mutator` to a loan in the `expected` status.
    ///
    /// The mutator works on a staged copy. The copy is committed only if the
    /// mutator succeeds, moves the loan along a legal edge, and leaves the
    /// immutable fields alone.
    pub fn transition<T>(
        &mut self,
        id: LoanId,
        expected: LoanStatus,
        mutator: impl FnOnce(&mut Loan) -> Result<T>,
    ) -> Result<T> {
        let current = self.get(id)?;
        if current.status() != expected {
            return Err(LendingError::InvalidState {
                loan_id: id,
                current: current.status(),
                expected,
            });
        }

        let mut staged = current.clone();
        let out = mutator(&mut staged)?;
        Self::check_edge(current, &staged)?;

        let timestamp = staged
            .closed_at()
            .or(staged.funded_at())
            .unwrap_or(staged.created_at());
        self.snapshots.push(LoanSnapshot::capture(
            &staged,
            timestamp,
            format!("{} -> {}", expected, staged.status()),
        ));
        self.loans.insert(id, staged);

        Ok(out)
    }

    fn check_edge(before: &Loan, after: &Loan) -> Result<()> {
        let legal = before.status().can_transition_to(after.status())
            && before.id() == after.id()
            && before.borrower() == after.borrower()
            && before.terms() == after.terms()
            && before.created_at() == after.created_at()
            && (before.lender().is_none() || before.lender() == after.lender())
            && (before.funded_at().is_none() || before.funded_at() == after.funded_at())
            && (after.status() != LoanStatus::Active
                || (after.lender().is_some() && after.funded_at().is_some()));

        if legal {
            Ok(())
        } else {
            Err(LendingError::InvalidState {
                loan_id: before.id(),
                current: after.status(),
                expected: before.status(),
            })
        }
    }

    pub fn contains(&self, id: LoanId) -> bool {
        self.loans.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.loans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loans.is_empty()
    }

    /// identifier the next listing will receive
    pub fn next_id(&self) -> LoanId {
        self.next_id
    }

    /// all loans in identifier order
    pub fn loans(&self) -> impl Iterator<Item = &Loan> {
        self.loans.values()
    }

    pub fn loans_by_borrower<'a>(&'a self, borrower: &'a AccountId) -> impl Iterator<Item = &'a Loan> + 'a {
        self.loans.values().filter(move |l| l.borrower() == borrower)
    }

    pub fn loans_by_lender<'a>(&'a self, lender: &'a AccountId) -> impl Iterator<Item = &'a Loan> + 'a {
        self.loans.values().filter(move |l| l.lender() == Some(lender))
    }

    pub fn loans_with_status(&self, status: LoanStatus) -> impl Iterator<Item = &Loan> {
        self.loans.values().filter(move |l| l.status() == status)
    }

    pub fn snapshots(&self) -> &[LoanSnapshot] {
        &self.snapshots
    }

    pub fn snapshots_for(&self, id: LoanId) -> impl Iterator<Item = &LoanSnapshot> {
        self.snapshots.iter().filter(move |s| s.loan_id == id)
    }
}
