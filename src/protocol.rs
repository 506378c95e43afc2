use chrono::{DateTime, Duration, Utc};
use hourglass_rs::SafeTimeProvider;

use crate::assets::{FungibleAsset, NonFungibleAsset};
use crate::config::ProtocolConfig;
use crate::custody::AssetCustody;
use crate::decimal::{Amount, Rate};
use crate::errors::Result;
use crate::events::Event;
use crate::interest::InterestQuote;
use crate::ledger::{LoanLedger, LoanSnapshot};
use crate::loan::Loan;
use crate::state_machine::LoanStateMachine;
use crate::types::{AccountId, CollateralRef, LoanId, LoanStatus};
use crate::views::{LoanView, ProtocolView};

/// public entry point of the lending core.
///
/// Every operation names its caller explicitly and reads `now` from the
/// borrowed time provider. State-changing operations take `&mut self`, so at
/// most one runs at a time. Assets are only reachable read-only once the
/// protocol holds them; balances and approvals are set up before `new`.
pub struct LendingProtocol<'t, F, N> {
    machine: LoanStateMachine<F, N>,
    time: &'t SafeTimeProvider,
}

impl<'t, F: FungibleAsset, N: NonFungibleAsset> LendingProtocol<'t, F, N> {
    /// create a protocol over the given assets; the escrow comes from the config or is generated
    pub fn new(config: ProtocolConfig, fungible: F, collateral: N, time: &'t SafeTimeProvider) -> Result<Self> {
        config.validate()?;
        let escrow = config
            .escrow_account
            .clone()
            .unwrap_or_else(AccountId::escrow);
        let custody = AssetCustody::new(escrow, fungible, collateral);

        Ok(Self {
            machine: LoanStateMachine::new(config, custody)?,
            time,
        })
    }

    pub fn create_loan(
        &mut self,
        caller: &AccountId,
        collateral: CollateralRef,
        principal: Amount,
        interest_rate: Rate,
        duration: Duration,
    ) -> Result<LoanId> {
        self.machine
            .create_loan(caller, collateral, principal, interest_rate, duration, self.time)
    }

    pub fn cancel_loan(&mut self, caller: &AccountId, loan_id: LoanId) -> Result<()> {
        self.machine.cancel_loan(caller, loan_id, self.time)
    }

    pub fn fund_loan(&mut self, caller: &AccountId, loan_id: LoanId, amount: Amount) -> Result<InterestQuote> {
        self.machine.fund_loan(caller, loan_id, amount, self.time)
    }

    /// returns the amount paid to the lender
    pub fn repay_loan(&mut self, caller: &AccountId, loan_id: LoanId) -> Result<Amount> {
        self.machine.repay_loan(caller, loan_id, self.time)
    }

    pub fn liquidate_loan(&mut self, caller: &AccountId, loan_id: LoanId) -> Result<()> {
        self.machine.liquidate_loan(caller, loan_id, self.time)
    }

    pub fn loan(&self, loan_id: LoanId) -> Result<&Loan> {
        self.machine.ledger().get(loan_id)
    }

    pub fn loans(&self) -> impl Iterator<Item = &Loan> {
        self.machine.ledger().loans()
    }

    pub fn loans_with_status(&self, status: LoanStatus) -> impl Iterator<Item = &Loan> {
        self.machine.ledger().loans_with_status(status)
    }

    pub fn ledger(&self) -> &LoanLedger {
        self.machine.ledger()
    }

    pub fn history(&self, loan_id: LoanId) -> Vec<&LoanSnapshot> {
        self.machine.ledger().snapshots_for(loan_id).collect()
    }

    pub fn amount_due(&self, loan_id: LoanId) -> Result<Amount> {
        self.machine.amount_due(loan_id)
    }

    pub fn maturity(&self, loan_id: LoanId) -> Result<Option<DateTime<Utc>>> {
        self.machine.maturity(loan_id)
    }

    pub fn is_liquidatable(&self, loan_id: LoanId) -> Result<bool> {
        self.machine.is_liquidatable(loan_id, self.time.now())
    }

    pub fn loan_view(&self, loan_id: LoanId) -> Result<LoanView> {
        Ok(LoanView::from_loan(self.loan(loan_id)?, self.time.now()))
    }

    pub fn view(&self) -> Result<ProtocolView> {
        ProtocolView::from_machine(&self.machine, self.time.now())
    }

    /// drain events emitted since the last call
    pub fn take_events(&mut self) -> Vec<Event> {
        self.machine.take_events()
    }

    pub fn events(&self) -> &[Event] {
        self.machine.events().events()
    }

    pub fn config(&self) -> &ProtocolConfig {
        self.machine.config()
    }

    pub fn escrow(&self) -> &AccountId {
        self.machine.custody().escrow()
    }

    pub fn custody(&self) -> &AssetCustody<F, N> {
        self.machine.custody()
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.time.now()
    }
}
