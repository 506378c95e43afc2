use chrono::{DateTime, Duration, Utc};
use hourglass_rs::SafeTimeProvider;

use crate::assets::{FungibleAsset, NonFungibleAsset};
use crate::config::ProtocolConfig;
use crate::custody::{AssetCustody, Leg, Settlement};
use crate::decimal::{Amount, Rate};
use crate::errors::{LendingError, Result};
use crate::events::{Event, EventStore};
use crate::interest::{InterestCalculator, InterestEngine, InterestQuote};
use crate::ledger::LoanLedger;
use crate::loan::{Loan, LoanTerms};
use crate::types::{AccountId, CollateralRef, LoanId, LoanStatus};

/// drives loans through Listed -> Active -> Repaid / Liquidated, or Listed -> Cancelled.
///
/// Each operation runs inside `LoanLedger::transition`: asset legs settle on
/// the staged loan, so a rejected transfer leaves both the ledger and the
/// balances untouched. Events are emitted only after the ledger commits.
#[derive(Debug)]
pub struct LoanStateMachine<F, N> {
    config: ProtocolConfig,
    engine: InterestEngine,
    ledger: LoanLedger,
    custody: AssetCustody<F, N>,
    events: EventStore,
}

impl<F: FungibleAsset, N: NonFungibleAsset> LoanStateMachine<F, N> {
    pub fn new(config: ProtocolConfig, custody: AssetCustody<F, N>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            engine: InterestEngine::new(config.interest_basis),
            config,
            ledger: LoanLedger::new(),
            custody,
            events: EventStore::new(),
        })
    }

    /// list a loan; the caller becomes the borrower and the collateral moves into escrow
    pub fn create_loan(
        &mut self,
        caller: &AccountId,
        collateral: CollateralRef,
        principal: Amount,
        interest_rate: Rate,
        duration: Duration,
        time_provider: &SafeTimeProvider,
    ) -> Result<LoanId> {
        self.reject_escrow(caller)?;
        self.validate_terms(principal, interest_rate, duration)?;

        let now = time_provider.now();
        let terms = LoanTerms::new(collateral, principal, interest_rate, duration);
        let escrow = self.custody.escrow().clone();
        let custody = &mut self.custody;

        let (loan_id, legs) = self.ledger.create_with(caller.clone(), terms, now, |loan| {
            custody.move_non_fungible(caller, &escrow, loan.collateral())
        })?;

        let loan = self.ledger.get(loan_id)?;
        self.events.emit(Event::LoanListed {
            loan_id,
            borrower: loan.borrower().clone(),
            collateral: loan.collateral().clone(),
            principal: loan.principal(),
            interest_rate: loan.interest_rate(),
            duration_secs: loan.terms().duration_secs,
            timestamp: now,
        });
        self.emit_legs(loan_id, &legs, now);

        Ok(loan_id)
    }

    /// withdraw an unfunded listing and hand the collateral back to the borrower
    pub fn cancel_loan(&mut self, caller: &AccountId, loan_id: LoanId, time_provider: &SafeTimeProvider) -> Result<()> {
        self.reject_escrow(caller)?;
        let now = time_provider.now();
        let escrow = self.custody.escrow().clone();
        let custody = &mut self.custody;

        let legs = self.ledger.transition(loan_id, LoanStatus::Listed, |loan| {
            if loan.borrower() != caller {
                return Err(LendingError::Unauthorized {
                    caller: caller.clone(),
                    required: format!("borrower of {}", loan_id),
                });
            }

            let borrower = loan.borrower().clone();
            let collateral = loan.collateral().clone();
            loan.cancel(now);
            custody.move_non_fungible(&escrow, &borrower, &collateral)
        })?;

        self.events.emit(Event::LoanCancelled {
            loan_id,
            borrower: caller.clone(),
            timestamp: now,
        });
        self.emit_transition(loan_id, LoanStatus::Listed, LoanStatus::Cancelled, &legs, now);

        Ok(())
    }

    /// deliver exactly the principal to the borrower; the caller becomes the lender
    pub fn fund_loan(
        &mut self,
        caller: &AccountId,
        loan_id: LoanId,
        amount: Amount,
        time_provider: &SafeTimeProvider,
    ) -> Result<InterestQuote> {
        self.reject_escrow(caller)?;
        let now = time_provider.now();
        let engine = self.engine;
        let allow_self_funding = self.config.allow_self_funding;
        let custody = &mut self.custody;

        let (legs, quote, maturity) = self.ledger.transition(loan_id, LoanStatus::Listed, |loan| {
            if amount != loan.principal() {
                return Err(LendingError::InvalidAmount {
                    expected: loan.principal(),
                    provided: amount,
                });
            }
            if !allow_self_funding && loan.borrower() == caller {
                return Err(LendingError::Unauthorized {
                    caller: caller.clone(),
                    required: "lender; borrowers may not fund their own loans".to_string(),
                });
            }

            let quote = engine.quote(loan.principal(), loan.interest_rate(), loan.duration())?;
            let maturity = now
                .checked_add_signed(loan.duration())
                .ok_or_else(|| LendingError::overflow("maturity date"))?;

            let borrower = loan.borrower().clone();
            loan.activate(caller.clone(), now, quote.interest);
            let legs = custody.move_fungible(caller, &borrower, amount)?;

            Ok((legs, quote, maturity))
        })?;

        self.events.emit(Event::LoanFunded {
            loan_id,
            lender: caller.clone(),
            principal: quote.principal,
            interest_due: quote.interest,
            maturity,
            timestamp: now,
        });
        self.emit_transition(loan_id, LoanStatus::Listed, LoanStatus::Active, &legs, now);

        Ok(quote)
    }

    /// pay principal plus interest to the lender; collateral goes back to the borrower.
    /// Anyone may repay.
    pub fn repay_loan(&mut self, caller: &AccountId, loan_id: LoanId, time_provider: &SafeTimeProvider) -> Result<Amount> {
        self.reject_escrow(caller)?;
        let now = time_provider.now();
        let escrow = self.custody.escrow().clone();
        let custody = &mut self.custody;

        let (legs, owed, lender) = self.ledger.transition(loan_id, LoanStatus::Active, |loan| {
            let owed = loan
                .amount_due()
                .ok_or_else(|| LendingError::overflow("principal + interest"))?;
            let lender = lender_of(loan)?;

            // collateral always returns to the borrower, whoever pays
            let settlement = Settlement::new()
                .fungible(caller, &lender, owed)
                .collateral(&escrow, loan.borrower(), loan.collateral());

            loan.repay(caller.clone(), now);
            let legs = custody.settle(settlement)?;

            Ok((legs, owed, lender))
        })?;

        self.events.emit(Event::LoanRepaid {
            loan_id,
            payer: caller.clone(),
            lender,
            amount: owed,
            timestamp: now,
        });
        self.emit_transition(loan_id, LoanStatus::Active, LoanStatus::Repaid, &legs, now);

        Ok(owed)
    }

    /// claim the collateral of an overdue loan; the caller receives it
    pub fn liquidate_loan(&mut self, caller: &AccountId, loan_id: LoanId, time_provider: &SafeTimeProvider) -> Result<()> {
        self.reject_escrow(caller)?;
        let now = time_provider.now();
        let escrow = self.custody.escrow().clone();
        let custody = &mut self.custody;

        let (legs, overdue_secs, lender) = self.ledger.transition(loan_id, LoanStatus::Active, |loan| {
            let maturity = loan
                .maturity()
                .ok_or_else(|| LendingError::overflow("maturity date"))?;
            if now < maturity {
                return Err(LendingError::TooEarly {
                    loan_id,
                    eligible_at: maturity,
                    now,
                });
            }
            let lender = lender_of(loan)?;

            let collateral = loan.collateral().clone();
            loan.liquidate(caller.clone(), now);
            let legs = custody.move_non_fungible(&escrow, caller, &collateral)?;

            Ok((legs, (now - maturity).num_seconds(), lender))
        })?;

        self.events.emit(Event::LoanLiquidated {
            loan_id,
            liquidator: caller.clone(),
            lender,
            overdue_secs,
            timestamp: now,
        });
        self.emit_transition(loan_id, LoanStatus::Active, LoanStatus::Liquidated, &legs, now);

        Ok(())
    }

    /// principal plus interest: frozen for an active loan, quoted for a listed one
    pub fn amount_due(&self, loan_id: LoanId) -> Result<Amount> {
        let loan = self.ledger.get(loan_id)?;
        match loan.status() {
            LoanStatus::Active => loan
                .amount_due()
                .ok_or_else(|| LendingError::overflow("principal + interest")),
            LoanStatus::Listed => self
                .engine
                .quote(loan.principal(), loan.interest_rate(), loan.duration())
                .map(|quote| quote.total_due),
            current => Err(LendingError::InvalidState {
                loan_id,
                current,
                expected: LoanStatus::Active,
            }),
        }
    }

    /// end of the term; `None` until funded
    pub fn maturity(&self, loan_id: LoanId) -> Result<Option<DateTime<Utc>>> {
        Ok(self.ledger.get(loan_id)?.maturity())
    }

    pub fn is_liquidatable(&self, loan_id: LoanId, now: DateTime<Utc>) -> Result<bool> {
        Ok(self.ledger.get(loan_id)?.is_liquidatable(now))
    }

    pub fn config(&self) -> &ProtocolConfig {
        &self.config
    }

    pub fn engine(&self) -> &InterestEngine {
        &self.engine
    }

    pub fn ledger(&self) -> &LoanLedger {
        &self.ledger
    }

    pub fn custody(&self) -> &AssetCustody<F, N> {
        &self.custody
    }

    pub fn events(&self) -> &EventStore {
        &self.events
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        self.events.take_events()
    }

    /// the escrow only ever acts through settlement, never as a participant
    fn reject_escrow(&self, caller: &AccountId) -> Result<()> {
        if caller == self.custody.escrow() {
            return Err(LendingError::Unauthorized {
                caller: caller.clone(),
                required: "participant other than the escrow".to_string(),
            });
        }
        Ok(())
    }

    fn validate_terms(&self, principal: Amount, interest_rate: Rate, duration: Duration) -> Result<()> {
        let limits = &self.config.limits;

        if principal.is_zero() {
            return Err(LendingError::invalid_parameters("principal must be positive"));
        }
        if duration.num_seconds() <= 0 {
            return Err(LendingError::invalid_parameters("duration must be at least one second"));
        }
        if duration != Duration::seconds(duration.num_seconds()) {
            return Err(LendingError::invalid_parameters(format!(
                "duration {} is not a whole number of seconds",
                duration
            )));
        }
        if interest_rate.is_negative() {
            return Err(LendingError::invalid_parameters(format!(
                "interest rate {} is negative",
                interest_rate
            )));
        }

        if principal < limits.min_principal {
            return Err(LendingError::invalid_parameters(format!(
                "principal {} below minimum {}",
                principal, limits.min_principal
            )));
        }
        if let Some(max) = limits.max_principal {
            if principal > max {
                return Err(LendingError::invalid_parameters(format!(
                    "principal {} above maximum {}",
                    principal, max
                )));
            }
        }
        if duration.num_seconds() < limits.min_duration_secs {
            return Err(LendingError::invalid_parameters(format!(
                "duration {}s below minimum {}s",
                duration.num_seconds(),
                limits.min_duration_secs
            )));
        }
        if let Some(max) = limits.max_duration_secs {
            if duration.num_seconds() > max {
                return Err(LendingError::invalid_parameters(format!(
                    "duration {}s above maximum {}s",
                    duration.num_seconds(),
                    max
                )));
            }
        }
        if let Some(max) = limits.max_interest_rate {
            if interest_rate > max {
                return Err(LendingError::invalid_parameters(format!(
                    "interest rate {} above maximum {}",
                    interest_rate, max
                )));
            }
        }

        Ok(())
    }

    fn emit_transition(
        &mut self,
        loan_id: LoanId,
        old_status: LoanStatus,
        new_status: LoanStatus,
        legs: &[Leg],
        now: DateTime<Utc>,
    ) {
        self.emit_legs(loan_id, legs, now);
        self.events.emit(Event::StatusChanged {
            loan_id,
            old_status,
            new_status,
            timestamp: now,
        });
    }

    fn emit_legs(&mut self, loan_id: LoanId, legs: &[Leg], now: DateTime<Utc>) {
        let escrow = self.custody.escrow();
        let events = legs.iter().map(|leg| match leg {
            Leg::Fungible { from, to, amount } => Event::FundsTransferred {
                loan_id,
                from: from.clone(),
                to: to.clone(),
                amount: *amount,
                timestamp: now,
            },
            Leg::Collateral { from, asset, .. } if from == escrow => Event::CollateralReleased {
                loan_id,
                collateral: asset.clone(),
                to: leg.to().clone(),
                timestamp: now,
            },
            Leg::Collateral { from, asset, .. } => Event::CollateralEscrowed {
                loan_id,
                collateral: asset.clone(),
                from: from.clone(),
                timestamp: now,
            },
        });
        self.events.extend(events.collect::<Vec<_>>());
    }
}

fn lender_of(loan: &Loan) -> Result<AccountId> {
    loan.lender().cloned().ok_or(LendingError::InvalidState {
        loan_id: loan.id(),
        current: loan.status(),
        expected: LoanStatus::Active,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::{InMemoryCollection, InMemoryToken};
    use crate::errors::AssetError;
    use chrono::TimeZone;
    use hourglass_rs::TimeSource;

    type Machine = LoanStateMachine<InMemoryToken, InMemoryCollection>;

    fn alice() -> AccountId {
        AccountId::new("alice")
    }

    fn bob() -> AccountId {
        AccountId::new("bob")
    }

    fn carol() -> AccountId {
        AccountId::new("carol")
    }

    fn punk() -> CollateralRef {
        CollateralRef::new("punks", 1)
    }

    fn machine(config: ProtocolConfig) -> Machine {
        let escrow = AccountId::new("escrow");
        let mut token = InMemoryToken::new("USDC");
        token.mint(&bob(), Amount::new(1_000)).unwrap();
        token.mint(&alice(), Amount::new(1_000)).unwrap();
        token.mint(&carol(), Amount::new(500)).unwrap();
        token.approve(&bob(), &escrow, Amount::new(1_000)).unwrap();
        token.approve(&alice(), &escrow, Amount::new(1_000)).unwrap();

        let mut nfts = InMemoryCollection::new();
        nfts.mint(punk(), &alice()).unwrap();
        nfts.approve(&alice(), &escrow, &punk()).unwrap();

        LoanStateMachine::new(config, AssetCustody::new(escrow, token, nfts)).unwrap()
    }

    fn clock() -> SafeTimeProvider {
        SafeTimeProvider::new(TimeSource::Test(
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        ))
    }

    #[test]
    fn test_parameter_validation_precedes_custody() {
        let time = clock();
        let mut sm = machine(ProtocolConfig::default());

        let cases = [
            (Amount::ZERO, Rate::ZERO, Duration::days(1)),
            (Amount::new(100), Rate::ZERO, Duration::zero()),
            (Amount::new(100), Rate::from_decimal(rust_decimal_macros::dec!(-0.01)), Duration::days(1)),
            (Amount::new(100), Rate::ZERO, Duration::milliseconds(1_500)),
        ];
        for (principal, rate, duration) in cases {
            let err = sm
                .create_loan(&alice(), punk(), principal, rate, duration, &time)
                .unwrap_err();
            assert!(matches!(err, LendingError::InvalidParameters { .. }));
        }

        assert!(sm.ledger().is_empty());
        assert_eq!(sm.custody().collateral().owner_of(&punk()).unwrap(), alice());
        assert!(sm.events().events().is_empty());
    }

    #[test]
    fn test_configured_limits_apply() {
        let time = clock();
        let mut sm = machine(ProtocolConfig::conservative());

        let err = sm
            .create_loan(&alice(), punk(), Amount::new(100), Rate::ZERO, Duration::minutes(5), &time)
            .unwrap_err();
        assert!(matches!(err, LendingError::InvalidParameters { .. }));

        let err = sm
            .create_loan(&alice(), punk(), Amount::new(100), Rate::from_percentage(150), Duration::days(1), &time)
            .unwrap_err();
        assert!(matches!(err, LendingError::InvalidParameters { .. }));
    }

    #[test]
    fn test_self_funding_guard() {
        let time = clock();
        let mut sm = machine(ProtocolConfig::conservative());
        let id = sm
            .create_loan(&alice(), punk(), Amount::new(100), Rate::ZERO, Duration::days(10), &time)
            .unwrap();

        let err = sm.fund_loan(&alice(), id, Amount::new(100), &time).unwrap_err();
        assert!(matches!(err, LendingError::Unauthorized { .. }));
        assert_eq!(sm.ledger().get(id).unwrap().status(), LoanStatus::Listed);

        // the default configuration lets a borrower fund their own listing
        let mut sm = machine(ProtocolConfig::default());
        let id = sm
            .create_loan(&alice(), punk(), Amount::new(100), Rate::ZERO, Duration::days(10), &time)
            .unwrap();
        sm.fund_loan(&alice(), id, Amount::new(100), &time).unwrap();
        assert_eq!(sm.custody().fungible().balance_of(&alice()), Amount::new(1_000));
    }

    #[test]
    fn test_rejected_transfer_rolls_back_funding() {
        let time = clock();
        let mut sm = machine(ProtocolConfig::default());
        let carol = carol();
        let id = sm
            .create_loan(&alice(), punk(), Amount::new(100), Rate::ZERO, Duration::days(10), &time)
            .unwrap();
        sm.take_events();

        // carol never approved the escrow
        let err = sm.fund_loan(&carol, id, Amount::new(100), &time).unwrap_err();
        assert!(matches!(
            err,
            LendingError::TransferRejected { reason: AssetError::InsufficientAllowance { .. } }
        ));

        let loan = sm.ledger().get(id).unwrap();
        assert_eq!(loan.status(), LoanStatus::Listed);
        assert!(loan.lender().is_none());
        assert_eq!(sm.custody().fungible().balance_of(&carol), Amount::new(500));
        assert!(sm.events().events().is_empty());
    }

    #[test]
    fn test_escrow_cannot_act_as_participant() {
        let time = clock();
        let escrow = AccountId::new("escrow");
        let mut sm = machine(ProtocolConfig::default());
        let id = sm
            .create_loan(&alice(), punk(), Amount::new(100), Rate::ZERO, Duration::days(10), &time)
            .unwrap();
        sm.take_events();

        // the escrow already owns the collateral, so relisting it must not pass custody
        let err = sm
            .create_loan(&escrow, punk(), Amount::new(100), Rate::ZERO, Duration::seconds(1), &time)
            .unwrap_err();
        assert!(matches!(err, LendingError::Unauthorized { .. }));
        assert_eq!(sm.ledger().len(), 1);

        assert!(matches!(
            sm.fund_loan(&escrow, id, Amount::new(100), &time),
            Err(LendingError::Unauthorized { .. })
        ));
        assert!(matches!(
            sm.cancel_loan(&escrow, id, &time),
            Err(LendingError::Unauthorized { .. })
        ));

        sm.fund_loan(&bob(), id, Amount::new(100), &time).unwrap();
        assert!(matches!(
            sm.repay_loan(&escrow, id, &time),
            Err(LendingError::Unauthorized { .. })
        ));
        assert!(matches!(
            sm.liquidate_loan(&escrow, id, &time),
            Err(LendingError::Unauthorized { .. })
        ));

        assert_eq!(sm.ledger().get(id).unwrap().status(), LoanStatus::Active);
        assert!(sm.custody().holds_collateral(&punk()));
    }

    #[test]
    fn test_amount_due_quotes_listed_and_freezes_active() {
        let time = clock();
        let mut sm = machine(ProtocolConfig::default());
        let id = sm
            .create_loan(&alice(), punk(), Amount::new(100), Rate::from_percentage(20), Duration::days(10), &time)
            .unwrap();

        assert_eq!(sm.amount_due(id).unwrap(), Amount::new(120));
        assert_eq!(sm.maturity(id).unwrap(), None);

        let quote = sm.fund_loan(&bob(), id, Amount::new(100), &time).unwrap();
        assert_eq!(quote.interest, Amount::new(20));
        assert_eq!(sm.amount_due(id).unwrap(), Amount::new(120));
        assert_eq!(
            sm.maturity(id).unwrap(),
            Some(Utc.with_ymd_and_hms(2024, 1, 11, 0, 0, 0).unwrap())
        );

        sm.repay_loan(&alice(), id, &time).unwrap();
        assert!(matches!(
            sm.amount_due(id),
            Err(LendingError::InvalidState { current: LoanStatus::Repaid, .. })
        ));
    }

    #[test]
    fn test_events_follow_committed_legs() {
        let time = clock();
        let mut sm = machine(ProtocolConfig::default());
        let id = sm
            .create_loan(&alice(), punk(), Amount::new(100), Rate::ZERO, Duration::days(10), &time)
            .unwrap();

        let listed = sm.take_events();
        assert!(matches!(listed[0], Event::LoanListed { .. }));
        assert!(matches!(listed[1], Event::CollateralEscrowed { .. }));
        assert_eq!(listed.len(), 2);

        sm.cancel_loan(&alice(), id, &time).unwrap();
        let cancelled = sm.take_events();
        assert!(matches!(cancelled[0], Event::LoanCancelled { .. }));
        assert!(matches!(cancelled[1], Event::CollateralReleased { .. }));
        assert!(matches!(
            cancelled[2],
            Event::StatusChanged {
                old_status: LoanStatus::Listed,
                new_status: LoanStatus::Cancelled,
                ..
            }
        ));
    }
}
