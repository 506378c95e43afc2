use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::{Amount, Rate};
use crate::types::{AccountId, CollateralRef, LoanId, LoanStatus};

/// all events that can be emitted by the protocol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    // lifecycle events
    LoanListed {
        loan_id: LoanId,
        borrower: AccountId,
        collateral: CollateralRef,
        principal: Amount,
        interest_rate: Rate,
        duration_secs: i64,
        timestamp: DateTime<Utc>,
    },
    LoanCancelled {
        loan_id: LoanId,
        borrower: AccountId,
        timestamp: DateTime<Utc>,
    },
    LoanFunded {
        loan_id: LoanId,
        lender: AccountId,
        principal: Amount,
        interest_due: Amount,
        maturity: DateTime<Utc>,
        timestamp: DateTime<Utc>,
    },
    LoanRepaid {
        loan_id: LoanId,
        payer: AccountId,
        lender: AccountId,
        amount: Amount,
        timestamp: DateTime<Utc>,
    },
    LoanLiquidated {
        loan_id: LoanId,
        liquidator: AccountId,
        lender: AccountId,
        overdue_secs: i64,
        timestamp: DateTime<Utc>,
    },

    // custody events
    CollateralEscrowed {
        loan_id: LoanId,
        collateral: CollateralRef,
        from: AccountId,
        timestamp: DateTime<Utc>,
    },
    CollateralReleased {
        loan_id: LoanId,
        collateral: CollateralRef,
        to: AccountId,
        timestamp: DateTime<Utc>,
    },
    FundsTransferred {
        loan_id: LoanId,
        from: AccountId,
        to: AccountId,
        amount: Amount,
        timestamp: DateTime<Utc>,
    },

    StatusChanged {
        loan_id: LoanId,
        old_status: LoanStatus,
        new_status: LoanStatus,
        timestamp: DateTime<Utc>,
    },
}

impl Event {
    pub fn loan_id(&self) -> LoanId {
        match self {
            Event::LoanListed { loan_id, .. }
            | Event::LoanCancelled { loan_id, .. }
            | Event::LoanFunded { loan_id, .. }
            | Event::LoanRepaid { loan_id, .. }
            | Event::LoanLiquidated { loan_id, .. }
            | Event::CollateralEscrowed { loan_id, .. }
            | Event::CollateralReleased { loan_id, .. }
            | Event::FundsTransferred { loan_id, .. }
            | Event::StatusChanged { loan_id, .. } => *loan_id,
        }
    }
}

/// event store for collecting events during operations
#[derive(Debug, Default)]
pub struct EventStore {
    events: Vec<Event>,
}

impl EventStore {
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
        }
    }

    pub fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn extend(&mut self, events: impl IntoIterator<Item = Event>) {
        self.events.extend(events);
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// events recorded for one loan, oldest first
    pub fn for_loan(&self, loan_id: LoanId) -> impl Iterator<Item = &Event> {
        self.events.iter().filter(move |e| e.loan_id() == loan_id)
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_filters_by_loan() {
        let now = Utc::now();
        let mut store = EventStore::new();

        store.emit(Event::LoanCancelled {
            loan_id: LoanId::new(1),
            borrower: AccountId::new("alice"),
            timestamp: now,
        });
        store.emit(Event::StatusChanged {
            loan_id: LoanId::new(2),
            old_status: LoanStatus::Listed,
            new_status: LoanStatus::Active,
            timestamp: now,
        });

        assert_eq!(store.for_loan(LoanId::new(2)).count(), 1);
        assert_eq!(store.events().len(), 2);

        let drained = store.take_events();
        assert_eq!(drained.len(), 2);
        assert!(store.events().is_empty());
    }

    #[test]
    fn test_events_serialize() {
        let event = Event::FundsTransferred {
            loan_id: LoanId::new(3),
            from: AccountId::new("bob"),
            to: AccountId::new("alice"),
            amount: Amount::new(100),
            timestamp: Utc::now(),
        };

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("FundsTransferred"));
        let back: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }
}
