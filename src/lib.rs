pub mod assets;
pub mod config;
pub mod custody;
pub mod decimal;
pub mod errors;
pub mod events;
pub mod interest;
pub mod ledger;
pub mod loan;
pub mod protocol;
pub mod state_machine;
pub mod types;
pub mod views;

// re-export key types
pub use assets::{FungibleAsset, InMemoryCollection, InMemoryToken, NonFungibleAsset};
pub use config::{LoanLimits, ProtocolConfig};
pub use custody::{AssetCustody, Leg, Settlement};
pub use decimal::{Amount, Rate};
pub use errors::{AssetError, LendingError, Result};
pub use events::{Event, EventStore};
pub use interest::{interest_owed, InterestBasis, InterestCalculator, InterestEngine, InterestQuote};
pub use ledger::{LoanLedger, LoanSnapshot};
pub use loan::{Loan, LoanTerms};
pub use protocol::LendingProtocol;
pub use state_machine::LoanStateMachine;
pub use types::{AccountId, CollateralRef, CollectionId, LoanId, LoanStatus, TokenId};
pub use views::{LoanView, ProtocolView};

// re-export external dependencies that users will need
pub use chrono;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use rust_decimal::Decimal;
pub use uuid::Uuid;
