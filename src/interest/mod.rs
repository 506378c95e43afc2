pub mod term;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::decimal::{Amount, Rate};
use crate::errors::Result;

pub use term::{interest_owed, InterestEngine};

/// how the loan rate is applied to the agreed term
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InterestBasis {
    /// rate applies once to the whole term (20% means 20% of principal)
    FlatPerTerm,
    /// rate is annual, scaled by term length / year basis
    Annualized { year_basis_days: u32 },
}

impl Default for InterestBasis {
    fn default() -> Self {
        InterestBasis::FlatPerTerm
    }
}

/// interest quoted for a set of loan terms
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterestQuote {
    pub principal: Amount,
    pub rate: Rate,
    pub duration_secs: i64,
    pub basis: InterestBasis,
    pub interest: Amount,
    pub total_due: Amount,
}

/// trait for interest calculations over an agreed term
pub trait InterestCalculator {
    fn interest_owed(&self, principal: Amount, rate: Rate, duration: Duration) -> Result<Amount>;

    fn quote(&self, principal: Amount, rate: Rate, duration: Duration) -> Result<InterestQuote>;
}
