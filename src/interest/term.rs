use chrono::Duration;
use rust_decimal::Decimal;

use crate::decimal::{Amount, Rate};
use crate::errors::{LendingError, Result};
use crate::interest::{InterestBasis, InterestCalculator, InterestQuote};

const SECONDS_PER_DAY: i64 = 86_400;

/// interest for the full agreed term at a flat rate, rounded down to whole base units
pub fn interest_owed(principal: Amount, rate: Rate, duration: Duration) -> Result<Amount> {
    InterestEngine::new(InterestBasis::FlatPerTerm).interest_owed(principal, rate, duration)
}

/// engine for fixed-term interest
#[derive(Debug, Clone, Copy)]
pub struct InterestEngine {
    pub basis: InterestBasis,
}

impl InterestEngine {
    pub fn new(basis: InterestBasis) -> Self {
        Self { basis }
    }

    fn validate(&self, rate: Rate, duration: Duration) -> Result<()> {
        if rate.is_negative() {
            return Err(LendingError::invalid_parameters(format!(
                "interest rate {} is negative",
                rate
            )));
        }
        if duration <= Duration::zero() {
            return Err(LendingError::invalid_parameters("duration must be positive"));
        }
        Ok(())
    }

    /// principal × rate, optionally scaled by term / year, in exact decimal
    fn raw_interest(&self, principal: Amount, rate: Rate, duration: Duration) -> Result<Decimal> {
        let principal = principal
            .to_decimal()
            .ok_or_else(|| LendingError::overflow(format!("principal {} exceeds decimal range", principal)))?;

        let flat = principal
            .checked_mul(rate.as_decimal())
            .ok_or_else(|| LendingError::overflow("principal × rate"))?;

        match self.basis {
            InterestBasis::FlatPerTerm => Ok(flat),
            InterestBasis::Annualized { year_basis_days } => {
                let year_secs = i64::from(year_basis_days)
                    .checked_mul(SECONDS_PER_DAY)
                    .filter(|secs| *secs > 0)
                    .ok_or_else(|| LendingError::overflow("year basis"))?;

                flat.checked_mul(Decimal::from(duration.num_seconds()))
                    .and_then(|scaled| scaled.checked_div(Decimal::from(year_secs)))
                    .ok_or_else(|| LendingError::overflow("annualized interest"))
            }
        }
    }
}

impl Default for InterestEngine {
    fn default() -> Self {
        Self::new(InterestBasis::FlatPerTerm)
    }
}

impl InterestCalculator for InterestEngine {
    fn interest_owed(&self, principal: Amount, rate: Rate, duration: Duration) -> Result<Amount> {
        self.validate(rate, duration)?;

        if principal.is_zero() || rate.is_zero() {
            return Ok(Amount::ZERO);
        }

        let raw = self.raw_interest(principal, rate, duration)?;
        Amount::from_decimal_floor(raw)
            .ok_or_else(|| LendingError::overflow(format!("interest {} out of amount range", raw)))
    }

    fn quote(&self, principal: Amount, rate: Rate, duration: Duration) -> Result<InterestQuote> {
        let interest = self.interest_owed(principal, rate, duration)?;
        let total_due = principal
            .checked_add(interest)
            .ok_or_else(|| LendingError::overflow("principal + interest"))?;

        Ok(InterestQuote {
            principal,
            rate,
            duration_secs: duration.num_seconds(),
            basis: self.basis,
            interest,
            total_due,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_flat_interest_matches_term_rate() {
        let ten_days = Duration::days(10);

        let owed = interest_owed(Amount::new(100), Rate::from_percentage(20), ten_days).unwrap();
        assert_eq!(owed, Amount::new(20));

        let owed = interest_owed(Amount::new(100), Rate::ZERO, ten_days).unwrap();
        assert_eq!(owed, Amount::ZERO);
    }

    #[test]
    fn test_flat_interest_ignores_term_length() {
        let rate = Rate::from_bps(750);
        let short = interest_owed(Amount::new(1_000_000), rate, Duration::hours(1)).unwrap();
        let long = interest_owed(Amount::new(1_000_000), rate, Duration::days(365)).unwrap();

        assert_eq!(short, Amount::new(75_000));
        assert_eq!(short, long);
    }

    #[test]
    fn test_fractional_interest_rounds_down() {
        // 33 × 10% = 3.3
        let owed = interest_owed(Amount::new(33), Rate::from_percentage(10), Duration::days(1)).unwrap();
        assert_eq!(owed, Amount::new(3));
    }

    #[test]
    fn test_wad_scaled_rate() {
        let rate = Rate::from_wad(125_000_000_000_000_000).unwrap(); // 12.5%
        let principal = Amount::new(1_000_000_000_000_000_000); // 1e18 base units
        let owed = interest_owed(principal, rate, Duration::days(30)).unwrap();
        assert_eq!(owed, Amount::new(125_000_000_000_000_000));
    }

    #[test]
    fn test_annualized_interest_scales_with_term() {
        let engine = InterestEngine::new(InterestBasis::Annualized { year_basis_days: 365 });
        let principal = Amount::new(36_500);
        let rate = Rate::from_percentage(10);

        let one_year = engine.interest_owed(principal, rate, Duration::days(365)).unwrap();
        assert_eq!(one_year, Amount::new(3_650));

        let ten_days = engine.interest_owed(principal, rate, Duration::days(10)).unwrap();
        assert_eq!(ten_days, Amount::new(100));
    }

    #[test]
    fn test_overflow_is_reported_not_wrapped() {
        // fits in u128 but not in a decimal mantissa
        let huge = Amount::new(u128::MAX / 2);
        let err = interest_owed(huge, Rate::from_percentage(5), Duration::days(1)).unwrap_err();
        assert!(matches!(err, LendingError::ArithmeticOverflow { .. }));

        // fits in a decimal, product does not
        let big = Amount::new(70_000_000_000_000_000_000_000_000_000);
        let err = interest_owed(big, Rate::from_decimal(dec!(1000000)), Duration::days(1)).unwrap_err();
        assert!(matches!(err, LendingError::ArithmeticOverflow { .. }));
    }

    #[test]
    fn test_invalid_terms_rejected() {
        let err = interest_owed(Amount::new(100), Rate::from_decimal(dec!(-0.01)), Duration::days(1))
            .unwrap_err();
        assert!(matches!(err, LendingError::InvalidParameters { .. }));

        let err = interest_owed(Amount::new(100), Rate::ZERO, Duration::zero()).unwrap_err();
        assert!(matches!(err, LendingError::InvalidParameters { .. }));
    }

    #[test]
    fn test_quote_totals() {
        let engine = InterestEngine::default();
        let quote = engine
            .quote(Amount::new(100), Rate::from_percentage(20), Duration::days(10))
            .unwrap();

        assert_eq!(quote.interest, Amount::new(20));
        assert_eq!(quote.total_due, Amount::new(120));
        assert_eq!(quote.duration_secs, 10 * 86_400);
        assert_eq!(quote.basis, InterestBasis::FlatPerTerm);
    }

    #[test]
    fn test_zero_rate_quote_at_amount_ceiling() {
        let engine = InterestEngine::default();
        let quote = engine.quote(Amount::MAX, Rate::ZERO, Duration::days(1)).unwrap();
        assert_eq!(quote.total_due, Amount::MAX);
    }
}
