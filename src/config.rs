use serde::{Deserialize, Serialize};

use crate::decimal::{Amount, Rate};
use crate::errors::{LendingError, Result};
use crate::interest::InterestBasis;
use crate::types::AccountId;

/// protocol configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtocolConfig {
    /// escrow identity; generated when absent
    pub escrow_account: Option<AccountId>,
    pub interest_basis: InterestBasis,
    pub limits: LoanLimits,
    /// whether a borrower may fund their own listing
    pub allow_self_funding: bool,
}

/// bounds applied to loan terms at creation, on top of the structural checks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanLimits {
    pub min_principal: Amount,
    pub max_principal: Option<Amount>,
    pub min_duration_secs: i64,
    pub max_duration_secs: Option<i64>,
    pub max_interest_rate: Option<Rate>,
}

impl Default for LoanLimits {
    fn default() -> Self {
        Self {
            min_principal: Amount::new(1),
            max_principal: None,
            min_duration_secs: 1,
            max_duration_secs: None,
            max_interest_rate: None,
        }
    }
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            escrow_account: None,
            interest_basis: InterestBasis::FlatPerTerm,
            limits: LoanLimits::default(),
            allow_self_funding: true,
        }
    }
}

impl ProtocolConfig {
    /// one hour to one year, rates capped at 100% of principal, no self-funding
    pub fn conservative() -> Self {
        Self {
            escrow_account: None,
            interest_basis: InterestBasis::FlatPerTerm,
            limits: LoanLimits {
                min_principal: Amount::new(1),
                max_principal: None,
                min_duration_secs: 60 * 60,
                max_duration_secs: Some(365 * 24 * 60 * 60),
                max_interest_rate: Some(Rate::ONE),
            },
            allow_self_funding: false,
        }
    }

    /// use a fixed escrow identity
    pub fn with_escrow(mut self, escrow: AccountId) -> Self {
        self.escrow_account = Some(escrow);
        self
    }

    /// switch interest basis
    pub fn with_interest_basis(mut self, basis: InterestBasis) -> Self {
        self.interest_basis = basis;
        self
    }

    /// check limits are internally consistent
    pub fn validate(&self) -> Result<()> {
        let limits = &self.limits;

        if limits.min_principal.is_zero() {
            return Err(LendingError::InvalidConfiguration {
                message: "min_principal must be at least 1".to_string(),
            });
        }
        if let Some(max) = limits.max_principal {
            if max < limits.min_principal {
                return Err(LendingError::InvalidConfiguration {
                    message: format!("max_principal {} below min_principal {}", max, limits.min_principal),
                });
            }
        }
        if limits.min_duration_secs <= 0 {
            return Err(LendingError::InvalidConfiguration {
                message: "min_duration_secs must be positive".to_string(),
            });
        }
        if let Some(max) = limits.max_duration_secs {
            if max < limits.min_duration_secs {
                return Err(LendingError::InvalidConfiguration {
                    message: format!(
                        "max_duration_secs {} below min_duration_secs {}",
                        max, limits.min_duration_secs
                    ),
                });
            }
        }
        if let Some(rate) = limits.max_interest_rate {
            if rate.is_negative() {
                return Err(LendingError::InvalidConfiguration {
                    message: format!("max_interest_rate {} is negative", rate),
                });
            }
        }
        if let InterestBasis::Annualized { year_basis_days } = self.interest_basis {
            if year_basis_days == 0 {
                return Err(LendingError::InvalidConfiguration {
                    message: "year_basis_days must be positive".to_string(),
                });
            }
        }
        if let Some(escrow) = &self.escrow_account {
            if escrow.as_str().is_empty() {
                return Err(LendingError::InvalidConfiguration {
                    message: "escrow_account must not be empty".to_string(),
                });
            }
        }

        Ok(())
    }

    /// parse and validate from json
    pub fn from_json(json: &str) -> Result<Self> {
        let config: ProtocolConfig = serde_json::from_str(json).map_err(|e| {
            LendingError::InvalidConfiguration {
                message: e.to_string(),
            }
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| LendingError::InvalidConfiguration {
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_presets_are_valid() {
        assert!(ProtocolConfig::default().validate().is_ok());
        assert!(ProtocolConfig::conservative().validate().is_ok());
        assert!(ProtocolConfig::default().allow_self_funding);
        assert!(!ProtocolConfig::conservative().allow_self_funding);
    }

    #[test]
    fn test_json_roundtrip_with_escrow() {
        let config = ProtocolConfig::conservative()
            .with_escrow(AccountId::new("vault"))
            .with_interest_basis(InterestBasis::Annualized { year_basis_days: 365 });

        let json = config.to_json_pretty().unwrap();
        assert!(json.contains("\"vault\""));

        let parsed = ProtocolConfig::from_json(&json).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_inconsistent_limits_rejected() {
        let mut config = ProtocolConfig::default();
        config.limits.max_principal = Some(Amount::ZERO);
        assert!(matches!(
            config.validate(),
            Err(LendingError::InvalidConfiguration { .. })
        ));

        let mut config = ProtocolConfig::default();
        config.limits.max_interest_rate = Some(Rate::from_decimal(dec!(-0.1)));
        assert!(config.validate().is_err());

        let config = ProtocolConfig::default()
            .with_interest_basis(InterestBasis::Annualized { year_basis_days: 0 });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_malformed_json_rejected() {
        let err = ProtocolConfig::from_json("{ not json").unwrap_err();
        assert!(matches!(err, LendingError::InvalidConfiguration { .. }));
    }
}
