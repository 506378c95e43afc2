use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::decimal::Amount;
use crate::types::{AccountId, CollateralRef, LoanId, LoanStatus};

/// failures reported by an asset collaborator
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AssetError {
    #[error("insufficient balance: {owner} holds {available}, needs {required}")]
    InsufficientBalance {
        owner: AccountId,
        available: Amount,
        required: Amount,
    },

    #[error("insufficient allowance: {spender} may move {allowed} from {owner}, needs {required}")]
    InsufficientAllowance {
        owner: AccountId,
        spender: AccountId,
        allowed: Amount,
        required: Amount,
    },

    #[error("unknown token: {asset}")]
    UnknownToken {
        asset: CollateralRef,
    },

    #[error("ownership mismatch for {asset}: owned by {owner}, not {claimed}")]
    NotOwner {
        asset: CollateralRef,
        owner: AccountId,
        claimed: AccountId,
    },

    #[error("{operator} is not approved to move {asset}")]
    NotApproved {
        asset: CollateralRef,
        operator: AccountId,
    },

    #[error("token already exists: {asset}")]
    AlreadyExists {
        asset: CollateralRef,
    },

    #[error("balance overflow for {owner}")]
    BalanceOverflow {
        owner: AccountId,
    },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LendingError {
    #[error("invalid loan parameters: {message}")]
    InvalidParameters {
        message: String,
    },

    #[error("invalid state for {loan_id}: current {current}, expected {expected}")]
    InvalidState {
        loan_id: LoanId,
        current: LoanStatus,
        expected: LoanStatus,
    },

    #[error("unauthorized: {caller} is not the {required}")]
    Unauthorized {
        caller: AccountId,
        required: String,
    },

    #[error("invalid amount: expected exactly {expected}, provided {provided}")]
    InvalidAmount {
        expected: Amount,
        provided: Amount,
    },

    #[error("transfer rejected: {reason}")]
    TransferRejected {
        #[from]
        reason: AssetError,
    },

    #[error("too early to liquidate {loan_id}: eligible at {eligible_at}, current time {now}")]
    TooEarly {
        loan_id: LoanId,
        eligible_at: DateTime<Utc>,
        now: DateTime<Utc>,
    },

    #[error("loan not found: {loan_id}")]
    LoanNotFound {
        loan_id: LoanId,
    },

    #[error("arithmetic overflow: {context}")]
    ArithmeticOverflow {
        context: String,
    },

    #[error("invalid configuration: {message}")]
    InvalidConfiguration {
        message: String,
    },
}

impl LendingError {
    pub(crate) fn overflow(context: impl Into<String>) -> Self {
        LendingError::ArithmeticOverflow {
            context: context.into(),
        }
    }

    pub(crate) fn invalid_parameters(message: impl Into<String>) -> Self {
        LendingError::InvalidParameters {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, LendingError>;
