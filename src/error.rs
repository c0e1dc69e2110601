//! Error types for the banking core.

use crate::account::AccountId;
use crate::money::Money;
use thiserror::Error;

/// Result type alias for banking operations
pub type Result<T> = std::result::Result<T, BankError>;

/// Errors that can occur during banking operations.
///
/// All variants are recovered at the HTTP boundary and translated into a
/// structured error response; none crash the process.
#[derive(Error, Debug)]
pub enum BankError {
    /// Unknown account identifier
    #[error("account {0} not found")]
    NotFound(AccountId),

    /// Username with no associated account
    #[error("no account registered for user {0}")]
    UserNotFound(String),

    /// Non-positive amount for a deposit, withdrawal or transfer
    #[error("amount must be greater than zero")]
    InvalidAmount,

    /// Withdrawal or transfer exceeding the available balance
    #[error("insufficient funds: balance is {balance}, requested {requested}")]
    InsufficientFunds { balance: Money, requested: Money },

    /// Bad credentials or an invalid/expired token
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Malformed request body, e.g. an unrecognized transaction kind
    #[error("invalid request: {0}")]
    Validation(String),

    /// Ledger persistence failure
    #[error("ledger storage failure: {0}")]
    Storage(#[from] rusqlite::Error),

    /// Token issuance failure
    #[error("token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
}
