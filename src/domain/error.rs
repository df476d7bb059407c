//! Errors raised by domain invariants.

use super::Money;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("insufficient funds: available {available}, requested {requested}")]
    InsufficientFunds { available: Money, requested: Money },

    #[error("invalid user ID format")]
    InvalidUserId,
}
