use serde::{Deserialize, Serialize};
use std::fmt;

use super::DomainError;

/// Non-negative amount in minor currency units.
///
/// Every arithmetic operation returns a new value; subtraction fails rather
/// than saturating or wrapping below zero.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(try_from = "i64", into = "i64")]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    pub fn new(amount: i64) -> Result<Self, DomainError> {
        if amount < 0 {
            return Err(DomainError::InvalidAmount(
                "money amount cannot be negative".to_string(),
            ));
        }
        Ok(Money(amount))
    }

    pub fn amount(&self) -> i64 {
        self.0
    }

    pub fn subtract(self, other: Money) -> Result<Money, DomainError> {
        if self.0 < other.0 {
            return Err(DomainError::InsufficientFunds {
                available: self,
                requested: other,
            });
        }
        Ok(Money(self.0 - other.0))
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn less_than_or_equal(&self, other: &Money) -> bool {
        self.0 <= other.0
    }
}

impl TryFrom<i64> for Money {
    type Error = DomainError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Money::new(value)
    }
}

impl From<Money> for i64 {
    fn from(money: Money) -> Self {
        money.0
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
