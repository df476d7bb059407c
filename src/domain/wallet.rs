//! Wallet entity.

use super::{DomainError, Money, UserId, WalletId};

/// A user's wallet. `balance` is only changed through [`Wallet::withdraw`];
/// [`Wallet::from_parts`] exists for reconstruction from storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Wallet {
    id: WalletId,
    user_id: UserId,
    balance: Money,
}

impl Wallet {
    pub fn new(user_id: UserId) -> Self {
        Self::with_balance(user_id, Money::ZERO)
    }

    pub fn with_balance(user_id: UserId, balance: Money) -> Self {
        Self {
            id: WalletId::new(),
            user_id,
            balance,
        }
    }

    pub fn from_parts(id: WalletId, user_id: UserId, balance: Money) -> Self {
        Self {
            id,
            user_id,
            balance,
        }
    }

    pub fn id(&self) -> WalletId {
        self.id
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn balance(&self) -> Money {
        self.balance
    }

    /// Checks and decrements in one step. Zero amounts are rejected here,
    /// not only at the HTTP boundary.
    pub fn withdraw(&mut self, amount: Money) -> Result<(), DomainError> {
        if amount.is_zero() {
            return Err(DomainError::InvalidAmount(
                "withdraw amount must be greater than zero".to_string(),
            ));
        }
        self.balance = self.balance.subtract(amount)?;
        Ok(())
    }

    pub fn can_withdraw(&self, amount: Money) -> bool {
        !amount.is_zero() && amount.less_than_or_equal(&self.balance)
    }
}
