//! Get balance use case.

use std::sync::Arc;

use crate::domain::{Money, UserId};
use crate::ports::{Ledger, RepositoryError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceOutput {
    pub user_id: UserId,
    pub balance: Money,
}

/// Unlocked read of a wallet balance. May observe a value that a
/// concurrent withdrawal is about to change.
pub struct GetBalance {
    ledger: Arc<dyn Ledger>,
}

impl GetBalance {
    pub fn new(ledger: Arc<dyn Ledger>) -> Self {
        Self { ledger }
    }

    pub async fn execute(&self, user_id: UserId) -> Result<BalanceOutput, RepositoryError> {
        let wallet = self.ledger.wallets().find_by_user_id(user_id).await?;
        Ok(BalanceOutput {
            user_id,
            balance: wallet.balance(),
        })
    }
}
