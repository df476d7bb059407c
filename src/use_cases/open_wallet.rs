//! Open wallet use case. Provisions a wallet for a user, optionally funded.

use std::sync::Arc;
use tracing::info;

use crate::domain::{Money, UserId, Wallet};
use crate::ports::{Ledger, RepositoryError};

#[derive(Debug, Clone, Copy)]
pub struct OpenWalletInput {
    pub user_id: UserId,
    pub initial_balance: Money,
}

pub struct OpenWallet {
    ledger: Arc<dyn Ledger>,
}

impl OpenWallet {
    pub fn new(ledger: Arc<dyn Ledger>) -> Self {
        Self { ledger }
    }

    /// Fails with `DuplicateWallet` if the user already has one.
    pub async fn execute(&self, input: OpenWalletInput) -> Result<Wallet, RepositoryError> {
        let wallet = Wallet::with_balance(input.user_id, input.initial_balance);
        self.ledger.wallets().create(&wallet).await?;
        info!(
            user_id = %wallet.user_id(),
            wallet_id = %wallet.id(),
            balance = %wallet.balance(),
            "Wallet opened"
        );
        Ok(wallet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryLedger;

    #[tokio::test]
    async fn test_open_wallet() {
        let ledger = Arc::new(MemoryLedger::new());
        let use_case = OpenWallet::new(ledger.clone());
        let user_id = UserId::new();

        let wallet = use_case
            .execute(OpenWalletInput {
                user_id,
                initial_balance: Money::new(300).unwrap(),
            })
            .await
            .unwrap();

        assert_eq!(wallet.user_id(), user_id);
        assert_ne!(wallet.id().into_uuid(), user_id.into_uuid());
        assert!(ledger.wallets().exists(user_id).await.unwrap());
    }

    #[tokio::test]
    async fn test_open_wallet_twice_fails() {
        let use_case = OpenWallet::new(Arc::new(MemoryLedger::new()));
        let input = OpenWalletInput {
            user_id: UserId::new(),
            initial_balance: Money::ZERO,
        };

        use_case.execute(input).await.unwrap();
        let err = use_case.execute(input).await.unwrap_err();
        assert!(matches!(err, RepositoryError::DuplicateWallet(_)));
    }
}
