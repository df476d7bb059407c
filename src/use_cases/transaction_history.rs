//! Transaction history use case. Lists a wallet's records newest first.

use std::sync::Arc;

use crate::domain::{Transaction, TransactionType, UserId, WalletId};
use crate::ports::{Ledger, Pagination, RepositoryError};

#[derive(Debug, Clone, Copy, Default)]
pub struct HistoryInput {
    pub user_id: UserId,
    pub transaction_type: Option<TransactionType>,
    pub page: Pagination,
}

#[derive(Debug, Clone)]
pub struct HistoryOutput {
    pub wallet_id: WalletId,
    /// Count of all records for the wallet, regardless of filter or page.
    pub total: u64,
    pub transactions: Vec<Transaction>,
}

pub struct TransactionHistory {
    ledger: Arc<dyn Ledger>,
}

impl TransactionHistory {
    pub fn new(ledger: Arc<dyn Ledger>) -> Self {
        Self { ledger }
    }

    pub async fn execute(&self, input: HistoryInput) -> Result<HistoryOutput, RepositoryError> {
        let wallet = self.ledger.wallets().find_by_user_id(input.user_id).await?;
        let transactions = self.ledger.transactions();

        let page = match input.transaction_type {
            Some(kind) => {
                transactions
                    .find_by_wallet_id_and_type(wallet.id(), kind, input.page)
                    .await?
            }
            None => transactions.find_by_wallet_id(wallet.id(), input.page).await?,
        };
        let total = transactions.count_by_wallet_id(wallet.id()).await?;

        Ok(HistoryOutput {
            wallet_id: wallet.id(),
            total,
            transactions: page,
        })
    }
}
