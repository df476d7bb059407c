use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::{Transaction, TransactionId, TransactionType, WalletId};
use crate::ports::{Pagination, RepositoryError, RepositoryResult, TransactionRepository};

/// Append-only log of transaction records, kept in insertion order.
#[derive(Debug, Clone, Default)]
pub struct MemoryTransactionRepository {
    records: Arc<RwLock<Vec<Transaction>>>,
}

impl MemoryTransactionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every record, newest first.
    pub async fn all(&self) -> Vec<Transaction> {
        let records = self.records.read().await;
        newest_first(records.iter())
    }

    async fn select<F>(&self, page: Pagination, predicate: F) -> Vec<Transaction>
    where
        F: Fn(&Transaction) -> bool,
    {
        let records = self.records.read().await;
        newest_first(records.iter().filter(|t| predicate(*t)))
            .into_iter()
            .skip(page.offset)
            .take(page.limit)
            .collect()
    }
}

// Later inserts win ties on created_at.
fn newest_first<'a>(records: impl DoubleEndedIterator<Item = &'a Transaction>) -> Vec<Transaction> {
    let mut selected: Vec<Transaction> = records.rev().cloned().collect();
    selected.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
    selected
}

#[async_trait]
impl TransactionRepository for MemoryTransactionRepository {
    async fn save(&self, transaction: &Transaction) -> RepositoryResult<()> {
        self.records.write().await.push(transaction.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: TransactionId) -> RepositoryResult<Transaction> {
        self.records
            .read()
            .await
            .iter()
            .find(|t| t.id() == id)
            .cloned()
            .ok_or(RepositoryError::TransactionNotFound(id))
    }

    async fn find_by_wallet_id(
        &self,
        wallet_id: WalletId,
        page: Pagination,
    ) -> RepositoryResult<Vec<Transaction>> {
        Ok(self.select(page, |t| t.wallet_id() == wallet_id).await)
    }

    async fn find_by_wallet_id_and_type(
        &self,
        wallet_id: WalletId,
        transaction_type: TransactionType,
        page: Pagination,
    ) -> RepositoryResult<Vec<Transaction>> {
        Ok(self
            .select(page, |t| {
                t.wallet_id() == wallet_id && t.transaction_type() == transaction_type
            })
            .await)
    }

    async fn count_by_wallet_id(&self, wallet_id: WalletId) -> RepositoryResult<u64> {
        let records = self.records.read().await;
        Ok(records.iter().filter(|t| t.wallet_id() == wallet_id).count() as u64)
    }
}
