use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{DomainError, Money, Transaction, Wallet};
use crate::ports::RepositoryError;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct WalletRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub balance: i64,
}

impl TryFrom<WalletRow> for Wallet {
    type Error = DomainError;

    fn try_from(row: WalletRow) -> Result<Self, Self::Error> {
        Ok(Wallet::from_parts(
            row.id.into(),
            row.user_id.into(),
            Money::new(row.balance)?,
        ))
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TransactionRow {
    pub id: Uuid,
    pub wallet_id: Uuid,
    pub amount: i64,
    pub transaction_type: String,
    pub status: String,
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&Transaction> for TransactionRow {
    fn from(tx: &Transaction) -> Self {
        Self {
            id: tx.id().into_uuid(),
            wallet_id: tx.wallet_id().into_uuid(),
            amount: tx.amount().amount(),
            transaction_type: tx.transaction_type().as_str().to_string(),
            status: tx.status().as_str().to_string(),
            failure_reason: tx.failure_reason().map(str::to_string),
            created_at: tx.created_at(),
        }
    }
}

impl TryFrom<TransactionRow> for Transaction {
    type Error = RepositoryError;

    fn try_from(row: TransactionRow) -> Result<Self, Self::Error> {
        let transaction_type = row
            .transaction_type
            .parse()
            .map_err(RepositoryError::Corrupt)?;
        let status = row.status.parse().map_err(RepositoryError::Corrupt)?;
        Ok(Transaction::from_parts(
            row.id.into(),
            row.wallet_id.into(),
            transaction_type,
            Money::new(row.amount)?,
            status,
            row.failure_reason,
            row.created_at,
        ))
    }
}
