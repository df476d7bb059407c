use sqlx::{Executor, Postgres, Result};
use uuid::Uuid;

use crate::db::models::{TransactionRow, WalletRow};

pub async fn insert_wallet<'e, E>(executor: E, id: Uuid, user_id: Uuid, balance: i64) -> Result<()>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query(
        "INSERT INTO wallets (id, user_id, balance, created_at, updated_at) VALUES ($1, $2, $3, NOW(), NOW())",
    )
    .bind(id)
    .bind(user_id)
    .bind(balance)
    .execute(executor)
    .await?;
    Ok(())
}

pub async fn get_wallet<'e, E>(executor: E, user_id: Uuid) -> Result<Option<WalletRow>>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as::<_, WalletRow>("SELECT id, user_id, balance FROM wallets WHERE user_id = $1")
        .bind(user_id)
        .fetch_optional(executor)
        .await
}

/// Takes an exclusive row lock held until the surrounding transaction ends.
pub async fn get_wallet_for_update<'e, E>(executor: E, user_id: Uuid) -> Result<Option<WalletRow>>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as::<_, WalletRow>(
        "SELECT id, user_id, balance FROM wallets WHERE user_id = $1 FOR UPDATE",
    )
    .bind(user_id)
    .fetch_optional(executor)
    .await
}

/// Returns the number of rows touched.
pub async fn update_wallet_balance<'e, E>(executor: E, wallet_id: Uuid, balance: i64) -> Result<u64>
where
    E: Executor<'e, Database = Postgres>,
{
    let result = sqlx::query("UPDATE wallets SET balance = $1, updated_at = NOW() WHERE id = $2")
        .bind(balance)
        .bind(wallet_id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}

pub async fn replace_wallet_balance<'e, E>(executor: E, user_id: Uuid, balance: i64) -> Result<u64>
where
    E: Executor<'e, Database = Postgres>,
{
    let result =
        sqlx::query("UPDATE wallets SET balance = $1, updated_at = NOW() WHERE user_id = $2")
            .bind(balance)
            .bind(user_id)
            .execute(executor)
            .await?;
    Ok(result.rows_affected())
}

pub async fn wallet_exists<'e, E>(executor: E, user_id: Uuid) -> Result<bool>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM wallets WHERE user_id = $1)")
        .bind(user_id)
        .fetch_one(executor)
        .await
}

pub async fn insert_transaction<'e, E>(executor: E, tx: &TransactionRow) -> Result<()>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query(
        "INSERT INTO transactions (id, wallet_id, amount, transaction_type, status, failure_reason, created_at) VALUES ($1, $2, $3, $4, $5, $6, $7)",
    )
    .bind(tx.id)
    .bind(tx.wallet_id)
    .bind(tx.amount)
    .bind(&tx.transaction_type)
    .bind(&tx.status)
    .bind(&tx.failure_reason)
    .bind(tx.created_at)
    .execute(executor)
    .await?;
    Ok(())
}

pub async fn get_transaction<'e, E>(executor: E, id: Uuid) -> Result<Option<TransactionRow>>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as::<_, TransactionRow>("SELECT * FROM transactions WHERE id = $1")
        .bind(id)
        .fetch_optional(executor)
        .await
}

/// Newest first. `transaction_type = None` matches every type.
pub async fn list_transactions_by_wallet<'e, E>(
    executor: E,
    wallet_id: Uuid,
    transaction_type: Option<&str>,
    limit: i64,
    offset: i64,
) -> Result<Vec<TransactionRow>>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as::<_, TransactionRow>(
        r#"
        SELECT * FROM transactions
        WHERE wallet_id = $1 AND ($2::TEXT IS NULL OR transaction_type = $2)
        ORDER BY created_at DESC, id DESC
        LIMIT $3 OFFSET $4
        "#,
    )
    .bind(wallet_id)
    .bind(transaction_type)
    .bind(limit)
    .bind(offset)
    .fetch_all(executor)
    .await
}

pub async fn count_transactions_by_wallet<'e, E>(executor: E, wallet_id: Uuid) -> Result<i64>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_scalar("SELECT COUNT(*) FROM transactions WHERE wallet_id = $1")
        .bind(wallet_id)
        .fetch_one(executor)
        .await
}
