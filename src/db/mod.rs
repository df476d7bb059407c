//! PostgreSQL storage backend.
//!
//! Withdrawals run inside one SQL transaction: the wallet row is read with
//! `SELECT ... FOR UPDATE`, then the balance update and the transaction
//! record insert happen under that lock and commit together. A second
//! withdrawal on the same wallet blocks at its own `FOR UPDATE` until the
//! first commits or rolls back.

pub mod models;
pub mod queries;

use async_trait::async_trait;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres};
use std::path::Path;
use std::time::Duration;

use crate::db::models::{TransactionRow, WalletRow};
use crate::domain::{
    Money, Transaction, TransactionId, TransactionType, UserId, Wallet, WalletId,
};
use crate::ports::{
    Ledger, Pagination, RepositoryError, RepositoryResult, TransactionRepository, UnitOfWork,
    WalletRepository,
};

const MAX_CONNECTIONS: u32 = 10;
const ACQUIRE_TIMEOUT_SECS: u64 = 5;

fn pool_options() -> PgPoolOptions {
    PgPoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .acquire_timeout(Duration::from_secs(ACQUIRE_TIMEOUT_SECS))
}

pub async fn create_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    pool_options().connect(database_url).await
}

/// Pool that defers connecting until first use.
pub fn create_lazy_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    pool_options().connect_lazy(database_url)
}

pub async fn run_migrations(pool: &PgPool, dir: &Path) -> anyhow::Result<()> {
    let migrator = Migrator::new(dir).await?;
    migrator.run(pool).await?;
    tracing::info!("Database migrations completed");
    Ok(())
}

fn map_unique_violation(err: sqlx::Error, user_id: UserId) -> RepositoryError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            RepositoryError::DuplicateWallet(user_id)
        }
        _ => RepositoryError::Database(err),
    }
}

fn page_bounds(page: Pagination) -> (i64, i64) {
    (
        i64::try_from(page.limit).unwrap_or(i64::MAX),
        i64::try_from(page.offset).unwrap_or(i64::MAX),
    )
}

fn into_wallet(row: WalletRow) -> RepositoryResult<Wallet> {
    Ok(Wallet::try_from(row)?)
}

fn into_transactions(rows: Vec<TransactionRow>) -> RepositoryResult<Vec<Transaction>> {
    rows.into_iter().map(Transaction::try_from).collect()
}

#[derive(Debug, Clone)]
pub struct PgWalletRepository {
    pool: PgPool,
}

impl PgWalletRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WalletRepository for PgWalletRepository {
    async fn find_by_user_id(&self, user_id: UserId) -> RepositoryResult<Wallet> {
        let row = queries::get_wallet(&self.pool, user_id.into_uuid())
            .await?
            .ok_or(RepositoryError::WalletNotFound(user_id))?;
        into_wallet(row)
    }

    async fn create(&self, wallet: &Wallet) -> RepositoryResult<()> {
        queries::insert_wallet(
            &self.pool,
            wallet.id().into_uuid(),
            wallet.user_id().into_uuid(),
            wallet.balance().amount(),
        )
        .await
        .map_err(|e| map_unique_violation(e, wallet.user_id()))
    }

    async fn update(&self, wallet: &Wallet) -> RepositoryResult<()> {
        let touched = queries::replace_wallet_balance(
            &self.pool,
            wallet.user_id().into_uuid(),
            wallet.balance().amount(),
        )
        .await?;
        if touched == 0 {
            return Err(RepositoryError::WalletNotFound(wallet.user_id()));
        }
        Ok(())
    }

    async fn exists(&self, user_id: UserId) -> RepositoryResult<bool> {
        Ok(queries::wallet_exists(&self.pool, user_id.into_uuid()).await?)
    }
}

#[derive(Debug, Clone)]
pub struct PgTransactionRepository {
    pool: PgPool,
}

impl PgTransactionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TransactionRepository for PgTransactionRepository {
    async fn save(&self, transaction: &Transaction) -> RepositoryResult<()> {
        queries::insert_transaction(&self.pool, &TransactionRow::from(transaction)).await?;
        Ok(())
    }

    async fn find_by_id(&self, id: TransactionId) -> RepositoryResult<Transaction> {
        let row = queries::get_transaction(&self.pool, id.into_uuid())
            .await?
            .ok_or(RepositoryError::TransactionNotFound(id))?;
        Transaction::try_from(row)
    }

    async fn find_by_wallet_id(
        &self,
        wallet_id: WalletId,
        page: Pagination,
    ) -> RepositoryResult<Vec<Transaction>> {
        let (limit, offset) = page_bounds(page);
        let rows = queries::list_transactions_by_wallet(
            &self.pool,
            wallet_id.into_uuid(),
            None,
            limit,
            offset,
        )
        .await?;
        into_transactions(rows)
    }

    async fn find_by_wallet_id_and_type(
        &self,
        wallet_id: WalletId,
        transaction_type: TransactionType,
        page: Pagination,
    ) -> RepositoryResult<Vec<Transaction>> {
        let (limit, offset) = page_bounds(page);
        let rows = queries::list_transactions_by_wallet(
            &self.pool,
            wallet_id.into_uuid(),
            Some(transaction_type.as_str()),
            limit,
            offset,
        )
        .await?;
        into_transactions(rows)
    }

    async fn count_by_wallet_id(&self, wallet_id: WalletId) -> RepositoryResult<u64> {
        let count = queries::count_transactions_by_wallet(&self.pool, wallet_id.into_uuid()).await?;
        Ok(u64::try_from(count).unwrap_or_default())
    }
}

/// Row-locking ledger over a Postgres pool.
#[derive(Debug, Clone)]
pub struct PgLedger {
    pool: PgPool,
    wallets: PgWalletRepository,
    transactions: PgTransactionRepository,
}

impl PgLedger {
    pub fn new(pool: PgPool) -> Self {
        Self {
            wallets: PgWalletRepository::new(pool.clone()),
            transactions: PgTransactionRepository::new(pool.clone()),
            pool,
        }
    }
}

#[async_trait]
impl Ledger for PgLedger {
    fn wallets(&self) -> &dyn WalletRepository {
        &self.wallets
    }

    fn transactions(&self) -> &dyn TransactionRepository {
        &self.transactions
    }

    async fn begin(&self) -> RepositoryResult<Box<dyn UnitOfWork>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgUnitOfWork { tx }))
    }

    fn backend(&self) -> &'static str {
        "postgres"
    }
}

/// An open SQL transaction. Dropping it without `commit` rolls back.
struct PgUnitOfWork {
    tx: sqlx::Transaction<'static, Postgres>,
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    async fn wallet_for_update(&mut self, user_id: UserId) -> RepositoryResult<Wallet> {
        let row = queries::get_wallet_for_update(&mut *self.tx, user_id.into_uuid())
            .await?
            .ok_or(RepositoryError::WalletNotFound(user_id))?;
        into_wallet(row)
    }

    async fn update_balance(
        &mut self,
        wallet_id: WalletId,
        balance: Money,
    ) -> RepositoryResult<()> {
        let touched =
            queries::update_wallet_balance(&mut *self.tx, wallet_id.into_uuid(), balance.amount())
                .await?;
        if touched == 0 {
            return Err(RepositoryError::WalletIdNotFound(wallet_id));
        }
        Ok(())
    }

    async fn insert_transaction(&mut self, transaction: &Transaction) -> RepositoryResult<()> {
        queries::insert_transaction(&mut *self.tx, &TransactionRow::from(transaction)).await?;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> RepositoryResult<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> RepositoryResult<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}
