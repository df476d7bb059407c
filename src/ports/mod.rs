//! Storage ports.
//!
//! The use cases only talk to these traits. Two backends implement them:
//! PostgreSQL with row locks (`crate::db`) and an in-memory map with
//! per-wallet key locks (`crate::store`). Both provide the same capability,
//! an atomic conditional balance update scoped by a [`UnitOfWork`].

use async_trait::async_trait;

use crate::domain::{
    DomainError, Money, Transaction, TransactionId, TransactionType, UserId, Wallet, WalletId,
};

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("wallet not found for user {0}")]
    WalletNotFound(UserId),

    #[error("wallet {0} not found")]
    WalletIdNotFound(WalletId),

    #[error("wallet already exists for user {0}")]
    DuplicateWallet(UserId),

    #[error("transaction {0} not found")]
    TransactionNotFound(TransactionId),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored row could not be turned back into a domain value.
    #[error("corrupt record: {0}")]
    Corrupt(String),
}

impl From<DomainError> for RepositoryError {
    fn from(err: DomainError) -> Self {
        RepositoryError::Corrupt(err.to_string())
    }
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Offset/limit page request. Results are ordered newest first; an offset
/// past the end yields an empty page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub limit: usize,
    pub offset: usize,
}

impl Pagination {
    pub const DEFAULT_LIMIT: usize = 20;

    pub fn new(limit: usize, offset: usize) -> Self {
        Self { limit, offset }
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(Self::DEFAULT_LIMIT, 0)
    }
}

#[async_trait]
pub trait WalletRepository: Send + Sync {
    /// Unlocked read. Returns an owned copy; changing it has no effect on
    /// the store until written back.
    async fn find_by_user_id(&self, user_id: UserId) -> RepositoryResult<Wallet>;

    /// Fails with `DuplicateWallet` if the user already owns a wallet.
    async fn create(&self, wallet: &Wallet) -> RepositoryResult<()>;

    /// Replaces the stored wallet for `wallet.user_id()` wholesale.
    /// Last writer wins; use a [`UnitOfWork`] for check-then-set.
    async fn update(&self, wallet: &Wallet) -> RepositoryResult<()>;

    async fn exists(&self, user_id: UserId) -> RepositoryResult<bool>;
}

#[async_trait]
pub trait TransactionRepository: Send + Sync {
    /// Appends a record outside of any unit of work.
    async fn save(&self, transaction: &Transaction) -> RepositoryResult<()>;

    async fn find_by_id(&self, id: TransactionId) -> RepositoryResult<Transaction>;

    async fn find_by_wallet_id(
        &self,
        wallet_id: WalletId,
        page: Pagination,
    ) -> RepositoryResult<Vec<Transaction>>;

    async fn find_by_wallet_id_and_type(
        &self,
        wallet_id: WalletId,
        transaction_type: TransactionType,
        page: Pagination,
    ) -> RepositoryResult<Vec<Transaction>>;

    async fn count_by_wallet_id(&self, wallet_id: WalletId) -> RepositoryResult<u64>;
}

/// One open withdrawal scope.
///
/// `wallet_for_update` takes the per-wallet serialization point and holds it
/// until `commit` or `rollback`. Dropping the unit of work without committing
/// releases the lock and, where the backend supports it, discards the writes.
#[async_trait]
pub trait UnitOfWork: Send {
    async fn wallet_for_update(&mut self, user_id: UserId) -> RepositoryResult<Wallet>;

    async fn update_balance(&mut self, wallet_id: WalletId, balance: Money)
        -> RepositoryResult<()>;

    async fn insert_transaction(&mut self, transaction: &Transaction) -> RepositoryResult<()>;

    async fn commit(self: Box<Self>) -> RepositoryResult<()>;

    async fn rollback(self: Box<Self>) -> RepositoryResult<()>;
}

/// Combined repository access plus the ability to open a unit of work.
#[async_trait]
pub trait Ledger: Send + Sync {
    fn wallets(&self) -> &dyn WalletRepository;

    fn transactions(&self) -> &dyn TransactionRepository;

    async fn begin(&self) -> RepositoryResult<Box<dyn UnitOfWork>>;

    /// Short name used in logs and the config report.
    fn backend(&self) -> &'static str;
}
