//! In-memory storage backend.
//!
//! Wallet and transaction maps live in process memory. Withdrawals are
//! serialized per wallet through [`KeyLocks`]: a unit of work takes the
//! owner's key lock in `wallet_for_update` and holds it until it commits,
//! rolls back or is dropped, so concurrent withdrawals on one wallet cannot
//! lose each other's updates. Writes land in the maps immediately and are
//! not undone by `rollback`.

mod transactions;
mod wallets;

pub use transactions::MemoryTransactionRepository;
pub use wallets::MemoryWalletRepository;

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex as SyncMutex, PoisonError};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

use crate::domain::{Money, Transaction, UserId, Wallet, WalletId};
use crate::ports::{
    Ledger, RepositoryError, RepositoryResult, TransactionRepository, UnitOfWork,
    WalletRepository,
};

type LockMap = HashMap<UserId, Arc<Mutex<()>>>;

/// One async mutex per key. An entry lives only while some guard holds or
/// waits on it.
#[derive(Debug, Clone, Default)]
pub struct KeyLocks {
    locks: Arc<SyncMutex<LockMap>>,
}

impl KeyLocks {
    pub async fn acquire(&self, key: UserId) -> KeyGuard {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            locks.entry(key).or_default().clone()
        };
        KeyGuard {
            key,
            locks: self.locks.clone(),
            guard: Some(lock.lock_owned().await),
        }
    }

    /// Number of keys currently held or waited on.
    pub fn len(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Held key lock. Dropping it releases the key and forgets the entry when
/// nobody else is queued on it.
#[derive(Debug)]
pub struct KeyGuard {
    key: UserId,
    locks: Arc<SyncMutex<LockMap>>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for KeyGuard {
    fn drop(&mut self) {
        self.guard.take();
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        if locks
            .get(&self.key)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&self.key);
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryLedger {
    wallets: MemoryWalletRepository,
    transactions: MemoryTransactionRepository,
    locks: KeyLocks,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transaction_store(&self) -> &MemoryTransactionRepository {
        &self.transactions
    }

    pub fn key_locks(&self) -> &KeyLocks {
        &self.locks
    }
}

#[async_trait]
impl Ledger for MemoryLedger {
    fn wallets(&self) -> &dyn WalletRepository {
        &self.wallets
    }

    fn transactions(&self) -> &dyn TransactionRepository {
        &self.transactions
    }

    async fn begin(&self) -> RepositoryResult<Box<dyn UnitOfWork>> {
        Ok(Box::new(MemoryUnitOfWork {
            wallets: self.wallets.clone(),
            transactions: self.transactions.clone(),
            locks: self.locks.clone(),
            held: None,
        }))
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

struct MemoryUnitOfWork {
    wallets: MemoryWalletRepository,
    transactions: MemoryTransactionRepository,
    locks: KeyLocks,
    held: Option<(UserId, KeyGuard)>,
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    async fn wallet_for_update(&mut self, user_id: UserId) -> RepositoryResult<Wallet> {
        let already_held = matches!(&self.held, Some((held, _)) if *held == user_id);
        if !already_held {
            if !self.wallets.exists(user_id).await? {
                return Err(RepositoryError::WalletNotFound(user_id));
            }
            // Release any other key first so two units of work can never
            // wait on each other.
            self.held = None;
            let guard = self.locks.acquire(user_id).await;
            debug!(user_id = %user_id, "acquired wallet key lock");
            self.held = Some((user_id, guard));
        }
        self.wallets.find_by_user_id(user_id).await
    }

    async fn update_balance(
        &mut self,
        wallet_id: WalletId,
        balance: Money,
    ) -> RepositoryResult<()> {
        self.wallets.set_balance(wallet_id, balance).await
    }

    async fn insert_transaction(&mut self, transaction: &Transaction) -> RepositoryResult<()> {
        self.transactions.save(transaction).await
    }

    async fn commit(self: Box<Self>) -> RepositoryResult<()> {
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> RepositoryResult<()> {
        Ok(())
    }
}
