use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::{Money, UserId, Wallet, WalletId};
use crate::ports::{RepositoryError, RepositoryResult, WalletRepository};

#[derive(Debug, Default)]
struct WalletMaps {
    by_user: HashMap<UserId, Wallet>,
    owners: HashMap<WalletId, UserId>,
}

/// Wallets keyed by owner, with a storage-id index. The read/write lock is
/// held only for the duration of one map access.
#[derive(Debug, Clone, Default)]
pub struct MemoryWalletRepository {
    wallets: Arc<RwLock<WalletMaps>>,
}

impl MemoryWalletRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rewrites the balance of the wallet with the given storage id.
    pub(crate) async fn set_balance(
        &self,
        wallet_id: WalletId,
        balance: Money,
    ) -> RepositoryResult<()> {
        let mut guard = self.wallets.write().await;
        let maps = &mut *guard;
        let wallet = maps
            .owners
            .get(&wallet_id)
            .and_then(|user_id| maps.by_user.get_mut(user_id))
            .ok_or(RepositoryError::WalletIdNotFound(wallet_id))?;
        *wallet = Wallet::from_parts(wallet_id, wallet.user_id(), balance);
        Ok(())
    }

    pub async fn all(&self) -> Vec<Wallet> {
        self.wallets.read().await.by_user.values().cloned().collect()
    }
}

#[async_trait]
impl WalletRepository for MemoryWalletRepository {
    async fn find_by_user_id(&self, user_id: UserId) -> RepositoryResult<Wallet> {
        self.wallets
            .read()
            .await
            .by_user
            .get(&user_id)
            .cloned()
            .ok_or(RepositoryError::WalletNotFound(user_id))
    }

    async fn create(&self, wallet: &Wallet) -> RepositoryResult<()> {
        let mut maps = self.wallets.write().await;
        if maps.by_user.contains_key(&wallet.user_id()) {
            return Err(RepositoryError::DuplicateWallet(wallet.user_id()));
        }
        maps.owners.insert(wallet.id(), wallet.user_id());
        maps.by_user.insert(wallet.user_id(), wallet.clone());
        Ok(())
    }

    async fn update(&self, wallet: &Wallet) -> RepositoryResult<()> {
        let mut guard = self.wallets.write().await;
        let maps = &mut *guard;
        let stored = maps
            .by_user
            .get_mut(&wallet.user_id())
            .ok_or(RepositoryError::WalletNotFound(wallet.user_id()))?;
        if stored.id() != wallet.id() {
            maps.owners.remove(&stored.id());
            maps.owners.insert(wallet.id(), wallet.user_id());
        }
        *stored = wallet.clone();
        Ok(())
    }

    async fn exists(&self, user_id: UserId) -> RepositoryResult<bool> {
        Ok(self.wallets.read().await.by_user.contains_key(&user_id))
    }
}
