//! Withdraw use case.
//!
//! Runs one withdrawal as a single unit of work:
//! `Started -> WalletLocated -> BalanceChecked -> BalanceUpdated ->
//! TransactionRecorded -> Committed`. Any failure rolls the unit of work
//! back and surfaces as a [`WithdrawError`]; nothing is retried.

use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::domain::{DomainError, Money, Transaction, TransactionType, UserId};
use crate::ports::{Ledger, RepositoryError, UnitOfWork};

/// Last stage a withdrawal reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WithdrawStage {
    Started,
    WalletLocated,
    BalanceChecked,
    BalanceUpdated,
    TransactionRecorded,
    Committed,
}

impl fmt::Display for WithdrawStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Started => "started",
            Self::WalletLocated => "wallet_located",
            Self::BalanceChecked => "balance_checked",
            Self::BalanceUpdated => "balance_updated",
            Self::TransactionRecorded => "transaction_recorded",
            Self::Committed => "committed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WithdrawError {
    #[error("wallet not found for user {0}")]
    WalletNotFound(UserId),

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("insufficient funds: available {available}, requested {requested}")]
    InsufficientFunds { available: Money, requested: Money },

    #[error("storage failure after stage {stage}: {source}")]
    Persistence {
        stage: WithdrawStage,
        #[source]
        source: RepositoryError,
    },

    #[error("failed to record transaction: {0}")]
    TransactionRecord(#[source] RepositoryError),
}

impl WithdrawError {
    /// Short caller-facing reason. Never includes storage error text.
    pub fn message(&self) -> &'static str {
        match self {
            Self::WalletNotFound(_) => "wallet not found",
            Self::InvalidAmount(_) => "invalid amount",
            Self::InsufficientFunds { .. } => "insufficient funds",
            Self::Persistence { stage, .. } => match stage {
                WithdrawStage::Started => "failed to begin transaction",
                WithdrawStage::BalanceChecked => "failed to update wallet balance",
                WithdrawStage::TransactionRecorded => "failed to commit transaction",
                _ => "storage failure",
            },
            Self::TransactionRecord(_) => "failed to record transaction",
        }
    }
}

impl From<DomainError> for WithdrawError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::InvalidAmount(reason) => Self::InvalidAmount(reason),
            DomainError::InsufficientFunds {
                available,
                requested,
            } => Self::InsufficientFunds {
                available,
                requested,
            },
            // Ids are parsed before a withdrawal is built; only the wallet's
            // own checks reach this conversion.
            other @ DomainError::InvalidUserId => Self::InvalidAmount(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct WithdrawInput {
    pub user_id: UserId,
    pub amount: Money,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WithdrawOutput {
    pub user_id: UserId,
    pub amount_withdrawn: Money,
    pub new_balance: Money,
}

pub struct Withdraw {
    ledger: Arc<dyn Ledger>,
}

impl Withdraw {
    pub fn new(ledger: Arc<dyn Ledger>) -> Self {
        Self { ledger }
    }

    pub async fn execute(&self, input: WithdrawInput) -> Result<WithdrawOutput, WithdrawError> {
        let WithdrawInput { user_id, amount } = input;

        let mut uow = self
            .ledger
            .begin()
            .await
            .map_err(|source| WithdrawError::Persistence {
                stage: WithdrawStage::Started,
                source,
            })?;

        match apply(uow.as_mut(), user_id, amount).await {
            Ok(output) => {
                uow.commit()
                    .await
                    .map_err(|source| WithdrawError::Persistence {
                        stage: WithdrawStage::TransactionRecorded,
                        source,
                    })?;
                info!(
                    user_id = %user_id,
                    amount = %amount,
                    new_balance = %output.new_balance,
                    stage = %WithdrawStage::Committed,
                    "Withdrawal committed"
                );
                Ok(output)
            }
            Err(err) => {
                if let Err(rollback_err) = uow.rollback().await {
                    error!(user_id = %user_id, "Failed to roll back withdrawal: {}", rollback_err);
                }
                match &err {
                    WithdrawError::Persistence { .. } | WithdrawError::TransactionRecord(_) => {
                        error!(user_id = %user_id, amount = %amount, "Withdrawal failed: {}", err)
                    }
                    _ => warn!(user_id = %user_id, amount = %amount, "Withdrawal rejected: {}", err),
                }
                Err(err)
            }
        }
    }
}

async fn apply(
    uow: &mut dyn UnitOfWork,
    user_id: UserId,
    amount: Money,
) -> Result<WithdrawOutput, WithdrawError> {
    let mut wallet = uow
        .wallet_for_update(user_id)
        .await
        .map_err(|err| match err {
            RepositoryError::WalletNotFound(_) => WithdrawError::WalletNotFound(user_id),
            source => WithdrawError::Persistence {
                stage: WithdrawStage::Started,
                source,
            },
        })?;
    debug!(user_id = %user_id, wallet_id = %wallet.id(), stage = %WithdrawStage::WalletLocated, "Wallet locked");

    wallet.withdraw(amount)?;
    debug!(wallet_id = %wallet.id(), stage = %WithdrawStage::BalanceChecked, "Balance checked");

    uow.update_balance(wallet.id(), wallet.balance())
        .await
        .map_err(|source| WithdrawError::Persistence {
            stage: WithdrawStage::BalanceChecked,
            source,
        })?;
    debug!(wallet_id = %wallet.id(), stage = %WithdrawStage::BalanceUpdated, "Balance updated");

    let record = Transaction::new(wallet.id(), TransactionType::Withdrawal, amount);
    uow.insert_transaction(&record)
        .await
        .map_err(WithdrawError::TransactionRecord)?;
    debug!(
        wallet_id = %wallet.id(),
        transaction_id = %record.id(),
        stage = %WithdrawStage::TransactionRecorded,
        "Transaction recorded"
    );

    Ok(WithdrawOutput {
        user_id,
        amount_withdrawn: amount,
        new_balance: wallet.balance(),
    })
}
