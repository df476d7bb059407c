//! Transaction domain entity.
//! Immutable audit record of a balance movement on a wallet.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::{Money, TransactionId, WalletId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    Withdrawal,
    Deposit,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Withdrawal => "WITHDRAWAL",
            Self::Deposit => "DEPOSIT",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "WITHDRAWAL" => Ok(Self::Withdrawal),
            "DEPOSIT" => Ok(Self::Deposit),
            other => Err(format!("unknown transaction type: {}", other)),
        }
    }
}

/// Only `Pending` is ever assigned today; the other states are carried for
/// storage compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "PENDING" => Ok(Self::Pending),
            "COMPLETED" => Ok(Self::Completed),
            "FAILED" => Ok(Self::Failed),
            other => Err(format!("unknown transaction status: {}", other)),
        }
    }
}

/// Snapshot of one movement. Holds the wallet id and amount by value, never
/// a reference into mutable wallet state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    id: TransactionId,
    wallet_id: WalletId,
    transaction_type: TransactionType,
    amount: Money,
    status: TransactionStatus,
    failure_reason: Option<String>,
    created_at: DateTime<Utc>,
}

impl Transaction {
    pub fn new(wallet_id: WalletId, transaction_type: TransactionType, amount: Money) -> Self {
        Self {
            id: TransactionId::new(),
            wallet_id,
            transaction_type,
            amount,
            status: TransactionStatus::Pending,
            failure_reason: None,
            created_at: Utc::now(),
        }
    }

    pub fn from_parts(
        id: TransactionId,
        wallet_id: WalletId,
        transaction_type: TransactionType,
        amount: Money,
        status: TransactionStatus,
        failure_reason: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            wallet_id,
            transaction_type,
            amount,
            status,
            failure_reason,
            created_at,
        }
    }

    pub fn id(&self) -> TransactionId {
        self.id
    }

    pub fn wallet_id(&self) -> WalletId {
        self.wallet_id
    }

    pub fn transaction_type(&self) -> TransactionType {
        self.transaction_type
    }

    pub fn amount(&self) -> Money {
        self.amount
    }

    pub fn status(&self) -> TransactionStatus {
        self.status
    }

    pub fn failure_reason(&self) -> Option<&str> {
        self.failure_reason.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
