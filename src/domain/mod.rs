//! Framework-agnostic wallet domain: value objects, entities and their invariants.

pub mod error;
pub mod ids;
pub mod money;
pub mod transaction;
pub mod wallet;

pub use error::DomainError;
pub use ids::{TransactionId, UserId, WalletId};
pub use money::Money;
pub use transaction::{Transaction, TransactionStatus, TransactionType};
pub use wallet::Wallet;
