pub mod get_balance;
pub mod open_wallet;
pub mod transaction_history;
pub mod withdraw;

pub use get_balance::{BalanceOutput, GetBalance};
pub use open_wallet::{OpenWallet, OpenWalletInput};
pub use transaction_history::{HistoryInput, HistoryOutput, TransactionHistory};
pub use withdraw::{Withdraw, WithdrawError, WithdrawInput, WithdrawOutput, WithdrawStage};
