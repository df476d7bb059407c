use clap::{Parser, Subcommand};
use std::path::Path;
use std::sync::Arc;

use wallet_service::config::profiles::Profile;
use wallet_service::config::{Config, FlagOverrides, StorageBackend};
use wallet_service::domain::{Money, TransactionType, UserId};
use wallet_service::ports::{Ledger, Pagination};
use wallet_service::use_cases::{HistoryInput, OpenWallet, OpenWalletInput, TransactionHistory};

pub const MIGRATIONS_DIR: &str = "./migrations";

#[derive(Parser)]
#[command(name = "wallet-service")]
#[command(about = "Wallet Service - withdrawals and balances over HTTP", long_about = None)]
pub struct Cli {
    /// Server host (overrides SERVER_HOST)
    #[arg(long, global = true)]
    pub host: Option<String>,

    /// Server port (overrides SERVER_PORT)
    #[arg(long, global = true)]
    pub port: Option<u16>,

    /// Enable debug logging (overrides DEBUG)
    #[arg(long, global = true)]
    pub debug: bool,

    /// Storage backend (overrides STORAGE_BACKEND)
    #[arg(long, global = true, value_enum)]
    pub storage: Option<StorageBackend>,

    /// Abort startup if the database is unreachable (overrides FAIL_FAST_DB)
    #[arg(long, global = true, value_name = "BOOL")]
    pub fail_fast_db: Option<bool>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    pub fn flag_overrides(&self) -> FlagOverrides {
        FlagOverrides {
            host: self.host.clone(),
            port: self.port,
            debug: self.debug,
            storage: self.storage,
            fail_fast_db: self.fail_fast_db,
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server (default)
    Serve,

    /// Database management commands
    #[command(subcommand)]
    Db(DbCommands),

    /// Print the resolved configuration
    Config,

    /// Wallet administration commands
    #[command(subcommand)]
    Wallet(WalletCommands),
}

#[derive(Subcommand)]
pub enum DbCommands {
    /// Run database migrations
    Migrate,
}

#[derive(Subcommand)]
pub enum WalletCommands {
    /// Open a wallet for a user
    Create {
        /// Owner's user UUID
        #[arg(long, value_name = "UUID")]
        user_id: UserId,

        /// Initial balance in minor units
        #[arg(long, default_value_t = 0)]
        balance: i64,
    },

    /// List a user's transactions, newest first
    History {
        /// Owner's user UUID
        #[arg(long, value_name = "UUID")]
        user_id: UserId,

        #[arg(long, default_value_t = Pagination::DEFAULT_LIMIT)]
        limit: usize,

        #[arg(long, default_value_t = 0)]
        offset: usize,

        /// Only show WITHDRAWAL or DEPOSIT records
        #[arg(long = "type", value_name = "TYPE")]
        transaction_type: Option<TransactionType>,
    },
}

pub async fn handle_db_migrate(config: &Config) -> anyhow::Result<()> {
    let pool = wallet_service::db::create_pool(config.require_database_url()?).await?;

    tracing::info!("Running database migrations...");
    wallet_service::db::run_migrations(&pool, Path::new(MIGRATIONS_DIR)).await?;
    println!("✓ Database migrations completed");

    Ok(())
}

pub fn handle_config_validate(
    config: &Config,
    profile: Profile,
    overrides: &[String],
) -> anyhow::Result<()> {
    tracing::info!("Validating configuration...");

    println!("Configuration:");
    println!("  Profile: {}", profile.as_str());
    println!("  Bind Address: {}", config.bind_address());
    println!("  Storage Backend: {}", config.storage_backend);
    println!(
        "  Database URL: {}",
        config
            .database_url
            .as_deref()
            .map(mask_password)
            .unwrap_or_else(|| "(not set)".to_string())
    );
    println!("  Debug: {}", config.debug);
    println!("  Fail Fast DB: {}", config.fail_fast_db);
    println!("  Log Format: {}", config.log_format.as_str());
    println!("  Request Timeout: {}s", config.request_timeout_secs);
    if !config.seed_wallets.is_empty() {
        println!("  Seed Wallets: {}", config.seed_wallets.len());
    }
    if !overrides.is_empty() {
        println!("  Environment Overrides: {}", overrides.join(", "));
    }

    if config.storage_backend == StorageBackend::Postgres {
        config.require_database_url()?;
    }

    tracing::info!("Configuration is valid");
    println!("✓ Configuration is valid");

    Ok(())
}

pub async fn handle_wallet_create(
    ledger: Arc<dyn Ledger>,
    user_id: UserId,
    balance: i64,
) -> anyhow::Result<()> {
    let initial_balance = Money::new(balance)?;
    let wallet = OpenWallet::new(ledger)
        .execute(OpenWalletInput {
            user_id,
            initial_balance,
        })
        .await?;

    println!(
        "✓ Wallet {} opened for user {} with balance {}",
        wallet.id(),
        wallet.user_id(),
        wallet.balance()
    );
    Ok(())
}

pub async fn handle_wallet_history(
    ledger: Arc<dyn Ledger>,
    user_id: UserId,
    page: Pagination,
    transaction_type: Option<TransactionType>,
) -> anyhow::Result<()> {
    let history = TransactionHistory::new(ledger)
        .execute(HistoryInput {
            user_id,
            transaction_type,
            page,
        })
        .await?;

    println!(
        "Wallet {} ({} transactions total)",
        history.wallet_id, history.total
    );
    if history.transactions.is_empty() {
        println!("  (no transactions in range)");
    }
    for tx in &history.transactions {
        println!(
            "  {} | {} | {} | {} | {}",
            tx.created_at().to_rfc3339(),
            tx.transaction_type(),
            tx.amount(),
            tx.status(),
            tx.id()
        );
    }
    Ok(())
}

fn mask_password(url: &str) -> String {
    if let Some(at_pos) = url.rfind('@') {
        if let Some(colon_pos) = url[..at_pos].rfind(':') {
            if let Some(slash_pos) = url[..colon_pos].rfind("//") {
                let prefix = &url[..slash_pos + 2];
                let user = &url[slash_pos + 2..colon_pos];
                let suffix = &url[at_pos..];
                return format!("{}{}:****{}", prefix, user, suffix);
            }
        }
    }
    url.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_password() {
        assert_eq!(
            mask_password("postgres://wallet:secret@db:5432/wallet"),
            "postgres://wallet:****@db:5432/wallet"
        );
        assert_eq!(
            mask_password("postgres://db:5432/wallet"),
            "postgres://db:5432/wallet"
        );
    }

    #[test]
    fn test_global_flags_parse_after_subcommand() {
        let cli = Cli::try_parse_from([
            "wallet-service",
            "serve",
            "--port",
            "9000",
            "--storage",
            "memory",
            "--fail-fast-db",
            "false",
        ])
        .unwrap();
        let flags = cli.flag_overrides();
        assert_eq!(flags.port, Some(9000));
        assert_eq!(flags.storage, Some(StorageBackend::Memory));
        assert_eq!(flags.fail_fast_db, Some(false));
        assert!(matches!(cli.command, Some(Commands::Serve)));
    }

    #[test]
    fn test_history_type_filter_parses() {
        let user = UserId::new().to_string();
        let cli = Cli::try_parse_from([
            "wallet-service",
            "wallet",
            "history",
            "--user-id",
            &user,
            "--type",
            "withdrawal",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Wallet(WalletCommands::History {
                transaction_type,
                limit,
                ..
            })) => {
                assert_eq!(transaction_type, Some(TransactionType::Withdrawal));
                assert_eq!(limit, Pagination::DEFAULT_LIMIT);
            }
            _ => panic!("expected wallet history"),
        }
    }
}
