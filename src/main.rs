mod cli;

use anyhow::Context;
use clap::Parser;
use std::path::Path;
use std::sync::Arc;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use cli::{Cli, Commands, DbCommands, WalletCommands};
use wallet_service::config::{Config, LogFormat, StorageBackend, SHUTDOWN_TIMEOUT};
use wallet_service::db::{self, PgLedger};
use wallet_service::ports::{Ledger, Pagination};
use wallet_service::store::MemoryLedger;
use wallet_service::use_cases::{OpenWallet, OpenWalletInput};
use wallet_service::{cors_layer, create_app, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config_info = Config::from_env()?;
    let mut config = config_info.config;
    config.apply_flags(&cli.flag_overrides());

    init_tracing(&config);

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(config).await,
        Commands::Db(DbCommands::Migrate) => cli::handle_db_migrate(&config).await,
        Commands::Config => {
            cli::handle_config_validate(&config, config_info.profile, &config_info.overrides)
        }
        Commands::Wallet(command) => {
            config.require_persistent_backend()?;
            let ledger = build_ledger(&config).await?;
            match command {
                WalletCommands::Create { user_id, balance } => {
                    cli::handle_wallet_create(ledger, user_id, balance).await
                }
                WalletCommands::History {
                    user_id,
                    limit,
                    offset,
                    transaction_type,
                } => {
                    cli::handle_wallet_history(
                        ledger,
                        user_id,
                        Pagination::new(limit, offset),
                        transaction_type,
                    )
                    .await
                }
            }
        }
    }
}

fn init_tracing(config: &Config) {
    let default_level = if config.debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let registry = tracing_subscriber::registry().with(filter);

    match config.log_format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

async fn build_ledger(config: &Config) -> anyhow::Result<Arc<dyn Ledger>> {
    match config.storage_backend {
        StorageBackend::Memory => {
            tracing::info!("Using in-memory storage; state is lost on exit");
            let ledger: Arc<dyn Ledger> = Arc::new(MemoryLedger::new());
            let open_wallet = OpenWallet::new(ledger.clone());
            for seed in &config.seed_wallets {
                open_wallet
                    .execute(OpenWalletInput {
                        user_id: seed.user_id,
                        initial_balance: seed.balance,
                    })
                    .await
                    .with_context(|| format!("failed to seed wallet for user {}", seed.user_id))?;
            }
            Ok(ledger)
        }
        StorageBackend::Postgres => {
            if !config.seed_wallets.is_empty() {
                tracing::warn!("SEED_WALLETS only applies to the memory backend; ignoring");
            }
            let url = config.require_database_url()?;
            let pool = match db::create_pool(url).await {
                Ok(pool) => {
                    db::run_migrations(&pool, Path::new(cli::MIGRATIONS_DIR)).await?;
                    pool
                }
                Err(err) if !config.fail_fast_db => {
                    tracing::warn!(
                        "Database unreachable ({}); continuing with a lazy pool, migrations skipped",
                        err
                    );
                    db::create_lazy_pool(url)?
                }
                Err(err) => return Err(err).context("failed to connect to database"),
            };
            tracing::info!("Database connection established");
            Ok(Arc::new(PgLedger::new(pool)))
        }
    }
}

async fn serve(config: Config) -> anyhow::Result<()> {
    let ledger = build_ledger(&config).await?;
    let backend = ledger.backend();

    let mut app = create_app(AppState::new(ledger, config.request_timeout()));
    if let Some(origins) = &config.cors_allowed_origins {
        app = app.layer(cors_layer(origins));
    }

    let bind_address = config.bind_address();
    let addr = tokio::net::lookup_host(bind_address.as_str())
        .await?
        .next()
        .with_context(|| format!("could not resolve {}", bind_address))?;

    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
    let server = axum::Server::try_bind(&addr)?
        .serve(app.into_make_service())
        .with_graceful_shutdown(async {
            stop_rx.await.ok();
        });
    tracing::info!(backend = backend, "listening on {}", addr);

    tokio::pin!(server);
    tokio::select! {
        result = &mut server => result?,
        _ = shutdown_signal() => {
            tracing::info!("Shutdown signal received, draining connections");
            stop_tx.send(()).ok();
            match tokio::time::timeout(SHUTDOWN_TIMEOUT, &mut server).await {
                Ok(result) => result?,
                Err(_) => tracing::warn!(
                    "Graceful shutdown exceeded {}s, exiting",
                    SHUTDOWN_TIMEOUT.as_secs()
                ),
            }
        }
    }

    tracing::info!("Server stopped");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                tracing::error!("Failed to install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
