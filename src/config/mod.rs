pub mod profiles;

use serde::Deserialize;
use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::domain::{Money, UserId};
use profiles::{Profile, ProfileDefaults};

/// Graceful shutdown budget after SIGINT/SIGTERM.
pub const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Row-locked PostgreSQL tables
    Postgres,
    /// Process-local maps with per-wallet locks
    Memory,
}

impl StorageBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Postgres => "postgres",
            Self::Memory => "memory",
        }
    }
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Ok(Self::Postgres),
            "memory" | "mem" | "in-memory" => Ok(Self::Memory),
            other => anyhow::bail!("unknown storage backend: {}", other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Text,
    Json,
}

impl LogFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Json => "json",
        }
    }
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "pretty" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => anyhow::bail!("unknown log format: {}", other),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub host: String,
    pub server_port: u16,
    pub database_url: Option<String>,
    pub storage_backend: StorageBackend,
    pub debug: bool,
    pub fail_fast_db: bool,
    pub log_format: LogFormat,
    pub request_timeout_secs: u64,
    pub cors_allowed_origins: Option<String>,
    pub seed_wallets: Vec<WalletSeed>,
}

/// Wallet opened at startup on the memory backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct WalletSeed {
    pub user_id: UserId,
    pub balance: Money,
}

/// Parses `SEED_WALLETS`: comma-separated `<user uuid>:<balance>` pairs.
pub fn parse_wallet_seeds(value: &str) -> anyhow::Result<Vec<WalletSeed>> {
    value
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (user_id, balance) = entry.split_once(':').ok_or_else(|| {
                anyhow::anyhow!("SEED_WALLETS entry {:?} must be <user_id>:<balance>", entry)
            })?;
            let user_id = UserId::parse(user_id.trim())
                .map_err(|_| anyhow::anyhow!("SEED_WALLETS has an invalid user id: {:?}", user_id))?;
            let balance = balance
                .trim()
                .parse::<i64>()
                .map_err(|_| anyhow::anyhow!("SEED_WALLETS has an invalid balance: {:?}", balance))
                .and_then(|amount| Money::new(amount).map_err(anyhow::Error::from))?;
            Ok(WalletSeed { user_id, balance })
        })
        .collect()
}

pub struct ConfigInfo {
    pub config: Config,
    pub profile: Profile,
    pub overrides: Vec<String>,
}

/// Command-line values that take precedence over the environment.
#[derive(Debug, Clone, Default)]
pub struct FlagOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub debug: bool,
    pub storage: Option<StorageBackend>,
    pub fail_fast_db: Option<bool>,
}

fn parse_bool(key: &str, value: &str) -> anyhow::Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => anyhow::bail!("{} must be a boolean, got {:?}", key, value),
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<ConfigInfo> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Resolves configuration from `lookup`, falling back to the defaults of
    /// the profile named by `APP_PROFILE`. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<ConfigInfo>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let profile = get("APP_PROFILE")
            .and_then(|v| Profile::parse(&v))
            .unwrap_or(Profile::Development);
        let defaults = ProfileDefaults::for_profile(profile);
        let mut overrides = Vec::new();

        let mut read = |key: &str| {
            let value = get(key);
            if value.is_some() {
                overrides.push(key.to_string());
            }
            value
        };

        let host = read("SERVER_HOST").unwrap_or(defaults.host);

        let server_port = match read("SERVER_PORT") {
            Some(v) => v
                .parse()
                .map_err(|_| anyhow::anyhow!("SERVER_PORT must be a port number, got {:?}", v))?,
            None => defaults.server_port,
        };

        let database_url = read("DATABASE_URL").or(defaults.database_url);

        let storage_backend = match read("STORAGE_BACKEND") {
            Some(v) => v.parse()?,
            None => defaults.storage_backend,
        };

        let debug = match read("DEBUG") {
            Some(v) => parse_bool("DEBUG", &v)?,
            None => defaults.debug,
        };

        let fail_fast_db = match read("FAIL_FAST_DB") {
            Some(v) => parse_bool("FAIL_FAST_DB", &v)?,
            None => defaults.fail_fast_db,
        };

        let log_format = match read("LOG_FORMAT") {
            Some(v) => v.parse()?,
            None => defaults.log_format,
        };

        let request_timeout_secs = match read("REQUEST_TIMEOUT_SECS") {
            Some(v) => v.parse().map_err(|_| {
                anyhow::anyhow!("REQUEST_TIMEOUT_SECS must be a whole number, got {:?}", v)
            })?,
            None => defaults.request_timeout_secs,
        };

        let cors_allowed_origins = read("CORS_ALLOWED_ORIGINS").or(defaults.cors_allowed_origins);

        let seed_wallets = match read("SEED_WALLETS") {
            Some(v) => parse_wallet_seeds(&v)?,
            None => Vec::new(),
        };

        Ok(ConfigInfo {
            config: Config {
                host,
                server_port,
                database_url,
                storage_backend,
                debug,
                fail_fast_db,
                log_format,
                request_timeout_secs,
                cors_allowed_origins,
                seed_wallets,
            },
            profile,
            overrides,
        })
    }

    pub fn apply_flags(&mut self, flags: &FlagOverrides) {
        if let Some(host) = &flags.host {
            self.host = host.clone();
        }
        if let Some(port) = flags.port {
            self.server_port = port;
        }
        if flags.debug {
            self.debug = true;
        }
        if let Some(storage) = flags.storage {
            self.storage_backend = storage;
        }
        if let Some(fail_fast) = flags.fail_fast_db {
            self.fail_fast_db = fail_fast;
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.server_port)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn require_database_url(&self) -> anyhow::Result<&str> {
        self.database_url
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("DATABASE_URL must be set for the postgres backend"))
    }

    /// Fails on the memory backend, whose wallets vanish when the process exits.
    pub fn require_persistent_backend(&self) -> anyhow::Result<()> {
        match self.storage_backend {
            StorageBackend::Postgres => Ok(()),
            StorageBackend::Memory => anyhow::bail!(
                "wallet commands need the postgres backend; in-memory wallets do not outlive the process (use SEED_WALLETS to fund a memory-backed server)"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn resolve(pairs: &[(&str, &str)]) -> anyhow::Result<ConfigInfo> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let info = resolve(&[]).unwrap();
        assert_eq!(info.profile, Profile::Development);
        assert_eq!(info.config.bind_address(), "0.0.0.0:8080");
        assert_eq!(info.config.storage_backend, StorageBackend::Memory);
        assert!(info.config.fail_fast_db);
        assert!(!info.config.debug);
        assert_eq!(info.config.request_timeout(), Duration::from_secs(10));
        assert!(info.overrides.is_empty());
    }

    #[test]
    fn test_env_overrides_profile() {
        let info = resolve(&[
            ("APP_PROFILE", "production"),
            ("SERVER_PORT", "9090"),
            ("DEBUG", "true"),
            ("FAIL_FAST_DB", "false"),
            ("DATABASE_URL", "postgres://u:p@db/wallet"),
        ])
        .unwrap();
        assert_eq!(info.profile, Profile::Production);
        assert_eq!(info.config.server_port, 9090);
        assert_eq!(info.config.storage_backend, StorageBackend::Postgres);
        assert_eq!(info.config.log_format, LogFormat::Json);
        assert!(info.config.debug);
        assert!(!info.config.fail_fast_db);
        assert_eq!(
            info.config.require_database_url().unwrap(),
            "postgres://u:p@db/wallet"
        );
        assert!(info.overrides.contains(&"SERVER_PORT".to_string()));
        assert!(!info.overrides.contains(&"SERVER_HOST".to_string()));
    }

    #[test]
    fn test_invalid_values_are_errors() {
        assert!(resolve(&[("SERVER_PORT", "eighty")]).is_err());
        assert!(resolve(&[("DEBUG", "maybe")]).is_err());
        assert!(resolve(&[("STORAGE_BACKEND", "redis")]).is_err());
    }

    #[test]
    fn test_empty_values_count_as_unset() {
        let info = resolve(&[("SERVER_HOST", ""), ("SERVER_PORT", " ")]).unwrap();
        assert_eq!(info.config.bind_address(), "0.0.0.0:8080");
    }

    #[test]
    fn test_flags_override_env() {
        let mut config = resolve(&[("SERVER_PORT", "9090"), ("STORAGE_BACKEND", "postgres")])
            .unwrap()
            .config;
        config.apply_flags(&FlagOverrides {
            host: Some("127.0.0.1".to_string()),
            port: Some(3000),
            debug: true,
            storage: Some(StorageBackend::Memory),
            fail_fast_db: Some(false),
        });
        assert_eq!(config.bind_address(), "127.0.0.1:3000");
        assert!(config.debug);
        assert_eq!(config.storage_backend, StorageBackend::Memory);
        assert!(!config.fail_fast_db);
    }

    #[test]
    fn test_missing_database_url() {
        let config = resolve(&[]).unwrap().config;
        assert!(config.require_database_url().is_err());
    }

    #[test]
    fn test_memory_backend_is_not_persistent() {
        let mut config = resolve(&[("STORAGE_BACKEND", "memory")]).unwrap().config;
        assert!(config.require_persistent_backend().is_err());
        config.storage_backend = StorageBackend::Postgres;
        assert!(config.require_persistent_backend().is_ok());
    }

    #[test]
    fn test_seed_wallets() {
        let user = UserId::new();
        let other = UserId::new();
        let seeds = format!("{}:500, {}:0,", user, other);
        let info = resolve(&[("SEED_WALLETS", seeds.as_str())]).unwrap();
        assert_eq!(
            info.config.seed_wallets,
            vec![
                WalletSeed {
                    user_id: user,
                    balance: Money::new(500).unwrap(),
                },
                WalletSeed {
                    user_id: other,
                    balance: Money::ZERO,
                },
            ]
        );
        assert!(resolve(&[]).unwrap().config.seed_wallets.is_empty());
    }

    #[test]
    fn test_invalid_seed_wallets_are_errors() {
        let user = UserId::new();
        assert!(parse_wallet_seeds("not-a-uuid:5").is_err());
        assert!(parse_wallet_seeds(&user.to_string()).is_err());
        assert!(parse_wallet_seeds(&format!("{}:-1", user)).is_err());
        assert!(parse_wallet_seeds(&format!("{}:ten", user)).is_err());
    }
}
