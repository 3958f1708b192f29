//! Console configuration

use eyre::{eyre, Result};
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use xport_rs::redact::Redacted;
use xport_rs::status::{DEFAULT_STATUS_URL, MIN_POLL_INTERVAL};

/// Console configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Sepolia JSON-RPC endpoint override (registry default when unset)
    pub sepolia_rpc_url: Option<String>,
    /// VeChain Thor REST endpoint override (registry default when unset)
    pub vechain_node_url: Option<String>,

    /// Signs for the account-model wallet; the wallet is unavailable without it
    pub account_private_key: Option<Redacted<String>>,
    /// Signs for the clause-model wallet; the wallet is unavailable without it
    pub clause_private_key: Option<Redacted<String>>,

    /// Bridge status API base URL
    pub status_url: String,
    /// Delay between status polls in milliseconds
    pub status_poll_interval_ms: u64,

    /// How long to wait for a submitted transaction to be mined
    pub confirmation_timeout_secs: u64,

    /// JSON file holding cached contract addresses
    pub address_cache_path: PathBuf,
    /// Directory with MockErc20.json, Erc20TokenHome.json, Erc20TokenRemote.json
    pub artifacts_dir: PathBuf,
}

fn optional(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_or<T: std::str::FromStr>(name: &str, default: T) -> Result<T> {
    match optional(name) {
        Some(v) => v.parse().map_err(|_| eyre!("Invalid {}: {}", name, v)),
        None => Ok(default),
    }
}

impl Config {
    /// Load configuration from environment, reading `.env` first if present
    pub fn load() -> Result<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!("Loaded .env from {:?}", path);
        }
        Self::from_env()
    }

    /// Load configuration from the process environment only
    pub fn from_env() -> Result<Self> {
        let config = Self {
            sepolia_rpc_url: optional("SEPOLIA_RPC_URL"),
            vechain_node_url: optional("VECHAIN_NODE_URL"),

            account_private_key: optional("ACCOUNT_PRIVATE_KEY").map(Redacted::new),
            clause_private_key: optional("CLAUSE_PRIVATE_KEY").map(Redacted::new),

            status_url: optional("BRIDGE_STATUS_URL")
                .unwrap_or_else(|| DEFAULT_STATUS_URL.to_string()),
            status_poll_interval_ms: parse_or("STATUS_POLL_INTERVAL_MS", 5000)?,

            confirmation_timeout_secs: parse_or("CONFIRMATION_TIMEOUT_SECS", 180)?,

            address_cache_path: optional("ADDRESS_CACHE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(".xport/cache.json")),
            artifacts_dir: optional("ARTIFACTS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("abis")),
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.status_poll_interval() < MIN_POLL_INTERVAL {
            return Err(eyre!(
                "STATUS_POLL_INTERVAL_MS must be at least {}",
                MIN_POLL_INTERVAL.as_millis()
            ));
        }
        if self.confirmation_timeout_secs == 0 {
            return Err(eyre!("CONFIRMATION_TIMEOUT_SECS must be greater than zero"));
        }
        Ok(())
    }

    pub fn status_poll_interval(&self) -> Duration {
        Duration::from_millis(self.status_poll_interval_ms)
    }

    pub fn confirmation_timeout(&self) -> Duration {
        Duration::from_secs(self.confirmation_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: &[&str] = &[
        "SEPOLIA_RPC_URL",
        "VECHAIN_NODE_URL",
        "ACCOUNT_PRIVATE_KEY",
        "CLAUSE_PRIVATE_KEY",
        "BRIDGE_STATUS_URL",
        "STATUS_POLL_INTERVAL_MS",
        "CONFIRMATION_TIMEOUT_SECS",
        "ADDRESS_CACHE_PATH",
        "ARTIFACTS_DIR",
    ];

    fn clear_env() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn test_defaults() {
        clear_env();
        let config = Config::from_env().unwrap();

        assert!(config.sepolia_rpc_url.is_none());
        assert!(config.account_private_key.is_none());
        assert_eq!(config.status_url, "https://bridge-api.wanchain.org");
        assert_eq!(config.status_poll_interval(), Duration::from_secs(5));
        assert_eq!(config.confirmation_timeout(), Duration::from_secs(180));
        assert_eq!(config.address_cache_path, PathBuf::from(".xport/cache.json"));
        assert_eq!(config.artifacts_dir, PathBuf::from("abis"));
    }

    #[test]
    #[serial]
    fn test_keys_are_redacted_in_debug() {
        clear_env();
        env::set_var("ACCOUNT_PRIVATE_KEY", "0xac0974bec39a17e36ba4a6b4d238ff944bacb478");
        let config = Config::from_env().unwrap();
        clear_env();

        let dump = format!("{:?}", config);
        assert!(!dump.contains("ac0974"));
        assert!(dump.contains("<redacted>"));
        assert!(config.account_private_key.is_some());
        assert!(config.clause_private_key.is_none());
    }

    #[test]
    #[serial]
    fn test_blank_values_count_as_unset() {
        clear_env();
        env::set_var("CLAUSE_PRIVATE_KEY", "   ");
        env::set_var("SEPOLIA_RPC_URL", "");
        let config = Config::from_env().unwrap();
        clear_env();

        assert!(config.clause_private_key.is_none());
        assert!(config.sepolia_rpc_url.is_none());
    }

    #[test]
    #[serial]
    fn test_invalid_numbers_fail() {
        clear_env();
        env::set_var("STATUS_POLL_INTERVAL_MS", "soon");
        assert!(Config::from_env().is_err());

        env::set_var("STATUS_POLL_INTERVAL_MS", "0");
        assert!(Config::from_env().is_err());
        clear_env();
    }

    #[test]
    #[serial]
    fn test_poll_interval_floor() {
        clear_env();
        env::set_var("STATUS_POLL_INTERVAL_MS", "100");
        assert!(Config::from_env().is_err());

        env::set_var("STATUS_POLL_INTERVAL_MS", "4999");
        assert!(Config::from_env().is_err());

        env::set_var("STATUS_POLL_INTERVAL_MS", "5000");
        let config = Config::from_env().unwrap();
        clear_env();
        assert_eq!(config.status_poll_interval(), Duration::from_secs(5));
    }
}
