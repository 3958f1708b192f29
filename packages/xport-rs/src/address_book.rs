//! Address Book
//!
//! User-entered contract addresses, cached in a small key-value store so
//! they survive restarts. Two fixed keys are used:
//!
//! - `contractAddresses` - JSON object `{mockERC20, erc20TokenHome, erc20TokenRemote}`
//! - `wmbGatewayAddress` - the gateway address as a plain string
//!
//! Addresses are kept as entered; validation happens when an operation uses
//! them so a half-typed value can still be cached.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Mutex;

use eyre::{eyre, Result, WrapErr};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub const CONTRACT_ADDRESSES_KEY: &str = "contractAddresses";
pub const GATEWAY_ADDRESS_KEY: &str = "wmbGatewayAddress";

/// Persistent string key-value cache
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// JSON object file, rewritten on every `set`
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Where a cache that no longer parses is moved before being rewritten
    pub fn backup_path(&self) -> PathBuf {
        let mut name = self.path.clone().into_os_string();
        name.push(".bak");
        PathBuf::from(name)
    }

    fn read_raw(&self) -> Result<Option<String>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let raw = std::fs::read_to_string(&self.path)
            .wrap_err_with(|| format!("Failed to read {}", self.path.display()))?;
        Ok(Some(raw).filter(|r| !r.trim().is_empty()))
    }

    fn load(&self) -> Result<HashMap<String, String>> {
        match self.read_raw()? {
            Some(raw) => serde_json::from_str(&raw)
                .wrap_err_with(|| format!("Malformed address cache {}", self.path.display())),
            None => Ok(HashMap::new()),
        }
    }

    /// Entries to rewrite on `set`; a cache that does not parse is kept aside
    fn load_for_update(&self) -> Result<HashMap<String, String>> {
        let raw = match self.read_raw()? {
            Some(raw) => raw,
            None => return Ok(HashMap::new()),
        };
        match serde_json::from_str(&raw) {
            Ok(entries) => Ok(entries),
            Err(e) => {
                let backup = self.backup_path();
                std::fs::rename(&self.path, &backup)
                    .wrap_err_with(|| format!("Failed to back up {}", self.path.display()))?;
                warn!(
                    error = %e,
                    backup = %backup.display(),
                    "Address cache was malformed, moved aside"
                );
                Ok(HashMap::new())
            }
        }
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.load()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.load_for_update()?;
        entries.insert(key.to_string(), value.to_string());

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .wrap_err_with(|| format!("Failed to create {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(&entries)?;
        std::fs::write(&self.path, json)
            .wrap_err_with(|| format!("Failed to write {}", self.path.display()))?;
        debug!(key = key, path = %self.path.display(), "Address cache updated");
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self.entries.lock().map_err(|_| eyre!("store poisoned"))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.lock().map_err(|_| eyre!("store poisoned"))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Logical contract roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContractRole {
    MockErc20,
    TokenHome,
    TokenRemote,
    Gateway,
}

impl ContractRole {
    pub const ALL: [ContractRole; 4] = [
        ContractRole::MockErc20,
        ContractRole::TokenHome,
        ContractRole::TokenRemote,
        ContractRole::Gateway,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            ContractRole::MockErc20 => "mockERC20",
            ContractRole::TokenHome => "erc20TokenHome",
            ContractRole::TokenRemote => "erc20TokenRemote",
            ContractRole::Gateway => "wmbGateway",
        }
    }
}

impl fmt::Display for ContractRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for ContractRole {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "mockERC20" | "mock-erc20" => Ok(ContractRole::MockErc20),
            "erc20TokenHome" | "token-home" => Ok(ContractRole::TokenHome),
            "erc20TokenRemote" | "token-remote" => Ok(ContractRole::TokenRemote),
            "wmbGateway" | "gateway" => Ok(ContractRole::Gateway),
            other => Err(format!("unknown contract role '{}'", other)),
        }
    }
}

/// The four externally deployed contracts, by role
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractAddressSet {
    #[serde(rename = "mockERC20", default)]
    pub mock_erc20: String,
    #[serde(rename = "erc20TokenHome", default)]
    pub token_home: String,
    #[serde(rename = "erc20TokenRemote", default)]
    pub token_remote: String,
    /// Cached under its own key
    #[serde(skip)]
    pub gateway: String,
}

impl ContractAddressSet {
    pub fn get(&self, role: ContractRole) -> &str {
        match role {
            ContractRole::MockErc20 => &self.mock_erc20,
            ContractRole::TokenHome => &self.token_home,
            ContractRole::TokenRemote => &self.token_remote,
            ContractRole::Gateway => &self.gateway,
        }
    }

    fn slot(&mut self, role: ContractRole) -> &mut String {
        match role {
            ContractRole::MockErc20 => &mut self.mock_erc20,
            ContractRole::TokenHome => &mut self.token_home,
            ContractRole::TokenRemote => &mut self.token_remote,
            ContractRole::Gateway => &mut self.gateway,
        }
    }
}

/// Start-up overrides (the console's flags, a browser's URL parameters)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressOverrides {
    pub mock_erc20: Option<String>,
    pub token_home: Option<String>,
    pub token_remote: Option<String>,
    pub gateway: Option<String>,
}

impl AddressOverrides {
    fn has_token_overrides(&self) -> bool {
        self.mock_erc20.is_some() || self.token_home.is_some() || self.token_remote.is_some()
    }
}

pub struct AddressBook {
    store: Box<dyn KeyValueStore>,
    addresses: Mutex<ContractAddressSet>,
}

impl AddressBook {
    /// Load addresses: token overrides, if any are given, replace the cached
    /// token addresses entirely; otherwise the cache is used. The gateway
    /// override applies independently.
    pub fn load(store: Box<dyn KeyValueStore>, overrides: &AddressOverrides) -> Self {
        let mut addresses = if overrides.has_token_overrides() {
            ContractAddressSet {
                mock_erc20: overrides.mock_erc20.clone().unwrap_or_default(),
                token_home: overrides.token_home.clone().unwrap_or_default(),
                token_remote: overrides.token_remote.clone().unwrap_or_default(),
                gateway: String::new(),
            }
        } else {
            match store.get(CONTRACT_ADDRESSES_KEY) {
                Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                    warn!(error = %e, "Ignoring malformed cached contract addresses");
                    ContractAddressSet::default()
                }),
                Ok(None) => ContractAddressSet::default(),
                Err(e) => {
                    warn!(error = %e, "Failed to read cached contract addresses");
                    ContractAddressSet::default()
                }
            }
        };

        addresses.gateway = match &overrides.gateway {
            Some(gateway) => gateway.clone(),
            None => store
                .get(GATEWAY_ADDRESS_KEY)
                .unwrap_or_else(|e| {
                    warn!(error = %e, "Failed to read cached gateway address");
                    None
                })
                .unwrap_or_default(),
        };

        Self {
            store,
            addresses: Mutex::new(addresses),
        }
    }

    pub fn addresses(&self) -> ContractAddressSet {
        self.addresses
            .lock()
            .map(|a| a.clone())
            .unwrap_or_default()
    }

    pub fn get(&self, role: ContractRole) -> String {
        self.addresses().get(role).to_string()
    }

    /// Update one role and write the change through to the store
    pub fn set(&self, role: ContractRole, value: &str) -> Result<()> {
        let snapshot = {
            let mut addresses = self
                .addresses
                .lock()
                .map_err(|_| eyre!("address book poisoned"))?;
            *addresses.slot(role) = value.trim().to_string();
            addresses.clone()
        };

        match role {
            ContractRole::Gateway => self.store.set(GATEWAY_ADDRESS_KEY, &snapshot.gateway),
            _ => self
                .store
                .set(CONTRACT_ADDRESSES_KEY, &serde_json::to_string(&snapshot)?),
        }
    }
}
