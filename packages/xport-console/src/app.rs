//! Application state
//!
//! Everything a console command needs, built once at startup and passed by
//! reference. Wallets start disconnected; commands connect the kind they
//! need.

use std::sync::Arc;

use eyre::{Result, WrapErr};
use tracing::info;
use xport_rs::address_book::{AddressBook, AddressOverrides, FileStore, KeyValueStore};
use xport_rs::deploy::Deployer;
use xport_rs::evm::{ChainReader, RpcReader};
use xport_rs::status::{HttpStatusSource, StatusSource};
use xport_rs::thor::{ThorClauseBackend, ThorClient};
use xport_rs::wallet::{
    account, clause, AccountWallet, ClauseBackend, ClauseWallet, Eip1193Provider,
    LocalEip1193Provider,
};
use xport_rs::{
    BridgeFlow, ChainRegistry, StatusPoller, Submitter, WalletBackend, WalletHub, WalletKind,
    SEPOLIA_CHAIN_ID, VECHAIN_TESTNET_CHAIN_ID,
};

use crate::config::Config;

/// External seams, real or test doubles
pub struct Parts {
    pub registry: ChainRegistry,
    pub account_provider: Option<Arc<dyn Eip1193Provider>>,
    pub clause_backend: Option<Arc<dyn ClauseBackend>>,
    pub sepolia: Arc<dyn ChainReader>,
    pub vechain: Arc<dyn ChainReader>,
    pub status_source: Arc<dyn StatusSource>,
    pub store: Box<dyn KeyValueStore>,
}

pub struct AppState {
    pub config: Config,
    pub registry: ChainRegistry,
    pub wallets: Arc<WalletHub>,
    pub submitter: Arc<Submitter>,
    pub poller: StatusPoller,
    pub book: Arc<AddressBook>,
    pub deployer: Deployer,
    pub bridge: BridgeFlow,
    pub sepolia: Arc<dyn ChainReader>,
    pub vechain: Arc<dyn ChainReader>,
}

impl AppState {
    /// Wire up real network clients from `config`
    pub fn build(config: Config, overrides: &AddressOverrides) -> Result<Self> {
        let mut registry = ChainRegistry::testnets();
        if let Some(url) = &config.sepolia_rpc_url {
            registry = registry.with_rpc_override(SEPOLIA_CHAIN_ID, url);
        }
        if let Some(url) = &config.vechain_node_url {
            registry = registry.with_node_override(VECHAIN_TESTNET_CHAIN_ID, url);
        }

        let sepolia_url = endpoint(&registry, SEPOLIA_CHAIN_ID)?;
        let thor_url = node_endpoint(&registry, VECHAIN_TESTNET_CHAIN_ID)?;

        let sepolia = Arc::new(RpcReader::new(&sepolia_url, SEPOLIA_CHAIN_ID)?);
        let thor = ThorClient::new(&thor_url)?;

        let account_provider: Option<Arc<dyn Eip1193Provider>> = match &config.account_private_key {
            Some(key) => Some(Arc::new(
                LocalEip1193Provider::new(key.expose(), SEPOLIA_CHAIN_ID, &sepolia_url)
                    .wrap_err("Invalid ACCOUNT_PRIVATE_KEY")?,
            )),
            None => None,
        };
        let clause_backend: Option<Arc<dyn ClauseBackend>> = match &config.clause_private_key {
            Some(key) => Some(Arc::new(
                ThorClauseBackend::new(thor.clone(), key.expose(), VECHAIN_TESTNET_CHAIN_ID)
                    .wrap_err("Invalid CLAUSE_PRIVATE_KEY")?,
            )),
            None => None,
        };

        let status_source = Arc::new(HttpStatusSource::new(&config.status_url)?);
        let store = Box::new(FileStore::new(config.address_cache_path.clone()));

        let parts = Parts {
            registry,
            account_provider,
            clause_backend,
            sepolia,
            vechain: Arc::new(thor),
            status_source,
            store,
        };
        Ok(Self::assemble(config, parts, overrides))
    }

    /// Build the service graph around already constructed seams
    pub fn assemble(config: Config, parts: Parts, overrides: &AddressOverrides) -> Self {
        let mut account_confirmation = account::default_confirmation();
        account_confirmation.timeout = config.confirmation_timeout();
        let mut clause_confirmation = clause::default_confirmation();
        clause_confirmation.timeout = config.confirmation_timeout();

        let account: Arc<dyn WalletBackend> = Arc::new(AccountWallet::new(
            parts.account_provider,
            parts.registry.clone(),
            account_confirmation,
        ));
        let clause: Arc<dyn WalletBackend> =
            Arc::new(ClauseWallet::new(parts.clause_backend, clause_confirmation));

        let wallets = Arc::new(WalletHub::new(Some(account), Some(clause)));
        let submitter = Arc::new(Submitter::new(wallets.clone()));
        let book = Arc::new(AddressBook::load(parts.store, overrides));
        let poller = StatusPoller::new(parts.status_source, config.status_poll_interval());

        let deployer = Deployer::new(submitter.clone(), book.clone(), parts.vechain.clone());
        let bridge = BridgeFlow::new(
            submitter.clone(),
            book.clone(),
            parts.sepolia.clone(),
            parts.vechain.clone(),
        );

        info!(
            status_url = %config.status_url,
            cache = %config.address_cache_path.display(),
            "Application state ready"
        );

        Self {
            config,
            registry: parts.registry,
            wallets,
            submitter,
            poller,
            book,
            deployer,
            bridge,
            sepolia: parts.sepolia,
            vechain: parts.vechain,
        }
    }

    /// Reader for the chain the given wallet kind signs on
    pub fn reader_for(&self, kind: WalletKind) -> Arc<dyn ChainReader> {
        match kind {
            WalletKind::ClauseModel => self.vechain.clone(),
            _ => self.sepolia.clone(),
        }
    }

    /// Stop polling and drop wallet listeners
    pub async fn shutdown(&self) {
        self.poller.stop();
        self.wallets.disconnect().await;
        self.wallets.shutdown();
        info!("Application state shut down");
    }
}

fn endpoint(registry: &ChainRegistry, id: u64) -> Result<String> {
    registry
        .get(id)
        .map(|c| c.rpc_url.clone())
        .ok_or_else(|| eyre::eyre!("Chain {} missing from registry", id))
}

fn node_endpoint(registry: &ChainRegistry, id: u64) -> Result<String> {
    registry
        .get(id)
        .and_then(|c| c.node_url.clone())
        .ok_or_else(|| eyre::eyre!("Chain {} has no Thor node URL", id))
}
