//! Console command tests
//!
//! Builds `AppState` around in-memory wallets, readers and status source and
//! runs commands the way the binary does. No network access needed.

use std::path::Path;
use std::sync::Arc;

use alloy::primitives::{Address, U256};
use alloy::sol_types::SolCall;
use console::app::{AppState, Parts};
use console::cli::{AddressCommand, Command, GatewayCommand, WalletArg};
use console::commands;
use console::config::Config;
use xport_rs::address_book::{AddressOverrides, FileStore};
use xport_rs::evm::{ChainReader, MockERC20};
use xport_rs::status::{StatusEntry, StatusSource};
use xport_rs::testing::{MockChainReader, MockClauseBackend, MockEip1193Provider, MockStatusSource};
use xport_rs::wallet::{ClauseBackend, Eip1193Provider};
use xport_rs::{BridgeDirection, ChainRegistry, ContractRole, PollPhase, SEPOLIA_CHAIN_ID};

const TOKEN: &str = "0x1000000000000000000000000000000000000001";
const HOME: &str = "0x2000000000000000000000000000000000000002";

fn config(cache: &Path) -> Config {
    Config {
        sepolia_rpc_url: None,
        vechain_node_url: None,
        account_private_key: None,
        clause_private_key: None,
        status_url: "http://localhost:0".to_string(),
        status_poll_interval_ms: 5000,
        confirmation_timeout_secs: 30,
        address_cache_path: cache.to_path_buf(),
        artifacts_dir: cache.with_file_name("abis"),
    }
}

struct Fixture {
    app: AppState,
    provider: Arc<MockEip1193Provider>,
    sepolia: Arc<MockChainReader>,
    status: Arc<MockStatusSource>,
}

fn fixture(cache: &Path, with_account: bool, overrides: &AddressOverrides) -> Fixture {
    let provider = Arc::new(MockEip1193Provider::new(SEPOLIA_CHAIN_ID));
    let backend = Arc::new(MockClauseBackend::new());
    let sepolia = Arc::new(MockChainReader::new());
    let status = Arc::new(MockStatusSource::new());

    let account_provider: Option<Arc<dyn Eip1193Provider>> = if with_account {
        Some(provider.clone())
    } else {
        None
    };
    let clause_backend: Arc<dyn ClauseBackend> = backend;
    let sepolia_reader: Arc<dyn ChainReader> = sepolia.clone();
    let status_source: Arc<dyn StatusSource> = status.clone();

    let parts = Parts {
        registry: ChainRegistry::testnets(),
        account_provider,
        clause_backend: Some(clause_backend),
        sepolia: sepolia_reader,
        vechain: Arc::new(MockChainReader::new()),
        status_source,
        store: Box::new(FileStore::new(cache)),
    };

    Fixture {
        app: AppState::assemble(config(cache), parts, overrides),
        provider,
        sepolia,
        status,
    }
}

fn token_overrides() -> AddressOverrides {
    AddressOverrides {
        mock_erc20: Some(TOKEN.to_string()),
        token_home: Some(HOME.to_string()),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_address_set_persists_across_runs() {
    let dir = tempfile::tempdir().unwrap();
    let cache = dir.path().join("cache.json");

    let f = fixture(&cache, true, &AddressOverrides::default());
    commands::run(
        &f.app,
        Command::Addresses {
            command: AddressCommand::Set {
                role: ContractRole::TokenHome,
                address: HOME.to_string(),
            },
        },
    )
    .await
    .unwrap();
    f.app.shutdown().await;

    let f = fixture(&cache, true, &AddressOverrides::default());
    assert_eq!(f.app.book.get(ContractRole::TokenHome), HOME);
}

#[tokio::test]
async fn test_address_set_rejects_garbage() {
    let dir = tempfile::tempdir().unwrap();
    let f = fixture(&dir.path().join("cache.json"), true, &AddressOverrides::default());

    let result = commands::run(
        &f.app,
        Command::Addresses {
            command: AddressCommand::Set {
                role: ContractRole::MockErc20,
                address: "not-an-address".to_string(),
            },
        },
    )
    .await;
    assert!(result.is_err());
    assert_eq!(f.app.book.get(ContractRole::MockErc20), "");
}

#[tokio::test]
async fn test_mint_defaults_to_connected_account() {
    let dir = tempfile::tempdir().unwrap();
    let f = fixture(&dir.path().join("cache.json"), true, &token_overrides());

    commands::run(
        &f.app,
        Command::Mint {
            to: None,
            amount: "1000".to_string(),
        },
    )
    .await
    .unwrap();

    let sent = f.provider.sent_transactions();
    assert_eq!(sent.len(), 1);
    let to: Address = sent[0]["to"].as_str().unwrap().parse().unwrap();
    assert_eq!(to, TOKEN.parse::<Address>().unwrap());
}

#[tokio::test]
async fn test_mint_without_account_wallet_fails() {
    let dir = tempfile::tempdir().unwrap();
    let f = fixture(&dir.path().join("cache.json"), false, &token_overrides());

    let result = commands::run(
        &f.app,
        Command::Mint {
            to: None,
            amount: "1".to_string(),
        },
    )
    .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_bridge_no_wait_skips_polling() {
    let dir = tempfile::tempdir().unwrap();
    let f = fixture(&dir.path().join("cache.json"), true, &token_overrides());
    f.sepolia.respond_u256(
        TOKEN.parse().unwrap(),
        MockERC20::allowanceCall::SELECTOR,
        U256::MAX,
    );

    commands::run(
        &f.app,
        Command::Bridge {
            direction: BridgeDirection::SepoliaToVeChain,
            amount: "5".to_string(),
            fee: "0.01".to_string(),
            to: None,
            no_wait: true,
        },
    )
    .await
    .unwrap();

    assert_eq!(f.provider.count("eth_sendTransaction"), 1);
    assert_eq!(f.status.requests(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_bridge_follows_status_to_completion() {
    let dir = tempfile::tempdir().unwrap();
    let f = fixture(&dir.path().join("cache.json"), true, &token_overrides());
    f.sepolia.respond_u256(
        TOKEN.parse().unwrap(),
        MockERC20::allowanceCall::SELECTOR,
        U256::MAX,
    );
    f.status.push(Ok(vec![StatusEntry {
        send_tx_hash: None,
        status: "Completed".to_string(),
        from_chain: None,
        to_chain: None,
        receive_tx_hash: Some("0xdest".to_string()),
        timestamp: None,
    }]));

    commands::run(
        &f.app,
        Command::Bridge {
            direction: BridgeDirection::SepoliaToVeChain,
            amount: "5".to_string(),
            fee: "0.01".to_string(),
            to: None,
            no_wait: false,
        },
    )
    .await
    .unwrap();

    assert_eq!(f.status.requests(), 1);
    assert_eq!(f.app.poller.snapshot().phase, PollPhase::Completed);
}

#[tokio::test]
async fn test_gateway_admin_needs_gateway_address() {
    let dir = tempfile::tempdir().unwrap();
    let f = fixture(&dir.path().join("cache.json"), true, &token_overrides());

    let result = commands::run(
        &f.app,
        Command::Gateway {
            wallet: WalletArg::Account,
            command: GatewayCommand::SetMaxMessageLength {
                length: "1024".to_string(),
            },
        },
    )
    .await;

    assert!(result.is_err());
    assert_eq!(f.provider.count("eth_sendTransaction"), 0);
}
