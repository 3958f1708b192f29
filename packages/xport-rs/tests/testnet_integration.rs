//! Testnet Integration Test
//!
//! Reads the deployed bridge contracts on the public Sepolia and VeChain
//! testnets. Nothing is signed or sent.
//!
//! ## Setup
//!
//! - `SEPOLIA_RPC_URL` - Sepolia JSON-RPC endpoint
//! - `VECHAIN_NODE_URL` - VeChain Thor REST endpoint (e.g., https://testnet.vechain.org)
//! - `WMB_GATEWAY_ADDRESS` - Gateway deployed on VeChain testnet
//!
//! ## Running
//!
//! ```bash
//! SEPOLIA_RPC_URL=https://ethereum-sepolia-rpc.publicnode.com \
//! VECHAIN_NODE_URL=https://testnet.vechain.org \
//! WMB_GATEWAY_ADDRESS=0x... \
//! cargo test --test testnet_integration -- --ignored --nocapture
//! ```

use alloy::primitives::Address;
use std::str::FromStr;
use xport_rs::chains::VECHAIN_TESTNET_CHAIN_ID;
use xport_rs::evm::RpcReader;
use xport_rs::gateway::fetch_gateway_state;
use xport_rs::thor::ThorClient;
use xport_rs::SEPOLIA_CHAIN_ID;

struct Endpoints {
    sepolia_rpc: String,
    thor_url: String,
    gateway: Address,
}

fn endpoints() -> Result<Endpoints, String> {
    let sepolia_rpc = std::env::var("SEPOLIA_RPC_URL").map_err(|_| "SEPOLIA_RPC_URL not set")?;
    let thor_url = std::env::var("VECHAIN_NODE_URL").map_err(|_| "VECHAIN_NODE_URL not set")?;
    let gateway_str =
        std::env::var("WMB_GATEWAY_ADDRESS").map_err(|_| "WMB_GATEWAY_ADDRESS not set")?;
    let gateway = Address::from_str(&gateway_str)
        .map_err(|e| format!("Invalid WMB_GATEWAY_ADDRESS: {}", e))?;

    Ok(Endpoints {
        sepolia_rpc,
        thor_url,
        gateway,
    })
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init()
        .ok();
}

#[tokio::test]
#[ignore = "requires testnet access: SEPOLIA_RPC_URL, VECHAIN_NODE_URL, WMB_GATEWAY_ADDRESS"]
async fn test_thor_chain_tag_and_block_ref() {
    init_logging();
    let endpoints = match endpoints() {
        Ok(e) => e,
        Err(e) => {
            eprintln!("Skipping: {}", e);
            return;
        }
    };

    let thor = ThorClient::new(&endpoints.thor_url).expect("valid Thor URL");
    let tag = thor.chain_tag().await.expect("genesis block should load");
    // Testnet genesis id ends in 0x27
    assert_eq!(tag, 0x27);

    let block_ref = thor.best_block_ref().await.expect("best block should load");
    assert!(block_ref > 0);
    tracing::info!(chain_tag = tag, block_ref = block_ref, "Thor node reachable");
}

#[tokio::test]
#[ignore = "requires testnet access: SEPOLIA_RPC_URL, VECHAIN_NODE_URL, WMB_GATEWAY_ADDRESS"]
async fn test_gateway_state_on_vechain() {
    init_logging();
    let endpoints = match endpoints() {
        Ok(e) => e,
        Err(e) => {
            eprintln!("Skipping: {}", e);
            return;
        }
    };

    let thor = ThorClient::new(&endpoints.thor_url).expect("valid Thor URL");
    let state = fetch_gateway_state(
        &thor,
        endpoints.gateway,
        None,
        &[SEPOLIA_CHAIN_ID, VECHAIN_TESTNET_CHAIN_ID],
    )
    .await
    .expect("gateway reads should succeed");

    tracing::info!(
        chain_id = %state.chain_id,
        max_gas_limit = %state.max_gas_limit,
        chains = state.chains.len(),
        "Gateway state"
    );
    assert!(state.max_gas_limit >= state.min_gas_limit);
    assert!(!state.is_admin);

    // Sepolia side is reachable too
    let sepolia = RpcReader::new(&endpoints.sepolia_rpc, SEPOLIA_CHAIN_ID).expect("valid RPC URL");
    assert_eq!(sepolia.chain_id(), SEPOLIA_CHAIN_ID);
}
