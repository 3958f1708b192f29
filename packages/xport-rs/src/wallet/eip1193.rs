//! EIP-1193 style provider seam for the account-model wallet
//!
//! An injected browser wallet exposes `request({method, params})` plus
//! `accountsChanged` / `chainChanged` notifications. [`Eip1193Provider`]
//! models exactly that surface so [`AccountWallet`](super::AccountWallet)
//! never depends on how the signer is hosted.
//!
//! [`LocalEip1193Provider`] is the console's implementation: an alloy
//! private-key wallet that keeps its own list of registered chains and
//! answers unknown-chain switches with code 4902, the same way MetaMask does.

use std::collections::HashMap;
use std::sync::Mutex;

use alloy::{
    network::{EthereumWallet, TransactionBuilder},
    primitives::{Address, Bytes, B256, U256},
    providers::{Provider, ProviderBuilder},
    rpc::types::TransactionRequest,
    signers::local::PrivateKeySigner,
};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::chains::{chain_id_hex, parse_chain_id};
use crate::error::BridgeError;

/// User rejected the request
pub const USER_REJECTED: i64 = 4001;
/// The requested method is not supported
pub const UNSUPPORTED_METHOD: i64 = 4200;
/// Unrecognized chain id; add it with `wallet_addEthereumChain` first
pub const UNRECOGNIZED_CHAIN: i64 = 4902;
/// Malformed request parameters
pub const INVALID_PARAMS: i64 = -32602;
/// Internal / upstream RPC failure
pub const INTERNAL_ERROR: i64 = -32603;

/// Error object returned by a provider request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderRpcError {
    pub code: i64,
    pub message: String,
}

impl ProviderRpcError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl From<ProviderRpcError> for BridgeError {
    fn from(e: ProviderRpcError) -> Self {
        match e.code {
            USER_REJECTED => BridgeError::UserRejected,
            _ => BridgeError::Provider {
                code: e.code,
                message: e.message,
            },
        }
    }
}

/// Notification pushed by the wallet
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderEvent {
    AccountsChanged(Vec<Address>),
    ChainChanged(u64),
}

#[async_trait]
pub trait Eip1193Provider: Send + Sync {
    async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderRpcError>;

    /// Receiver for `accountsChanged` / `chainChanged`
    fn subscribe(&self) -> broadcast::Receiver<ProviderEvent>;
}

#[derive(Debug, Deserialize)]
struct SwitchChainParam {
    #[serde(rename = "chainId")]
    chain_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddChainParam {
    chain_id: String,
    rpc_urls: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct SendTxParam {
    #[serde(default)]
    to: Option<Address>,
    #[serde(default)]
    value: Option<U256>,
    #[serde(default)]
    data: Option<Bytes>,
}

fn first_param<T: for<'de> Deserialize<'de>>(params: &Value) -> Result<T, ProviderRpcError> {
    let first = params
        .get(0)
        .cloned()
        .ok_or_else(|| ProviderRpcError::new(INVALID_PARAMS, "missing params[0]"))?;
    serde_json::from_value(first).map_err(|e| ProviderRpcError::new(INVALID_PARAMS, e.to_string()))
}

struct LocalState {
    chain_id: u64,
    /// chain id -> RPC URL
    chains: HashMap<u64, String>,
}

/// Private-key account wallet speaking the EIP-1193 request surface
pub struct LocalEip1193Provider {
    address: Address,
    wallet: EthereumWallet,
    state: Mutex<LocalState>,
    events: broadcast::Sender<ProviderEvent>,
}

impl LocalEip1193Provider {
    /// Create a wallet that initially knows only `chain_id` at `rpc_url`
    pub fn new(private_key: &str, chain_id: u64, rpc_url: &str) -> Result<Self, BridgeError> {
        let signer: PrivateKeySigner = private_key
            .parse()
            .map_err(|e| BridgeError::Backend(format!("Invalid private key: {}", e)))?;
        let address = signer.address();
        let wallet = EthereumWallet::from(signer);

        let mut chains = HashMap::new();
        chains.insert(chain_id, rpc_url.to_string());
        let (events, _) = broadcast::channel(16);

        info!(address = %address, chain_id = chain_id, "Local account wallet initialized");

        Ok(Self {
            address,
            wallet,
            state: Mutex::new(LocalState { chain_id, chains }),
            events,
        })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    fn current_rpc(&self) -> Result<(u64, url::Url), ProviderRpcError> {
        let state = self
            .state
            .lock()
            .map_err(|_| ProviderRpcError::new(INTERNAL_ERROR, "wallet state poisoned"))?;
        let rpc = state
            .chains
            .get(&state.chain_id)
            .ok_or_else(|| ProviderRpcError::new(INTERNAL_ERROR, "current chain has no RPC URL"))?;
        let url = rpc
            .parse()
            .map_err(|e| ProviderRpcError::new(INTERNAL_ERROR, format!("Invalid RPC URL: {}", e)))?;
        Ok((state.chain_id, url))
    }

    fn switch_chain(&self, params: &Value) -> Result<Value, ProviderRpcError> {
        let param: SwitchChainParam = first_param(params)?;
        let target = parse_chain_id(&param.chain_id)
            .ok_or_else(|| ProviderRpcError::new(INVALID_PARAMS, "invalid chainId"))?;

        {
            let mut state = self
                .state
                .lock()
                .map_err(|_| ProviderRpcError::new(INTERNAL_ERROR, "wallet state poisoned"))?;
            if !state.chains.contains_key(&target) {
                return Err(ProviderRpcError::new(
                    UNRECOGNIZED_CHAIN,
                    format!("Unrecognized chain ID {}", param.chain_id),
                ));
            }
            state.chain_id = target;
        }

        let _ = self.events.send(ProviderEvent::ChainChanged(target));
        Ok(Value::Null)
    }

    fn add_chain(&self, params: &Value) -> Result<Value, ProviderRpcError> {
        let param: AddChainParam = first_param(params)?;
        let id = parse_chain_id(&param.chain_id)
            .ok_or_else(|| ProviderRpcError::new(INVALID_PARAMS, "invalid chainId"))?;
        let rpc = param
            .rpc_urls
            .first()
            .cloned()
            .ok_or_else(|| ProviderRpcError::new(INVALID_PARAMS, "rpcUrls is empty"))?;

        let mut state = self
            .state
            .lock()
            .map_err(|_| ProviderRpcError::new(INTERNAL_ERROR, "wallet state poisoned"))?;
        state.chains.insert(id, rpc);
        debug!(chain_id = id, "Registered chain with local wallet");
        Ok(Value::Null)
    }

    async fn send_transaction(&self, params: &Value) -> Result<Value, ProviderRpcError> {
        let param: SendTxParam = first_param(params)?;
        let (chain_id, url) = self.current_rpc()?;

        let data = param.data.unwrap_or_default();
        let mut tx = TransactionRequest::default()
            .with_from(self.address)
            .with_value(param.value.unwrap_or_default());
        tx = match param.to {
            Some(to) => tx.with_to(to).with_input(data),
            None => tx.with_deploy_code(data),
        };

        let provider = ProviderBuilder::new()
            .with_recommended_fillers()
            .wallet(self.wallet.clone())
            .on_http(url);

        let pending = provider
            .send_transaction(tx)
            .await
            .map_err(|e| ProviderRpcError::new(INTERNAL_ERROR, e.to_string()))?;
        let hash = *pending.tx_hash();

        info!(tx_hash = %hash, chain_id = chain_id, "Transaction sent");
        Ok(json!(hash.to_string()))
    }

    async fn get_receipt(&self, params: &Value) -> Result<Value, ProviderRpcError> {
        let hash: B256 = first_param(params)?;
        let (_, url) = self.current_rpc()?;
        let provider = ProviderBuilder::new().on_http(url);

        let receipt = provider
            .get_transaction_receipt(hash)
            .await
            .map_err(|e| ProviderRpcError::new(INTERNAL_ERROR, e.to_string()))?;

        Ok(match receipt {
            Some(r) => json!({
                "transactionHash": r.transaction_hash.to_string(),
                "status": if r.status() { "0x1" } else { "0x0" },
                "contractAddress": r.contract_address.map(|a| a.to_string()),
            }),
            None => Value::Null,
        })
    }
}

#[async_trait]
impl Eip1193Provider for LocalEip1193Provider {
    async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderRpcError> {
        match method {
            "eth_requestAccounts" | "eth_accounts" => Ok(json!([self.address.to_string()])),
            "eth_chainId" => {
                let (chain_id, _) = self.current_rpc()?;
                Ok(json!(chain_id_hex(chain_id)))
            }
            "wallet_switchEthereumChain" => self.switch_chain(&params),
            "wallet_addEthereumChain" => self.add_chain(&params),
            "eth_sendTransaction" => self.send_transaction(&params).await,
            "eth_getTransactionReceipt" => self.get_receipt(&params).await,
            other => Err(ProviderRpcError::new(
                UNSUPPORTED_METHOD,
                format!("Method {} is not supported", other),
            )),
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<ProviderEvent> {
        self.events.subscribe()
    }
}
