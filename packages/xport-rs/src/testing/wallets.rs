//! Wallet doubles
//!
//! `MockEip1193Provider` behaves like an injected browser wallet: it knows a
//! set of chains, answers unknown switches with 4902, and pushes
//! `accountsChanged` / `chainChanged` on demand. `MockClauseBackend` stands in
//! for the VeChain wallet SDK.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use alloy::primitives::Address;
use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::broadcast;

use crate::chains::{chain_id_hex, parse_chain_id, VECHAIN_TESTNET_CHAIN_ID};
use crate::error::BridgeError;
use crate::types::Receipt;
use crate::wallet::eip1193::{
    Eip1193Provider, ProviderEvent, ProviderRpcError, UNRECOGNIZED_CHAIN, UNSUPPORTED_METHOD,
    USER_REJECTED,
};
use crate::wallet::{Clause, ClauseBackend};

// ============================================================================
// Account-model provider
// ============================================================================

struct ProviderState {
    chain_id: u64,
    known_chains: HashSet<u64>,
    /// (method, 1-based request number) -> error code
    failures: HashMap<(String, usize), i64>,
    counts: HashMap<String, usize>,
    sent: Vec<Value>,
    receipt_success: bool,
    contract_address: Option<Address>,
}

pub struct MockEip1193Provider {
    account: Address,
    state: Mutex<ProviderState>,
    events: broadcast::Sender<ProviderEvent>,
}

impl MockEip1193Provider {
    /// Wallet that starts on (and only knows) `chain_id`
    pub fn new(chain_id: u64) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            account: Address::repeat_byte(0x11),
            state: Mutex::new(ProviderState {
                chain_id,
                known_chains: HashSet::from([chain_id]),
                failures: HashMap::new(),
                counts: HashMap::new(),
                sent: Vec::new(),
                receipt_success: true,
                contract_address: None,
            }),
            events,
        }
    }

    pub fn account(&self) -> Address {
        self.account
    }

    /// The next `method` request fails with code 4001
    pub fn reject_next(&self, method: &str) {
        self.with_state(|s| {
            let next = s.counts.get(method).copied().unwrap_or_default() + 1;
            s.failures.insert((method.to_string(), next), USER_REJECTED);
        });
    }

    /// The `nth` request for `method` (counting from 1) fails with `code`
    pub fn fail_request(&self, method: &str, nth: usize, code: i64) {
        self.with_state(|s| {
            s.failures.insert((method.to_string(), nth), code);
        });
    }

    /// Receipts report a revert from now on
    pub fn fail_receipts(&self) {
        self.with_state(|s| s.receipt_success = false);
    }

    /// Receipts carry this deployed address from now on
    pub fn set_contract_address(&self, address: Address) {
        self.with_state(|s| s.contract_address = Some(address));
    }

    /// Number of requests made for `method`
    pub fn count(&self, method: &str) -> usize {
        self.with_state(|s| s.counts.get(method).copied().unwrap_or_default())
    }

    /// `eth_sendTransaction` parameter objects in order
    pub fn sent_transactions(&self) -> Vec<Value> {
        self.with_state(|s| s.sent.clone())
    }

    pub fn emit(&self, event: ProviderEvent) {
        let _ = self.events.send(event);
    }

    fn with_state<T: Default>(&self, f: impl FnOnce(&mut ProviderState) -> T) -> T {
        self.state.lock().map(|mut s| f(&mut s)).unwrap_or_default()
    }

    fn chain_param(params: &Value) -> Result<u64, ProviderRpcError> {
        params[0]["chainId"]
            .as_str()
            .and_then(parse_chain_id)
            .ok_or_else(|| ProviderRpcError::new(-32602, "invalid chainId"))
    }
}

#[async_trait]
impl Eip1193Provider for MockEip1193Provider {
    async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderRpcError> {
        let mut guard = self
            .state
            .lock()
            .map_err(|_| ProviderRpcError::new(-32603, "poisoned"))?;
        let state = &mut *guard;
        let count = state.counts.entry(method.to_string()).or_default();
        *count += 1;
        let nth = *count;

        match state.failures.remove(&(method.to_string(), nth)) {
            Some(USER_REJECTED) => {
                return Err(ProviderRpcError::new(USER_REJECTED, "User rejected the request."))
            }
            Some(code) => return Err(ProviderRpcError::new(code, format!("{} failed", method))),
            None => {}
        }

        match method {
            "eth_requestAccounts" | "eth_accounts" => Ok(json!([self.account.to_string()])),
            "eth_chainId" => Ok(json!(chain_id_hex(state.chain_id))),
            "wallet_switchEthereumChain" => {
                let target = Self::chain_param(&params)?;
                if !state.known_chains.contains(&target) {
                    return Err(ProviderRpcError::new(
                        UNRECOGNIZED_CHAIN,
                        "Unrecognized chain ID",
                    ));
                }
                state.chain_id = target;
                let _ = self.events.send(ProviderEvent::ChainChanged(target));
                Ok(Value::Null)
            }
            "wallet_addEthereumChain" => {
                let chain = Self::chain_param(&params)?;
                state.known_chains.insert(chain);
                Ok(Value::Null)
            }
            "eth_sendTransaction" => {
                state.sent.push(params[0].clone());
                Ok(json!(format!("0x{:064x}", state.sent.len())))
            }
            "eth_getTransactionReceipt" => Ok(json!({
                "transactionHash": params[0].clone(),
                "status": if state.receipt_success { "0x1" } else { "0x0" },
                "contractAddress": state.contract_address.map(|a| a.to_string()),
            })),
            other => Err(ProviderRpcError::new(
                UNSUPPORTED_METHOD,
                format!("{} not supported", other),
            )),
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<ProviderEvent> {
        self.events.subscribe()
    }
}

// ============================================================================
// Clause-model backend
// ============================================================================

#[derive(Default)]
struct ClauseState {
    sent: Vec<Vec<Clause>>,
    reverted: bool,
    reject_session: bool,
    contract_address: Option<Address>,
}

pub struct MockClauseBackend {
    account: Address,
    state: Mutex<ClauseState>,
    ended: AtomicUsize,
}

impl Default for MockClauseBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockClauseBackend {
    pub fn new() -> Self {
        Self {
            account: Address::repeat_byte(0x22),
            state: Mutex::new(ClauseState::default()),
            ended: AtomicUsize::new(0),
        }
    }

    pub fn account(&self) -> Address {
        self.account
    }

    /// Clause arrays passed to `send_clauses`, one entry per transaction
    pub fn sent_batches(&self) -> Vec<Vec<Clause>> {
        self.state.lock().map(|s| s.sent.clone()).unwrap_or_default()
    }

    pub fn ended_sessions(&self) -> usize {
        self.ended.load(Ordering::SeqCst)
    }

    pub fn revert_transactions(&self) {
        if let Ok(mut s) = self.state.lock() {
            s.reverted = true;
        }
    }

    /// The user closes the SDK modal without picking an account
    pub fn reject_session(&self) {
        if let Ok(mut s) = self.state.lock() {
            s.reject_session = true;
        }
    }

    pub fn set_contract_address(&self, address: Address) {
        if let Ok(mut s) = self.state.lock() {
            s.contract_address = Some(address);
        }
    }
}

#[async_trait]
impl ClauseBackend for MockClauseBackend {
    fn chain_id(&self) -> u64 {
        VECHAIN_TESTNET_CHAIN_ID
    }

    async fn open_session(&self) -> Result<Address, BridgeError> {
        let rejected = self.state.lock().map(|s| s.reject_session).unwrap_or(false);
        if rejected {
            return Err(BridgeError::UserRejected);
        }
        Ok(self.account)
    }

    async fn end_session(&self) {
        self.ended.fetch_add(1, Ordering::SeqCst);
    }

    async fn send_clauses(&self, _origin: Address, clauses: &[Clause]) -> Result<String, BridgeError> {
        let mut s = self
            .state
            .lock()
            .map_err(|_| BridgeError::Backend("poisoned".to_string()))?;
        s.sent.push(clauses.to_vec());
        Ok(format!("0x{:064x}", s.sent.len()))
    }

    async fn receipt(&self, id: &str) -> Result<Option<Receipt>, BridgeError> {
        let s = self
            .state
            .lock()
            .map_err(|_| BridgeError::Backend("poisoned".to_string()))?;
        Ok(Some(Receipt {
            tx_hash: id.to_string(),
            success: !s.reverted,
            contract_address: s.contract_address,
            revert_reason: s.reverted.then(|| "Transaction reverted".to_string()),
        }))
    }
}
