//! Account-model wallet backend
//!
//! Drives an [`Eip1193Provider`] and keeps the observable
//! [`WalletConnection`] in step with the provider's `accountsChanged` and
//! `chainChanged` notifications.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use alloy::primitives::Address;
use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::eip1193::{Eip1193Provider, ProviderEvent, ProviderRpcError, UNRECOGNIZED_CHAIN};
use super::{ConfirmationConfig, WalletBackend};
use crate::chains::{chain_id_hex, parse_chain_id, ChainRegistry};
use crate::error::BridgeError;
use crate::types::{Call, Receipt, TxHandle, WalletConnection, WalletKind};

/// Connection record plus the signing handle it guards
///
/// Both are only ever written together so `address` and the handle are
/// both set or both empty.
struct Session {
    connection: watch::Sender<WalletConnection>,
    signer: Mutex<Option<Arc<dyn Eip1193Provider>>>,
}

impl Session {
    fn set(&self, signer: Option<Arc<dyn Eip1193Provider>>, connection: WalletConnection) {
        if let Ok(mut guard) = self.signer.lock() {
            *guard = signer;
        }
        self.connection.send_replace(connection);
    }

    fn clear(&self) {
        self.set(None, WalletConnection::disconnected());
    }

    fn signer(&self) -> Option<Arc<dyn Eip1193Provider>> {
        self.signer.lock().ok().and_then(|guard| guard.clone())
    }

    fn apply(&self, event: ProviderEvent) {
        match event {
            ProviderEvent::AccountsChanged(accounts) => match accounts.first() {
                None => {
                    info!("Account-model wallet revoked all accounts, disconnecting");
                    self.clear();
                }
                Some(&address) => {
                    self.connection.send_if_modified(|conn| {
                        if !conn.is_connected() || conn.address == Some(address) {
                            return false;
                        }
                        conn.address = Some(address);
                        true
                    });
                }
            },
            ProviderEvent::ChainChanged(chain_id) => {
                self.connection.send_if_modified(|conn| {
                    if !conn.is_connected() || conn.chain_id == Some(chain_id) {
                        return false;
                    }
                    conn.chain_id = Some(chain_id);
                    true
                });
            }
        }
    }
}

pub struct AccountWallet {
    /// Host-injected provider; `None` when the environment has no wallet
    provider: Option<Arc<dyn Eip1193Provider>>,
    registry: ChainRegistry,
    session: Arc<Session>,
    listener: Mutex<Option<JoinHandle<()>>>,
    confirmation: ConfirmationConfig,
}

impl AccountWallet {
    pub fn new(
        provider: Option<Arc<dyn Eip1193Provider>>,
        registry: ChainRegistry,
        confirmation: ConfirmationConfig,
    ) -> Self {
        let (connection, _) = watch::channel(WalletConnection::disconnected());
        Self {
            provider,
            registry,
            session: Arc::new(Session {
                connection,
                signer: Mutex::new(None),
            }),
            listener: Mutex::new(None),
            confirmation,
        }
    }

    fn provider(&self) -> Result<Arc<dyn Eip1193Provider>, BridgeError> {
        self.provider.clone().ok_or_else(|| {
            BridgeError::WalletUnavailable("No account-model wallet is installed".to_string())
        })
    }

    fn signer(&self) -> Result<Arc<dyn Eip1193Provider>, BridgeError> {
        self.session.signer().ok_or(BridgeError::NotConnected {
            kind: WalletKind::AccountModel,
        })
    }

    fn stop_listener(&self) {
        if let Ok(mut guard) = self.listener.lock() {
            if let Some(handle) = guard.take() {
                handle.abort();
            }
        }
    }

    fn start_listener(&self, provider: &Arc<dyn Eip1193Provider>) {
        self.stop_listener();

        let mut events = provider.subscribe();
        let session = self.session.clone();
        let handle = tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => {
                        debug!(event = ?event, "Account-model wallet notification");
                        session.apply(event);
                    }
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        warn!(missed = missed, "Dropped wallet notifications");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        if let Ok(mut guard) = self.listener.lock() {
            *guard = Some(handle);
        }
    }

    async fn request(
        provider: &Arc<dyn Eip1193Provider>,
        method: &str,
        params: Value,
    ) -> Result<Value, BridgeError> {
        provider
            .request(method, params)
            .await
            .map_err(BridgeError::from)
    }

    async fn try_switch(
        provider: &Arc<dyn Eip1193Provider>,
        chain_id: u64,
    ) -> Result<(), ProviderRpcError> {
        provider
            .request(
                "wallet_switchEthereumChain",
                json!([{ "chainId": chain_id_hex(chain_id) }]),
            )
            .await
            .map(|_| ())
    }
}

fn parse_account(value: &Value) -> Result<Option<Address>, BridgeError> {
    let first = match value.as_array().and_then(|list| list.first()) {
        Some(first) => first,
        None => return Ok(None),
    };
    first
        .as_str()
        .and_then(|s| s.parse().ok())
        .map(Some)
        .ok_or_else(|| BridgeError::Backend(format!("Malformed account in response: {}", first)))
}

fn parse_receipt(tx: &str, value: &Value) -> Result<Receipt, BridgeError> {
    let status = value.get("status").and_then(Value::as_str).unwrap_or("0x0");
    let contract_address = value
        .get("contractAddress")
        .and_then(Value::as_str)
        .and_then(|s| s.parse().ok());
    let success = status == "0x1";

    Ok(Receipt {
        tx_hash: tx.to_string(),
        success,
        contract_address,
        revert_reason: (!success).then(|| "Transaction failed".to_string()),
    })
}

#[async_trait]
impl WalletBackend for AccountWallet {
    fn kind(&self) -> WalletKind {
        WalletKind::AccountModel
    }

    async fn connect(&self) -> Result<WalletConnection, BridgeError> {
        let provider = self.provider()?;

        let accounts = Self::request(&provider, "eth_requestAccounts", json!([])).await?;
        let address = parse_account(&accounts)?.ok_or(BridgeError::UserRejected)?;

        let chain = Self::request(&provider, "eth_chainId", json!([])).await?;
        let chain_id = chain
            .as_str()
            .and_then(parse_chain_id)
            .ok_or_else(|| BridgeError::Backend(format!("Malformed chain id: {}", chain)))?;

        let connection = WalletConnection::connected(WalletKind::AccountModel, address, chain_id);
        self.session.set(Some(provider.clone()), connection.clone());
        self.start_listener(&provider);

        info!(address = %address, chain_id = chain_id, "Account-model wallet connected");
        Ok(connection)
    }

    async fn disconnect(&self) {
        self.stop_listener();
        self.session.clear();
        info!("Account-model wallet disconnected");
    }

    fn connection(&self) -> WalletConnection {
        self.session.connection.borrow().clone()
    }

    fn subscribe(&self) -> watch::Receiver<WalletConnection> {
        self.session.connection.subscribe()
    }

    async fn send_call(&self, call: Call) -> Result<TxHandle, BridgeError> {
        let signer = self.signer()?;
        let from = self.connection().address.ok_or(BridgeError::NotConnected {
            kind: WalletKind::AccountModel,
        })?;

        let mut tx = json!({
            "from": from.to_string(),
            "value": format!("0x{:x}", call.value),
            "data": call.data.to_string(),
        });
        if let Some(to) = call.to {
            tx["to"] = json!(to.to_string());
        }

        let result = Self::request(&signer, "eth_sendTransaction", json!([tx])).await?;
        let hash = result
            .as_str()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| BridgeError::Backend("Wallet returned no transaction hash".to_string()))?;

        info!(tx_hash = %hash, to = ?call.to, "Account-model transaction submitted");
        Ok(TxHandle::new(WalletKind::AccountModel, hash))
    }

    async fn wait_for_confirmation(&self, handle: &TxHandle) -> Result<Receipt, BridgeError> {
        let signer = self.signer()?;
        let start = tokio::time::Instant::now();

        loop {
            let value =
                Self::request(&signer, "eth_getTransactionReceipt", json!([handle.id])).await?;
            if !value.is_null() {
                let receipt = parse_receipt(&handle.id, &value)?;
                info!(
                    tx_hash = %handle.id,
                    success = receipt.success,
                    "Account-model transaction mined"
                );
                return Ok(receipt);
            }

            if start.elapsed() >= self.confirmation.timeout {
                return Err(BridgeError::ConfirmationTimeout {
                    tx: handle.id.clone(),
                    waited_secs: self.confirmation.timeout.as_secs(),
                });
            }
            tokio::time::sleep(self.confirmation.poll_interval).await;
        }
    }

    async fn switch_chain(&self, chain_id: u64) -> Result<(), BridgeError> {
        let provider = self.provider()?;

        match Self::try_switch(&provider, chain_id).await {
            Ok(()) => {}
            Err(e) if e.code == UNRECOGNIZED_CHAIN => {
                let params = self
                    .registry
                    .add_chain_params(chain_id)
                    .ok_or(BridgeError::ChainNotRegistered { chain_id })?;
                info!(chain_id = chain_id, "Registering chain with account-model wallet");

                Self::request(&provider, "wallet_addEthereumChain", json!([params])).await?;
                Self::try_switch(&provider, chain_id)
                    .await
                    .map_err(|e| match e.code {
                        UNRECOGNIZED_CHAIN => BridgeError::ChainNotRegistered { chain_id },
                        _ => BridgeError::from(e),
                    })?;
            }
            Err(e) => return Err(e.into()),
        }

        info!(chain_id = chain_id, "Account-model wallet switched chain");
        Ok(())
    }

    fn shutdown(&self) {
        self.stop_listener();
    }
}

impl Drop for AccountWallet {
    fn drop(&mut self) {
        self.stop_listener();
    }
}

/// Default confirmation polling for account-model chains
pub fn default_confirmation() -> ConfirmationConfig {
    ConfirmationConfig {
        poll_interval: Duration::from_millis(500),
        timeout: Duration::from_secs(180),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chains::{SEPOLIA_CHAIN_ID, VECHAIN_TESTNET_CHAIN_ID};
    use crate::testing::MockEip1193Provider;
    use crate::wallet::eip1193::INTERNAL_ERROR;

    fn wallet(provider: &Arc<MockEip1193Provider>) -> AccountWallet {
        let dyn_provider: Arc<dyn Eip1193Provider> = provider.clone();
        AccountWallet::new(
            Some(dyn_provider),
            ChainRegistry::testnets(),
            default_confirmation(),
        )
    }

    #[tokio::test]
    async fn test_connect_without_provider_is_unavailable() {
        let wallet = AccountWallet::new(None, ChainRegistry::testnets(), default_confirmation());
        let err = wallet.connect().await.unwrap_err();
        assert!(matches!(err, BridgeError::WalletUnavailable(_)));
        assert!(!wallet.connection().is_connected());
    }

    #[tokio::test]
    async fn test_connect_sets_address_and_chain() {
        let provider = Arc::new(MockEip1193Provider::new(SEPOLIA_CHAIN_ID));
        let wallet = wallet(&provider);

        let conn = wallet.connect().await.unwrap();
        assert_eq!(conn.kind, WalletKind::AccountModel);
        assert_eq!(conn.address, Some(provider.account()));
        assert_eq!(conn.chain_id, Some(SEPOLIA_CHAIN_ID));

        wallet.disconnect().await;
        let conn = wallet.connection();
        assert!(conn.address.is_none());
        assert_eq!(conn.kind, WalletKind::None);
    }

    #[tokio::test]
    async fn test_connect_rejected_by_user() {
        let provider = Arc::new(MockEip1193Provider::new(SEPOLIA_CHAIN_ID));
        provider.reject_next("eth_requestAccounts");
        let wallet = wallet(&provider);

        assert_eq!(wallet.connect().await.unwrap_err(), BridgeError::UserRejected);
        assert!(!wallet.connection().is_connected());
    }

    #[tokio::test]
    async fn test_send_call_issues_single_transaction() {
        let provider = Arc::new(MockEip1193Provider::new(SEPOLIA_CHAIN_ID));
        let wallet = wallet(&provider);
        wallet.connect().await.unwrap();

        let call = Call::new(Address::with_last_byte(5), Default::default(), vec![1u8, 2]);
        let handle = wallet.send_call(call).await.unwrap();

        assert!(!handle.id.is_empty());
        assert_eq!(provider.count("eth_sendTransaction"), 1);
        let sent = provider.sent_transactions();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].is_object());

        let receipt = wallet.wait_for_confirmation(&handle).await.unwrap();
        assert!(receipt.success);
    }

    #[tokio::test]
    async fn test_send_call_requires_connection() {
        let provider = Arc::new(MockEip1193Provider::new(SEPOLIA_CHAIN_ID));
        let wallet = wallet(&provider);

        let call = Call::new(Address::ZERO, Default::default(), Vec::<u8>::new());
        let err = wallet.send_call(call).await.unwrap_err();
        assert!(matches!(err, BridgeError::NotConnected { .. }));
        assert_eq!(provider.count("eth_sendTransaction"), 0);
    }

    #[tokio::test]
    async fn test_switch_registers_unknown_chain_once() {
        let provider = Arc::new(MockEip1193Provider::new(SEPOLIA_CHAIN_ID));
        let wallet = wallet(&provider);
        wallet.connect().await.unwrap();

        wallet.switch_chain(VECHAIN_TESTNET_CHAIN_ID).await.unwrap();
        assert_eq!(provider.count("wallet_addEthereumChain"), 1);
        assert_eq!(provider.count("wallet_switchEthereumChain"), 2);

        // Already registered now
        wallet.switch_chain(SEPOLIA_CHAIN_ID).await.unwrap();
        assert_eq!(provider.count("wallet_addEthereumChain"), 1);
        assert_eq!(provider.count("wallet_switchEthereumChain"), 3);
    }

    #[tokio::test]
    async fn test_rejected_chain_add_is_surfaced() {
        let provider = Arc::new(MockEip1193Provider::new(SEPOLIA_CHAIN_ID));
        provider.reject_next("wallet_addEthereumChain");
        let wallet = wallet(&provider);
        wallet.connect().await.unwrap();

        let err = wallet.switch_chain(VECHAIN_TESTNET_CHAIN_ID).await.unwrap_err();
        assert_eq!(err, BridgeError::UserRejected);
        assert_eq!(provider.count("wallet_addEthereumChain"), 1);
        assert_eq!(provider.count("wallet_switchEthereumChain"), 1);
        assert_eq!(wallet.connection().chain_id, Some(SEPOLIA_CHAIN_ID));
    }

    #[tokio::test]
    async fn test_failed_retry_after_add_is_surfaced() {
        let provider = Arc::new(MockEip1193Provider::new(SEPOLIA_CHAIN_ID));
        provider.fail_request("wallet_switchEthereumChain", 2, INTERNAL_ERROR);
        let wallet = wallet(&provider);
        wallet.connect().await.unwrap();

        let err = wallet.switch_chain(VECHAIN_TESTNET_CHAIN_ID).await.unwrap_err();
        assert!(matches!(err, BridgeError::Provider { code: INTERNAL_ERROR, .. }));
        assert_eq!(provider.count("wallet_addEthereumChain"), 1);
        assert_eq!(provider.count("wallet_switchEthereumChain"), 2);
    }

    #[tokio::test]
    async fn test_retry_still_unrecognized_is_not_registered() {
        let provider = Arc::new(MockEip1193Provider::new(SEPOLIA_CHAIN_ID));
        provider.fail_request("wallet_switchEthereumChain", 2, UNRECOGNIZED_CHAIN);
        let wallet = wallet(&provider);
        wallet.connect().await.unwrap();

        let err = wallet.switch_chain(VECHAIN_TESTNET_CHAIN_ID).await.unwrap_err();
        assert_eq!(
            err,
            BridgeError::ChainNotRegistered {
                chain_id: VECHAIN_TESTNET_CHAIN_ID
            }
        );
        assert_eq!(provider.count("wallet_switchEthereumChain"), 2);
    }

    #[tokio::test]
    async fn test_chain_changed_updates_only_chain() {
        let provider = Arc::new(MockEip1193Provider::new(SEPOLIA_CHAIN_ID));
        let wallet = wallet(&provider);
        let conn = wallet.connect().await.unwrap();
        let mut rx = wallet.subscribe();

        provider.emit(ProviderEvent::ChainChanged(VECHAIN_TESTNET_CHAIN_ID));
        rx.changed().await.unwrap();

        let updated = wallet.connection();
        assert_eq!(updated.chain_id, Some(VECHAIN_TESTNET_CHAIN_ID));
        assert_eq!(updated.address, conn.address);
    }

    #[tokio::test]
    async fn test_empty_accounts_changed_disconnects() {
        let provider = Arc::new(MockEip1193Provider::new(SEPOLIA_CHAIN_ID));
        let wallet = wallet(&provider);
        wallet.connect().await.unwrap();
        let mut rx = wallet.subscribe();

        provider.emit(ProviderEvent::AccountsChanged(vec![Address::with_last_byte(3)]));
        rx.changed().await.unwrap();
        assert_eq!(wallet.connection().address, Some(Address::with_last_byte(3)));

        provider.emit(ProviderEvent::AccountsChanged(vec![]));
        rx.changed().await.unwrap();
        assert!(!wallet.connection().is_connected());

        // Signing handle went with the address
        let call = Call::new(Address::ZERO, Default::default(), Vec::<u8>::new());
        assert!(wallet.send_call(call).await.is_err());
    }
}
