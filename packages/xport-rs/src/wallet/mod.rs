//! Wallet Adapter
//!
//! One capability surface over two structurally different wallets:
//!
//! - `account` - single `{to, value, data}` transactions through an EIP-1193
//!   style provider
//! - `clause` - clause arrays through a VeChain wallet SDK seam
//! - `eip1193` - the provider trait and a local private-key implementation
//!
//! [`WalletHub`] owns one backend per kind and tracks which one is active.
//! Callers never branch on backend identity; operations that need a
//! particular kind ask the hub for it and get
//! [`BridgeError::UnsupportedWalletForOperation`] otherwise.

pub mod account;
pub mod clause;
pub mod eip1193;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tracing::info;

use crate::error::BridgeError;
use crate::types::{Call, Receipt, TxHandle, WalletConnection, WalletKind};

pub use account::AccountWallet;
pub use clause::{Clause, ClauseBackend, ClauseWallet};
pub use eip1193::{Eip1193Provider, LocalEip1193Provider, ProviderEvent, ProviderRpcError};

/// How long and how often to wait for a receipt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmationConfig {
    pub poll_interval: Duration,
    pub timeout: Duration,
}

#[async_trait]
pub trait WalletBackend: Send + Sync {
    fn kind(&self) -> WalletKind;

    async fn connect(&self) -> Result<WalletConnection, BridgeError>;

    async fn disconnect(&self);

    /// Current connection snapshot; stale after the next await point
    fn connection(&self) -> WalletConnection;

    fn subscribe(&self) -> watch::Receiver<WalletConnection>;

    async fn send_call(&self, call: Call) -> Result<TxHandle, BridgeError>;

    async fn wait_for_confirmation(&self, handle: &TxHandle) -> Result<Receipt, BridgeError>;

    async fn switch_chain(&self, chain_id: u64) -> Result<(), BridgeError>;

    /// Drop notification listeners
    fn shutdown(&self);
}

pub struct WalletHub {
    account: Option<Arc<dyn WalletBackend>>,
    clause: Option<Arc<dyn WalletBackend>>,
    active: Mutex<WalletKind>,
}

impl WalletHub {
    pub fn new(
        account: Option<Arc<dyn WalletBackend>>,
        clause: Option<Arc<dyn WalletBackend>>,
    ) -> Self {
        Self {
            account,
            clause,
            active: Mutex::new(WalletKind::None),
        }
    }

    fn slot(&self, kind: WalletKind) -> Result<&Arc<dyn WalletBackend>, BridgeError> {
        let slot = match kind {
            WalletKind::AccountModel => self.account.as_ref(),
            WalletKind::ClauseModel => self.clause.as_ref(),
            WalletKind::None => None,
        };
        slot.ok_or_else(|| BridgeError::WalletUnavailable(format!("no {} wallet", kind)))
    }

    fn set_active(&self, kind: WalletKind) {
        if let Ok(mut active) = self.active.lock() {
            *active = kind;
        }
    }

    pub fn active_kind(&self) -> WalletKind {
        self.active.lock().map(|k| *k).unwrap_or_default()
    }

    /// Connect `kind` and make it the active backend
    pub async fn connect(&self, kind: WalletKind) -> Result<WalletConnection, BridgeError> {
        let backend = self.slot(kind)?.clone();
        let connection = backend.connect().await?;
        self.set_active(kind);
        Ok(connection)
    }

    /// Disconnect the active backend
    pub async fn disconnect(&self) {
        let kind = self.active_kind();
        if let Ok(backend) = self.slot(kind) {
            backend.disconnect().await;
        }
        self.set_active(WalletKind::None);
    }

    pub async fn disconnect_kind(&self, kind: WalletKind) {
        if let Ok(backend) = self.slot(kind) {
            backend.disconnect().await;
        }
        if self.active_kind() == kind {
            self.set_active(WalletKind::None);
        }
    }

    /// Connection of `kind`, disconnected if that slot is empty
    pub fn connection(&self, kind: WalletKind) -> WalletConnection {
        self.slot(kind)
            .map(|b| b.connection())
            .unwrap_or_default()
    }

    /// The active backend's connection
    ///
    /// A backend that lost its session through a wallet notification reads
    /// as disconnected here even though it is still the active slot.
    pub fn active_connection(&self) -> WalletConnection {
        let connection = self.connection(self.active_kind());
        if connection.is_connected() {
            connection
        } else {
            WalletConnection::disconnected()
        }
    }

    /// Backend of `kind` if it currently holds a session
    pub fn connected(&self, kind: WalletKind) -> Result<Arc<dyn WalletBackend>, BridgeError> {
        let backend = self.slot(kind)?;
        if backend.connection().is_connected() {
            Ok(backend.clone())
        } else {
            Err(BridgeError::NotConnected { kind })
        }
    }

    /// Active backend if it currently holds a session
    pub fn active(&self) -> Result<Arc<dyn WalletBackend>, BridgeError> {
        match self.active_kind() {
            WalletKind::None => Err(BridgeError::NotConnected {
                kind: WalletKind::None,
            }),
            kind => self.connected(kind),
        }
    }

    pub async fn send_call(&self, call: Call) -> Result<TxHandle, BridgeError> {
        self.active()?.send_call(call).await
    }

    pub async fn switch_chain(&self, chain_id: u64) -> Result<(), BridgeError> {
        let kind = match self.active_kind() {
            WalletKind::None => WalletKind::AccountModel,
            kind => kind,
        };
        self.slot(kind)?.switch_chain(chain_id).await
    }

    pub fn subscribe(&self, kind: WalletKind) -> Result<watch::Receiver<WalletConnection>, BridgeError> {
        Ok(self.slot(kind)?.subscribe())
    }

    /// Unsubscribe every backend listener
    pub fn shutdown(&self) {
        for backend in self.account.iter().chain(self.clause.iter()) {
            backend.shutdown();
        }
        info!("Wallet listeners stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chains::{ChainRegistry, SEPOLIA_CHAIN_ID, VECHAIN_TESTNET_CHAIN_ID};
    use crate::testing::{MockClauseBackend, MockEip1193Provider};
    use alloy::primitives::{Address, U256};

    fn hub() -> (WalletHub, Arc<MockEip1193Provider>, Arc<MockClauseBackend>) {
        let provider = Arc::new(MockEip1193Provider::new(SEPOLIA_CHAIN_ID));
        let backend = Arc::new(MockClauseBackend::new());

        let dyn_provider: Arc<dyn Eip1193Provider> = provider.clone();
        let dyn_backend: Arc<dyn ClauseBackend> = backend.clone();
        let account: Arc<dyn WalletBackend> = Arc::new(AccountWallet::new(
            Some(dyn_provider),
            ChainRegistry::testnets(),
            account::default_confirmation(),
        ));
        let clause: Arc<dyn WalletBackend> = Arc::new(ClauseWallet::new(
            Some(dyn_backend),
            clause::default_confirmation(),
        ));

        (WalletHub::new(Some(account), Some(clause)), provider, backend)
    }

    #[tokio::test]
    async fn test_connect_each_kind_then_disconnect() {
        let (hub, _, _) = hub();

        for kind in [WalletKind::AccountModel, WalletKind::ClauseModel] {
            let conn = hub.connect(kind).await.unwrap();
            assert_eq!(conn.kind, kind);

            let active = hub.active_connection();
            assert!(active.address.is_some());
            assert_eq!(active.kind, kind);

            hub.disconnect().await;
            let active = hub.active_connection();
            assert!(active.address.is_none());
            assert_eq!(active.kind, WalletKind::None);
        }
    }

    #[tokio::test]
    async fn test_send_call_routes_to_active_backend() {
        let (hub, provider, backend) = hub();
        hub.connect(WalletKind::ClauseModel).await.unwrap();

        let call = Call::new(Address::with_last_byte(1), U256::ZERO, vec![0x01]);
        hub.send_call(call.clone()).await.unwrap();
        assert_eq!(backend.sent_batches().len(), 1);
        assert_eq!(provider.count("eth_sendTransaction"), 0);

        hub.connect(WalletKind::AccountModel).await.unwrap();
        hub.send_call(call).await.unwrap();
        assert_eq!(provider.count("eth_sendTransaction"), 1);
        assert_eq!(backend.sent_batches().len(), 1);
    }

    #[tokio::test]
    async fn test_send_call_without_connection() {
        let (hub, _, _) = hub();
        let call = Call::new(Address::ZERO, U256::ZERO, Vec::<u8>::new());
        assert!(matches!(
            hub.send_call(call).await.unwrap_err(),
            BridgeError::NotConnected { .. }
        ));
    }

    #[tokio::test]
    async fn test_connected_requires_that_kind() {
        let (hub, _, _) = hub();
        hub.connect(WalletKind::ClauseModel).await.unwrap();

        assert!(hub.connected(WalletKind::ClauseModel).is_ok());
        assert!(hub.connected(WalletKind::AccountModel).is_err());
    }

    #[tokio::test]
    async fn test_missing_slot_is_unavailable() {
        let hub = WalletHub::new(None, None);
        let err = hub.connect(WalletKind::AccountModel).await.unwrap_err();
        assert!(matches!(err, BridgeError::WalletUnavailable(_)));
    }

    #[tokio::test]
    async fn test_switch_chain_uses_account_wallet_by_default() {
        let (hub, provider, _) = hub();
        hub.switch_chain(VECHAIN_TESTNET_CHAIN_ID).await.unwrap();
        assert_eq!(provider.count("wallet_addEthereumChain"), 1);
    }
}
