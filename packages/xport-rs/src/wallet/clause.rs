//! Clause-model wallet backend
//!
//! VeChain transactions carry an array of `{to, value, data}` clauses. The
//! wallet SDK owns session selection and signing; this backend only reacts to
//! the account it hands back and always sends a single-clause array.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use alloy::primitives::{Address, Bytes, U256};
use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::watch;
use tracing::info;

use super::{ConfirmationConfig, WalletBackend};
use crate::error::BridgeError;
use crate::types::{Call, Receipt, TxHandle, WalletConnection, WalletKind};

/// One VeChain clause
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Clause {
    /// `None` deploys `data` as a contract
    pub to: Option<Address>,
    #[serde(serialize_with = "serialize_hex_u256")]
    pub value: U256,
    pub data: Bytes,
}

fn serialize_hex_u256<S: serde::Serializer>(value: &U256, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&format!("0x{:x}", value))
}

impl From<Call> for Clause {
    fn from(call: Call) -> Self {
        Self {
            to: call.to,
            value: call.value,
            data: call.data,
        }
    }
}

/// Session and signing capability supplied by a clause-model wallet SDK
#[async_trait]
pub trait ClauseBackend: Send + Sync {
    /// Network the wallet is pinned to
    fn chain_id(&self) -> u64;

    /// Open (or resume) a session and return the selected account
    async fn open_session(&self) -> Result<Address, BridgeError>;

    /// Release the SDK session, if the SDK has one to release
    async fn end_session(&self) {}

    /// Sign and broadcast `clauses` from `origin`, returning the wallet's identifier
    async fn send_clauses(&self, origin: Address, clauses: &[Clause]) -> Result<String, BridgeError>;

    /// Receipt for a previously returned identifier, `None` while pending
    async fn receipt(&self, id: &str) -> Result<Option<Receipt>, BridgeError>;
}

pub struct ClauseWallet {
    backend: Option<Arc<dyn ClauseBackend>>,
    connection: watch::Sender<WalletConnection>,
    signer: Mutex<Option<Arc<dyn ClauseBackend>>>,
    confirmation: ConfirmationConfig,
}

impl ClauseWallet {
    pub fn new(backend: Option<Arc<dyn ClauseBackend>>, confirmation: ConfirmationConfig) -> Self {
        let (connection, _) = watch::channel(WalletConnection::disconnected());
        Self {
            backend,
            connection,
            signer: Mutex::new(None),
            confirmation,
        }
    }

    fn backend(&self) -> Result<Arc<dyn ClauseBackend>, BridgeError> {
        self.backend.clone().ok_or_else(|| {
            BridgeError::WalletUnavailable("No clause-model wallet is configured".to_string())
        })
    }

    fn signer(&self) -> Result<(Arc<dyn ClauseBackend>, Address), BridgeError> {
        let not_connected = BridgeError::NotConnected {
            kind: WalletKind::ClauseModel,
        };
        let signer = self
            .signer
            .lock()
            .ok()
            .and_then(|guard| guard.clone())
            .ok_or_else(|| not_connected.clone())?;
        let address = self.connection.borrow().address.ok_or(not_connected)?;
        Ok((signer, address))
    }

    fn set(&self, signer: Option<Arc<dyn ClauseBackend>>, connection: WalletConnection) {
        if let Ok(mut guard) = self.signer.lock() {
            *guard = signer;
        }
        self.connection.send_replace(connection);
    }
}

#[async_trait]
impl WalletBackend for ClauseWallet {
    fn kind(&self) -> WalletKind {
        WalletKind::ClauseModel
    }

    async fn connect(&self) -> Result<WalletConnection, BridgeError> {
        let backend = self.backend()?;
        let address = backend.open_session().await?;
        let chain_id = backend.chain_id();

        let connection = WalletConnection::connected(WalletKind::ClauseModel, address, chain_id);
        self.set(Some(backend), connection.clone());

        info!(address = %address, chain_id = chain_id, "Clause-model wallet connected");
        Ok(connection)
    }

    async fn disconnect(&self) {
        let signer = self.signer.lock().ok().and_then(|guard| guard.clone());
        self.set(None, WalletConnection::disconnected());
        if let Some(signer) = signer {
            signer.end_session().await;
        }
        info!("Clause-model wallet disconnected");
    }

    fn connection(&self) -> WalletConnection {
        self.connection.borrow().clone()
    }

    fn subscribe(&self) -> watch::Receiver<WalletConnection> {
        self.connection.subscribe()
    }

    async fn send_call(&self, call: Call) -> Result<TxHandle, BridgeError> {
        let (signer, origin) = self.signer()?;
        let clauses = [Clause::from(call)];

        let id = signer.send_clauses(origin, &clauses).await?;
        if id.is_empty() {
            return Err(BridgeError::Backend(
                "Wallet returned no transaction id".to_string(),
            ));
        }

        info!(tx_id = %id, to = ?clauses[0].to, "Clause-model transaction submitted");
        Ok(TxHandle::new(WalletKind::ClauseModel, id))
    }

    async fn wait_for_confirmation(&self, handle: &TxHandle) -> Result<Receipt, BridgeError> {
        let (signer, _) = self.signer()?;
        let start = tokio::time::Instant::now();

        loop {
            if let Some(receipt) = signer.receipt(&handle.id).await? {
                info!(
                    tx_id = %handle.id,
                    success = receipt.success,
                    "Clause-model transaction mined"
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

    /// The wallet is pinned to its network; only a no-op switch succeeds
    async fn switch_chain(&self, chain_id: u64) -> Result<(), BridgeError> {
        let backend = self.backend()?;
        if backend.chain_id() == chain_id {
            return Ok(());
        }
        Err(BridgeError::UnsupportedWalletForOperation {
            operation: "switchChain".to_string(),
            required: WalletKind::AccountModel,
        })
    }

    fn shutdown(&self) {}
}

/// VeChain blocks land every ~10s, so poll less eagerly than on Sepolia
pub fn default_confirmation() -> ConfirmationConfig {
    ConfirmationConfig {
        poll_interval: Duration::from_secs(2),
        timeout: Duration::from_secs(180),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chains::{SEPOLIA_CHAIN_ID, VECHAIN_TESTNET_CHAIN_ID};
    use crate::testing::MockClauseBackend;

    fn wallet(backend: &Arc<MockClauseBackend>) -> ClauseWallet {
        let dyn_backend: Arc<dyn ClauseBackend> = backend.clone();
        ClauseWallet::new(Some(dyn_backend), default_confirmation())
    }

    #[tokio::test]
    async fn test_connect_and_disconnect() {
        let backend = Arc::new(MockClauseBackend::new());
        let wallet = wallet(&backend);

        let conn = wallet.connect().await.unwrap();
        assert_eq!(conn.kind, WalletKind::ClauseModel);
        assert_eq!(conn.address, Some(backend.account()));
        assert_eq!(conn.chain_id, Some(VECHAIN_TESTNET_CHAIN_ID));

        wallet.disconnect().await;
        assert!(!wallet.connection().is_connected());
        assert_eq!(backend.ended_sessions(), 1);
    }

    #[tokio::test]
    async fn test_unconfigured_backend_is_unavailable() {
        let wallet = ClauseWallet::new(None, default_confirmation());
        assert!(matches!(
            wallet.connect().await.unwrap_err(),
            BridgeError::WalletUnavailable(_)
        ));
    }

    #[tokio::test]
    async fn test_send_call_issues_single_clause() {
        let backend = Arc::new(MockClauseBackend::new());
        let wallet = wallet(&backend);
        wallet.connect().await.unwrap();

        let call = Call::new(Address::with_last_byte(8), U256::from(5u64), vec![0xaa]);
        let handle = wallet.send_call(call).await.unwrap();

        assert!(!handle.id.is_empty());
        let batches = backend.sent_batches();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].len(), 1);
        assert_eq!(batches[0][0].value, U256::from(5u64));

        let receipt = wallet.wait_for_confirmation(&handle).await.unwrap();
        assert!(receipt.success);
    }

    #[tokio::test]
    async fn test_switch_chain_is_pinned() {
        let backend = Arc::new(MockClauseBackend::new());
        let wallet = wallet(&backend);

        assert!(wallet.switch_chain(VECHAIN_TESTNET_CHAIN_ID).await.is_ok());
        let err = wallet.switch_chain(SEPOLIA_CHAIN_ID).await.unwrap_err();
        assert!(matches!(err, BridgeError::UnsupportedWalletForOperation { .. }));
    }

    #[test]
    fn test_clause_json_shape() {
        let clause = Clause {
            to: None,
            value: U256::from(255u64),
            data: Bytes::from(vec![0x60, 0x80]),
        };
        let json = serde_json::to_value(&clause).unwrap();
        assert_eq!(json["to"], serde_json::Value::Null);
        assert_eq!(json["value"], "0xff");
        assert_eq!(json["data"], "0x6080");
    }
}
