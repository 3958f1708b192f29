//! Common types shared by the wallet adapter, submitter and console
//!
//! This module provides the connection record, the `{to, value, data}` call
//! triple, normalized receipts and the pending transaction record.

use alloy::primitives::{Address, Bytes, U256};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{BridgeError, ErrorKind};

// ============================================================================
// Wallet Kind / Connection
// ============================================================================

/// Which wallet backend a connection or operation belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum WalletKind {
    #[default]
    None,
    /// Single `{to, value, data}` transactions (Ethereum-style)
    AccountModel,
    /// Multi-clause transactions (VeChain-style)
    ClauseModel,
}

impl WalletKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            WalletKind::None => "none",
            WalletKind::AccountModel => "account-model",
            WalletKind::ClauseModel => "clause-model",
        }
    }
}

impl fmt::Display for WalletKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Snapshot of one wallet session
///
/// `address` is set exactly while the owning backend holds a signing handle.
/// Readers must treat a snapshot as stale after any await point.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WalletConnection {
    pub kind: WalletKind,
    pub address: Option<Address>,
    pub chain_id: Option<u64>,
}

impl WalletConnection {
    /// The empty record (no kind, no address, no chain)
    pub fn disconnected() -> Self {
        Self::default()
    }

    pub fn connected(kind: WalletKind, address: Address, chain_id: u64) -> Self {
        Self {
            kind,
            address: Some(address),
            chain_id: Some(chain_id),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.address.is_some()
    }

    /// `0x1234...abcd` form used in console output
    pub fn short_address(&self) -> String {
        match self.address {
            Some(addr) => {
                let s = addr.to_string();
                format!("{}...{}", &s[..6], &s[s.len() - 4..])
            }
            None => "Not connected".to_string(),
        }
    }
}

// ============================================================================
// Calls and Receipts
// ============================================================================

/// One `{to, value, data}` triple; `to == None` creates a contract
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub to: Option<Address>,
    pub value: U256,
    pub data: Bytes,
}

impl Call {
    pub fn new(to: Address, value: U256, data: impl Into<Bytes>) -> Self {
        Self {
            to: Some(to),
            value,
            data: data.into(),
        }
    }

    pub fn create(value: U256, init_code: impl Into<Bytes>) -> Self {
        Self {
            to: None,
            value,
            data: init_code.into(),
        }
    }
}

/// Identifier returned by a wallet after submission
///
/// A transaction hash for the account-model backend; an opaque id for the
/// clause-model backend (which for Thor happens to be the transaction id).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TxHandle {
    pub kind: WalletKind,
    pub id: String,
}

impl TxHandle {
    pub fn new(kind: WalletKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }
}

impl fmt::Display for TxHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

/// Receipt normalized across both backends
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub tx_hash: String,
    pub success: bool,
    pub contract_address: Option<Address>,
    pub revert_reason: Option<String>,
}

// ============================================================================
// Pending Transaction
// ============================================================================

/// Lifecycle of a submitted call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxStatus {
    Submitted,
    MinedSuccess,
    MinedFailure,
    /// Rejected locally or by the wallet; nothing reached the chain
    NotSent,
}

impl TxStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TxStatus::Submitted => "submitted",
            TxStatus::MinedSuccess => "success",
            TxStatus::MinedFailure => "failed",
            TxStatus::NotSent => "not-sent",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, TxStatus::Submitted)
    }
}

impl fmt::Display for TxStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The single observable record for the operation in flight
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTransaction {
    /// Empty until the wallet has accepted the call
    pub tx_identifier: String,
    pub status: TxStatus,
    pub origin_kind: WalletKind,
    pub message: String,
    pub error: Option<ErrorKind>,
    /// Set for contract creation receipts
    pub contract_address: Option<Address>,
}

impl PendingTransaction {
    pub fn submitting(origin_kind: WalletKind) -> Self {
        Self {
            tx_identifier: String::new(),
            status: TxStatus::Submitted,
            origin_kind,
            message: "Transaction submitted...".to_string(),
            error: None,
            contract_address: None,
        }
    }

    pub fn pending(handle: &TxHandle) -> Self {
        Self {
            tx_identifier: handle.id.clone(),
            status: TxStatus::Submitted,
            origin_kind: handle.kind,
            message: "Transaction pending...".to_string(),
            error: None,
            contract_address: None,
        }
    }

    /// Record for a call that never left the process or was refused by the wallet
    pub fn not_sent(origin_kind: WalletKind, err: &BridgeError) -> Self {
        Self {
            tx_identifier: String::new(),
            status: TxStatus::NotSent,
            origin_kind,
            message: err.to_string(),
            error: Some(err.kind()),
            contract_address: None,
        }
    }

    pub fn mined(handle: &TxHandle, receipt: &Receipt, success_message: &str) -> Self {
        if receipt.success {
            Self {
                tx_identifier: handle.id.clone(),
                status: TxStatus::MinedSuccess,
                origin_kind: handle.kind,
                message: success_message.to_string(),
                error: None,
                contract_address: receipt.contract_address,
            }
        } else {
            let err = BridgeError::TransactionReverted {
                tx: handle.id.clone(),
                reason: receipt
                    .revert_reason
                    .clone()
                    .unwrap_or_else(|| "Transaction failed".to_string()),
            };
            Self::failed(handle, &err)
        }
    }

    /// Record for a call that reached the chain (or may have) and then failed
    pub fn failed(handle: &TxHandle, err: &BridgeError) -> Self {
        Self {
            tx_identifier: handle.id.clone(),
            status: TxStatus::MinedFailure,
            origin_kind: handle.kind,
            message: err.to_string(),
            error: Some(err.kind()),
            contract_address: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == TxStatus::MinedSuccess
    }
}
