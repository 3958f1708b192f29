//! Error types for wallet, submission and polling operations
//!
//! Every failure surfaced to a caller is one of these variants. Validation and
//! precondition failures are produced before any network call is made.

use thiserror::Error;

use crate::types::WalletKind;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BridgeError {
    // ========================================================================
    // Wallet Errors
    // ========================================================================
    #[error("Wallet unavailable: {0}")]
    WalletUnavailable(String),

    #[error("User rejected the request")]
    UserRejected,

    #[error("Chain {chain_id} is not registered with the wallet")]
    ChainNotRegistered { chain_id: u64 },

    #[error("{kind} wallet is not connected")]
    NotConnected { kind: WalletKind },

    #[error("{operation} requires the {required} wallet")]
    UnsupportedWalletForOperation {
        operation: String,
        required: WalletKind,
    },

    #[error("Wallet provider error {code}: {message}")]
    Provider { code: i64, message: String },

    // ========================================================================
    // Input Errors
    // ========================================================================
    #[error("Invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    // ========================================================================
    // Execution Errors
    // ========================================================================
    #[error("Transaction {tx} reverted: {reason}")]
    TransactionReverted { tx: String, reason: String },

    #[error("Transaction {tx} not confirmed after {waited_secs}s")]
    ConfirmationTimeout { tx: String, waited_secs: u64 },

    #[error("Transient status poll miss: {0}")]
    PollingTransient(String),

    #[error("Backend error: {0}")]
    Backend(String),
}

/// Coarse classification used by status records and CLI output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    WalletUnavailable,
    UserRejected,
    ChainNotRegistered,
    Validation,
    TransactionReverted,
    PollingTransient,
    UnsupportedWalletForOperation,
    Backend,
}

impl BridgeError {
    /// Shorthand for a validation failure on a named input field
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        BridgeError::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Shorthand for wrapping any displayable backend failure
    pub fn backend(err: impl std::fmt::Display) -> Self {
        BridgeError::Backend(err.to_string())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            BridgeError::WalletUnavailable(_) | BridgeError::NotConnected { .. } => {
                ErrorKind::WalletUnavailable
            }
            BridgeError::UserRejected => ErrorKind::UserRejected,
            BridgeError::ChainNotRegistered { .. } => ErrorKind::ChainNotRegistered,
            BridgeError::UnsupportedWalletForOperation { .. } => {
                ErrorKind::UnsupportedWalletForOperation
            }
            BridgeError::Validation { .. } => ErrorKind::Validation,
            BridgeError::TransactionReverted { .. } => ErrorKind::TransactionReverted,
            BridgeError::PollingTransient(_) => ErrorKind::PollingTransient,
            BridgeError::Provider { .. }
            | BridgeError::ConfirmationTimeout { .. }
            | BridgeError::Backend(_) => ErrorKind::Backend,
        }
    }

    /// Errors that were raised before anything reached the network
    pub fn is_local(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Validation
                | ErrorKind::UnsupportedWalletForOperation
                | ErrorKind::WalletUnavailable
        )
    }
}

impl From<reqwest::Error> for BridgeError {
    fn from(e: reqwest::Error) -> Self {
        BridgeError::Backend(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_kind_is_local() {
        let err = BridgeError::validation("amount", "not a number");
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.is_local());
        assert_eq!(err.to_string(), "Invalid amount: not a number");
    }

    #[test]
    fn test_unsupported_wallet_message() {
        let err = BridgeError::UnsupportedWalletForOperation {
            operation: "crossTo".to_string(),
            required: WalletKind::AccountModel,
        };
        assert_eq!(err.to_string(), "crossTo requires the account-model wallet");
        assert!(err.is_local());
    }

    #[test]
    fn test_reverted_is_not_local() {
        let err = BridgeError::TransactionReverted {
            tx: "0xabc".to_string(),
            reason: "execution reverted".to_string(),
        };
        assert_eq!(err.kind(), ErrorKind::TransactionReverted);
        assert!(!err.is_local());
    }
}
