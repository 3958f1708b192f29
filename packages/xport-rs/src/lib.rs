//! XPort-RS: Wallet and Transaction Layer for the XPort Cross-Chain Bridge
//!
//! This crate provides everything the XPort console needs to operate the
//! Sepolia <-> VeChain testnet token bridge:
//!
//! - **Chain Registry** - Static metadata for the two supported networks
//! - **Wallet Adapter** - One interface over an account-model (EIP-1193 style)
//!   signer and a clause-model (VeChain) signer
//! - **Transaction Submitter** - Validates user input and turns bridge/admin
//!   operations into calls sent through the active wallet
//! - **Status Poller** - Tracks cross-chain message settlement through the
//!   bridge status API
//! - **EVM Module** - Contract bindings and read helpers
//! - **Thor Module** - VeChain REST client and transaction signing
//! - **Testing Module** - In-memory doubles for every external seam
//!
//! ## Feature Flags
//!
//! - `testing` - Enable mock providers, backends, readers and status sources

pub mod address_book;
pub mod bridge;
pub mod chains;
pub mod deploy;
pub mod error;
pub mod evm;
pub mod gateway;
pub mod redact;
pub mod status;
pub mod submitter;
pub mod thor;
pub mod types;
pub mod units;
pub mod wallet;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use address_book::{AddressBook, AddressOverrides, ContractAddressSet, ContractRole};
pub use bridge::{BridgeDirection, BridgeFlow, BridgeOutcome, TokenBalances};
pub use chains::{ChainDescriptor, ChainRegistry, SEPOLIA_CHAIN_ID, VECHAIN_TESTNET_CHAIN_ID};
pub use error::{BridgeError, ErrorKind};
pub use status::{BridgeStatus, BridgeStatusRecord, PollPhase, PollerSnapshot, StatusPoller};
pub use submitter::{AdminCall, Operation, PreparedCall, Submitter};
pub use types::{Call, PendingTransaction, Receipt, TxHandle, TxStatus, WalletConnection, WalletKind};
pub use wallet::{WalletBackend, WalletHub};
