//! VeChain Thor Support Module
//!
//! ## Submodules
//!
//! - `client` - REST client for a Thor node (also a [`ChainReader`](crate::evm::ChainReader))
//! - `transaction` - RLP body, blake2b signing hash, signature and tx id
//! - `backend` - clause-model wallet backend signing with a local key

pub mod backend;
pub mod client;
pub mod transaction;

pub use backend::ThorClauseBackend;
pub use client::{ClauseOutput, ThorClient, ThorReceipt};
pub use transaction::{blake2b256, SignedThorTransaction, ThorTransaction};
