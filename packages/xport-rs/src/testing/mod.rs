//! Testing Utilities Module
//!
//! In-memory doubles for every external seam, each with call counters so
//! tests can assert what did (or did not) reach the network.
//!
//! ## Submodules
//!
//! - `chain` - `MockChainReader` answering contract reads by selector
//! - `wallets` - `MockEip1193Provider` and `MockClauseBackend`
//! - `status` - `MockStatusSource` with scripted responses

pub mod chain;
pub mod status;
pub mod wallets;

// Re-export commonly used items
pub use chain::*;
pub use status::*;
pub use wallets::*;
