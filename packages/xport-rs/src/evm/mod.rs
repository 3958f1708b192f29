//! EVM Contract Support Module
//!
//! ## Submodules
//!
//! - `contracts` - sol! bindings for MockERC20, Erc20TokenHome, Erc20TokenRemote, WmbGateway
//! - `reader` - read-only call seam and the JSON-RPC implementation
//! - `tokens` - ERC20 balance/allowance/metadata helpers

pub mod contracts;
pub mod reader;
pub mod tokens;

// Re-export commonly used items
pub use contracts::{Erc20TokenHome, Erc20TokenRemote, MockERC20, WmbGateway};
pub use reader::{read, ChainReader, RpcReader};
pub use tokens::{get_token_allowance, get_token_balance, get_token_info, TokenInfo};
