//! Read-only contract calls
//!
//! [`ChainReader`] is the seam for `eth_call`-style reads. Sepolia reads go
//! through [`RpcReader`] (alloy HTTP provider); VeChain reads go through the
//! Thor REST client, which implements the same trait.

use alloy::{
    network::TransactionBuilder,
    primitives::{Address, Bytes},
    providers::{Provider, ProviderBuilder, RootProvider},
    rpc::types::TransactionRequest,
    sol_types::SolCall,
    transports::http::{Client, Http},
};
use async_trait::async_trait;
use tracing::info;

use crate::error::BridgeError;

/// Executes a read-only call against a contract
#[async_trait]
pub trait ChainReader: Send + Sync {
    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, BridgeError>;
}

/// Encode `call`, execute it through `reader`, and decode the return tuple
pub async fn read<C: SolCall>(
    reader: &dyn ChainReader,
    to: Address,
    call: C,
) -> Result<C::Return, BridgeError> {
    let output = reader.call(to, Bytes::from(call.abi_encode())).await?;
    C::abi_decode_returns(&output, true).map_err(|e| {
        BridgeError::Backend(format!(
            "Failed to decode {} from {}: {}",
            C::SIGNATURE,
            to,
            e
        ))
    })
}

/// JSON-RPC reader for account-model chains
pub struct RpcReader {
    provider: RootProvider<Http<Client>>,
    chain_id: u64,
}

impl RpcReader {
    pub fn new(rpc_url: &str, chain_id: u64) -> Result<Self, BridgeError> {
        let provider = ProviderBuilder::new().on_http(
            rpc_url
                .parse()
                .map_err(|e| BridgeError::Backend(format!("Invalid RPC URL: {}", e)))?,
        );

        info!(rpc_url = %rpc_url, chain_id = chain_id, "Created read-only EVM client");

        Ok(Self { provider, chain_id })
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }
}

#[async_trait]
impl ChainReader for RpcReader {
    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, BridgeError> {
        let tx = TransactionRequest::default().with_to(to).with_input(data);
        self.provider
            .call(&tx)
            .await
            .map_err(|e| BridgeError::Backend(format!("eth_call to {} failed: {}", to, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rpc_reader_rejects_bad_url() {
        assert!(RpcReader::new("not a url", 1).is_err());
    }

    #[test]
    fn test_rpc_reader_keeps_chain_id() {
        let reader = RpcReader::new("http://localhost:8545", 31337).unwrap();
        assert_eq!(reader.chain_id(), 31337);
    }
}
