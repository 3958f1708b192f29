//! Local-key clause backend for the console
//!
//! Plays the part of the VeChain wallet SDK: the session is the configured
//! key's account, and clauses are signed here and broadcast through Thor.

use std::time::{SystemTime, UNIX_EPOCH};

use alloy::primitives::Address;
use alloy::signers::local::PrivateKeySigner;
use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use super::client::ThorClient;
use super::transaction::ThorTransaction;
use crate::error::BridgeError;
use crate::types::Receipt;
use crate::wallet::{Clause, ClauseBackend};

/// Blocks a transaction stays valid after its block ref
const EXPIRATION: u32 = 720;
/// Headroom added on top of executed gas, matching wallet SDK estimates
const GAS_HEADROOM: u64 = 15_000;

pub struct ThorClauseBackend {
    client: ThorClient,
    signer: PrivateKeySigner,
    chain_id: u64,
    chain_tag: OnceCell<u8>,
}

impl ThorClauseBackend {
    pub fn new(client: ThorClient, private_key: &str, chain_id: u64) -> Result<Self, BridgeError> {
        let signer: PrivateKeySigner = private_key
            .parse()
            .map_err(|e| BridgeError::Backend(format!("Invalid private key: {}", e)))?;

        info!(address = %signer.address(), chain_id = chain_id, "Clause signer initialized");

        Ok(Self {
            client,
            signer,
            chain_id,
            chain_tag: OnceCell::new(),
        })
    }

    async fn chain_tag(&self) -> Result<u8, BridgeError> {
        self.chain_tag
            .get_or_try_init(|| self.client.chain_tag())
            .await
            .copied()
    }

    async fn estimate_gas(&self, origin: Address, clauses: &[Clause]) -> Result<u64, BridgeError> {
        let outputs = self.client.simulate(clauses, Some(origin)).await?;

        if let Some(failed) = outputs.iter().find(|o| o.reverted) {
            return Err(BridgeError::TransactionReverted {
                tx: "simulation".to_string(),
                reason: if failed.vm_error.is_empty() {
                    "execution reverted".to_string()
                } else {
                    failed.vm_error.clone()
                },
            });
        }

        let executed: u64 = outputs.iter().map(|o| o.gas_used).sum();
        let headroom = if executed > 0 { GAS_HEADROOM } else { 0 };
        Ok(ThorTransaction::intrinsic_gas(clauses) + executed + headroom)
    }
}

fn fresh_nonce() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or_default()
}

#[async_trait]
impl ClauseBackend for ThorClauseBackend {
    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    async fn open_session(&self) -> Result<Address, BridgeError> {
        // Fails early if the node is unreachable or on an unexpected network
        self.chain_tag().await?;
        Ok(self.signer.address())
    }

    async fn send_clauses(&self, origin: Address, clauses: &[Clause]) -> Result<String, BridgeError> {
        if origin != self.signer.address() {
            return Err(BridgeError::Backend(format!(
                "Signer {} cannot send for {}",
                self.signer.address(),
                origin
            )));
        }

        let chain_tag = self.chain_tag().await?;
        let block_ref = self.client.best_block_ref().await?;
        let gas = self.estimate_gas(origin, clauses).await?;

        let tx = ThorTransaction {
            chain_tag,
            block_ref,
            expiration: EXPIRATION,
            clauses: clauses.to_vec(),
            gas_price_coef: 0,
            gas,
            depends_on: None,
            nonce: fresh_nonce(),
        };
        let signed = tx.sign(&self.signer)?;
        let local_id = signed.id();

        debug!(tx_id = %local_id, gas = gas, block_ref = block_ref, "Broadcasting clause transaction");
        let id = self.client.send_raw(&signed.encode()).await?;
        Ok(id)
    }

    async fn receipt(&self, id: &str) -> Result<Option<Receipt>, BridgeError> {
        let receipt = match self.client.receipt(id).await? {
            Some(r) => r,
            None => return Ok(None),
        };

        Ok(Some(Receipt {
            tx_hash: id.to_string(),
            success: !receipt.reverted,
            contract_address: receipt.outputs.iter().find_map(|o| o.contract_address),
            revert_reason: receipt.reverted.then(|| "Transaction reverted".to_string()),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chains::VECHAIN_TESTNET_CHAIN_ID;

    const KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    fn backend() -> ThorClauseBackend {
        let client = ThorClient::new("http://localhost:8669").unwrap();
        ThorClauseBackend::new(client, KEY, VECHAIN_TESTNET_CHAIN_ID).unwrap()
    }

    #[test]
    fn test_bad_key_rejected() {
        let client = ThorClient::new("http://localhost:8669").unwrap();
        assert!(ThorClauseBackend::new(client, "nope", VECHAIN_TESTNET_CHAIN_ID).is_err());
    }

    #[tokio::test]
    async fn test_foreign_origin_rejected_before_network() {
        let err = backend()
            .send_clauses(Address::with_last_byte(1), &[])
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::Backend(_)));
    }

    #[test]
    fn test_chain_id_is_fixed() {
        assert_eq!(backend().chain_id(), VECHAIN_TESTNET_CHAIN_ID);
    }
}
