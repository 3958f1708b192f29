//! VeChain Thor REST client
//!
//! Covers the handful of node endpoints the bridge needs: block references,
//! the genesis chain tag, clause simulation, raw transaction broadcast and
//! receipt lookup. Simulation doubles as the read path, so the client also
//! implements [`ChainReader`].

use std::time::Duration;

use alloy::primitives::{Address, Bytes};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::BridgeError;
use crate::evm::ChainReader;
use crate::wallet::Clause;

#[derive(Debug, Clone, Deserialize)]
struct BlockSummary {
    id: String,
}

#[derive(Debug, Serialize)]
struct SimulateRequest<'a> {
    clauses: &'a [Clause],
    #[serde(skip_serializing_if = "Option::is_none")]
    caller: Option<Address>,
}

/// Per-clause result of `POST /accounts/*`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClauseOutput {
    pub data: Bytes,
    pub gas_used: u64,
    pub reverted: bool,
    #[serde(default)]
    pub vm_error: String,
}

#[derive(Debug, Serialize)]
struct RawTransaction {
    raw: String,
}

#[derive(Debug, Deserialize)]
struct TransactionId {
    id: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptOutput {
    #[serde(default)]
    pub contract_address: Option<Address>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThorReceipt {
    pub reverted: bool,
    #[serde(default)]
    pub outputs: Vec<ReceiptOutput>,
}

#[derive(Clone)]
pub struct ThorClient {
    base_url: String,
    client: Client,
}

impl ThorClient {
    pub fn new(base_url: &str) -> Result<Self, BridgeError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| BridgeError::Backend(format!("Failed to create HTTP client: {}", e)))?;

        info!(node = %base_url, "Thor client initialized");

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn check(response: reqwest::Response, what: &str) -> Result<reqwest::Response, BridgeError> {
        if response.status().is_success() {
            return Ok(response);
        }
        Err(BridgeError::Backend(format!(
            "{} failed: {} - {}",
            what,
            response.status(),
            response.text().await.unwrap_or_default()
        )))
    }

    async fn block(&self, revision: &str) -> Result<BlockSummary, BridgeError> {
        let url = format!("{}/blocks/{}", self.base_url, revision);
        let response = self.client.get(&url).send().await?;
        let response = Self::check(response, "Block query").await?;
        Ok(response.json().await?)
    }

    fn id_bytes(id: &str) -> Result<Vec<u8>, BridgeError> {
        let bytes = hex::decode(id.trim_start_matches("0x"))
            .map_err(|e| BridgeError::Backend(format!("Malformed block id {}: {}", id, e)))?;
        if bytes.len() != 32 {
            return Err(BridgeError::Backend(format!("Malformed block id {}", id)));
        }
        Ok(bytes)
    }

    /// Last byte of the genesis block id
    pub async fn chain_tag(&self) -> Result<u8, BridgeError> {
        let genesis = self.block("0").await?;
        let bytes = Self::id_bytes(&genesis.id)?;
        Ok(bytes[31])
    }

    /// First 8 bytes of the best block id
    pub async fn best_block_ref(&self) -> Result<u64, BridgeError> {
        let best = self.block("best").await?;
        let bytes = Self::id_bytes(&best.id)?;
        let mut block_ref = [0u8; 8];
        block_ref.copy_from_slice(&bytes[..8]);
        Ok(u64::from_be_bytes(block_ref))
    }

    /// Execute `clauses` against the best block without committing
    pub async fn simulate(
        &self,
        clauses: &[Clause],
        caller: Option<Address>,
    ) -> Result<Vec<ClauseOutput>, BridgeError> {
        let url = format!("{}/accounts/*", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&SimulateRequest { clauses, caller })
            .send()
            .await?;
        let response = Self::check(response, "Clause simulation").await?;
        let outputs: Vec<ClauseOutput> = response.json().await?;
        debug!(clauses = clauses.len(), "Simulated clauses");
        Ok(outputs)
    }

    /// Broadcast a signed transaction and return the node's id for it
    pub async fn send_raw(&self, raw: &[u8]) -> Result<String, BridgeError> {
        let url = format!("{}/transactions", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&RawTransaction {
                raw: format!("0x{}", hex::encode(raw)),
            })
            .send()
            .await?;
        let response = Self::check(response, "Transaction broadcast").await?;
        let id: TransactionId = response.json().await?;
        Ok(id.id)
    }

    /// `None` until the transaction is packed into a block
    pub async fn receipt(&self, id: &str) -> Result<Option<ThorReceipt>, BridgeError> {
        let url = format!("{}/transactions/{}/receipt", self.base_url, id);
        let response = self.client.get(&url).send().await?;
        let response = Self::check(response, "Receipt query").await?;
        Ok(response.json().await?)
    }
}

#[async_trait]
impl ChainReader for ThorClient {
    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, BridgeError> {
        let clause = Clause {
            to: Some(to),
            value: Default::default(),
            data,
        };
        let outputs = self.simulate(std::slice::from_ref(&clause), None).await?;
        let output = outputs
            .into_iter()
            .next()
            .ok_or_else(|| BridgeError::Backend(format!("Empty call result from {}", to)))?;

        if output.reverted {
            return Err(BridgeError::Backend(format!(
                "Call to {} reverted: {}",
                to, output.vm_error
            )));
        }
        Ok(output.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_slash_trimmed() {
        let client = ThorClient::new("https://testnet.vechain.org/").unwrap();
        assert_eq!(client.base_url(), "https://testnet.vechain.org");
    }

    #[test]
    fn test_id_bytes_requires_32_bytes() {
        assert!(ThorClient::id_bytes("0x1234").is_err());
        let id = format!("0x{}", "00".repeat(31) + "27");
        assert_eq!(ThorClient::id_bytes(&id).unwrap()[31], 0x27);
    }

    #[test]
    fn test_receipt_deserialize() {
        let json = r#"{
            "gasUsed": 21000,
            "reverted": false,
            "outputs": [{ "contractAddress": "0x7567d83b7b8d80addcb281a71d54fc7b3364ffed", "events": [] }]
        }"#;
        let receipt: ThorReceipt = serde_json::from_str(json).unwrap();
        assert!(!receipt.reverted);
        assert!(receipt.outputs[0].contract_address.is_some());

        let pending: Option<ThorReceipt> = serde_json::from_str("null").unwrap();
        assert!(pending.is_none());
    }

    #[test]
    fn test_clause_output_deserialize() {
        let json = r#"[{ "data": "0x2a", "events": [], "transfers": [], "gasUsed": 591, "reverted": false, "vmError": "" }]"#;
        let outputs: Vec<ClauseOutput> = serde_json::from_str(json).unwrap();
        assert_eq!(outputs[0].gas_used, 591);
        assert_eq!(outputs[0].data, Bytes::from(vec![0x2a]));
    }
}
