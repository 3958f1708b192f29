//! Chain Registry
//!
//! Static metadata for the two networks the bridge spans. Descriptors are
//! process-lifetime constants; configuration overrides produce a new registry
//! rather than mutating an existing descriptor.

use serde::Serialize;

use crate::types::WalletKind;

pub const SEPOLIA_CHAIN_ID: u64 = 11155111;
/// BIP44-derived id the gateway uses for VeChain testnet
pub const VECHAIN_TESTNET_CHAIN_ID: u64 = 2147483708;

/// Metadata for one supported network
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainDescriptor {
    pub id: u64,
    pub name: String,
    /// EVM JSON-RPC endpoint; this is what a wallet stores when it adds the chain
    pub rpc_url: String,
    /// Thor REST base for clause-model chains
    pub node_url: Option<String>,
    pub symbol: String,
    pub explorer: String,
    /// Wallet backend that signs for this chain
    pub wallet_kind: WalletKind,
}

/// Chain-add payload sent to an account-model wallet that does not know a chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddChainParams {
    pub chain_id: String,
    pub chain_name: String,
    pub rpc_urls: Vec<String>,
    pub native_currency: NativeCurrency,
    pub block_explorer_urls: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NativeCurrency {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

/// Encode a numeric chain id the way wallets expect it (`0xaa36a7`)
pub fn chain_id_hex(id: u64) -> String {
    format!("0x{:x}", id)
}

/// Decode `0x`-prefixed hex or plain decimal chain ids
pub fn parse_chain_id(s: &str) -> Option<u64> {
    let s = s.trim();
    match s.strip_prefix("0x") {
        Some(hex) => u64::from_str_radix(hex, 16).ok(),
        None => s.parse().ok(),
    }
}

/// Table of supported chains
#[derive(Debug, Clone)]
pub struct ChainRegistry {
    chains: Vec<ChainDescriptor>,
}

impl Default for ChainRegistry {
    fn default() -> Self {
        Self::testnets()
    }
}

impl ChainRegistry {
    /// Sepolia and VeChain testnet
    pub fn testnets() -> Self {
        Self {
            chains: vec![
                ChainDescriptor {
                    id: SEPOLIA_CHAIN_ID,
                    name: "Sepolia".to_string(),
                    rpc_url: "https://ethereum-sepolia-rpc.publicnode.com".to_string(),
                    node_url: None,
                    symbol: "ETH".to_string(),
                    explorer: "https://sepolia.etherscan.io".to_string(),
                    wallet_kind: WalletKind::AccountModel,
                },
                ChainDescriptor {
                    id: VECHAIN_TESTNET_CHAIN_ID,
                    name: "VeChain Testnet".to_string(),
                    rpc_url: "https://testnet.rpc.vechain.org".to_string(),
                    node_url: Some("https://testnet.vechain.org".to_string()),
                    symbol: "VET".to_string(),
                    explorer: "https://explore-testnet.vechain.org".to_string(),
                    wallet_kind: WalletKind::ClauseModel,
                },
            ],
        }
    }

    /// Copy of this registry with one chain's endpoint replaced
    pub fn with_rpc_override(&self, id: u64, rpc_url: &str) -> Self {
        let chains = self
            .chains
            .iter()
            .map(|c| {
                if c.id == id {
                    ChainDescriptor {
                        rpc_url: rpc_url.to_string(),
                        ..c.clone()
                    }
                } else {
                    c.clone()
                }
            })
            .collect();
        Self { chains }
    }

    /// Copy of this registry with one chain's Thor REST base replaced
    pub fn with_node_override(&self, id: u64, node_url: &str) -> Self {
        let chains = self
            .chains
            .iter()
            .map(|c| {
                if c.id == id {
                    ChainDescriptor {
                        node_url: Some(node_url.to_string()),
                        ..c.clone()
                    }
                } else {
                    c.clone()
                }
            })
            .collect();
        Self { chains }
    }

    pub fn get(&self, id: u64) -> Option<&ChainDescriptor> {
        self.chains.iter().find(|c| c.id == id)
    }

    /// First chain signed for by the given wallet kind
    pub fn by_kind(&self, kind: WalletKind) -> Option<&ChainDescriptor> {
        self.chains.iter().find(|c| c.wallet_kind == kind)
    }

    pub fn all(&self) -> &[ChainDescriptor] {
        &self.chains
    }

    pub fn ids(&self) -> Vec<u64> {
        self.chains.iter().map(|c| c.id).collect()
    }

    pub fn explorer_tx_url(&self, id: u64, tx: &str) -> Option<String> {
        self.get(id)
            .map(|c| format!("{}/tx/{}", c.explorer.trim_end_matches('/'), tx))
    }

    pub fn add_chain_params(&self, id: u64) -> Option<AddChainParams> {
        self.get(id).map(|c| AddChainParams {
            chain_id: chain_id_hex(c.id),
            chain_name: c.name.clone(),
            rpc_urls: vec![c.rpc_url.clone()],
            native_currency: NativeCurrency {
                name: c.symbol.clone(),
                symbol: c.symbol.clone(),
                decimals: 18,
            },
            block_explorer_urls: vec![c.explorer.clone()],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_testnets_registry() {
        let registry = ChainRegistry::testnets();
        assert_eq!(registry.all().len(), 2);
        assert_eq!(registry.get(SEPOLIA_CHAIN_ID).unwrap().symbol, "ETH");
        assert_eq!(
            registry.by_kind(WalletKind::ClauseModel).unwrap().id,
            VECHAIN_TESTNET_CHAIN_ID
        );
        assert!(registry.get(1).is_none());
    }

    #[test]
    fn test_chain_id_hex_roundtrip() {
        assert_eq!(chain_id_hex(SEPOLIA_CHAIN_ID), "0xaa36a7");
        assert_eq!(parse_chain_id("0xaa36a7"), Some(SEPOLIA_CHAIN_ID));
        assert_eq!(parse_chain_id("11155111"), Some(SEPOLIA_CHAIN_ID));
        assert_eq!(parse_chain_id("0xzz"), None);
    }

    #[test]
    fn test_add_chain_params_shape() {
        let registry = ChainRegistry::testnets();
        let params = registry.add_chain_params(SEPOLIA_CHAIN_ID).unwrap();
        let json = serde_json::to_value(&params).unwrap();
        assert_eq!(json["chainId"], "0xaa36a7");
        assert_eq!(json["chainName"], "Sepolia");
        assert_eq!(json["nativeCurrency"]["decimals"], 18);
        assert_eq!(json["blockExplorerUrls"][0], "https://sepolia.etherscan.io");
    }

    #[test]
    fn test_vechain_add_chain_uses_json_rpc_endpoint() {
        let registry = ChainRegistry::testnets();
        let params = registry.add_chain_params(VECHAIN_TESTNET_CHAIN_ID).unwrap();
        assert_eq!(params.rpc_urls, vec!["https://testnet.rpc.vechain.org"]);
        assert_eq!(params.chain_id, "0x8000003c");

        let vechain = registry.get(VECHAIN_TESTNET_CHAIN_ID).unwrap();
        assert_eq!(vechain.node_url.as_deref(), Some("https://testnet.vechain.org"));
        assert!(registry.get(SEPOLIA_CHAIN_ID).unwrap().node_url.is_none());
    }

    #[test]
    fn test_node_override_keeps_wallet_endpoint() {
        let registry = ChainRegistry::testnets()
            .with_node_override(VECHAIN_TESTNET_CHAIN_ID, "http://localhost:8669");
        let vechain = registry.get(VECHAIN_TESTNET_CHAIN_ID).unwrap();
        assert_eq!(vechain.node_url.as_deref(), Some("http://localhost:8669"));
        assert_eq!(vechain.rpc_url, "https://testnet.rpc.vechain.org");
    }

    #[test]
    fn test_rpc_override_leaves_original() {
        let registry = ChainRegistry::testnets();
        let custom = registry.with_rpc_override(SEPOLIA_CHAIN_ID, "http://localhost:8545");
        assert_eq!(custom.get(SEPOLIA_CHAIN_ID).unwrap().rpc_url, "http://localhost:8545");
        assert_ne!(registry.get(SEPOLIA_CHAIN_ID).unwrap().rpc_url, "http://localhost:8545");
    }

    #[test]
    fn test_explorer_tx_url() {
        let registry = ChainRegistry::testnets();
        assert_eq!(
            registry.explorer_tx_url(SEPOLIA_CHAIN_ID, "0xabc").unwrap(),
            "https://sepolia.etherscan.io/tx/0xabc"
        );
    }
}
