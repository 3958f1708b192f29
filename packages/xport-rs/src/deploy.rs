//! Contract deployment
//!
//! Three steps, each gated on the previous one's address being known:
//!
//! 1. MockERC20 on Sepolia (account-model, no constructor args)
//! 2. Erc20TokenHome(gateway, token) on Sepolia (account-model)
//! 3. Erc20TokenRemote(gateway, home, chainId, name, symbol) on VeChain
//!    (clause-model), paying the gateway's message fee
//!
//! Deployed addresses are read from the receipt and written to the address
//! book.

use std::path::Path;
use std::sync::Arc;

use alloy::primitives::{Address, Bytes, U256};
use alloy::sol_types::SolValue;
use eyre::{eyre, Result, WrapErr};
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::address_book::{AddressBook, ContractRole};
use crate::chains::VECHAIN_TESTNET_CHAIN_ID;
use crate::error::BridgeError;
use crate::evm::contracts::WmbGateway;
use crate::evm::reader::{read, ChainReader};
use crate::submitter::{PreparedCall, Submitter};
use crate::types::{Call, PendingTransaction, WalletKind};
use crate::units::parse_address;

/// Gas limit the remote constructor's setup message is priced at
pub const REMOTE_DEPLOY_GAS_LIMIT: u64 = 400_000;

#[derive(Debug, Deserialize)]
struct RawArtifact {
    #[serde(default)]
    abi: Value,
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    bytecode: Option<Value>,
}

/// Compiled contract: ABI plus creation bytecode
#[derive(Debug, Clone)]
pub struct ContractArtifact {
    pub name: String,
    pub abi: Value,
    pub bytecode: Bytes,
}

fn bytecode_hex(value: &Value) -> Option<&str> {
    match value {
        Value::String(s) => Some(s),
        Value::Object(map) => map.get("object").and_then(Value::as_str),
        _ => None,
    }
}

impl ContractArtifact {
    /// Parse a compiler artifact; accepts `data.bytecode.object` or a top-level `bytecode`
    pub fn from_json(name: &str, json: &str) -> Result<Self> {
        let raw: RawArtifact =
            serde_json::from_str(json).wrap_err_with(|| format!("Malformed artifact {}", name))?;

        let hex_code = raw
            .data
            .as_ref()
            .and_then(|d| d.get("bytecode"))
            .and_then(bytecode_hex)
            .or_else(|| raw.bytecode.as_ref().and_then(bytecode_hex))
            .ok_or_else(|| eyre!("Artifact {} has no bytecode", name))?;

        let code = hex::decode(hex_code.trim_start_matches("0x"))
            .wrap_err_with(|| format!("Artifact {} bytecode is not hex", name))?;
        if code.is_empty() {
            return Err(eyre!("Artifact {} bytecode is empty", name));
        }

        Ok(Self {
            name: name.to_string(),
            abi: raw.abi,
            bytecode: Bytes::from(code),
        })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("artifact")
            .to_string();
        let json = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("Failed to read {}", path.display()))?;
        Self::from_json(&name, &json)
    }

    /// Creation code followed by ABI-encoded constructor arguments
    pub fn init_code(&self, constructor_args: &[u8]) -> Bytes {
        let mut code = self.bytecode.to_vec();
        code.extend_from_slice(constructor_args);
        Bytes::from(code)
    }
}

/// The three artifacts, loaded from one directory
#[derive(Debug, Clone)]
pub struct ArtifactSet {
    pub mock_erc20: ContractArtifact,
    pub token_home: ContractArtifact,
    pub token_remote: ContractArtifact,
}

impl ArtifactSet {
    pub fn load_dir(dir: &Path) -> Result<Self> {
        Ok(Self {
            mock_erc20: ContractArtifact::load(&dir.join("MockErc20.json"))?,
            token_home: ContractArtifact::load(&dir.join("Erc20TokenHome.json"))?,
            token_remote: ContractArtifact::load(&dir.join("Erc20TokenRemote.json"))?,
        })
    }
}

pub struct Deployer {
    submitter: Arc<Submitter>,
    book: Arc<AddressBook>,
    /// Reads on VeChain, used to price the remote's setup message
    vechain: Arc<dyn ChainReader>,
}

impl Deployer {
    pub fn new(submitter: Arc<Submitter>, book: Arc<AddressBook>, vechain: Arc<dyn ChainReader>) -> Self {
        Self {
            submitter,
            book,
            vechain,
        }
    }

    fn required(&self, role: ContractRole) -> Result<Address, BridgeError> {
        let value = self.book.get(role);
        if value.trim().is_empty() {
            return Err(BridgeError::validation(
                role.key(),
                format!("deploy or enter the {} address first", role.key()),
            ));
        }
        parse_address(role.key(), &value)
    }

    async fn deploy(
        &self,
        role: ContractRole,
        artifact: &ContractArtifact,
        call: Call,
        required: WalletKind,
    ) -> PendingTransaction {
        let prepared = PreparedCall {
            operation: "deploy",
            call,
            required: Some(required),
            success_message: format!("{} deployed", artifact.name),
        };
        let record = self.submitter.submit_prepared(prepared).await;

        if record.is_success() {
            match record.contract_address {
                Some(address) => {
                    info!(contract = %artifact.name, address = %address, "Contract deployed");
                    if let Err(e) = self.book.set(role, &address.to_string()) {
                        warn!(error = %e, "Failed to cache deployed address");
                    }
                }
                None => warn!(contract = %artifact.name, "Receipt carried no contract address"),
            }
        }
        record
    }

    pub async fn deploy_mock_erc20(&self, artifact: &ContractArtifact) -> PendingTransaction {
        let call = Call::create(U256::ZERO, artifact.init_code(&[]));
        self.deploy(ContractRole::MockErc20, artifact, call, WalletKind::AccountModel)
            .await
    }

    pub async fn deploy_token_home(&self, artifact: &ContractArtifact) -> PendingTransaction {
        let args = match (
            self.required(ContractRole::Gateway),
            self.required(ContractRole::MockErc20),
        ) {
            (Ok(gateway), Ok(token)) => (gateway, token).abi_encode_params(),
            (Err(e), _) | (_, Err(e)) => {
                return self.submitter.reject(WalletKind::AccountModel, &e);
            }
        };

        let call = Call::create(U256::ZERO, artifact.init_code(&args));
        self.deploy(ContractRole::TokenHome, artifact, call, WalletKind::AccountModel)
            .await
    }

    pub async fn deploy_token_remote(
        &self,
        artifact: &ContractArtifact,
        name: &str,
        symbol: &str,
    ) -> PendingTransaction {
        let (gateway, home) = match (
            self.required(ContractRole::Gateway),
            self.required(ContractRole::TokenHome),
        ) {
            (Ok(gateway), Ok(home)) => (gateway, home),
            (Err(e), _) | (_, Err(e)) => {
                return self.submitter.reject(WalletKind::ClauseModel, &e);
            }
        };
        if name.trim().is_empty() || symbol.trim().is_empty() {
            let e = BridgeError::validation("token", "name and symbol are required");
            return self.submitter.reject(WalletKind::ClauseModel, &e);
        }

        let fee = match read(
            self.vechain.as_ref(),
            gateway,
            WmbGateway::estimateFeeCall {
                targetChainId: U256::from(VECHAIN_TESTNET_CHAIN_ID),
                gasLimit: U256::from(REMOTE_DEPLOY_GAS_LIMIT),
            },
        )
        .await
        {
            Ok(fee) => fee._0,
            Err(e) => return self.submitter.reject(WalletKind::ClauseModel, &e),
        };

        let args = (
            gateway,
            home,
            U256::from(VECHAIN_TESTNET_CHAIN_ID),
            name.trim().to_string(),
            symbol.trim().to_string(),
        )
            .abi_encode_params();

        let call = Call::create(fee, artifact.init_code(&args));
        self.deploy(ContractRole::TokenRemote, artifact, call, WalletKind::ClauseModel)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_nested_bytecode() {
        let json = r#"{ "abi": [], "data": { "bytecode": { "object": "6080604052" } } }"#;
        let artifact = ContractArtifact::from_json("MockErc20", json).unwrap();
        assert_eq!(artifact.bytecode, Bytes::from(vec![0x60, 0x80, 0x60, 0x40, 0x52]));
    }

    #[test]
    fn test_artifact_top_level_bytecode() {
        let json = r#"{ "abi": [], "bytecode": "0x6080" }"#;
        let artifact = ContractArtifact::from_json("Erc20TokenHome", json).unwrap();
        assert_eq!(artifact.bytecode.len(), 2);

        let json = r#"{ "abi": [], "bytecode": { "object": "0x60" } }"#;
        assert!(ContractArtifact::from_json("x", json).is_ok());
    }

    #[test]
    fn test_artifact_without_bytecode_fails() {
        assert!(ContractArtifact::from_json("x", r#"{ "abi": [] }"#).is_err());
        assert!(ContractArtifact::from_json("x", r#"{ "bytecode": "zz" }"#).is_err());
    }

    #[test]
    fn test_init_code_appends_args() {
        let artifact = ContractArtifact::from_json("x", r#"{ "bytecode": "0x60" }"#).unwrap();
        let args = (Address::ZERO, Address::ZERO).abi_encode_params();
        let code = artifact.init_code(&args);
        assert_eq!(code.len(), 1 + 64);
        assert_eq!(code[0], 0x60);
    }
}
