//! Gateway admin reads
//!
//! Snapshot of the WMB gateway's configuration plus the caller's admin role,
//! shown before any admin call is made.

use std::collections::BTreeMap;

use alloy::primitives::{Address, B256, U256};
use tracing::{info, warn};

use crate::error::BridgeError;
use crate::evm::contracts::WmbGateway;
use crate::evm::reader::{read, ChainReader};
use crate::units::format_amount;

/// Per destination chain configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainFeeInfo {
    /// Base fee in 18-decimal native units
    pub base_fee: String,
    pub supported: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayState {
    pub chain_id: U256,
    pub default_gas_limit: U256,
    pub min_gas_limit: U256,
    pub max_gas_limit: U256,
    pub max_message_length: U256,
    pub signature_verifier: Address,
    pub storeman_admin: Address,
    pub admin_role: B256,
    pub is_admin: bool,
    /// Only chains whose reads succeeded
    pub chains: BTreeMap<u64, ChainFeeInfo>,
}

/// Read the gateway configuration
///
/// `is_admin` is false when no account is given. Failures reading one
/// watched chain are logged and that chain is left out.
pub async fn fetch_gateway_state(
    reader: &dyn ChainReader,
    gateway: Address,
    account: Option<Address>,
    chain_ids: &[u64],
) -> Result<GatewayState, BridgeError> {
    let (
        chain_id,
        default_gas_limit,
        min_gas_limit,
        max_gas_limit,
        max_message_length,
        signature_verifier,
        storeman_admin,
        admin_role,
    ) = tokio::try_join!(
        read(reader, gateway, WmbGateway::chainIdCall {}),
        read(reader, gateway, WmbGateway::defaultGasLimitCall {}),
        read(reader, gateway, WmbGateway::minGasLimitCall {}),
        read(reader, gateway, WmbGateway::maxGasLimitCall {}),
        read(reader, gateway, WmbGateway::maxMessageLengthCall {}),
        read(reader, gateway, WmbGateway::signatureVerifierCall {}),
        read(reader, gateway, WmbGateway::wanchainStoremanAdminSCCall {}),
        read(reader, gateway, WmbGateway::DEFAULT_ADMIN_ROLECall {}),
    )?;
    let admin_role = admin_role._0;

    let is_admin = match account {
        Some(account) => {
            read(
                reader,
                gateway,
                WmbGateway::hasRoleCall {
                    role: admin_role,
                    account,
                },
            )
            .await?
            ._0
        }
        None => false,
    };

    let mut chains = BTreeMap::new();
    for &id in chain_ids {
        let fee = read(reader, gateway, WmbGateway::baseFeesCall { chainId: U256::from(id) }).await;
        let supported = read(
            reader,
            gateway,
            WmbGateway::supportedDstChainsCall { chainId: U256::from(id) },
        )
        .await;

        match (fee, supported) {
            (Ok(fee), Ok(supported)) => {
                chains.insert(
                    id,
                    ChainFeeInfo {
                        base_fee: format_amount(fee._0),
                        supported: supported._0,
                    },
                );
            }
            (Err(e), _) | (_, Err(e)) => {
                warn!(chain_id = id, error = %e, "Failed to fetch gateway data for chain");
            }
        }
    }

    info!(gateway = %gateway, is_admin = is_admin, "Fetched gateway state");

    Ok(GatewayState {
        chain_id: chain_id._0,
        default_gas_limit: default_gas_limit._0,
        min_gas_limit: min_gas_limit._0,
        max_gas_limit: max_gas_limit._0,
        max_message_length: max_message_length._0,
        signature_verifier: signature_verifier._0,
        storeman_admin: storeman_admin._0,
        admin_role,
        is_admin,
        chains,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chains::{SEPOLIA_CHAIN_ID, VECHAIN_TESTNET_CHAIN_ID};
    use crate::testing::MockChainReader;
    use alloy::sol_types::{SolCall, SolValue};

    fn gateway_reader(gateway: Address) -> MockChainReader {
        let reader = MockChainReader::new();
        let word = |v: u64| U256::from(v);
        reader.respond_u256(gateway, WmbGateway::chainIdCall::SELECTOR, word(2147483708));
        reader.respond_u256(gateway, WmbGateway::defaultGasLimitCall::SELECTOR, word(400_000));
        reader.respond_u256(gateway, WmbGateway::minGasLimitCall::SELECTOR, word(21_000));
        reader.respond_u256(gateway, WmbGateway::maxGasLimitCall::SELECTOR, word(8_000_000));
        reader.respond_u256(gateway, WmbGateway::maxMessageLengthCall::SELECTOR, word(1024));
        reader.respond(
            gateway,
            WmbGateway::signatureVerifierCall::SELECTOR,
            Address::with_last_byte(0x51).abi_encode(),
        );
        reader.respond(
            gateway,
            WmbGateway::wanchainStoremanAdminSCCall::SELECTOR,
            Address::with_last_byte(0x52).abi_encode(),
        );
        reader.respond(
            gateway,
            WmbGateway::DEFAULT_ADMIN_ROLECall::SELECTOR,
            B256::ZERO.abi_encode(),
        );
        reader
    }

    #[tokio::test]
    async fn test_fetch_state_without_account() {
        let gateway = Address::with_last_byte(0x99);
        let reader = gateway_reader(gateway);

        let state = fetch_gateway_state(&reader, gateway, None, &[]).await.unwrap();
        assert_eq!(state.chain_id, U256::from(2147483708u64));
        assert_eq!(state.max_gas_limit, U256::from(8_000_000u64));
        assert_eq!(state.signature_verifier, Address::with_last_byte(0x51));
        assert!(!state.is_admin);
        assert!(state.chains.is_empty());
    }

    #[tokio::test]
    async fn test_failed_chain_reads_are_skipped() {
        let gateway = Address::with_last_byte(0x99);
        let reader = gateway_reader(gateway);
        reader.respond(gateway, WmbGateway::hasRoleCall::SELECTOR, true.abi_encode());
        // Same selector for every chain id, so both chains answer
        reader.respond_u256(
            gateway,
            WmbGateway::baseFeesCall::SELECTOR,
            U256::from(10_000_000_000_000_000u64),
        );

        let state = fetch_gateway_state(
            &reader,
            gateway,
            Some(Address::with_last_byte(1)),
            &[SEPOLIA_CHAIN_ID, VECHAIN_TESTNET_CHAIN_ID],
        )
        .await
        .unwrap();

        assert!(state.is_admin);
        // supportedDstChains has no response, so neither chain is reported
        assert!(state.chains.is_empty());

        reader.respond(gateway, WmbGateway::supportedDstChainsCall::SELECTOR, true.abi_encode());
        let state = fetch_gateway_state(&reader, gateway, None, &[SEPOLIA_CHAIN_ID])
            .await
            .unwrap();
        assert_eq!(state.chains[&SEPOLIA_CHAIN_ID].base_fee, "0.01");
        assert!(state.chains[&SEPOLIA_CHAIN_ID].supported);
    }

    #[tokio::test]
    async fn test_missing_gateway_fails() {
        let reader = MockChainReader::new();
        let result = fetch_gateway_state(&reader, Address::with_last_byte(1), None, &[]).await;
        assert!(result.is_err());
    }
}
