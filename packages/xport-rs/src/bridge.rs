//! Bridge flow
//!
//! Moves tokens between Sepolia and VeChain:
//!
//! - Sepolia -> VeChain: account-model wallet; approve Erc20TokenHome if the
//!   MockERC20 allowance is short (awaiting confirmation), then `crossTo`
//! - VeChain -> Sepolia: clause-model wallet; a single `crossBack` clause
//!
//! The source transaction id of a successful transfer is returned so the
//! caller can hand it to the status poller. Balances are not refreshed here;
//! the caller re-reads them after a settled operation.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use alloy::primitives::{Address, U256};
use tracing::{info, warn};

use crate::address_book::{AddressBook, ContractRole};
use crate::chains::{SEPOLIA_CHAIN_ID, VECHAIN_TESTNET_CHAIN_ID};
use crate::error::BridgeError;
use crate::evm::reader::ChainReader;
use crate::evm::tokens::{get_token_allowance, get_token_balance};
use crate::submitter::{Operation, Submitter};
use crate::types::{PendingTransaction, WalletKind};
use crate::units::{format_amount, parse_address, parse_amount};

/// Message fee pre-filled by the front-end, in native units
pub const DEFAULT_MESSAGE_FEE: &str = "0.01";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeDirection {
    SepoliaToVeChain,
    VeChainToSepolia,
}

impl BridgeDirection {
    pub fn source_chain(&self) -> u64 {
        match self {
            BridgeDirection::SepoliaToVeChain => SEPOLIA_CHAIN_ID,
            BridgeDirection::VeChainToSepolia => VECHAIN_TESTNET_CHAIN_ID,
        }
    }

    pub fn destination_chain(&self) -> u64 {
        match self {
            BridgeDirection::SepoliaToVeChain => VECHAIN_TESTNET_CHAIN_ID,
            BridgeDirection::VeChainToSepolia => SEPOLIA_CHAIN_ID,
        }
    }

    /// Wallet that signs on the source chain
    pub fn wallet_kind(&self) -> WalletKind {
        match self {
            BridgeDirection::SepoliaToVeChain => WalletKind::AccountModel,
            BridgeDirection::VeChainToSepolia => WalletKind::ClauseModel,
        }
    }

    pub fn reversed(&self) -> Self {
        match self {
            BridgeDirection::SepoliaToVeChain => BridgeDirection::VeChainToSepolia,
            BridgeDirection::VeChainToSepolia => BridgeDirection::SepoliaToVeChain,
        }
    }
}

impl fmt::Display for BridgeDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BridgeDirection::SepoliaToVeChain => f.write_str("sepolia-to-vechain"),
            BridgeDirection::VeChainToSepolia => f.write_str("vechain-to-sepolia"),
        }
    }
}

impl FromStr for BridgeDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sepolia-to-vechain" => Ok(BridgeDirection::SepoliaToVeChain),
            "vechain-to-sepolia" => Ok(BridgeDirection::VeChainToSepolia),
            other => Err(format!(
                "unknown direction '{}' (expected sepolia-to-vechain or vechain-to-sepolia)",
                other
            )),
        }
    }
}

/// Records produced by one bridge attempt, in submission order
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BridgeOutcome {
    pub records: Vec<PendingTransaction>,
    /// Source transaction to poll, set only when the transfer succeeded
    pub source_tx: Option<String>,
}

impl BridgeOutcome {
    fn single(record: PendingTransaction) -> Self {
        Self {
            records: vec![record],
            source_tx: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.source_tx.is_some()
    }
}

/// Token balances in 18-decimal units; `"0"` when unavailable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenBalances {
    pub sepolia: String,
    pub vechain: String,
}

pub struct BridgeFlow {
    submitter: Arc<Submitter>,
    book: Arc<AddressBook>,
    sepolia: Arc<dyn ChainReader>,
    vechain: Arc<dyn ChainReader>,
}

impl BridgeFlow {
    pub fn new(
        submitter: Arc<Submitter>,
        book: Arc<AddressBook>,
        sepolia: Arc<dyn ChainReader>,
        vechain: Arc<dyn ChainReader>,
    ) -> Self {
        Self {
            submitter,
            book,
            sepolia,
            vechain,
        }
    }

    /// Address of the connected `kind` wallet, or the precondition failure
    fn sender(&self, kind: WalletKind, operation: &str) -> Result<Address, BridgeError> {
        self.submitter
            .wallets()
            .connection(kind)
            .address
            .ok_or_else(|| BridgeError::UnsupportedWalletForOperation {
                operation: operation.to_string(),
                required: kind,
            })
    }

    /// Bridge `amount` tokens in `direction`, paying `fee` to the gateway
    ///
    /// `recipient` defaults to the sender's own address.
    pub async fn bridge(
        &self,
        direction: BridgeDirection,
        amount: &str,
        fee: &str,
        recipient: Option<&str>,
    ) -> BridgeOutcome {
        let kind = direction.wallet_kind();
        let operation_name = match direction {
            BridgeDirection::SepoliaToVeChain => "crossTo",
            BridgeDirection::VeChainToSepolia => "crossBack",
        };

        let sender = match self.sender(kind, operation_name) {
            Ok(sender) => sender,
            Err(e) => return BridgeOutcome::single(self.submitter.reject(kind, &e)),
        };
        let to_user = recipient
            .map(str::to_string)
            .unwrap_or_else(|| sender.to_string());

        let addresses = self.book.addresses();
        let cross = match direction {
            BridgeDirection::SepoliaToVeChain => Operation::CrossTo {
                token_home: addresses.token_home.clone(),
                to_user,
                amount: amount.to_string(),
                fee: fee.to_string(),
            },
            BridgeDirection::VeChainToSepolia => Operation::CrossBack {
                token_remote: addresses.token_remote.clone(),
                to_user,
                amount: amount.to_string(),
                fee: fee.to_string(),
            },
        };

        // Everything is validated before the first network read
        if let Err(e) = cross.prepare() {
            return BridgeOutcome::single(self.submitter.reject(kind, &e));
        }

        let mut outcome = BridgeOutcome::default();

        if direction == BridgeDirection::SepoliaToVeChain {
            match self.ensure_allowance(sender, amount).await {
                Ok(None) => {}
                Ok(Some(approval)) => {
                    let approved = approval.is_success();
                    outcome.records.push(approval);
                    if !approved {
                        return outcome;
                    }
                }
                Err(e) => {
                    outcome.records.push(self.submitter.reject(kind, &e));
                    return outcome;
                }
            }
        }

        let record = self.submitter.submit(&cross).await;
        if record.is_success() {
            info!(
                direction = %direction,
                tx = %record.tx_identifier,
                "Bridge transfer submitted"
            );
            outcome.source_tx = Some(record.tx_identifier.clone());
        }
        outcome.records.push(record);
        outcome
    }

    /// Approve Erc20TokenHome for `amount` unless the allowance already covers it
    ///
    /// Returns the approval record when one was needed.
    async fn ensure_allowance(
        &self,
        owner: Address,
        amount: &str,
    ) -> Result<Option<PendingTransaction>, BridgeError> {
        let addresses = self.book.addresses();
        let token = parse_address(ContractRole::MockErc20.key(), &addresses.mock_erc20)?;
        let home = parse_address(ContractRole::TokenHome.key(), &addresses.token_home)?;
        let needed = parse_amount("amount", amount)?;

        let allowance = get_token_allowance(self.sepolia.as_ref(), token, owner, home)
            .await
            .unwrap_or_else(|e| {
                warn!(error = %e, "Failed to check allowance, assuming none");
                U256::ZERO
            });

        if allowance >= needed {
            info!(allowance = %allowance, "Allowance sufficient, skipping approve");
            return Ok(None);
        }

        let approve = Operation::Approve {
            token: addresses.mock_erc20,
            spender: addresses.token_home,
            amount: amount.to_string(),
        };
        Ok(Some(self.submitter.submit(&approve).await))
    }

    /// MockERC20 on Sepolia and Erc20TokenRemote on VeChain for the connected wallets
    pub async fn balances(&self) -> TokenBalances {
        let addresses = self.book.addresses();
        let wallets = self.submitter.wallets();

        let sepolia = self
            .balance_of(
                self.sepolia.as_ref(),
                ContractRole::MockErc20,
                &addresses.mock_erc20,
                wallets.connection(WalletKind::AccountModel).address,
            )
            .await;
        let vechain = self
            .balance_of(
                self.vechain.as_ref(),
                ContractRole::TokenRemote,
                &addresses.token_remote,
                wallets.connection(WalletKind::ClauseModel).address,
            )
            .await;

        TokenBalances { sepolia, vechain }
    }

    async fn balance_of(
        &self,
        reader: &dyn ChainReader,
        role: ContractRole,
        token: &str,
        holder: Option<Address>,
    ) -> String {
        let holder = match holder {
            Some(holder) => holder,
            None => return "0".to_string(),
        };
        let token = match parse_address(role.key(), token) {
            Ok(token) => token,
            Err(_) => return "0".to_string(),
        };

        match get_token_balance(reader, token, holder).await {
            Ok(balance) => format_amount(balance),
            Err(e) => {
                warn!(token = %role, error = %e, "Failed to fetch balance");
                "0".to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_round_trip_names() {
        for direction in [BridgeDirection::SepoliaToVeChain, BridgeDirection::VeChainToSepolia] {
            assert_eq!(direction.to_string().parse::<BridgeDirection>().unwrap(), direction);
        }
        assert!("north".parse::<BridgeDirection>().is_err());
    }

    #[test]
    fn test_direction_chains() {
        let d = BridgeDirection::SepoliaToVeChain;
        assert_eq!(d.source_chain(), SEPOLIA_CHAIN_ID);
        assert_eq!(d.destination_chain(), VECHAIN_TESTNET_CHAIN_ID);
        assert_eq!(d.wallet_kind(), WalletKind::AccountModel);
        assert_eq!(d.reversed().wallet_kind(), WalletKind::ClauseModel);
    }
}
