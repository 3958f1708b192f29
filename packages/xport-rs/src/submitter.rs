//! Transaction Submitter
//!
//! Turns a logical bridge or gateway-admin operation, still in the raw
//! strings the user typed, into a `{to, value, data}` call and funnels it
//! through the wallet that operation belongs to.
//!
//! ## Flow
//!
//! 1. `Operation::prepare` validates every field; failures return a
//!    `NotSent` record and nothing touches the network
//! 2. The required wallet kind is resolved (or the active one for admin calls)
//! 3. The call is sent, then confirmation is awaited exactly once
//!
//! Each stage is published on a watch channel so a front-end can render the
//! single "current transaction" record without interpreting it.

use std::sync::Arc;

use alloy::primitives::U256;
use alloy::sol_types::SolCall;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::error::BridgeError;
use crate::evm::contracts::{Erc20TokenHome, Erc20TokenRemote, MockERC20, WmbGateway};
use crate::types::{Call, PendingTransaction, WalletKind};
use crate::units::{parse_address, parse_amount, parse_integer};
use crate::wallet::{WalletBackend, WalletHub};

/// Gateway administration calls
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminCall {
    SetGasLimits {
        max: String,
        min: String,
        default: String,
    },
    SetMaxMessageLength {
        length: String,
    },
    SetSignatureVerifier {
        verifier: String,
    },
    SetSupportedDstChain {
        chain_id: String,
        supported: bool,
    },
    /// `"chainId,fee"` with the fee in 18-decimal native units
    SetBaseFee {
        pair: String,
    },
    WithdrawFee {
        to: String,
    },
}

/// Closed set of operations the submitter knows how to build
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Approve {
        token: String,
        spender: String,
        amount: String,
    },
    Mint {
        token: String,
        to: String,
        amount: String,
    },
    CrossTo {
        token_home: String,
        to_user: String,
        amount: String,
        fee: String,
    },
    CrossBack {
        token_remote: String,
        to_user: String,
        amount: String,
        fee: String,
    },
    Admin {
        gateway: String,
        call: AdminCall,
    },
}

/// A validated operation ready to hand to a wallet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedCall {
    pub operation: &'static str,
    pub call: Call,
    /// `None` means whichever wallet is active
    pub required: Option<WalletKind>,
    pub success_message: String,
}

fn parse_base_fee_pair(pair: &str) -> Result<(U256, U256), BridgeError> {
    let (chain_id, fee) = pair
        .split_once(',')
        .ok_or_else(|| BridgeError::validation("baseFee", "expected \"chainId,fee\""))?;
    let (chain_id, fee) = (chain_id.trim(), fee.trim());
    if chain_id.is_empty() || fee.is_empty() {
        return Err(BridgeError::validation("baseFee", "expected \"chainId,fee\""));
    }
    Ok((parse_integer("baseFee chainId", chain_id)?, parse_amount("baseFee fee", fee)?))
}

impl AdminCall {
    pub fn name(&self) -> &'static str {
        match self {
            AdminCall::SetGasLimits { .. } => "setGasLimit",
            AdminCall::SetMaxMessageLength { .. } => "setMaxMessageLength",
            AdminCall::SetSignatureVerifier { .. } => "setSignatureVerifier",
            AdminCall::SetSupportedDstChain { .. } => "setSupportedDstChains",
            AdminCall::SetBaseFee { .. } => "batchSetBaseFees",
            AdminCall::WithdrawFee { .. } => "withdrawFee",
        }
    }

    fn encode(&self) -> Result<(Vec<u8>, String), BridgeError> {
        Ok(match self {
            AdminCall::SetGasLimits { max, min, default } => (
                WmbGateway::setGasLimitCall {
                    _maxGasLimit: parse_integer("maxGasLimit", max)?,
                    _minGasLimit: parse_integer("minGasLimit", min)?,
                    _defaultGasLimit: parse_integer("defaultGasLimit", default)?,
                }
                .abi_encode(),
                "Gas limits updated successfully".to_string(),
            ),
            AdminCall::SetMaxMessageLength { length } => (
                WmbGateway::setMaxMessageLengthCall {
                    _maxMessageLength: parse_integer("maxMessageLength", length)?,
                }
                .abi_encode(),
                "Max message length updated successfully".to_string(),
            ),
            AdminCall::SetSignatureVerifier { verifier } => (
                WmbGateway::setSignatureVerifierCall {
                    _signatureVerifier: parse_address("signatureVerifier", verifier)?,
                }
                .abi_encode(),
                "Signature verifier updated successfully".to_string(),
            ),
            AdminCall::SetSupportedDstChain {
                chain_id,
                supported,
            } => (
                WmbGateway::setSupportedDstChainsCall {
                    targetChainIds: vec![parse_integer("chainId", chain_id)?],
                    supported: vec![*supported],
                }
                .abi_encode(),
                format!("Chain {} support updated", chain_id.trim()),
            ),
            AdminCall::SetBaseFee { pair } => {
                let (chain_id, fee) = parse_base_fee_pair(pair)?;
                (
                    WmbGateway::batchSetBaseFeesCall {
                        _targetChainIds: vec![chain_id],
                        _baseFees: vec![fee],
                    }
                    .abi_encode(),
                    format!("Base fee for chain {} updated", chain_id),
                )
            }
            AdminCall::WithdrawFee { to } => (
                WmbGateway::withdrawFeeCall {
                    _to: parse_address("withdrawAddress", to)?,
                }
                .abi_encode(),
                "Fees withdrawn successfully".to_string(),
            ),
        })
    }
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Approve { .. } => "approve",
            Operation::Mint { .. } => "mint",
            Operation::CrossTo { .. } => "crossTo",
            Operation::CrossBack { .. } => "crossBack",
            Operation::Admin { call, .. } => call.name(),
        }
    }

    /// Wallet kind this operation is restricted to
    pub fn required_kind(&self) -> Option<WalletKind> {
        match self {
            Operation::Approve { .. } | Operation::Mint { .. } | Operation::CrossTo { .. } => {
                Some(WalletKind::AccountModel)
            }
            Operation::CrossBack { .. } => Some(WalletKind::ClauseModel),
            Operation::Admin { .. } => None,
        }
    }

    /// Validate every user-supplied field and encode the call
    pub fn prepare(&self) -> Result<PreparedCall, BridgeError> {
        let (to, value, data, success_message) = match self {
            Operation::Approve {
                token,
                spender,
                amount,
            } => {
                let token = parse_address("token", token)?;
                let data = MockERC20::approveCall {
                    spender: parse_address("spender", spender)?,
                    amount: parse_amount("amount", amount)?,
                }
                .abi_encode();
                (token, U256::ZERO, data, "Tokens approved".to_string())
            }
            Operation::Mint { token, to, amount } => {
                let token = parse_address("token", token)?;
                let data = MockERC20::mintCall {
                    to: parse_address("recipient", to)?,
                    amount: parse_amount("amount", amount)?,
                }
                .abi_encode();
                (
                    token,
                    U256::ZERO,
                    data,
                    format!("Successfully minted {} tokens", amount.trim()),
                )
            }
            Operation::CrossTo {
                token_home,
                to_user,
                amount,
                fee,
            } => {
                let home = parse_address("erc20TokenHome", token_home)?;
                let data = Erc20TokenHome::crossToCall {
                    toUser: parse_address("recipient", to_user)?,
                    amount: parse_amount("amount", amount)?,
                }
                .abi_encode();
                (
                    home,
                    parse_amount("fee", fee)?,
                    data,
                    "Successfully bridged tokens to VeChain".to_string(),
                )
            }
            Operation::CrossBack {
                token_remote,
                to_user,
                amount,
                fee,
            } => {
                let remote = parse_address("erc20TokenRemote", token_remote)?;
                let data = Erc20TokenRemote::crossBackCall {
                    toUser: parse_address("recipient", to_user)?,
                    amount: parse_amount("amount", amount)?,
                }
                .abi_encode();
                (
                    remote,
                    parse_amount("fee", fee)?,
                    data,
                    "Successfully bridged tokens to Sepolia".to_string(),
                )
            }
            Operation::Admin { gateway, call } => {
                let gateway = parse_address("wmbGateway", gateway)?;
                let (data, message) = call.encode()?;
                (gateway, U256::ZERO, data, message)
            }
        };

        Ok(PreparedCall {
            operation: self.name(),
            call: Call::new(to, value, data),
            required: self.required_kind(),
            success_message,
        })
    }
}

pub struct Submitter {
    wallets: Arc<WalletHub>,
    current: watch::Sender<Option<PendingTransaction>>,
}

impl Submitter {
    pub fn new(wallets: Arc<WalletHub>) -> Self {
        let (current, _) = watch::channel(None);
        Self { wallets, current }
    }

    pub fn wallets(&self) -> &Arc<WalletHub> {
        &self.wallets
    }

    /// Latest record, if any operation has been submitted
    pub fn current(&self) -> Option<PendingTransaction> {
        self.current.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<PendingTransaction>> {
        self.current.subscribe()
    }

    fn publish(&self, record: PendingTransaction) -> PendingTransaction {
        self.current.send_replace(Some(record.clone()));
        record
    }

    /// Publish a call that failed a precondition before reaching any wallet
    pub fn reject(&self, origin: WalletKind, err: &BridgeError) -> PendingTransaction {
        warn!(wallet = %origin, error = %err, "Rejected before submission");
        self.publish(PendingTransaction::not_sent(origin, err))
    }

    fn backend_for(&self, prepared: &PreparedCall) -> Result<Arc<dyn WalletBackend>, BridgeError> {
        match prepared.required {
            Some(kind) => self.wallets.connected(kind).map_err(|e| match e {
                BridgeError::NotConnected { .. } => BridgeError::UnsupportedWalletForOperation {
                    operation: prepared.operation.to_string(),
                    required: kind,
                },
                other => other,
            }),
            None => self.wallets.active(),
        }
    }

    /// Validate, send and confirm `operation`
    ///
    /// Never returns an error: every outcome, including local validation
    /// failures, is reported as the returned (and published) record.
    pub async fn submit(&self, operation: &Operation) -> PendingTransaction {
        let origin = operation
            .required_kind()
            .unwrap_or_else(|| self.wallets.active_kind());

        let prepared = match operation.prepare() {
            Ok(prepared) => prepared,
            Err(e) => return self.reject(origin, &e),
        };
        self.submit_prepared(prepared).await
    }

    /// Send an already validated call (contract creation goes through here)
    pub async fn submit_prepared(&self, prepared: PreparedCall) -> PendingTransaction {
        let origin = prepared
            .required
            .unwrap_or_else(|| self.wallets.active_kind());

        let backend = match self.backend_for(&prepared) {
            Ok(backend) => backend,
            Err(e) => {
                warn!(operation = prepared.operation, error = %e, "No wallet for operation");
                return self.publish(PendingTransaction::not_sent(origin, &e));
            }
        };
        let kind = backend.kind();

        self.publish(PendingTransaction::submitting(kind));

        let handle = match backend.send_call(prepared.call).await {
            Ok(handle) => handle,
            Err(e) => {
                warn!(operation = prepared.operation, error = %e, "Wallet refused call");
                return self.publish(PendingTransaction::not_sent(kind, &e));
            }
        };
        info!(
            operation = prepared.operation,
            tx = %handle,
            wallet = %kind,
            "Operation submitted"
        );
        self.publish(PendingTransaction::pending(&handle));

        let record = match backend.wait_for_confirmation(&handle).await {
            Ok(receipt) => PendingTransaction::mined(&handle, &receipt, &prepared.success_message),
            Err(e) => PendingTransaction::failed(&handle, &e),
        };
        info!(
            operation = prepared.operation,
            tx = %handle,
            status = %record.status,
            "Operation settled"
        );
        self.publish(record)
    }
}
