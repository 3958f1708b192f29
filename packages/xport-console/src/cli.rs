//! Command-line definitions

use clap::{Args, Parser, Subcommand, ValueEnum};
use xport_rs::address_book::AddressOverrides;
use xport_rs::bridge::DEFAULT_MESSAGE_FEE;
use xport_rs::{BridgeDirection, ContractRole, WalletKind};

#[derive(Debug, Parser)]
#[command(name = "xport")]
#[command(about = "XPort bridge console - move test tokens between Sepolia and VeChain")]
#[command(version)]
pub struct Cli {
    #[command(flatten)]
    pub addresses: AddressArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Contract address overrides; any token address given replaces the cached set
#[derive(Debug, Clone, Default, Args)]
pub struct AddressArgs {
    /// MockERC20 address on Sepolia
    #[arg(long, global = true, env = "XPORT_MOCK_ERC20")]
    pub mock_erc20: Option<String>,

    /// Erc20TokenHome address on Sepolia
    #[arg(long, global = true, env = "XPORT_TOKEN_HOME")]
    pub token_home: Option<String>,

    /// Erc20TokenRemote address on VeChain
    #[arg(long, global = true, env = "XPORT_TOKEN_REMOTE")]
    pub token_remote: Option<String>,

    /// WMB gateway address
    #[arg(long, global = true, env = "XPORT_GATEWAY")]
    pub gateway: Option<String>,
}

impl AddressArgs {
    pub fn overrides(&self) -> AddressOverrides {
        AddressOverrides {
            mock_erc20: self.mock_erc20.clone(),
            token_home: self.token_home.clone(),
            token_remote: self.token_remote.clone(),
            gateway: self.gateway.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum WalletArg {
    /// Sepolia signer (EIP-1193 style)
    Account,
    /// VeChain signer (clause model)
    Clause,
}

impl From<WalletArg> for WalletKind {
    fn from(arg: WalletArg) -> Self {
        match arg {
            WalletArg::Account => WalletKind::AccountModel,
            WalletArg::Clause => WalletKind::ClauseModel,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Connect a wallet or switch its chain
    Wallet {
        #[command(subcommand)]
        command: WalletCommand,
    },

    /// Show or edit cached contract addresses
    Addresses {
        #[command(subcommand)]
        command: AddressCommand,
    },

    /// Deploy the bridge contracts
    Deploy {
        #[command(subcommand)]
        command: DeployCommand,
    },

    /// Mint MockERC20 test tokens on Sepolia
    Mint {
        /// Recipient (defaults to the account-model wallet)
        #[arg(long)]
        to: Option<String>,

        /// Amount in whole tokens
        #[arg(long, default_value = "1000")]
        amount: String,
    },

    /// Token balances of the configured wallets
    Balances,

    /// Bridge tokens and follow the transfer until it settles
    Bridge {
        /// sepolia-to-vechain or vechain-to-sepolia
        direction: BridgeDirection,

        /// Amount in whole tokens
        amount: String,

        /// Message fee in native units
        #[arg(long, default_value = DEFAULT_MESSAGE_FEE)]
        fee: String,

        /// Recipient on the destination chain (defaults to the sender)
        #[arg(long)]
        to: Option<String>,

        /// Return after submission instead of polling the status API
        #[arg(long)]
        no_wait: bool,
    },

    /// Poll the bridge status API for a source transaction
    Status {
        /// Source chain transaction hash or id
        tx: String,
    },

    /// Inspect or administer the WMB gateway
    Gateway {
        /// Wallet whose chain hosts the gateway
        #[arg(long, value_enum, default_value = "account")]
        wallet: WalletArg,

        #[command(subcommand)]
        command: GatewayCommand,
    },
}

#[derive(Debug, Subcommand)]
pub enum WalletCommand {
    /// Connect and print the session
    Connect {
        #[arg(value_enum)]
        kind: WalletArg,
    },

    /// Connect the account-model wallet and move it to another chain
    SwitchChain { chain_id: u64 },

    /// List the configured chains
    Chains,
}

#[derive(Debug, Subcommand)]
pub enum AddressCommand {
    Show,

    /// Store an address (mockERC20, erc20TokenHome, erc20TokenRemote, wmbGateway)
    Set { role: ContractRole, address: String },
}

#[derive(Debug, Subcommand)]
pub enum DeployCommand {
    /// MockERC20 on Sepolia
    MockToken,

    /// Erc20TokenHome on Sepolia (needs gateway and MockERC20)
    Home,

    /// Erc20TokenRemote on VeChain (needs gateway and Erc20TokenHome)
    Remote {
        #[arg(long, default_value = "CrossChainToken")]
        name: String,

        #[arg(long, default_value = "CCT")]
        symbol: String,
    },
}

#[derive(Debug, Subcommand)]
pub enum GatewayCommand {
    /// Current configuration and whether the wallet is an admin
    Show,

    SetGasLimits {
        max: String,
        min: String,
        default: String,
    },

    SetMaxMessageLength { length: String },

    SetSignatureVerifier { address: String },

    SetSupportedChain {
        chain_id: String,

        /// Pass false to remove support
        #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
        supported: bool,
    },

    /// Base fee as "chainId,fee" with the fee in native units
    SetBaseFee { pair: String },

    WithdrawFee { to: String },
}
