//! Command handlers
//!
//! Each handler connects the wallet it needs, runs one operation through the
//! library and prints the outcome. A transaction that does not end mined and
//! successful is returned as an error so the process exits non-zero.

use eyre::{eyre, Result, WrapErr};
use tracing::warn;
use xport_rs::deploy::ContractArtifact;
use xport_rs::gateway::fetch_gateway_state;
use xport_rs::units::parse_address;
use xport_rs::{
    AdminCall, BridgeDirection, BridgeStatus, ContractRole, Operation, PendingTransaction,
    PollPhase, PollerSnapshot, TxStatus, WalletConnection, WalletKind, SEPOLIA_CHAIN_ID,
};

use crate::app::AppState;
use crate::cli::{AddressCommand, Command, DeployCommand, GatewayCommand, WalletCommand};

pub async fn run(app: &AppState, command: Command) -> Result<()> {
    match command {
        Command::Wallet { command } => wallet(app, command).await,
        Command::Addresses { command } => addresses(app, command),
        Command::Deploy { command } => deploy(app, command).await,
        Command::Mint { to, amount } => mint(app, to, amount).await,
        Command::Balances => balances(app).await,
        Command::Bridge {
            direction,
            amount,
            fee,
            to,
            no_wait,
        } => bridge(app, direction, &amount, &fee, to.as_deref(), no_wait).await,
        Command::Status { tx } => follow_status(app, &tx).await.map(|_| ()),
        Command::Gateway { wallet, command } => gateway(app, wallet.into(), command).await,
    }
}

// ============================================================================
// Output
// ============================================================================

fn explorer_link(app: &AppState, kind: WalletKind, tx: &str) -> Option<String> {
    let chain = app.registry.by_kind(kind)?;
    app.registry.explorer_tx_url(chain.id, tx)
}

fn print_record(app: &AppState, record: &PendingTransaction) {
    println!("[{}] {}", record.status, record.message);
    if !record.tx_identifier.is_empty() {
        match explorer_link(app, record.origin_kind, &record.tx_identifier) {
            Some(url) => println!("  tx: {}", url),
            None => println!("  tx: {}", record.tx_identifier),
        }
    }
    if let Some(address) = record.contract_address {
        println!("  contract: {}", address);
    }
}

/// Print `record` and turn anything short of success into an error
fn report(app: &AppState, record: &PendingTransaction) -> Result<()> {
    print_record(app, record);
    if record.status == TxStatus::MinedSuccess {
        Ok(())
    } else {
        Err(eyre!("{}", record.message))
    }
}

fn print_connection(conn: &WalletConnection) {
    match conn.chain_id {
        Some(chain) => println!("{} wallet {} on chain {}", conn.kind, conn.short_address(), chain),
        None => println!("{} wallet {}", conn.kind, conn.short_address()),
    }
}

// ============================================================================
// Wallets
// ============================================================================

/// Connect `kind`, moving an account-model wallet onto Sepolia if needed
pub async fn ensure_connected(app: &AppState, kind: WalletKind) -> Result<WalletConnection> {
    let conn = app
        .wallets
        .connect(kind)
        .await
        .wrap_err_with(|| format!("Failed to connect {} wallet", kind))?;

    if kind == WalletKind::AccountModel && conn.chain_id != Some(SEPOLIA_CHAIN_ID) {
        app.wallets.switch_chain(SEPOLIA_CHAIN_ID).await?;
        return Ok(app.wallets.connection(kind));
    }
    Ok(conn)
}

async fn wallet(app: &AppState, command: WalletCommand) -> Result<()> {
    match command {
        WalletCommand::Connect { kind } => {
            let conn = app.wallets.connect(kind.into()).await?;
            print_connection(&conn);
        }
        WalletCommand::SwitchChain { chain_id } => {
            app.wallets.connect(WalletKind::AccountModel).await?;
            app.wallets.switch_chain(chain_id).await?;
            print_connection(&app.wallets.active_connection());
        }
        WalletCommand::Chains => {
            for chain in app.registry.all() {
                println!(
                    "{:>12}  {:<16} {:<4} {:<14} {}",
                    chain.id, chain.name, chain.symbol, chain.wallet_kind, chain.rpc_url
                );
            }
        }
    }
    Ok(())
}

// ============================================================================
// Addresses
// ============================================================================

fn addresses(app: &AppState, command: AddressCommand) -> Result<()> {
    match command {
        AddressCommand::Show => {
            for role in ContractRole::ALL {
                let value = app.book.get(role);
                let shown = if value.is_empty() { "(unset)" } else { value.as_str() };
                println!("{:<18} {}", role.key(), shown);
            }
        }
        AddressCommand::Set { role, address } => {
            parse_address(role.key(), &address)?;
            app.book.set(role, address.trim())?;
            println!("{} = {}", role.key(), address.trim());
        }
    }
    Ok(())
}

// ============================================================================
// Deployment
// ============================================================================

async fn deploy(app: &AppState, command: DeployCommand) -> Result<()> {
    let dir = &app.config.artifacts_dir;

    let record = match command {
        DeployCommand::MockToken => {
            let artifact = ContractArtifact::load(&dir.join("MockErc20.json"))?;
            ensure_connected(app, WalletKind::AccountModel).await?;
            app.deployer.deploy_mock_erc20(&artifact).await
        }
        DeployCommand::Home => {
            let artifact = ContractArtifact::load(&dir.join("Erc20TokenHome.json"))?;
            ensure_connected(app, WalletKind::AccountModel).await?;
            app.deployer.deploy_token_home(&artifact).await
        }
        DeployCommand::Remote { name, symbol } => {
            let artifact = ContractArtifact::load(&dir.join("Erc20TokenRemote.json"))?;
            ensure_connected(app, WalletKind::ClauseModel).await?;
            app.deployer
                .deploy_token_remote(&artifact, &name, &symbol)
                .await
        }
    };
    report(app, &record)
}

async fn mint(app: &AppState, to: Option<String>, amount: String) -> Result<()> {
    let conn = ensure_connected(app, WalletKind::AccountModel).await?;
    let to = match to {
        Some(to) => to,
        None => conn
            .address
            .map(|a| a.to_string())
            .ok_or_else(|| eyre!("Account-model wallet has no address"))?,
    };

    let operation = Operation::Mint {
        token: app.book.get(ContractRole::MockErc20),
        to,
        amount,
    };
    let record = app.submitter.submit(&operation).await;
    report(app, &record)
}

// ============================================================================
// Bridge
// ============================================================================

/// Connect whichever wallets are configured; missing ones just read as zero
async fn connect_available(app: &AppState) {
    for kind in [WalletKind::ClauseModel, WalletKind::AccountModel] {
        if let Err(e) = ensure_connected(app, kind).await {
            warn!(wallet = %kind, error = %e, "Wallet not connected");
        }
    }
}

async fn balances(app: &AppState) -> Result<()> {
    connect_available(app).await;
    let balances = app.bridge.balances().await;
    println!("Sepolia MockERC20:        {}", balances.sepolia);
    println!("VeChain Erc20TokenRemote: {}", balances.vechain);
    Ok(())
}

async fn bridge(
    app: &AppState,
    direction: BridgeDirection,
    amount: &str,
    fee: &str,
    to: Option<&str>,
    no_wait: bool,
) -> Result<()> {
    ensure_connected(app, direction.wallet_kind()).await?;

    let outcome = app.bridge.bridge(direction, amount, fee, to).await;
    for record in &outcome.records {
        print_record(app, record);
    }

    let source_tx = match outcome.source_tx {
        Some(tx) => tx,
        None => {
            let last = outcome.records.last();
            // A mined failure still moved chain state (gas, approvals)
            if last.is_some_and(|r| r.status == TxStatus::MinedFailure) {
                balances(app).await?;
            }
            let message = last
                .map(|r| r.message.clone())
                .unwrap_or_else(|| "Bridge transfer was not submitted".to_string());
            return Err(eyre!(message));
        }
    };

    if no_wait {
        println!("Track it with: xport status {}", source_tx);
        return Ok(());
    }

    let snap = follow_status(app, &source_tx).await?;
    if let Some(dest) = snap.record.as_ref().and_then(|r| r.destination_tx_hash.as_deref()) {
        if let Some(url) = app
            .registry
            .explorer_tx_url(direction.destination_chain(), dest)
        {
            println!("  destination tx: {}", url);
        }
    }

    balances(app).await?;
    match snap.phase {
        PollPhase::Failed => Err(eyre!("Bridge transfer failed on the destination chain")),
        _ => Ok(()),
    }
}

/// Poll until the transfer settles; Ctrl+C stops polling
pub async fn follow_status(app: &AppState, source_tx: &str) -> Result<PollerSnapshot> {
    let mut rx = app.poller.subscribe();
    app.poller.start(source_tx);
    println!("Polling bridge status for {}", source_tx);

    let mut last: Option<BridgeStatus> = None;
    loop {
        let snap = rx.borrow_and_update().clone();
        if let Some(record) = &snap.record {
            if last != Some(record.status) {
                println!("  status: {}", record.status.as_str());
                last = Some(record.status);
            }
        }
        if snap.phase != PollPhase::Polling {
            return Ok(snap);
        }

        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    return Ok(app.poller.snapshot());
                }
            }
            _ = tokio::signal::ctrl_c() => {
                app.poller.stop();
                println!("Stopped polling");
                return Ok(app.poller.snapshot());
            }
        }
    }
}

// ============================================================================
// Gateway
// ============================================================================

async fn gateway(app: &AppState, kind: WalletKind, command: GatewayCommand) -> Result<()> {
    let conn = ensure_connected(app, kind).await?;
    let gateway = app.book.get(ContractRole::Gateway);

    let call = match command {
        GatewayCommand::Show => {
            let address = parse_address(ContractRole::Gateway.key(), &gateway)?;
            let reader = app.reader_for(kind);
            let state =
                fetch_gateway_state(reader.as_ref(), address, conn.address, &app.registry.ids())
                    .await?;

            println!("Gateway {}", address);
            println!("  chain id:            {}", state.chain_id);
            println!(
                "  gas limits:          min {} / default {} / max {}",
                state.min_gas_limit, state.default_gas_limit, state.max_gas_limit
            );
            println!("  max message length:  {}", state.max_message_length);
            println!("  signature verifier:  {}", state.signature_verifier);
            println!("  storeman admin:      {}", state.storeman_admin);
            println!("  admin role:          {}", state.admin_role);
            println!("  connected is admin:  {}", state.is_admin);
            for (chain, info) in &state.chains {
                println!(
                    "  chain {:>10}: base fee {} supported {}",
                    chain, info.base_fee, info.supported
                );
            }
            return Ok(());
        }
        GatewayCommand::SetGasLimits { max, min, default } => {
            AdminCall::SetGasLimits { max, min, default }
        }
        GatewayCommand::SetMaxMessageLength { length } => AdminCall::SetMaxMessageLength { length },
        GatewayCommand::SetSignatureVerifier { address } => {
            AdminCall::SetSignatureVerifier { verifier: address }
        }
        GatewayCommand::SetSupportedChain {
            chain_id,
            supported,
        } => AdminCall::SetSupportedDstChain {
            chain_id,
            supported,
        },
        GatewayCommand::SetBaseFee { pair } => AdminCall::SetBaseFee { pair },
        GatewayCommand::WithdrawFee { to } => AdminCall::WithdrawFee { to },
    };

    let record = app
        .submitter
        .submit(&Operation::Admin { gateway, call })
        .await;
    report(app, &record)
}
