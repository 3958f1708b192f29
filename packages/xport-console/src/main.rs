//! XPort Bridge Console
//!
//! Command-line front-end for the Sepolia <-> VeChain testnet token bridge:
//! deploy the bridge contracts, mint test tokens, bridge them in either
//! direction and follow the cross-chain message until it settles.
//!
//! Signing keys come from `ACCOUNT_PRIVATE_KEY` (Sepolia) and
//! `CLAUSE_PRIVATE_KEY` (VeChain); either may be left out, which makes that
//! wallet unavailable.

use clap::Parser;
use console::app::AppState;
use console::cli::Cli;
use console::commands;
use console::config::Config;
use console::logging;
use tracing::info;

fn main() -> eyre::Result<()> {
    color_eyre::install()?;

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async_main())
}

async fn async_main() -> eyre::Result<()> {
    let cli = Cli::parse();
    logging::init();

    let config = Config::load()?;
    info!(
        sepolia_rpc = ?config.sepolia_rpc_url,
        vechain_node = ?config.vechain_node_url,
        status_url = %config.status_url,
        "Configuration loaded"
    );

    let app = AppState::build(config, &cli.addresses.overrides())?;
    let result = commands::run(&app, cli.command).await;
    app.shutdown().await;
    result
}
