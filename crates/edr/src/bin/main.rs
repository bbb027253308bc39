// EDB - Ethereum Debugger
// Copyright (C) 2024 Zhuo Zhang and Wuqi Zhang
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! EDR command line
//!
//! `edr serve` runs the runtime in front of a node; `edr trace <hash>` asks a
//! running instance for a transaction's call tree.

use clap::{Parser, Subcommand};
use edr::{Chain, ChainConfig, CloseApp, Edr, RpcChain};
use edr_common::init_logging;
use eyre::{bail, Result, WrapErr};
use serde_json::{json, Value};
use std::{net::IpAddr, path::PathBuf, sync::Arc};
use tracing::{error, info, warn};

/// EDR - Ethereum Debugging Runtime
#[derive(Parser, Debug)]
#[command(name = "edr")]
#[command(about = "Ethereum Debugging Runtime")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Commands,

    /// Verbosity level (repeat for more: -v, -vv, -vvv)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

/// Available commands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve the EDR HTTP routes
    Serve(ServeArgs),
    /// Trace a transaction through a running EDR instance
    Trace(TraceArgs),
}

/// Serve mode arguments. Flags override the config file.
#[derive(Parser, Debug)]
struct ServeArgs {
    /// TOML configuration file
    #[arg(long, env = "EDR_CONFIG")]
    config: Option<PathBuf>,

    /// Port to listen on
    #[arg(long)]
    port: Option<u16>,

    /// Address to bind to
    /// Example: --host 0.0.0.0
    #[arg(long)]
    host: Option<IpAddr>,

    /// JSON-RPC endpoint of the upstream node
    #[arg(long, env = "ETH_RPC_URL")]
    rpc_url: Option<String>,

    /// Enable the /trace route
    #[arg(long)]
    tracer: bool,

    /// Enable hardhat-style mining and timestamp control
    #[arg(long)]
    hardhat: bool,

    /// Also write logs to a file
    #[arg(long)]
    log_file: bool,
}

/// Trace mode arguments
#[derive(Parser, Debug)]
struct TraceArgs {
    /// Transaction hash
    tx_hash: String,

    /// Base URL of the running EDR instance
    #[arg(long, default_value = "http://localhost:8546")]
    endpoint: String,
}

impl ServeArgs {
    fn into_config(self) -> Result<ChainConfig> {
        let mut config = match &self.config {
            Some(path) => ChainConfig::from_file(path)?,
            None => ChainConfig::default(),
        };

        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(host) = self.host {
            config.host = host;
        }
        if let Some(rpc_url) = self.rpc_url {
            config.rpc_url = rpc_url;
        }
        config.tracer_enabled |= self.tracer;
        config.hardhat_mode |= self.hardhat;

        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();

    // Set RUST_LOG based on verbosity
    if std::env::var("RUST_LOG").is_err() {
        let level = match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        };
        std::env::set_var("RUST_LOG", level);
    }

    match args.command {
        Commands::Serve(serve_args) => run_serve(serve_args).await,
        Commands::Trace(trace_args) => run_trace(trace_args).await,
    }
}

/// Run the runtime until ctrl-c or a fatal listener error
async fn run_serve(args: ServeArgs) -> Result<()> {
    let log_file_path = init_logging("edr", args.log_file)?;
    if let Some(path) = &log_file_path {
        eprintln!("EDR logs: {}", path.display());
    }

    let config = args.into_config()?;
    let shutdown_timeout = config.shutdown_timeout();
    let chain = Arc::new(RpcChain::new(config.clone())?);

    match chain.eth_client().chain_id().await {
        Ok(chain_id) => info!(chain_id, rpc_url = %config.rpc_url, "Connected to upstream node"),
        Err(e) => warn!(rpc_url = %config.rpc_url, "Upstream node not reachable yet: {e}"),
    }

    let (close_app, mut fatal) = CloseApp::channel();
    let edr = Edr::new(log_file_path, close_app, config, chain);
    edr.start().await?;

    info!("EDR listening on {}", edr.endpoint());

    let cause = tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
            None
        }
        cause = fatal.recv() => cause,
    };

    if let Err(e) = edr.stop(shutdown_timeout).await {
        warn!("Shutdown was not clean: {e}");
    }

    match cause {
        Some(cause) => {
            error!("EDR terminated: {cause}");
            Err(cause)
        }
        None => Ok(()),
    }
}

/// Ask a running instance for a trace and print it
async fn run_trace(args: TraceArgs) -> Result<()> {
    edr_common::init_simple_logging(tracing::Level::WARN)?;

    let url = format!("{}/trace", args.endpoint.trim_end_matches('/'));
    let response = reqwest::Client::new()
        .post(&url)
        .json(&json!({ "txHash": args.tx_hash }))
        .send()
        .await
        .wrap_err_with(|| format!("Failed to reach EDR at {url}"))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        bail!("EDR answered {status}: {body}");
    }

    let trace: Value = response.json().await.wrap_err("Invalid trace response")?;
    println!("{}", serde_json::to_string_pretty(&trace)?);
    Ok(())
}
