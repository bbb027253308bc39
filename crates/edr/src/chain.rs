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

//! The chain collaborator the runtime delegates to.
//!
//! EDR never executes transactions itself. Everything it does is forwarded to
//! an implementation of [`Chain`]; [`RpcChain`] is the one used in production
//! and talks to a development node over JSON-RPC.

use alloy_primitives::TxHash;
use edr_common::{FlatTrace, TraceResult};
use eyre::{eyre, Result, WrapErr};
use serde_json::json;
use std::future::Future;
use tracing::debug;

use crate::{
    client::{to_quantity, EthClient},
    config::ChainConfig,
};

/// Operations EDR needs from the underlying execution component.
pub trait Chain: Send + Sync + 'static {
    /// Trace a mined transaction into a call tree
    fn trace_transaction(&self, hash: TxHash) -> impl Future<Output = Result<TraceResult>> + Send;

    /// Fix the timestamp of the next block
    fn set_next_block_timestamp(&self, timestamp: u64) -> impl Future<Output = Result<()>> + Send;

    /// Produce `blocks` blocks immediately
    fn mine(&self, blocks: u64) -> impl Future<Output = Result<()>> + Send;

    /// Configuration of the chain
    fn config(&self) -> &ChainConfig;

    /// Client for the chain's Ethereum JSON-RPC interface
    fn eth_client(&self) -> &EthClient;
}

/// [`Chain`] backed by a node's JSON-RPC interface (anvil, hardhat, reth, erigon, ...).
///
/// | Operation | JSON-RPC method |
/// |---|---|
/// | [`Chain::trace_transaction`] | `trace_transaction` |
/// | [`Chain::set_next_block_timestamp`] | `evm_setNextBlockTimestamp` |
/// | [`Chain::mine`] | `hardhat_mine` |
#[derive(Debug, Clone)]
pub struct RpcChain {
    config: ChainConfig,
    client: EthClient,
}

impl RpcChain {
    /// Create a chain that forwards to `config.rpc_url`
    pub fn new(config: ChainConfig) -> Result<Self> {
        let client = EthClient::new(config.rpc_url.clone())?;
        Ok(Self { config, client })
    }
}

impl Chain for RpcChain {
    async fn trace_transaction(&self, hash: TxHash) -> Result<TraceResult> {
        let frames: Option<Vec<FlatTrace>> =
            self.client.request("trace_transaction", json!([hash])).await?;
        let frames = frames.ok_or_else(|| eyre!("transaction {hash} not found"))?;

        debug!(%hash, frames = frames.len(), "Received flat trace");

        TraceResult::from_flat(frames)
            .wrap_err_with(|| format!("malformed trace for transaction {hash}"))
    }

    async fn set_next_block_timestamp(&self, timestamp: u64) -> Result<()> {
        let _: serde_json::Value =
            self.client.request("evm_setNextBlockTimestamp", json!([timestamp])).await?;
        Ok(())
    }

    async fn mine(&self, blocks: u64) -> Result<()> {
        let _: serde_json::Value =
            self.client.request("hardhat_mine", json!([to_quantity(blocks)])).await?;
        Ok(())
    }

    fn config(&self) -> &ChainConfig {
        &self.config
    }

    fn eth_client(&self) -> &EthClient {
        &self.client
    }
}
