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

//! Test helpers: an in-memory [`Chain`] that records how it was called.

use alloy_primitives::TxHash;
use edr_common::TraceResult;
use eyre::{eyre, Result};
use serde_json::json;
use std::{
    net::{IpAddr, Ipv4Addr},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
    time::Duration,
};

use crate::{chain::Chain, client::EthClient, config::ChainConfig};

/// Config bound to an ephemeral loopback port
pub fn local_config() -> ChainConfig {
    ChainConfig { port: 0, host: IpAddr::V4(Ipv4Addr::LOCALHOST), ..Default::default() }
}

/// A root call with two child calls, the second of which reverted
pub fn sample_trace() -> TraceResult {
    let mut root = TraceResult::new(
        "call",
        json!({ "from": "0x01", "to": "0x02", "value": "0x0" }),
        json!({ "gasUsed": "0x5208", "output": "0x" }),
    );
    root.push_subtrace(TraceResult::new(
        "call",
        json!({ "from": "0x02", "to": "0x03" }),
        json!({ "gasUsed": "0x100" }),
    ));
    root.push_subtrace(
        TraceResult::new("create", json!({ "from": "0x02" }), serde_json::Value::Null)
            .with_error("Reverted"),
    );
    root
}

/// [`Chain`] answering from memory
#[derive(Debug)]
pub struct MockChain {
    config: ChainConfig,
    client: EthClient,
    trace: TraceResult,
    failure: Option<String>,
    delay: Duration,
    trace_calls: AtomicUsize,
    timestamp_calls: AtomicUsize,
    mine_calls: AtomicUsize,
    last_hash: Mutex<Option<TxHash>>,
    last_timestamp: Mutex<Option<u64>>,
    last_blocks: Mutex<Option<u64>>,
}

impl MockChain {
    /// A chain that answers every trace with [`sample_trace`]
    pub fn new(config: ChainConfig) -> Self {
        Self::with_trace(config, sample_trace())
    }

    /// A chain that answers every trace with `trace`
    pub fn with_trace(config: ChainConfig, trace: TraceResult) -> Self {
        let client = EthClient::new(config.rpc_url.clone()).expect("failed to build client");
        Self {
            config,
            client,
            trace,
            failure: None,
            delay: Duration::ZERO,
            trace_calls: AtomicUsize::new(0),
            timestamp_calls: AtomicUsize::new(0),
            mine_calls: AtomicUsize::new(0),
            last_hash: Mutex::new(None),
            last_timestamp: Mutex::new(None),
            last_blocks: Mutex::new(None),
        }
    }

    /// A chain whose every operation fails with `message`
    pub fn failing(config: ChainConfig, message: impl Into<String>) -> Self {
        Self { failure: Some(message.into()), ..Self::new(config) }
    }

    /// Make every trace take `delay` before answering
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Trace returned on success
    pub fn trace(&self) -> TraceResult {
        self.trace.clone()
    }

    /// Number of `trace_transaction` calls so far
    pub fn trace_calls(&self) -> usize {
        self.trace_calls.load(Ordering::SeqCst)
    }

    /// Number of `set_next_block_timestamp` calls so far
    pub fn timestamp_calls(&self) -> usize {
        self.timestamp_calls.load(Ordering::SeqCst)
    }

    /// Number of `mine` calls so far
    pub fn mine_calls(&self) -> usize {
        self.mine_calls.load(Ordering::SeqCst)
    }

    /// Hash of the last traced transaction
    pub fn last_hash(&self) -> Option<TxHash> {
        *self.last_hash.lock().expect("poisoned")
    }

    /// Timestamp passed to the last `set_next_block_timestamp` call
    pub fn last_timestamp(&self) -> Option<u64> {
        *self.last_timestamp.lock().expect("poisoned")
    }

    /// Block count passed to the last `mine` call
    pub fn last_blocks(&self) -> Option<u64> {
        *self.last_blocks.lock().expect("poisoned")
    }

    fn outcome(&self) -> Result<()> {
        match &self.failure {
            Some(message) => Err(eyre!("{message}")),
            None => Ok(()),
        }
    }
}

impl Chain for MockChain {
    async fn trace_transaction(&self, hash: TxHash) -> Result<TraceResult> {
        self.trace_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_hash.lock().expect("poisoned") = Some(hash);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.outcome()?;
        Ok(self.trace.clone())
    }

    async fn set_next_block_timestamp(&self, timestamp: u64) -> Result<()> {
        self.timestamp_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_timestamp.lock().expect("poisoned") = Some(timestamp);
        self.outcome()
    }

    async fn mine(&self, blocks: u64) -> Result<()> {
        self.mine_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_blocks.lock().expect("poisoned") = Some(blocks);
        self.outcome()
    }

    fn config(&self) -> &ChainConfig {
        &self.config
    }

    fn eth_client(&self) -> &EthClient {
        &self.client
    }
}
