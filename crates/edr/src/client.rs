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

//! Minimal JSON-RPC 2.0 client for the upstream Ethereum node

use eyre::{eyre, Result, WrapErr};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{json, Value};
use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};
use tracing::{debug, trace};

/// Per-request timeout for upstream calls
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// JSON-RPC client for an Ethereum node.
///
/// Cheap to clone; clones share the connection pool and the request id counter.
#[derive(Debug, Clone)]
pub struct EthClient {
    url: String,
    client: reqwest::Client,
    next_id: Arc<AtomicU64>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<JsonRpcError>,
}

impl EthClient {
    /// Create a client for `url`. No connection is made until the first request.
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(DEFAULT_REQUEST_TIMEOUT).build()?;
        Ok(Self { url: url.into(), client, next_id: Arc::new(AtomicU64::new(1)) })
    }

    /// Endpoint this client talks to
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Send a JSON-RPC request and decode its `result`.
    ///
    /// A JSON-RPC error object becomes an error carrying the node's code and message.
    pub async fn request<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": id
        });

        trace!(%method, id, "Sending JSON-RPC request");

        let response = self
            .client
            .post(&self.url)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .wrap_err_with(|| format!("{method} request to {} failed", self.url))?;

        let status = response.status();
        let body: JsonRpcResponse = response
            .json()
            .await
            .wrap_err_with(|| format!("Invalid {method} response from {} ({status})", self.url))?;

        if let Some(error) = body.error {
            debug!(%method, code = error.code, message = %error.message, "Upstream returned an error");
            return Err(eyre!("{method} failed with code {}: {}", error.code, error.message));
        }

        let result = body.result.unwrap_or(Value::Null);
        serde_json::from_value(result)
            .wrap_err_with(|| format!("Unexpected {method} result from {}", self.url))
    }

    /// Latest block number
    pub async fn block_number(&self) -> Result<u64> {
        let number: String = self.request("eth_blockNumber", json!([])).await?;
        parse_quantity(&number)
    }

    /// Chain id of the upstream node
    pub async fn chain_id(&self) -> Result<u64> {
        let id: String = self.request("eth_chainId", json!([])).await?;
        parse_quantity(&id)
    }
}

/// Parse a hex-encoded JSON-RPC quantity such as `0x1b4`
pub fn parse_quantity(quantity: &str) -> Result<u64> {
    let digits = quantity
        .strip_prefix("0x")
        .or_else(|| quantity.strip_prefix("0X"))
        .ok_or_else(|| eyre!("Quantity {quantity:?} is missing the 0x prefix"))?;
    u64::from_str_radix(digits, 16).wrap_err_with(|| format!("Invalid quantity {quantity:?}"))
}

/// Encode a number as a JSON-RPC quantity
pub fn to_quantity(value: u64) -> String {
    format!("{value:#x}")
}
