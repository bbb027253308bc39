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

//! Chain configuration for the EDR runtime
//!
//! Values come from defaults, an optional TOML file, and finally CLI flags.

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    net::{IpAddr, Ipv4Addr, SocketAddr},
    path::Path,
    time::Duration,
};
use tracing::debug;

/// Default port the runtime listens on, next to the upstream node's 8545
pub const DEFAULT_PORT: u16 = 8546;

/// Default upstream node
pub const DEFAULT_RPC_URL: &str = "http://localhost:8545";

/// Configuration of the chain the runtime fronts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    /// Port the HTTP listener binds to
    pub port: u16,
    /// Address the HTTP listener binds to
    pub host: IpAddr,
    /// Whether `/trace` may reach the chain
    pub tracer_enabled: bool,
    /// Whether timestamp and mining operations may reach the chain
    pub hardhat_mode: bool,
    /// JSON-RPC endpoint of the upstream node
    pub rpc_url: String,
    /// Seconds to wait for in-flight requests on shutdown
    pub shutdown_timeout_secs: u64,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            tracer_enabled: false,
            hardhat_mode: false,
            rpc_url: DEFAULT_RPC_URL.to_string(),
            shutdown_timeout_secs: 10,
        }
    }
}

impl ChainConfig {
    /// Load configuration from a TOML file. Missing keys keep their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .wrap_err_with(|| format!("Failed to read config file {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .wrap_err_with(|| format!("Failed to parse config file {}", path.display()))?;

        debug!(path = %path.display(), ?config, "Loaded chain configuration");
        Ok(config)
    }

    /// Write the configuration as TOML
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self).wrap_err("Failed to serialize config")?;
        fs::write(path, content)
            .wrap_err_with(|| format!("Failed to write config file {}", path.display()))
    }

    /// Socket address the listener binds to
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Drain deadline for graceful shutdown
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}
