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

//! Environment variable name constants for EDR configuration.
//!
//! # Environment Variables
//!
//! - [`EDR_CONFIG`] - Path of the TOML configuration file
//! - [`EDR_LOG_DIR`] - Directory that receives log files
//! - [`ETH_RPC_URL`] - Upstream node the runtime forwards to

/// Environment variable for the path of the EDR configuration file.
///
/// The CLI argument `--config` takes precedence over it.
///
/// # Examples
///
/// ```bash
/// EDR_CONFIG=./edr.toml edr serve
/// ```
pub const EDR_CONFIG: &str = "EDR_CONFIG";

/// Environment variable for the directory that receives log files.
///
/// # Default
///
/// When not set, logs go to `<system temp>/edr-logs/<component>`.
pub const EDR_LOG_DIR: &str = "EDR_LOG_DIR";

/// Environment variable for the upstream Ethereum JSON-RPC endpoint.
pub const ETH_RPC_URL: &str = "ETH_RPC_URL";
