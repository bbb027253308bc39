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

//! EDR - Ethereum Debugging Runtime
//!
//! A small HTTP service that sits in front of a development chain and exposes
//! transaction tracing and hardhat-style chain control. All chain work is
//! delegated to a [`Chain`] implementation; the runtime owns only the listener,
//! the feature gates and the lifecycle.

pub mod chain;
pub mod client;
pub mod config;
pub mod debug;
pub mod error;
pub mod hardhat;
pub mod health;
pub mod routes;
pub mod runtime;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use chain::{Chain, RpcChain};
pub use client::EthClient;
pub use config::ChainConfig;
pub use edr_common::TraceResult;
pub use error::EdrError;
pub use runtime::{CloseApp, Edr};
