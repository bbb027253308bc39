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

//! EDR Common - Shared functionality for EDR components
//!
//! This crate provides the pieces shared by the EDR server library and its
//! command-line binary: the execution trace data model and the logging setup.

/// Common types used throughout EDR, most importantly the recursive execution trace
pub mod types;

/// Environment variable names recognised by EDR components
pub mod env;
/// Logging setup and utilities for consistent logging across EDR components
pub mod logging;

pub use logging::*;
pub use types::*;
