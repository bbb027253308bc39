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

//! Request shape accepted by `/debug`.
//!
//! Generic debugging has no semantics yet; the runtime decodes the request so
//! clients can target a stable shape, then answers "not implemented".

use alloy_primitives::TxHash;
use serde::{Deserialize, Serialize};

/// What a client asks `/debug` to inspect
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum DebugRequest {
    /// A single mined transaction
    Transaction {
        /// Hash of the transaction
        #[serde(rename = "txHash")]
        tx_hash: TxHash,
    },
    /// A whole block
    Block {
        /// Block number
        number: u64,
    },
}
