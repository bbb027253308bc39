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

//! Request shape accepted by `/hardhat`.

use serde::{Deserialize, Serialize};

/// Hardhat-style chain manipulation, tagged by `method`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "camelCase")]
pub enum HardhatRequest {
    /// Mine `blocks` blocks immediately
    Mine {
        /// Number of blocks, one when omitted
        #[serde(default = "one")]
        blocks: u64,
    },
    /// Fix the timestamp of the next block
    SetNextBlockTimestamp {
        /// Unix timestamp in seconds
        timestamp: u64,
    },
}

fn one() -> u64 {
    1
}
