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

//! Health check service for runtime status

use serde_json::{json, Value};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::config::ChainConfig;

/// Health check service for monitoring the runtime
///
/// Reports uptime and which gated features are switched on.
#[derive(Debug)]
pub struct HealthService {
    start_time: u64,
}

impl Default for HealthService {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthService {
    /// Creates a new health service, recording the current time as start time
    pub fn new() -> Self {
        Self { start_time: unix_now() }
    }

    /// Status document served on `GET /health`
    pub fn status(&self, config: &ChainConfig) -> Value {
        let now = unix_now();

        json!({
            "status": "ok",
            "service": "edr",
            "version": env!("CARGO_PKG_VERSION"),
            "uptime": now.saturating_sub(self.start_time),
            "started_at": self.start_time,
            "pid": std::process::id(),
            "tracer_enabled": config.tracer_enabled,
            "hardhat_mode": config.hardhat_mode
        })
    }
}

fn unix_now() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_reports_flags() {
        let health = HealthService::new();
        let config = ChainConfig { tracer_enabled: true, ..Default::default() };

        let status = health.status(&config);

        assert_eq!(status["status"], "ok");
        assert_eq!(status["service"], "edr");
        assert_eq!(status["tracer_enabled"], true);
        assert_eq!(status["hardhat_mode"], false);
        assert!(status["uptime"].as_u64().is_some());
    }
}
