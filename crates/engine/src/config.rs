// Copyright 2025 itscheems
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;

/// Default log level when RUST_LOG is not set
pub const DEFAULT_LOG_LEVEL: &str = "info";
/// Component name, used as the log file prefix
pub const LOG_COMPONENT_NAME: &str = "engine";
/// Whether logs also go to stderr by default
pub const DEFAULT_LOG_TO_CONSOLE: bool = true;

/// Exchange engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExchangeConfig {
    /// TCP bind address of the order entry listener
    pub bind_addr: SocketAddr,
    /// Trade ledger file (newline-delimited JSON, append-only)
    pub ledger_path: PathBuf,
    /// Active-order snapshot written at shutdown
    pub snapshot_path: PathBuf,
    /// Ingress queue capacity (requests waiting for the matching loop)
    pub ingress_capacity: usize,
    /// Trade queue capacity between the matching loop and the trade writer
    pub trade_queue_capacity: usize,
    /// Trade writer poll interval in milliseconds
    pub writer_poll_ms: u64,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:9000".parse().unwrap(),
            ledger_path: "storage/trades.jsonl".into(),
            snapshot_path: "storage/orders_snapshot.json".into(),
            ingress_capacity: 1024,
            trade_queue_capacity: 4096,
            writer_poll_ms: 200,
        }
    }
}

impl ExchangeConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, config::ConfigError> {
        let cfg = config::Config::builder()
            .add_source(config::Environment::with_prefix("EXCHANGE"))
            .build()?;

        cfg.try_deserialize()
    }

    /// Load configuration from file, with the environment layered on top
    pub fn from_file(path: &str) -> Result<Self, config::ConfigError> {
        let cfg = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("EXCHANGE"))
            .build()?;

        cfg.try_deserialize()
    }
}
