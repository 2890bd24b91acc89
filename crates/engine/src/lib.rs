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

//! Crucible Exchange Engine
//!
//! A single-venue continuous double-auction matching engine with a TCP
//! newline-delimited JSON front door. Incoming limit and market orders are
//! matched against a central limit order book under price-time priority;
//! executed trades are appended asynchronously to a durable ledger.
//!
//! Architecture:
//! - Single-threaded matching core: one dedicated thread owns the order
//!   book and runs every `place_order` to completion, so the hot path
//!   carries no locks
//! - MPSC ingress queue between connection tasks and the matching loop
//! - SPSC trade queue feeding a background writer thread, keeping ledger
//!   I/O off the matching path
//! - Optional order snapshot persisted at graceful shutdown

pub mod config;
pub mod engine;
pub mod ledger;
pub mod logging;
pub mod orderbook;
pub mod queue;
pub mod server;
pub mod store;
pub mod types;

pub use config::ExchangeConfig;
pub use engine::{Engine, EngineActor, EngineError};
pub use ledger::{
    FileLedger, LedgerError, LedgerStorage, MemoryLedger, TradeWriter, TradeWriterConfig,
    WriterError,
};
pub use orderbook::{BookError, OrderBook};
pub use queue::{IngressQueue, OrderCommand, QueueError, QueueReceiver, QueueSender};
pub use server::Server;
pub use store::{OrderStore, StoreError};
pub use types::*;
