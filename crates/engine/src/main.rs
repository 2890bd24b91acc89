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

//! Exchange engine service entry point
//!
//! Wires the components together in dependency order: snapshot load,
//! trade writer, engine, matching actor, then the TCP front door. A
//! ctrl-c tears them down in reverse.

use anyhow::Result;
use crucible_engine::config::ExchangeConfig;
use crucible_engine::engine::{Engine, EngineActor};
use crucible_engine::ledger::{FileLedger, TradeWriter, TradeWriterConfig};
use crucible_engine::logging;
use crucible_engine::orderbook::OrderBook;
use crucible_engine::queue::IngressQueue;
use crucible_engine::server::Server;
use crucible_engine::store::OrderStore;
use tokio::signal;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    logging::init_logging()?;

    let config = ExchangeConfig::from_env()?;
    info!(addr = %config.bind_addr, "Starting exchange engine");

    // Restore whatever a previous graceful shutdown left behind. A
    // corrupt snapshot is logged and the engine starts empty.
    let order_store = OrderStore::new(&config.snapshot_path);
    let mut book = OrderBook::new();
    match order_store.load() {
        Ok(orders) if !orders.is_empty() => {
            let count = orders.len();
            match book.restore(orders) {
                Ok(()) => info!(orders = count, "Restored order book from snapshot"),
                Err(e) => warn!(error = %e, "Snapshot rejected, starting with an empty book"),
            }
        }
        Ok(_) => {}
        Err(e) => warn!(error = %e, "Failed to load order snapshot, starting with an empty book"),
    }

    let ledger = FileLedger::open(&config.ledger_path)?;
    let mut trade_writer = TradeWriter::new(
        Box::new(ledger),
        TradeWriterConfig {
            queue_capacity: config.trade_queue_capacity,
            poll_interval_ms: config.writer_poll_ms,
            ..TradeWriterConfig::default()
        },
    );
    trade_writer.start();

    let mut engine = Engine::new(book, trade_writer, Some(order_store));
    engine.start();

    let (sender, receiver) = IngressQueue::new(config.ingress_capacity).split();
    let mut actor = EngineActor::spawn(engine, receiver);
    let server = Server::new(sender);

    let serve_result = tokio::select! {
        result = server.serve(config.bind_addr) => Some(result),
        _ = signal::ctrl_c() => {
            info!("Shutdown signal received");
            None
        }
    };

    // Stops the engine on the matching thread: trade writer flush + stop,
    // then the order snapshot.
    actor.shutdown();
    info!("Exchange engine stopped");

    if let Some(result) = serve_result {
        result?;
    }

    Ok(())
}
