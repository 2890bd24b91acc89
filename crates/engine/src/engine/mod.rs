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

mod actor;

pub use actor::EngineActor;

use crucible_sdk::types::{OrderResponse, OrderType, Side};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::ledger::TradeWriter;
use crate::orderbook::OrderBook;
use crate::store::OrderStore;
use crate::types::{IdGenerator, Order, OrderRequest, Trade, unix_nanos, unix_seconds};

/// Error types for order placement
///
/// Every variant renders as the error response shape; nothing escapes to
/// the wire handler.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Exchange engine is not running")]
    NotRunning,
    #[error("{0}")]
    InvalidRequest(String),
}

/// Central exchange engine
///
/// Owns the order book and orchestrates the full order lifecycle:
/// validation, ID and timestamp assignment, matching, trade hand-off to
/// the persistence pipeline, and response shaping. Contains business
/// logic only - no networking, no threading; the matching actor runs all
/// invocations on a single thread.
pub struct Engine {
    running: bool,
    order_ids: IdGenerator,
    trade_ids: IdGenerator,
    book: OrderBook,
    trade_writer: TradeWriter,
    order_store: Option<OrderStore>,
}

/// Request fields after validation, with the raw strings mapped onto the
/// typed enums
struct ValidOrder {
    user: String,
    client_id: String,
    side: Side,
    order_type: OrderType,
    quantity: u64,
    price: Option<u64>,
}

impl Engine {
    pub fn new(book: OrderBook, trade_writer: TradeWriter, order_store: Option<OrderStore>) -> Self {
        // A restored book already holds engine-assigned ids; new orders
        // must never collide with them.
        let order_ids = IdGenerator::starting_at(book.max_order_id().map_or(1, |id| id + 1));

        Self {
            running: false,
            order_ids,
            trade_ids: IdGenerator::new(),
            book,
            trade_writer,
            order_store,
        }
    }

    /// Start accepting orders. Idempotent, no I/O.
    pub fn start(&mut self) {
        if self.running {
            return;
        }
        self.running = true;
        info!("Exchange engine started");
    }

    /// Stop the engine gracefully
    ///
    /// Flushes and stops the trade writer, then persists the active orders
    /// when an order store is configured. Idempotent; safe even if `start`
    /// was never called.
    pub fn stop(&mut self) {
        if self.running {
            info!("Stopping exchange engine");
        }
        self.running = false;

        self.trade_writer.flush();
        self.trade_writer.stop();

        if let Some(store) = &self.order_store {
            let active = self.book.snapshot();
            match store.save(&active) {
                Ok(()) => info!(orders = active.len(), "Saved order book snapshot"),
                Err(e) => error!(error = %e, "Failed to save order book snapshot"),
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// The order book, exposed for inspection (tests, depth queries)
    pub fn book(&self) -> &OrderBook {
        &self.book
    }

    /// Sole client-facing entry point: validate, stamp, match, respond
    ///
    /// Always returns exactly one response; every failure renders as the
    /// rejection shape with the request quantity echoed.
    pub fn place_order(&mut self, request: OrderRequest) -> OrderResponse {
        let quantity_echo = request.quantity_echo();

        match self.process(request) {
            Ok(response) => response,
            Err(e) => {
                debug!(error = %e, "Order rejected");
                OrderResponse::rejected(quantity_echo, unix_seconds(), e.to_string())
            }
        }
    }

    fn process(&mut self, request: OrderRequest) -> Result<OrderResponse, EngineError> {
        if !self.running {
            return Err(EngineError::NotRunning);
        }

        let valid = Self::validate(&request)?;

        // The request payload was copied at decode time; from here on the
        // engine works exclusively with its own order.
        let order_id = self.order_ids.next();
        let order = Order::new(
            order_id,
            valid.user,
            valid.client_id,
            valid.side,
            valid.order_type,
            valid.price,
            valid.quantity,
            unix_nanos(),
        );

        debug!(
            order_id,
            side = ?order.side,
            order_type = ?order.order_type,
            price = ?order.price,
            quantity = order.original_quantity,
            "Processing order"
        );

        let (trades, remaining_quantity) = self.book.match_order(order, &mut self.trade_ids);

        for trade in &trades {
            // The trade already happened in memory; a failed hand-off to
            // the persistence pipeline must not fail the client response.
            if let Err(e) = self.trade_writer.enqueue(trade.clone()) {
                warn!(
                    trade_id = trade.trade_id,
                    error = %e,
                    "Failed to enqueue trade for persistence"
                );
            }
        }

        if !trades.is_empty() {
            info!(
                order_id,
                trades = trades.len(),
                remaining = remaining_quantity,
                "Order executed"
            );
        }

        Ok(OrderResponse {
            accepted: true,
            order_id: Some(order_id),
            trades: trades.iter().map(Trade::to_record).collect(),
            remaining_quantity,
            timestamp: unix_seconds(),
            message: Self::execution_message(&trades, remaining_quantity).to_string(),
        })
    }

    /// Validate a decoded request
    ///
    /// Missing required fields are reported as a sorted set; the remaining
    /// rules fire one at a time in a fixed order.
    fn validate(request: &OrderRequest) -> Result<ValidOrder, EngineError> {
        let (user, client_id, side_raw, type_raw, quantity) = match (
            request.user.clone(),
            request.client_id.clone(),
            request.side.clone(),
            request.order_type.clone(),
            request.quantity,
        ) {
            (Some(user), Some(client_id), Some(side), Some(order_type), Some(quantity)) => {
                (user, client_id, side, order_type, quantity)
            }
            _ => {
                let mut missing = Vec::new();
                if request.user.is_none() {
                    missing.push("user");
                }
                if request.side.is_none() {
                    missing.push("side");
                }
                if request.quantity.is_none() {
                    missing.push("quantity");
                }
                if request.client_id.is_none() {
                    missing.push("client_id");
                }
                if request.order_type.is_none() {
                    missing.push("order_type");
                }
                missing.sort_unstable();
                return Err(EngineError::InvalidRequest(format!(
                    "Missing fields: {}",
                    missing.join(", ")
                )));
            }
        };

        let side = match side_raw.as_str() {
            "BUY" => Side::Buy,
            "SELL" => Side::Sell,
            _ => return Err(EngineError::InvalidRequest("Invalid side".to_string())),
        };

        let order_type = match type_raw.as_str() {
            "LIMIT" => OrderType::Limit,
            "MARKET" => OrderType::Market,
            _ => {
                return Err(EngineError::InvalidRequest(
                    "Invalid order type".to_string(),
                ));
            }
        };

        if quantity <= 0 {
            return Err(EngineError::InvalidRequest(
                "Quantity must be positive".to_string(),
            ));
        }

        let price = match order_type {
            OrderType::Limit => {
                let Some(price) = request.price else {
                    return Err(EngineError::InvalidRequest(
                        "LIMIT order requires price".to_string(),
                    ));
                };
                if price <= 0 {
                    return Err(EngineError::InvalidRequest(
                        "Price must be positive".to_string(),
                    ));
                }
                Some(price as u64)
            }
            // A price on a market order is an unknown field: ignored.
            OrderType::Market => None,
        };

        Ok(ValidOrder {
            user,
            client_id,
            side,
            order_type,
            quantity: quantity as u64,
            price,
        })
    }

    fn execution_message(trades: &[Trade], remaining_quantity: u64) -> &'static str {
        if trades.is_empty() {
            "Order accepted and placed in order book"
        } else if remaining_quantity == 0 {
            "Order fully executed"
        } else {
            "Order partially executed"
        }
    }
}
