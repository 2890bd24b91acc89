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

/// Order side (buy or sell)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// The side a matching resting order sits on
    pub fn opposite(self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

/// Order type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderType {
    Limit,
    Market,
}

/// Order status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    New,
    PartiallyFilled,
    Filled,
    Cancelled,
}

/// Request to place an order
///
/// This is the strict client-side shape: one JSON object per line on the
/// wire. `price` is required for limit orders and must be omitted for
/// market orders.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaceOrder {
    /// User who places the order
    pub user: String,
    /// Client-supplied correlation ID, echoed verbatim in trades
    pub client_id: String,
    /// Order side
    pub side: Side,
    /// Order type
    pub order_type: OrderType,
    /// Quantity (must be positive)
    pub quantity: u64,
    /// Limit price (required iff `order_type == Limit`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<u64>,
}

/// One executed trade as reported to clients
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeRecord {
    /// Engine-assigned trade ID
    pub trade_id: u64,
    /// Order ID of the buy side
    pub buy_order_id: u64,
    /// Order ID of the sell side
    pub sell_order_id: u64,
    /// Client ID of the buy side
    pub buy_client_id: String,
    /// Client ID of the sell side
    pub sell_client_id: String,
    /// Execution price (the resting order's price)
    pub price: u64,
    /// Executed quantity
    pub quantity: u64,
    /// Execution time, seconds since the Unix epoch
    pub timestamp: f64,
}

/// Response to a placed order
///
/// Exactly one response is sent per parsed request line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderResponse {
    /// Whether the order was accepted by the engine
    pub accepted: bool,
    /// Engine-assigned order ID (`null` when rejected)
    pub order_id: Option<u64>,
    /// Trades executed while matching this order
    pub trades: Vec<TradeRecord>,
    /// Quantity left unmatched after matching
    pub remaining_quantity: u64,
    /// Response time, seconds since the Unix epoch
    pub timestamp: f64,
    /// Human-readable outcome description
    pub message: String,
}

impl OrderResponse {
    /// Build the rejection shape: no order ID, no trades, quantity echoed.
    pub fn rejected(quantity: u64, timestamp: f64, message: impl Into<String>) -> Self {
        Self {
            accepted: false,
            order_id: None,
            trades: Vec::new(),
            remaining_quantity: quantity,
            timestamp,
            message: message.into(),
        }
    }
}

/// Generate a fresh client ID in the `cli_<hex8>` convention
pub fn generate_client_id() -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    format!("cli_{}", &id[..8])
}
