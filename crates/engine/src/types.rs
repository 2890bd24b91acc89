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

use crucible_sdk::types::{OrderStatus, OrderType, Side, TradeRecord};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Order request as decoded from the wire, before validation
///
/// Every field is optional at this stage so that validation -- not the
/// JSON decoder -- owns the error messages. Unknown fields in the payload
/// are ignored; `side` and `order_type` stay raw strings until validation
/// maps them onto the typed enums.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderRequest {
    pub user: Option<String>,
    pub client_id: Option<String>,
    pub side: Option<String>,
    pub order_type: Option<String>,
    pub quantity: Option<i64>,
    pub price: Option<i64>,
}

impl OrderRequest {
    /// Quantity to echo in rejection responses (0 when absent or negative)
    pub fn quantity_echo(&self) -> u64 {
        self.quantity.map_or(0, |q| q.max(0) as u64)
    }
}

/// A single limit or market order
///
/// Identity and economic terms (`order_id`, `side`, `order_type`, `price`,
/// `original_quantity`, `timestamp`) are set at creation and never change.
/// Only `remaining_quantity` and `status` mutate, and only through
/// [`Order::apply_fill`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    /// Engine-assigned unique ID
    pub order_id: u64,
    /// User who placed the order
    pub user: String,
    /// Client-supplied correlation ID, preserved verbatim
    pub client_id: String,
    /// Order side
    pub side: Side,
    /// Order type
    pub order_type: OrderType,
    /// Limit price (`Some` iff the order is a limit order)
    pub price: Option<u64>,
    /// Quantity requested at placement
    pub original_quantity: u64,
    /// Quantity still unmatched
    pub remaining_quantity: u64,
    /// Engine-assigned acceptance time, nanoseconds since the Unix epoch
    pub timestamp: u64,
    /// Lifecycle status, kept consistent with `remaining_quantity`
    pub status: OrderStatus,
}

impl Order {
    pub fn new(
        order_id: u64,
        user: String,
        client_id: String,
        side: Side,
        order_type: OrderType,
        price: Option<u64>,
        quantity: u64,
        timestamp: u64,
    ) -> Self {
        Self {
            order_id,
            user,
            client_id,
            side,
            order_type,
            price,
            original_quantity: quantity,
            remaining_quantity: quantity,
            timestamp,
            status: OrderStatus::New,
        }
    }

    /// Apply a fill, reducing the remaining quantity and updating status
    ///
    /// `quantity` must not exceed the remaining quantity; matching computes
    /// it as the min of both sides' remainders.
    pub fn apply_fill(&mut self, quantity: u64) {
        debug_assert!(quantity <= self.remaining_quantity);
        self.remaining_quantity -= quantity;

        self.status = if self.remaining_quantity == 0 {
            OrderStatus::Filled
        } else {
            OrderStatus::PartiallyFilled
        };
    }

    /// Whether the order can still be matched
    pub fn is_active(&self) -> bool {
        self.remaining_quantity > 0
    }

    pub fn is_filled(&self) -> bool {
        self.remaining_quantity == 0
    }
}

/// One execution between a buy and a sell order
///
/// Trades are created during a matching step and never mutated afterwards.
/// `price` is always the resting order's price.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    pub trade_id: u64,
    pub buy_order_id: u64,
    pub sell_order_id: u64,
    pub buy_client_id: String,
    pub sell_client_id: String,
    pub price: u64,
    pub quantity: u64,
    /// Execution time, nanoseconds since the Unix epoch
    pub timestamp: u64,
}

impl Trade {
    /// Project onto the client-facing wire shape
    pub fn to_record(&self) -> TradeRecord {
        TradeRecord {
            trade_id: self.trade_id,
            buy_order_id: self.buy_order_id,
            sell_order_id: self.sell_order_id,
            buy_client_id: self.buy_client_id.clone(),
            sell_client_id: self.sell_client_id.clone(),
            price: self.price,
            quantity: self.quantity,
            timestamp: nanos_to_seconds(self.timestamp),
        }
    }
}

/// Monotonically increasing ID source for orders and trades
///
/// A plain counter keeps IDs unique for the engine's lifetime and makes
/// matching output reproducible in tests.
#[derive(Debug)]
pub struct IdGenerator {
    next_id: u64,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    /// Counter starting at `next_id`; used to seed past restored orders
    pub fn starting_at(next_id: u64) -> Self {
        Self { next_id }
    }

    pub fn next(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Current wall-clock time, nanoseconds since the Unix epoch
pub fn unix_nanos() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

/// Current wall-clock time, float seconds since the Unix epoch
pub fn unix_seconds() -> f64 {
    nanos_to_seconds(unix_nanos())
}

pub fn nanos_to_seconds(nanos: u64) -> f64 {
    nanos as f64 / 1e9
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limit_order(quantity: u64) -> Order {
        Order::new(
            1,
            "alice".to_string(),
            "cli_a".to_string(),
            Side::Buy,
            OrderType::Limit,
            Some(100),
            quantity,
            1_000,
        )
    }

    #[test]
    fn test_new_order_status() {
        let order = limit_order(10);
        assert_eq!(order.status, OrderStatus::New);
        assert_eq!(order.remaining_quantity, order.original_quantity);
        assert!(order.is_active());
    }

    #[test]
    fn test_apply_fill_transitions() {
        let mut order = limit_order(10);

        order.apply_fill(4);
        assert_eq!(order.status, OrderStatus::PartiallyFilled);
        assert_eq!(order.remaining_quantity, 6);
        assert!(order.is_active());

        order.apply_fill(6);
        assert_eq!(order.status, OrderStatus::Filled);
        assert_eq!(order.remaining_quantity, 0);
        assert!(order.is_filled());
        assert!(!order.is_active());
    }

    #[test]
    fn test_id_generator_monotonic() {
        let mut ids = IdGenerator::new();
        let a = ids.next();
        let b = ids.next();
        let c = ids.next();
        assert!(a < b && b < c);
        assert_eq!(a, 1);
    }

    #[test]
    fn test_request_quantity_echo() {
        let mut request = OrderRequest::default();
        assert_eq!(request.quantity_echo(), 0);

        request.quantity = Some(-3);
        assert_eq!(request.quantity_echo(), 0);

        request.quantity = Some(15);
        assert_eq!(request.quantity_echo(), 15);
    }

    #[test]
    fn test_unknown_request_fields_ignored() {
        let request: OrderRequest = serde_json::from_str(
            r#"{"user":"bob","client_id":"cli_b","side":"SELL","order_type":"LIMIT",
                "quantity":3,"price":42,"exchange":"ignored"}"#,
        )
        .unwrap();

        assert_eq!(request.user.as_deref(), Some("bob"));
        assert_eq!(request.price, Some(42));
    }
}
