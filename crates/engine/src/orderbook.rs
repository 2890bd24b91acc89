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

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::collections::binary_heap::PeekMut;

use crucible_sdk::types::{OrderType, Side};
use thiserror::Error;

use crate::types::{IdGenerator, Order, Trade, unix_nanos};

/// Error types for order book restore
#[derive(Debug, Error)]
pub enum BookError {
    #[error("Corrupt snapshot: {0}")]
    CorruptSnapshot(String),
}

/// Heap entry pairing a resting order with its priority price
///
/// The price is duplicated out of the order so the comparators never have
/// to unwrap `Order::price`. Fill state is not part of the ordering key,
/// so mutating the top entry through `PeekMut` never reorders the heap.
#[derive(Debug, Clone)]
struct BookEntry {
    price: u64,
    order: Order,
}

impl BookEntry {
    fn key(&self) -> (u64, u64, u64) {
        (self.price, self.order.timestamp, self.order.order_id)
    }
}

impl PartialEq for BookEntry {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for BookEntry {}

/// Buy-side entry: the heap top is the highest price, then the earliest
/// timestamp, then the lowest order ID
#[derive(Debug, Clone, PartialEq, Eq)]
struct Bid(BookEntry);

impl Ord for Bid {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0
            .price
            .cmp(&other.0.price)
            .then_with(|| other.0.order.timestamp.cmp(&self.0.order.timestamp))
            .then_with(|| other.0.order.order_id.cmp(&self.0.order.order_id))
    }
}

impl PartialOrd for Bid {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Sell-side entry: the heap top is the lowest price, then the earliest
/// timestamp, then the lowest order ID
#[derive(Debug, Clone, PartialEq, Eq)]
struct Ask(BookEntry);

impl Ord for Ask {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .0
            .price
            .cmp(&self.0.price)
            .then_with(|| other.0.order.timestamp.cmp(&self.0.order.timestamp))
            .then_with(|| other.0.order.order_id.cmp(&self.0.order.order_id))
    }
}

impl PartialOrd for Ask {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Central limit order book for a single instrument
///
/// Two priority heaps hold the resting orders: bids ordered by highest
/// price first, asks by lowest price first, both tie-broken by earliest
/// acceptance timestamp and then by order ID. Only active orders
/// (`remaining_quantity > 0`) rest in the book; a fully filled resting
/// order is always at the heap top when it is removed, so no random
/// deletion is ever needed.
#[derive(Debug, Default)]
pub struct OrderBook {
    bids: BinaryHeap<Bid>,
    asks: BinaryHeap<Ask>,
}

impl OrderBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Match an incoming order against the opposite side
    ///
    /// Limit orders cross while the best opposite price satisfies their
    /// limit; any residual rests on the book with the order's original
    /// acceptance timestamp. Market orders cross while the opposite side
    /// is non-empty; their residual is discarded, never rested.
    ///
    /// Returns the trades generated, in execution order, and the quantity
    /// left unmatched.
    pub fn match_order(
        &mut self,
        mut order: Order,
        trade_ids: &mut IdGenerator,
    ) -> (Vec<Trade>, u64) {
        let limit = match order.order_type {
            OrderType::Limit => order.price,
            OrderType::Market => None,
        };

        let trades = match order.side {
            Side::Buy => Self::match_against_asks(&mut self.asks, &mut order, trade_ids, limit),
            Side::Sell => Self::match_against_bids(&mut self.bids, &mut order, trade_ids, limit),
        };

        let remaining = order.remaining_quantity;
        if order.order_type == OrderType::Limit && order.is_active() {
            self.rest(order);
        }

        (trades, remaining)
    }

    /// Cross an incoming buy against the ask side
    ///
    /// One matching step: take the best ask, fill `min` of both remainders
    /// into both orders, emit a trade at the resting price, and pop the
    /// ask iff it is now fully filled. `limit == None` crosses
    /// unconditionally (market orders).
    fn match_against_asks(
        asks: &mut BinaryHeap<Ask>,
        incoming: &mut Order,
        trade_ids: &mut IdGenerator,
        limit: Option<u64>,
    ) -> Vec<Trade> {
        let mut trades = Vec::new();

        while incoming.remaining_quantity > 0 {
            let Some(mut best) = asks.peek_mut() else {
                break;
            };
            if let Some(limit) = limit
                && best.0.price > limit
            {
                break;
            }

            let quantity = incoming.remaining_quantity.min(best.0.order.remaining_quantity);
            incoming.apply_fill(quantity);
            best.0.order.apply_fill(quantity);

            trades.push(Trade {
                trade_id: trade_ids.next(),
                buy_order_id: incoming.order_id,
                sell_order_id: best.0.order.order_id,
                buy_client_id: incoming.client_id.clone(),
                sell_client_id: best.0.order.client_id.clone(),
                price: best.0.price,
                quantity,
                timestamp: unix_nanos(),
            });

            if best.0.order.is_filled() {
                PeekMut::pop(best);
            }
        }

        trades
    }

    /// Cross an incoming sell against the bid side; mirror of the ask path
    fn match_against_bids(
        bids: &mut BinaryHeap<Bid>,
        incoming: &mut Order,
        trade_ids: &mut IdGenerator,
        limit: Option<u64>,
    ) -> Vec<Trade> {
        let mut trades = Vec::new();

        while incoming.remaining_quantity > 0 {
            let Some(mut best) = bids.peek_mut() else {
                break;
            };
            if let Some(limit) = limit
                && best.0.price < limit
            {
                break;
            }

            let quantity = incoming.remaining_quantity.min(best.0.order.remaining_quantity);
            incoming.apply_fill(quantity);
            best.0.order.apply_fill(quantity);

            trades.push(Trade {
                trade_id: trade_ids.next(),
                buy_order_id: best.0.order.order_id,
                sell_order_id: incoming.order_id,
                buy_client_id: best.0.order.client_id.clone(),
                sell_client_id: incoming.client_id.clone(),
                price: best.0.price,
                quantity,
                timestamp: unix_nanos(),
            });

            if best.0.order.is_filled() {
                PeekMut::pop(best);
            }
        }

        trades
    }

    /// Rest a limit residual on its side of the book
    fn rest(&mut self, order: Order) {
        let Some(price) = order.price else {
            return;
        };

        let entry = BookEntry { price, order };
        match entry.order.side {
            Side::Buy => self.bids.push(Bid(entry)),
            Side::Sell => self.asks.push(Ask(entry)),
        }
    }

    /// Highest order ID resting on either side
    ///
    /// After a snapshot restore the engine seeds its order ID counter past
    /// this value so new orders never collide with restored ones.
    pub fn max_order_id(&self) -> Option<u64> {
        self.bids
            .iter()
            .map(|b| b.0.order.order_id)
            .chain(self.asks.iter().map(|a| a.0.order.order_id))
            .max()
    }

    /// Best (highest) bid price currently resting
    pub fn best_bid(&self) -> Option<u64> {
        self.bids.peek().map(|b| b.0.price)
    }

    /// Best (lowest) ask price currently resting
    pub fn best_ask(&self) -> Option<u64> {
        self.asks.peek().map(|a| a.0.price)
    }

    /// Total number of resting orders on both sides
    pub fn len(&self) -> usize {
        self.bids.len() + self.asks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }

    /// Serializable projection of all active resting orders
    ///
    /// Ordered by order ID so snapshots are deterministic regardless of
    /// heap layout.
    pub fn snapshot(&self) -> Vec<Order> {
        let mut orders: Vec<Order> = self
            .bids
            .iter()
            .map(|b| b.0.order.clone())
            .chain(self.asks.iter().map(|a| a.0.order.clone()))
            .filter(Order::is_active)
            .collect();

        orders.sort_by_key(|o| o.order_id);
        orders
    }

    /// Rebuild both sides from snapshotted orders
    ///
    /// Price-time priority is reconstructed from the stored `price`,
    /// `timestamp`, and `order_id` fields alone; load order is
    /// irrelevant. The book is only replaced once every order has been
    /// validated, so a corrupt snapshot leaves it empty rather than
    /// half-restored.
    pub fn restore(&mut self, orders: Vec<Order>) -> Result<(), BookError> {
        self.bids.clear();
        self.asks.clear();

        let mut entries = Vec::with_capacity(orders.len());
        for order in orders {
            if order.order_type == OrderType::Market {
                return Err(BookError::CorruptSnapshot(format!(
                    "market order {} cannot rest in the book",
                    order.order_id
                )));
            }

            let Some(price) = order.price.filter(|p| *p > 0) else {
                return Err(BookError::CorruptSnapshot(format!(
                    "order {} has no positive price",
                    order.order_id
                )));
            };

            if order.remaining_quantity == 0 || order.remaining_quantity > order.original_quantity
            {
                return Err(BookError::CorruptSnapshot(format!(
                    "order {} has inconsistent quantities ({}/{})",
                    order.order_id, order.remaining_quantity, order.original_quantity
                )));
            }

            entries.push(BookEntry { price, order });
        }

        for entry in entries {
            match entry.order.side {
                Side::Buy => self.bids.push(Bid(entry)),
                Side::Sell => self.asks.push(Ask(entry)),
            }
        }

        Ok(())
    }
}
