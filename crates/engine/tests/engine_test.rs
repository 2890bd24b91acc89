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

//! End-to-end matching scenarios through the engine core
//!
//! These tests drive the engine the way the matching loop does: one
//! `place_order` at a time, asserting the full response surface and the
//! trades that reach the ledger.

use crucible_engine::engine::Engine;
use crucible_engine::ledger::{MemoryLedger, TradeWriter, TradeWriterConfig};
use crucible_engine::orderbook::OrderBook;
use crucible_engine::store::OrderStore;
use crucible_engine::types::OrderRequest;

fn request(side: &str, order_type: &str, quantity: i64, price: Option<i64>) -> OrderRequest {
    request_for("alice", side, order_type, quantity, price)
}

fn request_for(
    user: &str,
    side: &str,
    order_type: &str,
    quantity: i64,
    price: Option<i64>,
) -> OrderRequest {
    OrderRequest {
        user: Some(user.to_string()),
        client_id: Some(format!("cli_{user}")),
        side: Some(side.to_string()),
        order_type: Some(order_type.to_string()),
        quantity: Some(quantity),
        price,
    }
}

fn engine_with_ledger() -> (Engine, MemoryLedger) {
    let ledger = MemoryLedger::new();
    let mut writer = TradeWriter::new(
        Box::new(ledger.clone()),
        TradeWriterConfig {
            poll_interval_ms: 10,
            ..TradeWriterConfig::default()
        },
    );
    writer.start();

    let mut engine = Engine::new(OrderBook::new(), writer, None);
    engine.start();
    (engine, ledger)
}

#[test]
fn test_exact_cross() {
    let (mut engine, _ledger) = engine_with_ledger();

    let sell = engine.place_order(request_for("s", "SELL", "LIMIT", 10, Some(100)));
    assert!(sell.accepted);
    assert_eq!(sell.message, "Order accepted and placed in order book");

    let buy = engine.place_order(request_for("b", "BUY", "LIMIT", 10, Some(100)));
    assert!(buy.accepted);
    assert_eq!(buy.trades.len(), 1);
    assert_eq!(buy.trades[0].price, 100);
    assert_eq!(buy.trades[0].quantity, 10);
    assert_eq!(buy.remaining_quantity, 0);
    assert_eq!(buy.message, "Order fully executed");
    assert!(engine.book().is_empty());
}

#[test]
fn test_partial_fill_rests() {
    let (mut engine, _ledger) = engine_with_ledger();

    engine.place_order(request_for("s", "SELL", "LIMIT", 10, Some(100)));
    let buy = engine.place_order(request_for("b", "BUY", "LIMIT", 15, Some(100)));

    assert_eq!(buy.trades.len(), 1);
    assert_eq!(buy.trades[0].quantity, 10);
    assert_eq!(buy.remaining_quantity, 5);
    assert_eq!(buy.message, "Order partially executed");

    let resting = engine.book().snapshot();
    assert_eq!(resting.len(), 1);
    assert_eq!(resting[0].order_id, buy.order_id.unwrap());
    assert_eq!(resting[0].remaining_quantity, 5);
}

#[test]
fn test_walks_levels_at_best_price_first() {
    let (mut engine, _ledger) = engine_with_ledger();

    engine.place_order(request_for("s1", "SELL", "LIMIT", 5, Some(100)));
    engine.place_order(request_for("s2", "SELL", "LIMIT", 5, Some(101)));

    let buy = engine.place_order(request_for("b", "BUY", "LIMIT", 8, Some(101)));
    assert_eq!(buy.remaining_quantity, 0);
    assert_eq!(buy.trades.len(), 2);
    assert_eq!((buy.trades[0].price, buy.trades[0].quantity), (100, 5));
    assert_eq!((buy.trades[1].price, buy.trades[1].quantity), (101, 3));

    let resting = engine.book().snapshot();
    assert_eq!(resting.len(), 1);
    assert_eq!(resting[0].remaining_quantity, 2);
}

#[test]
fn test_market_order_takes_time_priority() {
    let (mut engine, _ledger) = engine_with_ledger();

    let first = engine.place_order(request_for("s1", "SELL", "LIMIT", 5, Some(100)));
    let second = engine.place_order(request_for("s2", "SELL", "LIMIT", 5, Some(100)));

    let buy = engine.place_order(request_for("b", "BUY", "MARKET", 7, None));
    assert_eq!(buy.trades.len(), 2);
    assert_eq!(buy.trades[0].sell_order_id, first.order_id.unwrap());
    assert_eq!(buy.trades[0].quantity, 5);
    assert_eq!(buy.trades[1].sell_order_id, second.order_id.unwrap());
    assert_eq!(buy.trades[1].quantity, 2);
    assert_eq!(buy.remaining_quantity, 0);
}

#[test]
fn test_market_order_with_empty_book() {
    let (mut engine, _ledger) = engine_with_ledger();

    let buy = engine.place_order(request("BUY", "MARKET", 10, None));
    assert!(buy.accepted);
    assert!(buy.trades.is_empty());
    assert_eq!(buy.remaining_quantity, 10);
    assert_eq!(buy.message, "Order accepted and placed in order book");

    // The market order must not appear in any snapshot of the book.
    assert!(engine.book().snapshot().is_empty());
}

#[test]
fn test_invalid_limit_without_price_leaves_book_unchanged() {
    let (mut engine, _ledger) = engine_with_ledger();

    engine.place_order(request_for("s", "SELL", "LIMIT", 10, Some(100)));
    let before = engine.book().snapshot();

    let response = engine.place_order(request_for("b", "BUY", "LIMIT", 10, None));
    assert!(!response.accepted);
    assert_eq!(response.order_id, None);
    assert!(response.message.contains("price"));
    assert_eq!(response.remaining_quantity, 10);

    let after = engine.book().snapshot();
    assert_eq!(before.len(), after.len());
    assert_eq!(before[0].order_id, after[0].order_id);
}

#[test]
fn test_price_improvement_for_the_taker() {
    let (mut engine, _ledger) = engine_with_ledger();

    engine.place_order(request_for("s", "SELL", "LIMIT", 10, Some(100)));
    let buy = engine.place_order(request_for("b", "BUY", "LIMIT", 10, Some(110)));

    assert_eq!(buy.trades[0].price, 100);
}

#[test]
fn test_ledger_records_trades_in_emission_order() {
    let (mut engine, ledger) = engine_with_ledger();

    engine.place_order(request_for("s1", "SELL", "LIMIT", 5, Some(100)));
    engine.place_order(request_for("s2", "SELL", "LIMIT", 5, Some(101)));
    engine.place_order(request_for("b1", "BUY", "LIMIT", 8, Some(101)));
    engine.place_order(request_for("b2", "BUY", "MARKET", 2, None));

    engine.stop();

    let trades = ledger.trades();
    assert_eq!(trades.len(), 3);
    for pair in trades.windows(2) {
        assert!(pair[0].trade_id < pair[1].trade_id);
    }
    assert_eq!(trades[0].price, 100);
    assert_eq!(trades[1].price, 101);
    assert_eq!(trades[2].price, 101);
}

#[test]
fn test_snapshot_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let snapshot_path = dir.path().join("orders_snapshot.json");

    let ledger = MemoryLedger::new();
    let mut writer = TradeWriter::new(Box::new(ledger.clone()), TradeWriterConfig::default());
    writer.start();

    let mut engine = Engine::new(
        OrderBook::new(),
        writer,
        Some(OrderStore::new(&snapshot_path)),
    );
    engine.start();

    engine.place_order(request_for("s", "SELL", "LIMIT", 10, Some(100)));
    let resting_bid = engine.place_order(request_for("b", "BUY", "LIMIT", 3, Some(99)));
    engine.stop();

    // Second engine generation: load the snapshot, restore, and match
    // against what the first generation left behind.
    let store = OrderStore::new(&snapshot_path);
    let mut book = OrderBook::new();
    book.restore(store.load().unwrap()).unwrap();
    assert_eq!(book.len(), 2);

    let mut writer = TradeWriter::new(Box::new(MemoryLedger::new()), TradeWriterConfig::default());
    writer.start();
    let mut engine = Engine::new(book, writer, Some(store));
    engine.start();

    let sell = engine.place_order(request_for("t", "SELL", "LIMIT", 3, Some(99)));
    assert_eq!(sell.trades.len(), 1);
    assert_eq!(sell.trades[0].price, 99);
    assert_eq!(sell.trades[0].buy_order_id, resting_bid.order_id.unwrap());
    // New ids continue past the restored ones.
    assert!(sell.order_id.unwrap() > resting_bid.order_id.unwrap());

    engine.stop();
}

#[test]
fn test_fill_volume_is_conserved() {
    let (mut engine, ledger) = engine_with_ledger();

    let orders = [
        ("a", "SELL", 7, Some(101)),
        ("b", "SELL", 4, Some(100)),
        ("c", "BUY", 9, Some(101)),
        ("d", "BUY", 5, Some(100)),
        ("e", "SELL", 6, Some(99)),
    ];

    let mut responses = Vec::new();
    for (user, side, quantity, price) in orders {
        let response = engine.place_order(request_for(user, side, "LIMIT", quantity, price));
        assert!(response.accepted);
        let filled: u64 = response.trades.iter().map(|t| t.quantity).sum();
        assert_eq!(filled + response.remaining_quantity, quantity as u64);
        responses.push(response);
    }

    engine.stop();

    // Every ledger record pairs one buy and one sell fill of equal size.
    let mut per_order = std::collections::HashMap::<u64, u64>::new();
    for trade in ledger.trades() {
        assert!(trade.quantity > 0);
        *per_order.entry(trade.buy_order_id).or_default() += trade.quantity;
        *per_order.entry(trade.sell_order_id).or_default() += trade.quantity;
    }
    // A maker can be filled after its own response, so the ledger total
    // per order is bounded by its original quantity, not by the
    // response-time fill.
    for ((_, _, quantity, _), response) in orders.iter().zip(&responses) {
        let filled = per_order.get(&response.order_id.unwrap()).copied().unwrap_or(0);
        assert!(filled <= *quantity as u64);
    }
}
