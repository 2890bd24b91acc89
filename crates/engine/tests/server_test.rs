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

//! Full-stack tests over a real TCP socket
//!
//! Each test stands up the whole pipeline - server, ingress queue,
//! matching actor, trade writer - on an ephemeral port and talks to it
//! through the SDK client.

use std::net::SocketAddr;

use crucible_engine::engine::{Engine, EngineActor};
use crucible_engine::ledger::{MemoryLedger, TradeWriter, TradeWriterConfig};
use crucible_engine::orderbook::OrderBook;
use crucible_engine::queue::IngressQueue;
use crucible_engine::server::Server;
use crucible_sdk::client::Client;
use crucible_sdk::types::{OrderType, PlaceOrder, Side, generate_client_id};
use tokio::net::TcpListener;

async fn spawn_stack() -> (SocketAddr, EngineActor, MemoryLedger) {
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

    let (sender, receiver) = IngressQueue::new(64).split();
    let actor = EngineActor::spawn(engine, receiver);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = Server::new(sender);
    tokio::spawn(async move {
        let _ = server.serve_on(listener).await;
    });

    (addr, actor, ledger)
}

fn limit(user: &str, side: Side, price: u64, quantity: u64) -> PlaceOrder {
    PlaceOrder {
        user: user.to_string(),
        client_id: generate_client_id(),
        side,
        order_type: OrderType::Limit,
        quantity,
        price: Some(price),
    }
}

#[tokio::test]
async fn test_order_round_trip_over_tcp() {
    let (addr, mut actor, _ledger) = spawn_stack().await;
    let mut client = Client::connect(addr).await.unwrap();

    let sell = client
        .place_order(&limit("seller", Side::Sell, 100, 10))
        .await
        .unwrap();
    assert!(sell.accepted);
    assert!(sell.order_id.is_some());
    assert_eq!(sell.remaining_quantity, 10);
    assert_eq!(sell.message, "Order accepted and placed in order book");

    let buy_order = limit("buyer", Side::Buy, 100, 10);
    let buy = client.place_order(&buy_order).await.unwrap();
    assert!(buy.accepted);
    assert_eq!(buy.trades.len(), 1);
    assert_eq!(buy.trades[0].price, 100);
    assert_eq!(buy.trades[0].quantity, 10);
    assert_eq!(buy.trades[0].buy_client_id, buy_order.client_id);
    assert_eq!(buy.remaining_quantity, 0);
    assert_eq!(buy.message, "Order fully executed");

    actor.shutdown();
}

#[tokio::test]
async fn test_two_clients_share_one_book() {
    let (addr, mut actor, ledger) = spawn_stack().await;

    let mut seller = Client::connect(addr).await.unwrap();
    let mut buyer = Client::connect(addr).await.unwrap();

    let sell = seller
        .place_order(&limit("seller", Side::Sell, 100, 5))
        .await
        .unwrap();

    let buy = buyer
        .place_order(&PlaceOrder {
            user: "buyer".to_string(),
            client_id: generate_client_id(),
            side: Side::Buy,
            order_type: OrderType::Market,
            quantity: 5,
            price: None,
        })
        .await
        .unwrap();

    assert_eq!(buy.trades.len(), 1);
    assert_eq!(buy.trades[0].sell_order_id, sell.order_id.unwrap());

    actor.shutdown();
    assert_eq!(ledger.trades().len(), 1);
}

#[tokio::test]
async fn test_malformed_json_gets_error_response() {
    let (addr, mut actor, _ledger) = spawn_stack().await;
    let mut client = Client::connect(addr).await.unwrap();

    let response = client.send_line("this is not json\n").await.unwrap();
    assert!(!response.accepted);
    assert_eq!(response.order_id, None);
    assert!(response.trades.is_empty());
    assert_eq!(response.remaining_quantity, 0);
    assert!(response.message.contains("Invalid JSON"));

    // The connection survives a malformed line.
    let ok = client
        .place_order(&limit("alice", Side::Buy, 100, 1))
        .await
        .unwrap();
    assert!(ok.accepted);

    actor.shutdown();
}

#[tokio::test]
async fn test_limit_without_price_rejected_over_wire() {
    let (addr, mut actor, _ledger) = spawn_stack().await;
    let mut client = Client::connect(addr).await.unwrap();

    let response = client
        .place_order(&PlaceOrder {
            user: "alice".to_string(),
            client_id: generate_client_id(),
            side: Side::Buy,
            order_type: OrderType::Limit,
            quantity: 4,
            price: None,
        })
        .await
        .unwrap();

    assert!(!response.accepted);
    assert_eq!(response.message, "LIMIT order requires price");
    assert_eq!(response.remaining_quantity, 4);

    actor.shutdown();
}

#[tokio::test]
async fn test_missing_fields_reported_over_wire() {
    let (addr, mut actor, _ledger) = spawn_stack().await;
    let mut client = Client::connect(addr).await.unwrap();

    let response = client
        .send_line("{\"side\":\"BUY\",\"quantity\":2}\n")
        .await
        .unwrap();

    assert!(!response.accepted);
    assert_eq!(response.message, "Missing fields: client_id, order_type, user");
    assert_eq!(response.remaining_quantity, 2);

    actor.shutdown();
}
