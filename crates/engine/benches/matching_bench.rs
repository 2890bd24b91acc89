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

use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use crucible_engine::orderbook::OrderBook;
use crucible_engine::types::{IdGenerator, Order};
use crucible_sdk::types::{OrderType, Side};

fn limit(order_id: u64, side: Side, price: u64, quantity: u64, timestamp: u64) -> Order {
    Order::new(
        order_id,
        "bench".to_string(),
        format!("cli_{order_id}"),
        side,
        OrderType::Limit,
        Some(price),
        quantity,
        timestamp,
    )
}

/// Book with `levels` ask price levels, `per_level` resting orders each
fn seeded_book(levels: u64, per_level: u64) -> OrderBook {
    let mut book = OrderBook::new();
    let mut trade_ids = IdGenerator::new();
    let mut order_id = 1;

    for level in 0..levels {
        for _ in 0..per_level {
            book.match_order(
                limit(order_id, Side::Sell, 100 + level, 10, order_id),
                &mut trade_ids,
            );
            order_id += 1;
        }
    }

    book
}

fn bench_rest_noncrossing_limit(c: &mut Criterion) {
    c.bench_function("rest_noncrossing_limit", |b| {
        b.iter_batched(
            || (seeded_book(10, 10), IdGenerator::new()),
            |(mut book, mut trade_ids)| {
                black_box(book.match_order(
                    limit(10_000, Side::Buy, 50, 10, 10_000),
                    &mut trade_ids,
                ))
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_sweep_ten_levels(c: &mut Criterion) {
    c.bench_function("sweep_ten_levels", |b| {
        b.iter_batched(
            || (seeded_book(10, 10), IdGenerator::new()),
            |(mut book, mut trade_ids)| {
                black_box(book.match_order(
                    limit(10_000, Side::Buy, 200, 1_000, 10_000),
                    &mut trade_ids,
                ))
            },
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(benches, bench_rest_noncrossing_limit, bench_sweep_ten_levels);
criterion_main!(benches);
