//! Benchmarks for book reconstruction and signal computation

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use lob_replay::book::OrderBookState;
use lob_replay::data::{EventKind, MarketEvent, Side};
use lob_replay::signal::SignalEngine;

fn depth_updates(count: usize) -> Vec<MarketEvent> {
    (0..count)
        .map(|i| {
            let side = if i % 2 == 0 { Side::Buy } else { Side::Sell };
            let offset = ((i % 50) as f64) * 0.1;
            let price = match side {
                Side::Buy => 10_000.0 - 0.1 - offset,
                Side::Sell => 10_000.0 + 0.1 + offset,
            };
            MarketEvent {
                kind: EventKind::Depth,
                side,
                exch_ts: i as i64,
                local_ts: i as i64,
                price,
                qty: 1.0 + (i % 7) as f64,
            }
        })
        .collect()
}

fn benchmark_book_apply(c: &mut Criterion) {
    let updates = depth_updates(10_000);

    c.bench_function("book_apply_10k", |b| {
        b.iter(|| {
            let mut book = OrderBookState::new(0.1);
            for update in &updates {
                let _ = book.apply(black_box(update));
            }
            book.best_bid()
        })
    });
}

fn benchmark_signal_snapshot(c: &mut Criterion) {
    let mut book = OrderBookState::new(0.1);
    for update in depth_updates(200) {
        let _ = book.apply(&update);
    }
    let mut signals = SignalEngine::new(5, 100);
    for i in 0..100 {
        let side = if i % 3 == 0 { Side::Buy } else { Side::Sell };
        signals.record_trade(side, 0.5 + (i % 4) as f64);
    }

    c.bench_function("signal_snapshot", |b| {
        b.iter(|| signals.snapshot(black_box(&book)))
    });
}

criterion_group!(benches, benchmark_book_apply, benchmark_signal_snapshot);
criterion_main!(benches);
