//! Benchmarks for the pre-trade gate

use chrono::Utc;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rust_decimal_macros::dec;
use std::sync::Arc;
use trade_gate::engine::{AccountCapabilities, RiskEngine, RiskLimits};
use trade_gate::market::PriceMap;
use trade_gate::portfolio::Portfolio;

fn benchmark_check_pre_trade(c: &mut Criterion) {
    let portfolio = Arc::new(Portfolio::new(dec!(1000000)));
    let now = Utc::now();
    for i in 0..20 {
        let symbol = format!("SYM{i}");
        portfolio
            .apply_fill(&symbol, dec!(10), dec!(100), dec!(0), now, dec!(1))
            .unwrap();
    }
    let engine = RiskEngine::new(
        RiskLimits {
            max_orders_per_minute: Some(1000),
            max_orders_per_day: Some(100000),
            ..RiskLimits::default()
        },
        AccountCapabilities::default(),
        vec![],
        Arc::clone(&portfolio),
        dec!(1000000),
        now,
    )
    .unwrap();

    let prices: PriceMap = (0..20)
        .map(|i| (format!("SYM{i}"), dec!(101)))
        .collect();

    c.bench_function("check_pre_trade", |b| {
        b.iter(|| {
            engine.check_pre_trade(
                black_box("SYM0"),
                black_box(dec!(5)),
                black_box(dec!(101)),
                black_box(dec!(1000000)),
                &prices,
                now,
            )
        })
    });
}

fn benchmark_apply_fill_equity(c: &mut Criterion) {
    let portfolio = Portfolio::new(dec!(1000000));
    let now = Utc::now();
    for i in 0..20 {
        let symbol = format!("SYM{i}");
        portfolio
            .apply_fill(&symbol, dec!(10), dec!(100), dec!(0), now, dec!(1))
            .unwrap();
    }
    let prices: PriceMap = (0..20)
        .map(|i| (format!("SYM{i}"), dec!(101)))
        .collect();

    c.bench_function("portfolio_equity", |b| {
        b.iter(|| portfolio.equity(black_box(&prices)))
    });
}

criterion_group!(benches, benchmark_check_pre_trade, benchmark_apply_fill_equity);
criterion_main!(benches);
