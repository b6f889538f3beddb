//! Criterion benchmarks for the indicator engine and category sorting.
//!
//! Benchmarks:
//! 1. RSI, yRSI and ATR over one to ten years of daily bars
//! 2. The full per-symbol indicator set (`compute`)
//! 3. Sorting a large category list by market cap

use chrono::{Duration, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use watchboard_core::domain::{Bar, CategoryRecord, SortPolicy, Value, EARNINGS_TBA};
use watchboard_core::indicators::{self, atr, previous_rsi, rsi, IndicatorSettings};

// ── Helpers ──────────────────────────────────────────────────────────

fn make_bars(n: usize) -> Vec<Bar> {
    let base = Utc.with_ymd_and_hms(2020, 1, 2, 0, 0, 0).unwrap();
    (0..n)
        .map(|i| {
            let close = 100.0 + (i as f64 * 0.1).sin() * 10.0;
            // Sprinkle gaps so the skip paths are exercised.
            let close = (i % 97 != 0).then_some(close);
            Bar::new(
                base + Duration::days(i as i64),
                close.map(|c| c - 0.3),
                close.map(|c| c + 1.5),
                close.map(|c| c - 1.5),
                close,
            )
        })
        .collect()
}

fn make_records(n: usize) -> Vec<CategoryRecord> {
    (0..n)
        .map(|i| CategoryRecord {
            symbol: format!("SYM{i:04}"),
            name: String::new(),
            open: Value::Unavailable,
            high: Value::Unavailable,
            low: Value::Unavailable,
            close: Value::Unavailable,
            price_change: Value::Unavailable,
            percent_change: Value::Unavailable,
            data_gap: false,
            indicators: Default::default(),
            market_cap: if i % 11 == 0 {
                Value::Unavailable
            } else {
                Value::from_f64(((i * 7919) % 10_000) as f64)
            },
            trailing_pe: Value::Unavailable,
            forward_pe: Value::Unavailable,
            ev_to_ebitda: Value::Unavailable,
            fifty_two_week_high: Value::Unavailable,
            fifty_two_week_low: Value::Unavailable,
            description: None,
            exchange: None,
            earnings_date: None,
            earnings_timing: EARNINGS_TBA.to_string(),
            flag: false,
            category: "Bench".to_string(),
            industry: None,
            stock_url: None,
        })
        .collect()
}

// ── 1. Single indicators ─────────────────────────────────────────────

fn bench_indicators(c: &mut Criterion) {
    let mut group = c.benchmark_group("indicators");

    for &bar_count in &[252, 1260, 2520] {
        let bars = make_bars(bar_count);

        group.bench_with_input(BenchmarkId::new("rsi_14", bar_count), &bars, |b, bars| {
            b.iter(|| rsi(black_box(bars), 14))
        });
        group.bench_with_input(BenchmarkId::new("y_rsi_14", bar_count), &bars, |b, bars| {
            b.iter(|| previous_rsi(black_box(bars), 14))
        });
        group.bench_with_input(BenchmarkId::new("atr_14", bar_count), &bars, |b, bars| {
            b.iter(|| atr(black_box(bars), 14))
        });
    }

    group.finish();
}

// ── 2. Full indicator set ────────────────────────────────────────────

fn bench_compute(c: &mut Criterion) {
    let daily = make_bars(252);
    let intraday = make_bars(90 * 7);
    let settings = IndicatorSettings::default();

    c.bench_function("compute_one_symbol", |b| {
        b.iter(|| indicators::compute(black_box(&daily), black_box(&intraday), &settings))
    });
}

// ── 3. Category sort ─────────────────────────────────────────────────

fn bench_sort(c: &mut Criterion) {
    let records = make_records(2_000);

    c.bench_function("sort_market_cap_2000", |b| {
        b.iter(|| {
            let mut list = records.clone();
            SortPolicy::MarketCapDesc.sort(black_box(&mut list));
            list
        })
    });
}

criterion_group!(benches, bench_indicators, bench_compute, bench_sort);
criterion_main!(benches);
