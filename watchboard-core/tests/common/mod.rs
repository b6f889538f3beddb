//! Shared fixtures: an in-memory provider and a small watchlist.

#![allow(dead_code)]

use chrono::{Duration, TimeZone, Utc};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use watchboard_core::data::{BarBatch, DataError, Fundamentals, Lookback, SeriesProvider, Watchlist};
use watchboard_core::domain::{Bar, Interval};

/// Daily bars from closes; high/low bracket the open and close by 1.0.
pub fn bars_from_closes(closes: &[f64]) -> Vec<Bar> {
    let base = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Bar::new(
                base + Duration::days(i as i64),
                Some(open),
                Some(open.max(close) + 1.0),
                Some(open.min(close) - 1.0),
                Some(close),
            )
        })
        .collect()
}

pub fn rising(n: usize, start: f64) -> Vec<f64> {
    (0..n).map(|i| start + i as f64).collect()
}

#[derive(Default)]
pub struct MockProvider {
    daily: Mutex<BTreeMap<String, Vec<Bar>>>,
    intraday: Mutex<BTreeMap<String, Vec<Bar>>>,
    fundamentals: Mutex<BTreeMap<String, Fundamentals>>,
    failing_fundamentals: Mutex<BTreeSet<String>>,
    /// Bar requests containing any of these symbols are rate limited.
    throttled: Mutex<BTreeSet<String>>,
    /// Batch requests succeed, but these symbols' entries are rate limited.
    throttled_entries: Mutex<BTreeSet<String>>,
    throttled_fundamentals: Mutex<BTreeSet<String>>,
    pub bar_requests: AtomicUsize,
    pub fundamentals_requests: AtomicUsize,
}

impl MockProvider {
    pub fn with_daily(self, symbol: &str, closes: &[f64]) -> Self {
        self.daily.lock().unwrap().insert(symbol.into(), bars_from_closes(closes));
        self
    }

    pub fn with_intraday(self, symbol: &str, closes: &[f64]) -> Self {
        self.intraday.lock().unwrap().insert(symbol.into(), bars_from_closes(closes));
        self
    }

    pub fn with_market_cap(self, symbol: &str, cap: f64) -> Self {
        self.fundamentals.lock().unwrap().insert(
            symbol.into(),
            Fundamentals {
                long_name: Some(format!("{symbol} Corp")),
                market_cap: Some(cap),
                ..Fundamentals::default()
            },
        );
        self
    }

    pub fn fail_fundamentals(self, symbol: &str) -> Self {
        self.failing_fundamentals.lock().unwrap().insert(symbol.into());
        self
    }

    pub fn throttle_entry(self, symbol: &str) -> Self {
        self.throttled_entries.lock().unwrap().insert(symbol.into());
        self
    }

    pub fn throttle_fundamentals(self, symbol: &str) -> Self {
        self.throttled_fundamentals.lock().unwrap().insert(symbol.into());
        self
    }

    pub fn throttle(&self, symbol: &str) {
        self.throttled.lock().unwrap().insert(symbol.into());
    }

    pub fn clear_throttle(&self) {
        self.throttled.lock().unwrap().clear();
    }

    pub fn requests(&self) -> usize {
        self.bar_requests.load(Ordering::SeqCst) + self.fundamentals_requests.load(Ordering::SeqCst)
    }
}

impl SeriesProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn bars(&self, symbols: &[String], interval: Interval, _: Lookback) -> Result<BarBatch, DataError> {
        self.bar_requests.fetch_add(1, Ordering::SeqCst);
        let throttled = self.throttled.lock().unwrap();
        if symbols.iter().any(|s| throttled.contains(s)) {
            return Err(DataError::RateLimited { retry_after_secs: 60 });
        }
        let source = match interval {
            Interval::Daily => self.daily.lock().unwrap(),
            _ => self.intraday.lock().unwrap(),
        };
        let throttled_entries = self.throttled_entries.lock().unwrap();
        Ok(symbols
            .iter()
            .map(|s| {
                if throttled_entries.contains(s) {
                    return (s.clone(), Err(DataError::RateLimited { retry_after_secs: 30 }));
                }
                let result = source
                    .get(s)
                    .cloned()
                    .ok_or_else(|| DataError::SymbolNotFound { symbol: s.clone() });
                (s.clone(), result)
            })
            .collect())
    }

    fn fundamentals(&self, symbol: &str) -> Result<Fundamentals, DataError> {
        self.fundamentals_requests.fetch_add(1, Ordering::SeqCst);
        if self.throttled_fundamentals.lock().unwrap().contains(symbol) {
            return Err(DataError::RateLimited { retry_after_secs: 30 });
        }
        if self.failing_fundamentals.lock().unwrap().contains(symbol) {
            return Err(DataError::NetworkUnreachable("connection reset".into()));
        }
        Ok(self
            .fundamentals
            .lock()
            .unwrap()
            .get(symbol)
            .cloned()
            .unwrap_or_default())
    }
}

pub const WATCHLIST_JSON: &str = r#"{"Categories": {
    "Energy": {
        "Oil & Gas": [
            {"symbol": "XOM", "flag": true, "Name": "Exxon Mobil"},
            {"symbol": "CVX", "Name": "Chevron"}
        ]
    },
    "Tech": {
        "Software": [
            {"symbol": "MSFT", "flag": true},
            {"symbol": "ORCL"}
        ],
        "Hardware": [
            {"symbol": "AAPL"}
        ]
    }
}}"#;

pub fn watchlist() -> Watchlist {
    Watchlist::from_json(WATCHLIST_JSON).unwrap()
}

/// Provider with a full year of data for every watchlist symbol.
pub fn populated_provider() -> MockProvider {
    [
        ("XOM", 450.0e9),
        ("CVX", 290.0e9),
        ("MSFT", 3.1e12),
        ("ORCL", 350.0e9),
        ("AAPL", 3.4e12),
    ]
    .into_iter()
    .enumerate()
    .fold(MockProvider::default(), |p, (i, (symbol, cap))| {
        let start = 50.0 + 10.0 * i as f64;
        let closes: Vec<f64> = (0..260)
            .map(|d| start + (d as f64 * 0.3).sin() * 5.0 + d as f64 * 0.05)
            .collect();
        p.with_daily(symbol, &closes)
            .with_intraday(symbol, &closes[..40])
            .with_market_cap(symbol, cap)
    })
}
