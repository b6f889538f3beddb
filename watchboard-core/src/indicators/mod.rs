//! Indicator engine.
//!
//! Pure functions over bar slices: no I/O, no shared state. Every reading is
//! a `Value`, so short histories and zero denominators come back as
//! `Value::Unavailable` rather than NaN or zero.

pub mod atr;
pub mod rsi;

pub use atr::{atr, atr_percent, true_range, wilder_ema};
pub use rsi::{previous_rsi, rsi, rsi_from_closes};

use crate::domain::{Bar, IndicatorResult};
use serde::{Deserialize, Serialize};

/// Window lengths for the indicator set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorSettings {
    pub rsi_window: usize,
    pub intraday_rsi_window: usize,
    pub atr_window: usize,
}

impl Default for IndicatorSettings {
    fn default() -> Self {
        Self {
            rsi_window: 14,
            intraday_rsi_window: 14,
            atr_window: 14,
        }
    }
}

/// Compute every indicator for one symbol.
///
/// `daily` feeds RSI, yRSI and ATR; `intraday` is an independently fetched
/// shorter-granularity series that feeds only `RSI_intraday`.
pub fn compute(daily: &[Bar], intraday: &[Bar], settings: &IndicatorSettings) -> IndicatorResult {
    let atr_value = atr(daily, settings.atr_window);
    let latest_close = daily.last().and_then(|b| b.close);

    IndicatorResult {
        rsi: rsi(daily, settings.rsi_window),
        y_rsi: previous_rsi(daily, settings.rsi_window),
        rsi_intraday: rsi(intraday, settings.intraday_rsi_window),
        atr: atr_value,
        atr_percent: atr_percent(atr_value, latest_close),
    }
}

/// Create synthetic daily bars from close prices for testing.
///
/// open = prev_close (or close for the first bar),
/// high = max(open, close) + 1.0, low = min(open, close) - 1.0.
#[cfg(test)]
pub fn make_bars(closes: &[f64]) -> Vec<Bar> {
    let rows: Vec<(f64, f64, f64, f64)> = closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            (open, open.max(close) + 1.0, open.min(close) - 1.0, close)
        })
        .collect();
    make_ohlc_bars(&rows)
}

/// Create daily bars from explicit (open, high, low, close) tuples.
#[cfg(test)]
pub fn make_ohlc_bars(data: &[(f64, f64, f64, f64)]) -> Vec<Bar> {
    use chrono::TimeZone;
    let base = chrono::Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
    data.iter()
        .enumerate()
        .map(|(i, &(open, high, low, close))| {
            Bar::new(
                base + chrono::Duration::days(i as i64),
                Some(open),
                Some(high),
                Some(low),
                Some(close),
            )
        })
        .collect()
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
