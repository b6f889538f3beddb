//! Average True Range (ATR) and ATR%.
//!
//! True Range: max(high-low, |high-prev_close|, |low-prev_close|)
//! The first bar has no previous close and contributes no true range.
//! ATR is an EMA of the true ranges with alpha = 1/window (Wilder), seeded
//! with the first true range.
//! Needs at least `window` bars.

use crate::domain::{Bar, Value};

/// True range for every bar after the first.
///
/// A bar missing its high or low contributes nothing. When the previous
/// bar's close is missing, the range falls back to high - low.
pub fn true_range(bars: &[Bar]) -> Vec<f64> {
    bars.windows(2)
        .filter_map(|w| {
            let (prev, cur) = (&w[0], &w[1]);
            let (h, l) = (cur.high?, cur.low?);
            let range = (h - l).abs();
            Some(match prev.close {
                Some(pc) => range.max((h - pc).abs()).max((l - pc).abs()),
                None => range,
            })
        })
        .collect()
}

/// Wilder smoothing as an EMA with alpha = 1/window, seeded with the first
/// value. Returns the full smoothed series.
pub fn wilder_ema(values: &[f64], window: usize) -> Vec<f64> {
    let mut out = Vec::with_capacity(values.len());
    if window == 0 {
        return out;
    }
    let alpha = 1.0 / window as f64;
    let mut prev: Option<f64> = None;
    for &v in values {
        let next = match prev {
            None => v,
            Some(p) => alpha * v + (1.0 - alpha) * p,
        };
        out.push(next);
        prev = Some(next);
    }
    out
}

/// Latest ATR over `bars`.
pub fn atr(bars: &[Bar], window: usize) -> Value {
    if window == 0 || bars.len() < window {
        return Value::Unavailable;
    }
    let tr = true_range(bars);
    wilder_ema(&tr, window)
        .last()
        .map_or(Value::Unavailable, |&v| Value::from_f64(v))
}

/// ATR as a percentage of the latest close.
pub fn atr_percent(atr: Value, latest_close: Option<f64>) -> Value {
    match (atr, latest_close) {
        (Value::Number(a), Some(close)) if close != 0.0 => Value::from_f64(a / close * 100.0),
        _ => Value::Unavailable,
    }
}
