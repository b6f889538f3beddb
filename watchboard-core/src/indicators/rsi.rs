//! Relative Strength Index (RSI).
//!
//! Wilder smoothing of average gains and average losses, seeded with the
//! simple mean of the first `window` changes (the charting-platform
//! convention, not an EMA from the first sample).
//! RSI = 100 - 100 / (1 + avg_gain / avg_loss)
//! Needs window + 1 defined closes. Bars with a missing close are skipped.

use crate::domain::{Bar, Value};

/// RSI of the last bar in `bars`.
pub fn rsi(bars: &[Bar], window: usize) -> Value {
    let closes: Vec<f64> = bars.iter().filter_map(|b| b.close).collect();
    rsi_from_closes(&closes, window)
}

/// RSI as of the bar before the last one ("yesterday's" reading).
pub fn previous_rsi(bars: &[Bar], window: usize) -> Value {
    match bars.split_last() {
        Some((_, rest)) => rsi(rest, window),
        None => Value::Unavailable,
    }
}

/// RSI over a plain close series.
pub fn rsi_from_closes(closes: &[f64], window: usize) -> Value {
    if window == 0 || closes.len() < window + 1 {
        return Value::Unavailable;
    }

    let mut changes = closes.windows(2).map(|w| w[1] - w[0]);

    let mut avg_gain = 0.0;
    let mut avg_loss = 0.0;
    for ch in changes.by_ref().take(window) {
        avg_gain += ch.max(0.0);
        avg_loss += (-ch).max(0.0);
    }
    let n = window as f64;
    avg_gain /= n;
    avg_loss /= n;

    for ch in changes {
        avg_gain = (avg_gain * (n - 1.0) + ch.max(0.0)) / n;
        avg_loss = (avg_loss * (n - 1.0) + (-ch).max(0.0)) / n;
    }

    rsi_value(avg_gain, avg_loss)
}

fn rsi_value(avg_gain: f64, avg_loss: f64) -> Value {
    if avg_loss == 0.0 {
        // No losses at all: saturated if anything was gained, otherwise undefined.
        return if avg_gain > 0.0 {
            Value::Number(100.0)
        } else {
            Value::Unavailable
        };
    }
    let rs = avg_gain / avg_loss;
    Value::from_f64(100.0 - 100.0 / (1.0 + rs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_bars};

    fn value(v: Value) -> f64 {
        v.as_f64().expect("expected a number")
    }

    #[test]
    fn rsi_short_series_unavailable() {
        let bars = make_bars(&[100.0, 101.0, 99.0]);
        assert_eq!(rsi(&bars, 3), Value::Unavailable);
        assert_eq!(rsi(&[], 14), Value::Unavailable);
    }

    #[test]
    fn rsi_window_plus_one_is_finite() {
        let bars = make_bars(&[44.0, 44.34, 44.09, 43.61]);
        let v = value(rsi(&bars, 3));
        // gains 0.34, losses 0.25 + 0.48
        assert_approx(v, 100.0 - 100.0 / (1.0 + 0.34 / 0.73), 1e-9);
    }

    #[test]
    fn rsi_all_gains_is_100() {
        let closes: Vec<f64> = (0..20).map(|i| 100.0 + i as f64).collect();
        let bars = make_bars(&closes);
        assert_eq!(rsi(&bars, 14), Value::Number(100.0));
        assert_eq!(previous_rsi(&bars, 14), Value::Number(100.0));
    }

    #[test]
    fn rsi_all_losses_is_0() {
        let bars = make_bars(&[105.0, 104.0, 103.0, 102.0, 101.0, 100.0]);
        assert_approx(value(rsi(&bars, 3)), 0.0, 1e-12);
    }

    #[test]
    fn rsi_flat_series_unavailable() {
        let bars = make_bars(&[50.0; 10]);
        assert_eq!(rsi(&bars, 3), Value::Unavailable);
    }

    #[test]
    fn rsi_wilder_recurrence() {
        // window=2: changes +2, -1, +3
        // seed: g = 1.0, l = 0.5
        // next: g = (1.0 + 3) / 2 = 2.0, l = (0.5 + 0) / 2 = 0.25
        let bars = make_bars(&[10.0, 12.0, 11.0, 14.0]);
        let expected = 100.0 - 100.0 / (1.0 + 2.0 / 0.25);
        assert_approx(value(rsi(&bars, 2)), expected, 1e-12);
    }

    #[test]
    fn rsi_skips_missing_closes() {
        let mut bars = make_bars(&[10.0, 12.0, 0.0, 11.0, 14.0]);
        bars[2].close = None;
        let expected = rsi(&make_bars(&[10.0, 12.0, 11.0, 14.0]), 2);
        assert_eq!(rsi(&bars, 2), expected);
    }

    #[test]
    fn previous_rsi_drops_last_bar() {
        let closes = [10.0, 12.0, 11.0, 14.0, 9.0];
        let bars = make_bars(&closes);
        assert_eq!(previous_rsi(&bars, 2), rsi(&bars[..4], 2));
        assert_eq!(previous_rsi(&[], 2), Value::Unavailable);
    }

    #[test]
    fn rsi_zero_window_unavailable() {
        let bars = make_bars(&[1.0, 2.0, 3.0]);
        assert_eq!(rsi(&bars, 0), Value::Unavailable);
    }
}
