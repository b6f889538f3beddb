//! One sampling interval of an instrument's trading activity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// OHLC bar. Any price may be absent; live prices are always finite.
///
/// Providers fill gaps with `None` instead of NaN so that indicator code can
/// tell a missing session apart from a real value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
}

impl Bar {
    /// Build a bar, dropping any non-finite price to `None`.
    pub fn new(
        timestamp: DateTime<Utc>,
        open: Option<f64>,
        high: Option<f64>,
        low: Option<f64>,
        close: Option<f64>,
    ) -> Self {
        let finite = |v: Option<f64>| v.filter(|x| x.is_finite());
        Self {
            timestamp,
            open: finite(open),
            high: finite(high),
            low: finite(low),
            close: finite(close),
        }
    }

    /// True when every price is absent (a holiday row from the provider).
    pub fn is_void(&self) -> bool {
        self.open.is_none() && self.high.is_none() && self.low.is_none() && self.close.is_none()
    }

    /// Sort ascending by timestamp and drop duplicate timestamps, keeping
    /// the first occurrence. Gaps are left as they are.
    pub fn canonicalize(mut bars: Vec<Bar>) -> Vec<Bar> {
        bars.sort_by_key(|b| b.timestamp);
        bars.dedup_by_key(|b| b.timestamp);
        bars
    }
}

/// Sampling granularity of a bar series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Interval {
    #[serde(rename = "1d")]
    Daily,
    #[serde(rename = "1h")]
    Hourly,
    #[serde(rename = "30m")]
    ThirtyMinutes,
    #[serde(rename = "15m")]
    FifteenMinutes,
}

impl Interval {
    pub fn as_str(&self) -> &'static str {
        match self {
            Interval::Daily => "1d",
            Interval::Hourly => "1h",
            Interval::ThirtyMinutes => "30m",
            Interval::FifteenMinutes => "15m",
        }
    }
}

impl std::fmt::Display for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
