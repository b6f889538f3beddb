//! Per-instrument dashboard rows and the category sort policy.
//!
//! Field names on the wire match the dashboard front end, which reads the
//! persisted cache document directly.

use super::value::Value;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// The pseudo-category holding every owned (flagged) instrument.
pub const OWNED_CATEGORY: &str = "Owned";

/// Indicator readings for one symbol. Unavailable readings stay unavailable.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorResult {
    #[serde(rename = "RSI14")]
    pub rsi: Value,
    /// RSI as of the previous daily bar.
    #[serde(rename = "yRSI")]
    pub y_rsi: Value,
    #[serde(rename = "RSI_intraday")]
    pub rsi_intraday: Value,
    #[serde(rename = "ATR")]
    pub atr: Value,
    #[serde(rename = "ATR_percent")]
    pub atr_percent: Value,
}

impl IndicatorResult {
    /// All five readings as `(name, value)` pairs, in display order.
    pub fn entries(&self) -> [(&'static str, Value); 5] {
        [
            ("RSI14", self.rsi),
            ("yRSI", self.y_rsi),
            ("RSI_intraday", self.rsi_intraday),
            ("ATR", self.atr),
            ("ATR_percent", self.atr_percent),
        ]
    }
}

/// One row of a category list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryRecord {
    #[serde(rename = "Symbol")]
    pub symbol: String,
    #[serde(rename = "Name")]
    pub name: String,

    #[serde(rename = "Open", default)]
    pub open: Value,
    #[serde(rename = "High", default)]
    pub high: Value,
    #[serde(rename = "Low", default)]
    pub low: Value,
    #[serde(rename = "Close", default)]
    pub close: Value,
    #[serde(rename = "Price Change", default)]
    pub price_change: Value,
    #[serde(rename = "Percent Change", default)]
    pub percent_change: Value,
    /// The delta was computed across one or more bars with a missing close.
    #[serde(default)]
    pub data_gap: bool,

    #[serde(flatten)]
    pub indicators: IndicatorResult,

    /// Market capitalization in millions.
    #[serde(rename = "Market Cap", default)]
    pub market_cap: Value,
    #[serde(rename = "Trailing PE", default)]
    pub trailing_pe: Value,
    #[serde(rename = "Forward PE", default)]
    pub forward_pe: Value,
    #[serde(rename = "EV/EBITDA", default)]
    pub ev_to_ebitda: Value,
    #[serde(rename = "fiftyTwoWeekHigh", default)]
    pub fifty_two_week_high: Value,
    #[serde(rename = "fiftyTwoWeekLow", default)]
    pub fifty_two_week_low: Value,
    #[serde(rename = "stock_description", default)]
    pub description: Option<String>,
    #[serde(rename = "exchangeName", default)]
    pub exchange: Option<String>,
    #[serde(rename = "earningsDate", default)]
    pub earnings_date: Option<String>,
    #[serde(rename = "earningsTiming", default = "default_earnings_timing")]
    pub earnings_timing: String,

    #[serde(default)]
    pub flag: bool,
    pub category: String,
    #[serde(default)]
    pub industry: Option<String>,
    #[serde(rename = "stockUrl", default)]
    pub stock_url: Option<String>,
}

fn default_earnings_timing() -> String {
    EARNINGS_TBA.to_string()
}

/// Earnings timing when no announcement date is known.
pub const EARNINGS_TBA: &str = "TBA";

/// How a category list is ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortPolicy {
    /// Case-insensitive symbol order.
    Alphabetical,
    /// Market cap descending, unavailable caps last, ties by symbol.
    MarketCapDesc,
}

impl SortPolicy {
    pub fn for_category(category: &str) -> Self {
        if category == OWNED_CATEGORY {
            SortPolicy::Alphabetical
        } else {
            SortPolicy::MarketCapDesc
        }
    }

    pub fn compare(&self, a: &CategoryRecord, b: &CategoryRecord) -> Ordering {
        match self {
            SortPolicy::Alphabetical => symbol_key(&a.symbol)
                .cmp(&symbol_key(&b.symbol))
                .then_with(|| a.symbol.cmp(&b.symbol)),
            SortPolicy::MarketCapDesc => b
                .market_cap
                .total_cmp(&a.market_cap)
                .then_with(|| a.symbol.cmp(&b.symbol)),
        }
    }

    pub fn sort(&self, records: &mut [CategoryRecord]) {
        records.sort_by(|a, b| self.compare(a, b));
    }
}

fn symbol_key(symbol: &str) -> String {
    symbol.trim().to_lowercase()
}

#[cfg(test)]
pub(crate) fn sample_record(symbol: &str, market_cap: Value) -> CategoryRecord {
    CategoryRecord {
        symbol: symbol.to_string(),
        name: format!("{symbol} Inc."),
        open: Value::Unavailable,
        high: Value::Unavailable,
        low: Value::Unavailable,
        close: Value::Unavailable,
        price_change: Value::Unavailable,
        percent_change: Value::Unavailable,
        data_gap: false,
        indicators: IndicatorResult::default(),
        market_cap,
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
        category: "Tech".to_string(),
        industry: None,
        stock_url: None,
    }
}
