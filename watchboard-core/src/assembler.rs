//! Category assembly: watchlist constituents → fetched series → ordered records.
//!
//! The assembler owns nothing between calls. It resolves a category's
//! constituents, fetches daily and intraday bars in batches plus per-symbol
//! fundamentals, runs the indicator engine and hands back one sorted list.
//!
//! Failure isolation:
//! - rate limiting anywhere aborts the build (`AssembleError::RateLimited`)
//! - any other per-symbol failure degrades that symbol to unavailable values

use crate::config::ProviderSettings;
use crate::data::{BarBatch, Constituent, DataError, Fundamentals, Lookback, SeriesProvider, Watchlist};
use crate::domain::{Bar, CategoryRecord, Interval, SortPolicy, Value, EARNINGS_TBA};
use crate::indicators::{self, IndicatorSettings};
use chrono::{DateTime, Timelike};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

const MISSING_NAME: &str = "Unknown";
const MARKET_CAP_UNIT: f64 = 1.0e6;

#[derive(Debug, Clone, Error)]
pub enum AssembleError {
    #[error("rate limited while building {category}: {source}")]
    RateLimited {
        category: String,
        #[source]
        source: DataError,
    },
}

impl AssembleError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, AssembleError::RateLimited { .. })
    }
}

/// Day-over-day movement between the two most recent defined closes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceDelta {
    pub change: Value,
    pub percent: Value,
    /// At least one bar with an absent close was skipped.
    pub data_gap: bool,
}

/// Compute the latest delta, walking backward over bars without a close.
pub fn price_delta(bars: &[Bar]) -> PriceDelta {
    let mut data_gap = false;
    let mut defined = Vec::with_capacity(2);
    for bar in bars.iter().rev() {
        match bar.close {
            Some(close) => {
                defined.push(close);
                if defined.len() == 2 {
                    break;
                }
            }
            None => data_gap = true,
        }
    }

    match defined.as_slice() {
        [latest, previous] => {
            let change = latest - previous;
            let percent = if *previous == 0.0 {
                Value::Unavailable
            } else {
                Value::from_f64(change / previous * 100.0)
            };
            PriceDelta {
                change: Value::from_f64(change),
                percent,
                data_gap,
            }
        }
        _ => PriceDelta {
            change: Value::Unavailable,
            percent: Value::Unavailable,
            data_gap,
        },
    }
}

/// Earnings date (`MM-DD-YYYY`) and timing for an announcement timestamp.
///
/// Timing is judged in US/Central: before noon is `BMO`, otherwise `AMC`.
pub fn earnings_fields(timestamp: Option<i64>) -> (Option<String>, String) {
    let Some(at) = timestamp.and_then(|ts| DateTime::from_timestamp(ts, 0)) else {
        return (None, EARNINGS_TBA.to_string());
    };
    let local = at.with_timezone(&chrono_tz::US::Central);
    let timing = if local.hour() < 12 { "BMO" } else { "AMC" };
    (Some(local.format("%m-%d-%Y").to_string()), timing.to_string())
}

/// Builds category lists from a provider.
pub struct CategoryAssembler {
    provider: Arc<dyn SeriesProvider>,
    indicators: IndicatorSettings,
    settings: ProviderSettings,
}

impl CategoryAssembler {
    pub fn new(
        provider: Arc<dyn SeriesProvider>,
        indicators: IndicatorSettings,
        settings: ProviderSettings,
    ) -> Self {
        Self {
            provider,
            indicators,
            settings,
        }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Build the ordered record list for `category`.
    pub fn build(
        &self,
        category: &str,
        watchlist: &Watchlist,
    ) -> Result<Vec<CategoryRecord>, AssembleError> {
        let constituents = watchlist.constituents(category);
        if constituents.is_empty() {
            debug!(category, "no constituents");
            return Ok(Vec::new());
        }

        let rate_limited = |source: DataError| AssembleError::RateLimited {
            category: category.to_string(),
            source,
        };

        let symbols: Vec<String> = constituents.iter().map(|c| c.symbol.clone()).collect();
        let daily = self
            .fetch_bars(&symbols, Interval::Daily, self.settings.daily_lookback())
            .map_err(rate_limited)?;
        let intraday = self
            .fetch_bars(
                &symbols,
                self.settings.intraday_interval,
                self.settings.intraday_lookback(),
            )
            .map_err(rate_limited)?;

        let mut records = Vec::with_capacity(constituents.len());
        for constituent in &constituents {
            let fundamentals = match self.provider.fundamentals(&constituent.symbol) {
                Ok(f) => f,
                Err(e) if e.is_rate_limited() => return Err(rate_limited(e)),
                Err(e) => {
                    warn!(symbol = %constituent.symbol, error = %e, "fundamentals unavailable, using placeholders");
                    Fundamentals::default()
                }
            };
            let daily_bars = daily.get(&constituent.symbol).map(Vec::as_slice).unwrap_or_default();
            let intraday_bars = intraday
                .get(&constituent.symbol)
                .map(Vec::as_slice)
                .unwrap_or_default();
            records.push(self.record(constituent, daily_bars, intraday_bars, &fundamentals));
        }

        SortPolicy::for_category(category).sort(&mut records);
        info!(category, records = records.len(), "category built");
        Ok(records)
    }

    /// Fetch one interval for every symbol, `batch_size` symbols per request.
    ///
    /// Only rate limiting is an error; failed symbols are simply absent.
    fn fetch_bars(
        &self,
        symbols: &[String],
        interval: Interval,
        lookback: Lookback,
    ) -> Result<BTreeMap<String, Vec<Bar>>, DataError> {
        let mut out = BTreeMap::new();
        for chunk in symbols.chunks(self.settings.batch_size.max(1)) {
            let batch: BarBatch = match self.provider.bars(chunk, interval, lookback) {
                Ok(batch) => batch,
                Err(e) if e.is_rate_limited() => return Err(e),
                Err(e) => {
                    warn!(%interval, symbols = chunk.len(), error = %e, "bar batch failed");
                    continue;
                }
            };
            for (symbol, result) in batch {
                match result {
                    Ok(bars) => {
                        out.insert(symbol, Bar::canonicalize(bars));
                    }
                    Err(e) if e.is_rate_limited() => return Err(e),
                    Err(e) => warn!(%symbol, %interval, error = %e, "no bars"),
                }
            }
        }
        Ok(out)
    }

    fn record(
        &self,
        constituent: &Constituent,
        daily: &[Bar],
        intraday: &[Bar],
        fundamentals: &Fundamentals,
    ) -> CategoryRecord {
        let latest = daily.iter().rev().find(|b| b.close.is_some());
        let delta = price_delta(daily);
        let (earnings_date, earnings_timing) = earnings_fields(fundamentals.earnings_timestamp);

        let name = fundamentals
            .long_name
            .clone()
            .or_else(|| constituent.name.clone())
            .unwrap_or_else(|| MISSING_NAME.to_string());

        CategoryRecord {
            symbol: constituent.symbol.clone(),
            name,
            open: Value::from_option(latest.and_then(|b| b.open)),
            high: Value::from_option(latest.and_then(|b| b.high)),
            low: Value::from_option(latest.and_then(|b| b.low)),
            close: Value::from_option(latest.and_then(|b| b.close)),
            price_change: delta.change,
            percent_change: delta.percent,
            data_gap: delta.data_gap,
            indicators: indicators::compute(daily, intraday, &self.indicators),
            market_cap: Value::from_option(fundamentals.market_cap).map(|cap| cap / MARKET_CAP_UNIT),
            trailing_pe: Value::from_option(fundamentals.trailing_pe),
            forward_pe: Value::from_option(fundamentals.forward_pe),
            ev_to_ebitda: Value::from_option(fundamentals.ev_to_ebitda),
            fifty_two_week_high: Value::from_option(fundamentals.fifty_two_week_high),
            fifty_two_week_low: Value::from_option(fundamentals.fifty_two_week_low),
            description: fundamentals.description.clone(),
            exchange: fundamentals.exchange.clone(),
            earnings_date,
            earnings_timing,
            flag: constituent.flag,
            category: constituent.category.clone(),
            industry: Some(constituent.industry.clone()),
            stock_url: constituent.stock_url.clone(),
        }
    }
}
