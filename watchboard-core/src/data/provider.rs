//! Series provider trait and structured error types.
//!
//! The `SeriesProvider` trait abstracts over market-data sources so the
//! assembler can be driven by Yahoo Finance in production and by an
//! in-memory mock in tests.

use crate::domain::{Bar, Interval};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Structured error types for provider operations.
///
/// `RateLimited` is kept distinct from every "no data" variant so the
/// refresh driver can abort a cycle instead of publishing a thin snapshot.
#[derive(Debug, Clone, Error)]
pub enum DataError {
    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("authentication required: {0}")]
    AuthenticationRequired(String),

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("data error: {0}")]
    Other(String),
}

impl DataError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, DataError::RateLimited { .. })
    }
}

/// How far back a bar request reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lookback {
    pub days: u32,
}

impl Lookback {
    pub fn days(days: u32) -> Self {
        Self { days }
    }
}

/// Per-symbol outcome of a batched bar request.
pub type BarBatch = BTreeMap<String, Result<Vec<Bar>, DataError>>;

/// Scalar fundamentals for one symbol, as reported upstream.
///
/// Values are raw: market cap is in currency units and may be NaN. The
/// assembler normalizes them before they reach a record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Fundamentals {
    pub long_name: Option<String>,
    pub market_cap: Option<f64>,
    pub trailing_pe: Option<f64>,
    pub forward_pe: Option<f64>,
    pub ev_to_ebitda: Option<f64>,
    pub fifty_two_week_high: Option<f64>,
    pub fifty_two_week_low: Option<f64>,
    pub description: Option<String>,
    pub exchange: Option<String>,
    /// Next earnings announcement, seconds since the Unix epoch.
    pub earnings_timestamp: Option<i64>,
}

/// Trait for market-data providers.
///
/// Implementations own their transport, timeout, and retry policy. They must
/// report rate limiting as `DataError::RateLimited` and never retry it
/// silently past their own budget.
pub trait SeriesProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Fetch bars for a batch of symbols.
    ///
    /// The outer error aborts the whole batch (e.g. rate limiting); inner
    /// errors are per symbol. Every returned series is canonical: ascending
    /// by timestamp with no duplicates.
    fn bars(
        &self,
        symbols: &[String],
        interval: Interval,
        lookback: Lookback,
    ) -> Result<BarBatch, DataError>;

    /// Fetch fundamentals for one symbol.
    fn fundamentals(&self, symbol: &str) -> Result<Fundamentals, DataError>;
}
