//! Yahoo Finance series provider.
//!
//! Bars come from the v8 chart API, fundamentals from the v10 quoteSummary
//! API. Connection failures and timeouts are retried with exponential
//! backoff; HTTP 429 is surfaced immediately as `DataError::RateLimited` so
//! the refresh driver decides what to do with the cycle.
//!
//! Yahoo Finance has no official API and is subject to unannounced format changes.

use super::provider::{BarBatch, DataError, Fundamentals, Lookback, SeriesProvider};
use crate::config::ProviderSettings;
use crate::domain::{Bar, Interval};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

const CHART_BASE: &str = "https://query2.finance.yahoo.com/v8/finance/chart";
const SUMMARY_BASE: &str = "https://query2.finance.yahoo.com/v10/finance/quoteSummary";
const SUMMARY_MODULES: &str =
    "price,summaryDetail,defaultKeyStatistics,assetProfile,calendarEvents";

// ── Chart API response ──────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    timestamp: Option<Vec<i64>>,
    indicators: ChartIndicators,
}

#[derive(Debug, Deserialize)]
struct ChartIndicators {
    quote: Vec<QuoteData>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
}

// ── quoteSummary API response ───────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SummaryResponse {
    quote_summary: SummaryResult,
}

#[derive(Debug, Deserialize)]
struct SummaryResult {
    result: Option<Vec<SummaryData>>,
    error: Option<ApiError>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct SummaryData {
    price: PriceModule,
    summary_detail: SummaryDetail,
    default_key_statistics: KeyStatistics,
    asset_profile: AssetProfile,
    calendar_events: CalendarEvents,
}

/// Yahoo wraps numbers as `{"raw": 1.0, "fmt": "1.00"}`, or `{}` when absent.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawNumber {
    raw: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct PriceModule {
    long_name: Option<String>,
    market_cap: RawNumber,
    exchange_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct SummaryDetail {
    #[serde(rename = "trailingPE")]
    trailing_pe: RawNumber,
    #[serde(rename = "forwardPE")]
    forward_pe: RawNumber,
    fifty_two_week_high: RawNumber,
    fifty_two_week_low: RawNumber,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct KeyStatistics {
    enterprise_to_ebitda: RawNumber,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct AssetProfile {
    long_business_summary: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CalendarEvents {
    earnings: EarningsEvents,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct EarningsEvents {
    earnings_date: Vec<RawNumber>,
}

// ── Provider ────────────────────────────────────────────────────────

/// Yahoo Finance series provider.
pub struct YahooProvider {
    client: reqwest::blocking::Client,
    max_retries: u32,
    base_delay: Duration,
}

impl YahooProvider {
    pub fn new(settings: &ProviderSettings) -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()
            .map_err(|e| DataError::Other(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            max_retries: settings.max_retries,
            base_delay: Duration::from_millis(settings.retry_base_delay_ms),
        })
    }

    /// Build the chart API URL for a symbol, interval and lookback ending now.
    fn chart_url(symbol: &str, interval: Interval, lookback: Lookback, now: DateTime<Utc>) -> String {
        let end_ts = now.timestamp();
        let start_ts = end_ts - i64::from(lookback.days) * 86_400;
        format!(
            "{CHART_BASE}/{symbol}?period1={start_ts}&period2={end_ts}&interval={interval}\
             &includePrePost=false"
        )
    }

    fn summary_url(symbol: &str) -> String {
        format!("{SUMMARY_BASE}/{symbol}?modules={SUMMARY_MODULES}")
    }

    /// Parse the chart API response into canonical bars.
    fn parse_chart(symbol: &str, resp: ChartResponse) -> Result<Vec<Bar>, DataError> {
        let result = resp.chart.result.ok_or_else(|| api_error(symbol, resp.chart.error))?;

        let data = result
            .into_iter()
            .next()
            .ok_or_else(|| DataError::ResponseFormatChanged("result array is empty".into()))?;

        // A symbol with no trades in the window has no timestamp array at all.
        let timestamps = data.timestamp.unwrap_or_default();

        let quote = data
            .indicators
            .quote
            .into_iter()
            .next()
            .ok_or_else(|| DataError::ResponseFormatChanged("no quote data".into()))?;

        let mut bars = Vec::with_capacity(timestamps.len());
        for (i, &ts) in timestamps.iter().enumerate() {
            let timestamp = DateTime::from_timestamp(ts, 0).ok_or_else(|| {
                DataError::ResponseFormatChanged(format!("invalid timestamp: {ts}"))
            })?;
            let at = |v: &[Option<f64>]| v.get(i).copied().flatten();
            let bar = Bar::new(
                timestamp,
                at(&quote.open),
                at(&quote.high),
                at(&quote.low),
                at(&quote.close),
            );
            // Rows with no prices at all are holidays/non-trading slots.
            if !bar.is_void() {
                bars.push(bar);
            }
        }

        Ok(Bar::canonicalize(bars))
    }

    fn parse_summary(symbol: &str, resp: SummaryResponse) -> Result<Fundamentals, DataError> {
        let result = resp
            .quote_summary
            .result
            .ok_or_else(|| api_error(symbol, resp.quote_summary.error))?;
        let data = result
            .into_iter()
            .next()
            .ok_or_else(|| DataError::ResponseFormatChanged("result array is empty".into()))?;

        Ok(Fundamentals {
            long_name: data.price.long_name,
            market_cap: data.price.market_cap.raw,
            trailing_pe: data.summary_detail.trailing_pe.raw,
            forward_pe: data.summary_detail.forward_pe.raw,
            ev_to_ebitda: data.default_key_statistics.enterprise_to_ebitda.raw,
            fifty_two_week_high: data.summary_detail.fifty_two_week_high.raw,
            fifty_two_week_low: data.summary_detail.fifty_two_week_low.raw,
            description: data.asset_profile.long_business_summary,
            exchange: data.price.exchange_name,
            earnings_timestamp: data
                .calendar_events
                .earnings
                .earnings_date
                .first()
                .and_then(|d| d.raw)
                .map(|ts| ts as i64),
        })
    }

    /// Execute a GET with retry on connection failures and timeouts.
    ///
    /// Rate limiting is returned on first sight, never retried here.
    fn get_json<T: DeserializeOwned>(&self, symbol: &str, url: &str) -> Result<T, DataError> {
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = self.base_delay * 2u32.pow(attempt - 1);
                debug!(symbol, attempt, ?delay, "retrying request");
                std::thread::sleep(delay);
            }

            match self.client.get(url).send() {
                Ok(resp) => {
                    let status = resp.status();

                    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                        let retry_after = resp
                            .headers()
                            .get("retry-after")
                            .and_then(|v| v.to_str().ok())
                            .and_then(|v| v.parse::<u64>().ok())
                            .unwrap_or(60);
                        return Err(DataError::RateLimited {
                            retry_after_secs: retry_after,
                        });
                    }

                    if status == reqwest::StatusCode::UNAUTHORIZED
                        || status == reqwest::StatusCode::FORBIDDEN
                    {
                        return Err(DataError::AuthenticationRequired(format!(
                            "HTTP {status} for {symbol}"
                        )));
                    }

                    if status == reqwest::StatusCode::NOT_FOUND {
                        return Err(DataError::SymbolNotFound {
                            symbol: symbol.to_string(),
                        });
                    }

                    if status.is_server_error() {
                        last_error = Some(DataError::Other(format!("HTTP {status} for {symbol}")));
                        continue;
                    }

                    if !status.is_success() {
                        return Err(DataError::Other(format!("HTTP {status} for {symbol}")));
                    }

                    return resp.json::<T>().map_err(|e| {
                        DataError::ResponseFormatChanged(format!(
                            "failed to parse response for {symbol}: {e}"
                        ))
                    });
                }
                Err(e) => {
                    if e.is_connect() || e.is_timeout() {
                        last_error = Some(DataError::NetworkUnreachable(e.to_string()));
                        continue;
                    }
                    return Err(DataError::NetworkUnreachable(e.to_string()));
                }
            }
        }

        Err(last_error.unwrap_or_else(|| DataError::Other("max retries exceeded".into())))
    }

    fn fetch_bars(
        &self,
        symbol: &str,
        interval: Interval,
        lookback: Lookback,
    ) -> Result<Vec<Bar>, DataError> {
        let url = Self::chart_url(symbol, interval, lookback, Utc::now());
        let chart: ChartResponse = self.get_json(symbol, &url)?;
        Self::parse_chart(symbol, chart)
    }
}

fn api_error(symbol: &str, error: Option<ApiError>) -> DataError {
    match error {
        Some(err) if err.code == "Not Found" => DataError::SymbolNotFound {
            symbol: symbol.to_string(),
        },
        Some(err) => DataError::ResponseFormatChanged(format!("{}: {}", err.code, err.description)),
        None => DataError::ResponseFormatChanged("empty result with no error".into()),
    }
}

impl SeriesProvider for YahooProvider {
    fn name(&self) -> &str {
        "yahoo_finance"
    }

    fn bars(
        &self,
        symbols: &[String],
        interval: Interval,
        lookback: Lookback,
    ) -> Result<BarBatch, DataError> {
        let mut batch = BarBatch::new();
        for symbol in symbols {
            match self.fetch_bars(symbol, interval, lookback) {
                Err(e) if e.is_rate_limited() => return Err(e),
                Err(e) => {
                    warn!(%symbol, %interval, error = %e, "bar fetch failed");
                    batch.insert(symbol.clone(), Err(e));
                }
                Ok(bars) => {
                    batch.insert(symbol.clone(), Ok(bars));
                }
            }
        }
        Ok(batch)
    }

    fn fundamentals(&self, symbol: &str) -> Result<Fundamentals, DataError> {
        let summary: SummaryResponse = self.get_json(symbol, &Self::summary_url(symbol))?;
        Self::parse_summary(symbol, summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn chart_url_spans_lookback() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let url = YahooProvider::chart_url("SPY", Interval::Hourly, Lookback::days(2), now);
        let end = now.timestamp();
        assert!(url.starts_with(CHART_BASE));
        assert!(url.contains(&format!("period1={}", end - 2 * 86_400)));
        assert!(url.contains(&format!("period2={end}")));
        assert!(url.contains("interval=1h"));
    }

    #[test]
    fn parse_chart_skips_void_rows_and_keeps_gaps() {
        let json = r#"{"chart":{"result":[{
            "timestamp":[1704204000,1704290400,1704376800,1704463200],
            "indicators":{"quote":[{
                "open":[1.0,null,3.0,4.0],
                "high":[1.5,null,3.5,4.5],
                "low":[0.5,null,2.5,3.5],
                "close":[1.2,null,null,4.2]
            }]}
        }],"error":null}}"#;
        let resp: ChartResponse = serde_json::from_str(json).unwrap();
        let bars = YahooProvider::parse_chart("SPY", resp).unwrap();
        assert_eq!(bars.len(), 3);
        assert_eq!(bars[1].close, None);
        assert_eq!(bars[1].open, Some(3.0));
        assert_eq!(bars[2].close, Some(4.2));
    }

    #[test]
    fn parse_chart_not_found() {
        let json = r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#;
        let resp: ChartResponse = serde_json::from_str(json).unwrap();
        let err = YahooProvider::parse_chart("NOPE", resp).unwrap_err();
        assert!(matches!(err, DataError::SymbolNotFound { .. }));
    }

    #[test]
    fn parse_summary_reads_raw_numbers() {
        let json = r#"{"quoteSummary":{"result":[{
            "price":{"longName":"Apple Inc.","marketCap":{"raw":3.0e12,"fmt":"3T"},"exchangeName":"NasdaqGS"},
            "summaryDetail":{"trailingPE":{"raw":30.5},"forwardPE":{},"fiftyTwoWeekHigh":{"raw":200.0},"fiftyTwoWeekLow":{"raw":150.0}},
            "defaultKeyStatistics":{"enterpriseToEbitda":{"raw":22.1}},
            "assetProfile":{"longBusinessSummary":"Makes phones."},
            "calendarEvents":{"earnings":{"earningsDate":[{"raw":1706731200}]}}
        }],"error":null}}"#;
        let resp: SummaryResponse = serde_json::from_str(json).unwrap();
        let f = YahooProvider::parse_summary("AAPL", resp).unwrap();
        assert_eq!(f.long_name.as_deref(), Some("Apple Inc."));
        assert_eq!(f.market_cap, Some(3.0e12));
        assert_eq!(f.trailing_pe, Some(30.5));
        assert_eq!(f.forward_pe, None);
        assert_eq!(f.ev_to_ebitda, Some(22.1));
        assert_eq!(f.earnings_timestamp, Some(1_706_731_200));
        assert_eq!(f.exchange.as_deref(), Some("NasdaqGS"));
    }

    #[test]
    fn parse_summary_tolerates_missing_modules() {
        let json = r#"{"quoteSummary":{"result":[{"price":{"longName":"Fund"}}],"error":null}}"#;
        let resp: SummaryResponse = serde_json::from_str(json).unwrap();
        let f = YahooProvider::parse_summary("FND", resp).unwrap();
        assert_eq!(f.long_name.as_deref(), Some("Fund"));
        assert_eq!(f.market_cap, None);
        assert_eq!(f.earnings_timestamp, None);
    }
}
