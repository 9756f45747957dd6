//! Yahoo Finance live feed.
//!
//! Fetches daily bars from Yahoo's v8 chart API starting at the cut-over date.
//! Handles rate limiting, retries with exponential backoff, response parsing,
//! and the circuit breaker. The result is handed on as a raw
//! `Date, Open, High, Low, Close, Volume` table, the same shape as any other
//! source, so normalization treats it no differently.

use super::circuit_breaker::CircuitBreaker;
use super::provider::{DataError, SourceProvider};
use super::table::RawTable;
use crate::domain::SourceTag;
use chrono::NaiveDate;
use reqwest::StatusCode;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

/// Yahoo Finance v8 chart API response.
#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    meta: Option<ChartMeta>,
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct ChartMeta {
    /// Exchange offset from UTC in seconds (19800 for IST).
    gmtoffset: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
}

/// A window with no trading days comes back as `"quote":[{}]`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct QuoteData {
    open: Vec<Option<f64>>,
    high: Vec<Option<f64>>,
    low: Vec<Option<f64>>,
    close: Vec<Option<f64>>,
    volume: Vec<Option<u64>>,
}

const LIVE_HEADERS: [&str; 6] = ["Date", "Open", "High", "Low", "Close", "Volume"];

/// Live daily quotes for one symbol, from `start` up to (excluding) `end`.
pub struct YahooProvider {
    client: reqwest::blocking::Client,
    circuit_breaker: Arc<CircuitBreaker>,
    symbol: String,
    start: NaiveDate,
    end: Option<NaiveDate>,
    max_retries: u32,
    base_delay: Duration,
}

impl YahooProvider {
    pub fn new(
        circuit_breaker: Arc<CircuitBreaker>,
        symbol: impl Into<String>,
        start: NaiveDate,
    ) -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()
            .map_err(|e| DataError::Other(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            circuit_breaker,
            symbol: symbol.into(),
            start,
            end: None,
            max_retries: 3,
            base_delay: Duration::from_millis(500),
        })
    }

    /// Exclusive end date; defaults to today.
    pub fn with_end(mut self, end: NaiveDate) -> Self {
        self.end = Some(end);
        self
    }

    /// Build the chart API URL for a symbol and date range.
    fn chart_url(symbol: &str, start: NaiveDate, end: NaiveDate) -> String {
        let start_ts = start.and_time(chrono::NaiveTime::MIN).and_utc().timestamp();
        let end_ts = end.and_time(chrono::NaiveTime::MIN).and_utc().timestamp();
        let encoded = symbol.replace('^', "%5E");
        format!(
            "https://query2.finance.yahoo.com/v8/finance/chart/{encoded}\
             ?period1={start_ts}&period2={end_ts}&interval=1d"
        )
    }

    /// Parse the chart API response into a raw table.
    ///
    /// An empty range is not an error: the table just has no rows.
    fn parse_response(symbol: &str, resp: ChartResponse) -> Result<RawTable, DataError> {
        let result = resp.chart.result.ok_or_else(|| match resp.chart.error {
            Some(err) if err.code == "Not Found" => DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            },
            Some(err) => {
                DataError::ResponseFormatChanged(format!("{}: {}", err.code, err.description))
            }
            None => DataError::ResponseFormatChanged("empty result with no error".into()),
        })?;

        let headers: Vec<String> = LIVE_HEADERS.iter().map(|h| h.to_string()).collect();

        let Some(data) = result.into_iter().next() else {
            return Ok(RawTable::new(headers, Vec::new()));
        };
        let Some(timestamps) = data.timestamp else {
            return Ok(RawTable::new(headers, Vec::new()));
        };

        let quote = data
            .indicators
            .quote
            .into_iter()
            .next()
            .ok_or_else(|| DataError::ResponseFormatChanged("no quote data".into()))?;

        let offset = data.meta.and_then(|m| m.gmtoffset).unwrap_or(0);
        let mut rows = Vec::with_capacity(timestamps.len());

        for (i, &ts) in timestamps.iter().enumerate() {
            // Exchange-local calendar date of the bar.
            let date = chrono::DateTime::from_timestamp(ts + offset, 0)
                .map(|dt| dt.date_naive())
                .ok_or_else(|| {
                    DataError::ResponseFormatChanged(format!("invalid timestamp: {ts}"))
                })?;

            let at = |col: &[Option<f64>]| col.get(i).copied().flatten();
            let (open, high, low, close) = (at(&quote.open), at(&quote.high), at(&quote.low), at(&quote.close));
            let volume = quote.volume.get(i).copied().flatten();

            // Non-trading days come back as all-null bars.
            if [open, high, low, close].iter().all(Option::is_none) && volume.is_none() {
                continue;
            }

            let cell = |v: Option<f64>| v.map(|x| x.to_string()).unwrap_or_default();
            rows.push(vec![
                date.format("%Y-%m-%d").to_string(),
                cell(open),
                cell(high),
                cell(low),
                cell(close),
                volume.map(|v| v.to_string()).unwrap_or_default(),
            ]);
        }

        Ok(RawTable::new(headers, rows))
    }

    fn end_date(&self) -> NaiveDate {
        self.end.unwrap_or_else(|| chrono::Local::now().date_naive())
    }

    /// One HTTP round trip, classified for the retry loop.
    fn attempt(&self, url: &str) -> Attempt {
        let resp = match self.client.get(url).send() {
            Ok(resp) => resp,
            Err(e) if e.is_connect() || e.is_timeout() => {
                return Attempt::Retry(DataError::NetworkUnreachable(e.to_string()))
            }
            Err(e) => return Attempt::Fatal(DataError::NetworkUnreachable(e.to_string())),
        };

        match resp.status() {
            StatusCode::FORBIDDEN => {
                self.circuit_breaker.trip();
                Attempt::Fatal(DataError::CircuitBreakerTripped)
            }
            StatusCode::UNAUTHORIZED => Attempt::Fatal(DataError::AuthenticationRequired(
                format!("chart API refused {}", self.symbol),
            )),
            StatusCode::TOO_MANY_REQUESTS => {
                self.circuit_breaker.record_failure();
                let retry_after_secs = resp
                    .headers()
                    .get(reqwest::header::RETRY_AFTER)
                    .and_then(|v| v.to_str().ok()?.parse().ok())
                    .unwrap_or(60);
                Attempt::Retry(DataError::RateLimited { retry_after_secs })
            }
            status if !status.is_success() => {
                self.circuit_breaker.record_failure();
                Attempt::Retry(DataError::Other(format!("HTTP {status} for {}", self.symbol)))
            }
            _ => match resp.json::<ChartResponse>() {
                Ok(chart) => Attempt::Done(chart),
                Err(e) => Attempt::Fatal(DataError::ResponseFormatChanged(format!(
                    "unreadable chart body for {}: {e}",
                    self.symbol
                ))),
            },
        }
    }

    /// Request the chart, backing off exponentially between retryable failures.
    fn fetch_with_retry(&self) -> Result<RawTable, DataError> {
        let end = self.end_date();
        let url = Self::chart_url(&self.symbol, self.start, end);
        let mut last_error = DataError::Other("no attempt made".into());

        for attempt in 0..=self.max_retries {
            if !self.circuit_breaker.is_allowed() {
                return Err(DataError::CircuitBreakerTripped);
            }
            if attempt > 0 {
                let delay = self.base_delay * 2u32.pow(attempt - 1);
                tracing::debug!(attempt, ?delay, symbol = %self.symbol, "retrying chart request");
                std::thread::sleep(delay);
            }

            match self.attempt(&url) {
                Attempt::Done(chart) => {
                    let table = Self::parse_response(&self.symbol, chart)?;
                    self.circuit_breaker.record_success();
                    tracing::info!(
                        symbol = %self.symbol,
                        rows = table.len(),
                        start = %self.start,
                        %end,
                        "fetched live quotes"
                    );
                    return Ok(table);
                }
                Attempt::Retry(e) => last_error = e,
                Attempt::Fatal(e) => return Err(e),
            }
        }

        Err(last_error)
    }
}

/// Outcome of a single chart request.
enum Attempt {
    Done(ChartResponse),
    Retry(DataError),
    Fatal(DataError),
}

impl SourceProvider for YahooProvider {
    fn name(&self) -> &str {
        "yahoo_finance"
    }

    fn tag(&self) -> SourceTag {
        SourceTag::Live
    }

    fn fetch(&self) -> Result<RawTable, DataError> {
        self.fetch_with_retry()
    }

    fn is_available(&self) -> bool {
        self.circuit_breaker.is_allowed()
    }
}
