use std::time::Duration;

use async_trait::async_trait;
use crypto_signal_core::candle::{Candle, DataSource, Interval};
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::ProviderError;
use crate::provider::CandleProvider;

/// Equivalent public API hosts, tried in order.
const BINANCE_HOSTS: &[&str] = &[
    "https://api.binance.com",
    "https://api1.binance.com",
    "https://api2.binance.com",
    "https://api3.binance.com",
];

const KLINES_PATH: &str = "/api/v3/klines";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Binance spot klines provider.
/// No authentication required. Symbols use the exchange format (`BTCUSDT`).
pub struct BinanceProvider {
    client: Client,
    base_urls: Vec<String>,
}

impl BinanceProvider {
    pub fn new() -> Self {
        Self::with_base_urls(BINANCE_HOSTS.iter().map(|h| h.to_string()).collect())
    }

    /// Create with custom hosts (for testing).
    pub fn with_base_urls(base_urls: Vec<String>) -> Self {
        Self {
            client: Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .expect("failed to build reqwest client"),
            base_urls,
        }
    }

    async fn fetch_from_host(
        &self,
        base_url: &str,
        symbol: &str,
        interval: Interval,
        limit: usize,
    ) -> Result<Vec<Candle>, ProviderError> {
        let limit = limit.to_string();
        let response = self
            .client
            .get(format!("{base_url}{KLINES_PATH}"))
            .query(&[
                ("symbol", symbol),
                ("interval", interval.as_str()),
                ("limit", limit.as_str()),
            ])
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(60);
            return Err(ProviderError::RateLimited {
                retry_after_secs: retry_after,
            });
        }

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api {
                status,
                message: body,
            });
        }

        let rows: Vec<Vec<Value>> = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(format!("failed to parse klines: {e}")))?;

        parse_klines(&rows, interval)
    }
}

impl Default for BinanceProvider {
    fn default() -> Self {
        Self::new()
    }
}

/// Kline prices arrive as decimal strings; accept bare numbers too.
fn field_f64(row: &[Value], idx: usize, name: &str) -> Result<f64, ProviderError> {
    match row.get(idx) {
        Some(Value::String(s)) => s
            .parse::<f64>()
            .map_err(|e| ProviderError::Parse(format!("invalid {name} '{s}': {e}"))),
        Some(Value::Number(n)) => n
            .as_f64()
            .ok_or_else(|| ProviderError::Parse(format!("invalid {name}: {n}"))),
        Some(other) => Err(ProviderError::Parse(format!(
            "unexpected {name} value: {other}"
        ))),
        None => Err(ProviderError::Parse(format!("missing {name}"))),
    }
}

/// Parse rows of `[openTime, open, high, low, close, volume, closeTime, ...]`.
fn parse_klines(rows: &[Vec<Value>], interval: Interval) -> Result<Vec<Candle>, ProviderError> {
    let mut candles = Vec::with_capacity(rows.len());

    for row in rows {
        let timestamp = row
            .first()
            .and_then(Value::as_i64)
            .ok_or_else(|| ProviderError::Parse("missing open time".into()))?;

        candles.push(Candle {
            timestamp,
            open: field_f64(row, 1, "open")?,
            high: field_f64(row, 2, "high")?,
            low: field_f64(row, 3, "low")?,
            close: field_f64(row, 4, "close")?,
            volume: field_f64(row, 5, "volume")?,
            close_timestamp: timestamp + interval.as_millis(),
        });
    }

    candles.sort_by_key(|c| c.timestamp);
    Ok(candles)
}

#[async_trait]
impl CandleProvider for BinanceProvider {
    fn name(&self) -> &str {
        "binance"
    }

    fn source(&self) -> DataSource {
        DataSource::Exchange
    }

    async fn fetch_candles(
        &self,
        symbol: &str,
        interval: Interval,
        limit: usize,
    ) -> Result<Vec<Candle>, ProviderError> {
        let mut last_error = None;

        for base_url in &self.base_urls {
            debug!("{symbol}: requesting klines from {base_url}");
            match self
                .fetch_from_host(base_url, symbol, interval, limit)
                .await
            {
                Ok(candles) if !candles.is_empty() => return Ok(candles),
                Ok(_) => {
                    warn!("{symbol}: {base_url} returned no klines");
                }
                Err(e) => {
                    warn!("{symbol}: {base_url} failed: {e}");
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| ProviderError::NoData {
            symbol: symbol.to_string(),
        }))
    }
}
