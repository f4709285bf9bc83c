use std::time::Duration;

use async_trait::async_trait;
use crypto_signal_core::candle::{Candle, DataSource, Interval};
use reqwest::Client;
use tracing::debug;

use crate::PLACEHOLDER_VOLUME;
use crate::error::ProviderError;
use crate::provider::CandleProvider;

const COINGECKO_BASE_URL: &str = "https://api.coingecko.com/api/v3";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// CoinGecko coin IDs for the supported trading pairs.
fn coin_id(symbol: &str) -> Option<&'static str> {
    match symbol.to_uppercase().as_str() {
        "BTCUSDT" => Some("bitcoin"),
        "ETHUSDT" => Some("ethereum"),
        "CROUSDT" => Some("crypto-com-chain"),
        _ => None,
    }
}

/// CoinGecko OHLC provider.
/// No authentication required. Serves a fixed 1-day window and has no volume.
pub struct CoinGeckoProvider {
    client: Client,
    base_url: String,
}

impl CoinGeckoProvider {
    pub fn new() -> Self {
        Self::with_base_url(COINGECKO_BASE_URL.to_string())
    }

    /// Create with a custom base URL (for testing).
    pub fn with_base_url(base_url: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .expect("failed to build reqwest client"),
            base_url,
        }
    }
}

impl Default for CoinGeckoProvider {
    fn default() -> Self {
        Self::new()
    }
}

/// Rows of `[timestamp_ms, open, high, low, close]`.
type OhlcRow = (i64, f64, f64, f64, f64);

fn rows_to_candles(rows: &[OhlcRow], interval: Interval) -> Vec<Candle> {
    let mut candles: Vec<Candle> = rows
        .iter()
        .map(|&(timestamp, open, high, low, close)| Candle {
            timestamp,
            open,
            high,
            low,
            close,
            volume: PLACEHOLDER_VOLUME,
            close_timestamp: timestamp + interval.as_millis(),
        })
        .collect();
    candles.sort_by_key(|c| c.timestamp);
    candles
}

#[async_trait]
impl CandleProvider for CoinGeckoProvider {
    fn name(&self) -> &str {
        "coingecko"
    }

    fn source(&self) -> DataSource {
        DataSource::MarketcapApi
    }

    async fn fetch_candles(
        &self,
        symbol: &str,
        interval: Interval,
        limit: usize,
    ) -> Result<Vec<Candle>, ProviderError> {
        let id = coin_id(symbol).ok_or_else(|| ProviderError::UnsupportedSymbol {
            provider: self.name().to_string(),
            symbol: symbol.to_string(),
        })?;

        let url = format!("{}/coins/{}/ohlc", self.base_url, id);
        debug!("{symbol}: requesting OHLC from {url}");

        let response = self
            .client
            .get(&url)
            .query(&[("vs_currency", "usd"), ("days", "1")])
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ProviderError::RateLimited {
                retry_after_secs: 60,
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

        let rows: Vec<OhlcRow> = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(format!("failed to parse response: {e}")))?;

        let mut candles = rows_to_candles(&rows, interval);
        if candles.len() > limit {
            candles.drain(..candles.len() - limit);
        }
        Ok(candles)
    }
}
