use std::time::Duration;

use async_trait::async_trait;
use crypto_signal_core::candle::{Candle, DataSource, Interval};
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::PLACEHOLDER_VOLUME;
use crate::error::ProviderError;
use crate::provider::CandleProvider;

const COINCAP_BASE_URL: &str = "https://api.coincap.io/v2";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

fn asset_id(symbol: &str) -> Option<&'static str> {
    match symbol.to_uppercase().as_str() {
        "BTCUSDT" => Some("bitcoin"),
        "ETHUSDT" => Some("ethereum"),
        "CROUSDT" => Some("crypto-com-coin"),
        _ => None,
    }
}

fn history_interval(interval: Interval) -> &'static str {
    match interval {
        Interval::OneMinute => "m1",
        Interval::FiveMinutes => "m5",
        Interval::FifteenMinutes => "m15",
        Interval::OneHour => "h1",
    }
}

/// CoinCap price history provider.
/// Publishes single USD prices per sample, so candles are synthesized around each price.
pub struct CoinCapProvider {
    client: Client,
    base_url: String,
}

impl CoinCapProvider {
    pub fn new() -> Self {
        Self::with_base_url(COINCAP_BASE_URL.to_string())
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

impl Default for CoinCapProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
struct CoinCapHistoryResponse {
    data: Vec<CoinCapPoint>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CoinCapPoint {
    /// USD price as a decimal string
    price_usd: String,
    /// Milliseconds since epoch
    time: i64,
}

impl CoinCapPoint {
    fn to_candle(&self, interval: Interval) -> Result<Candle, ProviderError> {
        let price: f64 = self.price_usd.parse().map_err(|e| {
            ProviderError::Parse(format!("invalid priceUsd '{}': {e}", self.price_usd))
        })?;

        Ok(Candle {
            timestamp: self.time,
            open: price * 0.999,
            high: price * 1.001,
            low: price * 0.998,
            close: price,
            volume: PLACEHOLDER_VOLUME,
            close_timestamp: self.time + interval.as_millis(),
        })
    }
}

fn points_to_candles(
    points: &[CoinCapPoint],
    interval: Interval,
    limit: usize,
) -> Result<Vec<Candle>, ProviderError> {
    let mut candles = points
        .iter()
        .map(|p| p.to_candle(interval))
        .collect::<Result<Vec<_>, _>>()?;
    candles.sort_by_key(|c| c.timestamp);
    if candles.len() > limit {
        candles.drain(..candles.len() - limit);
    }
    Ok(candles)
}

#[async_trait]
impl CandleProvider for CoinCapProvider {
    fn name(&self) -> &str {
        "coincap"
    }

    fn source(&self) -> DataSource {
        DataSource::PricefeedApi
    }

    async fn fetch_candles(
        &self,
        symbol: &str,
        interval: Interval,
        limit: usize,
    ) -> Result<Vec<Candle>, ProviderError> {
        let id = asset_id(symbol).ok_or_else(|| ProviderError::UnsupportedSymbol {
            provider: self.name().to_string(),
            symbol: symbol.to_string(),
        })?;

        let url = format!("{}/assets/{}/history", self.base_url, id);
        debug!("{symbol}: requesting price history from {url}");

        let response = self
            .client
            .get(&url)
            .query(&[("interval", history_interval(interval))])
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

        let body: CoinCapHistoryResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(format!("failed to parse response: {e}")))?;

        points_to_candles(&body.data, interval, limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn parse_history_response_json() {
        let json = r#"{
            "data": [
                {"priceUsd": "100.0", "time": 1736942400000, "date": "2025-01-15T12:00:00.000Z"},
                {"priceUsd": "200.0", "time": 1736942700000, "date": "2025-01-15T12:05:00.000Z"}
            ],
            "timestamp": 1736943000000
        }"#;

        let response: CoinCapHistoryResponse = serde_json::from_str(json).unwrap();
        let candles = points_to_candles(&response.data, Interval::FiveMinutes, 200).unwrap();

        assert_eq!(candles.len(), 2);
        let c = &candles[0];
        assert!(approx(c.open, 99.9));
        assert!(approx(c.high, 100.1));
        assert!(approx(c.low, 99.8));
        assert_eq!(c.close, 100.0);
        assert_eq!(c.volume, 1_000_000.0);
        assert_eq!(c.close_timestamp, 1736942400000 + 300_000);
    }

    #[test]
    fn keeps_only_most_recent_points() {
        let points: Vec<CoinCapPoint> = (0..10)
            .map(|i| CoinCapPoint {
                price_usd: format!("{}", 100 + i),
                time: i * 300_000,
            })
            .collect();

        let candles = points_to_candles(&points, Interval::FiveMinutes, 3).unwrap();
        assert_eq!(candles.len(), 3);
        assert_eq!(candles[0].close, 107.0);
        assert_eq!(candles[2].close, 109.0);
    }

    #[test]
    fn invalid_price_is_parse_error() {
        let point = CoinCapPoint {
            price_usd: "n/a".to_string(),
            time: 0,
        };
        assert!(matches!(
            point.to_candle(Interval::FiveMinutes),
            Err(ProviderError::Parse(_))
        ));
    }

    #[test]
    fn interval_and_asset_mapping() {
        assert_eq!(history_interval(Interval::FiveMinutes), "m5");
        assert_eq!(history_interval(Interval::OneHour), "h1");
        assert_eq!(asset_id("CROUSDT"), Some("crypto-com-coin"));
        assert_eq!(asset_id("SOLUSDT"), None);
    }
}
