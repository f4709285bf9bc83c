use async_trait::async_trait;
use chrono::Utc;
use crypto_signal_core::candle::{Candle, CandleSeries, DataSource, Interval};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::ProviderError;
use crate::provider::CandleProvider;

const DEFAULT_BASE_PRICE: f64 = 100.0;

/// Starting price for the random walk.
pub fn base_price(symbol: &str) -> f64 {
    match symbol.to_uppercase().as_str() {
        "BTCUSDT" => 43_000.0,
        "ETHUSDT" => 2_600.0,
        "CROUSDT" => 0.09,
        _ => DEFAULT_BASE_PRICE,
    }
}

/// Generate exactly `limit` random-walk candles whose last bucket starts at
/// or before `now_ms`.
///
/// High/low are drawn around the open, so a candle's close may fall outside
/// its high/low band.
pub fn generate_candles<R: Rng + ?Sized>(
    rng: &mut R,
    start_price: f64,
    interval: Interval,
    limit: usize,
    now_ms: i64,
) -> Vec<Candle> {
    let step = interval.as_millis();
    let last_open = now_ms - now_ms.rem_euclid(step);
    let first_open = last_open - step * limit.saturating_sub(1) as i64;

    let mut prev_close = start_price;
    let mut candles = Vec::with_capacity(limit);

    for i in 0..limit {
        let open = prev_close * (1.0 + rng.random_range(-0.02..=0.02));
        let high = open * rng.random_range(1.001..=1.01);
        let low = open * rng.random_range(0.99..=0.999);
        let close = open * (1.0 + rng.random_range(-0.01..=0.01));
        let volume = rng.random_range(1_000_000.0..=5_000_000.0);

        let timestamp = first_open + step * i as i64;
        candles.push(Candle {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
            close_timestamp: timestamp + step,
        });
        prev_close = close;
    }

    candles
}

/// Last-resort source that never fails. Output is simulated, not market data.
#[derive(Debug, Clone, Default)]
pub struct SyntheticProvider {
    seed: Option<u64>,
}

impl SyntheticProvider {
    pub fn new() -> Self {
        Self { seed: None }
    }

    /// Reproducible output: every call with the same inputs yields the same candles.
    pub fn with_seed(seed: u64) -> Self {
        Self { seed: Some(seed) }
    }

    fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        }
    }

    pub fn generate(&self, symbol: &str, interval: Interval, limit: usize) -> CandleSeries {
        let candles = generate_candles(
            &mut self.rng(),
            base_price(symbol),
            interval,
            limit,
            Utc::now().timestamp_millis(),
        );
        CandleSeries::new(symbol, interval, DataSource::Synthetic, candles, limit)
    }
}

#[async_trait]
impl CandleProvider for SyntheticProvider {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn source(&self) -> DataSource {
        DataSource::Synthetic
    }

    async fn fetch_candles(
        &self,
        symbol: &str,
        interval: Interval,
        limit: usize,
    ) -> Result<Vec<Candle>, ProviderError> {
        Ok(self.generate(symbol, interval, limit).candles)
    }
}
