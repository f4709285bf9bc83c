use async_trait::async_trait;
use crypto_signal_core::candle::{Candle, DataSource, Interval};

use crate::error::ProviderError;

/// Trait for fetching recent candle data from an external source.
#[async_trait]
pub trait CandleProvider: Send + Sync {
    /// Provider name (for logging/display).
    fn name(&self) -> &str;

    /// Provenance tag attached to series this provider produces.
    fn source(&self) -> DataSource;

    /// Fetch up to `limit` of the most recent candles for a symbol.
    /// Returns candles sorted by timestamp.
    async fn fetch_candles(
        &self,
        symbol: &str,
        interval: Interval,
        limit: usize,
    ) -> Result<Vec<Candle>, ProviderError>;
}
