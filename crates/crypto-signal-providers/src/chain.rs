use crypto_signal_core::candle::{CandleSeries, Interval};
use tracing::{info, warn};

use crate::binance::BinanceProvider;
use crate::coincap::CoinCapProvider;
use crate::coingecko::CoinGeckoProvider;
use crate::provider::CandleProvider;
use crate::synthetic::SyntheticProvider;

/// Tries providers in priority order and falls back to synthetic data.
///
/// The first provider returning a non-empty series wins; errors from any
/// provider are logged and never surface to the caller.
pub struct ProviderChain {
    providers: Vec<Box<dyn CandleProvider>>,
    fallback: SyntheticProvider,
}

impl ProviderChain {
    pub fn new(providers: Vec<Box<dyn CandleProvider>>, fallback: SyntheticProvider) -> Self {
        Self {
            providers,
            fallback,
        }
    }

    /// Binance, then CoinGecko, then CoinCap, then synthetic.
    pub fn with_default_providers() -> Self {
        Self::new(
            vec![
                Box::new(BinanceProvider::new()),
                Box::new(CoinGeckoProvider::new()),
                Box::new(CoinCapProvider::new()),
            ],
            SyntheticProvider::new(),
        )
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    async fn try_fetch(
        &self,
        provider: &dyn CandleProvider,
        symbol: &str,
        interval: Interval,
        limit: usize,
    ) -> Option<CandleSeries> {
        match provider.fetch_candles(symbol, interval, limit).await {
            Ok(candles) if !candles.is_empty() => Some(CandleSeries::new(
                symbol,
                interval,
                provider.source(),
                candles,
                limit,
            )),
            Ok(_) => {
                warn!("{symbol}: {} returned no candles", provider.name());
                None
            }
            Err(e) => {
                warn!("{symbol}: {} failed: {e}", provider.name());
                None
            }
        }
    }

    /// Always returns a non-empty series of at most `limit` candles.
    /// A `limit` of 0 is treated as 1.
    pub async fn fetch_candles(
        &self,
        symbol: &str,
        interval: Interval,
        limit: usize,
    ) -> CandleSeries {
        let limit = limit.max(1);
        for provider in &self.providers {
            if let Some(series) = self
                .try_fetch(provider.as_ref(), symbol, interval, limit)
                .await
            {
                info!(
                    "{symbol}: fetched {} candle(s) from {} ({})",
                    series.len(),
                    provider.name(),
                    series.source
                );
                return series;
            }
        }

        warn!("{symbol}: all providers failed, generating synthetic candles");
        self.fallback.generate(symbol, interval, limit)
    }
}
