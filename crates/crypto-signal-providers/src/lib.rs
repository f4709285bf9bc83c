pub mod binance;
pub mod chain;
pub mod coincap;
pub mod coingecko;
pub mod error;
pub mod provider;
pub mod synthetic;

/// Volume reported by sources that do not publish real volume.
pub const PLACEHOLDER_VOLUME: f64 = 1_000_000.0;

pub use chain::ProviderChain;
pub use error::ProviderError;
pub use provider::CandleProvider;
