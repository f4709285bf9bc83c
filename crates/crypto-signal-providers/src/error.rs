use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("No data available for {symbol}")]
    NoData { symbol: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Rate limited, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Unsupported symbol for {provider}: {symbol}")]
    UnsupportedSymbol { provider: String, symbol: String },

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },
}
