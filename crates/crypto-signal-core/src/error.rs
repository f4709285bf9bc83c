use thiserror::Error;

#[derive(Debug, Error)]
pub enum SignalError {
    #[error("Unknown interval: '{0}'. Expected one of: 1m, 5m, 15m, 1h")]
    UnknownInterval(String),

    #[error("Invalid analysis: {0}")]
    InvalidAnalysis(String),
}
