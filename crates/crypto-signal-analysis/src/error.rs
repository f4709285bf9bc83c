use crypto_signal_core::SignalError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Analysis service temporarily unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Empty response: {0}")]
    EmptyResponse(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("No JSON object found in response")]
    NoJson,

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error(transparent)]
    Signal(#[from] SignalError),
}

impl AnalysisError {
    /// Whether another attempt could succeed: 503s, timeouts and connection failures.
    pub fn is_transient(&self) -> bool {
        match self {
            AnalysisError::ServiceUnavailable(_) => true,
            AnalysisError::Http(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_unavailable_and_network_errors_are_transient() {
        assert!(AnalysisError::ServiceUnavailable("overloaded".into()).is_transient());
        assert!(
            !AnalysisError::Api {
                status: 400,
                message: "bad request".into()
            }
            .is_transient()
        );
        assert!(!AnalysisError::NoJson.is_transient());
        assert!(!AnalysisError::InvalidPayload("x".into()).is_transient());
    }
}
