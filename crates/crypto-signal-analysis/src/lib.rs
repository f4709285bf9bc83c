pub mod analyzer;
pub mod error;
pub mod extract;
pub mod fallback;
pub mod gemini;
pub mod prompt;
pub mod retry;

pub use analyzer::Analyzer;
pub use error::AnalysisError;
pub use gemini::GeminiClient;
pub use retry::RetryPolicy;
