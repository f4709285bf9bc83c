pub mod alert;
pub mod analysis;
pub mod candle;
pub mod error;

pub use analysis::{AnalysisResult, AnalysisSource, Indicators, Levels, Signals};
pub use candle::{Candle, CandleSeries, DataSource, Interval};
pub use error::SignalError;
