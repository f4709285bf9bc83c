use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::SignalError;

/// One symbol's indicator snapshot and signal classification.
///
/// Field names follow the JSON shape requested from the analysis service.
/// Deserializing rejects missing keys, wrong types and unknown signal labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub symbol: String,
    pub current_price: f64,
    /// ISO-8601 generation time (not market time).
    pub timestamp: String,
    pub indicators: Indicators,
    pub levels: Levels,
    pub signals: Signals,
    pub analysis: String,
    #[serde(skip)]
    pub source: AnalysisSource,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Indicators {
    pub rsi: f64,
    pub sma20: f64,
    pub sma50: f64,
    pub ema20: f64,
    pub sma200: f64,
    pub macd_line: f64,
    pub macd_signal: f64,
    pub macd_histogram: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Levels {
    pub support: f64,
    pub resistance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signals {
    pub rsi_signal: RsiSignal,
    pub trend_short: Trend,
    pub trend_long: Trend,
    pub sma_cross: SmaCross,
    pub macd_signal: Trend,
    pub overall_signal: OverallSignal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RsiSignal {
    Overbought,
    Oversold,
    Neutral,
}

/// Direction label shared by the short/long trend and MACD signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Bullish,
    Bearish,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SmaCross {
    GoldenCross,
    DeathCross,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverallSignal {
    StrongBuy,
    Buy,
    Hold,
    Sell,
    StrongSell,
}

/// Whether an analysis came from the external model or the local generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AnalysisSource {
    #[default]
    Model,
    Synthetic,
}

impl RsiSignal {
    pub fn as_str(self) -> &'static str {
        match self {
            RsiSignal::Overbought => "overbought",
            RsiSignal::Oversold => "oversold",
            RsiSignal::Neutral => "neutral",
        }
    }
}

impl Trend {
    pub fn as_str(self) -> &'static str {
        match self {
            Trend::Bullish => "bullish",
            Trend::Bearish => "bearish",
            Trend::Neutral => "neutral",
        }
    }
}

impl SmaCross {
    pub fn as_str(self) -> &'static str {
        match self {
            SmaCross::GoldenCross => "golden_cross",
            SmaCross::DeathCross => "death_cross",
            SmaCross::Neutral => "neutral",
        }
    }
}

impl OverallSignal {
    pub fn as_str(self) -> &'static str {
        match self {
            OverallSignal::StrongBuy => "strong_buy",
            OverallSignal::Buy => "buy",
            OverallSignal::Hold => "hold",
            OverallSignal::Sell => "sell",
            OverallSignal::StrongSell => "strong_sell",
        }
    }
}

impl AnalysisSource {
    pub fn as_str(self) -> &'static str {
        match self {
            AnalysisSource::Model => "model",
            AnalysisSource::Synthetic => "synthetic",
        }
    }
}

macro_rules! display_via_as_str {
    ($($ty:ty),*) => {
        $(impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        })*
    };
}

display_via_as_str!(RsiSignal, Trend, SmaCross, OverallSignal, AnalysisSource);

impl AnalysisResult {
    /// Checks the numeric fields a typed parse cannot: finiteness, RSI bounds
    /// and a positive price.
    pub fn validate(&self) -> Result<(), SignalError> {
        let i = &self.indicators;
        let numbers = [
            ("current_price", self.current_price),
            ("rsi", i.rsi),
            ("sma20", i.sma20),
            ("sma50", i.sma50),
            ("ema20", i.ema20),
            ("sma200", i.sma200),
            ("macd_line", i.macd_line),
            ("macd_signal", i.macd_signal),
            ("macd_histogram", i.macd_histogram),
            ("support", self.levels.support),
            ("resistance", self.levels.resistance),
        ];

        if let Some((name, value)) = numbers.iter().find(|(_, v)| !v.is_finite()) {
            return Err(SignalError::InvalidAnalysis(format!(
                "{name} is not finite: {value}"
            )));
        }

        if !(0.0..=100.0).contains(&i.rsi) {
            return Err(SignalError::InvalidAnalysis(format!(
                "rsi out of range: {}",
                i.rsi
            )));
        }

        if self.current_price <= 0.0 {
            return Err(SignalError::InvalidAnalysis(format!(
                "current_price must be positive: {}",
                self.current_price
            )));
        }

        Ok(())
    }

    pub fn is_synthetic(&self) -> bool {
        self.source == AnalysisSource::Synthetic
    }
}
