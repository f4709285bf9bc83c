use chrono::{SecondsFormat, Utc};
use crypto_signal_core::analysis::{AnalysisResult, AnalysisSource};
use crypto_signal_core::candle::CandleSeries;
use tracing::{debug, info, warn};

use crate::error::AnalysisError;
use crate::extract::extract_json;
use crate::fallback::synthetic_analysis;
use crate::gemini::GeminiClient;
use crate::prompt::build_prompt;
use crate::retry::{RetryPolicy, retry};

/// Turn model output into a validated analysis.
///
/// The payload must match the typed schema (all keys, numeric types, known
/// signal labels) and pass [`AnalysisResult::validate`].
pub fn parse_analysis(text: &str) -> Result<AnalysisResult, AnalysisError> {
    let value = extract_json(text).ok_or(AnalysisError::NoJson)?;
    let result: AnalysisResult = serde_json::from_value(value)
        .map_err(|e| AnalysisError::InvalidPayload(format!("schema mismatch: {e}")))?;
    result.validate()?;
    Ok(result)
}

/// Requests analysis from the model and never fails: any unrecoverable error
/// yields a synthetic analysis instead.
pub struct Analyzer {
    gemini: GeminiClient,
    retry: RetryPolicy,
}

impl Analyzer {
    pub fn new(gemini: GeminiClient, retry: RetryPolicy) -> Self {
        Self { gemini, retry }
    }

    async fn request(
        &self,
        symbol: &str,
        series: &CandleSeries,
        generated_at: &str,
    ) -> Result<AnalysisResult, AnalysisError> {
        let prompt = build_prompt(symbol, series, generated_at)?;

        let text = retry(&self.retry, AnalysisError::is_transient, |attempt| {
            debug!("{symbol}: analysis request attempt {attempt} to {}", self.gemini.model());
            self.gemini.generate(&prompt)
        })
        .await?;

        let mut result = parse_analysis(&text)?;
        if result.symbol != symbol {
            debug!("{symbol}: model labelled result as '{}'", result.symbol);
            result.symbol = symbol.to_string();
        }
        result.source = AnalysisSource::Model;
        Ok(result)
    }

    pub async fn analyze(&self, symbol: &str, series: &CandleSeries) -> AnalysisResult {
        let generated_at = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);

        match self.request(symbol, series, &generated_at).await {
            Ok(result) => {
                info!(
                    "{symbol}: analysis received (overall {}, rsi {:.1})",
                    result.signals.overall_signal, result.indicators.rsi
                );
                result
            }
            Err(e) => {
                warn!("{symbol}: analysis failed, using synthetic analysis: {e}");
                synthetic_analysis(&mut rand::rng(), symbol, series, &generated_at)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAYLOAD: &str = r#"{
        "symbol": "BTCUSDT",
        "current_price": 43250.5,
        "timestamp": "2025-01-15T14:30:00Z",
        "indicators": {"rsi": 72.0, "sma20": 43100.0, "sma50": 42800.0, "ema20": 43150.2,
                       "sma200": 41000.0, "macd_line": 35.2, "macd_signal": 30.1, "macd_histogram": 5.1},
        "levels": {"support": 42500.0, "resistance": 44000.0},
        "signals": {"rsi_signal": "overbought", "trend_short": "bullish", "trend_long": "bullish",
                    "sma_cross": "neutral", "macd_signal": "bullish", "overall_signal": "buy"},
        "analysis": "Momentum is stretched."
    }"#;

    #[test]
    fn parses_fenced_payload() {
        let text = format!("Sure! Here you go:\n```json\n{PAYLOAD}\n```");
        let result = parse_analysis(&text).unwrap();
        assert_eq!(result.indicators.rsi, 72.0);
        assert_eq!(result.analysis, "Momentum is stretched.");
    }

    #[test]
    fn fenced_and_bare_payload_agree() {
        let fenced = parse_analysis(&format!("```json\n{PAYLOAD}\n```")).unwrap();
        let bare = parse_analysis(PAYLOAD).unwrap();
        assert_eq!(fenced, bare);
    }

    #[test]
    fn prose_only_is_no_json() {
        assert!(matches!(
            parse_analysis("I cannot help with that."),
            Err(AnalysisError::NoJson)
        ));
    }

    #[test]
    fn unknown_label_is_invalid_payload() {
        let text = PAYLOAD.replace("\"buy\"", "\"to_the_moon\"");
        assert!(matches!(
            parse_analysis(&text),
            Err(AnalysisError::InvalidPayload(_))
        ));
    }

    #[test]
    fn out_of_range_rsi_fails_validation() {
        let text = PAYLOAD.replace("\"rsi\": 72.0", "\"rsi\": 172.0");
        assert!(matches!(
            parse_analysis(&text),
            Err(AnalysisError::Signal(_))
        ));
    }
}
