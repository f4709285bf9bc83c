use crypto_signal_core::candle::{Candle, CandleSeries};
use serde::Serialize;

use crate::error::AnalysisError;

/// Only the most recent candles are sent, regardless of how many were fetched.
pub const PROMPT_CANDLES: usize = 50;

#[derive(Serialize)]
struct PromptCandle {
    timestamp: i64,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

impl From<&Candle> for PromptCandle {
    fn from(c: &Candle) -> Self {
        Self {
            timestamp: c.timestamp,
            open: c.open,
            high: c.high,
            low: c.low,
            close: c.close,
            volume: c.volume,
        }
    }
}

/// Build the analysis instruction for `symbol` from the tail of `series`.
/// `generated_at` is echoed back by the model as the result timestamp.
pub fn build_prompt(
    symbol: &str,
    series: &CandleSeries,
    generated_at: &str,
) -> Result<String, AnalysisError> {
    let recent: Vec<PromptCandle> = series
        .tail(PROMPT_CANDLES)
        .iter()
        .map(PromptCandle::from)
        .collect();
    let data = serde_json::to_string_pretty(&recent)?;
    let interval = series.interval;

    Ok(format!(
        r#"Analyze {symbol} technical indicators based on this {interval} OHLCV data:
{data}

Calculate these indicators:
- RSI (14-period)
- SMA20, SMA50, EMA20, SMA200
- MACD (12,26,9)
- Support/Resistance levels

Analyze current market conditions and return ONLY this JSON:
{{
  "symbol": "{symbol}",
  "current_price": number,
  "timestamp": "{generated_at}",
  "indicators": {{
    "rsi": number,
    "sma20": number,
    "sma50": number,
    "ema20": number,
    "sma200": number,
    "macd_line": number,
    "macd_signal": number,
    "macd_histogram": number
  }},
  "levels": {{
    "support": number,
    "resistance": number
  }},
  "signals": {{
    "rsi_signal": "overbought|oversold|neutral",
    "trend_short": "bullish|bearish|neutral",
    "trend_long": "bullish|bearish|neutral",
    "sma_cross": "golden_cross|death_cross|neutral",
    "macd_signal": "bullish|bearish|neutral",
    "overall_signal": "strong_buy|buy|hold|sell|strong_sell"
  }},
  "analysis": "Brief 1-2 sentence market analysis"
}}"#
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crypto_signal_core::candle::{DataSource, Interval};

    fn series(n: i64) -> CandleSeries {
        let candles = (0..n)
            .map(|i| Candle {
                timestamp: i * 300_000,
                open: i as f64,
                high: i as f64,
                low: i as f64,
                close: i as f64,
                volume: 10.0,
                close_timestamp: i * 300_000 + 300_000,
            })
            .collect();
        CandleSeries::new(
            "BTCUSDT",
            Interval::FiveMinutes,
            DataSource::Exchange,
            candles,
            200,
        )
    }

    #[test]
    fn prompt_embeds_only_last_fifty_candles() {
        let prompt = build_prompt("BTCUSDT", &series(200), "2025-01-15T14:30:00+00:00").unwrap();

        assert_eq!(prompt.matches("\"timestamp\": ").count(), 50 + 1);
        assert!(prompt.contains(&format!("\"timestamp\": {}", 199 * 300_000)));
        assert!(prompt.contains(&format!("\"timestamp\": {}", 150 * 300_000)));
        assert!(!prompt.contains(&format!("\"timestamp\": {},", 149 * 300_000)));
        assert!(!prompt.contains("closeTimestamp"));
    }

    #[test]
    fn prompt_names_symbol_schema_and_time() {
        let prompt = build_prompt("ETHUSDT", &series(3), "2025-01-15T14:30:00+00:00").unwrap();

        assert!(prompt.starts_with("Analyze ETHUSDT technical indicators based on this 5m"));
        assert!(prompt.contains("\"symbol\": \"ETHUSDT\""));
        assert!(prompt.contains("\"timestamp\": \"2025-01-15T14:30:00+00:00\""));
        assert!(prompt.contains("golden_cross|death_cross|neutral"));
        assert!(prompt.contains("MACD (12,26,9)"));
    }
}
