use chrono::{DateTime, Utc};

use crate::analysis::{AnalysisResult, OverallSignal, SmaCross, Trend};
use crate::candle::DataSource;

pub const RSI_OVERBOUGHT: f64 = 70.0;
pub const RSI_OVERSOLD: f64 = 30.0;
pub const MACD_HISTOGRAM_THRESHOLD: f64 = 0.1;

/// Whether an analysis is notable enough to alert on.
pub fn should_notify(result: &AnalysisResult) -> bool {
    let rsi = result.indicators.rsi;
    if rsi > RSI_OVERBOUGHT || rsi < RSI_OVERSOLD {
        return true;
    }

    let signals = &result.signals;
    if matches!(
        signals.overall_signal,
        OverallSignal::StrongBuy | OverallSignal::StrongSell
    ) {
        return true;
    }

    if matches!(signals.sma_cross, SmaCross::GoldenCross | SmaCross::DeathCross) {
        return true;
    }

    matches!(signals.macd_signal, Trend::Bullish | Trend::Bearish)
        && result.indicators.macd_histogram.abs() > MACD_HISTOGRAM_THRESHOLD
}

fn sentiment_icon(label: &str) -> &'static str {
    match label {
        "bullish" | "buy" | "strong_buy" => "🟢",
        "bearish" | "sell" | "strong_sell" => "🔴",
        _ => "🟡",
    }
}

fn rsi_label(rsi: f64) -> &'static str {
    if rsi > RSI_OVERBOUGHT {
        "⚠️ Overbought"
    } else if rsi < RSI_OVERSOLD {
        "💰 Oversold"
    } else {
        "➡️ Neutral"
    }
}

/// `golden_cross` -> `Golden Cross`
fn title_case(label: &str) -> String {
    label
        .split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Escape the characters legacy Telegram Markdown treats as entity markers.
fn escape_markdown(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '_' | '*' | '[' | '`') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Render an alert as Markdown for the messaging channel.
pub fn render_message(
    result: &AnalysisResult,
    display_name: &str,
    data_source: DataSource,
    generated_at: DateTime<Utc>,
) -> String {
    let i = &result.indicators;
    let s = &result.signals;
    let overall = s.overall_signal.as_str();

    let lines = [
        format!("🚀 *{display_name} ({})* Analysis", result.symbol),
        String::new(),
        format!("💲 *Price:* ${:.2}", result.current_price),
        String::new(),
        "📊 *Technical Indicators:*".to_string(),
        format!("• RSI(14): {:.1} {}", i.rsi, rsi_label(i.rsi)),
        format!("• SMA20: ${:.2}", i.sma20),
        format!("• SMA50: ${:.2}", i.sma50),
        format!("• EMA20: ${:.2}", i.ema20),
        format!("• SMA200: ${:.2}", i.sma200),
        String::new(),
        "📈 *MACD:*".to_string(),
        format!("• Line: {:.3}", i.macd_line),
        format!("• Signal: {:.3}", i.macd_signal),
        format!("• Histogram: {:.3}", i.macd_histogram),
        String::new(),
        format!(
            "🧱 *Levels:* support ${:.2} / resistance ${:.2}",
            result.levels.support, result.levels.resistance
        ),
        String::new(),
        "🎯 *Signals:*".to_string(),
        format!("• RSI: {}", title_case(s.rsi_signal.as_str())),
        format!(
            "• Short Trend: {} {}",
            sentiment_icon(s.trend_short.as_str()),
            title_case(s.trend_short.as_str())
        ),
        format!(
            "• Long Trend: {} {}",
            sentiment_icon(s.trend_long.as_str()),
            title_case(s.trend_long.as_str())
        ),
        format!("• SMA Cross: {}", title_case(s.sma_cross.as_str())),
        format!(
            "• MACD: {} {}",
            sentiment_icon(s.macd_signal.as_str()),
            title_case(s.macd_signal.as_str())
        ),
        String::new(),
        format!(
            "🔔 *Overall Signal:* {} *{}*",
            sentiment_icon(overall),
            overall.replace('_', " ").to_uppercase()
        ),
        String::new(),
        format!("📝 *Analysis:* {}", escape_markdown(&result.analysis)),
        String::new(),
        format!(
            "🗂 Data: {data_source} | Analysis: {}",
            result.source.as_str()
        ),
        format!("🕐 {}", generated_at.format("%Y-%m-%d %H:%M:%S UTC")),
    ];

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{AnalysisSource, Indicators, Levels, RsiSignal, Signals};
    use chrono::TimeZone;

    fn quiet() -> AnalysisResult {
        AnalysisResult {
            symbol: "ETHUSDT".to_string(),
            current_price: 2600.0,
            timestamp: "2025-01-15T14:30:00+00:00".to_string(),
            indicators: Indicators {
                rsi: 50.0,
                sma20: 2590.0,
                sma50: 2580.0,
                ema20: 2595.0,
                sma200: 2400.0,
                macd_line: 1.0,
                macd_signal: 0.95,
                macd_histogram: 0.05,
            },
            levels: Levels {
                support: 2500.0,
                resistance: 2700.0,
            },
            signals: Signals {
                rsi_signal: RsiSignal::Neutral,
                trend_short: Trend::Neutral,
                trend_long: Trend::Neutral,
                sma_cross: SmaCross::Neutral,
                macd_signal: Trend::Neutral,
                overall_signal: OverallSignal::Hold,
            },
            analysis: "Range-bound.".to_string(),
            source: AnalysisSource::Model,
        }
    }

    #[test]
    fn free_text_markers_are_escaped() {
        assert_eq!(
            escape_markdown("RSI_14 *very* high [see] `x`"),
            r"RSI\_14 \*very\* high \[see] \`x\`"
        );
        assert_eq!(escape_markdown("Range-bound."), "Range-bound.");
    }

    #[test]
    fn analysis_text_cannot_break_message_markup() {
        let mut r = quiet();
        r.analysis = "Price above sma_20 with *strong* momentum".to_string();
        let msg = render_message(
            &r,
            "Ethereum",
            DataSource::Exchange,
            Utc.with_ymd_and_hms(2025, 1, 15, 14, 30, 0).unwrap(),
        );

        assert!(msg.contains(r"📝 *Analysis:* Price above sma\_20 with \*strong\* momentum"));
        assert!(msg.contains("🚀 *Ethereum (ETHUSDT)* Analysis"));
    }

    #[test]
    fn quiet_market_does_not_notify() {
        assert!(!should_notify(&quiet()));
    }

    #[test]
    fn extreme_rsi_notifies_regardless_of_signals() {
        let mut r = quiet();
        r.indicators.rsi = 75.0;
        assert!(should_notify(&r));

        r.indicators.rsi = 25.0;
        assert!(should_notify(&r));
    }

    #[test]
    fn rsi_thresholds_are_exclusive() {
        let mut r = quiet();
        r.indicators.rsi = 70.0;
        assert!(!should_notify(&r));
        r.indicators.rsi = 30.0;
        assert!(!should_notify(&r));
    }

    #[test]
    fn strong_overall_signal_notifies() {
        let mut r = quiet();
        r.signals.overall_signal = OverallSignal::StrongSell;
        assert!(should_notify(&r));

        r.signals.overall_signal = OverallSignal::Buy;
        assert!(!should_notify(&r));
    }

    #[test]
    fn sma_cross_notifies() {
        let mut r = quiet();
        r.signals.sma_cross = SmaCross::GoldenCross;
        assert!(should_notify(&r));

        r.signals.sma_cross = SmaCross::DeathCross;
        assert!(should_notify(&r));
    }

    #[test]
    fn macd_needs_direction_and_histogram() {
        let mut r = quiet();
        r.signals.macd_signal = Trend::Bullish;
        r.indicators.macd_histogram = 0.05;
        assert!(!should_notify(&r));

        r.indicators.macd_histogram = 0.15;
        assert!(should_notify(&r));

        r.indicators.macd_histogram = -0.15;
        r.signals.macd_signal = Trend::Bearish;
        assert!(should_notify(&r));

        r.signals.macd_signal = Trend::Neutral;
        assert!(!should_notify(&r));
    }

    #[test]
    fn title_case_labels() {
        assert_eq!(title_case("golden_cross"), "Golden Cross");
        assert_eq!(title_case("neutral"), "Neutral");
    }

    #[test]
    fn render_includes_prices_signals_and_provenance() {
        let mut r = quiet();
        r.signals.overall_signal = OverallSignal::StrongBuy;
        r.signals.trend_short = Trend::Bearish;
        r.source = AnalysisSource::Synthetic;
        let at = Utc.with_ymd_and_hms(2025, 1, 15, 14, 30, 0).unwrap();

        let msg = render_message(&r, "Ethereum", DataSource::Synthetic, at);

        assert!(msg.starts_with("🚀 *Ethereum (ETHUSDT)* Analysis"));
        assert!(msg.contains("💲 *Price:* $2600.00"));
        assert!(msg.contains("• RSI(14): 50.0 ➡️ Neutral"));
        assert!(msg.contains("• Histogram: 0.050"));
        assert!(msg.contains("• Short Trend: 🔴 Bearish"));
        assert!(msg.contains("🔔 *Overall Signal:* 🟢 *STRONG BUY*"));
        assert!(msg.contains("Data: synthetic | Analysis: synthetic"));
        assert!(msg.ends_with("🕐 2025-01-15 14:30:00 UTC"));
    }
}
