use crypto_signal_core::analysis::{
    AnalysisResult, AnalysisSource, Indicators, Levels, OverallSignal, RsiSignal, Signals,
    SmaCross, Trend,
};
use crypto_signal_core::alert::{RSI_OVERBOUGHT, RSI_OVERSOLD};
use crypto_signal_core::candle::CandleSeries;
use rand::Rng;

const DEFAULT_PRICE: f64 = 100.0;
const CROSS_BAND: f64 = 0.01;

fn rsi_signal(rsi: f64) -> RsiSignal {
    if rsi > RSI_OVERBOUGHT {
        RsiSignal::Overbought
    } else if rsi < RSI_OVERSOLD {
        RsiSignal::Oversold
    } else {
        RsiSignal::Neutral
    }
}

fn compare(fast: f64, slow: f64) -> Trend {
    if fast > slow {
        Trend::Bullish
    } else if fast < slow {
        Trend::Bearish
    } else {
        Trend::Neutral
    }
}

fn sma_cross(sma20: f64, sma50: f64) -> SmaCross {
    if sma20 > sma50 * (1.0 + CROSS_BAND) {
        SmaCross::GoldenCross
    } else if sma20 < sma50 * (1.0 - CROSS_BAND) {
        SmaCross::DeathCross
    } else {
        SmaCross::Neutral
    }
}

fn trend_score(trend: Trend) -> i32 {
    match trend {
        Trend::Bullish => 1,
        Trend::Bearish => -1,
        Trend::Neutral => 0,
    }
}

/// Net bullish votes mapped onto the five-level scale.
pub fn overall_signal(score: i32) -> OverallSignal {
    match score {
        3.. => OverallSignal::StrongBuy,
        1..=2 => OverallSignal::Buy,
        0 => OverallSignal::Hold,
        -2..=-1 => OverallSignal::Sell,
        _ => OverallSignal::StrongSell,
    }
}

/// Derive every signal label from indicator values.
pub fn derive_signals(price: f64, indicators: &Indicators) -> Signals {
    let rsi_signal = rsi_signal(indicators.rsi);
    let trend_short = compare(price, indicators.sma20);
    let trend_long = compare(indicators.sma50, indicators.sma200);
    let sma_cross = sma_cross(indicators.sma20, indicators.sma50);
    let macd_signal = compare(indicators.macd_histogram, 0.0);

    let score = trend_score(trend_short)
        + trend_score(trend_long)
        + trend_score(macd_signal)
        + match sma_cross {
            SmaCross::GoldenCross => 1,
            SmaCross::DeathCross => -1,
            SmaCross::Neutral => 0,
        }
        + match rsi_signal {
            RsiSignal::Oversold => 1,
            RsiSignal::Overbought => -1,
            RsiSignal::Neutral => 0,
        };

    Signals {
        rsi_signal,
        trend_short,
        trend_long,
        sma_cross,
        macd_signal,
        overall_signal: overall_signal(score),
    }
}

/// Locally generated stand-in used when the analysis service cannot be used.
/// Values are plausible draws, not computed indicators.
pub fn synthetic_analysis<R: Rng + ?Sized>(
    rng: &mut R,
    symbol: &str,
    series: &CandleSeries,
    generated_at: &str,
) -> AnalysisResult {
    let price = series.last().map(|c| c.close).unwrap_or(DEFAULT_PRICE);

    let macd_line = rng.random_range(-100.0..=100.0);
    let macd_signal = macd_line + rng.random_range(-10.0..=10.0);
    let indicators = Indicators {
        rsi: rng.random_range(30.0..=70.0),
        sma20: price * rng.random_range(0.98..=1.02),
        sma50: price * rng.random_range(0.95..=1.05),
        ema20: price * rng.random_range(0.98..=1.02),
        sma200: price * rng.random_range(0.85..=1.15),
        macd_line,
        macd_signal,
        macd_histogram: macd_line - macd_signal,
    };
    let levels = Levels {
        support: price * rng.random_range(0.95..=0.98),
        resistance: price * rng.random_range(1.02..=1.05),
    };
    let signals = derive_signals(price, &indicators);

    let analysis = format!(
        "Synthetic analysis: {symbol} shows a {} short-term and {} long-term trend.",
        signals.trend_short, signals.trend_long
    );

    AnalysisResult {
        symbol: symbol.to_string(),
        current_price: price,
        timestamp: generated_at.to_string(),
        indicators,
        levels,
        signals,
        analysis,
        source: AnalysisSource::Synthetic,
    }
}
