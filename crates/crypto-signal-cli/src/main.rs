mod config;
mod pipeline;
mod telegram;

use std::time::Duration;

use anyhow::{Context, Result};
use clap::builder::RangedU64ValueParser;
use clap::{Parser, Subcommand};
use crypto_signal_analysis::{Analyzer, GeminiClient, RetryPolicy};
use crypto_signal_core::candle::Interval;
use crypto_signal_providers::ProviderChain;
use tracing::{info, warn};

use crate::config::{Config, WATCH_LIST};
use crate::pipeline::Pipeline;
use crate::telegram::TelegramNotifier;

#[derive(Parser)]
#[command(
    name = "crypto-signal",
    about = "Fetch crypto candles, request AI technical analysis and send Telegram alerts"
)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze every watched symbol and alert on notable signals
    Run {
        /// Log alerts instead of sending them
        #[arg(long)]
        dry_run: bool,

        /// Pause between symbols, in seconds
        #[arg(long, default_value_t = 2)]
        delay_secs: u64,

        /// Candles to fetch per symbol
        #[arg(long, default_value_t = 200, value_parser = limit_parser())]
        limit: usize,
    },

    /// Fetch candles for one symbol through the provider chain
    Fetch {
        /// Trading pair, e.g. BTCUSDT
        #[arg(short, long)]
        symbol: String,

        #[arg(long, default_value_t = 200, value_parser = limit_parser())]
        limit: usize,

        /// Candle interval: 1m, 5m, 15m, 1h
        #[arg(long, default_value = "5m")]
        interval: Interval,
    },
}

fn limit_parser() -> RangedU64ValueParser<usize> {
    RangedU64ValueParser::new().range(1..)
}

async fn cmd_run(config: &Config, dry_run: bool, delay_secs: u64, limit: usize) -> Result<()> {
    let chain = ProviderChain::with_default_providers();
    info!("Provider chain: {}", chain.provider_names().join(" -> "));

    let analyzer = Analyzer::new(
        GeminiClient::new(config.gemini_api_key.clone(), config.gemini_model.clone()),
        RetryPolicy::default(),
    );
    let notifier = if dry_run {
        warn!("Dry run: alerts will be logged, not sent");
        None
    } else {
        Some(TelegramNotifier::new(
            config.telegram_bot_token.clone(),
            config.telegram_chat_id.clone(),
        ))
    };

    let pipeline = Pipeline::new(
        chain,
        analyzer,
        notifier,
        limit,
        Duration::from_secs(delay_secs),
    );
    let outcomes = pipeline.run(&WATCH_LIST).await;

    let failed = outcomes.iter().filter(|(_, o)| o.is_none()).count();
    info!(
        "Run complete: {} symbol(s), {failed} delivery failure(s)",
        outcomes.len()
    );
    Ok(())
}

async fn cmd_fetch(symbol: &str, limit: usize, interval: Interval) -> Result<()> {
    let symbol = symbol.to_uppercase();
    let series = ProviderChain::with_default_providers()
        .fetch_candles(&symbol, interval, limit)
        .await;

    println!(
        "{symbol}: {} candle(s) at {} from {}",
        series.len(),
        series.interval,
        series.source
    );
    if let Some(last) = series.last() {
        println!(
            "last: t={} o={} h={} l={} c={} v={}",
            last.timestamp, last.open, last.high, last.low, last.close, last.volume
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level)),
        )
        .init();

    match &cli.command {
        Commands::Run {
            dry_run,
            delay_secs,
            limit,
        } => {
            let config = Config::from_env().context("invalid configuration")?;
            cmd_run(&config, *dry_run, *delay_secs, *limit).await?;
        }
        Commands::Fetch {
            symbol,
            limit,
            interval,
        } => {
            cmd_fetch(symbol, *limit, *interval).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn parse_run_defaults() {
        let cli = Cli::try_parse_from(["crypto-signal", "run"]).unwrap();
        match cli.command {
            Commands::Run {
                dry_run,
                delay_secs,
                limit,
            } => {
                assert!(!dry_run);
                assert_eq!(delay_secs, 2);
                assert_eq!(limit, 200);
            }
            _ => panic!("expected Run command"),
        }
        assert_eq!(cli.log_level, "info");
    }

    #[test]
    fn parse_run_args() {
        let cli = Cli::try_parse_from([
            "crypto-signal",
            "--log-level",
            "debug",
            "run",
            "--dry-run",
            "--delay-secs",
            "0",
            "--limit",
            "100",
        ])
        .unwrap();

        assert_eq!(cli.log_level, "debug");
        match cli.command {
            Commands::Run {
                dry_run,
                delay_secs,
                limit,
            } => {
                assert!(dry_run);
                assert_eq!(delay_secs, 0);
                assert_eq!(limit, 100);
            }
            _ => panic!("expected Run command"),
        }
    }

    #[test]
    fn parse_fetch_args() {
        let cli = Cli::try_parse_from([
            "crypto-signal",
            "fetch",
            "-s",
            "ethusdt",
            "--interval",
            "1h",
            "--limit",
            "20",
        ])
        .unwrap();

        match cli.command {
            Commands::Fetch {
                symbol,
                limit,
                interval,
            } => {
                assert_eq!(symbol, "ethusdt");
                assert_eq!(limit, 20);
                assert_eq!(interval, Interval::OneHour);
            }
            _ => panic!("expected Fetch command"),
        }
    }

    #[test]
    fn parse_fetch_defaults() {
        let cli = Cli::try_parse_from(["crypto-signal", "fetch", "-s", "BTCUSDT"]).unwrap();
        match cli.command {
            Commands::Fetch {
                limit, interval, ..
            } => {
                assert_eq!(limit, 200);
                assert_eq!(interval, Interval::FiveMinutes);
            }
            _ => panic!("expected Fetch command"),
        }
    }

    #[test]
    fn fetch_rejects_unknown_interval() {
        assert!(
            Cli::try_parse_from(["crypto-signal", "fetch", "-s", "BTCUSDT", "--interval", "4h"])
                .is_err()
        );
    }

    #[test]
    fn zero_limit_is_rejected() {
        assert!(Cli::try_parse_from(["crypto-signal", "run", "--limit", "0"]).is_err());
        assert!(
            Cli::try_parse_from(["crypto-signal", "fetch", "-s", "BTCUSDT", "--limit", "0"])
                .is_err()
        );
    }

    #[test]
    fn fetch_requires_symbol() {
        assert!(Cli::try_parse_from(["crypto-signal", "fetch"]).is_err());
    }
}
