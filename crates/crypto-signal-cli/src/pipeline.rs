use std::time::Duration;

use chrono::Utc;
use crypto_signal_analysis::Analyzer;
use crypto_signal_core::alert::{render_message, should_notify};
use crypto_signal_core::candle::Interval;
use crypto_signal_providers::ProviderChain;
use tracing::{error, info};

use crate::telegram::{NotifyError, TelegramNotifier};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Nothing crossed an alert threshold.
    Quiet,
    Sent,
    /// Alert rendered and logged but not delivered.
    DryRun,
}

/// Fetch, analyze and alert for each watched symbol in turn.
pub struct Pipeline {
    chain: ProviderChain,
    analyzer: Analyzer,
    /// `None` runs without delivering.
    notifier: Option<TelegramNotifier>,
    interval: Interval,
    limit: usize,
    delay: Duration,
}

impl Pipeline {
    pub fn new(
        chain: ProviderChain,
        analyzer: Analyzer,
        notifier: Option<TelegramNotifier>,
        limit: usize,
        delay: Duration,
    ) -> Self {
        Self {
            chain,
            analyzer,
            notifier,
            interval: Interval::default(),
            limit,
            delay,
        }
    }

    pub async fn process_symbol(
        &self,
        symbol: &str,
        display_name: &str,
    ) -> Result<Outcome, NotifyError> {
        let series = self
            .chain
            .fetch_candles(symbol, self.interval, self.limit)
            .await;
        let result = self.analyzer.analyze(symbol, &series).await;

        if !should_notify(&result) {
            info!(
                "{symbol}: no alert (overall {}, rsi {:.1})",
                result.signals.overall_signal, result.indicators.rsi
            );
            return Ok(Outcome::Quiet);
        }

        let message = render_message(&result, display_name, series.source, Utc::now());
        match &self.notifier {
            Some(notifier) => {
                notifier.send_message(&message).await?;
                info!("{symbol}: alert sent");
                Ok(Outcome::Sent)
            }
            None => {
                info!("{symbol}: dry run, alert not sent:\n{message}");
                Ok(Outcome::DryRun)
            }
        }
    }

    /// Process every symbol; a failing symbol is logged and skipped.
    pub async fn run(&self, watch_list: &[(&str, &str)]) -> Vec<(String, Option<Outcome>)> {
        let mut outcomes = Vec::with_capacity(watch_list.len());

        for (i, (symbol, display_name)) in watch_list.iter().enumerate() {
            if i > 0 && !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }

            info!("{symbol}: processing {display_name}");
            let outcome = match self.process_symbol(symbol, display_name).await {
                Ok(outcome) => Some(outcome),
                Err(e) => {
                    error!("{symbol}: alert delivery failed: {e}");
                    None
                }
            };
            outcomes.push((symbol.to_string(), outcome));
        }

        outcomes
    }
}
