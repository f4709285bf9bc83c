use crypto_signal_analysis::gemini::DEFAULT_MODEL;
use thiserror::Error;

/// Symbols processed on every run, in order, with their display names.
pub const WATCH_LIST: [(&str, &str); 3] = [
    ("BTCUSDT", "Bitcoin"),
    ("ETHUSDT", "Ethereum"),
    ("CROUSDT", "Cronos"),
];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} not set")]
    Missing(&'static str),
}

/// Secrets and settings read once at startup.
#[derive(Clone, PartialEq, Eq)]
pub struct Config {
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub telegram_bot_token: String,
    pub telegram_chat_id: String,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("gemini_api_key", &"<redacted>")
            .field("gemini_model", &self.gemini_model)
            .field("telegram_bot_token", &"<redacted>")
            .field("telegram_chat_id", &self.telegram_chat_id)
            .finish()
    }
}

impl Config {
    /// Read from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Blank values count as missing.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let require = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));

        Ok(Self {
            gemini_api_key: require("GEMINI_API_KEY")?,
            gemini_model: get("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            telegram_bot_token: require("TELEGRAM_BOT_TOKEN")?,
            telegram_chat_id: require("TELEGRAM_CHAT_ID")?,
        })
    }
}
