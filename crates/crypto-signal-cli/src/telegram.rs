use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

const TELEGRAM_BASE_URL: &str = "https://api.telegram.org";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum NotifyError {
    /// The request URL carries the bot token, so it is stripped before wrapping.
    #[error("HTTP error: {0}")]
    Http(reqwest::Error),

    #[error("Telegram API error ({status}): {message}")]
    Api { status: u16, message: String },
}

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'a str,
    disable_web_page_preview: bool,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    description: Option<String>,
}

/// Delivers Markdown alerts to a single chat via the Bot API.
pub struct TelegramNotifier {
    client: Client,
    bot_token: String,
    chat_id: String,
    base_url: String,
}

impl TelegramNotifier {
    pub fn new(bot_token: String, chat_id: String) -> Self {
        Self::with_base_url(bot_token, chat_id, TELEGRAM_BASE_URL.to_string())
    }

    /// Create with a custom base URL (for testing).
    pub fn with_base_url(bot_token: String, chat_id: String, base_url: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .expect("failed to build reqwest client"),
            bot_token,
            chat_id,
            base_url,
        }
    }

    pub async fn send_message(&self, text: &str) -> Result<(), NotifyError> {
        let url = format!("{}/bot{}/sendMessage", self.base_url, self.bot_token);
        debug!("sending {} char message to chat {}", text.len(), self.chat_id);

        let response = self
            .client
            .post(&url)
            .json(&SendMessageRequest {
                chat_id: &self.chat_id,
                text,
                parse_mode: "Markdown",
                disable_web_page_preview: true,
            })
            .send()
            .await
            .map_err(|e| NotifyError::Http(e.without_url()))?;

        let status = response.status().as_u16();
        let success = response.status().is_success();
        let body = response.text().await.unwrap_or_default();

        // Bot API errors carry {"ok": false, "description": ...}.
        match serde_json::from_str::<ApiResponse>(&body) {
            Ok(ApiResponse { ok: true, .. }) if success => Ok(()),
            Ok(ApiResponse { description, .. }) => Err(NotifyError::Api {
                status,
                message: description.unwrap_or(body),
            }),
            Err(_) if success => Ok(()),
            Err(_) => Err(NotifyError::Api {
                status,
                message: body,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    #[tokio::test]
    async fn posts_markdown_without_preview() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/bot123:abc/sendMessage")
            .match_body(Matcher::Json(serde_json::json!({
                "chat_id": "-100200",
                "text": "*hello*",
                "parse_mode": "Markdown",
                "disable_web_page_preview": true
            })))
            .with_status(200)
            .with_body(r#"{"ok": true, "result": {"message_id": 7}}"#)
            .expect(1)
            .create_async()
            .await;

        let notifier =
            TelegramNotifier::with_base_url("123:abc".into(), "-100200".into(), server.url());
        notifier.send_message("*hello*").await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn api_rejection_is_an_error() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/bot123:abc/sendMessage")
            .with_status(400)
            .with_body(
                r#"{"ok": false, "error_code": 400, "description": "Bad Request: chat not found"}"#,
            )
            .create_async()
            .await;

        let notifier =
            TelegramNotifier::with_base_url("123:abc".into(), "-1".into(), server.url());
        let err = notifier.send_message("hi").await.unwrap_err();
        match err {
            NotifyError::Api { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "Bad Request: chat not found");
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn network_error_does_not_expose_token() {
        // Nothing listens on the discard port.
        let notifier = TelegramNotifier::with_base_url(
            "123456:SECRET-TOKEN".into(),
            "-1".into(),
            "http://127.0.0.1:9".into(),
        );
        let err = notifier.send_message("hi").await.unwrap_err();

        assert!(matches!(err, NotifyError::Http(_)));
        let printed = format!("{err} {err:?}");
        assert!(!printed.contains("SECRET-TOKEN"), "token leaked: {printed}");
    }

    #[tokio::test]
    async fn ok_false_with_success_status_is_an_error() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/bot123:abc/sendMessage")
            .with_status(200)
            .with_body(r#"{"ok": false, "description": "Forbidden: bot was blocked"}"#)
            .create_async()
            .await;

        let notifier =
            TelegramNotifier::with_base_url("123:abc".into(), "-1".into(), server.url());
        assert!(notifier.send_message("hi").await.is_err());
    }
}
