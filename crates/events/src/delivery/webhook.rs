//! Chat webhook delivery.
//!
//! One POST per message with a 10 s deadline. A non-2xx reply counts as a
//! failed send; callers decide whether that matters.

use std::time::Duration;

use serde::Serialize;

/// HTTP request timeout for a single delivery attempt.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    /// The underlying HTTP request failed (network, DNS, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Webhook returned HTTP {0}")]
    HttpStatus(u16),
}

// ---------------------------------------------------------------------------
// Payload
// ---------------------------------------------------------------------------

/// Body accepted by Slack-style incoming webhooks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub text: String,
    pub username: String,
    pub icon_emoji: String,
}

#[async_trait::async_trait]
pub trait WebhookSink: Send + Sync {
    async fn post(&self, url: &str, message: &ChatMessage) -> Result<(), WebhookError>;
}

// ---------------------------------------------------------------------------
// WebhookDelivery
// ---------------------------------------------------------------------------

/// reqwest-backed [`WebhookSink`].
pub struct WebhookDelivery {
    client: reqwest::Client,
}

impl WebhookDelivery {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("Failed to build reqwest HTTP client");
        Self { client }
    }
}

impl Default for WebhookDelivery {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl WebhookSink for WebhookDelivery {
    async fn post(&self, url: &str, message: &ChatMessage) -> Result<(), WebhookError> {
        let response = self.client.post(url).json(message).send().await?;
        let status = response.status();
        if !status.is_success() {
            tracing::warn!(url, status = status.as_u16(), "Webhook returned non-2xx");
            return Err(WebhookError::HttpStatus(status.as_u16()));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn message() -> ChatMessage {
        ChatMessage {
            text: "크롤링 성공률 75.00%".into(),
            username: "MapleTrack".into(),
            icon_emoji: ":rotating_light:".into(),
        }
    }

    #[tokio::test]
    async fn posts_chat_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hook"))
            .and(body_json(serde_json::json!({
                "text": "크롤링 성공률 75.00%",
                "username": "MapleTrack",
                "icon_emoji": ":rotating_light:",
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        WebhookDelivery::new()
            .post(&format!("{}/hook", server.uri()), &message())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn non_2xx_is_a_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let err = WebhookDelivery::new()
            .post(&server.uri(), &message())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Webhook returned HTTP 502");
    }
}
