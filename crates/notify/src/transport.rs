//! Webhook delivery.

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::error::DeliveryError;

/// Sends a rendered payload to a webhook endpoint.
///
/// Implementations make one attempt and report failure to the calling
/// handler; they never retry.
#[async_trait]
pub trait Transport: Send + Sync {
    /// POST `payload` as JSON to `url`.
    async fn deliver(&self, url: &str, payload: &Value) -> Result<(), DeliveryError>;
}

/// [`Transport`] backed by a shared `reqwest` client with default settings.
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn deliver(&self, url: &str, payload: &Value) -> Result<(), DeliveryError> {
        // The URL carries the webhook key; keep it out of error messages.
        let response = self
            .client
            .post(url)
            .json(payload)
            .send()
            .await
            .map_err(|e| DeliveryError::Http(e.without_url()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| DeliveryError::Http(e.without_url()))?;

        if !status.is_success() {
            return Err(DeliveryError::Status {
                status: status.as_u16(),
                body,
            });
        }

        check_ack(&body)?;
        debug!(status = %status, "Webhook accepted message");
        Ok(())
    }
}

/// Inspect a 2xx response body for an application-level rejection.
///
/// Lark answers `{"code":0}` (older bots `{"StatusCode":0}`), DingTalk and
/// WeChat Work answer `{"errcode":0}`. Slack answers plain `ok`.
pub fn check_ack(body: &str) -> Result<(), DeliveryError> {
    let Ok(Value::Object(ack)) = serde_json::from_str::<Value>(body) else {
        return Ok(());
    };

    let code = ["code", "errcode", "StatusCode"]
        .iter()
        .find_map(|key| ack.get(*key).and_then(Value::as_i64));

    match code {
        Some(code) if code != 0 => {
            let message = ["msg", "errmsg", "StatusMessage"]
                .iter()
                .find_map(|key| ack.get(*key).and_then(Value::as_str))
                .unwrap_or("unknown")
                .to_string();
            Err(DeliveryError::Rejected { code, message })
        }
        _ => Ok(()),
    }
}
