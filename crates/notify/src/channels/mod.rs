//! Platform handler implementations.

pub mod dingtalk;
pub mod lark;
pub mod slack;
pub mod wecom;

use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use tracing::{debug, error};

use crate::error::{DeliveryError, NotifyError};
use crate::events::{AlarmEvent, ChangeEvent, NotifyConfig};
use crate::template::EventKind;
use crate::transport::Transport;

/// Built-in messaging platforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    Lark,
    Slack,
    DingTalk,
    WeCom,
}

impl Platform {
    /// Identifier used in [`NotifyConfig::platform`].
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Lark => "LARK",
            Self::Slack => "SLACK",
            Self::DingTalk => "DING",
            Self::WeCom => "WECHAT",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one handler invocation.
///
/// Delivery failures are reported here instead of as errors: a missed
/// notification must never fail the monitoring loop that raised it.
#[derive(Debug)]
#[must_use]
pub enum Delivery {
    /// The webhook accepted the message
    Sent,
    /// Delivery failed; the error was logged and dropped
    Dropped(DeliveryError),
    /// An identical alarm was sent within the configured interval
    Suppressed,
    /// Notifications are disabled
    Skipped,
}

impl Delivery {
    #[must_use]
    pub const fn is_sent(&self) -> bool {
        matches!(self, Self::Sent)
    }

    #[must_use]
    pub const fn is_dropped(&self) -> bool {
        matches!(self, Self::Dropped(_))
    }
}

/// Renders and delivers notifications for one messaging platform.
#[async_trait]
pub trait PlatformHandler: Send + Sync {
    /// Identifier this handler is registered under.
    fn platform(&self) -> &str;

    /// Send a thread pool alarm.
    ///
    /// Returns `Err` only when the event cannot be rendered.
    async fn send_alarm(
        &self,
        config: &NotifyConfig,
        event: &AlarmEvent,
    ) -> Result<Delivery, NotifyError>;

    /// Send a thread pool parameter change notice.
    ///
    /// Returns `Err` only when the event cannot be rendered.
    async fn send_change(
        &self,
        config: &NotifyConfig,
        event: &ChangeEvent,
    ) -> Result<Delivery, NotifyError>;
}

/// Serialize `payload`, hand it to the transport, and log the outcome.
pub(crate) async fn deliver<P: Serialize + Sync>(
    transport: &dyn Transport,
    platform: Platform,
    kind: EventKind,
    url: &str,
    payload: &P,
) -> Delivery {
    let result = match serde_json::to_value(payload) {
        Ok(body) => transport.deliver(url, &body).await,
        Err(e) => Err(DeliveryError::from(e)),
    };

    match result {
        Ok(()) => {
            debug!(platform = %platform, kind = kind.as_str(), "Notification sent");
            Delivery::Sent
        }
        Err(e) => {
            error!(
                platform = %platform,
                kind = kind.as_str(),
                error = %e,
                "Failed to send notification"
            );
            Delivery::Dropped(e)
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_deliver_turns_failure_into_dropped() {
        let transport = testing::RecordingTransport::failing();
        let outcome = deliver(
            &transport,
            Platform::Slack,
            EventKind::Alarm,
            "http://mock/slack/key",
            &serde_json::json!({"text": "x"}),
        )
        .await;
        assert!(outcome.is_dropped());
        assert_eq!(transport.count(), 1);
    }
}
