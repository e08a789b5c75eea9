//! DingTalk custom robot handler.
//!
//! Robots created with the "additional signature" security setting need
//! every request URL signed with the robot secret; set
//! [`NotifyConfig::signing_secret`] for those.

use async_trait::async_trait;
use base64::Engine;
use chrono::{Local, Utc};
use hmac::{Hmac, Mac};
use serde::Serialize;
use sha2::Sha256;
use std::sync::Arc;

use crate::channels::{deliver, Delivery, Platform, PlatformHandler};
use crate::error::{DeliveryError, NotifyError};
use crate::events::{AlarmEvent, ChangeEvent, NotifyConfig};
use crate::mention;
use crate::template::{EventKind, MessageRenderer, TemplateSet};
use crate::transport::Transport;

type HmacSha256 = Hmac<Sha256>;

const ALARM_TEMPLATE: &str = "\
### [Alarm] {{thread_pool_id}}

- **Environment:** {{active}}
- **Application:** {{app_name}}
- **Instance:** {{identify}}
- **Alarm type:** {{alarm_type}}
- **Core pool size:** {{core_pool_size}}
- **Maximum pool size:** {{maximum_pool_size}}
- **Current pool size:** {{pool_size}}
- **Active threads:** {{active_count}}
- **Largest pool size:** {{largest_pool_size}}
- **Completed tasks:** {{completed_task_count}}
- **Queue type:** {{queue_name}}
- **Queue capacity:** {{capacity}}
- **Queue size:** {{queue_size}}
- **Queue remaining:** {{remaining_capacity}}
- **Rejection policy:** {{rejected_policy}}
- **Rejected tasks:** {{reject_count}}

**Notify:** {{mentions}}

> Alarm interval {{interval}} min, sent at {{sent_at}}";

const CHANGE_TEMPLATE: &str = "\
### [Change] {{thread_pool_id}}

- **Environment:** {{active}}
- **Application:** {{app_name}}
- **Instance:** {{identify}}
- **Core pool size:** {{change core_pool_size}}
- **Maximum pool size:** {{change maximum_pool_size}}
- **Core thread timeout:** {{change allow_core_thread_timeout}}
- **Keep-alive (s):** {{change keep_alive_time}}
- **Queue type:** {{queue_name}}
- **Queue capacity:** {{change queue_capacity}}
- **Rejection policy:** {{change rejected_policy}}

**Notify:** {{mentions}}

> Sent at {{sent_at}}";

/// DingTalk message templates.
pub const TEMPLATES: TemplateSet = TemplateSet {
    platform: "DING",
    version: 1,
    alarm: ALARM_TEMPLATE,
    change: CHANGE_TEMPLATE,
};

/// Append DingTalk's `timestamp` and `sign` query parameters to `url`.
pub fn sign_url(url: &str, secret: &str, timestamp_ms: i64) -> Result<String, DeliveryError> {
    let string_to_sign = format!("{timestamp_ms}\n{secret}");

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| DeliveryError::Signing(e.to_string()))?;
    mac.update(string_to_sign.as_bytes());
    let sign = base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes());

    Ok(format!(
        "{url}&timestamp={timestamp_ms}&sign={}",
        urlencoding::encode(&sign)
    ))
}

/// Sends markdown messages to a DingTalk robot webhook.
pub struct DingTalkHandler {
    base_url: String,
    renderer: MessageRenderer,
    transport: Arc<dyn Transport>,
}

impl DingTalkHandler {
    /// Create a handler posting to `base_url` + access token.
    pub fn new(
        base_url: impl Into<String>,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, NotifyError> {
        Ok(Self {
            base_url: base_url.into(),
            renderer: MessageRenderer::new(&TEMPLATES)?,
            transport,
        })
    }

    fn webhook_url(&self, config: &NotifyConfig) -> Result<String, DeliveryError> {
        let url = format!("{}{}", self.base_url, config.secret_key);
        match config.signing_secret.as_deref() {
            Some(secret) if !secret.is_empty() => {
                sign_url(&url, secret, Utc::now().timestamp_millis())
            }
            _ => Ok(url),
        }
    }

    async fn post(&self, config: &NotifyConfig, kind: EventKind, payload: &DingTalkPayload) -> Delivery {
        match self.webhook_url(config) {
            Ok(url) => deliver(self.transport.as_ref(), Platform::DingTalk, kind, &url, payload).await,
            Err(e) => {
                tracing::error!(
                    platform = %Platform::DingTalk,
                    kind = kind.as_str(),
                    error = %e,
                    "Failed to sign DingTalk request"
                );
                Delivery::Dropped(e)
            }
        }
    }
}

#[async_trait]
impl PlatformHandler for DingTalkHandler {
    fn platform(&self) -> &str {
        Platform::DingTalk.as_str()
    }

    async fn send_alarm(
        &self,
        config: &NotifyConfig,
        event: &AlarmEvent,
    ) -> Result<Delivery, NotifyError> {
        let receives = config.resolve_receives(event.receives.as_deref());
        let text = self
            .renderer
            .render_alarm(
            event,
            &mention::DINGTALK.format(receives),
            config.resolve_interval(event.interval),
            &Local::now(),
        )?;

        let payload = DingTalkPayload::markdown(
            format!("[Alarm] {}", event.thread_pool_id),
            text,
            receives,
        );
        Ok(self.post(config, EventKind::Alarm, &payload).await)
    }

    async fn send_change(
        &self,
        config: &NotifyConfig,
        event: &ChangeEvent,
    ) -> Result<Delivery, NotifyError> {
        let receives = config.resolve_receives(event.receives.as_deref());
        let text = self
            .renderer
            .render_change(event, &mention::DINGTALK.format(receives), &Local::now())?;

        let payload = DingTalkPayload::markdown(
            format!("[Change] {}", event.thread_pool_id),
            text,
            receives,
        );
        Ok(self.post(config, EventKind::Change, &payload).await)
    }
}

// =============================================================================
// DingTalk API types
// =============================================================================

#[derive(Debug, Serialize)]
struct DingTalkPayload {
    msgtype: &'static str,
    markdown: DingTalkMarkdown,
    at: DingTalkAt,
}

impl DingTalkPayload {
    /// Mobile numbers go to `atMobiles`, everything else to `atUserIds`.
    fn markdown(title: String, text: String, receives: &str) -> Self {
        Self {
            msgtype: "markdown",
            markdown: DingTalkMarkdown { title, text },
            at: DingTalkAt {
                at_mobiles: mention::DINGTALK.structured_ids(receives),
                at_user_ids: mention::DINGTALK.usernames(receives),
                is_at_all: false,
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct DingTalkMarkdown {
    title: String,
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DingTalkAt {
    at_mobiles: Vec<String>,
    at_user_ids: Vec<String>,
    is_at_all: bool,
}
