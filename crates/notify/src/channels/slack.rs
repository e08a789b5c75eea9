//! Slack incoming-webhook handler.

use async_trait::async_trait;
use chrono::{Local, Utc};
use serde::Serialize;
use std::sync::Arc;

use crate::channels::{deliver, Delivery, Platform, PlatformHandler};
use crate::error::NotifyError;
use crate::events::{AlarmEvent, ChangeEvent, NotifyConfig};
use crate::mention;
use crate::template::{EventKind, MessageRenderer, TemplateSet, SENT_AT_FORMAT};
use crate::transport::Transport;

const ALARM_TEMPLATE: &str = "\
*Environment:* {{active}}
*Application:* {{app_name}}
*Instance:* {{identify}}
*Threads:* core `{{core_pool_size}}` / max `{{maximum_pool_size}}` / current `{{pool_size}}` / \
active `{{active_count}}` / largest `{{largest_pool_size}}`
*Completed tasks:* {{completed_task_count}}
*Queue:* `{{queue_name}}` capacity `{{capacity}}`, size `{{queue_size}}`, remaining `{{remaining_capacity}}`
*Rejection:* `{{rejected_policy}}`, rejected `{{reject_count}}`
*Notify:* {{mentions}}
*Alarm interval:* {{interval}} min";

const CHANGE_TEMPLATE: &str = "\
*Environment:* {{active}}
*Application:* {{app_name}}
*Instance:* {{identify}}
*Core pool size:* {{change core_pool_size}}
*Maximum pool size:* {{change maximum_pool_size}}
*Core thread timeout:* {{change allow_core_thread_timeout}}
*Keep-alive (s):* {{change keep_alive_time}}
*Queue:* `{{queue_name}}` capacity {{change queue_capacity}}
*Rejection policy:* {{change rejected_policy}}
*Notify:* {{mentions}}";

/// Slack message templates.
pub const TEMPLATES: TemplateSet = TemplateSet {
    platform: "SLACK",
    version: 1,
    alarm: ALARM_TEMPLATE,
    change: CHANGE_TEMPLATE,
};

const ALARM_COLOR: &str = "#e74c3c"; // Red
const CHANGE_COLOR: &str = "#3498db"; // Blue

/// Slack webhook notification handler.
pub struct SlackHandler {
    base_url: String,
    renderer: MessageRenderer,
    transport: Arc<dyn Transport>,
}

impl SlackHandler {
    /// Create a handler posting to `base_url` + secret key.
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

    fn format_payload(title: String, color: &str, text: String, footer: String) -> SlackPayload {
        SlackPayload {
            attachments: vec![SlackAttachment {
                fallback: title.clone(),
                color: color.to_string(),
                author_name: Some("Thread Pool Monitor".to_string()),
                title,
                text,
                footer: Some(footer),
                ts: Some(Utc::now().timestamp()),
            }],
        }
    }

    async fn post(&self, config: &NotifyConfig, kind: EventKind, payload: &SlackPayload) -> Delivery {
        let url = format!("{}{}", self.base_url, config.secret_key);
        deliver(self.transport.as_ref(), Platform::Slack, kind, &url, payload).await
    }
}

#[async_trait]
impl PlatformHandler for SlackHandler {
    fn platform(&self) -> &str {
        Platform::Slack.as_str()
    }

    async fn send_alarm(
        &self,
        config: &NotifyConfig,
        event: &AlarmEvent,
    ) -> Result<Delivery, NotifyError> {
        let mentions = mention::SLACK.format(config.resolve_receives(event.receives.as_deref()));
        let sent_at = Local::now();
        let text = self.renderer.render_alarm(
            event,
            &mentions,
            config.resolve_interval(event.interval),
            &sent_at,
        )?;

        let payload = Self::format_payload(
            format!("Alarm: {} ({})", event.thread_pool_id, event.alarm_type),
            ALARM_COLOR,
            text,
            format!("{} | {}", event.alarm_type, sent_at.format(SENT_AT_FORMAT)),
        );
        Ok(self.post(config, EventKind::Alarm, &payload).await)
    }

    async fn send_change(
        &self,
        config: &NotifyConfig,
        event: &ChangeEvent,
    ) -> Result<Delivery, NotifyError> {
        let mentions = mention::SLACK.format(config.resolve_receives(event.receives.as_deref()));
        let sent_at = Local::now();
        let text = self.renderer.render_change(event, &mentions, &sent_at)?;

        let payload = Self::format_payload(
            format!("Parameters changed: {}", event.thread_pool_id),
            CHANGE_COLOR,
            text,
            format!("CHANGE | {}", sent_at.format(SENT_AT_FORMAT)),
        );
        Ok(self.post(config, EventKind::Change, &payload).await)
    }
}

// =============================================================================
// Slack API types
// =============================================================================

#[derive(Debug, Serialize)]
struct SlackPayload {
    attachments: Vec<SlackAttachment>,
}

#[derive(Debug, Serialize)]
struct SlackAttachment {
    fallback: String,
    color: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    author_name: Option<String>,
    title: String,
    text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    footer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    ts: Option<i64>,
}
