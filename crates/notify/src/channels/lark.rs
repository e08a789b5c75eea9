//! Lark (Feishu) custom bot handler.

use async_trait::async_trait;
use chrono::Local;
use serde::Serialize;
use std::sync::Arc;

use crate::channels::{deliver, Delivery, Platform, PlatformHandler};
use crate::error::NotifyError;
use crate::events::{AlarmEvent, ChangeEvent, NotifyConfig};
use crate::mention;
use crate::template::{EventKind, MessageRenderer, TemplateSet};
use crate::transport::Transport;

const ALARM_TEMPLATE: &str = "\
**Environment:** {{active}}
**Thread pool:** {{thread_pool_id}}
**Application:** {{app_name}}
**Instance:** {{identify}}
**Alarm type:** {{alarm_type}}
---
**Core pool size:** {{core_pool_size}}
**Maximum pool size:** {{maximum_pool_size}}
**Current pool size:** {{pool_size}}
**Active threads:** {{active_count}}
**Largest pool size:** {{largest_pool_size}}
**Completed tasks:** {{completed_task_count}}
---
**Queue type:** {{queue_name}}
**Queue capacity:** {{capacity}}
**Queue size:** {{queue_size}}
**Queue remaining:** {{remaining_capacity}}
---
**Rejection policy:** {{rejected_policy}}
**Rejected tasks:** {{reject_count}}
---
**Notify:** {{mentions}}
**Alarm interval:** {{interval}} min
**Sent at:** {{sent_at}}";

const CHANGE_TEMPLATE: &str = "\
**Environment:** {{active}}
**Thread pool:** {{thread_pool_id}}
**Application:** {{app_name}}
**Instance:** {{identify}}
---
**Core pool size:** {{change core_pool_size}}
**Maximum pool size:** {{change maximum_pool_size}}
**Core thread timeout:** {{change allow_core_thread_timeout}}
**Keep-alive (s):** {{change keep_alive_time}}
**Queue type:** {{queue_name}}
**Queue capacity:** {{change queue_capacity}}
**Rejection policy:** {{change rejected_policy}}
---
**Notify:** {{mentions}}
**Sent at:** {{sent_at}}";

/// Lark message templates.
pub const TEMPLATES: TemplateSet = TemplateSet {
    platform: "LARK",
    version: 1,
    alarm: ALARM_TEMPLATE,
    change: CHANGE_TEMPLATE,
};

/// Sends interactive cards to a Lark bot webhook.
pub struct LarkHandler {
    base_url: String,
    renderer: MessageRenderer,
    transport: Arc<dyn Transport>,
}

impl LarkHandler {
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

    fn webhook_url(&self, config: &NotifyConfig) -> String {
        format!("{}{}", self.base_url, config.secret_key)
    }

    async fn post(&self, config: &NotifyConfig, kind: EventKind, payload: &LarkPayload) -> Delivery {
        deliver(
            self.transport.as_ref(),
            Platform::Lark,
            kind,
            &self.webhook_url(config),
            payload,
        )
        .await
    }
}

#[async_trait]
impl PlatformHandler for LarkHandler {
    fn platform(&self) -> &str {
        Platform::Lark.as_str()
    }

    async fn send_alarm(
        &self,
        config: &NotifyConfig,
        event: &AlarmEvent,
    ) -> Result<Delivery, NotifyError> {
        let mentions = mention::LARK.format(config.resolve_receives(event.receives.as_deref()));
        let content = self.renderer.render_alarm(
            event,
            &mentions,
            config.resolve_interval(event.interval),
            &Local::now(),
        )?;
        let payload = LarkPayload::card(
            format!("[Alarm] {} {}", event.thread_pool_id, event.alarm_type),
            "red",
            content,
        );
        Ok(self.post(config, EventKind::Alarm, &payload).await)
    }

    async fn send_change(
        &self,
        config: &NotifyConfig,
        event: &ChangeEvent,
    ) -> Result<Delivery, NotifyError> {
        let mentions = mention::LARK.format(config.resolve_receives(event.receives.as_deref()));
        let content = self.renderer.render_change(event, &mentions, &Local::now())?;
        let payload = LarkPayload::card(
            format!("[Change] {}", event.thread_pool_id),
            "wathet",
            content,
        );
        Ok(self.post(config, EventKind::Change, &payload).await)
    }
}

// =============================================================================
// Lark API types
// =============================================================================

#[derive(Debug, Serialize)]
struct LarkPayload {
    msg_type: &'static str,
    card: LarkCard,
}

impl LarkPayload {
    fn card(title: String, template: &'static str, content: String) -> Self {
        Self {
            msg_type: "interactive",
            card: LarkCard {
                config: LarkCardConfig {
                    wide_screen_mode: true,
                },
                header: LarkHeader {
                    template,
                    title: LarkText {
                        tag: "plain_text",
                        content: title,
                    },
                },
                elements: vec![LarkText {
                    tag: "markdown",
                    content,
                }],
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct LarkCard {
    config: LarkCardConfig,
    header: LarkHeader,
    elements: Vec<LarkText>,
}

#[derive(Debug, Serialize)]
struct LarkCardConfig {
    wide_screen_mode: bool,
}

#[derive(Debug, Serialize)]
struct LarkHeader {
    template: &'static str,
    title: LarkText,
}

#[derive(Debug, Serialize)]
struct LarkText {
    tag: &'static str,
    content: String,
}
