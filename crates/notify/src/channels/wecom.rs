//! WeChat Work (WeCom) group robot handler.

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
### <font color=\"warning\">[Alarm]</font> {{thread_pool_id}}
> Environment: <font color=\"comment\">{{active}}</font>
> Application: <font color=\"comment\">{{app_name}}</font>
> Instance: <font color=\"comment\">{{identify}}</font>
> Alarm type: <font color=\"warning\">{{alarm_type}}</font>

> Core / max pool size: {{core_pool_size}} / {{maximum_pool_size}}
> Current / active / largest: {{pool_size}} / {{active_count}} / {{largest_pool_size}}
> Completed tasks: {{completed_task_count}}
> Queue: {{queue_name}} (capacity {{capacity}}, size {{queue_size}}, remaining {{remaining_capacity}})
> Rejection: {{rejected_policy}}, rejected {{reject_count}}

Notify: {{mentions}}
Alarm interval: {{interval}} min
Sent at: {{sent_at}}";

const CHANGE_TEMPLATE: &str = "\
### <font color=\"info\">[Change]</font> {{thread_pool_id}}
> Environment: <font color=\"comment\">{{active}}</font>
> Application: <font color=\"comment\">{{app_name}}</font>
> Instance: <font color=\"comment\">{{identify}}</font>

> Core pool size: {{change core_pool_size}}
> Maximum pool size: {{change maximum_pool_size}}
> Core thread timeout: {{change allow_core_thread_timeout}}
> Keep-alive (s): {{change keep_alive_time}}
> Queue: {{queue_name}}, capacity {{change queue_capacity}}
> Rejection policy: {{change rejected_policy}}

Notify: {{mentions}}
Sent at: {{sent_at}}";

/// WeChat Work message templates.
pub const TEMPLATES: TemplateSet = TemplateSet {
    platform: "WECHAT",
    version: 1,
    alarm: ALARM_TEMPLATE,
    change: CHANGE_TEMPLATE,
};

/// Sends markdown messages to a WeChat Work group robot.
pub struct WeComHandler {
    base_url: String,
    renderer: MessageRenderer,
    transport: Arc<dyn Transport>,
}

impl WeComHandler {
    /// Create a handler posting to `base_url` + robot key.
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

    async fn post(&self, config: &NotifyConfig, kind: EventKind, content: String) -> Delivery {
        let url = format!("{}{}", self.base_url, config.secret_key);
        let payload = WeComPayload {
            msgtype: "markdown",
            markdown: WeComMarkdown { content },
        };
        deliver(self.transport.as_ref(), Platform::WeCom, kind, &url, &payload).await
    }
}

#[async_trait]
impl PlatformHandler for WeComHandler {
    fn platform(&self) -> &str {
        Platform::WeCom.as_str()
    }

    async fn send_alarm(
        &self,
        config: &NotifyConfig,
        event: &AlarmEvent,
    ) -> Result<Delivery, NotifyError> {
        let mentions = mention::WECOM.format(config.resolve_receives(event.receives.as_deref()));
        let content = self.renderer.render_alarm(
            event,
            &mentions,
            config.resolve_interval(event.interval),
            &Local::now(),
        )?;
        Ok(self.post(config, EventKind::Alarm, content).await)
    }

    async fn send_change(
        &self,
        config: &NotifyConfig,
        event: &ChangeEvent,
    ) -> Result<Delivery, NotifyError> {
        let mentions = mention::WECOM.format(config.resolve_receives(event.receives.as_deref()));
        let content = self.renderer.render_change(event, &mentions, &Local::now())?;
        Ok(self.post(config, EventKind::Change, content).await)
    }
}

#[derive(Debug, Serialize)]
struct WeComPayload {
    msgtype: &'static str,
    markdown: WeComMarkdown,
}

#[derive(Debug, Serialize)]
struct WeComMarkdown {
    content: String,
}
