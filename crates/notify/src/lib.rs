//! Chat notifications for thread pool alarms and parameter changes.
//!
//! This crate renders thread pool events into platform-specific messages
//! and posts them to messaging webhooks (Lark, Slack, DingTalk, WeChat
//! Work). Delivery is best effort: a failed webhook call is logged and
//! reported as [`Delivery::Dropped`], never as an error, so alarm
//! dispatch cannot destabilize the monitor that raised the alarm.
//!
//! # Usage
//!
//! ```no_run
//! use pool_notify::{Notifier, NotifyConfig};
//! # use pool_notify::AlarmEvent;
//! # async fn example(event: AlarmEvent) -> Result<(), pool_notify::NotifyError> {
//! // Build handlers for every built-in platform from environment variables
//! let notifier = Notifier::from_env()?;
//!
//! let config = NotifyConfig::new("LARK", "webhook-token").with_receives("ou_123,alice");
//! let outcome = notifier.dispatch_alarm(&config, &event).await?;
//! if !outcome.is_sent() {
//!     // Already logged by the handler
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration
//!
//! [`settings::NotifySettings::from_env`] reads:
//!
//! - `NOTIFY_DISABLED`: set to "true" to turn every dispatch into a no-op
//! - `LARK_BOT_URL`, `SLACK_WEBHOOK_BASE_URL`, `DINGTALK_BOT_URL`,
//!   `WECOM_BOT_URL`: override webhook base URLs
//!
//! # Architecture
//!
//! - [`PlatformHandler`] renders and delivers for one platform
//! - [`registry::HandlerRegistry`] maps platform identifiers to handlers
//! - [`template::MessageRenderer`] renders named-field templates
//! - [`mention::MentionStyle`] formats recipient mentions
//! - [`transport::Transport`] performs the webhook call
//! - [`Notifier`] resolves the handler for each config and dispatches

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod channels;
pub mod error;
pub mod events;
pub mod gate;
pub mod mention;
pub mod registry;
pub mod settings;
pub mod template;
pub mod transport;

pub use channels::{Delivery, Platform, PlatformHandler};
pub use error::{DeliveryError, NotifyError};
pub use events::{AlarmEvent, AlarmType, Change, ChangeEvent, NotifyConfig};

use futures::future::join_all;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use gate::AlarmGate;
use registry::HandlerRegistry;
use settings::NotifySettings;

/// Central notification dispatcher.
///
/// Cheap to clone; clones share the registry and alarm gate.
#[derive(Clone)]
pub struct Notifier {
    registry: Arc<HandlerRegistry>,
    gate: Option<Arc<AlarmGate>>,
    disabled: bool,
}

impl Notifier {
    /// Create a notifier with every built-in handler, configured from
    /// environment variables.
    pub fn from_env() -> Result<Self, NotifyError> {
        Self::from_settings(&NotifySettings::from_env())
    }

    /// Create a notifier with every built-in handler.
    pub fn from_settings(settings: &NotifySettings) -> Result<Self, NotifyError> {
        if settings.disabled {
            return Ok(Self::disabled());
        }
        Ok(Self::new(HandlerRegistry::with_defaults(&settings.endpoints)?))
    }

    /// Create a notifier over a prepared registry.
    #[must_use]
    pub fn new(registry: HandlerRegistry) -> Self {
        if registry.is_empty() {
            warn!("No notification handlers registered");
        }
        Self {
            registry: Arc::new(registry),
            gate: None,
            disabled: false,
        }
    }

    /// Create a disabled notifier (for testing or when notifications are off).
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            registry: Arc::new(HandlerRegistry::new()),
            gate: None,
            disabled: true,
        }
    }

    /// Suppress repeat alarms through `gate`.
    #[must_use]
    pub fn with_gate(mut self, gate: Arc<AlarmGate>) -> Self {
        self.gate = Some(gate);
        self
    }

    #[must_use]
    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    #[must_use]
    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    /// Render and deliver an alarm through the handler for `config.platform`.
    ///
    /// Fails with [`NotifyError::UnknownPlatform`] when no handler is
    /// registered and with [`NotifyError::TemplateField`] when the event
    /// cannot be rendered. Delivery failures come back as
    /// [`Delivery::Dropped`].
    pub async fn dispatch_alarm(
        &self,
        config: &NotifyConfig,
        event: &AlarmEvent,
    ) -> Result<Delivery, NotifyError> {
        if self.disabled {
            debug!("Notifications disabled, skipping alarm");
            return Ok(Delivery::Skipped);
        }

        let handler = self.registry.resolve(&config.platform).inspect_err(|e| {
            warn!(error = %e, "Alarm dispatched to unregistered platform");
        })?;

        if let Some(gate) = &self.gate {
            if !gate.try_pass(
                &config.platform,
                &event.thread_pool_id,
                event.alarm_type,
                config.resolve_interval(event.interval),
            ) {
                info!(
                    platform = %config.platform,
                    thread_pool_id = %event.thread_pool_id,
                    alarm_type = %event.alarm_type,
                    "Alarm suppressed within interval"
                );
                return Ok(Delivery::Suppressed);
            }
        }

        handler.send_alarm(config, event).await.inspect_err(|e| {
            error!(platform = %config.platform, error = %e, "Failed to render alarm");
        })
    }

    /// Render and deliver a parameter change notice.
    ///
    /// Same error contract as [`Notifier::dispatch_alarm`]; change notices
    /// are never suppressed by the alarm gate.
    pub async fn dispatch_change(
        &self,
        config: &NotifyConfig,
        event: &ChangeEvent,
    ) -> Result<Delivery, NotifyError> {
        if self.disabled {
            debug!("Notifications disabled, skipping change notice");
            return Ok(Delivery::Skipped);
        }

        let handler = self.registry.resolve(&config.platform).inspect_err(|e| {
            warn!(error = %e, "Change notice dispatched to unregistered platform");
        })?;

        handler.send_change(config, event).await.inspect_err(|e| {
            error!(platform = %config.platform, error = %e, "Failed to render change notice");
        })
    }

    /// Dispatch one alarm to several platform configs concurrently.
    ///
    /// Each config's result is independent of the others.
    pub async fn dispatch_alarm_all(
        &self,
        configs: &[NotifyConfig],
        event: &AlarmEvent,
    ) -> Vec<(String, Result<Delivery, NotifyError>)> {
        join_all(configs.iter().map(|config| async move {
            (config.platform.clone(), self.dispatch_alarm(config, event).await)
        }))
        .await
    }

    /// Dispatch one change notice to several platform configs concurrently.
    pub async fn dispatch_change_all(
        &self,
        configs: &[NotifyConfig],
        event: &ChangeEvent,
    ) -> Vec<(String, Result<Delivery, NotifyError>)> {
        join_all(configs.iter().map(|config| async move {
            (config.platform.clone(), self.dispatch_change(config, event).await)
        }))
        .await
    }

    /// Dispatch an alarm on a background task (fire-and-forget).
    ///
    /// Errors are logged; the handle only reports task completion.
    pub fn spawn_alarm(&self, config: NotifyConfig, event: AlarmEvent) -> JoinHandle<()> {
        let notifier = self.clone();
        tokio::spawn(async move {
            if let Err(e) = notifier.dispatch_alarm(&config, &event).await {
                error!(platform = %config.platform, error = %e, "Alarm dispatch failed");
            }
        })
    }

    /// Dispatch a change notice on a background task (fire-and-forget).
    pub fn spawn_change(&self, config: NotifyConfig, event: ChangeEvent) -> JoinHandle<()> {
        let notifier = self.clone();
        tokio::spawn(async move {
            if let Err(e) = notifier.dispatch_change(&config, &event).await {
                error!(platform = %config.platform, error = %e, "Change dispatch failed");
            }
        })
    }
}
