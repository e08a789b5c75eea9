//! Thread pool notification event types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Separator placed between the old and new value of a changed parameter.
pub const CHANGE_SEPARATOR: &str = "  ➲  ";

/// Notification settings for one platform target.
///
/// Supplied by the caller's configuration storage and read-only during a
/// dispatch.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotifyConfig {
    /// Platform identifier, matched case-sensitively against registered handlers
    pub platform: String,
    /// Webhook token appended to the platform base URL
    pub secret_key: String,
    /// Default comma-separated recipients
    #[serde(default)]
    pub receives: String,
    /// Default alarm interval in minutes, used when the event carries none
    #[serde(default)]
    pub interval: u64,
    /// DingTalk "additional signature" secret
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signing_secret: Option<String>,
}

impl NotifyConfig {
    /// Create a config without a signing secret.
    #[must_use]
    pub fn new(platform: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            platform: platform.into(),
            secret_key: secret_key.into(),
            receives: String::new(),
            interval: 0,
            signing_secret: None,
        }
    }

    #[must_use]
    pub fn with_receives(mut self, receives: impl Into<String>) -> Self {
        self.receives = receives.into();
        self
    }

    #[must_use]
    pub fn with_interval(mut self, minutes: u64) -> Self {
        self.interval = minutes;
        self
    }

    #[must_use]
    pub fn with_signing_secret(mut self, secret: impl Into<String>) -> Self {
        self.signing_secret = Some(secret.into());
        self
    }

    /// Pick the event-level recipients when they are set, else the defaults.
    #[must_use]
    pub fn resolve_receives<'a>(&'a self, event_receives: Option<&'a str>) -> &'a str {
        match event_receives {
            Some(receives) if !receives.trim().is_empty() => receives,
            _ => &self.receives,
        }
    }

    /// Alarm interval in minutes: the event's when non-zero, else the default.
    ///
    /// Both the rendered message and the alarm gate use this value.
    #[must_use]
    pub const fn resolve_interval(&self, event_interval: u64) -> u64 {
        if event_interval == 0 {
            self.interval
        } else {
            event_interval
        }
    }
}

// Credentials stay out of logs.
impl fmt::Debug for NotifyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotifyConfig")
            .field("platform", &self.platform)
            .field("secret_key", &"***")
            .field("receives", &self.receives)
            .field("interval", &self.interval)
            .field(
                "signing_secret",
                &self.signing_secret.as_ref().map(|_| "***"),
            )
            .finish()
    }
}

/// Kind of condition that raised an alarm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlarmType {
    /// Queue usage crossed the capacity threshold
    Capacity,
    /// Active thread ratio crossed the liveness threshold
    Liveness,
    /// Tasks were rejected
    Reject,
    /// A task ran longer than its execute timeout
    RunTimeout,
    /// A task waited in the queue longer than its timeout
    QueueTimeout,
}

impl AlarmType {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Capacity => "CAPACITY",
            Self::Liveness => "LIVENESS",
            Self::Reject => "REJECT",
            Self::RunTimeout => "RUN_TIMEOUT",
            Self::QueueTimeout => "QUEUE_TIMEOUT",
        }
    }
}

impl fmt::Display for AlarmType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of a thread pool's runtime state when an alarm fired.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlarmEvent {
    /// Environment (profile) the application runs in
    pub active: String,
    pub thread_pool_id: String,
    pub app_name: String,
    /// Instance identity, usually `ip:port`
    pub identify: String,
    pub alarm_type: AlarmType,

    pub core_pool_size: u32,
    pub maximum_pool_size: u32,
    /// Current number of threads
    pub pool_size: u32,
    pub active_count: u32,
    pub largest_pool_size: u32,
    pub completed_task_count: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub queue_name: Option<String>,
    pub capacity: u32,
    pub queue_size: u32,
    pub remaining_capacity: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejected_policy: Option<String>,
    pub reject_count: u64,

    /// Recipient override, comma-separated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receives: Option<String>,
    /// Alarm interval in minutes, `0` to use [`NotifyConfig::interval`]
    #[serde(default)]
    pub interval: u64,
}

/// Before/after pair for one tunable parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Change<T> {
    pub before: T,
    pub now: T,
}

impl<T> Change<T> {
    pub const fn new(before: T, now: T) -> Self {
        Self { before, now }
    }
}

impl<T: PartialEq> Change<T> {
    #[must_use]
    pub fn is_changed(&self) -> bool {
        self.before != self.now
    }
}

impl<T: fmt::Display> fmt::Display for Change<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{CHANGE_SEPARATOR}{}", self.before, self.now)
    }
}

/// Parameters of a thread pool before and after a configuration change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub active: String,
    pub thread_pool_id: String,
    pub app_name: String,
    pub identify: String,

    pub core_pool_size: Change<u32>,
    pub maximum_pool_size: Change<u32>,
    pub allow_core_thread_timeout: Change<bool>,
    /// Keep-alive time in seconds
    pub keep_alive_time: Change<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub queue_name: Option<String>,
    pub queue_capacity: Change<u32>,
    pub rejected_policy: Change<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receives: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_change_display() {
        assert_eq!(Change::new(2, 4).to_string(), "2  ➲  4");
        assert_eq!(Change::new(true, false).to_string(), "true  ➲  false");
    }

    #[test]
    fn test_change_is_changed() {
        assert!(Change::new(2, 4).is_changed());
        assert!(!Change::new("Abort", "Abort").is_changed());
    }

    #[test]
    fn test_resolve_receives_prefers_event() {
        let config = NotifyConfig::new("LARK", "key").with_receives("alice");
        assert_eq!(config.resolve_receives(Some("bob")), "bob");
        assert_eq!(config.resolve_receives(Some("  ")), "alice");
        assert_eq!(config.resolve_receives(None), "alice");
    }

    #[test]
    fn test_resolve_interval_prefers_event() {
        let config = NotifyConfig::new("LARK", "key").with_interval(10);
        assert_eq!(config.resolve_interval(5), 5);
        assert_eq!(config.resolve_interval(0), 10);
        assert_eq!(NotifyConfig::new("LARK", "key").resolve_interval(0), 0);
    }

    #[test]
    fn test_config_debug_redacts_secrets() {
        let config = NotifyConfig::new("DING", "token-abc").with_signing_secret("SEC123");
        let debug = format!("{config:?}");
        assert!(!debug.contains("token-abc"));
        assert!(!debug.contains("SEC123"));
        assert!(debug.contains("DING"));
    }

    #[test]
    fn test_alarm_type_serializes_screaming() {
        let json = serde_json::to_string(&AlarmType::RunTimeout).unwrap();
        assert_eq!(json, "\"RUN_TIMEOUT\"");
        assert_eq!(AlarmType::Capacity.to_string(), "CAPACITY");
    }
}
