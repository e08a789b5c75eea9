//! Environment-driven settings.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::channels::Platform;

/// Environment variable to disable all notifications.
pub const ENV_NOTIFY_DISABLED: &str = "NOTIFY_DISABLED";
/// Environment variable overriding the Lark bot base URL.
pub const ENV_LARK_BOT_URL: &str = "LARK_BOT_URL";
/// Environment variable overriding the Slack webhook base URL.
pub const ENV_SLACK_WEBHOOK_BASE_URL: &str = "SLACK_WEBHOOK_BASE_URL";
/// Environment variable overriding the DingTalk robot base URL.
pub const ENV_DINGTALK_BOT_URL: &str = "DINGTALK_BOT_URL";
/// Environment variable overriding the WeChat Work robot base URL.
pub const ENV_WECOM_BOT_URL: &str = "WECOM_BOT_URL";

/// Webhook base URLs. The config's secret key is appended verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformEndpoints {
    pub lark: String,
    pub slack: String,
    pub dingtalk: String,
    pub wecom: String,
}

impl Default for PlatformEndpoints {
    fn default() -> Self {
        Self {
            lark: "https://open.feishu.cn/open-apis/bot/v2/hook/".to_string(),
            slack: "https://hooks.slack.com/services/".to_string(),
            dingtalk: "https://oapi.dingtalk.com/robot/send?access_token=".to_string(),
            wecom: "https://qyapi.weixin.qq.com/cgi-bin/webhook/send?key=".to_string(),
        }
    }
}

impl PlatformEndpoints {
    /// Point every platform at the same base URL (useful for local mocks).
    #[must_use]
    pub fn uniform(base: &str) -> Self {
        Self {
            lark: format!("{base}/lark/"),
            slack: format!("{base}/slack/"),
            dingtalk: format!("{base}/dingtalk?access_token="),
            wecom: format!("{base}/wecom?key="),
        }
    }

    /// Base URL for `platform`.
    #[must_use]
    pub fn base_url(&self, platform: Platform) -> &str {
        match platform {
            Platform::Lark => &self.lark,
            Platform::Slack => &self.slack,
            Platform::DingTalk => &self.dingtalk,
            Platform::WeCom => &self.wecom,
        }
    }

    fn apply_env(&mut self) {
        for (var, slot) in [
            (ENV_LARK_BOT_URL, &mut self.lark),
            (ENV_SLACK_WEBHOOK_BASE_URL, &mut self.slack),
            (ENV_DINGTALK_BOT_URL, &mut self.dingtalk),
            (ENV_WECOM_BOT_URL, &mut self.wecom),
        ] {
            if let Ok(url) = std::env::var(var) {
                if !url.trim().is_empty() {
                    debug!(var, "Overriding webhook base URL");
                    *slot = url;
                }
            }
        }
    }
}

/// Settings for building a [`Notifier`](crate::Notifier).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifySettings {
    pub disabled: bool,
    pub endpoints: PlatformEndpoints,
}

impl NotifySettings {
    /// Load settings from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        let disabled = std::env::var(ENV_NOTIFY_DISABLED)
            .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
            .unwrap_or(false);

        if disabled {
            info!("Notifications disabled via NOTIFY_DISABLED");
        }

        let mut endpoints = PlatformEndpoints::default();
        endpoints.apply_env();

        Self {
            disabled,
            endpoints,
        }
    }
}
