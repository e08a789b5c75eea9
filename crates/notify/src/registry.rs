//! Platform identifier to handler mapping.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

use crate::channels::dingtalk::DingTalkHandler;
use crate::channels::lark::LarkHandler;
use crate::channels::slack::SlackHandler;
use crate::channels::wecom::WeComHandler;
use crate::channels::{Platform, PlatformHandler};
use crate::error::NotifyError;
use crate::settings::PlatformEndpoints;
use crate::transport::{HttpTransport, Transport};

/// Registry of [`PlatformHandler`]s keyed by platform identifier.
///
/// Built once at startup and shared read-only afterwards.
///
/// # Examples
///
/// ```
/// use pool_notify::registry::HandlerRegistry;
/// use pool_notify::settings::PlatformEndpoints;
///
/// let registry = HandlerRegistry::with_defaults(&PlatformEndpoints::default()).unwrap();
/// assert!(registry.contains("LARK"));
/// assert!(registry.contains("DING"));
/// assert!(!registry.contains("lark"));
/// ```
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn PlatformHandler>>,
}

impl HandlerRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in handler sharing one HTTP transport.
    pub fn with_defaults(endpoints: &PlatformEndpoints) -> Result<Self, NotifyError> {
        Self::with_transport(endpoints, Arc::new(HttpTransport::new()))
    }

    /// Registry with every built-in handler sharing `transport`.
    pub fn with_transport(
        endpoints: &PlatformEndpoints,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, NotifyError> {
        let mut registry = Self::new();
        registry.register(Arc::new(LarkHandler::new(
            endpoints.base_url(Platform::Lark),
            Arc::clone(&transport),
        )?));
        registry.register(Arc::new(SlackHandler::new(
            endpoints.base_url(Platform::Slack),
            Arc::clone(&transport),
        )?));
        registry.register(Arc::new(DingTalkHandler::new(
            endpoints.base_url(Platform::DingTalk),
            Arc::clone(&transport),
        )?));
        registry.register(Arc::new(WeComHandler::new(
            endpoints.base_url(Platform::WeCom),
            transport,
        )?));

        info!(platforms = ?registry.platforms(), "Notification handlers registered");
        Ok(registry)
    }

    /// Register `handler` under its platform identifier.
    ///
    /// A second registration for the same identifier replaces the first;
    /// the replaced handler is returned.
    pub fn register(&mut self, handler: Arc<dyn PlatformHandler>) -> Option<Arc<dyn PlatformHandler>> {
        let platform = handler.platform().to_string();
        let previous = self.handlers.insert(platform.clone(), handler);
        if previous.is_some() {
            warn!(platform = %platform, "Replacing previously registered handler");
        }
        previous
    }

    /// Handler for `platform`, matched case-sensitively.
    #[must_use]
    pub fn get(&self, platform: &str) -> Option<&Arc<dyn PlatformHandler>> {
        self.handlers.get(platform)
    }

    /// Handler for `platform`, or [`NotifyError::UnknownPlatform`].
    pub fn resolve(&self, platform: &str) -> Result<&Arc<dyn PlatformHandler>, NotifyError> {
        self.get(platform)
            .ok_or_else(|| NotifyError::UnknownPlatform(platform.to_string()))
    }

    #[must_use]
    pub fn contains(&self, platform: &str) -> bool {
        self.handlers.contains_key(platform)
    }

    /// Registered identifiers, sorted.
    #[must_use]
    pub fn platforms(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_register_all_platforms() {
        let registry = HandlerRegistry::with_defaults(&PlatformEndpoints::default()).unwrap();
        assert_eq!(registry.len(), 4);
        assert_eq!(registry.platforms(), vec!["DING", "LARK", "SLACK", "WECHAT"]);
    }

    #[test]
    fn test_resolve_unknown_platform() {
        let registry = HandlerRegistry::new();
        assert!(registry.is_empty());
        assert!(matches!(
            registry.resolve("TEAMS"),
            Err(NotifyError::UnknownPlatform(ref p)) if p == "TEAMS"
        ));
    }

    #[test]
    fn test_duplicate_registration_returns_previous() {
        let transport: Arc<dyn Transport> = Arc::new(HttpTransport::new());
        let mut registry = HandlerRegistry::new();

        let first = registry.register(Arc::new(
            LarkHandler::new("http://a/", Arc::clone(&transport)).unwrap(),
        ));
        assert!(first.is_none());

        let second = registry.register(Arc::new(
            LarkHandler::new("http://b/", transport).unwrap(),
        ));
        assert!(second.is_some());
        assert_eq!(registry.len(), 1);
    }
}
