//! Integration tests for alarm and change dispatch.
//!
//! These tests run the real HTTP transport against a mock webhook server
//! and check routing, failure isolation and registry behavior.

use async_trait::async_trait;
use pool_notify::registry::HandlerRegistry;
use pool_notify::settings::{NotifySettings, PlatformEndpoints};
use pool_notify::{
    AlarmEvent, AlarmType, Change, ChangeEvent, Delivery, DeliveryError, Notifier, NotifyConfig,
    NotifyError, PlatformHandler,
};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

// =============================================================================
// Fixtures
// =============================================================================

fn alarm() -> AlarmEvent {
    AlarmEvent {
        active: "test".to_string(),
        thread_pool_id: "message-produce".to_string(),
        app_name: "dynamic-pool-example".to_string(),
        identify: "127.0.0.1:8088".to_string(),
        alarm_type: AlarmType::Reject,
        core_pool_size: 2,
        maximum_pool_size: 4,
        pool_size: 3,
        active_count: 2,
        largest_pool_size: 4,
        completed_task_count: 10,
        queue_name: Some("ResizableCapacityLinkedBlockingQueue".to_string()),
        capacity: 100,
        queue_size: 5,
        remaining_capacity: 95,
        rejected_policy: Some("AbortPolicy".to_string()),
        reject_count: 0,
        receives: Some("bob,ou_123".to_string()),
        interval: 5,
    }
}

fn change() -> ChangeEvent {
    ChangeEvent {
        active: "test".to_string(),
        thread_pool_id: "message-produce".to_string(),
        app_name: "dynamic-pool-example".to_string(),
        identify: "127.0.0.1:8088".to_string(),
        core_pool_size: Change::new(2, 4),
        maximum_pool_size: Change::new(4, 4),
        allow_core_thread_timeout: Change::new(false, false),
        keep_alive_time: Change::new(60, 30),
        queue_name: Some("LinkedBlockingQueue".to_string()),
        queue_capacity: Change::new(100, 100),
        rejected_policy: Change::new("AbortPolicy".to_string(), "AbortPolicy".to_string()),
        receives: None,
    }
}

fn notifier_for(server: &MockServer) -> Notifier {
    let settings = NotifySettings {
        disabled: false,
        endpoints: PlatformEndpoints::uniform(&server.uri()),
    };
    Notifier::from_settings(&settings).unwrap()
}

/// Handler that counts invocations without touching the network.
struct CountingHandler {
    platform: &'static str,
    calls: AtomicUsize,
}

impl CountingHandler {
    fn new(platform: &'static str) -> Arc<Self> {
        Arc::new(Self {
            platform,
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PlatformHandler for CountingHandler {
    fn platform(&self) -> &str {
        self.platform
    }

    async fn send_alarm(&self, _: &NotifyConfig, _: &AlarmEvent) -> Result<Delivery, NotifyError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Delivery::Sent)
    }

    async fn send_change(&self, _: &NotifyConfig, _: &ChangeEvent) -> Result<Delivery, NotifyError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Delivery::Sent)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[tokio::test]
async fn test_lark_alarm_reaches_webhook() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/lark/bot-key"))
        .and(body_partial_json(json!({ "msg_type": "interactive" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "code": 0, "msg": "success" })))
        .expect(1)
        .mount(&server)
        .await;

    let notifier = notifier_for(&server);
    let outcome = notifier
        .dispatch_alarm(&NotifyConfig::new("LARK", "bot-key"), &alarm())
        .await
        .unwrap();
    assert!(outcome.is_sent());

    let requests = server.received_requests().await.unwrap();
    let body: Value = requests[0].body_json().unwrap();
    let content = body["card"]["elements"][0]["content"].as_str().unwrap();
    assert!(content.contains("**Alarm type:** REJECT"));
    assert!(content.contains("**Notify:** <at email=bob></at> <at id=ou_123></at>"));
}

#[tokio::test]
async fn test_one_failing_platform_does_not_affect_another() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/slack/broken"))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal error"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/lark/ok"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "code": 0 })))
        .expect(1)
        .mount(&server)
        .await;

    let notifier = notifier_for(&server);
    let configs = [
        NotifyConfig::new("SLACK", "broken"),
        NotifyConfig::new("LARK", "ok"),
    ];
    let results = notifier.dispatch_change_all(&configs, &change()).await;

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].0, "SLACK");
    assert!(matches!(
        results[0].1,
        Ok(Delivery::Dropped(DeliveryError::Status { status: 500, .. }))
    ));
    assert_eq!(results[1].0, "LARK");
    assert!(matches!(results[1].1, Ok(Delivery::Sent)));
}

#[tokio::test]
async fn test_unknown_platform_sends_nothing() {
    let server = MockServer::start().await;
    let notifier = notifier_for(&server);

    let result = notifier
        .dispatch_alarm(&NotifyConfig::new("TEAMS", "k"), &alarm())
        .await;
    assert!(matches!(result, Err(NotifyError::UnknownPlatform(_))));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_fan_out_reports_unknown_platform_alongside_success() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/wecom"))
        .and(query_param("key", "robot"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "errcode": 0, "errmsg": "ok" })))
        .expect(1)
        .mount(&server)
        .await;

    let notifier = notifier_for(&server);
    let configs = [
        NotifyConfig::new("wechat", "robot"),
        NotifyConfig::new("WECHAT", "robot"),
    ];
    let results = notifier.dispatch_alarm_all(&configs, &alarm()).await;

    assert!(matches!(results[0].1, Err(NotifyError::UnknownPlatform(_))));
    assert!(matches!(results[1].1, Ok(Delivery::Sent)));
}

#[tokio::test]
async fn test_dingtalk_rejection_is_dropped() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/dingtalk"))
        .and(query_param("access_token", "tok"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "errcode": 310_000, "errmsg": "keywords not in content" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let notifier = notifier_for(&server);
    let outcome = notifier
        .dispatch_alarm(&NotifyConfig::new("DING", "tok"), &alarm())
        .await
        .unwrap();

    match outcome {
        Delivery::Dropped(DeliveryError::Rejected { code, message }) => {
            assert_eq!(code, 310_000);
            assert_eq!(message, "keywords not in content");
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[tokio::test]
async fn test_unreachable_webhook_returns_normally() {
    // Port 9 (discard) is not served locally.
    let settings = NotifySettings {
        disabled: false,
        endpoints: PlatformEndpoints::uniform("http://127.0.0.1:9"),
    };
    let notifier = Notifier::from_settings(&settings).unwrap();

    let outcome = notifier
        .dispatch_change(&NotifyConfig::new("SLACK", "k"), &change())
        .await
        .unwrap();
    assert!(matches!(outcome, Delivery::Dropped(DeliveryError::Http(_))));
}

#[tokio::test]
async fn test_duplicate_registration_last_write_wins() {
    let first = CountingHandler::new("LARK");
    let second = CountingHandler::new("LARK");

    let mut registry = HandlerRegistry::new();
    assert!(registry.register(first.clone()).is_none());
    assert!(registry.register(second.clone()).is_some());

    let notifier = Notifier::new(registry);
    let outcome = notifier
        .dispatch_alarm(&NotifyConfig::new("LARK", "k"), &alarm())
        .await
        .unwrap();

    assert!(outcome.is_sent());
    assert_eq!(first.calls(), 0);
    assert_eq!(second.calls(), 1);
}

#[tokio::test]
async fn test_custom_platform_can_be_registered() {
    let echo = CountingHandler::new("ECHO");
    let mut registry = HandlerRegistry::with_defaults(&PlatformEndpoints::default()).unwrap();
    registry.register(echo.clone());

    let notifier = Notifier::new(registry);
    let outcome = notifier
        .dispatch_change(&NotifyConfig::new("ECHO", "k"), &change())
        .await
        .unwrap();

    assert!(outcome.is_sent());
    assert_eq!(echo.calls(), 1);
    assert_eq!(notifier.registry().len(), 5);
}
