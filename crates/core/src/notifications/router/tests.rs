use std::sync::Arc;

use serde_json::json;

use super::*;
use crate::cache::{CacheStorage, MemoryCacheStorage};
use crate::config::WorkerConfig;
use crate::http::{HttpResponse, RequestMethod};
use crate::notifications::MemoryBadgeStore;
use crate::test_support::{client, ClientEvent, FakeClients, FakeNetwork, RecordingSink, SinkEvent};

const ORIGIN: &str = "https://site.example";

struct Harness {
    network: Arc<FakeNetwork>,
    cache: Arc<MemoryCacheStorage>,
    sink: Arc<RecordingSink>,
    clients: Arc<FakeClients>,
    badge: Arc<MemoryBadgeStore>,
    router: NotificationRouter,
    config: Arc<WorkerConfig>,
}

fn harness(clients: FakeClients) -> Harness {
    harness_at(ORIGIN, clients)
}

/// Tabs served from `app_url` while the API stays on `ORIGIN`.
fn harness_at(app_url: &str, clients: FakeClients) -> Harness {
    let network = Arc::new(FakeNetwork::new());
    let cache = Arc::new(MemoryCacheStorage::new());
    let sink = Arc::new(RecordingSink::default());
    let clients = Arc::new(clients);
    let badge = Arc::new(MemoryBadgeStore::new());
    let config = Arc::new(WorkerConfig::default().with_origin(ORIGIN));
    let executor = Arc::new(StrategyExecutor::new(
        cache.clone(),
        network.clone(),
        Arc::clone(&config),
    ));
    let router = NotificationRouter::new(
        network.clone(),
        executor,
        sink.clone(),
        badge.clone(),
        clients.clone(),
        ORIGIN,
        app_url,
    );
    Harness {
        network,
        cache,
        sink,
        clients,
        badge,
        router,
        config,
    }
}

fn click(tag: &str, action: Option<&str>, data: Value) -> NotificationClick {
    NotificationClick {
        tag: tag.to_string(),
        action: action.map(str::to_string),
        data: match data {
            Value::Object(map) => map,
            _ => Map::new(),
        },
    }
}

#[tokio::test]
async fn push_refreshes_material_request_and_notifies_tabs() {
    let h = harness(FakeClients::with_clients(vec![
        client("tab-1", "https://site.example/dashboard", true),
        client("tab-2", "https://site.example/dashboard/materials", false),
    ]));
    let resource = format!("{ORIGIN}/api/materials/requests/42");
    h.network.respond(
        &resource,
        HttpResponse::json(200, &json!({"id": 42, "status": "PENDING"})),
    );

    let outcome = h
        .router
        .on_push(Some(
            r#"{"type":"MATERIAL_APPROVAL","title":"자재 승인 요청","body":"철근 40톤","data":{"materialRequestId":42}}"#
                .as_bytes(),
        ))
        .await;

    assert_eq!(outcome.notification.tag, "MATERIAL_APPROVAL-42");
    assert_eq!(outcome.badge_count, 1);
    assert_eq!(outcome.refreshed.as_deref(), Some(resource.as_str()));
    assert_eq!(outcome.notified_clients, 2);

    let cached = h
        .cache
        .match_key(&h.config.cache_names.api, &resource)
        .await
        .unwrap();
    assert!(cached.is_some());

    assert_eq!(
        h.sink.events(),
        vec![
            SinkEvent::Shown("MATERIAL_APPROVAL-42".to_string()),
            SinkEvent::Badge(1)
        ]
    );
    let messages: Vec<_> = h
        .clients
        .events()
        .into_iter()
        .filter(|e| matches!(e, ClientEvent::Message(..)))
        .collect();
    assert_eq!(messages.len(), 2);
    match &messages[0] {
        ClientEvent::Message(_, ClientMessage::NotificationUpdate { notification_type, .. }) => {
            assert_eq!(notification_type, "MATERIAL_APPROVAL")
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[tokio::test]
async fn malformed_push_still_shows_a_notification() {
    let h = harness(FakeClients::default());
    let outcome = h.router.on_push(Some(&[0xff, 0x00, 0x13])).await;
    assert_eq!(outcome.notification.tag, "GENERAL-latest");
    assert_eq!(
        h.sink.events().first(),
        Some(&SinkEvent::Shown("GENERAL-latest".to_string()))
    );
}

#[tokio::test]
async fn acknowledge_posts_then_focuses_existing_tab() {
    let h = harness(FakeClients::with_clients(vec![
        client("other-site", "https://elsewhere.example/", true),
        client("tab-1", "https://site.example/dashboard", false),
    ]));
    h.badge.increment().await.unwrap();
    let ack = format!("{ORIGIN}/api/safety-alerts/a-7/acknowledge");
    h.network.respond(&ack, HttpResponse::empty(204));

    let outcome = h
        .router
        .on_click(&click(
            "SAFETY_ALERT-a-7",
            Some("acknowledge"),
            json!({"type": "SAFETY_ALERT", "alertId": "a-7"}),
        ))
        .await;

    let sent = h.network.calls();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].method, RequestMethod::Post);
    assert_eq!(sent[0].url, ack);

    let target = format!("{ORIGIN}/dashboard/safety/alerts/a-7");
    assert_eq!(outcome.badge_count, 0);
    assert_eq!(
        outcome.side_effect.as_deref(),
        Some("/api/safety-alerts/a-7/acknowledge")
    );
    assert_eq!(outcome.navigated_to.as_deref(), Some(target.as_str()));
    assert_eq!(
        h.clients.events(),
        vec![ClientEvent::Navigated("tab-1".to_string(), target)]
    );
    assert_eq!(
        h.sink.events(),
        vec![
            SinkEvent::Closed("SAFETY_ALERT-a-7".to_string()),
            SinkEvent::BadgeCleared
        ]
    );
}

#[tokio::test]
async fn click_opens_window_when_no_tab_is_open() {
    let h = harness(FakeClients::default());
    let outcome = h
        .router
        .on_click(&click(
            "EQUIPMENT_MAINTENANCE-crane-2",
            None,
            json!({"type": "EQUIPMENT_MAINTENANCE", "equipmentId": "crane-2"}),
        ))
        .await;

    let target = format!("{ORIGIN}/dashboard/equipment/crane-2/maintenance");
    assert_eq!(outcome.navigated_to.as_deref(), Some(target.as_str()));
    assert_eq!(h.clients.events(), vec![ClientEvent::Opened(target)]);
    assert!(h.network.calls().is_empty());
}

#[tokio::test]
async fn click_routes_open_gateway_tab_not_the_origin() {
    const GATEWAY: &str = "http://127.0.0.1:8080";
    let h = harness_at(
        GATEWAY,
        FakeClients::with_clients(vec![
            client("lookalike", "http://127.0.0.1:8080.evil.example/", true),
            client("api-tab", "https://site.example/", true),
            client("tab-1", "http://127.0.0.1:8080/dashboard", false),
        ]),
    );
    let ack = format!("{ORIGIN}/api/safety-alerts/a-7/acknowledge");
    h.network.respond(&ack, HttpResponse::empty(204));

    let outcome = h
        .router
        .on_click(&click(
            "SAFETY_ALERT-a-7",
            Some("acknowledge"),
            json!({"type": "SAFETY_ALERT", "alertId": "a-7"}),
        ))
        .await;

    assert_eq!(h.network.calls()[0].url, ack);
    let target = format!("{GATEWAY}/dashboard/safety/alerts/a-7");
    assert_eq!(outcome.navigated_to.as_deref(), Some(target.as_str()));
    assert_eq!(
        h.clients.events(),
        vec![ClientEvent::Navigated("tab-1".to_string(), target)]
    );
}

#[tokio::test]
async fn prefix_lookalike_tab_is_not_reused() {
    let h = harness(FakeClients::with_clients(vec![client(
        "lookalike",
        "https://site.example.evil/dashboard",
        true,
    )]));

    let outcome = h
        .router
        .on_click(&click("GENERAL-latest", None, json!({"type": "GENERAL"})))
        .await;

    let target = outcome.navigated_to.unwrap();
    assert!(target.starts_with(ORIGIN));
    assert_eq!(h.clients.events(), vec![ClientEvent::Opened(target)]);
}

#[tokio::test]
async fn failed_side_effect_still_navigates() {
    let h = harness(FakeClients::default());
    h.network.set_offline(true);

    let outcome = h
        .router
        .on_click(&click(
            "MATERIAL_APPROVAL-42",
            Some("approve"),
            json!({"type": "MATERIAL_APPROVAL", "materialRequestId": 42}),
        ))
        .await;

    assert_eq!(
        outcome.side_effect.as_deref(),
        Some("/api/materials/requests/42/approve")
    );
    assert_eq!(
        outcome.navigated_to,
        Some(format!("{ORIGIN}/dashboard/materials/requests/42"))
    );
}

#[tokio::test]
async fn badge_never_goes_negative() {
    let h = harness(FakeClients::default());
    let outcome = h
        .router
        .on_click(&click("GENERAL-latest", Some("close"), json!({})))
        .await;
    assert_eq!(outcome.badge_count, 0);
    assert!(outcome.navigated_to.is_none());
}

#[test]
fn silent_update_paths_follow_notification_type() {
    let data = match json!({"materialRequestId": "mr-9"}) {
        Value::Object(map) => map,
        _ => unreachable!(),
    };
    assert_eq!(
        NotificationRouter::silent_update_path(NotificationType::MaterialApproval, &data),
        "/api/materials/requests/mr-9"
    );
    assert_eq!(
        NotificationRouter::silent_update_path(NotificationType::MaterialApproval, &Map::new()),
        "/api/materials"
    );
    assert_eq!(
        NotificationRouter::silent_update_path(NotificationType::DailyReportReminder, &Map::new()),
        "/api/daily-reports"
    );
    assert_eq!(
        NotificationRouter::silent_update_path(NotificationType::SafetyAlert, &Map::new()),
        "/api/notifications"
    );
}
