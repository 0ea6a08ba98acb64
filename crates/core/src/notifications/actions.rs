//! What a notification click does, decided from (type, action, data).

use serde_json::{json, Map, Value};

use super::payload::id_value;
use super::NotificationType;

pub const SNOOZE_MINUTES: u32 = 60;

/// A call made against the origin before (or instead of) navigating.
#[derive(Debug, Clone, PartialEq)]
pub struct SideEffect {
    /// App-relative path; always a POST.
    pub path: String,
    pub body: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClickAction {
    SideEffectThenNavigate { effect: SideEffect, url: String },
    SideEffect(SideEffect),
    Navigate(String),
    /// Close and do nothing else.
    Dismiss,
}

/// Decide the click outcome. An empty action is a click on the notification
/// body; an action the type does not know is a no-op dismiss.
pub fn resolve_click(
    kind: NotificationType,
    action: Option<&str>,
    data: &Map<String, Value>,
) -> ClickAction {
    let action = action.map(str::trim).filter(|a| !a.is_empty());
    let id = |key: &str| data.get(key).and_then(id_value);

    match (kind, action) {
        (NotificationType::MaterialApproval, Some(verb @ ("approve" | "reject"))) => {
            match id("materialRequestId") {
                Some(request_id) => ClickAction::SideEffectThenNavigate {
                    effect: SideEffect {
                        path: format!("/api/materials/requests/{request_id}/{verb}"),
                        body: json!({ "materialRequestId": request_id }),
                    },
                    url: format!("/dashboard/materials/requests/{request_id}"),
                },
                None => ClickAction::Navigate(default_url(kind, data)),
            }
        }
        (NotificationType::DailyReportReminder, Some("snooze")) => {
            ClickAction::SideEffect(SideEffect {
                path: "/api/notifications/snooze".to_string(),
                body: json!({
                    "type": kind.as_str(),
                    "siteId": data.get("siteId").cloned().unwrap_or(Value::Null),
                    "minutes": SNOOZE_MINUTES,
                }),
            })
        }
        (NotificationType::SafetyAlert, Some("acknowledge")) => match id("alertId") {
            Some(alert_id) => ClickAction::SideEffectThenNavigate {
                effect: SideEffect {
                    path: format!("/api/safety-alerts/{alert_id}/acknowledge"),
                    body: json!({ "alertId": alert_id }),
                },
                url: format!("/dashboard/safety/alerts/{alert_id}"),
            },
            None => ClickAction::Navigate(default_url(kind, data)),
        },
        (NotificationType::SiteAnnouncement, Some("dismiss")) => match id("announcementId") {
            Some(announcement_id) => ClickAction::SideEffect(SideEffect {
                path: format!("/api/announcements/{announcement_id}/dismiss"),
                body: json!({ "announcementId": announcement_id }),
            }),
            None => ClickAction::Dismiss,
        },
        (_, None | Some("view" | "write" | "schedule")) => {
            ClickAction::Navigate(default_url(kind, data))
        }
        _ => ClickAction::Dismiss,
    }
}

/// Where a plain click lands: the payload's deep link, else the type's page.
pub fn default_url(kind: NotificationType, data: &Map<String, Value>) -> String {
    if let Some(url) = data.get("url").and_then(Value::as_str) {
        if !url.is_empty() {
            return url.to_string();
        }
    }
    let id = |key: &str| data.get(key).and_then(id_value);

    match kind {
        NotificationType::MaterialApproval => match id("materialRequestId") {
            Some(request_id) => format!("/dashboard/materials/requests/{request_id}"),
            None => "/dashboard/materials".to_string(),
        },
        NotificationType::DailyReportReminder => match id("siteId") {
            Some(site_id) => format!("/dashboard/daily-reports/new?siteId={site_id}"),
            None => "/dashboard/daily-reports/new".to_string(),
        },
        NotificationType::SafetyAlert => match id("alertId") {
            Some(alert_id) => format!("/dashboard/safety/alerts/{alert_id}"),
            None => "/dashboard/safety".to_string(),
        },
        NotificationType::EquipmentMaintenance => match id("equipmentId") {
            Some(equipment_id) => format!("/dashboard/equipment/{equipment_id}/maintenance"),
            None => "/dashboard/equipment".to_string(),
        },
        NotificationType::SiteAnnouncement => match id("announcementId") {
            Some(announcement_id) => format!("/dashboard/announcements/{announcement_id}"),
            None => "/dashboard/announcements".to_string(),
        },
        NotificationType::General => "/dashboard".to_string(),
    }
}
