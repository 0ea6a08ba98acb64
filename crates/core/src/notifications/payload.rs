//! Push payload decoding and notification rendering.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{ActionButton, NotificationType};

const DEFAULT_TITLE: &str = "현장 관리 알림";
const DEFAULT_BODY: &str = "새로운 알림이 있습니다.";

/// Identifier keys looked up (in order) to build a notification tag and to
/// address the item a notification is about.
pub const ITEM_ID_KEYS: [&str; 7] = [
    "materialRequestId",
    "alertId",
    "announcementId",
    "equipmentId",
    "reportId",
    "siteId",
    "id",
];

/// A decoded push message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushPayload {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub data: Map<String, Value>,
}

impl Default for PushPayload {
    fn default() -> Self {
        Self {
            kind: Some(NotificationType::General.as_str().to_string()),
            title: Some(DEFAULT_TITLE.to_string()),
            body: Some(DEFAULT_BODY.to_string()),
            url: None,
            data: Map::new(),
        }
    }
}

impl PushPayload {
    /// JSON first, then plain text as the body, then the default shape.
    /// Never fails: a notification is always shown.
    pub fn decode(raw: Option<&[u8]>) -> Self {
        let Some(raw) = raw.filter(|bytes| !bytes.is_empty()) else {
            return Self::default();
        };
        match serde_json::from_slice::<Value>(raw) {
            Ok(Value::Object(fields)) => return Self::from_fields(fields),
            Ok(Value::String(text)) => return Self::from_text(&text),
            _ => {}
        }
        match std::str::from_utf8(raw) {
            Ok(text) => Self::from_text(text),
            Err(_) => Self::default(),
        }
    }

    /// Lenient read of a JSON object: mistyped or null fields count as absent.
    fn from_fields(mut fields: Map<String, Value>) -> Self {
        let data = match fields.remove("data") {
            Some(Value::Object(data)) => data,
            _ => Map::new(),
        };
        Self {
            kind: text_field(&fields, "type"),
            title: text_field(&fields, "title"),
            body: text_field(&fields, "body"),
            url: text_field(&fields, "url"),
            data,
        }
    }

    fn from_text(text: &str) -> Self {
        let text = text.trim();
        if text.is_empty() {
            return Self::default();
        }
        Self {
            body: Some(text.to_string()),
            ..Self::default()
        }
    }

    pub fn notification_type(&self) -> NotificationType {
        NotificationType::parse(self.kind.as_deref())
    }
}

fn text_field(fields: &Map<String, Value>, key: &str) -> Option<String> {
    match fields.get(key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        _ => None,
    }
}

/// First identifier found in `data`, as a string.
pub fn item_id(data: &Map<String, Value>) -> Option<String> {
    ITEM_ID_KEYS.iter().find_map(|key| id_value(data.get(*key)?))
}

pub(crate) fn id_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// A rendered system notification.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    /// Same tag ⇒ replaces the earlier notification instead of stacking.
    pub tag: String,
    pub title: String,
    pub body: String,
    pub icon: &'static str,
    pub badge: &'static str,
    pub vibrate: &'static [u32],
    pub require_interaction: bool,
    pub actions: &'static [ActionButton],
    /// Payload data plus `type` and `url`, handed back on click.
    pub data: Value,
}

impl Notification {
    pub fn render(payload: &PushPayload) -> Self {
        let kind = payload.notification_type();
        let descriptor = kind.descriptor();
        let tag = match item_id(&payload.data) {
            Some(id) => format!("{}-{}", kind.as_str(), id),
            None => format!("{}-latest", kind.as_str()),
        };

        let mut data = payload.data.clone();
        data.insert("type".to_string(), Value::String(kind.as_str().to_string()));
        if let Some(url) = &payload.url {
            data.insert("url".to_string(), Value::String(url.clone()));
        }

        Self {
            tag,
            title: payload
                .title
                .clone()
                .unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            body: payload
                .body
                .clone()
                .unwrap_or_else(|| DEFAULT_BODY.to_string()),
            icon: descriptor.icon,
            badge: descriptor.badge,
            vibrate: descriptor.vibrate,
            require_interaction: descriptor.require_interaction,
            actions: descriptor.actions,
            data: Value::Object(data),
        }
    }
}
