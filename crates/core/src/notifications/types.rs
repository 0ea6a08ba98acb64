//! Notification categories and their fixed presentation.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationType {
    MaterialApproval,
    DailyReportReminder,
    SafetyAlert,
    EquipmentMaintenance,
    SiteAnnouncement,
    General,
}

impl NotificationType {
    /// Unknown or missing types present as `General`.
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some("MATERIAL_APPROVAL") => Self::MaterialApproval,
            Some("DAILY_REPORT_REMINDER") => Self::DailyReportReminder,
            Some("SAFETY_ALERT") => Self::SafetyAlert,
            Some("EQUIPMENT_MAINTENANCE") => Self::EquipmentMaintenance,
            Some("SITE_ANNOUNCEMENT") => Self::SiteAnnouncement,
            _ => Self::General,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MaterialApproval => "MATERIAL_APPROVAL",
            Self::DailyReportReminder => "DAILY_REPORT_REMINDER",
            Self::SafetyAlert => "SAFETY_ALERT",
            Self::EquipmentMaintenance => "EQUIPMENT_MAINTENANCE",
            Self::SiteAnnouncement => "SITE_ANNOUNCEMENT",
            Self::General => "GENERAL",
        }
    }

    pub fn descriptor(&self) -> &'static NotificationDescriptor {
        match self {
            Self::MaterialApproval => &MATERIAL_APPROVAL,
            Self::DailyReportReminder => &DAILY_REPORT_REMINDER,
            Self::SafetyAlert => &SAFETY_ALERT,
            Self::EquipmentMaintenance => &EQUIPMENT_MAINTENANCE,
            Self::SiteAnnouncement => &SITE_ANNOUNCEMENT,
            Self::General => &GENERAL,
        }
    }
}

/// A button on a rendered notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ActionButton {
    pub action: &'static str,
    pub title: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationDescriptor {
    pub icon: &'static str,
    pub badge: &'static str,
    pub vibrate: &'static [u32],
    pub require_interaction: bool,
    pub actions: &'static [ActionButton],
}

const BADGE_ICON: &str = "/icons/badge-72x72.png";

static MATERIAL_APPROVAL: NotificationDescriptor = NotificationDescriptor {
    icon: "/icons/material-approval.png",
    badge: BADGE_ICON,
    vibrate: &[200, 100, 200],
    require_interaction: true,
    actions: &[
        ActionButton { action: "approve", title: "승인" },
        ActionButton { action: "reject", title: "반려" },
        ActionButton { action: "view", title: "상세보기" },
    ],
};

static DAILY_REPORT_REMINDER: NotificationDescriptor = NotificationDescriptor {
    icon: "/icons/daily-report.png",
    badge: BADGE_ICON,
    vibrate: &[100, 50, 100],
    require_interaction: false,
    actions: &[
        ActionButton { action: "write", title: "작성하기" },
        ActionButton { action: "snooze", title: "1시간 후 알림" },
    ],
};

static SAFETY_ALERT: NotificationDescriptor = NotificationDescriptor {
    icon: "/icons/safety-alert.png",
    badge: BADGE_ICON,
    vibrate: &[500, 200, 500, 200, 500],
    require_interaction: true,
    actions: &[
        ActionButton { action: "acknowledge", title: "확인" },
        ActionButton { action: "view", title: "상세보기" },
    ],
};

static EQUIPMENT_MAINTENANCE: NotificationDescriptor = NotificationDescriptor {
    icon: "/icons/equipment.png",
    badge: BADGE_ICON,
    vibrate: &[200, 100, 200],
    require_interaction: false,
    actions: &[
        ActionButton { action: "schedule", title: "일정 확인" },
        ActionButton { action: "view", title: "상세보기" },
    ],
};

static SITE_ANNOUNCEMENT: NotificationDescriptor = NotificationDescriptor {
    icon: "/icons/announcement.png",
    badge: BADGE_ICON,
    vibrate: &[100],
    require_interaction: false,
    actions: &[
        ActionButton { action: "view", title: "보기" },
        ActionButton { action: "dismiss", title: "닫기" },
    ],
};

static GENERAL: NotificationDescriptor = NotificationDescriptor {
    icon: "/icons/icon-192x192.png",
    badge: BADGE_ICON,
    vibrate: &[100],
    require_interaction: false,
    actions: &[ActionButton { action: "view", title: "보기" }],
};
