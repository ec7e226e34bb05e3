use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    TicketCreated,
    TicketAssigned,
    TicketResponse,
    TicketUpdated,
    LeaveRequest,
    LeaveApproved,
    LeaveRejected,
    AttendanceReminder,
    CalendarEvent,
    System,
    General,
}

impl NotificationType {
    pub const ALL: [NotificationType; 11] = [
        NotificationType::TicketCreated,
        NotificationType::TicketAssigned,
        NotificationType::TicketResponse,
        NotificationType::TicketUpdated,
        NotificationType::LeaveRequest,
        NotificationType::LeaveApproved,
        NotificationType::LeaveRejected,
        NotificationType::AttendanceReminder,
        NotificationType::CalendarEvent,
        NotificationType::System,
        NotificationType::General,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::TicketCreated => "ticket_created",
            NotificationType::TicketAssigned => "ticket_assigned",
            NotificationType::TicketResponse => "ticket_response",
            NotificationType::TicketUpdated => "ticket_updated",
            NotificationType::LeaveRequest => "leave_request",
            NotificationType::LeaveApproved => "leave_approved",
            NotificationType::LeaveRejected => "leave_rejected",
            NotificationType::AttendanceReminder => "attendance_reminder",
            NotificationType::CalendarEvent => "calendar_event",
            NotificationType::System => "system",
            NotificationType::General => "general",
        }
    }

    /// Lenient parse used at the ingestion boundary: unknown kinds become `General`.
    pub fn from_remote(raw: &str) -> Self {
        raw.parse().unwrap_or_else(|_| {
            tracing::debug!("Unknown notification type {:?}, treating as general", raw);
            NotificationType::General
        })
    }
}

impl std::fmt::Display for NotificationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for NotificationType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NotificationType::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s.trim())
            .ok_or_else(|| format!("unknown notification type: {}", s))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub recipient_id: String,
    pub title: String,
    pub body: String,
    #[serde(rename = "type")]
    pub kind: NotificationType,
    #[schema(value_type = Object)]
    #[serde(default)]
    pub payload: Value,
    pub read: bool,
    pub created_at: DateTime<Utc>,
    pub read_at: Option<DateTime<Utc>>,
}

impl Notification {
    /// Read-state transition. Returns false when the notification was already read.
    pub fn mark_read(&mut self, at: DateTime<Utc>) -> bool {
        if self.read {
            return false;
        }
        self.read = true;
        self.read_at = Some(at);
        true
    }
}
