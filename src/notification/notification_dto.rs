use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::{IntoParams, ToSchema};
use validator::{Validate, ValidationError};

use super::notification_models::NotificationType;
use crate::routing::Route;

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateNotificationRequest {
    #[validate(custom(function = "not_blank"))]
    pub recipient_id: String,
    #[validate(custom(function = "not_blank"))]
    pub title: String,
    #[validate(custom(function = "not_blank"))]
    pub body: String,
    #[serde(rename = "type")]
    pub kind: NotificationType,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub data: Value,
}

impl CreateNotificationRequest {
    pub fn new(
        recipient_id: impl Into<String>,
        title: impl Into<String>,
        body: impl Into<String>,
        kind: NotificationType,
        data: Value,
    ) -> Self {
        Self {
            recipient_id: recipient_id.into(),
            title: title.into(),
            body: body.into(),
            kind,
            data,
        }
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BatchCreateRequest {
    pub recipients: Vec<String>,
    pub title: String,
    pub body: String,
    #[serde(rename = "type")]
    pub kind: NotificationType,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub data: Value,
}

impl BatchCreateRequest {
    pub fn for_recipient(&self, recipient_id: &str) -> CreateNotificationRequest {
        CreateNotificationRequest::new(
            recipient_id,
            self.title.clone(),
            self.body.clone(),
            self.kind,
            self.data.clone(),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BatchFailure {
    pub recipient_id: String,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BatchOutcome {
    pub success: bool,
    pub created_count: usize,
    pub failed_count: usize,
    pub notification_ids: Vec<String>,
    pub errors: Vec<BatchFailure>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
#[serde(rename_all = "snake_case")]
pub struct NotificationQuery {
    /// Only return unread notifications
    pub unread_only: Option<bool>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UnreadCountResponse {
    pub unread_count: usize,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BulkUpdateResponse {
    pub affected: usize,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RouteResponse {
    pub route: Option<Route>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_blank_fields_rejected() {
        let request = CreateNotificationRequest::new("alice", "  ", "body", NotificationType::General, json!({}));
        let errors = request.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("title"));

        let request = CreateNotificationRequest::new("", "t", "", NotificationType::General, json!({}));
        let errors = request.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("recipient_id"));
        assert!(errors.field_errors().contains_key("body"));
    }

    #[test]
    fn test_valid_request_passes() {
        let request = CreateNotificationRequest::new(
            "alice",
            "Leave Approved",
            "Your leave was approved",
            NotificationType::LeaveApproved,
            json!({}),
        );
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_create_request_deserializes_wire_names() {
        let request: CreateNotificationRequest = serde_json::from_value(json!({
            "recipientId": "alice",
            "title": "t",
            "body": "b",
            "type": "ticket_assigned"
        }))
        .unwrap();
        assert_eq!(request.kind, NotificationType::TicketAssigned);
        assert!(request.data.is_null());
    }
}
