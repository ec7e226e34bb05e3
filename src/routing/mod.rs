//! Deep-link resolution for notifications.
//!
//! A producer can force a destination by embedding an `override` object in
//! the payload; otherwise the static [`routing_table`] decides per
//! `(type, role)`. `None` means the caller should stay where it is.

pub mod routing_table;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;

use crate::{auth::Role, notification::NotificationType};

const OVERRIDE_KEY: &str = "override";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Route {
    pub target: String,
    #[schema(value_type = Object)]
    pub params: Map<String, Value>,
}

pub fn resolve(kind: NotificationType, role: Role, payload: &Value, actor_id: &str) -> Option<Route> {
    if let Some(route) = explicit_override(payload) {
        return Some(route);
    }

    let spec = routing_table::lookup(kind, role)?;

    let mut params = Map::new();
    if let Some(tab) = spec.tab {
        params.insert("tab".to_string(), Value::from(tab));
    }
    if let Some(highlight) = &spec.highlight {
        let entity_id = highlight
            .payload_keys
            .iter()
            .find_map(|key| payload.get(*key))
            .filter(|value| !value.is_null());
        if let Some(entity_id) = entity_id {
            params.insert(highlight.param.to_string(), entity_id.clone());
        }
    }
    params.insert("actorId".to_string(), Value::from(actor_id));

    Some(Route {
        target: spec.target.to_string(),
        params,
    })
}

fn explicit_override(payload: &Value) -> Option<Route> {
    let raw = payload.get(OVERRIDE_KEY)?;
    let target = raw.get("target").and_then(Value::as_str)?;
    let params = raw
        .get("params")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();

    Some(Route {
        target: target.to_string(),
        params,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ticket_response_for_employee() {
        let route = resolve(NotificationType::TicketResponse, Role::Employee, &json!({}), "emp-1").unwrap();
        assert_eq!(route.target, "MyTickets");
        assert_eq!(route.params.get("actorId"), Some(&json!("emp-1")));
    }

    #[test]
    fn test_override_wins_regardless_of_table() {
        let payload = json!({"override": {"target": "Custom"}});

        for kind in NotificationType::ALL {
            for role in [Role::Employee, Role::Manager, Role::Admin] {
                let route = resolve(kind, role, &payload, "someone").unwrap();
                assert_eq!(route.target, "Custom");
                assert!(route.params.is_empty());
            }
        }
    }

    #[test]
    fn test_override_params_are_verbatim() {
        let payload = json!({"override": {"target": "Report", "params": {"month": "2024-05"}}, "ticketId": "t-1"});
        let route = resolve(NotificationType::TicketUpdated, Role::Employee, &payload, "emp-1").unwrap();
        assert_eq!(route.target, "Report");
        assert_eq!(route.params, json!({"month": "2024-05"}).as_object().cloned().unwrap());
    }

    #[test]
    fn test_malformed_override_falls_back_to_table() {
        let payload = json!({"override": {"screen": "Nope"}});
        let route = resolve(NotificationType::LeaveApproved, Role::Employee, &payload, "emp-1").unwrap();
        assert_eq!(route.target, "MyLeaves");
    }

    #[test]
    fn test_unlisted_pair_without_override_is_none() {
        assert!(resolve(NotificationType::General, Role::Employee, &json!({}), "emp-1").is_none());
        assert!(resolve(NotificationType::TicketCreated, Role::Employee, &json!({}), "emp-1").is_none());
    }

    #[test]
    fn test_params_carry_tab_and_highlight() {
        let payload = json!({"leave_id": "l-42"});
        let route = resolve(NotificationType::LeaveRequest, Role::Manager, &payload, "mgr-1").unwrap();
        assert_eq!(route.target, "LeaveApprovals");
        assert_eq!(
            route.params,
            json!({"tab": "pending", "leaveId": "l-42", "actorId": "mgr-1"})
                .as_object()
                .cloned()
                .unwrap()
        );
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let payload = json!({"ticketId": 9});
        let first = resolve(NotificationType::TicketAssigned, Role::Admin, &payload, "adm");
        let second = resolve(NotificationType::TicketAssigned, Role::Admin, &payload, "adm");
        assert_eq!(first, second);
        assert_eq!(first.unwrap().params.get("ticketId"), Some(&json!(9)));
    }
}
