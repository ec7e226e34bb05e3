use crate::{auth::Role, notification::NotificationType};

/// Payload field copied into the route parameters so the target screen can
/// highlight the entity the notification is about.
#[derive(Debug)]
pub struct Highlight {
    pub param: &'static str,
    pub payload_keys: &'static [&'static str],
}

#[derive(Debug)]
pub struct RouteSpec {
    pub target: &'static str,
    pub tab: Option<&'static str>,
    pub highlight: Option<Highlight>,
}

const TICKET: Highlight = Highlight {
    param: "ticketId",
    payload_keys: &["ticketId", "ticket_id"],
};

const LEAVE: Highlight = Highlight {
    param: "leaveId",
    payload_keys: &["leaveId", "leave_id"],
};

const EVENT: Highlight = Highlight {
    param: "eventId",
    payload_keys: &["eventId", "event_id"],
};

const fn route(target: &'static str, tab: Option<&'static str>, highlight: Option<Highlight>) -> Option<RouteSpec> {
    Some(RouteSpec {
        target,
        tab,
        highlight,
    })
}

/// `(type, role) -> target`. A `None` entry means that role never gets a
/// route for that type; pairs not listed at all behave the same way.
pub static ROUTING_TABLE: &[(NotificationType, Role, Option<RouteSpec>)] = &[
    (NotificationType::TicketCreated, Role::Admin, route("AdminTickets", Some("open"), Some(TICKET))),
    (NotificationType::TicketCreated, Role::Manager, route("AdminTickets", Some("open"), Some(TICKET))),
    (NotificationType::TicketCreated, Role::Employee, None),
    (NotificationType::TicketAssigned, Role::Admin, route("AdminTickets", Some("assigned"), Some(TICKET))),
    (NotificationType::TicketAssigned, Role::Manager, route("AdminTickets", Some("assigned"), Some(TICKET))),
    (NotificationType::TicketAssigned, Role::Employee, route("MyTickets", None, Some(TICKET))),
    (NotificationType::TicketResponse, Role::Admin, route("AdminTickets", None, Some(TICKET))),
    (NotificationType::TicketResponse, Role::Manager, route("MyTickets", None, Some(TICKET))),
    (NotificationType::TicketResponse, Role::Employee, route("MyTickets", None, Some(TICKET))),
    (NotificationType::TicketUpdated, Role::Admin, route("AdminTickets", None, Some(TICKET))),
    (NotificationType::TicketUpdated, Role::Manager, route("MyTickets", None, Some(TICKET))),
    (NotificationType::TicketUpdated, Role::Employee, route("MyTickets", None, Some(TICKET))),
    (NotificationType::LeaveRequest, Role::Admin, route("LeaveApprovals", Some("pending"), Some(LEAVE))),
    (NotificationType::LeaveRequest, Role::Manager, route("LeaveApprovals", Some("pending"), Some(LEAVE))),
    (NotificationType::LeaveRequest, Role::Employee, None),
    (NotificationType::LeaveApproved, Role::Employee, route("MyLeaves", Some("approved"), Some(LEAVE))),
    (NotificationType::LeaveApproved, Role::Manager, route("MyLeaves", Some("approved"), Some(LEAVE))),
    (NotificationType::LeaveApproved, Role::Admin, None),
    (NotificationType::LeaveRejected, Role::Employee, route("MyLeaves", Some("rejected"), Some(LEAVE))),
    (NotificationType::LeaveRejected, Role::Manager, route("MyLeaves", Some("rejected"), Some(LEAVE))),
    (NotificationType::LeaveRejected, Role::Admin, None),
    (NotificationType::AttendanceReminder, Role::Employee, route("Attendance", None, None)),
    (NotificationType::AttendanceReminder, Role::Manager, route("Attendance", None, None)),
    (NotificationType::CalendarEvent, Role::Employee, route("Calendar", None, Some(EVENT))),
    (NotificationType::CalendarEvent, Role::Manager, route("Calendar", None, Some(EVENT))),
    (NotificationType::CalendarEvent, Role::Admin, route("Calendar", None, Some(EVENT))),
];

pub fn lookup(kind: NotificationType, role: Role) -> Option<&'static RouteSpec> {
    ROUTING_TABLE
        .iter()
        .find(|(k, r, _)| *k == kind && *r == role)
        .and_then(|(_, _, spec)| spec.as_ref())
}
