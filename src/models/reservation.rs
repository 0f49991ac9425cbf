use chrono::{NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::env;

use crate::error::{BridgeError, BridgeResult};

/// Query parameters for the reservation endpoint.
#[derive(Debug, Deserialize)]
pub struct ReservationParams {
    pub start: Option<String>,
    pub end: Option<String>,
}

/// Accepted timestamp layouts for the meeting window, tried in order.
const WINDOW_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// The requested meeting time span.
///
/// Backend meeting records split a moment into a midnight date plus a
/// minutes-from-midnight offset, so both derivations live here.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeetingWindow {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl MeetingWindow {
    pub fn parse(start: &str, end: &str) -> BridgeResult<Self> {
        Ok(Self {
            start: parse_stamp("start", start)?,
            end: parse_stamp("end", end)?,
        })
    }

    /// Window date rendered at midnight, as the backend stores meeting dates.
    pub fn start_date(&self) -> String {
        self.start.format("%Y-%m-%dT00:00:00").to_string()
    }

    pub fn end_date(&self) -> String {
        self.end.format("%Y-%m-%dT00:00:00").to_string()
    }

    /// Minutes from midnight on the start date.
    pub fn start_minute(&self) -> i32 {
        (self.start.hour() * 60 + self.start.minute()) as i32
    }

    pub fn end_minute(&self) -> i32 {
        (self.end.hour() * 60 + self.end.minute()) as i32
    }

    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }
}

fn parse_stamp(name: &'static str, value: &str) -> BridgeResult<NaiveDateTime> {
    for format in WINDOW_FORMATS {
        if let Ok(stamp) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(stamp);
        }
    }
    Err(BridgeError::InvalidParameter {
        name,
        reason: format!("`{}` is not a recognized date-time", value),
    })
}

/// Fixed identities and display values stamped on every booking,
/// overridable through the environment.
#[derive(Debug, Clone)]
pub struct BookingDefaults {
    pub instance_name: String,
    pub customer_name: String,
    /// Matched against `UserName`, not a display name.
    pub customer_contact_name: String,
    pub event_name: String,
    pub event_type_id: String,
    pub event_type_name: String,
    pub event_owner_name: String,
    pub workflow_owner_id: String,
    pub requester_name: String,
    pub requester_email: String,
}

impl BookingDefaults {
    pub fn from_env() -> Self {
        Self {
            instance_name: env_or("ASTRA_INSTANCE_NAME", "AS8DEMO1"),
            customer_name: env_or("BOOKING_CUSTOMER_NAME", "Outlook"),
            customer_contact_name: env_or("BOOKING_CUSTOMER_CONTACT", "Outlook"),
            event_name: env_or("BOOKING_EVENT_NAME", "Outlook Test Meeting"),
            event_type_id: env_or(
                "BOOKING_EVENT_TYPE_ID",
                "4c7bc919-329a-4298-a502-c886a2bb2785",
            ),
            event_type_name: env_or("BOOKING_EVENT_TYPE_NAME", "Administrative"),
            event_owner_name: env_or("BOOKING_EVENT_OWNER_NAME", "Administrator, System"),
            workflow_owner_id: env_or(
                "BOOKING_WORKFLOW_OWNER_ID",
                "da30a6dd-04ae-4453-8c53-4622dd2c5da3",
            ),
            requester_name: env_or("BOOKING_REQUESTER_NAME", "Demo User"),
            requester_email: env_or("BOOKING_REQUESTER_EMAIL", "DemoUser@aais.com"),
        }
    }

    /// Description stamped on the request-meeting record.
    pub fn description(&self) -> String {
        format!(
            "This event was created by {} ({}) and automatically created here by the Ad Astra Outlook Add-in.",
            self.requester_name, self.requester_email
        )
    }
}

fn env_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

/// Creation wrapper for the entity-write endpoint: rows to insert are
/// keyed under `+`.
#[derive(Debug, Serialize)]
pub struct CreateOp<T> {
    #[serde(rename = "+")]
    pub create: Vec<T>,
}

impl<T> CreateOp<T> {
    pub fn one(record: T) -> Self {
        Self {
            create: vec![record],
        }
    }
}

/// Composite create-document submitted in a single entity write. Every
/// absent value serializes as an explicit null so the backend always sees
/// the full key set.
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ReservationDraft {
    pub event: CreateOp<EventRecord>,
    pub event_request_meeting: CreateOp<EventRequestMeetingRecord>,
    pub event_meeting: CreateOp<EventMeetingRecord>,
    pub event_meeting_resource: CreateOp<EventMeetingResourceRecord>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct EventRecord {
    pub id: String,
    pub accounting_key: Option<String>,
    pub allow_attendee_sign_up: bool,
    pub customer_contact_name: String,
    pub customer_contact_id: String,
    pub primary_customer_contact_id: String,
    pub customer_id: String,
    pub customer_name: String,
    pub description: Option<String>,
    pub do_notify_primary_contact: bool,
    pub edit_counter: i32,
    pub estimated_attendance: i32,
    pub event_owner_name: String,
    pub event_request_id: Option<String>,
    pub event_type_id: String,
    pub event_type_name: String,
    pub external_description_id: Option<String>,
    pub institution_contact_id: Option<String>,
    pub institution_id: Option<String>,
    pub is_featured: bool,
    pub is_private: bool,
    pub last_imported_date: Option<String>,
    pub last_sis_update_date: Option<String>,
    pub name: String,
    pub notify: Option<String>,
    pub next_meeting_number: i32,
    pub owner_id: String,
    pub recordable_attendee_type: i32,
    pub requires_attention: bool,
    pub requires_attention_reason: Option<String>,
    pub reservation_number: String,
    pub sis_key: Option<String>,
    pub status_text: String,
    pub uploaded_picture_id: Option<String>,
    pub workflow_instance_id: Option<String>,
    pub workflow_intent: String,
    pub workflow_intent_owner_id: String,
    pub workflow_state: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct EventRequestMeetingRecord {
    pub id: String,
    pub description: String,
    pub end_date: String,
    pub end_minute: i32,
    pub event_meeting_type_id: Option<String>,
    pub event_req_meeting_group_id: Option<String>,
    pub event_request_id: String,
    pub is_featured_event: bool,
    pub is_private_event: bool,
    pub is_room_required: bool,
    pub last_imported_date: Option<String>,
    pub last_sis_update_date: Option<String>,
    pub max_attendance: Option<i32>,
    pub name: String,
    pub recurrence_pattern_id: Option<String>,
    pub requires_attention: bool,
    pub requires_attention_reason: Option<String>,
    pub room_configuration_id: String,
    pub sis_key: Option<String>,
    pub start_date: String,
    pub start_minute: i32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct EventMeetingRecord {
    pub id: String,
    pub accounting_key: Option<String>,
    pub actual_attendance: i32,
    pub building_room: String,
    pub conflict_desc: String,
    pub conflicts_with_holiday: bool,
    pub customer_contact_id: String,
    pub customer_contact_name: String,
    pub customer_id: String,
    pub customer_name: String,
    pub days_mask: i32,
    pub description: Option<String>,
    pub duration: i64,
    pub end_date: String,
    pub end_minute: i32,
    pub event_id: String,
    pub event_meeting_group_id: Option<String>,
    pub event_meeting_type_id: Option<String>,
    pub event_meeting_type_name: String,
    pub event_request_meeting_id: String,
    pub institution_contact_id: Option<String>,
    pub is_exception: bool,
    pub is_featured: bool,
    pub is_private: bool,
    pub is_room_required: bool,
    pub is_usage_out_dated: bool,
    pub last_imported_date: Option<String>,
    pub last_sis_update_date: Option<String>,
    pub max_attendance: i32,
    pub meeting_number: i32,
    pub name: String,
    pub owner_id: String,
    pub recurrence_pattern_id: Option<String>,
    pub requires_attention: bool,
    pub requires_attention_reason: Option<String>,
    pub resources_summary: String,
    pub sis_key: Option<String>,
    pub start_date: String,
    pub start_minute: i32,
    pub status_text: String,
    pub workflow_intent: String,
    pub workflow_intent_owner_id: String,
    pub workflow_state: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct EventMeetingResourceRecord {
    pub id: String,
    pub allow_double_book_mask: i32,
    pub campus_name: String,
    pub conflicting_activity_id: Option<String>,
    pub conflicting_activity_type_code: i32,
    pub description: String,
    pub end_date: Option<String>,
    pub end_minute: i32,
    pub event_meeting_id: String,
    pub failed_availability_check: bool,
    pub last_sis_update_date: Option<String>,
    pub last_imported_date: Option<String>,
    pub move_with_meeting: bool,
    pub requires_attention: bool,
    pub requires_attention_reason: Option<String>,
    pub resource_id: String,
    pub resource_name: String,
    pub resource_type_code: i32,
    pub resource_reservation_id: Option<String>,
    pub scheduled_by: Option<String>,
    pub scheduled_date: Option<String>,
    pub selected_qty: i32,
    pub sis_key: Option<String>,
    pub status_text: String,
    pub start_date: Option<String>,
    pub start_minute: i32,
    pub usage_type_code: i32,
    pub workflow_intent: String,
    pub workflow_intent_owner_id: String,
    pub workflow_state: Option<String>,
}
