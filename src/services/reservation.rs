//! Reservation pipeline: eight backend lookups resolved concurrently, one
//! four-entity create-document assembled and submitted.

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::client::{
    AstraClient, CUSTOMER_PATH, EVENT_REQUEST_FORM_PATH, EVENT_REQUEST_PATH, ORGANIZATION_PATH,
    RESERVATION_NUMBER_PATH, ROOMS_PATH, ROOM_CONFIGURATION_PATH, USER_PATH,
};
use crate::error::{BridgeError, BridgeResult};
use crate::models::reservation::{
    BookingDefaults, CreateOp, EventMeetingRecord, EventMeetingResourceRecord, EventRecord,
    EventRequestMeetingRecord, MeetingWindow, ReservationDraft,
};
use crate::query::ReadQuery;

/// Resource type code the backend assigns to rooms.
pub const ROOM_RESOURCE_TYPE_CODE: i32 = 49;

/// Workflow intent letter for a direct submission.
pub const WORKFLOW_INTENT_SUBMIT: &str = "S";

const ROOM_FIELDS: [&str; 10] = [
    "Id",
    "Name",
    "RoomNumber",
    "RoomType.Name",
    "Building.Name",
    "Building.BuildingCode",
    "MaxOccupancy",
    "IsActive",
    "Building.Campus.Name",
    "SisKey",
];

/// Room identity resolved for the draft.
#[derive(Debug, Clone)]
pub struct RoomMetadata {
    pub name: String,
    pub number: String,
    pub building_name: String,
    pub building_code: String,
    pub campus_name: String,
    pub sis_key: Option<String>,
}

impl RoomMetadata {
    /// `{building} {room}`, the label meeting records carry.
    pub fn building_room(&self) -> String {
        format!("{} {}", self.building_name, self.name)
    }

    /// `{building code} {room number}`, the resource display name.
    pub fn resource_label(&self) -> String {
        format!("{} {}", self.building_code, self.number)
    }
}

/// Everything resolved from the backend that the draft derives from.
#[derive(Debug)]
pub struct DraftInputs {
    pub room: RoomMetadata,
    pub room_configuration_id: String,
    pub institution_id: Option<String>,
    pub reservation_number: String,
    pub customer_id: String,
    pub customer_contact_id: String,
}

fn string_column(row: &[Value], index: usize) -> Option<String> {
    row.get(index).and_then(Value::as_str).map(str::to_string)
}

fn column_text(row: &[Value], index: usize) -> String {
    string_column(row, index).unwrap_or_default()
}

fn first_id(rows: &[Vec<Value>], operation: &'static str) -> BridgeResult<String> {
    rows.first()
        .and_then(|row| row.first())
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| BridgeError::query_empty(operation))
}

/// Backend booleans come back as JSON bools or 0/1 numbers depending on
/// the collection.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().map(|f| f != 0.0).unwrap_or(false),
        _ => false,
    }
}

async fn lookup_room(client: &AstraClient, room_id: &str) -> BridgeResult<RoomMetadata> {
    let rows = client
        .query_rows(
            "room metadata",
            ROOMS_PATH,
            ReadQuery::new()
                .fields(&ROOM_FIELDS)
                .filter(format!(r#"Id=="{}""#, room_id)),
        )
        .await?;
    let row = rows
        .first()
        .ok_or_else(|| BridgeError::query_empty("room metadata"))?;

    Ok(RoomMetadata {
        name: column_text(row, 1),
        number: column_text(row, 2),
        building_name: column_text(row, 4),
        building_code: column_text(row, 5),
        campus_name: column_text(row, 8),
        sis_key: string_column(row, 9),
    })
}

async fn lookup_form_id(client: &AstraClient) -> BridgeResult<String> {
    let rows = client
        .query_rows(
            "event request form",
            EVENT_REQUEST_FORM_PATH,
            ReadQuery::new().fields(&["Id", "Name"]).filter("IsActive==1"),
        )
        .await?;
    first_id(&rows, "event request form")
}

async fn lookup_room_configuration(client: &AstraClient, room_id: &str) -> BridgeResult<String> {
    let rows = client
        .query_rows(
            "room configuration",
            ROOM_CONFIGURATION_PATH,
            ReadQuery::new().fields(&["Id", "IsActive"]).filter(format!(
                r#"RoomId=="{}"&&IsActive==1&&IsDefault==1"#,
                room_id
            )),
        )
        .await?;
    first_id(&rows, "room configuration")
}

/// The organization collection takes no filter, so the instance match
/// happens client-side. First active row with the right instance name wins.
fn match_institution(rows: &[Vec<Value>], instance_name: &str) -> Option<String> {
    rows.iter().find_map(|row| {
        let active = row.get(2).map(is_truthy).unwrap_or(false);
        let name_matches = row.get(3).and_then(Value::as_str) == Some(instance_name);
        if active && name_matches {
            string_column(row, 0)
        } else {
            None
        }
    })
}

async fn lookup_institution(
    client: &AstraClient,
    instance_name: &str,
) -> BridgeResult<Option<String>> {
    let rows = client
        .query_rows(
            "organization",
            ORGANIZATION_PATH,
            ReadQuery::new().fields(&["Id", "Name", "IsActive", "InstanceName"]),
        )
        .await?;

    let institution = match_institution(&rows, instance_name);
    if institution.is_none() {
        warn!("No active institution matches instance {}", instance_name);
    }
    Ok(institution)
}

async fn lookup_latest_request_numbers(client: &AstraClient) -> BridgeResult<Vec<String>> {
    let rows = client
        .query_rows(
            "event request",
            EVENT_REQUEST_PATH,
            ReadQuery::new()
                .fields(&["RequestNumber"])
                .sort_order("-RequestNumber")
                .limit(1),
        )
        .await?;
    Ok(rows.iter().filter_map(|row| string_column(row, 0)).collect())
}

async fn lookup_reservation_number(client: &AstraClient) -> BridgeResult<String> {
    let number = client
        .get_text("reservation number", RESERVATION_NUMBER_PATH)
        .await?;
    if number.is_empty() {
        return Err(BridgeError::query_empty("reservation number"));
    }
    Ok(number)
}

async fn lookup_customer(client: &AstraClient, name: &str) -> BridgeResult<String> {
    let rows = client
        .query_rows(
            "customer",
            CUSTOMER_PATH,
            ReadQuery::new()
                .fields(&["Id", "Name"])
                .filter(format!(r#"Name=="{}""#, name)),
        )
        .await?;
    first_id(&rows, "customer")
}

async fn lookup_customer_contact(client: &AstraClient, user_name: &str) -> BridgeResult<String> {
    let rows = client
        .query_rows(
            "customer contact",
            USER_PATH,
            ReadQuery::new()
                .fields(&["Id", "UserName", "IsActive"])
                .filter(format!(r#"UserName=="{}"&&IsActive==1"#, user_name)),
        )
        .await?;
    first_id(&rows, "customer contact")
}

/// Successor of the highest request number already issued this year,
/// rendered `YYYY-NNNNN`. Rows from other years or in other shapes are
/// ignored. Read-then-increment is racy under concurrent submissions;
/// allocation is confined here so it can move behind an atomic backend
/// counter when one exists.
pub fn next_request_number(rows: &[String], current_year: &str) -> String {
    let current_max = rows
        .iter()
        .filter_map(|value| value.split_once('-'))
        .filter(|(year, _)| *year == current_year)
        .filter_map(|(_, number)| number.parse::<u32>().ok())
        .max()
        .unwrap_or(0);

    format!("{}-{:05}", current_year, current_max + 1)
}

/// Assemble the four-entity create-document. Five ids are generated here:
/// event, request meeting, meeting, meeting resource, and an event-request
/// id that only the request-meeting row references. The backend accepts
/// that dangling reference; the event itself keeps a null request id.
pub fn build_draft(
    inputs: &DraftInputs,
    window: &MeetingWindow,
    defaults: &BookingDefaults,
) -> ReservationDraft {
    let event_id = Uuid::new_v4().to_string();
    let event_request_id = Uuid::new_v4().to_string();
    let event_request_meeting_id = Uuid::new_v4().to_string();
    let event_meeting_id = Uuid::new_v4().to_string();
    let event_meeting_resource_id = Uuid::new_v4().to_string();

    let event = EventRecord {
        id: event_id.clone(),
        accounting_key: None,
        allow_attendee_sign_up: false,
        customer_contact_name: defaults.customer_name.clone(),
        customer_contact_id: inputs.customer_contact_id.clone(),
        primary_customer_contact_id: inputs.customer_contact_id.clone(),
        customer_id: inputs.customer_id.clone(),
        customer_name: defaults.customer_name.clone(),
        description: None,
        do_notify_primary_contact: true,
        edit_counter: 0,
        estimated_attendance: 0,
        event_owner_name: defaults.event_owner_name.clone(),
        event_request_id: None,
        event_type_id: defaults.event_type_id.clone(),
        event_type_name: defaults.event_type_name.clone(),
        external_description_id: None,
        institution_contact_id: None,
        institution_id: inputs.institution_id.clone(),
        is_featured: false,
        is_private: false,
        last_imported_date: None,
        last_sis_update_date: None,
        name: defaults.event_name.clone(),
        notify: None,
        next_meeting_number: 0,
        owner_id: inputs.customer_contact_id.clone(),
        recordable_attendee_type: 0,
        requires_attention: false,
        requires_attention_reason: None,
        reservation_number: inputs.reservation_number.clone(),
        sis_key: None,
        status_text: String::new(),
        uploaded_picture_id: None,
        workflow_instance_id: None,
        workflow_intent: WORKFLOW_INTENT_SUBMIT.to_string(),
        workflow_intent_owner_id: defaults.workflow_owner_id.clone(),
        workflow_state: None,
    };

    let event_request_meeting = EventRequestMeetingRecord {
        id: event_request_meeting_id.clone(),
        description: defaults.description(),
        end_date: window.end_date(),
        end_minute: window.end_minute(),
        event_meeting_type_id: None,
        event_req_meeting_group_id: None,
        event_request_id,
        is_featured_event: false,
        is_private_event: false,
        is_room_required: true,
        last_imported_date: None,
        last_sis_update_date: None,
        max_attendance: None,
        name: defaults.event_name.clone(),
        recurrence_pattern_id: None,
        requires_attention: false,
        requires_attention_reason: None,
        room_configuration_id: inputs.room_configuration_id.clone(),
        sis_key: inputs.room.sis_key.clone(),
        start_date: window.start_date(),
        start_minute: window.start_minute(),
    };

    let event_meeting = EventMeetingRecord {
        id: event_meeting_id.clone(),
        accounting_key: None,
        actual_attendance: 0,
        building_room: inputs.room.building_room(),
        conflict_desc: String::new(),
        conflicts_with_holiday: false,
        customer_contact_id: inputs.customer_contact_id.clone(),
        customer_contact_name: defaults.customer_contact_name.clone(),
        customer_id: inputs.customer_id.clone(),
        customer_name: defaults.customer_name.clone(),
        days_mask: 0,
        description: None,
        duration: window.duration_minutes(),
        end_date: window.end_date(),
        end_minute: window.end_minute(),
        event_id,
        event_meeting_group_id: None,
        event_meeting_type_id: None,
        event_meeting_type_name: String::new(),
        event_request_meeting_id,
        institution_contact_id: None,
        is_exception: false,
        is_featured: false,
        is_private: false,
        is_room_required: true,
        is_usage_out_dated: false,
        last_imported_date: None,
        last_sis_update_date: None,
        max_attendance: 0,
        meeting_number: 0,
        name: defaults.event_name.clone(),
        owner_id: inputs.customer_contact_id.clone(),
        recurrence_pattern_id: None,
        requires_attention: false,
        requires_attention_reason: None,
        resources_summary: String::new(),
        sis_key: None,
        start_date: window.start_date(),
        start_minute: window.start_minute(),
        status_text: String::new(),
        workflow_intent: WORKFLOW_INTENT_SUBMIT.to_string(),
        workflow_intent_owner_id: inputs.customer_contact_id.clone(),
        workflow_state: None,
    };

    let event_meeting_resource = EventMeetingResourceRecord {
        id: event_meeting_resource_id,
        allow_double_book_mask: 0,
        campus_name: inputs.room.campus_name.clone(),
        conflicting_activity_id: None,
        conflicting_activity_type_code: 0,
        description: inputs.room.building_room(),
        end_date: None,
        end_minute: 0,
        event_meeting_id,
        failed_availability_check: false,
        last_sis_update_date: None,
        last_imported_date: None,
        move_with_meeting: true,
        requires_attention: false,
        requires_attention_reason: None,
        resource_id: inputs.room_configuration_id.clone(),
        resource_name: inputs.room.resource_label(),
        resource_type_code: ROOM_RESOURCE_TYPE_CODE,
        resource_reservation_id: None,
        scheduled_by: None,
        scheduled_date: None,
        selected_qty: 1,
        sis_key: None,
        status_text: String::new(),
        start_date: None,
        start_minute: 0,
        usage_type_code: 0,
        workflow_intent: WORKFLOW_INTENT_SUBMIT.to_string(),
        workflow_intent_owner_id: inputs.customer_contact_id.clone(),
        workflow_state: None,
    };

    ReservationDraft {
        event: CreateOp::one(event),
        event_request_meeting: CreateOp::one(event_request_meeting),
        event_meeting: CreateOp::one(event_meeting),
        event_meeting_resource: CreateOp::one(event_meeting_resource),
    }
}

/// Resolve every lookup concurrently, then assemble and submit the draft.
/// The first failed lookup cancels the rest and nothing is written.
pub async fn submit_reservation(
    client: &AstraClient,
    room_id: &str,
    window: &MeetingWindow,
    defaults: &BookingDefaults,
) -> BridgeResult<()> {
    info!(
        "Reserving room {} from {} to {}",
        room_id, window.start, window.end
    );

    let (
        room,
        form_id,
        room_configuration_id,
        institution_id,
        request_rows,
        reservation_number,
        customer_id,
        customer_contact_id,
    ) = tokio::try_join!(
        lookup_room(client, room_id),
        lookup_form_id(client),
        lookup_room_configuration(client, room_id),
        lookup_institution(client, &defaults.instance_name),
        lookup_latest_request_numbers(client),
        lookup_reservation_number(client),
        lookup_customer(client, &defaults.customer_name),
        lookup_customer_contact(client, &defaults.customer_contact_name),
    )?;

    let current_year = Utc::now().format("%Y").to_string();
    let request_number = next_request_number(&request_rows, &current_year);

    debug!("Active request form {}", form_id);
    debug!(
        "Draft inputs: room {}, configuration {}, institution {:?}, request {}, reservation {}",
        room.building_room(),
        room_configuration_id,
        institution_id,
        request_number,
        reservation_number
    );

    let inputs = DraftInputs {
        room,
        room_configuration_id,
        institution_id,
        reservation_number,
        customer_id,
        customer_contact_id,
    };
    let draft = build_draft(&inputs, window, defaults);
    client.create_entities(&draft).await?;

    info!(
        "Room {} reserved under {}",
        room_id, inputs.reservation_number
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_inputs() -> DraftInputs {
        DraftInputs {
            room: RoomMetadata {
                name: "102".to_string(),
                number: "102".to_string(),
                building_name: "Adams Hall".to_string(),
                building_code: "AH".to_string(),
                campus_name: "Main Campus".to_string(),
                sis_key: Some("ADAMS-102".to_string()),
            },
            room_configuration_id: "config-1".to_string(),
            institution_id: Some("inst-1".to_string()),
            reservation_number: "20240301-00006".to_string(),
            customer_id: "cust-1".to_string(),
            customer_contact_id: "contact-1".to_string(),
        }
    }

    fn sample_window() -> MeetingWindow {
        MeetingWindow::parse("2019-08-17T18:00:00", "2019-08-17T18:30:00").unwrap()
    }

    #[test]
    fn request_number_increments_the_current_year_maximum() {
        let rows = vec!["2024-00007".to_string(), "2023-00099".to_string()];
        assert_eq!(next_request_number(&rows, "2024"), "2024-00008");
    }

    #[test]
    fn request_number_rolls_over_to_one_for_a_fresh_year() {
        assert_eq!(next_request_number(&[], "2025"), "2025-00001");

        let prior_year_only = vec!["2024-00321".to_string()];
        assert_eq!(next_request_number(&prior_year_only, "2025"), "2025-00001");
    }

    #[test]
    fn request_number_skips_malformed_rows() {
        let rows = vec![
            "not-a-number".to_string(),
            "2024".to_string(),
            "2024-00004".to_string(),
        ];
        assert_eq!(next_request_number(&rows, "2024"), "2024-00005");
    }

    #[test]
    fn institution_match_requires_active_and_instance_name() {
        let rows = vec![
            vec![json!("org-1"), json!("Other"), json!(1), json!("ELSEWHERE")],
            vec![json!("org-2"), json!("Dormant"), json!(0), json!("AS8DEMO1")],
            vec![json!("org-3"), json!("Demo"), json!(1), json!("AS8DEMO1")],
        ];

        assert_eq!(match_institution(&rows, "AS8DEMO1"), Some("org-3".to_string()));
        assert_eq!(match_institution(&rows, "NOWHERE"), None);
    }

    #[test]
    fn institution_match_accepts_boolean_active_flags() {
        let rows = vec![vec![
            json!("org-1"),
            json!("Demo"),
            json!(true),
            json!("AS8DEMO1"),
        ]];
        assert_eq!(match_institution(&rows, "AS8DEMO1"), Some("org-1".to_string()));
    }

    #[test]
    fn draft_links_records_into_one_chain() {
        let draft = build_draft(&sample_inputs(), &sample_window(), &BookingDefaults::from_env());
        let event = &draft.event.create[0];
        let request_meeting = &draft.event_request_meeting.create[0];
        let meeting = &draft.event_meeting.create[0];
        let resource = &draft.event_meeting_resource.create[0];

        assert_eq!(meeting.event_id, event.id);
        assert_eq!(resource.event_meeting_id, meeting.id);
        assert_eq!(meeting.event_request_meeting_id, request_meeting.id);

        // The event-request row itself is never created.
        assert!(event.event_request_id.is_none());
        assert!(!request_meeting.event_request_id.is_empty());
        assert_ne!(request_meeting.event_request_id, event.id);
    }

    #[test]
    fn draft_derives_window_and_room_fields() {
        let draft = build_draft(&sample_inputs(), &sample_window(), &BookingDefaults::from_env());
        let request_meeting = &draft.event_request_meeting.create[0];
        let meeting = &draft.event_meeting.create[0];
        let resource = &draft.event_meeting_resource.create[0];

        assert_eq!(meeting.start_date, "2019-08-17T00:00:00");
        assert_eq!(meeting.end_date, "2019-08-17T00:00:00");
        assert_eq!(meeting.start_minute, 1080);
        assert_eq!(meeting.end_minute, 1110);
        assert_eq!(meeting.duration, 30);
        assert_eq!(meeting.building_room, "Adams Hall 102");

        assert_eq!(request_meeting.start_minute, 1080);
        assert_eq!(request_meeting.room_configuration_id, "config-1");
        assert_eq!(request_meeting.sis_key.as_deref(), Some("ADAMS-102"));

        assert_eq!(resource.resource_id, "config-1");
        assert_eq!(resource.resource_name, "AH 102");
        assert_eq!(resource.description, "Adams Hall 102");
        assert_eq!(resource.campus_name, "Main Campus");
        assert_eq!(resource.resource_type_code, 49);
        assert_eq!(resource.selected_qty, 1);
    }

    #[test]
    fn draft_serializes_with_creation_wrappers_and_explicit_nulls() {
        let draft = build_draft(&sample_inputs(), &sample_window(), &BookingDefaults::from_env());
        let json = serde_json::to_value(&draft).unwrap();

        let event = &json["Event"]["+"][0];
        assert_eq!(event["ReservationNumber"], "20240301-00006");
        assert_eq!(event["WorkflowIntent"], "S");
        assert_eq!(event["DoNotifyPrimaryContact"], true);
        // Absent values must still appear as null keys.
        assert!(event["AccountingKey"].is_null());
        assert!(event["EventRequestId"].is_null());
        assert!(event.get("UploadedPictureId").is_some());

        let meeting = &json["EventMeeting"]["+"][0];
        assert_eq!(meeting["BuildingRoom"], "Adams Hall 102");
        assert_eq!(meeting["IsUsageOutDated"], false);

        let resource = &json["EventMeetingResource"]["+"][0];
        assert_eq!(resource["ResourceTypeCode"], 49);
        assert!(resource["StartDate"].is_null());
        assert_eq!(resource["MoveWithMeeting"], true);
    }
}
