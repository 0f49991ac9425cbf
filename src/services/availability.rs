//! Room-availability pipeline: one schedulable-room query, one
//! overlapping-activity query, conflict marking in between.

use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, info};

use crate::client::{AstraClient, CALENDAR_WEEK_GRID_PATH, ROOM_SEARCH_PATH};
use crate::error::BridgeResult;
use crate::models::room::RoomAvailability;
use crate::query::ReadQuery;

/// Activity grid projection. Only the trailing `ResourceId` feeds the
/// conflict pass; the leading columns keep traces readable.
const ACTIVITY_FIELDS: [&str; 7] = [
    "ActivityId",
    "ActivityName",
    "StartDate",
    "EndDate",
    "StartMinute",
    "EndMinute",
    "ResourceId",
];

const RESOURCE_ID_COLUMN: usize = ACTIVITY_FIELDS.len() - 1;

/// Rooms schedulable at all across the requested dates, in building and
/// room order. The collection's default projection answers
/// `[id, building-and-number, id]`.
pub fn room_search_query(start: &str, end: &str) -> ReadQuery {
    ReadQuery::new()
        .filter(format!(
            r#"EffectiveEndDate>="{}"&&EffectiveStartDate<="{}"&&DoNotSchedule==0"#,
            end, start
        ))
        .sort_order("+Building.Name,Name")
}

/// Activities overlapping the window: started before the requested end and
/// ending after the requested start, restricted to usages that block
/// scheduling (mask bit 8, with null meaning unrestricted).
pub fn activity_overlap_query(start: &str, end: &str) -> ReadQuery {
    ReadQuery::new()
        .fields(&ACTIVITY_FIELDS)
        .filter(format!(
            r#"((StartDate<"{}")&&(EndDate>"{}"))&&((NotAllowedUsageMask==null)||((NotAllowedUsageMask&8)==8))"#,
            end, start
        ))
        .sort_order("+StartDate,+StartMinute")
        .page(1)
        .param("isForWeekView", "false")
}

fn string_column(row: &[Value], index: usize) -> Option<String> {
    row.get(index).and_then(Value::as_str).map(str::to_string)
}

/// Annotate the grid's positional rows; every room starts available.
/// Rows without a string id cannot be marked later and are dropped.
pub fn decode_rooms(rows: Vec<Vec<Value>>) -> Vec<RoomAvailability> {
    rows.into_iter()
        .filter_map(|row| {
            let room_id = string_column(&row, 0)?;
            Some(RoomAvailability {
                room_building_and_number: string_column(&row, 1).unwrap_or_default(),
                why_is_room_id_here_twice: string_column(&row, 2).unwrap_or_default(),
                room_id,
                available: true,
            })
        })
        .collect()
}

/// Resource ids of the overlapping activities. Rows without a string
/// resource id are skipped.
pub fn decode_busy_resource_ids(rows: &[Vec<Value>]) -> Vec<String> {
    rows.iter()
        .filter_map(|row| string_column(row, RESOURCE_ID_COLUMN))
        .collect()
}

/// Mark every room whose id appears among the busy resource ids. Room
/// order is untouched and duplicate room ids all get marked.
pub fn apply_activity_conflicts(rooms: &mut [RoomAvailability], busy: &[String]) {
    let mut by_id: HashMap<String, Vec<usize>> = HashMap::new();
    for (index, room) in rooms.iter().enumerate() {
        by_id.entry(room.room_id.clone()).or_default().push(index);
    }

    for resource_id in busy {
        if let Some(indexes) = by_id.get(resource_id) {
            for &index in indexes {
                rooms[index].available = false;
            }
        }
    }
}

/// Two-step pipeline: list the schedulable rooms for the dates, then mark
/// the ones an overlapping activity already occupies. Both queries are
/// always issued, even when the room grid comes back empty.
pub async fn resolve_availability(
    client: &AstraClient,
    start: &str,
    end: &str,
) -> BridgeResult<Vec<RoomAvailability>> {
    let room_rows = client
        .query_rows(
            "room search",
            ROOM_SEARCH_PATH,
            room_search_query(start, end),
        )
        .await?;
    let mut rooms = decode_rooms(room_rows);
    info!("Room grid returned {} schedulable rooms", rooms.len());

    let activity_rows = client
        .query_rows(
            "activity grid",
            CALENDAR_WEEK_GRID_PATH,
            activity_overlap_query(start, end),
        )
        .await?;
    let busy = decode_busy_resource_ids(&activity_rows);
    debug!("{} overlapping activities inside the window", busy.len());

    apply_activity_conflicts(&mut rooms, &busy);
    Ok(rooms)
}
