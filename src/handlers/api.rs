use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use std::sync::Arc;
use tracing::info;

use crate::client::AstraClient;
use crate::error::{BridgeError, BridgeResult};
use crate::models::reservation::{BookingDefaults, MeetingWindow, ReservationParams};
use crate::models::room::{AvailabilityParams, RoomAvailability};
use crate::services::availability::resolve_availability;
use crate::services::reservation::submit_reservation;

// AppState struct containing shared resources
pub struct AppState {
    pub client: AstraClient,
    pub defaults: BookingDefaults,
}

/// Both endpoints take their window as query parameters; absent and empty
/// both count as missing, checked before any backend traffic.
fn required<'a>(value: &'a Option<String>, name: &'static str) -> BridgeResult<&'a str> {
    match value.as_deref() {
        Some(text) if !text.is_empty() => Ok(text),
        _ => Err(BridgeError::MissingParameter(name)),
    }
}

// Room availability endpoint
pub async fn room_availability(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AvailabilityParams>,
) -> Result<Json<Vec<RoomAvailability>>, BridgeError> {
    let start = required(&params.start, "start")?;
    let end = required(&params.end, "end")?;
    info!(
        "Received availability request for {} through {}",
        start, end
    );

    let rooms = resolve_availability(&state.client, start, end).await?;
    info!("Answering with {} rooms", rooms.len());
    Ok(Json(rooms))
}

// Room reservation endpoint
pub async fn reserve_room(
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<String>,
    Query(params): Query<ReservationParams>,
) -> Result<StatusCode, BridgeError> {
    let start = required(&params.start, "start")?;
    let end = required(&params.end, "end")?;
    info!(
        "Received reservation request for room {} from {} to {}",
        room_id, start, end
    );

    let window = MeetingWindow::parse(start, end)?;
    submit_reservation(&state.client, &room_id, &window, &state.defaults).await?;
    Ok(StatusCode::OK)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_rejects_absent_and_empty_values() {
        assert!(required(&None, "start").is_err());
        assert!(required(&Some(String::new()), "start").is_err());

        let err = required(&None, "end").unwrap_err();
        match err {
            BridgeError::MissingParameter(name) => assert_eq!(name, "end"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn required_passes_populated_values_through() {
        let value = Some("2024-03-01T09:00:00".to_string());
        assert_eq!(required(&value, "start").unwrap(), "2024-03-01T09:00:00");
    }
}
