use serde::{Deserialize, Serialize};

/// Query parameters for the room-availability endpoint.
#[derive(Debug, Deserialize)]
pub struct AvailabilityParams {
    pub start: Option<String>,
    pub end: Option<String>,
}

/// One room in an availability response, in backend search order.
///
/// Field names are part of the response contract consumed by the add-in,
/// including the odd third key, which repeats the room id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomAvailability {
    pub room_id: String,
    pub room_building_and_number: String,
    pub why_is_room_id_here_twice: String,
    pub available: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn availability_serializes_with_contract_keys() {
        let room = RoomAvailability {
            room_id: "room-1".to_string(),
            room_building_and_number: "Main Hall 101".to_string(),
            why_is_room_id_here_twice: "room-1".to_string(),
            available: true,
        };

        let json = serde_json::to_value(&room).unwrap();
        assert_eq!(json["roomId"], "room-1");
        assert_eq!(json["roomBuildingAndNumber"], "Main Hall 101");
        assert_eq!(json["whyIsRoomIdHereTwice"], "room-1");
        assert_eq!(json["available"], true);
    }
}
