use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tracing::info;

use crate::handlers::api::{reserve_room, room_availability, AppState};
use crate::handlers::test::{health_check, sample_reservation_document};

pub fn create_router(app_state: Arc<AppState>, is_production: bool) -> Router {
    let mut router = Router::new();

    // Health check is always mounted
    let health_routes = Router::new().route("/health", get(health_check));
    router = router.merge(health_routes);

    // Bridge endpoints consumed by the add-in are always available
    let space_routes = Router::new()
        .route("/spaces/rooms/availability", get(room_availability))
        .route("/spaces/rooms/:room_id/reservation", post(reserve_room));
    router = router.merge(space_routes);

    // Only add inspection routes if not in production mode
    if !is_production {
        let inspection_routes =
            Router::new().route("/test/reservation-document", get(sample_reservation_document));
        router = router.merge(inspection_routes);

        info!("Inspection routes enabled - server running in development mode");
    } else {
        info!("Running in production mode - only bridge and health endpoints exposed");
    }

    router.with_state(app_state)
}
