use axum::{
    routing::{get, post},
    Router,
};
use registry::AppRegistry;

use crate::handler::event::{
    cancel_registration, delete_event, register_event, register_for_event, show_capacity,
    show_event, show_event_list, show_event_registrations, update_event,
};

pub fn build_event_routers() -> Router<AppRegistry> {
    let events_routers = Router::new()
        .route("/", get(show_event_list).post(register_event))
        .route(
            "/:event_id",
            get(show_event).put(update_event).delete(delete_event),
        )
        .route(
            "/:event_id/register",
            post(register_for_event).delete(cancel_registration),
        )
        .route("/:event_id/capacity", get(show_capacity))
        .route("/:event_id/registrations", get(show_event_registrations));

    Router::new().nest("/events", events_routers)
}
