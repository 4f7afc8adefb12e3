use axum::{
    routing::{get, put},
    Router,
};
use registry::AppRegistry;

use crate::handler::registration::{show_registration_list, update_registration_status};

pub fn build_registration_routers() -> Router<AppRegistry> {
    let registrations_routers = Router::new()
        .route("/", get(show_registration_list))
        .route("/:registration_id", put(update_registration_status));

    Router::new().nest("/registrations", registrations_routers)
}
