use axum::{
    routing::{get, put},
    Router,
};
use registry::AppRegistry;

use crate::handler::user::{
    change_password, change_role, get_current_user, get_my_registrations, list_users,
    update_current_user,
};

pub fn build_user_routers() -> Router<AppRegistry> {
    let me_routers = Router::new()
        .route("/", get(get_current_user).put(update_current_user))
        .route("/password", put(change_password))
        .route("/registrations", get(get_my_registrations));

    Router::new()
        .nest("/me", me_routers)
        .route("/users", get(list_users).put(change_role))
}
