use axum::{routing::post, Router};
use registry::AppRegistry;

use crate::handler::auth::{login, logout, register, session};

pub fn build_auth_routers() -> Router<AppRegistry> {
    let auth_routers = Router::new()
        .route("/logout", post(logout))
        .route("/register", post(register));

    Router::new()
        .route("/login", post(login).get(session))
        .nest("/auth", auth_routers)
}
