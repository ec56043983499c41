mod admin;
mod form;
mod health;
mod home;
mod users;

use axum::{Router, middleware, routing::get};
use tower_http::services::ServeDir;

use crate::{AppState, middleware::admin_middleware};

pub fn create_router(state: AppState) -> Router<AppState> {
    let admin = admin::router().route_layer(middleware::from_fn_with_state(
        state.clone(),
        admin_middleware,
    ));

    Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check))
        .nest("/v1/user", users::router(state.clone()))
        .nest("/v1/admin", admin)
        .nest("/v1/home", home::router())
        .nest_service("/images", ServeDir::new(&state.config.media.root))
}
