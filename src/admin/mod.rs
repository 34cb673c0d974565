//! Admin endpoints for inspecting and refreshing the country mapping.

pub mod auth;
pub mod handlers;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::http::server::AppState;

pub fn setup_admin_router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/admin/mapping", get(get_mapping))
        .route("/admin/mapping/refresh", post(refresh_mapping))
        .route_layer(middleware::from_fn_with_state(state, admin_auth_middleware))
}
