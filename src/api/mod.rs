//! HTTP surface.
//!
//! - `GET /`               login form, folder listing, logout / download / thumb actions
//! - `POST /`              login form submission
//! - `GET /oauth/callback` Google consent redirect target
//! - `GET /status`         health check

pub mod browse;
pub mod routes;
pub mod views;

use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::SharedState;

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(routes::index).post(routes::login))
        .route("/oauth/callback", get(routes::oauth_callback))
        .route("/status", get(routes::status))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
