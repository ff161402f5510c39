//! Gamemaster API server library: configuration, telemetry, routes and
//! error mapping. The binary in `main.rs` wires these to real services.

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod config;
pub mod error;
pub mod routes;
pub mod state;
pub mod telemetry;

/// Builds the full application router over `state`.
pub fn app(state: state::AppState) -> Router {
    // TODO: restrict CORS origins once the web client host is configurable.
    Router::new()
        .merge(routes::health::router())
        .nest("/api/v1/game", routes::game::router())
        .nest("/api/v1/system", routes::system::router())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
