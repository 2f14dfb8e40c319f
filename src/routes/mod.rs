//! Route modules for Marginalia Server

pub mod health;
pub mod pages;
pub mod render;

use axum::{routing::get, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the application router
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health_check))
        .route("/api/v1/health", get(health::health_check))
        .nest("/api/v1/pages", pages::router())
        .nest("/api/v1/render", render::router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
