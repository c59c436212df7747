//! Defines routes for the catalogue API.
//!
//! ## Structure
//! - **Service endpoints**
//!   - `GET  /`        — greeting
//!   - `GET  /healthz` — liveness
//!   - `GET  /readyz`  — readiness
//!
//! - **Item endpoints**
//!   - `GET  /items`      — list all items
//!   - `POST /items`      — create an item (multipart: name, category, image)
//!   - `GET  /items/{id}` — fetch an item by zero-based position
//!
//! - **Image endpoints**
//!   - `GET  /images/{filename}` — stream an image, default image if missing

use crate::{
    config::AppConfig,
    handlers::{
        health_handlers::{healthz, hello, readyz},
        image_handlers::get_image,
        item_handlers::{add_item, get_item, get_items},
    },
    state::AppState,
};
use anyhow::Result;
use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::Method,
    routing::get,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Build the router for all catalogue routes.
///
/// The router carries shared state (`AppState`) to all handlers.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(hello))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/items", get(get_items).post(add_item))
        .route("/items/{id}", get(get_item))
        .route("/images/{filename}", get(get_image))
}

/// Attach state and middleware: CORS for the configured front end, request
/// tracing, and the upload size limit.
pub fn app(state: AppState, cfg: &AppConfig) -> Result<Router> {
    let cors = CorsLayer::new()
        .allow_origin(cfg.cors_origin()?)
        .allow_methods([Method::GET, Method::HEAD, Method::POST, Method::OPTIONS]);

    Ok(routes()
        .layer(DefaultBodyLimit::max(cfg.max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state))
}
