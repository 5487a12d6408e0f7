//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                         - Public gallery (grid + preview dialog)
//! GET  /gallery/{id}/download    - Download a product's image
//!
//! GET  /darshan                  - Admin editor (form + list)
//! POST /darshan                  - Create record (multipart, image required)
//! POST /darshan/{id}             - Update record (multipart, image optional)
//! POST /darshan/{id}/delete      - Delete record and its object
//!
//! GET  /health                   - Liveness check
//! GET  /health/ready             - Readiness check (database ping)
//! ```

pub mod admin;
pub mod gallery;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};

use crate::state::AppState;

/// Uploads are photos; allow up to 10 MiB per request.
const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Create the public gallery routes router.
pub fn gallery_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(gallery::index))
        .route("/gallery/{id}/download", get(gallery::download))
}

/// Create the admin editor routes router.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/darshan", get(admin::index).post(admin::create))
        .route("/darshan/{id}", post(admin::update))
        .route("/darshan/{id}/delete", post(admin::delete))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
}

/// Create all routes for the application.
pub fn routes() -> Router<AppState> {
    Router::new().merge(gallery_routes()).merge(admin_routes())
}
