pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};

use crate::analysis::handlers;
use crate::state::AppState;

/// Largest accepted upload, multipart framing included.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route(
            "/api/v1/analyze",
            post(handlers::handle_analyze).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route(
            "/api/v1/users/me/analyses",
            get(handlers::handle_list_analyses),
        )
        .route(
            "/api/v1/users/me/resumes",
            get(handlers::handle_list_resumes),
        )
        .route(
            "/api/v1/resumes/:id",
            delete(handlers::handle_delete_resume),
        )
        .with_state(state)
}
