//! HTTP surface: one generation endpoint and a liveness probe.

pub mod error;
pub mod handlers;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::services::workflow::BookWorkflow;

pub struct AppState {
    pub workflow: BookWorkflow,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/generate-book/", post(handlers::generate_book))
        .route("/generate-book", post(handlers::generate_book))
        .with_state(state)
}
