use axum::{extract::State, Json};
use std::sync::Arc;

use super::error::ApiError;
use super::AppState;
use crate::services::workflow::{BookRequest, BookResult};

pub async fn health() -> &'static str {
    "OK"
}

pub async fn generate_book(
    State(state): State<Arc<AppState>>,
    Json(request): Json<BookRequest>,
) -> Result<Json<BookResult>, ApiError> {
    let result = state.workflow.run(request).await?;
    Ok(Json(result))
}
