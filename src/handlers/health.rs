use axum::{extract::State, response::Json};
use std::sync::Arc;

use crate::handlers::api::AppState;
use crate::services::pricing::PriceCatalog;

// Health check endpoint
pub async fn health_check() -> &'static str {
    "OK"
}

// Price list shown next to the booking form
pub async fn pricing(State(state): State<Arc<AppState>>) -> Json<PriceCatalog> {
    Json(state.catalog.clone())
}
