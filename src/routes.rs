use axum::{
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;

use crate::handlers::api::{
    close_form, create_booking, get_form, open_form, select_day, select_service, set_field,
    submit_form, toggle_bin, AppState,
};
use crate::handlers::health::{health_check, pricing};

pub fn create_router(app_state: Arc<AppState>) -> Router {
    let public_routes = Router::new()
        .route("/health", get(health_check))
        .route("/pricing", get(pricing));

    // One-shot booking: the whole request in a single call
    let booking_route = Router::new().route("/bookings", post(create_booking));

    // Interactive form sessions, one draft per form id
    let form_routes = Router::new()
        .route("/forms", post(open_form))
        .route("/forms/:form_id", get(get_form).delete(close_form))
        .route("/forms/:form_id/fields/:field", put(set_field))
        .route("/forms/:form_id/bins/:bin/toggle", post(toggle_bin))
        .route("/forms/:form_id/collection-day", put(select_day))
        .route("/forms/:form_id/service", put(select_service))
        .route("/forms/:form_id/submit", post(submit_form));

    Router::new()
        .merge(public_routes)
        .merge(booking_route)
        .merge(form_routes)
        .with_state(app_state)
}
