use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::error::ApiError;
use crate::models::booking::{Bin, BookingRequest, CollectionDay, ServiceTier};
use crate::models::form::TextField;
use crate::services::pricing::PriceCatalog;
use crate::services::submission::{
    BookingForm, FormRegistry, FormView, SubmitOutcome, SubmitReport,
};

// AppState struct containing shared resources
pub struct AppState {
    pub forms: FormRegistry,
    pub catalog: PriceCatalog,
}

#[derive(Debug, Deserialize)]
pub struct FieldValue {
    pub value: String,
}

#[derive(Debug, Deserialize)]
pub struct DaySelection {
    pub day: CollectionDay,
}

#[derive(Debug, Deserialize)]
pub struct ServiceSelection {
    pub service: ServiceTier,
}

// Response structure for submit endpoints
#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    #[serde(flatten)]
    pub report: SubmitReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub form: Option<FormView>,
}

fn status_for(outcome: &SubmitOutcome) -> StatusCode {
    match outcome {
        SubmitOutcome::Dispatched { .. } => StatusCode::OK,
        SubmitOutcome::Invalid { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        SubmitOutcome::Busy => StatusCode::CONFLICT,
        SubmitOutcome::Failed { .. } => StatusCode::BAD_GATEWAY,
    }
}

fn find_form(state: &AppState, form_id: &str) -> Result<Arc<BookingForm>, ApiError> {
    state
        .forms
        .get(form_id)
        .ok_or_else(|| ApiError::form_not_found(form_id))
}

fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))
}

// Open a new booking form
pub async fn open_form(
    State(state): State<Arc<AppState>>,
) -> Result<(StatusCode, Json<FormView>), ApiError> {
    let (form_id, form) = state.forms.open()?;
    Ok((StatusCode::CREATED, Json(form.view(&form_id, &state.catalog))))
}

pub async fn get_form(
    State(state): State<Arc<AppState>>,
    Path(form_id): Path<String>,
) -> Result<Json<FormView>, ApiError> {
    let form = find_form(&state, &form_id)?;
    Ok(Json(form.view(&form_id, &state.catalog)))
}

pub async fn close_form(
    State(state): State<Arc<AppState>>,
    Path(form_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if state.forms.close(&form_id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::form_not_found(&form_id))
    }
}

pub async fn set_field(
    State(state): State<Arc<AppState>>,
    Path((form_id, field)): Path<(String, String)>,
    payload: Result<Json<FieldValue>, JsonRejection>,
) -> Result<Json<FormView>, ApiError> {
    let field = field.parse::<TextField>().map_err(ApiError::BadRequest)?;
    let body = json_body(payload)?;
    let form = find_form(&state, &form_id)?;

    form.set_field(field, body.value)?;
    Ok(Json(form.view(&form_id, &state.catalog)))
}

pub async fn toggle_bin(
    State(state): State<Arc<AppState>>,
    Path((form_id, bin)): Path<(String, String)>,
) -> Result<Json<FormView>, ApiError> {
    let bin = bin.parse::<Bin>().map_err(ApiError::BadRequest)?;
    let form = find_form(&state, &form_id)?;

    form.toggle_bin(bin)?;
    Ok(Json(form.view(&form_id, &state.catalog)))
}

pub async fn select_day(
    State(state): State<Arc<AppState>>,
    Path(form_id): Path<String>,
    payload: Result<Json<DaySelection>, JsonRejection>,
) -> Result<Json<FormView>, ApiError> {
    let body = json_body(payload)?;
    let form = find_form(&state, &form_id)?;

    form.select_day(body.day)?;
    Ok(Json(form.view(&form_id, &state.catalog)))
}

pub async fn select_service(
    State(state): State<Arc<AppState>>,
    Path(form_id): Path<String>,
    payload: Result<Json<ServiceSelection>, JsonRejection>,
) -> Result<Json<FormView>, ApiError> {
    let body = json_body(payload)?;
    let form = find_form(&state, &form_id)?;

    form.select_service(body.service)?;
    Ok(Json(form.view(&form_id, &state.catalog)))
}

// Submit an open form through its controller
pub async fn submit_form(
    State(state): State<Arc<AppState>>,
    Path(form_id): Path<String>,
) -> Result<(StatusCode, Json<SubmitResponse>), ApiError> {
    let form = find_form(&state, &form_id)?;
    info!("Received submit for booking form {}", form_id);

    let report = form.submit().await;
    let status = status_for(&report.outcome);

    Ok((
        status,
        Json(SubmitResponse {
            report,
            form: Some(form.view(&form_id, &state.catalog)),
        }),
    ))
}

// One-shot booking: a complete request validated and dispatched in one call
pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<BookingRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<SubmitResponse>), ApiError> {
    let request = json_body(payload)?;
    info!("Received booking request from {}", request.name);

    let form = state.forms.detached(request);
    let report = form.submit().await;
    let status = status_for(&report.outcome);

    Ok((status, Json(SubmitResponse { report, form: None })))
}
