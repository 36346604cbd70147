use futures::FutureExt;
use serde::Serialize;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::dispatch::{DispatchError, DispatchReceipt, Dispatcher};
use crate::models::booking::{Bin, BookingRequest, CollectionDay, ServiceTier};
use crate::models::common::Notification;
use crate::models::form::{ErrorMap, FormVariant, SubmissionStatus, TextField};
use crate::services::form_store::{FormAction, FormState};
use crate::services::pricing::{PriceCatalog, Quote};
use crate::services::validator::validate;

pub const FILL_REQUIRED_FIELDS: &str = "Please fill all required fields before submitting!";
pub const ALREADY_SUBMITTING: &str = "Your booking is already being submitted. Please wait.";
pub const UNEXPECTED_FAILURE: &str = "Something went wrong. Please try again.";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormError {
    #[error("the service tier is fixed to the monthly package for this form")]
    ServiceTierFixed,

    #[error("this booking is being submitted, edits are not accepted until it settles")]
    Busy,

    #[error("too many booking forms are open, try again later")]
    TooManyForms,
}

/// How a submit attempt ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum SubmitOutcome {
    Dispatched { receipt: DispatchReceipt },
    Invalid { errors: ErrorMap },
    Failed { reason: String },
    Busy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmitReport {
    #[serde(flatten)]
    pub outcome: SubmitOutcome,
    pub notification: Notification,
}

/// Client-facing snapshot of a form.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormView {
    pub id: String,
    pub variant: FormVariant,
    #[serde(flatten)]
    pub state: FormState,
    pub submit_enabled: bool,
    pub quote: Option<Quote>,
}

/// One booking form: its draft, errors and the single-submission gate.
pub struct BookingForm {
    state: Mutex<FormState>,
    dispatcher: Arc<dyn Dispatcher>,
    auto_dismiss_ms: u64,
}

// Returns the form to idle however the dispatch future ends
struct InFlight<'a> {
    form: &'a BookingForm,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.form.update(FormAction::Settled);
    }
}

impl BookingForm {
    pub fn new(dispatcher: Arc<dyn Dispatcher>, auto_dismiss_ms: u64) -> Self {
        Self::with_draft(dispatcher, BookingRequest::empty(), auto_dismiss_ms)
    }

    /// A form pre-filled with a complete request, for one-shot submissions.
    pub fn with_draft(
        dispatcher: Arc<dyn Dispatcher>,
        draft: BookingRequest,
        auto_dismiss_ms: u64,
    ) -> Self {
        let state = FormState {
            draft,
            ..FormState::new()
        };
        Self {
            state: Mutex::new(state),
            dispatcher,
            auto_dismiss_ms,
        }
    }

    pub fn variant(&self) -> FormVariant {
        self.dispatcher.variant()
    }

    pub fn snapshot(&self) -> FormState {
        self.lock().clone()
    }

    pub fn view(&self, id: &str, catalog: &PriceCatalog) -> FormView {
        let state = self.snapshot();
        let variant = self.variant();

        let tier = match variant {
            FormVariant::MessageLink => Some(ServiceTier::MonthlyClean),
            FormVariant::Persisted => state.draft.service,
        };
        let quote = tier.and_then(|tier| catalog.quote(&state.draft.bins, tier));

        FormView {
            id: id.to_string(),
            variant,
            submit_enabled: state.status == SubmissionStatus::Idle,
            state,
            quote,
        }
    }

    pub fn set_field(&self, field: TextField, value: String) -> Result<FormState, FormError> {
        self.edit(FormAction::SetField { field, value })
    }

    pub fn toggle_bin(&self, bin: Bin) -> Result<FormState, FormError> {
        self.edit(FormAction::ToggleBin(bin))
    }

    pub fn select_day(&self, day: CollectionDay) -> Result<FormState, FormError> {
        self.edit(FormAction::SelectDay(day))
    }

    pub fn select_service(&self, tier: ServiceTier) -> Result<FormState, FormError> {
        if !self.variant().requires_service_tier() {
            return Err(FormError::ServiceTierFixed);
        }
        self.edit(FormAction::SelectService(tier))
    }

    /// Validate the draft and, if it passes, dispatch it.
    ///
    /// At most one dispatch runs per form and the draft is frozen while it
    /// runs. The form is back to idle by the time this returns, and on
    /// failure the draft is left as submitted.
    pub async fn submit(&self) -> SubmitReport {
        let request = {
            let mut state = self.lock();

            if state.is_submitting() {
                warn!("Rejected submit attempt while a dispatch is in flight");
                return self.rejected(SubmitOutcome::Busy, ALREADY_SUBMITTING);
            }

            let errors = validate(&state.draft, self.variant());
            if !errors.is_empty() {
                info!("Booking blocked by {} validation error(s)", errors.len());
                *state = std::mem::take(&mut *state)
                    .reduce(FormAction::ValidationFailed(errors.clone()));
                return self.rejected(SubmitOutcome::Invalid { errors }, FILL_REQUIRED_FIELDS);
            }

            *state = std::mem::take(&mut *state).reduce(FormAction::SubmitStarted);
            state.draft.clone()
        };

        let _in_flight = InFlight { form: self };
        debug!("Dispatching booking for {}", request.name);

        let result = AssertUnwindSafe(self.dispatcher.submit(&request))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| {
                let detail = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                Err(DispatchError::Unexpected(detail))
            });

        match result {
            Ok(receipt) => {
                info!("Booking for {} dispatched", request.name);
                self.update(FormAction::DispatchSucceeded);
                SubmitReport {
                    outcome: SubmitOutcome::Dispatched { receipt },
                    notification: Notification::success(
                        self.dispatcher.success_message(),
                        self.auto_dismiss_ms,
                    ),
                }
            }
            Err(e) => {
                error!("Failed to dispatch booking for {}: {}", request.name, e);
                self.update(FormAction::DispatchFailed);
                let message = match &e {
                    DispatchError::Unexpected(_) => UNEXPECTED_FAILURE,
                    _ => self.dispatcher.failure_message(),
                };
                self.rejected(
                    SubmitOutcome::Failed {
                        reason: e.to_string(),
                    },
                    message,
                )
            }
        }
    }

    fn rejected(&self, outcome: SubmitOutcome, message: &str) -> SubmitReport {
        SubmitReport {
            outcome,
            notification: Notification::error(message, self.auto_dismiss_ms),
        }
    }

    fn lock(&self) -> MutexGuard<'_, FormState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // Customer edits; refused while a dispatch holds the draft
    fn edit(&self, action: FormAction) -> Result<FormState, FormError> {
        let mut state = self.lock();
        if state.is_submitting() {
            debug!("Rejected edit on a form that is being submitted");
            return Err(FormError::Busy);
        }
        *state = std::mem::take(&mut *state).reduce(action);
        Ok(state.clone())
    }

    fn update(&self, action: FormAction) -> FormState {
        let mut state = self.lock();
        *state = std::mem::take(&mut *state).reduce(action);
        state.clone()
    }
}

/// Bounds on how many forms stay open and for how long.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryLimits {
    /// Forms untouched for longer than this are dropped.
    pub idle_ttl: Duration,
    pub max_forms: usize,
}

impl Default for RegistryLimits {
    fn default() -> Self {
        Self {
            idle_ttl: Duration::from_secs(30 * 60),
            max_forms: 1000,
        }
    }
}

struct OpenForm {
    form: Arc<BookingForm>,
    last_touched: Instant,
}

/// Open form instances, each with its own draft and submission gate.
///
/// Idle forms are dropped whenever a new one is opened, and opening fails
/// once `max_forms` are still live.
pub struct FormRegistry {
    forms: Mutex<HashMap<String, OpenForm>>,
    dispatcher: Arc<dyn Dispatcher>,
    auto_dismiss_ms: u64,
    limits: RegistryLimits,
}

impl FormRegistry {
    pub fn new(dispatcher: Arc<dyn Dispatcher>, auto_dismiss_ms: u64) -> Self {
        Self::with_limits(dispatcher, auto_dismiss_ms, RegistryLimits::default())
    }

    pub fn with_limits(
        dispatcher: Arc<dyn Dispatcher>,
        auto_dismiss_ms: u64,
        limits: RegistryLimits,
    ) -> Self {
        Self {
            forms: Mutex::new(HashMap::new()),
            dispatcher,
            auto_dismiss_ms,
            limits,
        }
    }

    pub fn variant(&self) -> FormVariant {
        self.dispatcher.variant()
    }

    pub fn open(&self) -> Result<(String, Arc<BookingForm>), FormError> {
        let now = Instant::now();
        let mut forms = self.lock();

        let dropped = prune(&mut forms, now, self.limits.idle_ttl);
        if dropped > 0 {
            info!("Dropped {} idle booking form(s)", dropped);
        }
        if forms.len() >= self.limits.max_forms {
            warn!("Refusing to open a booking form, {} already open", forms.len());
            return Err(FormError::TooManyForms);
        }

        let id = hex::encode(rand::random::<[u8; 8]>());
        let form = Arc::new(BookingForm::new(
            Arc::clone(&self.dispatcher),
            self.auto_dismiss_ms,
        ));
        forms.insert(
            id.clone(),
            OpenForm {
                form: Arc::clone(&form),
                last_touched: now,
            },
        );

        info!("Opened booking form {}", id);
        Ok((id, form))
    }

    /// A form that is not registered, used for single-request submissions.
    pub fn detached(&self, draft: BookingRequest) -> BookingForm {
        BookingForm::with_draft(Arc::clone(&self.dispatcher), draft, self.auto_dismiss_ms)
    }

    /// Look up a form and mark it as used.
    pub fn get(&self, id: &str) -> Option<Arc<BookingForm>> {
        let mut forms = self.lock();
        let entry = forms.get_mut(id)?;
        entry.last_touched = Instant::now();
        Some(Arc::clone(&entry.form))
    }

    pub fn close(&self, id: &str) -> bool {
        let removed = self.lock().remove(id).is_some();
        if removed {
            info!("Closed booking form {}", id);
        }
        removed
    }

    /// Drop every form idle for longer than the TTL as of `now`.
    pub fn prune_idle(&self, now: Instant) -> usize {
        prune(&mut self.lock(), now, self.limits.idle_ttl)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, OpenForm>> {
        self.forms.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn prune(forms: &mut HashMap<String, OpenForm>, now: Instant, idle_ttl: Duration) -> usize {
    let before = forms.len();
    forms.retain(|_, entry| now.saturating_duration_since(entry.last_touched) <= idle_ttl);
    before - forms.len()
}
