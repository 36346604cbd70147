use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Notify;

use crate::dispatch::{DispatchError, DispatchReceipt, Dispatcher, MockDispatcher};
use crate::models::booking::{Bin, BookingRequest, CollectionDay, ServiceTier};
use crate::models::common::NotificationLevel;
use crate::models::form::{FieldName, FormVariant, SubmissionStatus, TextField};
use crate::services::form_store::FormState;
use crate::services::pricing::PriceCatalog;
use crate::services::submission::{
    BookingForm, FormError, FormRegistry, RegistryLimits, SubmitOutcome, ALREADY_SUBMITTING,
    FILL_REQUIRED_FIELDS, UNEXPECTED_FAILURE,
};

fn mock_dispatcher(variant: FormVariant) -> MockDispatcher {
    let mut dispatcher = MockDispatcher::new();
    dispatcher.expect_variant().return_const(variant);
    dispatcher
        .expect_success_message()
        .return_const("Booking submitted successfully!");
    dispatcher
        .expect_failure_message()
        .return_const("Failed to submit booking. Please try again.");
    dispatcher
}

fn fill(form: &BookingForm) {
    form.set_field(TextField::Name, "Jane Doe".to_string()).unwrap();
    form.set_field(TextField::Telephone, "07700900000".to_string()).unwrap();
    form.set_field(TextField::Email, "jane@example.com".to_string()).unwrap();
    form.set_field(TextField::Address, "1 Test St".to_string()).unwrap();
    form.set_field(TextField::Council, "Camden".to_string()).unwrap();
    form.toggle_bin(Bin::Green).unwrap();
    form.toggle_bin(Bin::Caddy).unwrap();
    form.select_day(CollectionDay::Monday).unwrap();
    if form.variant() == FormVariant::Persisted {
        form.select_service(ServiceTier::OneOff).unwrap();
    }
}

// Holds every dispatch until released
struct GatedDispatcher {
    release: Notify,
    calls: AtomicUsize,
}

impl GatedDispatcher {
    fn new() -> Self {
        Self {
            release: Notify::new(),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Dispatcher for GatedDispatcher {
    fn variant(&self) -> FormVariant {
        FormVariant::Persisted
    }

    fn success_message(&self) -> &'static str {
        "stored"
    }

    fn failure_message(&self) -> &'static str {
        "retry"
    }

    async fn submit(&self, _request: &BookingRequest) -> Result<DispatchReceipt, DispatchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.release.notified().await;
        Ok(DispatchReceipt::Persisted {
            id: "gated".to_string(),
            created_at: Utc::now(),
        })
    }
}

struct PanickingDispatcher;

#[async_trait]
impl Dispatcher for PanickingDispatcher {
    fn variant(&self) -> FormVariant {
        FormVariant::MessageLink
    }

    fn success_message(&self) -> &'static str {
        "ok"
    }

    fn failure_message(&self) -> &'static str {
        "retry"
    }

    async fn submit(&self, _request: &BookingRequest) -> Result<DispatchReceipt, DispatchError> {
        panic!("dispatcher exploded");
    }
}

#[tokio::test]
async fn test_successful_submit_resets_form() {
    let created_at = Utc.with_ymd_and_hms(2025, 4, 1, 9, 0, 0).unwrap();
    let mut dispatcher = mock_dispatcher(FormVariant::Persisted);
    dispatcher
        .expect_submit()
        .withf(|request| request.name == "Jane Doe" && request.service == Some(ServiceTier::OneOff))
        .times(1)
        .returning(move |_| {
            Ok(DispatchReceipt::Persisted {
                id: "doc-1".to_string(),
                created_at,
            })
        });

    let form = BookingForm::new(Arc::new(dispatcher), 3000);
    fill(&form);

    let report = form.submit().await;

    assert_eq!(
        report.outcome,
        SubmitOutcome::Dispatched {
            receipt: DispatchReceipt::Persisted {
                id: "doc-1".to_string(),
                created_at,
            }
        }
    );
    assert_eq!(report.notification.level, NotificationLevel::Success);
    assert_eq!(report.notification.message, "Booking submitted successfully!");
    assert_eq!(report.notification.auto_dismiss_ms, 3000);
    assert_eq!(form.snapshot(), FormState::new());
}

#[tokio::test]
async fn test_invalid_draft_never_reaches_dispatcher() {
    let mut dispatcher = mock_dispatcher(FormVariant::MessageLink);
    dispatcher.expect_submit().never();

    let form = BookingForm::new(Arc::new(dispatcher), 3000);
    fill(&form);
    // Deselect both bins again
    form.toggle_bin(Bin::Green).unwrap();
    form.toggle_bin(Bin::Caddy).unwrap();
    let draft = form.snapshot().draft;

    let report = form.submit().await;

    let SubmitOutcome::Invalid { errors } = report.outcome else {
        panic!("expected validation failure, got {:?}", report.outcome);
    };
    assert_eq!(errors.fields().collect::<Vec<_>>(), vec![FieldName::Bins]);
    assert_eq!(errors.get(FieldName::Bins), Some("Select at least one bin"));
    assert_eq!(report.notification.level, NotificationLevel::Error);
    assert_eq!(report.notification.message, FILL_REQUIRED_FIELDS);

    let state = form.snapshot();
    assert_eq!(state.status, SubmissionStatus::Idle);
    assert_eq!(state.errors, errors);
    assert_eq!(state.draft, draft);
}

#[tokio::test]
async fn test_editing_after_validation_clears_that_error() {
    let mut dispatcher = mock_dispatcher(FormVariant::MessageLink);
    dispatcher.expect_submit().never();

    let form = BookingForm::new(Arc::new(dispatcher), 3000);
    form.submit().await;
    assert!(form.snapshot().errors.contains(FieldName::Name));

    let state = form.set_field(TextField::Name, "Jane".to_string()).unwrap();
    assert!(!state.errors.contains(FieldName::Name));
    assert!(state.errors.contains(FieldName::Email));
}

#[tokio::test]
async fn test_rejected_persistence_keeps_draft() {
    let mut dispatcher = mock_dispatcher(FormVariant::Persisted);
    dispatcher.expect_submit().times(1).returning(|_| {
        Err(DispatchError::Rejected {
            status: 503,
            message: "UNAVAILABLE".to_string(),
        })
    });

    let form = BookingForm::new(Arc::new(dispatcher), 3000);
    fill(&form);
    form.set_field(TextField::ExtraInfo, "Side gate".to_string()).unwrap();
    let submitted = form.snapshot().draft;

    let report = form.submit().await;

    assert!(matches!(report.outcome, SubmitOutcome::Failed { .. }));
    assert_eq!(report.notification.level, NotificationLevel::Error);
    assert_eq!(
        report.notification.message,
        "Failed to submit booking. Please try again."
    );

    let state = form.snapshot();
    assert_eq!(state.status, SubmissionStatus::Idle);
    assert_eq!(state.draft, submitted);
}

#[tokio::test]
async fn test_second_submit_while_in_flight_is_busy() {
    let dispatcher = Arc::new(GatedDispatcher::new());
    let form = Arc::new(BookingForm::new(dispatcher.clone(), 3000));
    fill(&form);

    let first = tokio::spawn({
        let form = Arc::clone(&form);
        async move { form.submit().await }
    });

    while !form.snapshot().is_submitting() {
        tokio::task::yield_now().await;
    }
    assert!(!form.view("f", &PriceCatalog::default()).submit_enabled);

    let second = form.submit().await;
    assert_eq!(second.outcome, SubmitOutcome::Busy);
    assert_eq!(second.notification.message, ALREADY_SUBMITTING);

    dispatcher.release.notify_one();
    let first = first.await.unwrap();

    assert!(matches!(first.outcome, SubmitOutcome::Dispatched { .. }));
    assert_eq!(dispatcher.calls.load(Ordering::SeqCst), 1);
    assert_eq!(form.snapshot().status, SubmissionStatus::Idle);
}

#[tokio::test]
async fn test_abandoned_dispatch_releases_the_gate() {
    let dispatcher = Arc::new(GatedDispatcher::new());
    let form = BookingForm::new(dispatcher.clone(), 3000);
    fill(&form);
    let submitted = form.snapshot().draft;

    let result = tokio::time::timeout(Duration::from_millis(20), form.submit()).await;
    assert!(result.is_err());

    let state = form.snapshot();
    assert_eq!(state.status, SubmissionStatus::Idle);
    assert_eq!(state.draft, submitted);
    assert_eq!(dispatcher.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_panicking_dispatcher_surfaces_generic_error() {
    let form = BookingForm::new(Arc::new(PanickingDispatcher), 3000);
    fill(&form);
    let submitted = form.snapshot().draft;

    let report = form.submit().await;

    let SubmitOutcome::Failed { reason } = report.outcome else {
        panic!("expected failure, got {:?}", report.outcome);
    };
    assert!(reason.contains("dispatcher exploded"));
    assert_eq!(report.notification.message, UNEXPECTED_FAILURE);

    let state = form.snapshot();
    assert_eq!(state.status, SubmissionStatus::Idle);
    assert_eq!(state.draft, submitted);
}

#[test]
fn test_service_tier_fixed_on_message_link_forms() {
    let form = BookingForm::new(Arc::new(mock_dispatcher(FormVariant::MessageLink)), 3000);

    let result = form.select_service(ServiceTier::OneOff);
    assert_eq!(result, Err(FormError::ServiceTierFixed));
    assert_eq!(form.snapshot().draft.service, None);
}

#[test]
fn test_view_quotes_the_selected_tier() {
    let form = BookingForm::new(Arc::new(mock_dispatcher(FormVariant::Persisted)), 3000);
    fill(&form);

    let view = form.view("abc", &PriceCatalog::default());
    assert_eq!(view.id, "abc");
    assert!(view.submit_enabled);
    // One wheelie bin plus a caddy
    assert_eq!(view.quote.map(|quote| quote.total_pence), Some(1000));

    let message_link = BookingForm::new(Arc::new(mock_dispatcher(FormVariant::MessageLink)), 3000);
    fill(&message_link);
    let view = message_link.view("def", &PriceCatalog::default());
    assert_eq!(view.quote.map(|quote| quote.total_pence), Some(1500));
}

#[test]
fn test_registry_forms_are_independent() {
    let registry = FormRegistry::new(Arc::new(mock_dispatcher(FormVariant::MessageLink)), 3000);

    let (first_id, first) = registry.open().unwrap();
    let (second_id, _) = registry.open().unwrap();
    assert_ne!(first_id, second_id);
    assert_eq!(registry.len(), 2);

    first.set_field(TextField::Name, "Jane Doe".to_string()).unwrap();
    let second = registry.get(&second_id).unwrap();
    assert_eq!(second.snapshot().draft.name, "");

    assert!(registry.close(&first_id));
    assert!(!registry.close(&first_id));
    assert!(registry.get(&first_id).is_none());
    assert_eq!(registry.len(), 1);
}

#[tokio::test]
async fn test_edits_refused_while_submitting() {
    let dispatcher = Arc::new(GatedDispatcher::new());
    let form = Arc::new(BookingForm::new(dispatcher.clone(), 3000));
    fill(&form);
    let submitted = form.snapshot().draft;

    let pending = tokio::spawn({
        let form = Arc::clone(&form);
        async move { form.submit().await }
    });
    while !form.snapshot().is_submitting() {
        tokio::task::yield_now().await;
    }

    assert_eq!(
        form.set_field(TextField::Name, "John".to_string()),
        Err(FormError::Busy)
    );
    assert_eq!(form.toggle_bin(Bin::Blue), Err(FormError::Busy));
    assert_eq!(form.select_day(CollectionDay::Friday), Err(FormError::Busy));
    assert_eq!(
        form.select_service(ServiceTier::SixClean),
        Err(FormError::Busy)
    );
    assert_eq!(form.snapshot().draft, submitted);

    dispatcher.release.notify_one();
    let report = pending.await.unwrap();
    assert!(matches!(report.outcome, SubmitOutcome::Dispatched { .. }));

    // Editing works again once the form is idle
    let state = form.set_field(TextField::Name, "John".to_string()).unwrap();
    assert_eq!(state.draft.name, "John");
}

#[test]
fn test_registry_drops_idle_forms() {
    let registry = FormRegistry::with_limits(
        Arc::new(mock_dispatcher(FormVariant::MessageLink)),
        3000,
        RegistryLimits {
            idle_ttl: Duration::from_secs(60),
            max_forms: 100,
        },
    );

    let (first_id, _) = registry.open().unwrap();
    registry.open().unwrap();
    let opened_at = Instant::now();

    assert_eq!(registry.prune_idle(opened_at + Duration::from_secs(30)), 0);
    assert_eq!(registry.len(), 2);

    assert_eq!(registry.prune_idle(opened_at + Duration::from_secs(61)), 2);
    assert!(registry.is_empty());
    assert!(registry.get(&first_id).is_none());
}

#[test]
fn test_registry_open_evicts_idle_forms() {
    let registry = FormRegistry::with_limits(
        Arc::new(mock_dispatcher(FormVariant::MessageLink)),
        3000,
        RegistryLimits {
            idle_ttl: Duration::ZERO,
            max_forms: 1,
        },
    );

    let (stale_id, _) = registry.open().unwrap();
    std::thread::sleep(Duration::from_millis(5));

    let (fresh_id, _) = registry.open().unwrap();
    assert_eq!(registry.len(), 1);
    assert!(registry.get(&stale_id).is_none());
    assert_ne!(stale_id, fresh_id);
}

#[test]
fn test_registry_refuses_forms_past_the_cap() {
    let registry = FormRegistry::with_limits(
        Arc::new(mock_dispatcher(FormVariant::MessageLink)),
        3000,
        RegistryLimits {
            idle_ttl: Duration::from_secs(3600),
            max_forms: 3,
        },
    );

    let ids: Vec<String> = (0..3).map(|_| registry.open().unwrap().0).collect();
    for _ in 0..100 {
        assert!(matches!(registry.open(), Err(FormError::TooManyForms)));
    }
    assert_eq!(registry.len(), 3);

    assert!(registry.close(&ids[0]));
    assert!(registry.open().is_ok());
    assert_eq!(registry.len(), 3);
}
