use serde::Serialize;

use crate::models::booking::{Bin, BookingRequest, CollectionDay, ServiceTier};
use crate::models::form::{ErrorMap, FieldName, SubmissionStatus, TextField};

/// Everything that can happen to a booking form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormAction {
    SetField { field: TextField, value: String },
    ToggleBin(Bin),
    SelectDay(CollectionDay),
    SelectService(ServiceTier),
    ValidationFailed(ErrorMap),
    SubmitStarted,
    DispatchSucceeded,
    DispatchFailed,
    Settled,
}

/// Draft, per-field errors and submission status of one form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormState {
    pub draft: BookingRequest,
    pub errors: ErrorMap,
    pub status: SubmissionStatus,
}

impl FormState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_submitting(&self) -> bool {
        self.status == SubmissionStatus::Submitting
    }

    /// Apply one action, producing the next state.
    pub fn reduce(mut self, action: FormAction) -> Self {
        match action {
            FormAction::SetField { field, value } => {
                *self.text_field_mut(field) = value;
                self.errors.clear(field.into());
            }
            FormAction::ToggleBin(bin) => {
                self.draft.bins.toggle(bin);
                self.errors.clear(FieldName::Bins);
            }
            FormAction::SelectDay(day) => {
                self.draft.collection_day = Some(day);
                self.errors.clear(FieldName::CollectionDay);
            }
            FormAction::SelectService(tier) => {
                self.draft.service = Some(tier);
                self.errors.clear(FieldName::Service);
            }
            FormAction::ValidationFailed(errors) => {
                self.errors = errors;
            }
            FormAction::SubmitStarted => {
                self.errors = ErrorMap::new();
                self.status = SubmissionStatus::Submitting;
            }
            FormAction::DispatchSucceeded => {
                self.draft = BookingRequest::empty();
                self.errors = ErrorMap::new();
            }
            // The draft stays as submitted so the customer can retry
            FormAction::DispatchFailed => {}
            FormAction::Settled => {
                self.status = SubmissionStatus::Idle;
            }
        }
        self
    }

    fn text_field_mut(&mut self, field: TextField) -> &mut String {
        match field {
            TextField::Name => &mut self.draft.name,
            TextField::Telephone => &mut self.draft.telephone,
            TextField::Email => &mut self.draft.email,
            TextField::Address => &mut self.draft.address,
            TextField::Council => &mut self.draft.council,
            TextField::ExtraInfo => &mut self.draft.extra_info,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(field: TextField, value: &str) -> FormAction {
        FormAction::SetField {
            field,
            value: value.to_string(),
        }
    }

    #[test]
    fn test_set_field_overwrites_and_clears_error() {
        let mut errors = ErrorMap::new();
        errors.insert(FieldName::Email, "Required");
        errors.insert(FieldName::Name, "Required");

        let state = FormState::new()
            .reduce(FormAction::ValidationFailed(errors))
            .reduce(set(TextField::Email, "jane@exam"))
            .reduce(set(TextField::Email, "jane@example.com"));

        assert_eq!(state.draft.email, "jane@example.com");
        assert!(!state.errors.contains(FieldName::Email));
        assert!(state.errors.contains(FieldName::Name));
    }

    #[test]
    fn test_toggle_bin_twice_restores_bins() {
        let mut errors = ErrorMap::new();
        errors.insert(FieldName::Bins, "Select at least one bin");

        let state = FormState::new()
            .reduce(FormAction::ToggleBin(Bin::Green))
            .reduce(FormAction::ValidationFailed(errors));
        let before = state.draft.bins.clone();

        let state = state
            .reduce(FormAction::ToggleBin(Bin::Blue))
            .reduce(FormAction::ToggleBin(Bin::Blue));

        assert_eq!(state.draft.bins, before);
        assert!(!state.errors.contains(FieldName::Bins));
    }

    #[test]
    fn test_selecting_a_day_replaces_the_previous_one() {
        let state = FormState::new()
            .reduce(FormAction::SelectDay(CollectionDay::Monday))
            .reduce(FormAction::SelectDay(CollectionDay::Friday));

        assert_eq!(state.draft.collection_day, Some(CollectionDay::Friday));
    }

    #[test]
    fn test_successful_dispatch_resets_to_empty_draft() {
        let state = FormState::new()
            .reduce(set(TextField::Name, "Jane Doe"))
            .reduce(FormAction::ToggleBin(Bin::Black))
            .reduce(FormAction::SelectService(ServiceTier::MonthlyClean))
            .reduce(FormAction::SubmitStarted)
            .reduce(FormAction::DispatchSucceeded)
            .reduce(FormAction::Settled);

        assert_eq!(state, FormState::new());
    }

    #[test]
    fn test_failed_dispatch_keeps_draft() {
        let state = FormState::new()
            .reduce(set(TextField::Council, "Camden"))
            .reduce(FormAction::ToggleBin(Bin::Caddy))
            .reduce(FormAction::SubmitStarted);
        let submitted = state.draft.clone();
        assert!(state.is_submitting());

        let state = state
            .reduce(FormAction::DispatchFailed)
            .reduce(FormAction::Settled);

        assert_eq!(state.draft, submitted);
        assert_eq!(state.status, SubmissionStatus::Idle);
    }
}
