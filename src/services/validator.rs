use crate::models::booking::BookingRequest;
use crate::models::form::{ErrorMap, FieldName, FormVariant};

pub const REQUIRED: &str = "Required";
pub const SELECT_A_BIN: &str = "Select at least one bin";

/// Check a draft against the booking rules.
///
/// Every rule runs on every call so the customer sees all missing fields at
/// once. An empty map means the draft may be dispatched.
pub fn validate(draft: &BookingRequest, variant: FormVariant) -> ErrorMap {
    let mut errors = ErrorMap::new();

    let text_fields = [
        (FieldName::Name, &draft.name),
        (FieldName::Telephone, &draft.telephone),
        (FieldName::Email, &draft.email),
        (FieldName::Address, &draft.address),
        (FieldName::Council, &draft.council),
    ];
    for (field, value) in text_fields {
        if value.trim().is_empty() {
            errors.insert(field, REQUIRED);
        }
    }

    if draft.bins.is_empty() {
        errors.insert(FieldName::Bins, SELECT_A_BIN);
    }

    if draft.collection_day.is_none() {
        errors.insert(FieldName::CollectionDay, REQUIRED);
    }

    if variant.requires_service_tier() && draft.service.is_none() {
        errors.insert(FieldName::Service, REQUIRED);
    }

    errors
}
