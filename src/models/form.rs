use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

// Every field of a booking form that can carry a validation error
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldName {
    Name,
    Telephone,
    Email,
    Address,
    Council,
    Bins,
    CollectionDay,
    Service,
    ExtraInfo,
}

/// Free-text fields, the ones written through `setField`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TextField {
    Name,
    Telephone,
    Email,
    Address,
    Council,
    ExtraInfo,
}

impl TextField {
    pub const ALL: [TextField; 6] = [
        TextField::Name,
        TextField::Telephone,
        TextField::Email,
        TextField::Address,
        TextField::Council,
        TextField::ExtraInfo,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            TextField::Name => "name",
            TextField::Telephone => "telephone",
            TextField::Email => "email",
            TextField::Address => "address",
            TextField::Council => "council",
            TextField::ExtraInfo => "extraInfo",
        }
    }
}

impl FromStr for TextField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TextField::ALL
            .into_iter()
            .find(|field| field.key() == s)
            .ok_or_else(|| format!("Unknown text field: {}", s))
    }
}

impl From<TextField> for FieldName {
    fn from(field: TextField) -> Self {
        match field {
            TextField::Name => FieldName::Name,
            TextField::Telephone => FieldName::Telephone,
            TextField::Email => FieldName::Email,
            TextField::Address => FieldName::Address,
            TextField::Council => FieldName::Council,
            TextField::ExtraInfo => FieldName::ExtraInfo,
        }
    }
}

/// Field name to human readable reason, only for fields that failed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ErrorMap(BTreeMap<FieldName, String>);

impl ErrorMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: FieldName, reason: impl Into<String>) {
        self.0.insert(field, reason.into());
    }

    pub fn clear(&mut self, field: FieldName) {
        self.0.remove(&field);
    }

    pub fn get(&self, field: FieldName) -> Option<&str> {
        self.0.get(&field).map(String::as_str)
    }

    pub fn contains(&self, field: FieldName) -> bool {
        self.0.contains_key(&field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn fields(&self) -> impl Iterator<Item = FieldName> + '_ {
        self.0.keys().copied()
    }
}

/// Which booking flow a form belongs to.
///
/// `MessageLink` forms have the service tier fixed to the monthly package;
/// `Persisted` forms ask the customer to pick one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FormVariant {
    MessageLink,
    Persisted,
}

impl FormVariant {
    pub fn requires_service_tier(&self) -> bool {
        matches!(self, FormVariant::Persisted)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionStatus {
    #[default]
    Idle,
    Submitting,
}
