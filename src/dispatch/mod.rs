//! Booking dispatch strategies.
//!
//! A validated booking leaves the service through exactly one `Dispatcher`,
//! chosen when the application is composed:
//!
//! - `message_link`: builds a pre-filled messaging deep link for the client
//!   to open. Nothing is sent by the service itself.
//! - `persistence`: writes the booking to a document store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::models::booking::BookingRequest;
use crate::models::form::FormVariant;

pub mod message_link;
pub mod persistence;

pub use message_link::MessageLinkDispatcher;
pub use persistence::{DocumentStore, PersistenceDispatcher, StoredDocument};

/// What a successful dispatch produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum DispatchReceipt {
    /// The client should open this link in a new tab.
    #[serde(rename_all = "camelCase")]
    Redirect { url: String },
    #[serde(rename_all = "camelCase")]
    Persisted {
        id: String,
        created_at: DateTime<Utc>,
    },
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("could not build messaging link: {0}")]
    Navigation(String),

    #[error("document store unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("document store rejected the booking ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("booking storage failed: {0}")]
    Storage(String),

    #[error("dispatch failed unexpectedly: {0}")]
    Unexpected(String),
}

impl From<csv::Error> for DispatchError {
    fn from(error: csv::Error) -> Self {
        DispatchError::Storage(error.to_string())
    }
}

impl From<std::io::Error> for DispatchError {
    fn from(error: std::io::Error) -> Self {
        DispatchError::Storage(error.to_string())
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Dispatcher: Send + Sync {
    /// The form flow this dispatcher serves.
    fn variant(&self) -> FormVariant;

    /// Shown to the customer after a successful dispatch.
    fn success_message(&self) -> &'static str;

    /// Shown to the customer when dispatch fails and they should retry.
    fn failure_message(&self) -> &'static str;

    /// Transmit a validated booking.
    async fn submit(&self, request: &BookingRequest) -> Result<DispatchReceipt, DispatchError>;
}
