//! Bin Cleaning Booking Service
//!
//! This library holds the booking intake logic for a bin cleaning business
//! and the web service that exposes it: customers fill a booking form, the
//! draft is validated, and a valid booking is dispatched.
//!
//! # Modules
//!
//! - `models`: booking request, form field and notification types
//! - `services`: form state reducer, validator, submission controller,
//!   pricing and the local CSV store
//! - `dispatch`: the `Dispatcher` trait with its message-link and
//!   persistence strategies
//! - `client`: Firestore REST client used as a document store
//!
//! # Dispatch
//!
//! Exactly one dispatch strategy is chosen at startup from `AppConfig`.
//! Every form shares it, while each form keeps its own draft and its own
//! single-submission gate.

use std::sync::Arc;

pub mod client;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;


// Re-export the main API types for ease of use
pub use client::FirestoreClient;
pub use config::{AppConfig, ConfigError, DispatchConfig};
pub use dispatch::{DispatchError, Dispatcher, MessageLinkDispatcher, PersistenceDispatcher};
pub use handlers::api::AppState;
pub use routes::create_router;

use crate::services::database::CsvBookingStore;
use crate::services::pricing::PriceCatalog;
use crate::services::submission::FormRegistry;

/// Build the dispatcher selected by configuration
pub fn create_dispatcher(config: &DispatchConfig) -> Result<Arc<dyn Dispatcher>, DispatchError> {
    let dispatcher: Arc<dyn Dispatcher> = match config {
        DispatchConfig::WhatsApp { base_url, number } => {
            Arc::new(MessageLinkDispatcher::new(base_url, number))
        }
        DispatchConfig::Firestore {
            endpoint,
            project_id,
            database,
            api_key,
            collection,
        } => {
            let client = FirestoreClient::new(endpoint, project_id, database, api_key.clone());
            Arc::new(PersistenceDispatcher::new(Arc::new(client), collection))
        }
        DispatchConfig::Csv { path, collection } => {
            let store = CsvBookingStore::new(path)?;
            Arc::new(PersistenceDispatcher::new(Arc::new(store), collection))
        }
    };
    Ok(dispatcher)
}

/// Shared state for the router
pub fn create_app_state(config: &AppConfig) -> Result<Arc<AppState>, DispatchError> {
    let dispatcher = create_dispatcher(&config.dispatch)?;

    Ok(Arc::new(AppState {
        forms: FormRegistry::with_limits(dispatcher, config.auto_dismiss_ms, config.form_limits),
        catalog: PriceCatalog::default(),
    }))
}
