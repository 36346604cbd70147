use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{error, info};

use super::{DispatchError, DispatchReceipt, Dispatcher};
use crate::models::booking::BookingRequest;
use crate::models::form::FormVariant;

/// A record as acknowledged by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredDocument {
    pub id: String,
    pub created_at: DateTime<Utc>,
}

/// Remote (or local) document collection that bookings are written to.
///
/// The store assigns both the identifier and the creation timestamp; callers
/// never generate either.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn create(
        &self,
        collection: &str,
        request: &BookingRequest,
    ) -> Result<StoredDocument, DispatchError>;
}

/// Writes each booking as a new record in one collection.
pub struct PersistenceDispatcher {
    store: Arc<dyn DocumentStore>,
    collection: String,
}

impl PersistenceDispatcher {
    pub fn new(store: Arc<dyn DocumentStore>, collection: &str) -> Self {
        Self {
            store,
            collection: collection.to_string(),
        }
    }
}

#[async_trait]
impl Dispatcher for PersistenceDispatcher {
    fn variant(&self) -> FormVariant {
        FormVariant::Persisted
    }

    fn success_message(&self) -> &'static str {
        "Booking submitted successfully!"
    }

    fn failure_message(&self) -> &'static str {
        "Failed to submit booking. Please try again."
    }

    async fn submit(&self, request: &BookingRequest) -> Result<DispatchReceipt, DispatchError> {
        info!(
            "Storing booking for {} in collection {}",
            request.name, self.collection
        );

        match self.store.create(&self.collection, request).await {
            Ok(stored) => {
                info!("Stored booking {} at {}", stored.id, stored.created_at.to_rfc3339());
                Ok(DispatchReceipt::Persisted {
                    id: stored.id,
                    created_at: stored.created_at,
                })
            }
            Err(e) => {
                error!("Failed to store booking in {}: {}", self.collection, e);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[tokio::test]
    async fn test_submit_writes_to_configured_collection() {
        let created_at = Utc.with_ymd_and_hms(2025, 4, 1, 9, 30, 0).unwrap();

        let mut store = MockDocumentStore::new();
        store
            .expect_create()
            .withf(|collection, _| collection == "bookings")
            .times(1)
            .returning(move |_, _| {
                Ok(StoredDocument {
                    id: "abc123".to_string(),
                    created_at,
                })
            });

        let dispatcher = PersistenceDispatcher::new(Arc::new(store), "bookings");
        let receipt = dispatcher.submit(&BookingRequest::empty()).await.unwrap();

        assert_eq!(
            receipt,
            DispatchReceipt::Persisted {
                id: "abc123".to_string(),
                created_at,
            }
        );
    }

    #[tokio::test]
    async fn test_store_rejection_is_returned() {
        let mut store = MockDocumentStore::new();
        store.expect_create().returning(|_, _| {
            Err(DispatchError::Rejected {
                status: 403,
                message: "PERMISSION_DENIED".to_string(),
            })
        });

        let dispatcher = PersistenceDispatcher::new(Arc::new(store), "bookings");
        let result = dispatcher.submit(&BookingRequest::empty()).await;

        assert!(matches!(
            result,
            Err(DispatchError::Rejected { status: 403, .. })
        ));
    }
}
