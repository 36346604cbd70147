use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};

use crate::dispatch::{DispatchError, DocumentStore, StoredDocument};
use crate::models::booking::BookingRequest;

// Document returned by Firestore's createDocument
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FirestoreDocument {
    pub name: String,
    pub create_time: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct FirestoreErrorBody {
    error: FirestoreErrorDetail,
}

#[derive(Debug, Deserialize)]
struct FirestoreErrorDetail {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

/// Client for the Firestore REST API
pub struct FirestoreClient {
    client: Client,
    endpoint: String,
    project_id: String,
    database: String,
    api_key: Option<String>,
}

impl FirestoreClient {
    pub fn new(endpoint: &str, project_id: &str, database: &str, api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            project_id: project_id.to_string(),
            database: database.to_string(),
            api_key,
        }
    }

    /// URL of a collection; posting to it creates a document with a server-assigned id
    pub fn collection_url(&self, collection: &str) -> String {
        format!(
            "{}/v1/projects/{}/databases/{}/documents/{}",
            self.endpoint, self.project_id, self.database, collection
        )
    }

    /// Encode a booking as Firestore typed fields
    pub fn encode_fields(request: &BookingRequest) -> Value {
        let mut fields = Map::new();

        let text = [
            ("name", &request.name),
            ("telephone", &request.telephone),
            ("email", &request.email),
            ("address", &request.address),
            ("council", &request.council),
            ("extraInfo", &request.extra_info),
        ];
        for (key, value) in text {
            fields.insert(key.to_string(), json!({ "stringValue": value }));
        }

        let bins: Vec<Value> = request
            .bins
            .iter()
            .map(|bin| json!({ "stringValue": bin.key() }))
            .collect();
        fields.insert(
            "bins".to_string(),
            json!({ "arrayValue": { "values": bins } }),
        );

        fields.insert(
            "collectionDay".to_string(),
            optional_string(request.collection_day.map(|day| day.as_str())),
        );
        fields.insert(
            "service".to_string(),
            optional_string(request.service.map(|tier| tier.key())),
        );

        json!({ "fields": fields })
    }

    /// Create a document in `collection`
    pub async fn create_document(
        &self,
        collection: &str,
        request: &BookingRequest,
    ) -> Result<FirestoreDocument, DispatchError> {
        let url = self.collection_url(collection);
        let body = Self::encode_fields(request);

        info!("Making request to create document in {}", collection);
        debug!("API URL: {}", url);

        let mut builder = self.client.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            builder = builder.query(&[("key", key)]);
        }

        let res = builder.send().await?;
        let status = res.status();
        info!("Response received with status: {}", status);

        if !status.is_success() {
            let text = res.text().await.unwrap_or_default();
            let message = match serde_json::from_str::<FirestoreErrorBody>(&text) {
                Ok(body) => format!("{} {}", body.error.status, body.error.message)
                    .trim()
                    .to_string(),
                Err(_) => text,
            };
            warn!("Firestore rejected document: {} {}", status, message);
            return Err(DispatchError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let document = res.json::<FirestoreDocument>().await?;
        Ok(document)
    }
}

fn optional_string(value: Option<&str>) -> Value {
    match value {
        Some(value) => json!({ "stringValue": value }),
        None => json!({ "nullValue": null }),
    }
}

#[async_trait]
impl DocumentStore for FirestoreClient {
    async fn create(
        &self,
        collection: &str,
        request: &BookingRequest,
    ) -> Result<StoredDocument, DispatchError> {
        let document = self.create_document(collection, request).await?;

        // Resource names end with the generated document id
        let id = document
            .name
            .rsplit('/')
            .next()
            .unwrap_or(&document.name)
            .to_string();

        Ok(StoredDocument {
            id,
            created_at: document.create_time,
        })
    }
}
