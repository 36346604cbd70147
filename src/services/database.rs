use async_trait::async_trait;
use chrono::{DateTime, Utc};
use csv::{ReaderBuilder, WriterBuilder};
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{error, info};

use crate::dispatch::{DispatchError, DocumentStore, StoredDocument};
use crate::models::booking::BookingRequest;

const HEADERS: [&str; 12] = [
    "id",
    "collection",
    "created_at",
    "name",
    "telephone",
    "email",
    "address",
    "council",
    "bins",
    "collection_day",
    "service",
    "extra_info",
];

// Row stored in the CSV file
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct BookingRecord {
    pub id: String,
    pub collection: String,
    pub created_at: String, // ISO format
    pub name: String,
    pub telephone: String,
    pub email: String,
    pub address: String,
    pub council: String,
    pub bins: String, // bin keys separated by ';'
    pub collection_day: String,
    pub service: String,
    pub extra_info: String,
}

impl BookingRecord {
    fn new(id: String, collection: &str, created_at: DateTime<Utc>, request: &BookingRequest) -> Self {
        Self {
            id,
            collection: collection.to_string(),
            created_at: created_at.to_rfc3339(),
            name: request.name.clone(),
            telephone: request.telephone.clone(),
            email: request.email.clone(),
            address: request.address.clone(),
            council: request.council.clone(),
            bins: request
                .bins
                .iter()
                .map(|bin| bin.key())
                .collect::<Vec<_>>()
                .join(";"),
            collection_day: request
                .collection_day
                .map(|day| day.as_str().to_string())
                .unwrap_or_default(),
            service: request
                .service
                .map(|tier| tier.key().to_string())
                .unwrap_or_default(),
            extra_info: request.extra_info.clone(),
        }
    }
}

/// Document store backed by a local CSV file, one row per booking.
///
/// Appends from `create` run on the blocking thread pool.
pub struct CsvBookingStore {
    csv_path: PathBuf,
    file_mutex: Arc<Mutex<()>>,
}

impl CsvBookingStore {
    pub fn new(csv_path: impl AsRef<Path>) -> Result<Self, DispatchError> {
        let csv_path = csv_path.as_ref().to_path_buf();

        // Create the CSV file if it doesn't exist with proper headers
        if !csv_path.exists() {
            info!("Creating new bookings file at {}", csv_path.display());

            if let Some(dir) = csv_path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
                fs::create_dir_all(dir)?;
            }

            let file = File::create(&csv_path)?;
            let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);
            writer.write_record(HEADERS)?;
            writer.flush()?;
        }

        Ok(Self {
            csv_path,
            file_mutex: Arc::new(Mutex::new(())),
        })
    }

    /// All stored bookings, oldest first
    pub fn records(&self) -> Result<Vec<BookingRecord>, DispatchError> {
        let _lock = self
            .file_mutex
            .lock()
            .map_err(|e| DispatchError::Storage(format!("Failed to acquire mutex: {}", e)))?;

        let file = File::open(&self.csv_path)?;
        let mut reader = ReaderBuilder::new().has_headers(true).from_reader(file);

        let mut records = Vec::new();
        for result in reader.deserialize::<BookingRecord>() {
            records.push(result?);
        }
        Ok(records)
    }

    pub fn find_by_id(&self, id: &str) -> Result<Option<BookingRecord>, DispatchError> {
        Ok(self.records()?.into_iter().find(|record| record.id == id))
    }
}

fn append_record(
    csv_path: &Path,
    file_mutex: &Mutex<()>,
    record: &BookingRecord,
) -> Result<(), DispatchError> {
    let _lock = file_mutex
        .lock()
        .map_err(|e| DispatchError::Storage(format!("Failed to acquire mutex: {}", e)))?;

    let file = OpenOptions::new().append(true).open(csv_path)?;
    let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);

    writer.serialize(record)?;
    writer.flush()?;

    info!("Stored booking record {} in {}", record.id, record.collection);
    Ok(())
}

// Twenty hex characters, the same length as a Firestore auto-id
fn generate_id() -> String {
    hex::encode(rand::random::<[u8; 10]>())
}

#[async_trait]
impl DocumentStore for CsvBookingStore {
    async fn create(
        &self,
        collection: &str,
        request: &BookingRequest,
    ) -> Result<StoredDocument, DispatchError> {
        let created_at = Utc::now();
        let record = BookingRecord::new(generate_id(), collection, created_at, request);

        let csv_path = self.csv_path.clone();
        let file_mutex = Arc::clone(&self.file_mutex);
        let row = record.clone();
        let written =
            tokio::task::spawn_blocking(move || append_record(&csv_path, &file_mutex, &row))
                .await
                .unwrap_or_else(|e| {
                    Err(DispatchError::Storage(format!("CSV writer task failed: {}", e)))
                });

        if let Err(e) = written {
            error!("Failed to write booking record: {}", e);
            return Err(e);
        }

        Ok(StoredDocument {
            id: record.id,
            created_at,
        })
    }
}
