use dotenv::dotenv;
use std::env;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use crate::models::common::default_auto_dismiss_ms;
use crate::services::submission::RegistryLimits;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set in environment")]
    Missing(&'static str),

    #[error("{name} has an invalid value '{value}'")]
    Invalid { name: &'static str, value: String },
}

/// Where validated bookings are sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchConfig {
    WhatsApp {
        base_url: String,
        number: String,
    },
    Firestore {
        endpoint: String,
        project_id: String,
        database: String,
        api_key: Option<String>,
        collection: String,
    },
    Csv {
        path: String,
        collection: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub dispatch: DispatchConfig,
    pub auto_dismiss_ms: u64,
    pub form_limits: RegistryLimits,
    pub port: u16,
}

impl AppConfig {
    /// Load configuration from the process environment, reading `.env` first
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration from any variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let collection = var("BOOKINGS_COLLECTION").unwrap_or_else(|| "bookings".to_string());

        let mode = var("BOOKING_DISPATCH").unwrap_or_else(|| "whatsapp".to_string());
        let dispatch = match mode.to_lowercase().as_str() {
            "whatsapp" => DispatchConfig::WhatsApp {
                base_url: var("WHATSAPP_BASE_URL").unwrap_or_else(|| "https://wa.me".to_string()),
                number: var("WHATSAPP_NUMBER").unwrap_or_else(|| "447722045308".to_string()),
            },
            "firestore" => DispatchConfig::Firestore {
                endpoint: var("FIRESTORE_ENDPOINT")
                    .unwrap_or_else(|| "https://firestore.googleapis.com".to_string()),
                project_id: var("FIRESTORE_PROJECT_ID")
                    .ok_or(ConfigError::Missing("FIRESTORE_PROJECT_ID"))?,
                database: var("FIRESTORE_DATABASE").unwrap_or_else(|| "(default)".to_string()),
                api_key: var("FIRESTORE_API_KEY"),
                collection,
            },
            "csv" => DispatchConfig::Csv {
                path: var("BOOKINGS_CSV_PATH").unwrap_or_else(|| "bookings.csv".to_string()),
                collection,
            },
            _ => {
                return Err(ConfigError::Invalid {
                    name: "BOOKING_DISPATCH",
                    value: mode,
                })
            }
        };

        let auto_dismiss_ms = parse_or(
            "NOTIFICATION_AUTO_DISMISS_MS",
            var("NOTIFICATION_AUTO_DISMISS_MS"),
            default_auto_dismiss_ms(),
        )?;
        let defaults = RegistryLimits::default();
        let form_limits = RegistryLimits {
            idle_ttl: Duration::from_secs(parse_or(
                "FORM_IDLE_TTL_SECS",
                var("FORM_IDLE_TTL_SECS"),
                defaults.idle_ttl.as_secs(),
            )?),
            max_forms: parse_or("MAX_OPEN_FORMS", var("MAX_OPEN_FORMS"), defaults.max_forms)?,
        };
        let port = parse_or("PORT", var("PORT"), 3000)?;

        Ok(Self {
            dispatch,
            auto_dismiss_ms,
            form_limits,
            port,
        })
    }
}

fn parse_or<T: FromStr>(
    name: &'static str,
    value: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match value {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        None => Ok(default),
    }
}
