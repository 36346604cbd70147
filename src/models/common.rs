use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Success,
    Error,
}

/// Transient message shown to the customer after a submit attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
    pub auto_dismiss_ms: u64,
}

impl Notification {
    pub fn success(message: impl Into<String>, auto_dismiss_ms: u64) -> Self {
        Self {
            level: NotificationLevel::Success,
            message: message.into(),
            auto_dismiss_ms,
        }
    }

    pub fn error(message: impl Into<String>, auto_dismiss_ms: u64) -> Self {
        Self {
            level: NotificationLevel::Error,
            message: message.into(),
            auto_dismiss_ms,
        }
    }
}

pub fn default_auto_dismiss_ms() -> u64 {
    3000
}
