use async_trait::async_trait;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::Url;
use tracing::{debug, info};

use super::{DispatchError, DispatchReceipt, Dispatcher};
use crate::models::booking::{BookingRequest, ServiceTier};
use crate::models::form::FormVariant;

/// Characters left alone by `encodeURIComponent`; everything else is escaped.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

// Message-link bookings are always for the monthly package
const FIXED_SERVICE: ServiceTier = ServiceTier::MonthlyClean;

/// Hands bookings off to a messaging app through a pre-filled deep link.
pub struct MessageLinkDispatcher {
    base_url: String,
    recipient: String,
}

impl MessageLinkDispatcher {
    pub fn new(base_url: &str, recipient: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            recipient: recipient.to_string(),
        }
    }

    /// Human readable summary of the booking, one labelled field per line.
    pub fn render_summary(request: &BookingRequest) -> String {
        let day = request
            .collection_day
            .map(|day| day.as_str())
            .unwrap_or_default();

        let mut lines = vec![
            "*New Monthly Bin Cleaning Booking*".to_string(),
            String::new(),
            format!("*Name:* {}", request.name),
            format!("*Phone:* {}", request.telephone),
            format!("*Email:* {}", request.email),
            format!("*Address:* {}", request.address),
            format!("*Council:* {}", request.council),
            format!("*Bins:* {}", request.bins.labels()),
            format!("*Collection Day:* {}", day),
            format!("*Service:* {}", FIXED_SERVICE.label()),
        ];
        if let Some(notes) = request.notes() {
            lines.push(format!("*Additional Notes:* {}", notes));
        }

        lines.join("\n")
    }

    /// Build the deep link carrying the encoded summary.
    ///
    /// The link is returned as built; parsing only checks it, since `Url`
    /// would re-escape characters such as `'` in the query.
    pub fn build_link(&self, request: &BookingRequest) -> Result<String, DispatchError> {
        if self.recipient.is_empty() || !self.recipient.chars().all(|c| c.is_ascii_digit()) {
            return Err(DispatchError::Navigation(format!(
                "recipient must be digits only, got '{}'",
                self.recipient
            )));
        }

        let summary = Self::render_summary(request);
        let encoded = utf8_percent_encode(&summary, URI_COMPONENT);
        let link = format!("{}/{}?text={}", self.base_url, self.recipient, encoded);

        Url::parse(&link).map_err(|e| DispatchError::Navigation(e.to_string()))?;
        Ok(link)
    }
}

#[async_trait]
impl Dispatcher for MessageLinkDispatcher {
    fn variant(&self) -> FormVariant {
        FormVariant::MessageLink
    }

    fn success_message(&self) -> &'static str {
        "Redirecting to WhatsApp..."
    }

    fn failure_message(&self) -> &'static str {
        "Failed to open WhatsApp. Please try again."
    }

    async fn submit(&self, request: &BookingRequest) -> Result<DispatchReceipt, DispatchError> {
        if let Some(tier) = request.service.filter(|tier| *tier != FIXED_SERVICE) {
            debug!(
                "Ignoring service tier {} on a message-link booking",
                tier.key()
            );
        }

        let url = self.build_link(request)?;
        info!("Built messaging link for booking from {}", request.name);
        debug!("Messaging link: {}", url);

        Ok(DispatchReceipt::Redirect { url })
    }
}
