//! Outbound WhatsApp dispatch with Telegram feedback notices.
//!
//! A successful send posts a short-lived confirmation that deletes itself
//! after a few seconds; a failed send posts a persistent error notice.
//! Nothing here panics across the boundary — the caller gets a bool.

use ponte_channels::telegram::TelegramApi;
use ponte_core::{error::PonteError, message::MediaPayload, traits::WhatsAppTransport};
use std::sync::Arc;
use tracing::{info, warn};

/// How long a delivery confirmation stays visible before self-deleting.
const CONFIRM_TTL_SECS: u64 = 5;

/// Normalize a raw phone-like address: trim, strip one leading `+`, and
/// require the remainder to be all decimal digits.
pub fn normalize_address(raw: &str) -> Result<String, PonteError> {
    let trimmed = raw.trim();
    let digits = trimmed.strip_prefix('+').unwrap_or(trimmed);

    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(PonteError::Validation(format!(
            "invalid phone number format: '{raw}'"
        )));
    }

    Ok(digits.to_string())
}

/// What a dispatch carries to WhatsApp.
pub enum Outbound<'a> {
    Text(&'a str),
    Media {
        payload: &'a MediaPayload,
        caption: Option<&'a str>,
        /// Noun used in the confirmation notice ("Photo", "Video", ...).
        label: &'static str,
    },
}

impl Outbound<'_> {
    fn label(&self) -> &'static str {
        match self {
            Outbound::Text(_) => "Message",
            Outbound::Media { label, .. } => label,
        }
    }
}

/// Validates destinations, forwards content to WhatsApp, and reports the
/// outcome back into the Telegram group.
pub struct Dispatcher {
    wa: Arc<dyn WhatsAppTransport>,
    tg: Arc<TelegramApi>,
    group_id: i64,
    topic_primary: i64,
}

impl Dispatcher {
    pub fn new(
        wa: Arc<dyn WhatsAppTransport>,
        tg: Arc<TelegramApi>,
        group_id: i64,
        topic_primary: i64,
    ) -> Self {
        Self {
            wa,
            tg,
            group_id,
            topic_primary,
        }
    }

    /// Send content to a WhatsApp address. Returns true when the WhatsApp
    /// send went through; every outcome is reported to Telegram, replying
    /// to the message that triggered the dispatch.
    pub async fn dispatch(&self, raw_address: &str, content: Outbound<'_>, reply_to: i64) -> bool {
        let address = match normalize_address(raw_address) {
            Ok(a) => a,
            Err(e) => {
                self.report_failure(raw_address, &e, reply_to).await;
                return false;
            }
        };

        let result = match &content {
            Outbound::Text(text) => self.wa.send_text(&address, text).await,
            Outbound::Media { payload, caption, .. } => {
                self.wa.send_media(&address, payload, *caption).await
            }
        };

        match result {
            Ok(()) => {
                info!("forwarded {} to whatsapp {address}", content.label());
                self.confirm(content.label(), &address, reply_to).await;
                true
            }
            Err(e) => {
                self.report_failure(&address, &e, reply_to).await;
                false
            }
        }
    }

    /// Post a confirmation notice and schedule its deletion. The deferred
    /// delete is fire-and-forget; failure is logged only.
    async fn confirm(&self, label: &str, address: &str, reply_to: i64) {
        let text = format!("{label} sent to {address}");
        let sent = self
            .tg
            .send_text(
                self.group_id,
                &text,
                Some(self.topic_primary),
                Some(reply_to),
            )
            .await;

        let message_id = match sent {
            Ok(id) => id,
            Err(e) => {
                warn!("failed to post confirmation notice: {e}");
                return;
            }
        };

        let tg = self.tg.clone();
        let group_id = self.group_id;
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_secs(CONFIRM_TTL_SECS)).await;
            if let Err(e) = tg.delete_message(group_id, message_id).await {
                warn!("failed to delete confirmation notice: {e}");
            }
        });
    }

    /// Post a persistent error notice quoting the failure reason.
    async fn report_failure(&self, address: &str, error: &PonteError, reply_to: i64) {
        warn!("dispatch to {address} failed: {error}");
        let text = format!("Error sending message to {address}: {error}");
        if let Err(e) = self
            .tg
            .send_text(
                self.group_id,
                &text,
                Some(self.topic_primary),
                Some(reply_to),
            )
            .await
        {
            warn!("failed to post error notice: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_leading_plus() {
        assert_eq!(normalize_address("+6281234").unwrap(), "6281234");
        assert_eq!(normalize_address("6281234").unwrap(), "6281234");
    }

    #[test]
    fn test_normalize_trims_whitespace() {
        assert_eq!(normalize_address("  +6281234 ").unwrap(), "6281234");
    }

    #[test]
    fn test_normalize_rejects_non_digits() {
        assert!(normalize_address("abc123").is_err());
        assert!(normalize_address("628-1234").is_err());
        assert!(normalize_address("+62 81234").is_err());
    }

    #[test]
    fn test_normalize_rejects_empty() {
        assert!(normalize_address("").is_err());
        assert!(normalize_address("+").is_err());
        assert!(normalize_address("   ").is_err());
    }

    #[test]
    fn test_normalize_rejects_double_plus() {
        // Only one leading "+" is stripped; a second one fails validation.
        assert!(normalize_address("++628").is_err());
    }
}
