use crate::{
    error::PonteError,
    message::{MediaPayload, WaContact, WaEvent},
};
use async_trait::async_trait;

/// WhatsApp transport capability — the bridge's only view of the WhatsApp
/// side.
///
/// The production binding speaks the WhatsApp Web protocol; tests substitute
/// an in-memory fake. Addresses are bare digit strings; the transport owns
/// the mapping to wire identifiers.
#[async_trait]
pub trait WhatsAppTransport: Send + Sync {
    /// Connect and start the session.
    /// Returns a receiver that yields lifecycle and message events.
    async fn start(&self) -> Result<tokio::sync::mpsc::Receiver<WaEvent>, PonteError>;

    /// Send a text message to an address.
    async fn send_text(&self, address: &str, text: &str) -> Result<(), PonteError>;

    /// Send a media message to an address, with an optional caption.
    async fn send_media(
        &self,
        address: &str,
        media: &MediaPayload,
        caption: Option<&str>,
    ) -> Result<(), PonteError>;

    /// Fetch the full contact roster of the linked account.
    async fn contacts(&self) -> Result<Vec<WaContact>, PonteError>;

    /// Tear the session down cleanly.
    async fn destroy(&self) -> Result<(), PonteError>;
}
