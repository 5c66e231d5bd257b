//! WhatsApp channel — pure Rust implementation via `whatsapp-rust`.
//!
//! Uses the WhatsApp Web protocol (Noise handshake + Signal encryption).
//! Pairing is done by scanning a QR code, like WhatsApp Web; the session is
//! persisted to `{data_dir}/whatsapp_session/whatsapp.db`.

mod events;
pub mod qr;
mod send;

#[cfg(test)]
mod tests;

use async_trait::async_trait;
use ponte_core::{
    error::PonteError,
    message::{MediaPayload, WaContact, WaEvent},
    traits::WhatsAppTransport,
};
use send::{retry_send, split_message};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::info;
use wacore_binary::jid::Jid;
use whatsapp_rust::bot::Bot;
use whatsapp_rust::client::Client;
use whatsapp_rust_tokio_transport::TokioWebSocketTransportFactory;
use whatsapp_rust_ureq_http_client::UreqHttpClient;

use crate::whatsapp_session::SqlxSessionStore;

/// WhatsApp channel speaking the WhatsApp Web protocol.
///
/// Addresses handed to this channel are bare digit strings; the channel owns
/// the mapping to `{digits}@s.whatsapp.net` wire identifiers.
pub struct WhatsAppChannel {
    data_dir: String,
    /// Client handle for sending messages — set once the bot connects.
    client: Arc<Mutex<Option<Arc<Client>>>>,
    /// Message IDs we sent — used to ignore our own echo.
    sent_ids: Arc<Mutex<HashSet<String>>>,
}

impl WhatsAppChannel {
    pub fn new(data_dir: &str) -> Self {
        Self {
            data_dir: data_dir.to_string(),
            client: Arc::new(Mutex::new(None)),
            sent_ids: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    fn session_db_path(&self) -> String {
        let dir = ponte_core::config::shellexpand(&self.data_dir);
        let session_dir = format!("{dir}/whatsapp_session");
        let _ = std::fs::create_dir_all(&session_dir);
        format!("{session_dir}/whatsapp.db")
    }

    /// Parse a bare digit address into a personal-chat JID.
    fn address_jid(address: &str) -> Result<Jid, PonteError> {
        let jid_str = format!("{address}@s.whatsapp.net");
        jid_str
            .parse()
            .map_err(|e| PonteError::WhatsApp(format!("invalid whatsapp JID '{jid_str}': {e}")))
    }

    async fn connected_client(&self) -> Result<Arc<Client>, PonteError> {
        self.client
            .lock()
            .await
            .clone()
            .ok_or_else(|| PonteError::WhatsApp("whatsapp client not connected".into()))
    }
}

#[async_trait]
impl WhatsAppTransport for WhatsAppChannel {
    async fn start(&self) -> Result<mpsc::Receiver<WaEvent>, PonteError> {
        let (tx, rx) = mpsc::channel(64);
        let db_path = self.session_db_path();

        info!("WhatsApp channel starting (session: {db_path})...");

        let backend = Arc::new(
            SqlxSessionStore::new(&db_path)
                .await
                .map_err(|e| PonteError::WhatsApp(format!("session store init failed: {e}")))?,
        );

        let tx_events = tx.clone();
        let client_for_event = self.client.clone();
        let sent_ids_for_event = self.sent_ids.clone();

        let mut bot = Bot::builder()
            .with_backend(backend)
            .with_transport_factory(TokioWebSocketTransportFactory::new())
            .with_http_client(UreqHttpClient::new())
            .with_device_props(
                Some("PONTE".to_string()),
                None,
                Some(waproto::whatsapp::device_props::PlatformType::Desktop),
            )
            .on_event(move |event, client| {
                let tx = tx_events.clone();
                let client_store = client_for_event.clone();
                let sent_ids = sent_ids_for_event.clone();
                async move {
                    events::handle_event(event, client, &tx, &client_store, &sent_ids).await;
                }
            })
            .build()
            .await
            .map_err(|e| PonteError::WhatsApp(format!("bot build failed: {e}")))?;

        // Store the client handle immediately; the Connected event refreshes it.
        *self.client.lock().await = Some(bot.client());

        let _handle = bot
            .run()
            .await
            .map_err(|e| PonteError::WhatsApp(format!("bot run failed: {e}")))?;

        info!("WhatsApp channel started");
        Ok(rx)
    }

    async fn send_text(&self, address: &str, text: &str) -> Result<(), PonteError> {
        let client = self.connected_client().await?;
        let jid = Self::address_jid(address)?;

        let chunks = split_message(text, 4096);
        for chunk in chunks {
            let msg = waproto::whatsapp::Message {
                conversation: Some(chunk.to_string()),
                ..Default::default()
            };
            let msg_id = retry_send(&client, &jid, msg).await?;
            // Track sent message ID to ignore our own echo.
            self.sent_ids.lock().await.insert(msg_id);
        }

        Ok(())
    }

    async fn send_media(
        &self,
        address: &str,
        media: &MediaPayload,
        caption: Option<&str>,
    ) -> Result<(), PonteError> {
        let client = self.connected_client().await?;
        let jid = Self::address_jid(address)?;

        let msg_id = send::send_media_message(&client, &jid, media, caption).await?;
        self.sent_ids.lock().await.insert(msg_id);

        Ok(())
    }

    async fn contacts(&self) -> Result<Vec<WaContact>, PonteError> {
        // The WhatsApp Web protocol binding exposes no roster API; the
        // contact directory fills in from inbound message name hints.
        Err(PonteError::WhatsApp(
            "this transport cannot list contacts; they are learned from inbound messages".into(),
        ))
    }

    async fn destroy(&self) -> Result<(), PonteError> {
        info!("WhatsApp channel stopped");
        *self.client.lock().await = None;
        Ok(())
    }
}
