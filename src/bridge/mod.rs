//! The message-routing and reply-correlation engine.
//!
//! One task owns the whole bridge: it selects over the WhatsApp event
//! stream, the Telegram update stream, and the interrupt signal, running
//! each handler to completion. Handler errors are caught here, logged,
//! and surfaced as a best-effort notice — the loop itself only dies
//! through the lifecycle paths.

mod commands;
mod dispatch;
mod lifecycle;
mod render;

use dispatch::{Dispatcher, Outbound};
use lifecycle::Supervisor;
use ponte_channels::telegram::{self, SendMediaKind, TelegramApi};
use ponte_channels::whatsapp::qr::generate_qr_image;
use ponte_core::{
    config::Config,
    error::PonteError,
    message::{Inbound, MediaPayload, TgIncoming, TgMediaKind, WaEvent},
    traits::WhatsAppTransport,
};
use ponte_store::{AdminRegistry, Store};
use render::{MediaClass, Topic};
use std::sync::Arc;
use tracing::{debug, error, info};

pub struct Bridge {
    tg: Arc<TelegramApi>,
    wa: Arc<dyn WhatsAppTransport>,
    store: Store,
    admins: Arc<AdminRegistry>,
    dispatcher: Dispatcher,
    supervisor: Supervisor,
    group_id: i64,
    topic_primary: i64,
    topic_status: i64,
}

impl Bridge {
    pub fn new(
        config: &Config,
        tg: Arc<TelegramApi>,
        wa: Arc<dyn WhatsAppTransport>,
        store: Store,
        admins: Arc<AdminRegistry>,
    ) -> Self {
        let tg_cfg = &config.telegram;
        let dispatcher = Dispatcher::new(
            wa.clone(),
            tg.clone(),
            tg_cfg.group_id,
            tg_cfg.topic_primary,
        );
        let supervisor = Supervisor::new(
            tg.clone(),
            store.clone(),
            tg_cfg.group_id,
            tg_cfg.topic_primary,
        );

        Self {
            tg,
            wa,
            store,
            admins,
            dispatcher,
            supervisor,
            group_id: tg_cfg.group_id,
            topic_primary: tg_cfg.topic_primary,
            topic_status: tg_cfg.topic_status,
        }
    }

    /// Run the bridge until an operator interrupt. Lifecycle-fatal events
    /// exit the process from within the supervisor instead of returning.
    pub async fn run(&self) -> Result<(), PonteError> {
        let mut wa_rx = self.wa.start().await?;
        let mut tg_rx = telegram::start_updates(&self.tg);

        info!("Bridge running");

        loop {
            tokio::select! {
                Some(event) = wa_rx.recv() => {
                    if let Err(e) = self.handle_wa_event(event).await {
                        error!("error handling WhatsApp event: {e}");
                        self.best_effort_notice(&format!("Error handling WhatsApp message: {e}"))
                            .await;
                    }
                }
                Some(update) = tg_rx.recv() => {
                    if let Err(e) = self.handle_tg_update(update).await {
                        error!("error handling Telegram update: {e}");
                        self.best_effort_notice(&format!("Error handling Telegram message: {e}"))
                            .await;
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("interrupt received");
                    self.supervisor.shutdown(&self.wa).await;
                    return Ok(());
                }
            }
        }
    }

    async fn best_effort_notice(&self, text: &str) {
        if let Err(e) = self
            .tg
            .send_text(self.group_id, text, Some(self.topic_primary), None)
            .await
        {
            error!("failed to post error notice: {e}");
        }
    }

    fn topic_id(&self, topic: Topic) -> i64 {
        match topic {
            Topic::Primary => self.topic_primary,
            Topic::Status => self.topic_status,
        }
    }

    // --- WhatsApp side ---

    async fn handle_wa_event(&self, event: WaEvent) -> Result<(), PonteError> {
        match event {
            WaEvent::Qr(code) => self.mirror_qr(&code).await,
            WaEvent::Ready => {
                self.tg
                    .send_text(
                        self.group_id,
                        "WhatsApp connected.",
                        Some(self.topic_primary),
                        None,
                    )
                    .await?;
                Ok(())
            }
            WaEvent::Disconnected(reason) => {
                self.best_effort_notice(&format!(
                    "WhatsApp disconnected: {reason}. Restarting application..."
                ))
                .await;
                self.supervisor.restart(&reason).await;
                Ok(())
            }
            WaEvent::AuthFailure(reason) => {
                self.best_effort_notice(&format!(
                    "WhatsApp authentication failed: {reason}. Restarting application..."
                ))
                .await;
                self.supervisor.restart(&reason).await;
                Ok(())
            }
            WaEvent::Message(inbound) => self.mirror_message(&inbound).await,
            WaEvent::SelfMessage(inbound) => {
                if inbound.is_status {
                    self.mirror_self_status(&inbound).await
                } else {
                    Ok(())
                }
            }
        }
    }

    /// Render the pairing QR as a photo in the primary topic.
    async fn mirror_qr(&self, code: &str) -> Result<(), PonteError> {
        let png = generate_qr_image(code)?;
        self.tg
            .send_text(
                self.group_id,
                "WhatsApp session needs pairing.",
                Some(self.topic_primary),
                None,
            )
            .await?;
        self.tg
            .send_media(
                self.group_id,
                SendMediaKind::Photo,
                &png,
                "qrcode.png",
                "image/png",
                Some("Scan this QR code with WhatsApp to link the account."),
                Some(self.topic_primary),
                None,
            )
            .await?;
        Ok(())
    }

    /// Mirror an inbound message into Telegram.
    async fn mirror_message(&self, inbound: &Inbound) -> Result<(), PonteError> {
        if let Some(ref media) = inbound.media {
            if render::classify_media(&media.mimetype) == MediaClass::Sticker {
                debug!("skipping sticker message from {}", inbound.from_address);
                return Ok(());
            }
        }

        let name = self.resolve_name(inbound).await?;
        let header = render::render_header(&name, &inbound.from_address);
        let topic = self.topic_id(render::topic_for(inbound));

        match inbound.media {
            Some(ref media) => {
                self.mirror_media(&header, &inbound.body, media, topic)
                    .await
            }
            None => {
                let text = format!("{header}{}{}", inbound.body, render::REPLY_HINT);
                self.tg
                    .send_text(self.group_id, &text, Some(topic), None)
                    .await?;
                Ok(())
            }
        }
    }

    /// Mirror a status update posted by the linked account itself.
    async fn mirror_self_status(&self, inbound: &Inbound) -> Result<(), PonteError> {
        if let Some(ref media) = inbound.media {
            if render::classify_media(&media.mimetype) == MediaClass::Sticker {
                debug!("skipping sticker status");
                return Ok(());
            }
        }

        let header = render::render_status_header();
        let topic = self.topic_id(Topic::Status);

        match inbound.media {
            Some(ref media) => {
                self.mirror_media(&header, &inbound.body, media, topic)
                    .await
            }
            None => {
                let text = format!("{header}{}", inbound.body);
                self.tg
                    .send_text(self.group_id, &text, Some(topic), None)
                    .await?;
                Ok(())
            }
        }
    }

    /// Resolve the display name for an inbound message, seeding the contact
    /// directory from the transport hint on first sight.
    async fn resolve_name(&self, inbound: &Inbound) -> Result<String, PonteError> {
        if let Some(name) = self.store.contact_name(&inbound.from_address).await? {
            return Ok(name);
        }

        if let Some(ref hint) = inbound.name_hint {
            self.store
                .upsert_contact(&inbound.from_address, hint)
                .await?;
            return Ok(hint.clone());
        }

        Ok("Unknown".to_string())
    }

    /// Send mirrored media with the degrading fallback chain:
    /// typed send → document send → plain-text notice.
    async fn mirror_media(
        &self,
        header: &str,
        body: &str,
        media: &MediaPayload,
        topic: i64,
    ) -> Result<(), PonteError> {
        let caption = format!("{header}{body}{}", render::REPLY_HINT);
        let filename = render::media_filename(media);

        let kind = match render::classify_media(&media.mimetype) {
            MediaClass::Photo => SendMediaKind::Photo,
            MediaClass::Video => SendMediaKind::Video,
            MediaClass::Audio => SendMediaKind::Audio,
            MediaClass::Document => SendMediaKind::Document,
            // Stickers never reach here; callers drop them first.
            MediaClass::Sticker => return Ok(()),
        };

        let typed = self
            .tg
            .send_media(
                self.group_id,
                kind,
                &media.data,
                &filename,
                &media.mimetype,
                Some(&caption),
                Some(topic),
                None,
            )
            .await;

        let err = match typed {
            Ok(_) => return Ok(()),
            Err(e) => e,
        };
        error!("media send failed ({}): {err}", media.mimetype);

        let fallback = self
            .tg
            .send_media(
                self.group_id,
                SendMediaKind::Document,
                &media.data,
                &filename,
                &media.mimetype,
                Some(&caption),
                Some(topic),
                None,
            )
            .await;

        if let Err(e) = fallback {
            error!("document fallback failed: {e}");
            let notice = format!("{header}[Media could not be sent: {}]\n{body}", media.mimetype);
            self.tg
                .send_text(self.group_id, &notice, Some(topic), None)
                .await?;
        }

        Ok(())
    }

    // --- Telegram side ---

    async fn handle_tg_update(&self, update: TgIncoming) -> Result<(), PonteError> {
        if update.chat_id == self.group_id {
            if let Some(text) = update.text.clone() {
                if text.starts_with("/chat_") {
                    return self.handle_group_directive(&update, &text).await;
                }
            }
            if update.reply_to_text.is_some() {
                return self.handle_group_reply(&update).await;
            }
            return Ok(());
        }

        if update.is_private {
            if let Some(text) = update.text.clone() {
                if text.starts_with('/') {
                    return self.handle_private_command(&update, &text).await;
                }
            }
        }

        Ok(())
    }

    /// A reply to a mirrored message: correlate it back to the source
    /// address and forward the reply content to WhatsApp.
    async fn handle_group_reply(&self, update: &TgIncoming) -> Result<(), PonteError> {
        if !self.admins.is_admin(&update.sender_id).await {
            self.group_notice(
                "You do not have permission to reply here",
                update.message_id,
            )
            .await?;
            return Ok(());
        }

        let quoted = update.reply_to_text.as_deref().unwrap_or_default();
        let address = match render::extract_address(quoted) {
            Some(a) => a,
            None => {
                self.group_notice(
                    "Could not find a phone number in the original message",
                    update.message_id,
                )
                .await?;
                return Ok(());
            }
        };

        if let Some(ref text) = update.text {
            self.dispatcher
                .dispatch(&address, Outbound::Text(text), update.message_id)
                .await;
            return Ok(());
        }

        if let Some(ref media_ref) = update.media {
            let data = self.tg.download_file(&media_ref.file_id).await?;
            let (mimetype, filename, label) = match media_ref.kind {
                TgMediaKind::Photo => ("image/jpeg".to_string(), "image.jpg".to_string(), "Photo"),
                TgMediaKind::Video => (
                    media_ref
                        .mime_type
                        .clone()
                        .unwrap_or_else(|| "video/mp4".into()),
                    media_ref
                        .file_name
                        .clone()
                        .unwrap_or_else(|| "video.mp4".into()),
                    "Video",
                ),
                TgMediaKind::Document => (
                    media_ref
                        .mime_type
                        .clone()
                        .unwrap_or_else(|| "application/octet-stream".into()),
                    media_ref
                        .file_name
                        .clone()
                        .unwrap_or_else(|| "file".into()),
                    "Document",
                ),
                TgMediaKind::Audio | TgMediaKind::Voice => (
                    media_ref
                        .mime_type
                        .clone()
                        .unwrap_or_else(|| "audio/ogg".into()),
                    "audio.ogg".to_string(),
                    "Audio",
                ),
            };

            let payload = MediaPayload {
                mimetype,
                data,
                filename: Some(filename),
            };
            self.dispatcher
                .dispatch(
                    &address,
                    Outbound::Media {
                        payload: &payload,
                        caption: update.caption.as_deref(),
                        label,
                    },
                    update.message_id,
                )
                .await;
        }

        Ok(())
    }
}
