//! Incoming WhatsApp event handling — lifecycle mapping, message
//! unwrapping, and media downloads.

use ponte_core::message::{Inbound, MediaPayload, WaEvent};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};
use wacore::types::events::Event;
use whatsapp_rust::client::Client;

/// Translate a transport event into a [`WaEvent`] and forward it.
pub(super) async fn handle_event(
    event: Event,
    client: Arc<Client>,
    tx: &mpsc::Sender<WaEvent>,
    client_store: &Arc<Mutex<Option<Arc<Client>>>>,
    sent_ids: &Arc<Mutex<HashSet<String>>>,
) {
    match event {
        Event::PairingQrCode { code, .. } => {
            info!("WhatsApp QR code generated (scan to pair)");
            forward(tx, WaEvent::Qr(code)).await;
        }
        Event::PairSuccess(_) => {
            info!("WhatsApp pairing successful");
        }
        Event::Connected(_) => {
            info!("WhatsApp connected");
            *client_store.lock().await = Some(client);
            forward(tx, WaEvent::Ready).await;
        }
        Event::Disconnected(_) => {
            warn!("WhatsApp disconnected");
            *client_store.lock().await = None;
            forward(tx, WaEvent::Disconnected("connection closed".into())).await;
        }
        Event::LoggedOut(_) => {
            warn!("WhatsApp logged out — session invalidated");
            *client_store.lock().await = None;
            forward(tx, WaEvent::AuthFailure("session logged out".into())).await;
        }
        Event::Message(msg, msg_info) => {
            handle_message(*msg, msg_info, tx, client_store, sent_ids).await;
        }
        _ => {}
    }
}

async fn forward(tx: &mpsc::Sender<WaEvent>, event: WaEvent) {
    if tx.send(event).await.is_err() {
        info!("whatsapp event receiver dropped");
    }
}

async fn handle_message(
    msg: waproto::whatsapp::Message,
    info: wacore::types::message::MessageInfo,
    tx: &mpsc::Sender<WaEvent>,
    client_store: &Arc<Mutex<Option<Arc<Client>>>>,
    sent_ids: &Arc<Mutex<HashSet<String>>>,
) {
    let msg_id = info.id.clone();
    let from_address = info.source.sender.user.clone();
    let is_status = info.source.chat.to_string() == "status@broadcast";
    let from_me = info.source.is_from_me;

    // Skip messages we sent through the bridge (echo prevention).
    if sent_ids.lock().await.remove(&msg_id) {
        debug!("skipping own echo: {msg_id}");
        return;
    }

    // Self-sent chat messages are not mirrored; self-sent status updates are.
    if from_me && !is_status {
        return;
    }

    // Unwrap nested wrappers (device_sent, ephemeral, view_once).
    let inner = msg
        .device_sent_message
        .as_ref()
        .and_then(|d| d.message.as_deref())
        .or_else(|| {
            msg.ephemeral_message
                .as_ref()
                .and_then(|e| e.message.as_deref())
        })
        .or_else(|| {
            msg.view_once_message
                .as_ref()
                .and_then(|v| v.message.as_deref())
        })
        .unwrap_or(&msg);

    let mut body = inner
        .conversation
        .as_deref()
        .or_else(|| {
            inner
                .extended_text_message
                .as_ref()
                .and_then(|e| e.text.as_deref())
        })
        .unwrap_or("")
        .to_string();

    let media = extract_media(inner, client_store, &mut body).await;

    if body.is_empty() && media.is_none() {
        return;
    }

    let name_hint = if info.push_name.is_empty() {
        None
    } else {
        Some(info.push_name.clone())
    };

    let inbound = Inbound {
        from_address,
        name_hint,
        is_status,
        body,
        media,
    };

    let event = if from_me {
        WaEvent::SelfMessage(inbound)
    } else {
        WaEvent::Message(inbound)
    };
    forward(tx, event).await;
}

/// Download the media attached to a message, if any.
///
/// Media captions replace the body. A failed download degrades to a body
/// note rather than dropping the message.
async fn extract_media(
    inner: &waproto::whatsapp::Message,
    client_store: &Arc<Mutex<Option<Arc<Client>>>>,
    body: &mut String,
) -> Option<MediaPayload> {
    let (mimetype, caption, filename): (String, Option<String>, Option<String>) =
        if let Some(ref img) = inner.image_message {
            (
                img.mimetype.clone().unwrap_or_else(|| "image/jpeg".into()),
                img.caption.clone(),
                None,
            )
        } else if let Some(ref sticker) = inner.sticker_message {
            (
                sticker
                    .mimetype
                    .clone()
                    .unwrap_or_else(|| "image/webp".into()),
                None,
                None,
            )
        } else if let Some(ref video) = inner.video_message {
            (
                video.mimetype.clone().unwrap_or_else(|| "video/mp4".into()),
                video.caption.clone(),
                None,
            )
        } else if let Some(ref audio) = inner.audio_message {
            (
                audio.mimetype.clone().unwrap_or_else(|| "audio/ogg".into()),
                None,
                None,
            )
        } else if let Some(ref doc) = inner.document_message {
            (
                doc.mimetype
                    .clone()
                    .unwrap_or_else(|| "application/octet-stream".into()),
                doc.caption.clone(),
                doc.file_name.clone(),
            )
        } else {
            return None;
        };

    if let Some(caption) = caption {
        *body = caption;
    }

    let client = { client_store.lock().await.clone() };
    let client = match client {
        Some(c) => c,
        None => {
            warn!("whatsapp client not available for media download");
            *body = format!("[Media download failed: {mimetype}]");
            return None;
        }
    };

    let download = if let Some(ref img) = inner.image_message {
        client.download(img.as_ref()).await
    } else if let Some(ref sticker) = inner.sticker_message {
        client.download(sticker.as_ref()).await
    } else if let Some(ref video) = inner.video_message {
        client.download(video.as_ref()).await
    } else if let Some(ref audio) = inner.audio_message {
        client.download(audio.as_ref()).await
    } else if let Some(ref doc) = inner.document_message {
        client.download(doc.as_ref()).await
    } else {
        return None;
    };

    match download {
        Ok(data) => {
            debug!("downloaded whatsapp media ({mimetype}, {} bytes)", data.len());
            Some(MediaPayload {
                mimetype,
                data,
                filename,
            })
        }
        Err(e) => {
            warn!("whatsapp media download failed: {e}");
            *body = format!("[Media download failed: {mimetype}]");
            None
        }
    }
}
