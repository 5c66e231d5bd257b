//! Outbound WhatsApp sends: retry policy, chunking, and media upload.

use ponte_core::{error::PonteError, message::MediaPayload};
use std::sync::Arc;
use tracing::warn;
use wacore_binary::jid::Jid;
use whatsapp_rust::client::Client;
use whatsapp_rust::download::MediaType;

/// Delays between send attempts. Transient stream errors during session
/// renegotiation usually clear within a second or two.
pub(super) const RETRY_DELAYS_MS: [u64; 3] = [500, 1000, 2000];

/// Send a message, retrying on failure. Returns the sent message id.
pub(super) async fn retry_send(
    client: &Arc<Client>,
    jid: &Jid,
    msg: waproto::whatsapp::Message,
) -> Result<String, PonteError> {
    let mut attempt = 0;
    loop {
        match client.send_message(jid.clone(), msg.clone()).await {
            Ok(msg_id) => return Ok(msg_id),
            Err(e) if attempt < RETRY_DELAYS_MS.len() => {
                let delay = RETRY_DELAYS_MS[attempt];
                warn!("whatsapp send failed (retry in {delay}ms): {e}");
                tokio::time::sleep(std::time::Duration::from_millis(delay)).await;
                attempt += 1;
            }
            Err(e) => {
                return Err(PonteError::WhatsApp(format!("send failed: {e}")));
            }
        }
    }
}

/// Upload media bytes and send the typed message matching their class.
pub(super) async fn send_media_message(
    client: &Arc<Client>,
    jid: &Jid,
    media: &MediaPayload,
    caption: Option<&str>,
) -> Result<String, PonteError> {
    let class = media.mimetype.split('/').next().unwrap_or_default();
    let media_type = match class {
        "image" => MediaType::Image,
        "video" => MediaType::Video,
        "audio" => MediaType::Audio,
        _ => MediaType::Document,
    };

    let upload = client
        .upload(media.data.clone(), media_type)
        .await
        .map_err(|e| PonteError::WhatsApp(format!("media upload failed: {e}")))?;

    let msg = match class {
        "image" => waproto::whatsapp::Message {
            image_message: Some(Box::new(waproto::whatsapp::message::ImageMessage {
                mimetype: Some(media.mimetype.clone()),
                caption: caption.map(str::to_string),
                url: Some(upload.url),
                direct_path: Some(upload.direct_path),
                media_key: Some(upload.media_key),
                file_enc_sha256: Some(upload.file_enc_sha256),
                file_sha256: Some(upload.file_sha256),
                file_length: Some(upload.file_length),
                ..Default::default()
            })),
            ..Default::default()
        },
        "video" => waproto::whatsapp::Message {
            video_message: Some(Box::new(waproto::whatsapp::message::VideoMessage {
                mimetype: Some(media.mimetype.clone()),
                caption: caption.map(str::to_string),
                url: Some(upload.url),
                direct_path: Some(upload.direct_path),
                media_key: Some(upload.media_key),
                file_enc_sha256: Some(upload.file_enc_sha256),
                file_sha256: Some(upload.file_sha256),
                file_length: Some(upload.file_length),
                ..Default::default()
            })),
            ..Default::default()
        },
        "audio" => waproto::whatsapp::Message {
            audio_message: Some(Box::new(waproto::whatsapp::message::AudioMessage {
                mimetype: Some(media.mimetype.clone()),
                // Ogg audio renders as a voice note.
                ptt: Some(media.mimetype.starts_with("audio/ogg")),
                url: Some(upload.url),
                direct_path: Some(upload.direct_path),
                media_key: Some(upload.media_key),
                file_enc_sha256: Some(upload.file_enc_sha256),
                file_sha256: Some(upload.file_sha256),
                file_length: Some(upload.file_length),
                ..Default::default()
            })),
            ..Default::default()
        },
        _ => waproto::whatsapp::Message {
            document_message: Some(Box::new(waproto::whatsapp::message::DocumentMessage {
                mimetype: Some(media.mimetype.clone()),
                file_name: media.filename.clone(),
                caption: caption.map(str::to_string),
                url: Some(upload.url),
                direct_path: Some(upload.direct_path),
                media_key: Some(upload.media_key),
                file_enc_sha256: Some(upload.file_enc_sha256),
                file_sha256: Some(upload.file_sha256),
                file_length: Some(upload.file_length),
                ..Default::default()
            })),
            ..Default::default()
        },
    };

    retry_send(client, jid, msg).await
}

/// Split a long message into chunks that respect WhatsApp's 4096-char limit.
pub(super) fn split_message(text: &str, max_len: usize) -> Vec<&str> {
    if text.len() <= max_len {
        return vec![text];
    }

    let mut chunks = Vec::new();
    let mut start = 0;

    while start < text.len() {
        let end = (start + max_len).min(text.len());
        let break_at = if end < text.len() {
            text[start..end]
                .rfind('\n')
                .map(|i| start + i + 1)
                .unwrap_or(end)
        } else {
            end
        };
        chunks.push(&text[start..break_at]);
        start = break_at;
    }

    chunks
}
