//! Long-polling update loop.
//!
//! Polls `getUpdates` with exponential backoff on failure and distills raw
//! API messages into [`TgIncoming`] values for the bridge.

use super::types::{TgMessage, TgResponse, TgUpdate};
use super::TelegramApi;
use ponte_core::message::{TgIncoming, TgMediaKind, TgMediaRef};
use tokio::sync::mpsc;
use tracing::{error, info};

/// Start the long-polling loop. Returns a receiver of distilled updates;
/// the loop stops when the receiver is dropped.
pub fn start_updates(api: &TelegramApi) -> mpsc::Receiver<TgIncoming> {
    let (tx, rx) = mpsc::channel(64);
    let client = api.client.clone();
    let base_url = api.base_url.clone();
    let last_update_id = api.last_update_id.clone();

    info!("Telegram long polling starting...");

    tokio::spawn(async move {
        let mut backoff_secs: u64 = 1;

        loop {
            let last = last_update_id.lock().await;
            let offset = last.map(|id| id + 1);
            drop(last);

            let mut url = format!("{base_url}/getUpdates?timeout=30");
            if let Some(off) = offset {
                url.push_str(&format!("&offset={off}"));
            }

            let resp = match client
                .get(&url)
                .timeout(std::time::Duration::from_secs(35))
                .send()
                .await
            {
                Ok(r) => r,
                Err(e) => {
                    error!("telegram poll error (retry in {backoff_secs}s): {e}");
                    tokio::time::sleep(std::time::Duration::from_secs(backoff_secs)).await;
                    backoff_secs = (backoff_secs * 2).min(60);
                    continue;
                }
            };

            let body: TgResponse<Vec<TgUpdate>> = match resp.json().await {
                Ok(b) => b,
                Err(e) => {
                    error!("telegram parse error (retry in {backoff_secs}s): {e}");
                    tokio::time::sleep(std::time::Duration::from_secs(backoff_secs)).await;
                    backoff_secs = (backoff_secs * 2).min(60);
                    continue;
                }
            };

            if !body.ok {
                error!(
                    "telegram API error (retry in {backoff_secs}s): {}",
                    body.description.unwrap_or_default()
                );
                tokio::time::sleep(std::time::Duration::from_secs(backoff_secs)).await;
                backoff_secs = (backoff_secs * 2).min(60);
                continue;
            }

            // Successful poll — reset backoff.
            backoff_secs = 1;

            let updates = body.result.unwrap_or_default();

            if let Some(last_update) = updates.last() {
                *last_update_id.lock().await = Some(last_update.update_id);
            }

            for update in updates {
                let msg = match update.message {
                    Some(m) => m,
                    None => continue,
                };

                let incoming = match distill(msg) {
                    Some(i) => i,
                    None => continue,
                };

                if tx.send(incoming).await.is_err() {
                    info!("telegram update receiver dropped, stopping poll");
                    return;
                }
            }
        }
    });

    rx
}

/// Reduce a raw API message to the fields the bridge cares about.
/// Messages without a sender (channel posts, service messages) are dropped.
pub(crate) fn distill(msg: TgMessage) -> Option<TgIncoming> {
    let from = msg.from.as_ref()?;
    let media = media_ref(&msg);

    let reply_to_text = msg
        .reply_to_message
        .as_ref()
        .and_then(|r| r.text.clone().or_else(|| r.caption.clone()));

    Some(TgIncoming {
        message_id: msg.message_id,
        chat_id: msg.chat.id,
        is_private: msg.chat.chat_type == "private",
        sender_id: from.id.to_string(),
        text: msg.text,
        caption: msg.caption,
        reply_to_text,
        media,
    })
}

fn media_ref(msg: &TgMessage) -> Option<TgMediaRef> {
    if let Some(photos) = &msg.photo {
        // Telegram sends multiple sizes; the last is the largest.
        let largest = photos.last()?;
        return Some(TgMediaRef {
            kind: TgMediaKind::Photo,
            file_id: largest.file_id.clone(),
            mime_type: None,
            file_name: None,
        });
    }
    if let Some(video) = &msg.video {
        return Some(TgMediaRef {
            kind: TgMediaKind::Video,
            file_id: video.file_id.clone(),
            mime_type: video.mime_type.clone(),
            file_name: video.file_name.clone(),
        });
    }
    if let Some(document) = &msg.document {
        return Some(TgMediaRef {
            kind: TgMediaKind::Document,
            file_id: document.file_id.clone(),
            mime_type: document.mime_type.clone(),
            file_name: document.file_name.clone(),
        });
    }
    if let Some(audio) = &msg.audio {
        return Some(TgMediaRef {
            kind: TgMediaKind::Audio,
            file_id: audio.file_id.clone(),
            mime_type: audio.mime_type.clone(),
            file_name: audio.file_name.clone(),
        });
    }
    if let Some(voice) = &msg.voice {
        return Some(TgMediaRef {
            kind: TgMediaKind::Voice,
            file_id: voice.file_id.clone(),
            mime_type: voice.mime_type.clone(),
            file_name: None,
        });
    }
    None
}
