//! Telegram Bot API client.
//!
//! Long polling via `getUpdates`, plain `sendMessage` plus multipart media
//! uploads for everything else. Docs: <https://core.telegram.org/bots/api>

mod polling;
pub(crate) mod types;

#[cfg(test)]
mod tests;

pub use polling::start_updates;
pub use types::{TgChatMember, TgMemberUser};

use ponte_core::error::PonteError;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;
use types::{TgFile, TgResponse, TgSentMessage};

/// Outbound media class, each mapping to its own Bot API method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendMediaKind {
    Photo,
    Video,
    Audio,
    Document,
}

impl SendMediaKind {
    fn method(&self) -> &'static str {
        match self {
            SendMediaKind::Photo => "sendPhoto",
            SendMediaKind::Video => "sendVideo",
            SendMediaKind::Audio => "sendAudio",
            SendMediaKind::Document => "sendDocument",
        }
    }

    /// Name of the multipart field carrying the payload.
    fn field(&self) -> &'static str {
        match self {
            SendMediaKind::Photo => "photo",
            SendMediaKind::Video => "video",
            SendMediaKind::Audio => "audio",
            SendMediaKind::Document => "document",
        }
    }
}

/// Telegram Bot API client used by the bridge.
pub struct TelegramApi {
    pub(crate) client: reqwest::Client,
    pub(crate) base_url: String,
    pub(crate) bot_token: String,
    /// Tracks the last update_id to avoid reprocessing.
    pub(crate) last_update_id: Arc<Mutex<Option<i64>>>,
}

impl TelegramApi {
    pub fn new(bot_token: &str) -> Self {
        let base_url = format!("https://api.telegram.org/bot{bot_token}");
        Self {
            client: reqwest::Client::new(),
            base_url,
            bot_token: bot_token.to_string(),
            last_update_id: Arc::new(Mutex::new(None)),
        }
    }

    /// Send a text message, chunked to Telegram's length limit.
    ///
    /// Sent as Markdown; if Telegram rejects the entities the chunk is
    /// retried as plain text. Returns the id of the last message sent,
    /// which is what a later `delete_message` wants.
    pub async fn send_text(
        &self,
        chat_id: i64,
        text: &str,
        topic: Option<i64>,
        reply_to: Option<i64>,
    ) -> Result<i64, PonteError> {
        let chunks = split_message(text, 4096);
        let mut last_id = 0;

        for chunk in chunks {
            let mut body = json!({
                "chat_id": chat_id,
                "text": chunk,
                "parse_mode": "Markdown",
            });
            if let Some(thread) = topic {
                body["message_thread_id"] = json!(thread);
            }
            if let Some(reply) = reply_to {
                body["reply_to_message_id"] = json!(reply);
            }

            let url = format!("{}/sendMessage", self.base_url);
            let resp = self
                .client
                .post(&url)
                .json(&body)
                .send()
                .await
                .map_err(|e| PonteError::Telegram(format!("sendMessage failed: {e}")))?;

            let parsed: TgResponse<TgSentMessage> = resp
                .json()
                .await
                .map_err(|e| PonteError::Telegram(format!("sendMessage parse failed: {e}")))?;

            if parsed.ok {
                last_id = parsed.result.map(|m| m.message_id).unwrap_or_default();
                continue;
            }

            let description = parsed.description.unwrap_or_default();
            if !description.contains("can't parse entities") {
                return Err(PonteError::Telegram(format!(
                    "sendMessage rejected: {description}"
                )));
            }

            // Markdown entities broke — retry the chunk as plain text.
            debug!("Markdown parse failed, retrying as plain text");
            if let Some(obj) = body.as_object_mut() {
                obj.remove("parse_mode");
            }
            let retry: TgResponse<TgSentMessage> = self
                .client
                .post(&url)
                .json(&body)
                .send()
                .await
                .map_err(|e| PonteError::Telegram(format!("sendMessage (plain) failed: {e}")))?
                .json()
                .await
                .map_err(|e| PonteError::Telegram(format!("sendMessage (plain) parse: {e}")))?;

            if !retry.ok {
                return Err(PonteError::Telegram(format!(
                    "sendMessage rejected: {}",
                    retry.description.unwrap_or_default()
                )));
            }
            last_id = retry.result.map(|m| m.message_id).unwrap_or_default();
        }

        Ok(last_id)
    }

    /// Upload media bytes with the method matching its class.
    #[allow(clippy::too_many_arguments)]
    pub async fn send_media(
        &self,
        chat_id: i64,
        kind: SendMediaKind,
        data: &[u8],
        filename: &str,
        mimetype: &str,
        caption: Option<&str>,
        topic: Option<i64>,
        reply_to: Option<i64>,
    ) -> Result<i64, PonteError> {
        let part = reqwest::multipart::Part::bytes(data.to_vec())
            .file_name(filename.to_string())
            .mime_str(mimetype)
            .map_err(|e| PonteError::Telegram(format!("mime error: {e}")))?;

        let mut form = reqwest::multipart::Form::new()
            .text("chat_id", chat_id.to_string())
            .part(kind.field(), part);

        if let Some(caption) = caption {
            form = form
                .text("caption", caption.to_string())
                .text("parse_mode", "Markdown");
        }
        if let Some(thread) = topic {
            form = form.text("message_thread_id", thread.to_string());
        }
        if let Some(reply) = reply_to {
            form = form.text("reply_to_message_id", reply.to_string());
        }

        let url = format!("{}/{}", self.base_url, kind.method());
        let resp = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| PonteError::Telegram(format!("{} failed: {e}", kind.method())))?;

        let parsed: TgResponse<TgSentMessage> = resp
            .json()
            .await
            .map_err(|e| PonteError::Telegram(format!("{} parse failed: {e}", kind.method())))?;

        if !parsed.ok {
            return Err(PonteError::Telegram(format!(
                "{} rejected: {}",
                kind.method(),
                parsed.description.unwrap_or_default()
            )));
        }

        Ok(parsed.result.map(|m| m.message_id).unwrap_or_default())
    }

    /// Delete a previously sent message.
    pub async fn delete_message(&self, chat_id: i64, message_id: i64) -> Result<(), PonteError> {
        let url = format!("{}/deleteMessage", self.base_url);
        let body = json!({ "chat_id": chat_id, "message_id": message_id });

        let parsed: TgResponse<bool> = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| PonteError::Telegram(format!("deleteMessage failed: {e}")))?
            .json()
            .await
            .map_err(|e| PonteError::Telegram(format!("deleteMessage parse failed: {e}")))?;

        if !parsed.ok {
            return Err(PonteError::Telegram(format!(
                "deleteMessage rejected: {}",
                parsed.description.unwrap_or_default()
            )));
        }
        Ok(())
    }

    /// Fetch the administrators of a chat. Bots cannot enumerate ordinary
    /// members, so this is the closest thing to a member list.
    pub async fn get_chat_administrators(
        &self,
        chat_id: i64,
    ) -> Result<Vec<TgChatMember>, PonteError> {
        let url = format!(
            "{}/getChatAdministrators?chat_id={chat_id}",
            self.base_url
        );

        let parsed: TgResponse<Vec<TgChatMember>> = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| PonteError::Telegram(format!("getChatAdministrators failed: {e}")))?
            .json()
            .await
            .map_err(|e| PonteError::Telegram(format!("getChatAdministrators parse: {e}")))?;

        if !parsed.ok {
            return Err(PonteError::Telegram(format!(
                "getChatAdministrators rejected: {}",
                parsed.description.unwrap_or_default()
            )));
        }

        Ok(parsed.result.unwrap_or_default())
    }

    /// Download a file from Telegram servers by file_id.
    pub async fn download_file(&self, file_id: &str) -> Result<Vec<u8>, PonteError> {
        // Step 1: getFile to obtain file_path.
        let url = format!("{}/getFile?file_id={file_id}", self.base_url);
        let resp: TgResponse<TgFile> = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| PonteError::Telegram(format!("getFile failed: {e}")))?
            .json()
            .await
            .map_err(|e| PonteError::Telegram(format!("getFile parse failed: {e}")))?;

        let file_path = resp
            .result
            .and_then(|f| f.file_path)
            .ok_or_else(|| PonteError::Telegram("getFile returned no file_path".into()))?;

        // Step 2: fetch the actual bytes.
        let download_url = format!(
            "https://api.telegram.org/file/bot{}/{file_path}",
            self.bot_token
        );
        let bytes = self
            .client
            .get(&download_url)
            .send()
            .await
            .map_err(|e| PonteError::Telegram(format!("file download failed: {e}")))?
            .bytes()
            .await
            .map_err(|e| PonteError::Telegram(format!("file read failed: {e}")))?;

        Ok(bytes.to_vec())
    }
}

/// Split a long message into chunks that respect Telegram's limit.
pub fn split_message(text: &str, max_len: usize) -> Vec<&str> {
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
