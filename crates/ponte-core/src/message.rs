use serde::{Deserialize, Serialize};

/// An inbound WhatsApp message, fully downloaded and ready to mirror.
///
/// Constructed by the WhatsApp transport from a wire event and consumed
/// synchronously by the bridge; nothing here is persisted.
#[derive(Debug, Clone)]
pub struct Inbound {
    /// Bare phone-like address of the sender (digits, no server suffix).
    pub from_address: String,
    /// Push name supplied by the transport, if any. Used to seed the
    /// contact directory on first sight.
    pub name_hint: Option<String>,
    /// Whether this is a status broadcast rather than a chat message.
    pub is_status: bool,
    /// Message text (or media caption).
    pub body: String,
    pub media: Option<MediaPayload>,
}

/// Raw media bytes plus the declared content type.
#[derive(Clone)]
pub struct MediaPayload {
    pub mimetype: String,
    pub data: Vec<u8>,
    pub filename: Option<String>,
}

impl std::fmt::Debug for MediaPayload {
    // Skip the payload bytes; logging megabytes of base64 helps nobody.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaPayload")
            .field("mimetype", &self.mimetype)
            .field("len", &self.data.len())
            .field("filename", &self.filename)
            .finish()
    }
}

/// Lifecycle and message events emitted by the WhatsApp transport.
#[derive(Debug)]
pub enum WaEvent {
    /// A login QR code payload was generated (session not yet paired).
    Qr(String),
    /// The transport is connected and ready.
    Ready,
    /// The connection dropped.
    Disconnected(String),
    /// The stored session was rejected or invalidated.
    AuthFailure(String),
    /// A message from somebody else.
    Message(Inbound),
    /// A message sent by the linked account itself (used for status mirroring).
    SelfMessage(Inbound),
}

/// A contact as reported by the WhatsApp transport roster.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaContact {
    pub address: String,
    pub name: Option<String>,
}

/// A distilled Telegram update, as handed to the bridge by the poller.
#[derive(Debug, Clone)]
pub struct TgIncoming {
    pub message_id: i64,
    pub chat_id: i64,
    /// True for one-on-one chats with the bot, false for groups.
    pub is_private: bool,
    /// Telegram user id of the sender, stringified.
    pub sender_id: String,
    pub text: Option<String>,
    pub caption: Option<String>,
    /// Text or caption of the quoted message, when this is a reply.
    pub reply_to_text: Option<String>,
    pub media: Option<TgMediaRef>,
}

impl TgIncoming {
    /// The text content of this update, preferring `text` over `caption`.
    pub fn text_or_caption(&self) -> Option<&str> {
        self.text.as_deref().or(self.caption.as_deref())
    }
}

/// Reference to a media object attached to a Telegram message.
///
/// Only the `file_id` is carried; bytes are fetched on demand via `getFile`.
#[derive(Debug, Clone)]
pub struct TgMediaRef {
    pub kind: TgMediaKind,
    pub file_id: String,
    pub mime_type: Option<String>,
    pub file_name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TgMediaKind {
    Photo,
    Video,
    Document,
    Audio,
    Voice,
}
