use super::polling::distill;
use super::split_message;
use super::types::{TgChat, TgChatMember, TgMessage};
use ponte_core::message::TgMediaKind;

#[test]
fn test_split_short_message() {
    let chunks = split_message("hello", 4096);
    assert_eq!(chunks, vec!["hello"]);
}

#[test]
fn test_split_long_message() {
    let text = "a\n".repeat(3000);
    let chunks = split_message(&text, 4096);
    assert!(chunks.len() >= 2);
    for chunk in &chunks {
        assert!(chunk.len() <= 4096);
    }
}

#[test]
fn test_split_preserves_order_and_content() {
    let text = "line one\n".repeat(1000);
    let chunks = split_message(&text, 4096);
    assert_eq!(chunks.concat(), text);
}

#[test]
fn test_tg_chat_private_detection() {
    let group: TgChat = serde_json::from_str(r#"{"id": -100123, "type": "supergroup"}"#).unwrap();
    assert_eq!(group.chat_type, "supergroup");

    let private: TgChat = serde_json::from_str(r#"{"id": 789, "type": "private"}"#).unwrap();
    assert_eq!(private.chat_type, "private");

    // Missing type should not look private.
    let bare: TgChat = serde_json::from_str(r#"{"id": 123}"#).unwrap();
    assert_eq!(bare.chat_type, "");
}

#[test]
fn test_distill_text_message() {
    let json = r#"{
        "message_id": 7,
        "from": {"id": 42, "first_name": "Ada"},
        "chat": {"id": -100123, "type": "supergroup"},
        "text": "hello"
    }"#;
    let msg: TgMessage = serde_json::from_str(json).unwrap();
    let incoming = distill(msg).unwrap();

    assert_eq!(incoming.message_id, 7);
    assert_eq!(incoming.chat_id, -100123);
    assert!(!incoming.is_private);
    assert_eq!(incoming.sender_id, "42");
    assert_eq!(incoming.text.as_deref(), Some("hello"));
    assert!(incoming.media.is_none());
    assert!(incoming.reply_to_text.is_none());
}

#[test]
fn test_distill_drops_senderless_message() {
    let json = r#"{
        "message_id": 8,
        "chat": {"id": 1, "type": "private"},
        "text": "channel post"
    }"#;
    let msg: TgMessage = serde_json::from_str(json).unwrap();
    assert!(distill(msg).is_none());
}

#[test]
fn test_distill_reply_carries_quoted_text() {
    let json = r#"{
        "message_id": 9,
        "from": {"id": 42, "first_name": "Ada"},
        "chat": {"id": -100123, "type": "supergroup"},
        "text": "Hi there",
        "reply_to_message": {
            "message_id": 5,
            "chat": {"id": -100123, "type": "supergroup"},
            "text": "From: Unknown\nPhone: 6281234567\n\nHello"
        }
    }"#;
    let msg: TgMessage = serde_json::from_str(json).unwrap();
    let incoming = distill(msg).unwrap();
    assert!(incoming
        .reply_to_text
        .as_deref()
        .unwrap()
        .contains("6281234567"));
}

#[test]
fn test_distill_reply_falls_back_to_caption() {
    let json = r#"{
        "message_id": 10,
        "from": {"id": 42, "first_name": "Ada"},
        "chat": {"id": -100123, "type": "supergroup"},
        "text": "nice photo",
        "reply_to_message": {
            "message_id": 6,
            "chat": {"id": -100123, "type": "supergroup"},
            "caption": "Phone: 628555"
        }
    }"#;
    let msg: TgMessage = serde_json::from_str(json).unwrap();
    let incoming = distill(msg).unwrap();
    assert_eq!(incoming.reply_to_text.as_deref(), Some("Phone: 628555"));
}

#[test]
fn test_distill_photo_picks_largest_size() {
    let json = r#"{
        "message_id": 11,
        "from": {"id": 42, "first_name": "Ada"},
        "chat": {"id": 1, "type": "private"},
        "photo": [
            {"file_id": "small", "width": 90, "height": 90},
            {"file_id": "large", "width": 800, "height": 800}
        ],
        "caption": "look"
    }"#;
    let msg: TgMessage = serde_json::from_str(json).unwrap();
    let incoming = distill(msg).unwrap();
    let media = incoming.media.unwrap();
    assert_eq!(media.kind, TgMediaKind::Photo);
    assert_eq!(media.file_id, "large");
    assert_eq!(incoming.caption.as_deref(), Some("look"));
}

#[test]
fn test_distill_document_keeps_mime_and_name() {
    let json = r#"{
        "message_id": 12,
        "from": {"id": 42, "first_name": "Ada"},
        "chat": {"id": 1, "type": "private"},
        "document": {
            "file_id": "doc1",
            "mime_type": "application/pdf",
            "file_name": "invoice.pdf"
        }
    }"#;
    let msg: TgMessage = serde_json::from_str(json).unwrap();
    let media = distill(msg).unwrap().media.unwrap();
    assert_eq!(media.kind, TgMediaKind::Document);
    assert_eq!(media.mime_type.as_deref(), Some("application/pdf"));
    assert_eq!(media.file_name.as_deref(), Some("invoice.pdf"));
}

#[test]
fn test_distill_voice_message() {
    let json = r#"{
        "message_id": 13,
        "from": {"id": 42, "first_name": "Ada"},
        "chat": {"id": 1, "type": "private"},
        "voice": {"file_id": "v1", "duration": 3, "mime_type": "audio/ogg"}
    }"#;
    let msg: TgMessage = serde_json::from_str(json).unwrap();
    let media = distill(msg).unwrap().media.unwrap();
    assert_eq!(media.kind, TgMediaKind::Voice);
    assert_eq!(media.mime_type.as_deref(), Some("audio/ogg"));
}

#[test]
fn test_chat_member_creator_flag() {
    let json = r#"[
        {"user": {"id": 1, "first_name": "Owner"}, "status": "creator"},
        {"user": {"id": 2, "first_name": "Mod", "last_name": "Two"}, "status": "administrator"}
    ]"#;
    let members: Vec<TgChatMember> = serde_json::from_str(json).unwrap();
    assert_eq!(members.len(), 2);
    assert_eq!(members[0].status, "creator");
    assert_eq!(members[1].user.last_name.as_deref(), Some("Two"));
}
