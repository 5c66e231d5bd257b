//! Inbound message rendering and reply correlation.
//!
//! The rendered header is the only thing carrying the sender's address
//! forward: a Telegram reply quotes it, and [`extract_address`] re-parses
//! it to recover the destination. The label tokens are therefore a wire
//! contract — change them and every pending conversation goes deaf.

use ponte_core::message::{Inbound, MediaPayload};

/// Footer inviting the operator to reply in-thread.
pub const REPLY_HINT: &str = "\n\n_Reply to this message to respond_";

/// Which forum topic a mirrored message lands in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topic {
    Primary,
    Status,
}

pub fn topic_for(inbound: &Inbound) -> Topic {
    if inbound.is_status {
        Topic::Status
    } else {
        Topic::Primary
    }
}

/// Render the header for a mirrored chat message.
///
/// `Phone:` is the label [`extract_address`] scans for.
pub fn render_header(name: &str, address: &str) -> String {
    format!("*From:* {name}\n*Phone:* {address}\n\n")
}

/// Header for a mirrored self-status update. Carries no address on
/// purpose — there is nobody to reply to.
pub fn render_status_header() -> String {
    "*Status update*\n*From:* You\n\n".to_string()
}

/// Recover the source address from quoted reply text.
///
/// Scans for the `Phone:` label and returns the first run of decimal
/// digits after it. Telegram strips Markdown markers from quoted text,
/// so the scan must not depend on them.
pub fn extract_address(text: &str) -> Option<String> {
    let idx = text.find("Phone:")?;
    let rest = &text[idx + "Phone:".len()..];

    let digits: String = rest
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();

    if digits.is_empty() {
        None
    } else {
        Some(digits)
    }
}

/// Media classes, each mapping to its own Telegram send operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaClass {
    Photo,
    Video,
    Audio,
    Document,
    /// Sticker-class image media is intentionally dropped.
    Sticker,
}

pub fn classify_media(mimetype: &str) -> MediaClass {
    if mimetype == "image/webp" {
        return MediaClass::Sticker;
    }
    match mimetype.split('/').next().unwrap_or_default() {
        "image" => MediaClass::Photo,
        "video" => MediaClass::Video,
        "audio" => MediaClass::Audio,
        _ => MediaClass::Document,
    }
}

/// Filename for a media upload: the declared name when present, otherwise
/// synthesized from the content subtype.
pub fn media_filename(media: &MediaPayload) -> String {
    if let Some(ref name) = media.filename {
        return name.clone();
    }
    let subtype = media.mimetype.split('/').nth(1).unwrap_or("unknown");
    format!("file.{subtype}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inbound(is_status: bool) -> Inbound {
        Inbound {
            from_address: "6281234567".into(),
            name_hint: None,
            is_status,
            body: "Hello".into(),
            media: None,
        }
    }

    #[test]
    fn test_header_contains_name_and_address() {
        let header = render_header("Alice", "6281234567");
        assert!(header.contains("Alice"));
        assert!(header.contains("6281234567"));
        assert!(header.ends_with("\n\n"));
    }

    #[test]
    fn test_header_round_trip() {
        // extract_address(render_header(..)) must recover the address exactly.
        for address in ["6281234567", "14155550100", "491701234567"] {
            let header = render_header("Unknown", address);
            assert_eq!(extract_address(&header).as_deref(), Some(address));
        }
    }

    #[test]
    fn test_extract_address_survives_markdown_stripping() {
        // Telegram strips the asterisks when quoting.
        let quoted = "From: Alice\nPhone: 6281234567\n\nHello there";
        assert_eq!(extract_address(quoted).as_deref(), Some("6281234567"));
    }

    #[test]
    fn test_extract_address_missing_label() {
        assert_eq!(extract_address("just some text 123"), None);
        assert_eq!(extract_address(""), None);
    }

    #[test]
    fn test_extract_address_label_without_digits() {
        assert_eq!(extract_address("Phone: unavailable"), None);
    }

    #[test]
    fn test_status_header_has_no_address() {
        assert_eq!(extract_address(&render_status_header()), None);
    }

    #[test]
    fn test_topic_routing() {
        assert_eq!(topic_for(&inbound(true)), Topic::Status);
        assert_eq!(topic_for(&inbound(false)), Topic::Primary);
    }

    #[test]
    fn test_classify_media() {
        assert_eq!(classify_media("image/jpeg"), MediaClass::Photo);
        assert_eq!(classify_media("image/png"), MediaClass::Photo);
        assert_eq!(classify_media("video/mp4"), MediaClass::Video);
        assert_eq!(classify_media("audio/ogg"), MediaClass::Audio);
        assert_eq!(classify_media("application/pdf"), MediaClass::Document);
        assert_eq!(classify_media("application/zip"), MediaClass::Document);
    }

    #[test]
    fn test_sticker_class_is_distinct() {
        // image/webp is the reserved sticker subtype, not a photo.
        assert_eq!(classify_media("image/webp"), MediaClass::Sticker);
    }

    #[test]
    fn test_media_filename_prefers_declared_name() {
        let media = MediaPayload {
            mimetype: "application/pdf".into(),
            data: vec![],
            filename: Some("invoice.pdf".into()),
        };
        assert_eq!(media_filename(&media), "invoice.pdf");
    }

    #[test]
    fn test_media_filename_synthesized_from_subtype() {
        let media = MediaPayload {
            mimetype: "application/zip".into(),
            data: vec![],
            filename: None,
        };
        assert_eq!(media_filename(&media), "file.zip");
    }
}
