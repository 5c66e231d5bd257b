use super::qr::generate_qr_image;
use super::send::{split_message, RETRY_DELAYS_MS};
use super::WhatsAppChannel;
use wacore_binary::jid::Jid;

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
fn test_address_jid_personal_server() {
    let jid: Jid = WhatsAppChannel::address_jid("6281234567").unwrap();
    assert_eq!(jid.to_string(), "6281234567@s.whatsapp.net");
}

#[test]
fn test_generate_qr_image() {
    let result = generate_qr_image("test-data");
    assert!(result.is_ok());
    let png = result.unwrap();
    // PNG magic bytes.
    assert_eq!(&png[..4], &[0x89, 0x50, 0x4E, 0x47]);
}

#[test]
fn test_retry_delays_exponential() {
    assert_eq!(RETRY_DELAYS_MS.len(), 3, "should have 3 retry attempts");
    assert_eq!(RETRY_DELAYS_MS[0], 500, "first delay 500ms");
    // Each delay is 2x the previous.
    assert_eq!(RETRY_DELAYS_MS[1], RETRY_DELAYS_MS[0] * 2);
    assert_eq!(RETRY_DELAYS_MS[2], RETRY_DELAYS_MS[1] * 2);
}
