//! # ponte-channels
//!
//! Transport bindings for the Ponte bridge: the Telegram Bot API client
//! and the WhatsApp Web protocol channel.

pub mod telegram;
pub mod whatsapp;
pub mod whatsapp_session;
