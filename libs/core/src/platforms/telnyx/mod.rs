//! Telnyx messaging and TeXML voice provider.

pub mod api;
pub mod sender;

pub use api::{Endpoint, Endpoints, MessagePayload};
pub use sender::{SMS_MAX_CHARS, TelnyxSender, VOICE_CALLBACK_PATH, truncate_sms};
