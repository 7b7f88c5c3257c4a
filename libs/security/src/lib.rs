//! Inbound trust boundary for Telnyx webhooks: Ed25519 signature checks and
//! the axum layer that enforces them ahead of any routing.

pub mod middleware;
pub mod signature;

pub use middleware::{MAX_BODY_BYTES, SharedVerifier, require_signature};
pub use signature::{SignatureVerifier, verify};
