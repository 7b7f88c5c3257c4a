//! Provider status strings to internal delivery states.

use crate::types::DeliveryState;

/// Maps a Telnyx message status onto a [`DeliveryState`].
///
/// Total: statuses this adapter does not know about map to `Sent` so an
/// unexpected value never fails a callback.
///
/// ```
/// use tnx_core::{DeliveryState, map_status};
///
/// assert_eq!(map_status("queued"), DeliveryState::Sending);
/// assert_eq!(map_status("delivered"), DeliveryState::Delivered);
/// assert_eq!(map_status("something-new"), DeliveryState::Sent);
/// ```
pub fn map_status(status: &str) -> DeliveryState {
    match status.trim().to_ascii_lowercase().as_str() {
        "queued" | "sending" => DeliveryState::Sending,
        "sent" => DeliveryState::Sent,
        "delivered" => DeliveryState::Delivered,
        "failed" | "undelivered" | "delivery_failed" | "sending_failed" => {
            DeliveryState::FailedPermanent
        }
        _ => DeliveryState::Sent,
    }
}

/// Maps a TeXML `CallStatus` onto a [`DeliveryState`]; `None` for statuses
/// that should not produce a status update.
pub fn map_call_status(status: &str) -> Option<DeliveryState> {
    let state = match status.trim().to_ascii_lowercase().as_str() {
        "queued" | "initiated" | "ringing" => DeliveryState::Sending,
        "in-progress" | "answered" => DeliveryState::Sent,
        "completed" => DeliveryState::Delivered,
        "busy" | "no-answer" => DeliveryState::FailedTransient,
        "failed" | "canceled" => DeliveryState::FailedPermanent,
        _ => return None,
    };
    Some(state)
}

/// Whether the call has ended and no further markup will be spoken.
pub fn is_terminal_call_status(status: &str) -> bool {
    matches!(
        status.trim().to_ascii_lowercase().as_str(),
        "completed" | "busy" | "no-answer" | "failed" | "canceled"
    )
}
