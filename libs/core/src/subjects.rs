//! NATS subject helpers shared by the ingress and egress services.

use std::borrow::Cow;

use crate::types::{ActionKind, DeliveryState, MessageKind};

/// Request/reply subject answered by the host's alert store.
pub const ALERT_LOOKUP_SUBJECT: &str = "telnyx.lookup.alert";
/// Request/reply subject answered by the egress worker with carrier details.
pub const CARRIER_LOOKUP_SUBJECT: &str = "telnyx.lookup.carrier";
/// Dispatch outcomes published by the egress worker.
pub const SENT_SUBJECT: &str = "telnyx.sent";
/// Wildcard the egress worker subscribes to.
pub const OUT_WILDCARD: &str = "telnyx.out.>";

/// Normalizes identifiers to be subject-safe (replace spaces, trim).
fn norm<S: AsRef<str>>(s: S) -> Cow<'static, str> {
    let mut t = s
        .as_ref()
        .trim()
        .replace([' ', '\t', '\n', '\r', '*', '>', '/', '.'], "-");
    if t.is_empty() {
        t = "unknown".into();
    }
    Cow::Owned(t)
}

/// Lifecycle actions signalled from webhooks.
///
/// ```
/// use tnx_core::{ActionKind, action_subject};
///
/// assert_eq!(action_subject(ActionKind::Close), "telnyx.action.close");
/// ```
pub fn action_subject(kind: ActionKind) -> String {
    format!("telnyx.action.{}", kind.as_str())
}

/// Delivery-status updates.
///
/// ```
/// use tnx_core::{DeliveryState, status_subject};
///
/// assert_eq!(status_subject(DeliveryState::Delivered), "telnyx.status.delivered");
/// ```
pub fn status_subject(state: DeliveryState) -> String {
    format!("telnyx.status.{}", state.as_str())
}

/// Outbound notifications for the egress worker, keyed by channel and
/// destination.
///
/// ```
/// use tnx_core::{MessageKind, out_subject};
///
/// assert_eq!(
///     out_subject(MessageKind::Sms, "+1 555.0001"),
///     "telnyx.out.sms.+1-555-0001"
/// );
/// ```
pub fn out_subject(kind: MessageKind, destination: &str) -> String {
    format!("telnyx.out.{}.{}", kind.as_str(), norm(destination))
}
