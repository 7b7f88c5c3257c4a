use serde::{Deserialize, Serialize};

/// Delivery state of a single outbound message or call.
///
/// ```
/// use tnx_core::DeliveryState;
///
/// assert_eq!(DeliveryState::FailedPermanent.as_str(), "failed_permanent");
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryState {
    Sending,
    Sent,
    Delivered,
    FailedTransient,
    FailedPermanent,
}

impl DeliveryState {
    /// Returns the identifier used in NATS subjects and metric labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryState::Sending => "sending",
            DeliveryState::Sent => "sent",
            DeliveryState::Delivered => "delivered",
            DeliveryState::FailedTransient => "failed_transient",
            DeliveryState::FailedPermanent => "failed_permanent",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Sms,
    Voice,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Sms => "sms",
            MessageKind::Voice => "voice",
        }
    }
}

/// What the provider is asked to deliver: a text body or a call whose
/// instructions are fetched from a callback URL.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundContent {
    Body { text: String },
    CallbackTarget { url: String },
}

/// A single send, built per dispatch and never persisted here.
///
/// ```
/// use tnx_core::{MessageKind, OutboundRequest};
///
/// let req = OutboundRequest::sms("+15550000001", "+15550009999", "hello");
/// assert_eq!(req.kind, MessageKind::Sms);
/// assert_eq!(req.body(), Some("hello"));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OutboundRequest {
    pub destination: String,
    pub origin: String,
    pub kind: MessageKind,
    pub content: OutboundContent,
}

impl OutboundRequest {
    pub fn sms(
        destination: impl Into<String>,
        origin: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            destination: destination.into(),
            origin: origin.into(),
            kind: MessageKind::Sms,
            content: OutboundContent::Body { text: text.into() },
        }
    }

    pub fn voice(
        destination: impl Into<String>,
        origin: impl Into<String>,
        callback_url: impl Into<String>,
    ) -> Self {
        Self {
            destination: destination.into(),
            origin: origin.into(),
            kind: MessageKind::Voice,
            content: OutboundContent::CallbackTarget {
                url: callback_url.into(),
            },
        }
    }

    pub fn body(&self) -> Option<&str> {
        match &self.content {
            OutboundContent::Body { text } => Some(text),
            OutboundContent::CallbackTarget { .. } => None,
        }
    }

    pub fn callback_url(&self) -> Option<&str> {
        match &self.content {
            OutboundContent::CallbackTarget { url } => Some(url),
            OutboundContent::Body { .. } => None,
        }
    }
}

/// Synchronous result of a dispatch. `external_id` is the correlation key for
/// every later webhook about the same message or call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DispatchResult {
    pub external_id: String,
    pub state: DeliveryState,
    pub source: String,
}

/// The closed set of notifications the alerting system hands to this adapter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    Test,
    Alert {
        alert_id: i64,
        summary: String,
        #[serde(default)]
        details: String,
    },
    Verification {
        code: String,
    },
}

impl Notification {
    pub fn kind_label(&self) -> &'static str {
        match self {
            Notification::Test => "test",
            Notification::Alert { .. } => "alert",
            Notification::Verification { .. } => "verification",
        }
    }
}

/// Alert data supplied by the upstream alert store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Alert {
    pub id: i64,
    pub summary: String,
    #[serde(default)]
    pub details: String,
}

/// Carrier behind a phone number, from the Telnyx number lookup.
/// `line_type` is the provider's `type` field (`mobile`, `landline`, `voip`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct CarrierInfo {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub line_type: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Acknowledge,
    Close,
    Unsubscribe,
    Resubscribe,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Acknowledge => "acknowledge",
            ActionKind::Close => "close",
            ActionKind::Unsubscribe => "unsubscribe",
            ActionKind::Resubscribe => "resubscribe",
        }
    }
}

/// Which inbound channel an action arrived on.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "channel", rename_all = "snake_case")]
pub enum ActionSource {
    Voice { call_sid: String },
    Sms { message_id: String },
}

/// A lifecycle intent signalled upward. `alert_id` is absent when an SMS reply
/// carried no reference; the host correlates those by phone number.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AlertAction {
    pub kind: ActionKind,
    pub alert_id: Option<i64>,
    pub phone_number: String,
    pub source: ActionSource,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusUpdate {
    pub external_id: String,
    pub state: DeliveryState,
    pub destination: Option<String>,
    pub provider_status: String,
}
