use async_trait::async_trait;

use crate::error::DispatchError;
use crate::types::{CarrierInfo, DispatchResult, MessageKind, Notification};

/// Outbound dispatch contract. One provider request per call, no retries.
#[async_trait]
pub trait EgressSender: Send + Sync {
    /// Sends a notification over the given channel.
    async fn send(
        &self,
        destination: &str,
        kind: MessageKind,
        notification: &Notification,
    ) -> Result<DispatchResult, DispatchError>;

    /// Sends free text as an SMS, used for reply confirmations.
    async fn send_text(&self, destination: &str, body: &str)
    -> Result<DispatchResult, DispatchError>;
}

/// Resolves the carrier serving a phone number.
#[async_trait]
pub trait CarrierLookup: Send + Sync {
    async fn lookup_carrier(&self, number: &str) -> Result<CarrierInfo, DispatchError>;
}
