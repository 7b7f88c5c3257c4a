//! Egress worker: turns `telnyx.out.*` notifications into provider requests
//! and reports each outcome on `telnyx.sent`. It also answers carrier lookups
//! on `telnyx.lookup.carrier`.
//!
//! One provider request per notification. Failed sends are reported with a
//! `retryable` hint and never retried here.

use anyhow::Result;
use async_nats::Client as Nats;
use futures::{StreamExt, stream};
use serde::{Deserialize, Serialize};
use tnx_core::{
    CARRIER_LOOKUP_SUBJECT, CarrierInfo, CarrierLookup, DispatchError, DispatchResult,
    EgressSender, MessageKind, Notification, OUT_WILDCARD, SENT_SUBJECT,
};
use tracing::{info, warn};

/// Payload published on `telnyx.out.<kind>.<destination>`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OutboundNotification {
    pub destination: String,
    pub kind: MessageKind,
    pub notification: Notification,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DispatchFailure {
    pub message: String,
    pub retryable: bool,
}

impl From<&DispatchError> for DispatchFailure {
    fn from(err: &DispatchError) -> Self {
        Self {
            message: err.to_string(),
            retryable: err.is_retryable(),
        }
    }
}

/// Published on `telnyx.sent` for every processed notification.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DispatchOutcome {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub destination: String,
    pub kind: MessageKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<DispatchResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<DispatchFailure>,
}

/// Sends one notification and describes what happened.
pub async fn dispatch(sender: &dyn EgressSender, out: &OutboundNotification) -> DispatchOutcome {
    let mut outcome = DispatchOutcome {
        request_id: out.request_id.clone(),
        destination: out.destination.clone(),
        kind: out.kind,
        result: None,
        error: None,
    };
    match sender
        .send(&out.destination, out.kind, &out.notification)
        .await
    {
        Ok(result) => {
            info!(
                kind = out.kind.as_str(),
                notification = out.notification.kind_label(),
                external_id = %result.external_id,
                state = result.state.as_str(),
                "notification dispatched"
            );
            outcome.result = Some(result);
        }
        Err(err) => {
            warn!(
                kind = out.kind.as_str(),
                notification = out.notification.kind_label(),
                error_kind = err.kind(),
                retryable = err.is_retryable(),
                "dispatch failed: {err}"
            );
            outcome.error = Some(DispatchFailure::from(&err));
        }
    }
    outcome
}

/// Decodes and dispatches one bus payload. `None` for malformed payloads,
/// which are logged and skipped.
pub async fn process(sender: &dyn EgressSender, payload: &[u8]) -> Option<DispatchOutcome> {
    match serde_json::from_slice::<OutboundNotification>(payload) {
        Ok(out) => Some(dispatch(sender, &out).await),
        Err(err) => {
            warn!("bad outbound notification: {err}");
            None
        }
    }
}

/// Request body on `telnyx.lookup.carrier`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CarrierQuery {
    pub number: String,
}

/// Reply to a carrier lookup: `carrier` on success, `error` otherwise.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CarrierReply {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub carrier: Option<CarrierInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<DispatchFailure>,
}

/// Answers one carrier lookup request. Malformed requests get a
/// non-retryable error reply.
pub async fn answer_carrier_query(lookup: &dyn CarrierLookup, payload: &[u8]) -> CarrierReply {
    let query = match serde_json::from_slice::<CarrierQuery>(payload) {
        Ok(query) => query,
        Err(err) => {
            warn!("bad carrier lookup request: {err}");
            return CarrierReply {
                carrier: None,
                error: Some(DispatchFailure {
                    message: format!("bad carrier lookup request: {err}"),
                    retryable: false,
                }),
            };
        }
    };
    match lookup.lookup_carrier(&query.number).await {
        Ok(carrier) => CarrierReply {
            carrier: Some(carrier),
            error: None,
        },
        Err(err) => {
            warn!(error_kind = err.kind(), "carrier lookup failed: {err}");
            CarrierReply {
                carrier: None,
                error: Some(DispatchFailure::from(&err)),
            }
        }
    }
}

enum Inbound {
    Notification(async_nats::Message),
    CarrierQuery(async_nats::Message),
}

pub async fn run<S>(nats: Nats, sender: &S) -> Result<()>
where
    S: EgressSender + CarrierLookup,
{
    let outbound = nats.subscribe(OUT_WILDCARD).await?;
    let lookups = nats.subscribe(CARRIER_LOOKUP_SUBJECT).await?;
    info!("egress-telnyx subscribed to {OUT_WILDCARD} and {CARRIER_LOOKUP_SUBJECT}");

    let mut inbound = stream::select(
        outbound.map(Inbound::Notification),
        lookups.map(Inbound::CarrierQuery),
    );
    while let Some(next) = inbound.next().await {
        match next {
            Inbound::Notification(msg) => {
                let Some(outcome) = process(sender, &msg.payload).await else {
                    continue;
                };
                publish_json(&nats, SENT_SUBJECT.to_string(), &outcome).await;
            }
            Inbound::CarrierQuery(msg) => {
                let Some(reply_to) = msg.reply.clone() else {
                    warn!("carrier lookup without a reply subject dropped");
                    continue;
                };
                let reply = answer_carrier_query(sender, &msg.payload).await;
                publish_json(&nats, reply_to.to_string(), &reply).await;
            }
        }
    }

    Ok(())
}

async fn publish_json<T: Serialize>(nats: &Nats, subject: String, value: &T) {
    match serde_json::to_vec(value) {
        Ok(bytes) => {
            if let Err(err) = nats.publish(subject, bytes.into()).await {
                warn!("failed to publish to bus: {err}");
            }
        }
        Err(err) => warn!("failed to encode bus message: {err}"),
    }
}
