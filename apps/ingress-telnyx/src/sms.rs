//! Messaging webhooks: inbound replies and delivery-status events.

use axum::{Extension, body::Bytes, extract::State, response::Response};
use metrics::counter;
use serde::Deserialize;
use tnx_core::platforms::telnyx::MessagePayload;
use tnx_core::{ActionSource, AlertAction, StatusUpdate, map_status, parse_reply};
use tnx_telemetry::names::{SINK_FAILURES_TOTAL, WEBHOOK_ACCEPTED_TOTAL};
use tnx_telemetry::with_webhook_fields;
use tracing::{Instrument, debug, info, warn};

use crate::{AppState, RequestId, respond};

/// `{"data": {"event_type": .., "id": .., "payload": {..}}}`
#[derive(Debug, Clone, Deserialize)]
pub struct MessageWebhook {
    pub data: MessageEvent,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessageEvent {
    pub event_type: String,
    #[serde(default)]
    pub id: Option<String>,
    pub payload: MessagePayload,
}

/// What a messaging event asks of the router.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageRoute {
    Reply,
    Status,
    Ignore,
}

impl MessageEvent {
    pub fn route(&self) -> MessageRoute {
        match self.event_type.as_str() {
            "message.received" => MessageRoute::Reply,
            "message.sent" | "message.finalized" | "message.delivered" => MessageRoute::Status,
            _ => MessageRoute::Ignore,
        }
    }

    pub fn status_update(&self) -> StatusUpdate {
        let status = self.payload.status();
        StatusUpdate {
            external_id: self.payload.id.clone(),
            state: map_status(status),
            destination: self.payload.to_number().map(str::to_string),
            provider_status: status.to_string(),
        }
    }
}

pub async fn handle(
    State(state): State<AppState>,
    request_id: Option<Extension<RequestId>>,
    body: Bytes,
) -> Response {
    let rid = request_id.map(|Extension(rid)| rid);
    let webhook: MessageWebhook = match serde_json::from_slice(&body) {
        Ok(webhook) => webhook,
        Err(err) => {
            warn!(error = %err, "undecodable messaging webhook acknowledged and dropped");
            return respond::ack(rid.as_ref());
        }
    };

    let span = tracing::info_span!(
        "telnyx.webhook",
        route = "sms",
        event_type = %webhook.data.event_type,
        request_id = tracing::field::Empty,
        call_sid = tracing::field::Empty,
        message_id = tracing::field::Empty,
    );
    with_webhook_fields(
        &span,
        rid.as_ref().map(|r| r.0.as_str()).unwrap_or_default(),
        None,
        Some(&webhook.data.payload.id),
    );
    counter!(WEBHOOK_ACCEPTED_TOTAL, "route" => "sms").increment(1);

    handle_event(&state, &webhook.data).instrument(span).await;
    respond::ack(rid.as_ref())
}

/// Applies one messaging event. Failures are logged and swallowed so the
/// provider never retries an authenticated webhook.
pub async fn handle_event(state: &AppState, event: &MessageEvent) {
    match event.route() {
        MessageRoute::Reply => handle_reply(state, event).await,
        MessageRoute::Status => {
            let update = event.status_update();
            debug!(state = update.state.as_str(), "message status update");
            if let Err(err) = state.sink_write(state.actions.record_status(update)).await {
                counter!(SINK_FAILURES_TOTAL, "kind" => "status").increment(1);
                warn!(error = %err, "failed to record message status");
            }
        }
        MessageRoute::Ignore => {
            debug!(event_type = %event.event_type, "messaging event ignored");
        }
    }
}

async fn handle_reply(state: &AppState, event: &MessageEvent) {
    let Some(from) = event.payload.from_number().filter(|n| !n.is_empty()) else {
        warn!("inbound message without a sender number dropped");
        return;
    };
    let body = event.payload.text.as_deref().unwrap_or_default();
    let intent = parse_reply(body);

    if let Some((kind, alert_id)) = intent.action() {
        let action = AlertAction {
            kind,
            alert_id,
            phone_number: from.to_string(),
            source: ActionSource::Sms {
                message_id: event.payload.id.clone(),
            },
        };
        if let Err(err) = state.sink_write(state.actions.record_action(action)).await {
            counter!(SINK_FAILURES_TOTAL, "kind" => "action").increment(1);
            warn!(action = kind.as_str(), error = %err, "failed to record sms reply action");
            return;
        }
        info!(action = kind.as_str(), alert_id = ?alert_id, "sms reply action recorded");
    } else {
        debug!(intent = ?intent, "sms reply carried no action");
    }

    if let Some(text) = intent.confirmation() {
        if let Err(err) = state.replies.send_text(from, &text).await {
            warn!(error = %err, retryable = err.is_retryable(), "failed to send sms confirmation");
        }
    }
}
