//! Collaborators reached over NATS.
//!
//! Alert lookups are request/reply on [`ALERT_LOOKUP_SUBJECT`]; actions and
//! status updates are fire-and-forget publishes.

use std::time::Duration;

use async_nats::Client as Nats;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tnx_core::{
    ALERT_LOOKUP_SUBJECT, ActionSink, Alert, AlertAction, AlertStore, LookupError, SinkError,
    StatusUpdate, action_subject, status_subject,
};

#[derive(Debug, Serialize)]
struct LookupRequest {
    alert_id: i64,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum LookupReply {
    Found(Alert),
    Failed { error: String },
}

pub struct NatsAlertStore {
    client: Nats,
    timeout: Duration,
}

impl NatsAlertStore {
    pub fn new(client: Nats, timeout: Duration) -> Self {
        Self { client, timeout }
    }
}

#[async_trait]
impl AlertStore for NatsAlertStore {
    async fn find_alert(&self, alert_id: i64) -> Result<Alert, LookupError> {
        let payload = serde_json::to_vec(&LookupRequest { alert_id })
            .map_err(|err| LookupError::Backend(err.to_string()))?;
        let reply = tokio::time::timeout(
            self.timeout,
            self.client.request(ALERT_LOOKUP_SUBJECT, payload.into()),
        )
        .await
        .map_err(|_| LookupError::Timeout)?
        .map_err(|err| LookupError::Backend(err.to_string()))?;
        parse_reply(alert_id, &reply.payload)
    }
}

fn parse_reply(alert_id: i64, payload: &[u8]) -> Result<Alert, LookupError> {
    match serde_json::from_slice::<LookupReply>(payload) {
        Ok(LookupReply::Found(alert)) => Ok(alert),
        Ok(LookupReply::Failed { error }) if error == "not_found" => {
            Err(LookupError::NotFound(alert_id))
        }
        Ok(LookupReply::Failed { error }) => Err(LookupError::Backend(error)),
        Err(err) => Err(LookupError::Backend(format!("undecodable lookup reply: {err}"))),
    }
}

pub struct NatsActionSink {
    client: Nats,
}

impl NatsActionSink {
    pub fn new(client: Nats) -> Self {
        Self { client }
    }

    async fn publish<T: Serialize>(&self, subject: String, value: &T) -> Result<(), SinkError> {
        let payload = serde_json::to_vec(value).map_err(|err| SinkError(err.to_string()))?;
        self.client
            .publish(subject.clone(), payload.into())
            .await
            .map_err(|err| SinkError(format!("publish to {subject} failed: {err}")))
    }
}

#[async_trait]
impl ActionSink for NatsActionSink {
    async fn record_action(&self, action: AlertAction) -> Result<(), SinkError> {
        self.publish(action_subject(action.kind), &action).await
    }

    async fn record_status(&self, update: StatusUpdate) -> Result<(), SinkError> {
        self.publish(status_subject(update.state), &update).await
    }
}
