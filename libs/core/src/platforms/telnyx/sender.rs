use std::borrow::Cow;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use metrics::{counter, histogram};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tnx_telemetry::names::{DISPATCH_SECONDS, DISPATCH_TOTAL};
use url::Url;

use super::api::{
    CallData, CallInitiateRequest, DataEnvelope, MessagePayload, NumberLookupData,
    SendMessageRequest,
};
use crate::config::TelnyxConfig;
use crate::context::CallbackContext;
use crate::egress::{CarrierLookup, EgressSender};
use crate::error::{ApiErrors, DispatchError};
use crate::status::map_status;
use crate::types::{
    CarrierInfo, DeliveryState, DispatchResult, MessageKind, Notification, OutboundContent,
    OutboundRequest,
};

/// Hard SMS length limit; longer bodies are cut to fit with a marker.
pub const SMS_MAX_CHARS: usize = 160;
pub const TRUNCATION_MARKER: &str = "...";

/// Path, relative to the callback base, that serves voice markup.
pub const VOICE_CALLBACK_PATH: &str = "telnyx/voice";

/// Metric label for number lookups, next to `sms` and `voice`.
const LOOKUP_LABEL: &str = "lookup";

/// Truncates to [`SMS_MAX_CHARS`] characters, ending in [`TRUNCATION_MARKER`].
///
/// ```
/// use tnx_core::platforms::telnyx::truncate_sms;
///
/// assert_eq!(truncate_sms("short"), "short");
/// let long = "x".repeat(200);
/// let cut = truncate_sms(&long);
/// assert_eq!(cut.chars().count(), 160);
/// assert!(cut.ends_with("..."));
/// ```
pub fn truncate_sms(body: &str) -> Cow<'_, str> {
    if body.chars().count() <= SMS_MAX_CHARS {
        return Cow::Borrowed(body);
    }
    let keep = SMS_MAX_CHARS - TRUNCATION_MARKER.chars().count();
    let mut cut: String = body.chars().take(keep).collect();
    cut.push_str(TRUNCATION_MARKER);
    Cow::Owned(cut)
}

/// SMS/voice dispatcher against the Telnyx v2 REST API.
pub struct TelnyxSender {
    http: reqwest::Client,
    config: Arc<TelnyxConfig>,
}

impl TelnyxSender {
    pub fn new(http: reqwest::Client, config: Arc<TelnyxConfig>) -> Self {
        Self { http, config }
    }

    fn is_mock(&self) -> bool {
        self.config.api_base.starts_with("mock://")
    }

    /// Builds the provider request for one notification.
    pub fn build_request(
        &self,
        destination: &str,
        kind: MessageKind,
        notification: &Notification,
    ) -> Result<OutboundRequest, DispatchError> {
        let origin = self.require("from_number", &self.config.from_number)?;
        Ok(match kind {
            MessageKind::Sms => {
                OutboundRequest::sms(destination, origin, Self::sms_text(notification))
            }
            MessageKind::Voice => OutboundRequest::voice(
                destination,
                origin,
                self.voice_callback_url(notification)?,
            ),
        })
    }

    /// Performs exactly one provider request for `request`.
    pub async fn dispatch(
        &self,
        request: &OutboundRequest,
    ) -> Result<DispatchResult, DispatchError> {
        match &request.content {
            OutboundContent::Body { text } => {
                self.post_message(&request.origin, &request.destination, text)
                    .await
            }
            OutboundContent::CallbackTarget { url } => {
                let external_id = self
                    .post_call(&request.origin, &request.destination, url)
                    .await?;
                Ok(DispatchResult {
                    external_id,
                    state: DeliveryState::Sending,
                    source: request.destination.clone(),
                })
            }
        }
    }

    /// Sends `body` to `destination` from the configured origin number.
    pub async fn send_sms(
        &self,
        destination: &str,
        body: &str,
    ) -> Result<DispatchResult, DispatchError> {
        let from = self.require("from_number", &self.config.from_number)?;
        self.post_message(from, destination, body).await
    }

    /// Starts a TeXML call; the provider fetches call-control markup from
    /// `callback_url`. Returns the provider call id.
    pub async fn make_call(
        &self,
        destination: &str,
        callback_url: &str,
    ) -> Result<String, DispatchError> {
        let from = self.require("from_number", &self.config.from_number)?;
        self.post_call(from, destination, callback_url).await
    }

    async fn post_message(
        &self,
        from: &str,
        destination: &str,
        body: &str,
    ) -> Result<DispatchResult, DispatchError> {
        let text = truncate_sms(body);
        let request = SendMessageRequest {
            from,
            to: destination,
            text: &text,
        };

        if self.is_mock() {
            return Ok(DispatchResult {
                external_id: format!("mock:{}", uuid::Uuid::new_v4()),
                state: DeliveryState::Sending,
                source: from.to_string(),
            });
        }

        let envelope: DataEnvelope<MessagePayload> = self
            .post_json(MessageKind::Sms, "messages", &request)
            .await?;
        let message = envelope.data;
        let state = map_status(message.status());
        tracing::info!(
            external_id = %message.id,
            status = %message.status(),
            state = state.as_str(),
            "telnyx sms accepted"
        );
        Ok(DispatchResult {
            source: message.from_number().unwrap_or(from).to_string(),
            external_id: message.id,
            state,
        })
    }

    async fn post_call(
        &self,
        from: &str,
        destination: &str,
        callback_url: &str,
    ) -> Result<String, DispatchError> {
        let connection_id = self.require("connection_id", &self.config.connection_id)?;
        let request = CallInitiateRequest {
            to: destination,
            from,
            url: callback_url,
            url_method: "POST",
        };

        if self.is_mock() {
            return Ok(format!("mock:{}", uuid::Uuid::new_v4()));
        }

        let path = format!("texml/calls/{}", urlencoding::encode(connection_id));
        let envelope: DataEnvelope<CallData> =
            self.post_json(MessageKind::Voice, &path, &request).await?;
        let call_id = envelope
            .data
            .sid
            .or(envelope.data.call_control_id)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                DispatchError::Decode("call response carried neither sid nor call_control_id".into())
            })?;
        tracing::info!(external_id = %call_id, "telnyx call initiated");
        Ok(call_id)
    }

    /// Callback URL embedding the notification's [`CallbackContext`].
    pub fn voice_callback_url(&self, notification: &Notification) -> Result<String, DispatchError> {
        let base = self.require("callback_base", &self.config.callback_base)?;
        let mut base = Url::parse(base)
            .map_err(|err| DispatchError::Config(format!("callback_base: {err}")))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let target = base
            .join(VOICE_CALLBACK_PATH)
            .map_err(|err| DispatchError::Config(format!("callback_base: {err}")))?;
        Ok(CallbackContext::for_notification(notification)
            .apply_to(&target)
            .to_string())
    }

    fn require<'a>(&self, key: &str, value: &'a str) -> Result<&'a str, DispatchError> {
        if value.trim().is_empty() {
            Err(DispatchError::Config(format!("{key} is not configured")))
        } else {
            Ok(value)
        }
    }

    /// Looks up the carrier for `number` via `GET /number_lookup/{number}`.
    pub async fn lookup_carrier(&self, number: &str) -> Result<CarrierInfo, DispatchError> {
        if number.trim().is_empty() {
            return Err(DispatchError::Config("lookup number is empty".into()));
        }
        if self.is_mock() {
            return Ok(CarrierInfo {
                name: "mock".into(),
                line_type: "mobile".into(),
            });
        }

        let path = format!("number_lookup/{}", urlencoding::encode(number.trim()));
        let request = self.http.get(self.config.api_url(&path));
        let envelope: DataEnvelope<NumberLookupData> = self.execute(LOOKUP_LABEL, request).await?;
        tracing::debug!(
            carrier = %envelope.data.carrier.name,
            line_type = %envelope.data.carrier.line_type,
            "telnyx number lookup"
        );
        Ok(envelope.data.carrier)
    }

    async fn post_json<B, T>(
        &self,
        kind: MessageKind,
        path: &str,
        body: &B,
    ) -> Result<T, DispatchError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self.http.post(self.config.api_url(path)).json(body);
        self.execute(kind.as_str(), request).await
    }

    /// Sends one authenticated request and decodes the JSON success body.
    /// `label` tags the dispatch metrics.
    async fn execute<T>(
        &self,
        label: &'static str,
        request: reqwest::RequestBuilder,
    ) -> Result<T, DispatchError>
    where
        T: DeserializeOwned,
    {
        let api_key = self.require("api_key", &self.config.api_key)?;
        let started = Instant::now();
        let response = request
            .bearer_auth(api_key)
            .header(http::header::ACCEPT, "application/json")
            .timeout(self.config.request_timeout())
            .send()
            .await
            .map_err(|err| {
                record_outcome(label, "transport");
                DispatchError::Transport(err)
            })?;

        let status = response.status();
        histogram!(
            DISPATCH_SECONDS,
            "kind" => label,
            "status" => status.as_str().to_string()
        )
        .record(started.elapsed().as_secs_f64());

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let errors = ApiErrors::from_body(&body);
            record_outcome(label, "provider");
            tracing::warn!(
                status = status.as_u16(),
                codes = ?errors.codes(),
                "telnyx rejected {label} request"
            );
            return Err(DispatchError::Provider { status, errors });
        }

        let bytes = response.bytes().await.map_err(|err| {
            record_outcome(label, "transport");
            DispatchError::Transport(err)
        })?;
        let parsed = serde_json::from_slice::<T>(&bytes).map_err(|err| {
            record_outcome(label, "decode");
            DispatchError::Decode(err.to_string())
        })?;
        record_outcome(label, "ok");
        Ok(parsed)
    }

    fn sms_text(notification: &Notification) -> String {
        match notification {
            Notification::Test => "Test message from your alerting system.".to_string(),
            Notification::Alert {
                alert_id, summary, ..
            } => format!("Alert #{alert_id}: {summary}"),
            Notification::Verification { code } => {
                format!("Your verification code is: {code}")
            }
        }
    }
}

fn record_outcome(label: &'static str, outcome: &'static str) {
    counter!(
        DISPATCH_TOTAL,
        "kind" => label,
        "outcome" => outcome
    )
    .increment(1);
}

#[async_trait]
impl EgressSender for TelnyxSender {
    async fn send(
        &self,
        destination: &str,
        kind: MessageKind,
        notification: &Notification,
    ) -> Result<DispatchResult, DispatchError> {
        let request = self.build_request(destination, kind, notification)?;
        self.dispatch(&request).await
    }

    async fn send_text(
        &self,
        destination: &str,
        body: &str,
    ) -> Result<DispatchResult, DispatchError> {
        self.send_sms(destination, body).await
    }
}

#[async_trait]
impl CarrierLookup for TelnyxSender {
    async fn lookup_carrier(&self, number: &str) -> Result<CarrierInfo, DispatchError> {
        TelnyxSender::lookup_carrier(self, number).await
    }
}
