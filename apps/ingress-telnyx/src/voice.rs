//! TeXML voice callbacks.
//!
//! Each request is classified from its callback query ([`CallbackContext`])
//! and the pressed `Digits`; nothing about the call is stored between
//! requests, so a replayed webhook renders the same markup.

use axum::{
    Extension,
    body::Bytes,
    extract::{RawQuery, State},
    response::Response,
};
use metrics::counter;
use tnx_core::{
    ActionSource, AlertAction, CallMenu, CallbackContext, Intent, LookupError, StatusUpdate,
    is_terminal_call_status, map_call_status,
};
use tnx_telemetry::names::{
    LOOKUP_FAILURES_TOTAL, SINK_FAILURES_TOTAL, WEBHOOK_ACCEPTED_TOTAL,
};
use tnx_telemetry::with_webhook_fields;
use tracing::{Instrument, info, warn};

use crate::{AppState, RequestId, respond};

/// Form fields Telnyx posts to a TeXML callback.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VoiceEvent {
    pub call_sid: String,
    pub call_status: String,
    pub from: String,
    pub to: String,
    pub digits: Option<String>,
}

impl VoiceEvent {
    /// Parses a form-encoded body. Unknown fields are ignored and missing
    /// ones are left empty.
    pub fn from_form(body: &[u8]) -> Self {
        let mut event = VoiceEvent::default();
        for (key, value) in url::form_urlencoded::parse(body) {
            match key.as_ref() {
                "CallSid" => event.call_sid = value.into_owned(),
                "CallStatus" => event.call_status = value.trim().to_ascii_lowercase(),
                "From" => event.from = value.into_owned(),
                "To" => event.to = value.into_owned(),
                "Digits" => {
                    let digits = value.trim();
                    if !digits.is_empty() {
                        event.digits = Some(digits.to_string());
                    }
                }
                _ => {}
            }
        }
        event
    }

    /// The party being notified: the callee of an outbound call.
    pub fn contact_number(&self) -> &str {
        if self.to.is_empty() {
            &self.from
        } else {
            &self.to
        }
    }
}

pub async fn handle(
    State(state): State<AppState>,
    request_id: Option<Extension<RequestId>>,
    RawQuery(query): RawQuery,
    body: Bytes,
) -> Response {
    let ctx = CallbackContext::from_query(query.as_deref().unwrap_or_default());
    let event = VoiceEvent::from_form(&body);
    let rid = request_id.map(|Extension(rid)| rid.0).unwrap_or_default();

    let span = tracing::info_span!(
        "telnyx.webhook",
        route = "voice",
        intent = ctx.intent.as_str(),
        request_id = tracing::field::Empty,
        call_sid = tracing::field::Empty,
        message_id = tracing::field::Empty,
    );
    with_webhook_fields(&span, &rid, Some(&event.call_sid), None);
    counter!(WEBHOOK_ACCEPTED_TOTAL, "route" => "voice").increment(1);

    let markup = respond_to_call(&state, &ctx, &event).instrument(span).await;
    respond::texml(markup)
}

/// Renders the markup for one voice callback. Never fails: lookup and sink
/// errors degrade to spoken fallbacks.
pub async fn respond_to_call(state: &AppState, ctx: &CallbackContext, event: &VoiceEvent) -> String {
    if let Some(call_state) = map_call_status(&event.call_status) {
        if is_terminal_call_status(&event.call_status) {
            let update = StatusUpdate {
                external_id: event.call_sid.clone(),
                state: call_state,
                destination: Some(event.contact_number().to_string()).filter(|n| !n.is_empty()),
                provider_status: event.call_status.clone(),
            };
            if let Err(err) = state.sink_write(state.actions.record_status(update)).await {
                counter!(SINK_FAILURES_TOTAL, "kind" => "status").increment(1);
                warn!(error = %err, "failed to record call status");
            }
            return state.menus.render(&CallMenu::Hangup);
        }
    }

    let menu = match ctx.intent {
        Intent::Alert => alert_menu(state, ctx, event).await,
        Intent::Verification => match &ctx.code {
            Some(code) => CallMenu::Verification { code: code.clone() },
            None => {
                counter!(LOOKUP_FAILURES_TOTAL, "intent" => "verify").increment(1);
                warn!("verification callback without a code; using generic message");
                CallMenu::Generic
            }
        },
        Intent::Test => CallMenu::Test,
        Intent::Default => CallMenu::Generic,
    };
    state.menus.render(&menu)
}

async fn alert_menu(state: &AppState, ctx: &CallbackContext, event: &VoiceEvent) -> CallMenu {
    if let Some(kind) = event
        .digits
        .as_deref()
        .and_then(|digits| state.menus.action_for_digit(digits))
    {
        let action = AlertAction {
            kind,
            alert_id: ctx.alert_id,
            phone_number: event.contact_number().to_string(),
            source: ActionSource::Voice {
                call_sid: event.call_sid.clone(),
            },
        };
        return match state.sink_write(state.actions.record_action(action)).await {
            Ok(()) => {
                info!(action = kind.as_str(), alert_id = ?ctx.alert_id, "call menu action recorded");
                CallMenu::Confirmation(kind)
            }
            Err(err) => {
                counter!(SINK_FAILURES_TOTAL, "kind" => "action").increment(1);
                warn!(action = kind.as_str(), error = %err, "failed to record call menu action");
                CallMenu::ActionFailed
            }
        };
    }

    let Some(alert_id) = ctx.alert_id else {
        counter!(LOOKUP_FAILURES_TOTAL, "intent" => "alert").increment(1);
        warn!("alert callback without a usable alertID; using generic alert message");
        return CallMenu::AlertUnavailable { alert_id: None };
    };

    let lookup = tokio::time::timeout(
        state.config.lookup_timeout(),
        state.alerts.find_alert(alert_id),
    )
    .await
    .unwrap_or(Err(LookupError::Timeout));

    match lookup {
        Ok(alert) => CallMenu::Alert(alert),
        Err(err) => {
            counter!(LOOKUP_FAILURES_TOTAL, "intent" => "alert").increment(1);
            warn!(alert_id, error = %err, "alert lookup failed; using generic alert message");
            CallMenu::AlertUnavailable {
                alert_id: Some(alert_id),
            }
        }
    }
}
