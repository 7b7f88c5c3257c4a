//! Telnyx webhook ingress.
//!
//! ```text
//! POST /telnyx/voice  TeXML call menu driven by the callback query and Digits
//! POST /telnyx/sms    inbound replies and delivery-status events
//! GET  /healthz
//! ```
//!
//! Every webhook route sits behind Ed25519 signature verification; nothing
//! below the signature layer runs for an unverified request.

use std::future::Future;
use std::sync::Arc;

use axum::{
    Router, middleware,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use tnx_core::{
    CallMenuGenerator, EgressSender, SharedActionSink, SharedAlertStore, SinkError, TelnyxConfig,
};
use tnx_security::{SharedVerifier, require_signature};

pub mod nats;
pub mod reqid;
pub mod respond;
pub mod sms;
pub mod voice;

pub use reqid::{REQUEST_ID_HEADER, RequestId, with_request_id};

/// Shared, immutable handles; cloned per request.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<TelnyxConfig>,
    pub menus: Arc<CallMenuGenerator>,
    pub alerts: SharedAlertStore,
    pub actions: SharedActionSink,
    pub replies: Arc<dyn EgressSender>,
}

impl AppState {
    pub fn new(
        config: Arc<TelnyxConfig>,
        alerts: SharedAlertStore,
        actions: SharedActionSink,
        replies: Arc<dyn EgressSender>,
    ) -> Self {
        Self {
            menus: Arc::new(CallMenuGenerator::new(&config)),
            config,
            alerts,
            actions,
            replies,
        }
    }

    /// Runs one action-sink write under the lookup timeout.
    pub async fn sink_write<F>(&self, write: F) -> Result<(), SinkError>
    where
        F: Future<Output = Result<(), SinkError>>,
    {
        tokio::time::timeout(self.config.lookup_timeout(), write)
            .await
            .unwrap_or_else(|_| Err(SinkError("sink write timed out".into())))
    }
}

pub fn router(state: AppState, verifier: SharedVerifier) -> Router {
    let webhooks = Router::new()
        .route("/telnyx/voice", post(voice::handle))
        .route("/telnyx/sms", post(sms::handle))
        .layer(middleware::from_fn_with_state(verifier, require_signature))
        .with_state(state);

    Router::new()
        .route("/healthz", get(healthz))
        .merge(webhooks)
        .layer(middleware::from_fn(with_request_id))
}

async fn healthz() -> impl IntoResponse {
    StatusCode::NO_CONTENT
}
