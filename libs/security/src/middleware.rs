use std::sync::Arc;

use axum::{
    body::{Body, to_bytes},
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use metrics::counter;
use tnx_telemetry::names::WEBHOOK_REJECTED_TOTAL;
use tracing::warn;

use crate::signature::SignatureVerifier;

/// Webhook bodies above this size are refused before verification.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

pub type SharedVerifier = Arc<SignatureVerifier>;

/// Rejects any request whose Telnyx signature does not verify. Install with
/// `axum::middleware::from_fn_with_state(verifier, require_signature)`.
///
/// The handler behind this layer receives the exact bytes that were verified.
pub async fn require_signature(
    State(verifier): State<SharedVerifier>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let (parts, body) = req.into_parts();
    let body_bytes = match to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(_) => {
            counter!(WEBHOOK_REJECTED_TOTAL, "reason" => "body_too_large").increment(1);
            warn!(path = %parts.uri.path(), "webhook body unreadable or over limit");
            return StatusCode::PAYLOAD_TOO_LARGE.into_response();
        }
    };

    if let Err(err) = verifier.verify(&body_bytes, &parts.headers) {
        counter!(WEBHOOK_REJECTED_TOTAL, "reason" => err.reason()).increment(1);
        warn!(path = %parts.uri.path(), reason = err.reason(), "webhook rejected: {err}");
        return StatusCode::UNAUTHORIZED.into_response();
    }

    let req = Request::from_parts(parts, Body::from(body_bytes));
    next.run(req).await
}
