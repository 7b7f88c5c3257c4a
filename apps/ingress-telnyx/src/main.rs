//! Telnyx ingress service: verifies webhook signatures, renders TeXML call
//! menus and forwards alert actions and delivery status to NATS.

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use tnx_core::TelnyxConfig;
use tnx_core::platforms::telnyx::TelnyxSender;
use tnx_ingress_telnyx::nats::{NatsActionSink, NatsAlertStore};
use tnx_ingress_telnyx::{AppState, router};
use tnx_security::SignatureVerifier;
use tnx_telemetry::install as init_telemetry;

#[tokio::main]
async fn main() -> Result<()> {
    init_telemetry("tnx-ingress-telnyx")?;
    let config = Arc::new(TelnyxConfig::load()?);
    if config.public_key.trim().is_empty() {
        bail!("TELNYX_PUBLIC_KEY is required to verify webhooks");
    }
    let verifier = SignatureVerifier::new(&config.public_key)
        .context("TELNYX_PUBLIC_KEY is not a base64 ed25519 public key")?
        .with_tolerance(config.signature_tolerance());

    let nats_url = std::env::var("NATS_URL").unwrap_or_else(|_| "nats://127.0.0.1:4222".into());
    let nats = async_nats::connect(nats_url).await?;

    let state = AppState::new(
        config.clone(),
        Arc::new(NatsAlertStore::new(nats.clone(), config.lookup_timeout())),
        Arc::new(NatsActionSink::new(nats)),
        Arc::new(TelnyxSender::new(reqwest::Client::new(), config.clone())),
    );
    let app = router(state, Arc::new(verifier));

    let addr: std::net::SocketAddr = std::env::var("BIND")
        .unwrap_or_else(|_| "0.0.0.0:8090".into())
        .parse()
        .context("BIND must be a socket address")?;
    tracing::info!(?config, "ingress-telnyx listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}
