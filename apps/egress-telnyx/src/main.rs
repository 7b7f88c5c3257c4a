use std::sync::Arc;

use anyhow::Result;
use tnx_core::TelnyxConfig;
use tnx_core::platforms::telnyx::TelnyxSender;
use tnx_telemetry::install as init_telemetry;

#[tokio::main]
async fn main() -> Result<()> {
    init_telemetry("tnx-egress-telnyx")?;
    let config = Arc::new(TelnyxConfig::load()?);
    tracing::info!(?config, "egress-telnyx starting");

    let nats_url = std::env::var("NATS_URL").unwrap_or_else(|_| "nats://127.0.0.1:4222".into());
    let nats = async_nats::connect(nats_url).await?;
    let sender = TelnyxSender::new(reqwest::Client::new(), config);

    tnx_egress_telnyx::run(nats, &sender).await
}
