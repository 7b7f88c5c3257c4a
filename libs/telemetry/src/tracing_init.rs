use std::sync::OnceLock;

use anyhow::Result;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry::{KeyValue, global};
use opentelemetry_otlp::{HasExportConfig, SpanExporter};
use opentelemetry_sdk::{Resource, trace::SdkTracerProvider};
use tracing::{Span, Subscriber};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{TelemetryConfig, TelemetryProtocol};

static INIT: OnceLock<()> = OnceLock::new();

/// Installs the global subscriber once; later calls are no-ops.
///
/// Logs always go to stdout. Spans are additionally exported over OTLP when
/// the config enables an exporter. Counters and histograms are not handled
/// here: they go through the `metrics` facade to whatever recorder the host
/// installs.
pub fn init_telemetry(cfg: TelemetryConfig) -> Result<()> {
    if INIT.get().is_some() {
        return Ok(());
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cfg.default_filter.as_str()));
    let tracer = if cfg.exporter_enabled() {
        Some(otlp_tracer(&cfg)?)
    } else {
        None
    };
    let exporting = tracer.is_some();

    tracing_subscriber::registry()
        .with(filter)
        .with(log_layer(cfg.json_logs))
        .with(tracer.map(|tracer| tracing_opentelemetry::layer().with_tracer(tracer)))
        .try_init()
        .ok();

    crate::names::describe();
    INIT.set(()).ok();
    tracing::debug!(
        service = %cfg.service_name,
        otlp = exporting,
        endpoint = %cfg.endpoint,
        "telemetry initialised"
    );
    Ok(())
}

/// Records the webhook correlation fields on a span declared with
/// `request_id`, `call_sid` and `message_id` as empty fields.
pub fn with_webhook_fields(
    span: &Span,
    request_id: &str,
    call_sid: Option<&str>,
    message_id: Option<&str>,
) {
    span.record("request_id", tracing::field::display(request_id));
    if let Some(call_sid) = call_sid {
        span.record("call_sid", tracing::field::display(call_sid));
    }
    if let Some(message_id) = message_id {
        span.record("message_id", tracing::field::display(message_id));
    }
}

fn log_layer<S>(json: bool) -> Box<dyn Layer<S> + Send + Sync>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    if json {
        tracing_subscriber::fmt::layer()
            .json()
            .flatten_event(true)
            .with_current_span(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer().with_target(false).boxed()
    }
}

/// Builds the span pipeline and registers its provider globally so it lives
/// for the rest of the process.
fn otlp_tracer(cfg: &TelemetryConfig) -> Result<opentelemetry_sdk::trace::Tracer> {
    let exporter = match cfg.protocol {
        TelemetryProtocol::Grpc => {
            let mut builder = SpanExporter::builder().with_tonic();
            builder.export_config().endpoint = Some(cfg.endpoint.clone());
            builder.build()?
        }
        TelemetryProtocol::HttpProtobuf => {
            let mut builder = SpanExporter::builder().with_http();
            builder.export_config().endpoint = Some(cfg.endpoint.clone());
            builder.build()?
        }
    };

    let resource = Resource::builder_empty()
        .with_service_name(cfg.service_name.clone())
        .with_attributes([
            KeyValue::new("service.version", cfg.service_version.clone()),
            KeyValue::new("deployment.environment", cfg.environment.clone()),
        ])
        .build();
    let provider = SdkTracerProvider::builder()
        .with_resource(resource)
        .with_batch_exporter(exporter)
        .build();
    let tracer = provider.tracer(cfg.service_name.clone());
    global::set_tracer_provider(provider);
    Ok(tracer)
}
