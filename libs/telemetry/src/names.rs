//! Metric names shared by the ingress and egress services.

use metrics::{Unit, describe_counter, describe_histogram};

/// Webhooks refused by signature verification, labelled by `reason`.
pub const WEBHOOK_REJECTED_TOTAL: &str = "telnyx_webhook_rejected_total";
/// Webhooks accepted, labelled by `route`.
pub const WEBHOOK_ACCEPTED_TOTAL: &str = "telnyx_webhook_accepted_total";
/// Alert lookups that failed while rendering a prompt, labelled by `intent`.
pub const LOOKUP_FAILURES_TOTAL: &str = "telnyx_lookup_failures_total";
/// Sink failures, labelled by `kind` (`action` or `status`).
pub const SINK_FAILURES_TOTAL: &str = "telnyx_sink_failures_total";
/// Provider requests, labelled by `kind` and `outcome`.
pub const DISPATCH_TOTAL: &str = "telnyx_dispatch_total";
/// Provider request latency, labelled by `kind` and HTTP `status`.
pub const DISPATCH_SECONDS: &str = "telnyx_dispatch_seconds";

pub(crate) fn describe() {
    describe_counter!(
        WEBHOOK_REJECTED_TOTAL,
        Unit::Count,
        "Webhooks rejected before routing"
    );
    describe_counter!(WEBHOOK_ACCEPTED_TOTAL, Unit::Count, "Webhooks routed");
    describe_counter!(
        LOOKUP_FAILURES_TOTAL,
        Unit::Count,
        "Alert lookups that fell back to a generic prompt"
    );
    describe_counter!(SINK_FAILURES_TOTAL, Unit::Count, "Action sink failures");
    describe_counter!(DISPATCH_TOTAL, Unit::Count, "Outbound provider requests");
    describe_histogram!(
        DISPATCH_SECONDS,
        Unit::Seconds,
        "Outbound provider request latency"
    );
}
