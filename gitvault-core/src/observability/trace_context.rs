//! W3C trace context for outbound API calls.

use opentelemetry::trace::TraceContextExt;
use tracing::Span;
use tracing_opentelemetry::OpenTelemetrySpanExt;

pub const TRACEPARENT_HEADER: &str = "traceparent";

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// `traceparent` value for the current span, if it carries a valid OTel context.
pub fn current_traceparent() -> Option<String> {
    let context = Span::current().context();
    let otel_span = context.span();
    let span_context = otel_span.span_context();

    if !span_context.is_valid() {
        return None;
    }

    // version-trace_id-span_id-trace_flags
    Some(format!(
        "00-{}-{}-{:02x}",
        span_context.trace_id(),
        span_context.span_id(),
        span_context.trace_flags().to_u8()
    ))
}
