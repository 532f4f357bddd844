use opentelemetry::trace::TraceId;
use tracing_subscriber::{prelude::*, EnvFilter, Registry};

/// Trace id of the current span, as propagated through the otel layer
pub fn get_trace_id() -> TraceId {
    use opentelemetry::trace::TraceContextExt as _; // opentelemetry::Context -> opentelemetry::trace::Span
    use tracing_opentelemetry::OpenTelemetrySpanExt as _; // tracing::Span to opentelemetry::Context

    tracing::Span::current()
        .context()
        .span()
        .span_context()
        .trace_id()
}

fn build_tracer() -> opentelemetry_sdk::trace::Tracer {
    use opentelemetry::trace::TracerProvider as _;
    use opentelemetry_sdk::trace::SdkTracerProvider;

    let provider = SdkTracerProvider::builder();
    #[cfg(feature = "telemetry")]
    let provider = provider.with_batch_exporter(
        opentelemetry_otlp::SpanExporter::builder()
            .with_tonic()
            .build()
            .unwrap(),
    );
    provider.build().tracer("vcluster-syncer")
}

/// Install the tracing stack: otel propagation, compact log output and a
/// RUST_LOG-style filter defaulting to info
pub fn init() {
    let otel = tracing_opentelemetry::layer().with_tracer(build_tracer());
    let logger = tracing_subscriber::fmt::layer().compact();
    let env_filter = EnvFilter::try_from_default_env()
        .or(EnvFilter::try_new("info"))
        .unwrap();

    Registry::default()
        .with(otel)
        .with(logger)
        .with(env_filter)
        .init();
}
