//! Tracing subscriber initialization with structured logging and optional
//! OpenTelemetry trace export.
//!
//! # Usage
//!
//! ```no_run
//! // Structured logging filtered by `RUST_LOG`, falling back to "info"
//! parley_observe::tracing_setup::init_tracing("info", false).unwrap();
//!
//! // With OpenTelemetry export to stdout (for local development)
//! parley_observe::tracing_setup::init_tracing("parley=debug", true).unwrap();
//! ```

use opentelemetry::trace::TracerProvider as _;
use opentelemetry_sdk::trace::SdkTracerProvider;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use std::sync::OnceLock;

/// Stores the OTel tracer provider so it can be shut down cleanly on exit.
static TRACER_PROVIDER: OnceLock<SdkTracerProvider> = OnceLock::new();

/// Build the env filter: `RUST_LOG` wins, otherwise `default_directives`.
pub fn env_filter(default_directives: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives))
}

/// Initialize the global tracing subscriber.
///
/// - Always installs a structured `fmt` layer on stderr with target
///   visibility and span close timing.
/// - When `enable_otel` is true, additionally bridges tracing spans to
///   OpenTelemetry using a stdout exporter.
///
/// # Errors
///
/// Returns an error if the global subscriber has already been set.
pub fn init_tracing(
    default_directives: &str,
    enable_otel: bool,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE);

    let filter = env_filter(default_directives);

    if enable_otel {
        let provider = SdkTracerProvider::builder()
            .with_simple_exporter(opentelemetry_stdout::SpanExporter::default())
            .build();
        let tracer = provider.tracer("parley");
        let otel_layer = tracing_opentelemetry::layer().with_tracer(tracer);

        let _ = TRACER_PROVIDER.set(provider.clone());
        opentelemetry::global::set_tracer_provider(provider);

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .with(otel_layer)
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .try_init()?;
    }

    Ok(())
}

/// Flush pending traces and shut down the OpenTelemetry tracer provider.
///
/// No-op when OTel was not enabled.
pub fn shutdown_tracing() {
    if let Some(provider) = TRACER_PROVIDER.get() {
        if let Err(e) = provider.shutdown() {
            eprintln!("Warning: OTel tracer provider shutdown error: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_filter_accepts_default_directives() {
        let filter = env_filter("warn,parley=debug");
        assert!(!filter.to_string().is_empty());
    }

    #[test]
    fn shutdown_without_otel_is_noop() {
        shutdown_tracing();
    }
}
