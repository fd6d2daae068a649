//! Tracing subscriber initialization with structured logging and optional
//! OpenTelemetry trace export.
//!
//! # Usage
//!
//! ```no_run
//! // Human-readable logs only
//! botline_observe::tracing_setup::init_tracing(false).unwrap();
//!
//! // JSON logs plus spans exported to stdout
//! use botline_observe::tracing_setup::{TracingConfig, init_tracing_with};
//! init_tracing_with(&TracingConfig { json: true, enable_otel: true, ..Default::default() }).unwrap();
//! ```

use std::sync::OnceLock;

use opentelemetry::trace::TracerProvider as _;
use thiserror::Error;
use opentelemetry_sdk::trace::SdkTracerProvider;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};

/// Instrumentation scope name for exported spans.
pub const TRACER_NAME: &str = "botline";

/// Stores the OTel tracer provider so it can be shut down cleanly on exit.
static TRACER_PROVIDER: OnceLock<SdkTracerProvider> = OnceLock::new();

/// Errors from installing the global subscriber.
#[derive(Debug, Error)]
pub enum TracingInitError {
    /// A global subscriber was installed before this call.
    #[error("a global tracing subscriber is already set")]
    AlreadySet,

    #[error(transparent)]
    Subscriber(#[from] TryInitError),
}

/// Subscriber options.
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Emit one JSON object per event instead of the pretty text format.
    pub json: bool,
    /// Bridge spans (e.g. `dispatch`) to OpenTelemetry with a stdout exporter.
    pub enable_otel: bool,
    /// Filter used when `RUST_LOG` is unset or invalid.
    pub default_filter: String,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            json: false,
            enable_otel: false,
            default_filter: "info".to_string(),
        }
    }
}

fn env_filter(default_filter: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter))
}

/// Install the global subscriber with text output.
pub fn init_tracing(enable_otel: bool) -> Result<(), TracingInitError> {
    init_tracing_with(&TracingConfig {
        enable_otel,
        ..Default::default()
    })
}

/// Install the global subscriber.
///
/// Fails with `AlreadySet` before touching the global OTel provider when a
/// subscriber is already installed.
pub fn init_tracing_with(config: &TracingConfig) -> Result<(), TracingInitError> {
    if tracing::dispatcher::has_been_set() {
        return Err(TracingInitError::AlreadySet);
    }

    let text_layer = (!config.json).then(|| {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_span_events(FmtSpan::CLOSE)
    });
    let json_layer = config.json.then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_events(FmtSpan::CLOSE)
    });

    let otel_layer = config.enable_otel.then(|| {
        let provider = SdkTracerProvider::builder()
            .with_simple_exporter(opentelemetry_stdout::SpanExporter::default())
            .build();
        let tracer = provider.tracer(TRACER_NAME);

        let _ = TRACER_PROVIDER.set(provider.clone());
        opentelemetry::global::set_tracer_provider(provider);

        tracing_opentelemetry::layer().with_tracer(tracer)
    });

    tracing_subscriber::registry()
        .with(env_filter(&config.default_filter))
        .with(text_layer)
        .with(json_layer)
        .with(otel_layer)
        .try_init()?;
    Ok(())
}

/// Flush pending spans and shut down the OpenTelemetry provider.
///
/// No-op when OTel was not enabled.
pub fn shutdown_tracing() {
    if let Some(provider) = TRACER_PROVIDER.get() {
        if let Err(e) = provider.shutdown() {
            eprintln!("Warning: OTel tracer provider shutdown error: {e}");
        }
    }
}
