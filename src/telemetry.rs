//! Logging and trace export setup

use anyhow::{Context, Result};
use opentelemetry::trace::TracerProvider as _;
use opentelemetry_otlp::{SpanExporter, WithExportConfig};
use opentelemetry_sdk::{Resource, trace::SdkTracerProvider};
use tracing_subscriber::{EnvFilter, Layer, fmt, prelude::*};

use crate::config::LoggingConfig;

const SERVICE_NAME: &str = "safecity";

/// Keeps the span exporter alive; flushes pending spans on drop
#[must_use = "dropping the guard shuts down trace export"]
pub struct TelemetryGuard {
    provider: Option<SdkTracerProvider>,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        if let Some(provider) = self.provider.take()
            && let Err(e) = provider.shutdown()
        {
            eprintln!("Failed to flush trace exporter: {e}");
        }
    }
}

/// `RUST_LOG` takes precedence over the configured level
fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

fn tracer_provider(endpoint: &str) -> Result<SdkTracerProvider> {
    let exporter = SpanExporter::builder()
        .with_http()
        .with_endpoint(endpoint)
        .build()
        .with_context(|| format!("Failed to build OTLP exporter for {endpoint}"))?;

    Ok(SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .with_resource(Resource::builder().with_service_name(SERVICE_NAME).build())
        .build())
}

/// Install the global subscriber
pub fn init(config: &LoggingConfig) -> Result<TelemetryGuard> {
    let fmt_layer = match config.format.as_str() {
        "json" => fmt::layer().json().with_current_span(true).boxed(),
        _ => fmt::layer().with_target(false).boxed(),
    };

    let provider = config
        .otlp_endpoint
        .as_deref()
        .map(tracer_provider)
        .transpose()?;

    let otel_layer = provider.as_ref().map(|provider| {
        tracing_opentelemetry::layer().with_tracer(provider.tracer(SERVICE_NAME))
    });

    tracing_subscriber::registry()
        .with(env_filter(&config.level))
        .with(fmt_layer)
        .with(otel_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    if let Some(endpoint) = &config.otlp_endpoint {
        tracing::info!(endpoint, "Exporting spans over OTLP");
    }

    Ok(TelemetryGuard { provider })
}
