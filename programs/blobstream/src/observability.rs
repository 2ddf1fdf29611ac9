//! Stdout logging with optional OTLP export of traces and logs.

use anyhow::{Context, Result};
use opentelemetry::{global, trace::TracerProvider as _, KeyValue};
use opentelemetry_appender_tracing::layer::OpenTelemetryTracingBridge;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{
    logs::SdkLoggerProvider,
    propagation::TraceContextPropagator,
    resource::Resource,
    trace::{Sampler, SdkTracerProvider, Tracer},
};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

use crate::config::ObservabilityConfig;

/// Flushes and shuts down the OTLP pipelines when dropped.
#[must_use = "dropping the guard shuts down OpenTelemetry export"]
pub struct ObservabilityGuard {
    tracer_provider: Option<SdkTracerProvider>,
    logger_provider: Option<SdkLoggerProvider>,
}

impl Drop for ObservabilityGuard {
    fn drop(&mut self) {
        if let Some(provider) = self.tracer_provider.take() {
            if let Err(err) = provider.shutdown() {
                eprintln!("failed to shut down tracer provider: {err}");
            }
        }
        // Dropping the logger provider flushes its processors.
        drop(self.logger_provider.take());
    }
}

/// Installs the global tracing subscriber.
///
/// OTLP export failures are reported on stderr and fall back to stdout only
/// logging.
///
/// # Errors
/// Fails if a global subscriber is already installed.
pub fn init_observability(config: &ObservabilityConfig) -> Result<ObservabilityGuard> {
    global::set_text_map_propagator(TraceContextPropagator::new());

    let filter = || EnvFilter::new(config.level().as_str().to_lowercase());
    let stdout = || {
        fmt::layer()
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
    };

    if config.use_otel {
        match (otlp_tracer(config), otlp_logger(config)) {
            (Ok((tracer, tracer_provider)), Ok(logger_provider)) => {
                Registry::default()
                    .with(filter())
                    .with(stdout())
                    .with(tracing_opentelemetry::layer().with_tracer(tracer))
                    .with(OpenTelemetryTracingBridge::new(&logger_provider))
                    .try_init()
                    .context("failed to install tracing subscriber")?;
                return Ok(ObservabilityGuard {
                    tracer_provider: Some(tracer_provider),
                    logger_provider: Some(logger_provider),
                });
            }
            (Err(err), _) | (_, Err(err)) => eprintln!("OpenTelemetry export disabled: {err:#}"),
        }
    }

    Registry::default()
        .with(filter())
        .with(stdout())
        .try_init()
        .context("failed to install tracing subscriber")?;
    Ok(ObservabilityGuard {
        tracer_provider: None,
        logger_provider: None,
    })
}

fn resource(config: &ObservabilityConfig) -> Resource {
    Resource::builder()
        .with_attributes([
            KeyValue::new("service.name", config.service_name.clone()),
            KeyValue::new("service.version", env!("CARGO_PKG_VERSION")),
        ])
        .build()
}

fn otlp_tracer(config: &ObservabilityConfig) -> Result<(Tracer, SdkTracerProvider)> {
    let mut exporter = opentelemetry_otlp::SpanExporter::builder().with_tonic();
    if let Some(endpoint) = &config.otel_endpoint {
        exporter = exporter.with_endpoint(endpoint);
    }

    let provider = SdkTracerProvider::builder()
        .with_resource(resource(config))
        .with_sampler(Sampler::AlwaysOn)
        .with_batch_exporter(exporter.build().context("failed to build span exporter")?)
        .build();
    let tracer = provider.tracer(config.service_name.clone());
    Ok((tracer, provider))
}

fn otlp_logger(config: &ObservabilityConfig) -> Result<SdkLoggerProvider> {
    let mut exporter = opentelemetry_otlp::LogExporter::builder().with_tonic();
    if let Some(endpoint) = &config.otel_endpoint {
        exporter = exporter.with_endpoint(endpoint);
    }

    Ok(SdkLoggerProvider::builder()
        .with_resource(resource(config))
        .with_batch_exporter(exporter.build().context("failed to build log exporter")?)
        .build())
}
