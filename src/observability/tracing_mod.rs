//! Tracing and logging setup module.
//!
//! This module provides:
//! - Structured logging configuration
//! - OpenTelemetry span export through the `tracing` bridge layer
//! - Tracing span creation utilities

use anyhow::Result;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry::{global, KeyValue};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::trace::{Sampler, SdkTracer, SdkTracerProvider, SpanExporter};
use opentelemetry_sdk::Resource;
use tracing_opentelemetry::OpenTelemetryLayer;
use tracing_subscriber::prelude::*;
use tracing_subscriber::registry::LookupSpan;

use crate::observability_config::ObservabilityConfig;

const SERVICE_NAME: &str = "ticket-checkout-bot";

/// Build the log filter for the configured level
pub fn build_env_filter(config: &ObservabilityConfig) -> Result<tracing_subscriber::EnvFilter> {
    let mut filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(format!("ticket_checkout_bot={}", config.log_level).parse()?)
        .add_directive("serenity=warn".parse()?)
        .add_directive("hyper=warn".parse()?)
        .add_directive("reqwest=warn".parse()?);

    // Observability-specific log level
    if let Ok(obs_log) = std::env::var("OBSERVABILITY_LOG_LEVEL") {
        filter = filter
            .add_directive(format!("ticket_checkout_bot::observability={}", obs_log).parse()?);
    }

    Ok(filter)
}

/// Initialize structured logging, plus span export when an OTLP endpoint is
/// configured.
///
/// Returns the tracer provider so pending spans can be flushed on shutdown.
pub fn init_tracing_with_config(config: &ObservabilityConfig) -> Result<Option<SdkTracerProvider>> {
    let filter = build_env_filter(config)?;
    let tracer_provider = init_tracer_provider(config)?;

    // Pretty for development, JSON for everything else
    if config.is_development()
        || std::env::var("LOG_FORMAT").unwrap_or_else(|_| "json".to_string()) == "pretty"
    {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .pretty()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_thread_names(false),
            )
            .with(tracer_provider.as_ref().map(otel_layer))
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_thread_names(true),
            )
            .with(tracer_provider.as_ref().map(otel_layer))
            .try_init()?;
    }

    tracing::info!(
        environment = %config.environment,
        log_level = %config.log_level,
        otlp_endpoint = ?config.otlp_endpoint,
        trace_sampling_ratio = %config.trace_sampling_ratio,
        "Tracing initialized with structured logging"
    );
    Ok(tracer_provider)
}

/// Sampler matching the configured sampling ratio
pub fn sampler_for(config: &ObservabilityConfig) -> Sampler {
    if config.samples_everything() {
        Sampler::AlwaysOn
    } else {
        Sampler::ParentBased(Box::new(Sampler::TraceIdRatioBased(
            config.trace_sampling_ratio,
        )))
    }
}

/// Tracer provider exporting through `exporter` in batches
pub fn build_tracer_provider<E>(exporter: E, config: &ObservabilityConfig) -> SdkTracerProvider
where
    E: SpanExporter + 'static,
{
    let resource = Resource::builder()
        .with_service_name(SERVICE_NAME)
        .with_attributes(
            config
                .tags
                .iter()
                .map(|(key, value)| KeyValue::new(key.clone(), value.clone())),
        )
        .build();

    SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .with_sampler(sampler_for(config))
        .with_resource(resource)
        .build()
}

/// Layer forwarding `tracing` spans to the provider's tracer
pub fn otel_layer<S>(provider: &SdkTracerProvider) -> OpenTelemetryLayer<S, SdkTracer>
where
    S: tracing::Subscriber + for<'span> LookupSpan<'span>,
{
    tracing_opentelemetry::layer().with_tracer(provider.tracer(SERVICE_NAME))
}

/// OTLP tracer provider, or `None` when no endpoint is configured
fn init_tracer_provider(config: &ObservabilityConfig) -> Result<Option<SdkTracerProvider>> {
    let Some(endpoint) = &config.otlp_endpoint else {
        return Ok(None);
    };

    let otlp_exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint.clone())
        .build()?;

    let tracer_provider = build_tracer_provider(otlp_exporter, config);
    global::set_tracer_provider(tracer_provider.clone());
    Ok(Some(tracer_provider))
}

/// Create a span for Discord-facing operations in one channel
pub fn discord_span(operation: &str, channel_id: u64) -> tracing::Span {
    tracing::info_span!(
        "discord_operation",
        operation = operation,
        channel_id = channel_id,
        component = "discord"
    )
}

/// Create a span for catalog API requests
pub fn catalog_span(operation: &str) -> tracing::Span {
    tracing::info_span!(
        "catalog_operation",
        operation = operation,
        component = "catalog"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability_config::presets;
    use opentelemetry_sdk::trace::InMemorySpanExporter;

    #[test]
    fn test_env_filter_accepts_configured_level() {
        let config = presets::development();
        assert!(build_env_filter(&config).is_ok());
    }

    #[test]
    fn test_sampler_follows_config() {
        let mut config = presets::production();
        assert!(matches!(sampler_for(&config), Sampler::ParentBased(_)));

        config.trace_sampling_ratio = 1.0;
        assert!(matches!(sampler_for(&config), Sampler::AlwaysOn));
    }

    #[test]
    fn test_no_provider_without_endpoint() {
        let config = presets::production();
        assert!(init_tracer_provider(&config).unwrap().is_none());
    }

    #[test]
    fn test_spans_reach_the_exporter() {
        let exporter = InMemorySpanExporter::default();
        let provider = build_tracer_provider(exporter.clone(), &presets::development());
        let subscriber = tracing_subscriber::registry().with(otel_layer(&provider));

        tracing::subscriber::with_default(subscriber, || {
            let parent = discord_span("choose_product", 4242);
            let _entered = parent.enter();
            let _child = catalog_span("get_product").entered();
        });
        provider.force_flush().unwrap();

        let spans = exporter.get_finished_spans().unwrap();
        let names: Vec<_> = spans.iter().map(|span| span.name.to_string()).collect();
        assert!(names.contains(&"discord_operation".to_string()));
        assert!(names.contains(&"catalog_operation".to_string()));

        let child = spans
            .iter()
            .find(|span| span.name == "catalog_operation")
            .unwrap();
        let parent = spans
            .iter()
            .find(|span| span.name == "discord_operation")
            .unwrap();
        assert_eq!(child.parent_span_id, parent.span_context.span_id());
    }
}
