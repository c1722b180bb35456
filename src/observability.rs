//! Observability module for centralized metrics, tracing, and logging setup.
//!
//! This module provides:
//! - Metrics collection and Prometheus export
//! - Distributed tracing with OpenTelemetry
//! - Structured logging with configurable levels
//! - Health check endpoints for monitoring
//! - Environment-specific configuration support

use std::net::SocketAddr;

use anyhow::Result;
use opentelemetry_sdk::trace::SdkTracerProvider;

use crate::observability_config::ObservabilityConfig;

pub mod health_checks;
pub mod metrics;
pub mod tracing_mod;

pub use health_checks::{GatewayStatus, ReadinessInputs};
pub use metrics::{
    record_catalog_request, record_checkout, record_health_check_metrics, record_interaction,
    record_selection_evictions, record_selection_store_size, record_startup_metrics,
};
pub use tracing_mod::{catalog_span, discord_span};

/// Handles kept alive for the lifetime of the process
pub struct ObservabilityGuard {
    /// Address the metrics and health server is bound to
    pub metrics_addr: SocketAddr,
    tracer_provider: Option<SdkTracerProvider>,
}

impl ObservabilityGuard {
    /// Flush pending spans before exit
    pub fn shutdown(self) {
        if let Some(provider) = self.tracer_provider {
            if let Err(e) = provider.shutdown() {
                tracing::warn!(error = %e, "Failed to flush OpenTelemetry spans");
            }
        }
        tracing::info!("Observability stack shut down");
    }
}

/// Initialize the complete observability stack with custom configuration
pub async fn init_observability_with_config(
    config: &ObservabilityConfig,
    readiness: ReadinessInputs,
) -> Result<ObservabilityGuard> {
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid observability configuration: {}", e))?;

    // Tracing first so everything below is logged
    let tracer_provider = tracing_mod::init_tracing_with_config(config)?;

    let metrics_handle = if config.enable_metrics_export {
        Some(metrics::init_metrics_with_config(config)?)
    } else {
        tracing::info!("Metrics export disabled");
        None
    };

    health_checks::start_health_metrics_recorder(readiness.clone());
    let metrics_addr = metrics::start_metrics_server_with_health_checks(
        metrics_handle,
        config.metrics_port,
        readiness,
    )
    .await?;

    tracing::info!(
        environment = %config.environment,
        otlp_endpoint = ?config.otlp_endpoint,
        metrics_addr = %metrics_addr,
        "Observability stack initialized successfully"
    );
    Ok(ObservabilityGuard {
        metrics_addr,
        tracer_provider,
    })
}
