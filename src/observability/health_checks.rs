//! Health check functionality module.
//!
//! This module provides:
//! - Bot token format checks
//! - Catalog configuration checks
//! - Gateway connection status
//! - Comprehensive readiness checks

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;

use crate::config::CatalogConfig;

/// Set once the Discord gateway reports the bot as ready
#[derive(Debug, Clone, Default)]
pub struct GatewayStatus {
    connected: Arc<AtomicBool>,
}

impl GatewayStatus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_connected(&self) {
        self.connected.store(true, Ordering::Release);
    }

    pub fn mark_disconnected(&self) {
        self.connected.store(false, Ordering::Release);
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }
}

/// Dependencies the readiness check looks at
#[derive(Debug, Clone, Default)]
pub struct ReadinessInputs {
    pub bot_token: Option<String>,
    pub catalog: Option<CatalogConfig>,
    pub gateway: Option<GatewayStatus>,
}

/// Perform comprehensive readiness checks
pub async fn perform_readiness_checks(inputs: &ReadinessInputs) -> Result<()> {
    if let Some(token) = &inputs.bot_token {
        check_bot_token_health(token).await?;
    }

    if let Some(catalog) = &inputs.catalog {
        check_catalog_health(catalog).await?;
    }

    if let Some(gateway) = &inputs.gateway {
        check_gateway_health(gateway).await?;
    }

    Ok(())
}

/// Check Discord bot token format
pub async fn check_bot_token_health(token: &str) -> Result<()> {
    // No API call, only the token shape
    if token.trim().is_empty() {
        return Err(anyhow::anyhow!("Bot token is empty"));
    }

    // Discord tokens are three dot-separated segments
    if token.split('.').filter(|part| !part.is_empty()).count() != 3 {
        return Err(anyhow::anyhow!("Bot token format is invalid"));
    }

    tracing::debug!("Bot token health check passed");
    Ok(())
}

/// Check that the catalog client has everything it needs to make requests
pub async fn check_catalog_health(config: &CatalogConfig) -> Result<()> {
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Catalog health check failed: {}", e))?;

    tracing::debug!("Catalog health check passed");
    Ok(())
}

/// Check that the gateway session is up
pub async fn check_gateway_health(gateway: &GatewayStatus) -> Result<()> {
    if !gateway.is_connected() {
        return Err(anyhow::anyhow!("Discord gateway is not connected"));
    }

    tracing::debug!("Gateway health check passed");
    Ok(())
}

/// Start a background task to periodically record health check metrics
pub fn start_health_metrics_recorder(inputs: ReadinessInputs) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(60));

        loop {
            interval.tick().await;

            if let Some(token) = &inputs.bot_token {
                let check_start = Instant::now();
                let healthy = check_bot_token_health(token).await.is_ok();
                super::metrics::record_health_check_metrics(
                    "discord_token",
                    healthy,
                    check_start.elapsed(),
                );
            }

            if let Some(catalog) = &inputs.catalog {
                let check_start = Instant::now();
                let healthy = check_catalog_health(catalog).await.is_ok();
                super::metrics::record_health_check_metrics(
                    "catalog",
                    healthy,
                    check_start.elapsed(),
                );
            }

            if let Some(gateway) = &inputs.gateway {
                let check_start = Instant::now();
                let healthy = check_gateway_health(gateway).await.is_ok();
                super::metrics::record_health_check_metrics(
                    "discord_gateway",
                    healthy,
                    check_start.elapsed(),
                );
            }
        }
    })
}
