//! # Observability Tests Module
//!
//! Test suite for observability functionality including metrics recording,
//! tracing spans, health checks and the metrics/health HTTP server.

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use anyhow::Result;
    use ticket_checkout_bot::config::CatalogConfig;
    use ticket_checkout_bot::observability::{self, health_checks, metrics};
    use ticket_checkout_bot::observability::{GatewayStatus, ReadinessInputs};
    use ticket_checkout_bot::observability_config::{presets, Environment};

    const VALID_TOKEN: &str = "MTIzNDU2Nzg5MDEyMzQ1Njc4.GhIjKl.fake-signature-for-tests";

    fn valid_catalog() -> CatalogConfig {
        CatalogConfig {
            base_url: "https://shop.example.com".to_string(),
            consumer_key: "ck_test".to_string(),
            consumer_secret: "cs_test".to_string(),
            ..CatalogConfig::default()
        }
    }

    /// Recording metrics without an installed recorder must not panic
    #[test]
    fn test_metrics_recording() {
        observability::record_interaction("choose_category", "transitioned");
        observability::record_interaction("choose_product", "product_not_found");
        observability::record_catalog_request("search_products", true, Duration::from_millis(80));
        observability::record_catalog_request("get_variation", false, Duration::from_secs(2));
        observability::record_checkout("PayPal");
        observability::record_selection_store_size(3);
        observability::record_selection_evictions(2);
        observability::record_health_check_metrics("catalog", true, Duration::from_millis(1));
        observability::record_startup_metrics(Duration::from_millis(250));
    }

    #[test]
    fn test_trace_span_creation_and_context() {
        let discord_span = observability::discord_span("choose_payment", 4242);
        let catalog_span = observability::catalog_span("search_products");

        // Without a subscriber the spans are disabled and carry no metadata
        if let Some(metadata) = discord_span.metadata() {
            assert_eq!(metadata.name(), "discord_operation");
        }
        if let Some(metadata) = catalog_span.metadata() {
            assert_eq!(metadata.name(), "catalog_operation");
        }

        let _enter_discord = discord_span.enter();
        let _enter_catalog = catalog_span.enter();
    }

    #[tokio::test]
    async fn test_bot_token_health() {
        assert!(health_checks::check_bot_token_health(VALID_TOKEN).await.is_ok());
        assert!(health_checks::check_bot_token_health("").await.is_err());
        assert!(health_checks::check_bot_token_health("123456:colon-style")
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_catalog_health_follows_config_validation() {
        assert!(health_checks::check_catalog_health(&valid_catalog())
            .await
            .is_ok());

        let mut broken = valid_catalog();
        broken.consumer_secret.clear();
        assert!(health_checks::check_catalog_health(&broken).await.is_err());
    }

    #[tokio::test]
    async fn test_gateway_status_drives_readiness() {
        let gateway = GatewayStatus::new();
        let inputs = ReadinessInputs {
            bot_token: Some(VALID_TOKEN.to_string()),
            catalog: Some(valid_catalog()),
            gateway: Some(gateway.clone()),
        };

        assert!(health_checks::perform_readiness_checks(&inputs).await.is_err());

        gateway.mark_connected();
        assert!(health_checks::perform_readiness_checks(&inputs).await.is_ok());

        gateway.mark_disconnected();
        assert!(health_checks::perform_readiness_checks(&inputs).await.is_err());
    }

    #[tokio::test]
    async fn test_metrics_server_serves_health_endpoints() -> Result<()> {
        let gateway = GatewayStatus::new();
        let inputs = ReadinessInputs {
            bot_token: Some(VALID_TOKEN.to_string()),
            catalog: Some(valid_catalog()),
            gateway: Some(gateway.clone()),
        };

        let addr = metrics::start_metrics_server_with_health_checks(None, 0, inputs).await?;
        let base = format!("http://{}", addr);
        let client = reqwest::Client::new();

        let live = client.get(format!("{}/health/live", base)).send().await?;
        assert_eq!(live.status(), reqwest::StatusCode::OK);

        let not_ready = client.get(format!("{}/health/ready", base)).send().await?;
        assert_eq!(not_ready.status(), reqwest::StatusCode::SERVICE_UNAVAILABLE);
        assert!(not_ready.text().await?.contains("gateway"));

        gateway.mark_connected();
        let ready = client.get(format!("{}/health/ready", base)).send().await?;
        assert_eq!(ready.status(), reqwest::StatusCode::OK);

        let unknown = client.get(format!("{}/nope", base)).send().await?;
        assert_eq!(unknown.status(), reqwest::StatusCode::NOT_FOUND);
        Ok(())
    }

    #[tokio::test]
    async fn test_frequent_health_checks_are_not_throttled() -> Result<()> {
        let addr = metrics::start_metrics_server_with_health_checks(
            None,
            0,
            ReadinessInputs::default(),
        )
        .await?;
        let client = reqwest::Client::new();

        // Two minutes of liveness and readiness checks every 10s from one node
        for _ in 0..12 {
            for path in ["/health/live", "/health/ready"] {
                let response = client.get(format!("http://{}{}", addr, path)).send().await?;
                assert_eq!(response.status(), reqwest::StatusCode::OK, "{}", path);
            }
        }
        Ok(())
    }

    #[test]
    fn test_environment_presets() {
        let development = presets::development();
        assert!(development.is_development());
        assert!(development.validate().is_ok());

        let production = presets::production();
        assert!(production.is_production());
        assert!(production.validate().is_ok());

        // Unknown environments fall back to development settings
        assert!(presets::for_environment(Environment::parse("qa")).is_development());
    }
}
