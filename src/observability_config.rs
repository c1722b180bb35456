//! # Observability Configuration
//!
//! Log level, span export and the metrics endpoint, chosen per deployment
//! environment and overridable from the environment.

use std::env;
use std::fmt;

use crate::errors::{AppError, AppResult};

/// Where the bot is running
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    /// Anything other than `production` is treated as development
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Environment::Production,
            _ => Environment::Development,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    pub environment: Environment,
    /// OTLP collector; span export is off when unset
    pub otlp_endpoint: Option<String>,
    /// Port of the metrics and health server
    pub metrics_port: u16,
    /// Log level for the bot's own targets
    pub log_level: String,
    /// Fraction of root traces exported; 1.0 keeps everything
    pub trace_sampling_ratio: f64,
    /// Whether `/metrics` is served
    pub enable_metrics_export: bool,
    /// Resource attributes attached to exported spans
    pub tags: Vec<(String, String)>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        presets::development()
    }
}

impl ObservabilityConfig {
    /// `ENVIRONMENT` selects a preset; the remaining variables override it.
    pub fn from_env() -> Self {
        let environment =
            Environment::parse(&env::var("ENVIRONMENT").unwrap_or_default());
        let mut config = presets::for_environment(environment);

        config.otlp_endpoint = env::var("OTLP_ENDPOINT").ok().filter(|e| !e.is_empty());
        if let Some(port) = env::var("METRICS_PORT").ok().and_then(|p| p.parse().ok()) {
            config.metrics_port = port;
        }
        if let Ok(level) = env::var("LOG_LEVEL") {
            config.log_level = level;
        }
        if let Some(ratio) = env::var("TRACE_SAMPLING_RATIO")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            config.trace_sampling_ratio = ratio;
        }
        if let Some(enabled) = env::var("ENABLE_METRICS_EXPORT")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            config.enable_metrics_export = enabled;
        }

        config.tags = vec![
            ("deployment.environment".to_string(), environment.to_string()),
        ];
        if let Ok(version) = env::var("SERVICE_VERSION") {
            config.tags.push(("service.version".to_string(), version));
        }

        config
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }

    pub fn is_development(&self) -> bool {
        self.environment == Environment::Development
    }

    /// Whether every trace is kept
    pub fn samples_everything(&self) -> bool {
        self.trace_sampling_ratio >= 1.0
    }

    pub fn validate(&self) -> AppResult<()> {
        match &self.otlp_endpoint {
            Some(endpoint) if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") => {
                return Err(AppError::Config(format!(
                    "OTLP_ENDPOINT must be an http(s) URL, got {}",
                    endpoint
                )));
            }
            _ => {}
        }
        if !(0.0..=1.0).contains(&self.trace_sampling_ratio) {
            return Err(AppError::Config(format!(
                "TRACE_SAMPLING_RATIO must be within 0.0..=1.0, got {}",
                self.trace_sampling_ratio
            )));
        }
        if self.metrics_port == 0 {
            return Err(AppError::Config("METRICS_PORT must be non-zero".to_string()));
        }
        Ok(())
    }
}

/// Per-environment defaults
pub mod presets {
    use super::{Environment, ObservabilityConfig};

    pub fn for_environment(environment: Environment) -> ObservabilityConfig {
        match environment {
            Environment::Development => development(),
            Environment::Production => production(),
        }
    }

    /// Verbose logs, every trace kept
    pub fn development() -> ObservabilityConfig {
        ObservabilityConfig {
            environment: Environment::Development,
            otlp_endpoint: None,
            metrics_port: 9090,
            log_level: "debug".to_string(),
            trace_sampling_ratio: 1.0,
            enable_metrics_export: true,
            tags: Vec::new(),
        }
    }

    pub fn production() -> ObservabilityConfig {
        ObservabilityConfig {
            environment: Environment::Production,
            log_level: "info".to_string(),
            trace_sampling_ratio: 0.1,
            ..development()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_parsing() {
        assert_eq!(Environment::parse("production"), Environment::Production);
        assert_eq!(Environment::parse(" PROD "), Environment::Production);
        assert_eq!(Environment::parse("staging"), Environment::Development);
        assert_eq!(Environment::parse(""), Environment::Development);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = presets::production();
        assert!(config.validate().is_ok());

        config.otlp_endpoint = Some("collector:4317".to_string());
        assert!(matches!(config.validate(), Err(AppError::Config(_))));

        config.otlp_endpoint = Some("http://collector:4317".to_string());
        config.trace_sampling_ratio = 1.5;
        assert!(config.validate().is_err());

        config.trace_sampling_ratio = 0.5;
        config.metrics_port = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_presets() {
        let production = presets::for_environment(Environment::Production);
        assert!(production.is_production());
        assert!(!production.samples_everything());
        assert_eq!(production.metrics_port, 9090);

        let development = ObservabilityConfig::default();
        assert!(development.is_development());
        assert!(development.samples_everything());
        assert_eq!(development.log_level, "debug");
    }
}
