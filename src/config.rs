//! # Unified Application Configuration
//!
//! Centralized configuration for the checkout bot. Every section is loaded
//! from environment variables (after `.env` has been read by `dotenvy`) and
//! validated before the Discord client is started.

use crate::errors::{AppError, AppResult};
use crate::observability_config::ObservabilityConfig;
use serde::{Deserialize, Serialize};
use std::env;

/// Discord bot settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    /// Discord bot token
    pub token: String,
    /// Category whose new channels are treated as purchase tickets
    pub ticket_category_id: u64,
    /// Register slash commands globally when the gateway reports ready
    pub register_commands: bool,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            ticket_category_id: 0,
            register_commands: true,
        }
    }
}

impl BotConfig {
    /// Validate bot configuration
    pub fn validate(&self) -> AppResult<()> {
        if self.token.trim().is_empty() {
            return Err(AppError::Config("Bot token cannot be empty".to_string()));
        }

        // Discord tokens are three dot-separated segments
        if self.token.split('.').count() != 3 {
            return Err(AppError::Config(
                "Bot token format is invalid. Expected three dot-separated segments".to_string(),
            ));
        }

        if self.ticket_category_id == 0 {
            return Err(AppError::Config(
                "Ticket category id must be a non-zero snowflake".to_string(),
            ));
        }

        Ok(())
    }
}

/// Catalog (WooCommerce REST API) settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Store base URL, e.g. `https://shop.example.com`
    pub base_url: String,
    /// REST API consumer key
    pub consumer_key: String,
    /// REST API consumer secret
    pub consumer_secret: String,
    /// REST API version prefix
    pub api_version: String,
    /// HTTP client timeout in seconds
    pub http_timeout_secs: u64,
    /// Products requested per search; a select menu holds at most 25 options
    pub search_page_size: u32,
    /// Variations requested per product
    pub variations_page_size: u32,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            consumer_key: String::new(),
            consumer_secret: String::new(),
            api_version: "wc/v3".to_string(),
            http_timeout_secs: 30,
            search_page_size: 20,
            variations_page_size: 100,
        }
    }
}

impl CatalogConfig {
    /// Validate catalog configuration
    pub fn validate(&self) -> AppResult<()> {
        if self.base_url.trim().is_empty() {
            return Err(AppError::Config("Catalog URL cannot be empty".to_string()));
        }

        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(AppError::Config(
                "Catalog URL must start with 'http://' or 'https://'".to_string(),
            ));
        }

        if self.consumer_key.trim().is_empty() || self.consumer_secret.trim().is_empty() {
            return Err(AppError::Config(
                "Catalog consumer key and secret are required".to_string(),
            ));
        }

        if self.api_version.trim().is_empty() {
            return Err(AppError::Config("Catalog API version cannot be empty".to_string()));
        }

        if self.http_timeout_secs == 0 {
            return Err(AppError::Config("HTTP timeout cannot be 0".to_string()));
        }

        if self.http_timeout_secs > 300 {
            return Err(AppError::Config(
                "HTTP timeout cannot be greater than 300 seconds".to_string(),
            ));
        }

        if !(1..=25).contains(&self.search_page_size) {
            return Err(AppError::Config(
                "Search page size must be between 1 and 25".to_string(),
            ));
        }

        if !(1..=100).contains(&self.variations_page_size) {
            return Err(AppError::Config(
                "Variations page size must be between 1 and 100".to_string(),
            ));
        }

        Ok(())
    }
}

/// In-memory selection state settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionConfig {
    /// Idle time after which an abandoned selection is evicted
    pub ttl_secs: u64,
    /// How often the background sweeper evicts expired selections
    pub sweep_interval_secs: u64,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 3600,          // 1 hour
            sweep_interval_secs: 300, // 5 minutes
        }
    }
}

impl SelectionConfig {
    /// Validate selection configuration
    pub fn validate(&self) -> AppResult<()> {
        if self.ttl_secs == 0 {
            return Err(AppError::Config("Selection TTL cannot be 0".to_string()));
        }

        if self.sweep_interval_secs == 0 {
            return Err(AppError::Config(
                "Selection sweep interval cannot be 0".to_string(),
            ));
        }

        if self.sweep_interval_secs > self.ttl_secs {
            return Err(AppError::Config(
                "Selection sweep interval cannot be longer than the selection TTL".to_string(),
            ));
        }

        Ok(())
    }
}

/// Unified application configuration
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    /// Bot configuration
    pub bot: BotConfig,
    /// Catalog configuration
    pub catalog: CatalogConfig,
    /// Selection store configuration
    pub selection: SelectionConfig,
    /// Observability configuration
    pub observability: ObservabilityConfig,
}

fn required_var(key: &str) -> AppResult<String> {
    env::var(key)
        .map_err(|_| AppError::Config(format!("{} environment variable is required", key)))
}

fn parsed_var<T: std::str::FromStr>(key: &str, default: &str) -> AppResult<T> {
    env::var(key)
        .unwrap_or_else(|_| default.to_string())
        .trim()
        .parse()
        .map_err(|_| AppError::Config(format!("{} must be a valid number", key)))
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> AppResult<Self> {
        let mut config = Self::default();

        // Load bot configuration
        config.bot.token = required_var("DISCORD_TOKEN")?;
        config.bot.ticket_category_id = required_var("TICKET_CATEGORY_ID")?
            .trim()
            .parse()
            .map_err(|_| {
                AppError::Config("TICKET_CATEGORY_ID must be a numeric channel id".to_string())
            })?;
        config.bot.register_commands = env::var("REGISTER_COMMANDS")
            .unwrap_or_else(|_| "true".to_string())
            .to_lowercase()
            == "true";

        // Load catalog configuration
        config.catalog.base_url = required_var("WOOCOMMERCE_URL")?;
        config.catalog.consumer_key = required_var("WOOCOMMERCE_CONSUMER_KEY")?;
        config.catalog.consumer_secret = required_var("WOOCOMMERCE_CONSUMER_SECRET")?;
        config.catalog.api_version =
            env::var("WOOCOMMERCE_VERSION").unwrap_or_else(|_| "wc/v3".to_string());
        config.catalog.http_timeout_secs = parsed_var("HTTP_CLIENT_TIMEOUT_SECS", "30")?;
        config.catalog.search_page_size = parsed_var("CATALOG_SEARCH_PAGE_SIZE", "20")?;
        config.catalog.variations_page_size = parsed_var("CATALOG_VARIATIONS_PAGE_SIZE", "100")?;

        // Load selection configuration
        config.selection.ttl_secs = parsed_var("SELECTION_TTL_SECS", "3600")?;
        config.selection.sweep_interval_secs = parsed_var("SELECTION_SWEEP_INTERVAL_SECS", "300")?;

        config.observability = ObservabilityConfig::from_env();

        Ok(config)
    }

    /// Validate all configuration sections
    pub fn validate(&self) -> AppResult<()> {
        self.bot.validate()?;
        self.catalog.validate()?;
        self.selection.validate()?;
        self.observability.validate()?;
        Ok(())
    }

    /// Get a summary of the current configuration for logging
    pub fn summary(&self) -> String {
        format!(
            "Configuration: bot_token=[REDACTED], ticket_category_id={}, catalog_url={}, catalog_version={}, consumer_secret=[REDACTED], selection_ttl_secs={}, metrics_port={}",
            self.bot.ticket_category_id,
            self.catalog.base_url,
            self.catalog.api_version,
            self.selection.ttl_secs,
            self.observability.metrics_port
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_bot_config() -> BotConfig {
        BotConfig {
            token: "MTIzNDU2Nzg5MDEyMzQ1Njc4.GhIjKl.fake-signature-for-tests".to_string(),
            ticket_category_id: 1_100_000_000_000_000_001,
            register_commands: true,
        }
    }

    fn valid_catalog_config() -> CatalogConfig {
        CatalogConfig {
            base_url: "https://shop.example.com".to_string(),
            consumer_key: "ck_test".to_string(),
            consumer_secret: "cs_test".to_string(),
            ..CatalogConfig::default()
        }
    }

    #[test]
    fn test_default_config_validation() {
        // Default config lacks tokens and URLs, so it must not validate
        assert!(AppConfig::default().validate().is_err());
    }

    #[test]
    fn test_bot_config_validation() {
        let mut config = BotConfig::default();

        // Invalid: empty token
        assert!(config.validate().is_err());

        // Invalid: malformed token
        config.token = "not-a-discord-token".to_string();
        assert!(config.validate().is_err());

        config = valid_bot_config();
        assert!(config.validate().is_ok());

        // Invalid: missing category
        config.ticket_category_id = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_catalog_config_validation() {
        let mut config = CatalogConfig::default();
        assert!(config.validate().is_err());

        config = valid_catalog_config();
        assert!(config.validate().is_ok());

        config.base_url = "ftp://shop.example.com".to_string();
        assert!(config.validate().is_err());
        config.base_url = "https://shop.example.com".to_string();

        config.consumer_secret = " ".to_string();
        assert!(config.validate().is_err());
        config.consumer_secret = "cs_test".to_string();

        config.http_timeout_secs = 0;
        assert!(config.validate().is_err());
        config.http_timeout_secs = 301;
        assert!(config.validate().is_err());
        config.http_timeout_secs = 30;

        config.search_page_size = 26;
        assert!(config.validate().is_err());
        config.search_page_size = 20;

        config.variations_page_size = 0;
        assert!(config.validate().is_err());
        config.variations_page_size = 100;

        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_selection_config_validation() {
        let mut config = SelectionConfig::default();
        assert!(config.validate().is_ok());

        config.ttl_secs = 0;
        assert!(config.validate().is_err());

        config.ttl_secs = 60;
        config.sweep_interval_secs = 120;
        assert!(config.validate().is_err());

        config.sweep_interval_secs = 30;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_summary_redacts_secrets() {
        let config = AppConfig {
            bot: valid_bot_config(),
            catalog: valid_catalog_config(),
            ..AppConfig::default()
        };

        let summary = config.summary();
        assert!(!summary.contains("cs_test"));
        assert!(!summary.contains("fake-signature"));
        assert!(summary.contains("shop.example.com"));
    }
}
