//! # Application Error Types
//!
//! Common error types used throughout the checkout bot. Catalog failures,
//! missing catalog records and Discord API failures are kept apart so the
//! flow controller can decide which ones halt a step and which ones degrade.

use std::fmt;

/// General application error type for consistent error handling
#[derive(Debug, Clone, PartialEq)]
pub enum AppError {
    /// Configuration validation errors
    Config(String),
    /// Catalog API errors (network failure or non-2xx response)
    Catalog(String),
    /// A catalog record that should exist was not returned
    NotFound(String),
    /// Discord API errors
    Discord(String),
    /// Internal application errors
    Internal(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(msg) => write!(f, "[CONFIG] {}", msg),
            AppError::Catalog(msg) => write!(f, "[CATALOG] {}", msg),
            AppError::NotFound(msg) => write!(f, "[NOT_FOUND] {}", msg),
            AppError::Discord(msg) => write!(f, "[DISCORD] {}", msg),
            AppError::Internal(msg) => write!(f, "[INTERNAL] {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::Catalog(err.to_string())
    }
}

impl From<serenity::Error> for AppError {
    fn from(err: serenity::Error) -> Self {
        AppError::Discord(err.to_string())
    }
}

/// Result type alias for convenience
pub type AppResult<T> = Result<T, AppError>;

/// Standardized error logging utilities for consistent error reporting across the application
pub mod error_logging {
    use tracing::error;

    /// Log catalog API errors with request context
    pub fn log_catalog_error(
        error: &impl std::fmt::Display,
        operation: &str,
        product_id: Option<u64>,
        variant_id: Option<u64>,
    ) {
        error!(
            error = %error,
            operation = %operation,
            product_id = ?product_id,
            variant_id = ?variant_id,
            "Catalog request failed"
        );
    }

    /// Log Discord API errors with channel context
    pub fn log_discord_error(error: &impl std::fmt::Display, operation: &str, channel_id: u64) {
        error!(
            error = %error,
            operation = %operation,
            channel_id = %channel_id,
            "Discord operation failed"
        );
    }

    /// Log purchase flow errors with interaction context
    pub fn log_flow_error(
        error: &impl std::fmt::Display,
        action: &str,
        channel_id: u64,
        user_id: Option<u64>,
    ) {
        error!(
            error = %error,
            action = %action,
            channel_id = %channel_id,
            user_id = ?user_id,
            "Purchase flow step failed"
        );
    }
}
