//! # Ticket Checkout Discord Bot
//!
//! A Discord bot that walks a customer through a purchase inside a ticket
//! channel: product line, product, variant and payment method, backed by a
//! WooCommerce product catalog.

pub mod bot;
pub mod cache;
pub mod catalog;
pub mod channel_lock;
pub mod config;
pub mod errors;
pub mod observability;
pub mod observability_config;
pub mod selection;

// Re-export types for easier access
pub use catalog::{CatalogClient, Product, Variant, WooCommerceClient};
pub use selection::{Selection, SelectionStore, SelectionUpdate};
