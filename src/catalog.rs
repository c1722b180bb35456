//! Catalog client for the store's WooCommerce REST API.
//!
//! `search_products` and `get_product` propagate failures to the caller.
//! The variation lookups are secondary and degrade instead: a failed list is
//! empty, a failed detail fetch is `None`. Both are logged.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::Instrument;

use crate::config::CatalogConfig;
use crate::errors::{error_logging, AppError, AppResult};
use crate::observability;

/// A published product as returned by the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub price: String,
    #[serde(default)]
    pub permalink: String,
    /// Ids of this product's variations; empty for simple products
    #[serde(default)]
    pub variations: Vec<u64>,
}

impl Product {
    pub fn has_variations(&self) -> bool {
        !self.variations.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariationAttribute {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub option: String,
}

/// A single variation of a product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variant {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub price: String,
    #[serde(default)]
    pub permalink: String,
    /// Parent product id. Older API versions omit it, in which case the
    /// client fills it in from the request path.
    #[serde(default, alias = "parent_id")]
    pub product_id: u64,
    #[serde(default)]
    pub attributes: Vec<VariationAttribute>,
}

impl Variant {
    /// Name shown to users; falls back to the attribute options when the
    /// API does not send a variation name.
    pub fn display_name(&self) -> String {
        if !self.name.trim().is_empty() {
            return self.name.clone();
        }

        let options: Vec<&str> = self
            .attributes
            .iter()
            .map(|attr| attr.option.as_str())
            .filter(|option| !option.is_empty())
            .collect();

        if options.is_empty() {
            format!("Variant #{}", self.id)
        } else {
            options.join(", ")
        }
    }
}

/// Read-only access to the product catalog
#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// Search published products by term (single bounded page)
    async fn search_products(&self, term: &str) -> AppResult<Vec<Product>>;

    /// Fetch one product; `Ok(None)` when the catalog has no such product
    async fn get_product(&self, product_id: u64) -> AppResult<Option<Product>>;

    /// List a product's variations, empty on any failure
    async fn list_variations(&self, product_id: u64) -> Vec<Variant>;

    /// Fetch one variation of a product, `None` on any failure
    async fn get_variation(&self, product_id: u64, variant_id: u64) -> Option<Variant>;
}

/// HTTP client for the WooCommerce REST API
#[derive(Clone)]
pub struct WooCommerceClient {
    client: Client,
    api_root: String,
    consumer_key: String,
    consumer_secret: String,
    search_page_size: u32,
    variations_page_size: u32,
}

impl WooCommerceClient {
    pub fn new(config: &CatalogConfig) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_root: format!(
                "{}/wp-json/{}",
                config.base_url.trim_end_matches('/'),
                config.api_version.trim_matches('/')
            ),
            consumer_key: config.consumer_key.clone(),
            consumer_secret: config.consumer_secret.clone(),
            search_page_size: config.search_page_size,
            variations_page_size: config.variations_page_size,
        })
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> AppResult<T> {
        let url = format!("{}/{}", self.api_root, path);
        let resp = self
            .client
            .get(&url)
            .basic_auth(&self.consumer_key, Some(&self.consumer_secret))
            .query(query)
            .send()
            .await?;

        match resp.status() {
            status if status.is_success() => Ok(resp.json().await?),
            StatusCode::NOT_FOUND => Err(AppError::NotFound(path.to_string())),
            status => Err(AppError::Catalog(format!(
                "Request to {} failed: {}",
                path, status
            ))),
        }
    }

    /// Run a catalog request under a span and record its outcome
    async fn timed<T, F>(&self, operation: &'static str, request: F) -> AppResult<T>
    where
        F: std::future::Future<Output = AppResult<T>>,
    {
        let start = Instant::now();
        let result = request
            .instrument(observability::catalog_span(operation))
            .await;
        observability::record_catalog_request(operation, result.is_ok(), start.elapsed());
        result
    }
}

#[async_trait]
impl CatalogClient for WooCommerceClient {
    async fn search_products(&self, term: &str) -> AppResult<Vec<Product>> {
        let query = [
            ("search", term.to_string()),
            ("page", "1".to_string()),
            ("per_page", self.search_page_size.to_string()),
            ("status", "publish".to_string()),
        ];

        self.timed("search_products", self.get("products", &query))
            .await
            .inspect_err(|e| error_logging::log_catalog_error(e, "search_products", None, None))
    }

    async fn get_product(&self, product_id: u64) -> AppResult<Option<Product>> {
        let path = format!("products/{}", product_id);
        match self.timed("get_product", self.get(&path, &[])).await {
            Ok(product) => Ok(Some(product)),
            Err(AppError::NotFound(_)) => Ok(None),
            Err(e) => {
                error_logging::log_catalog_error(&e, "get_product", Some(product_id), None);
                Err(e)
            }
        }
    }

    async fn list_variations(&self, product_id: u64) -> Vec<Variant> {
        let path = format!("products/{}/variations", product_id);
        let query = [("per_page", self.variations_page_size.to_string())];

        match self
            .timed::<Vec<Variant>, _>("list_variations", self.get(&path, &query))
            .await
        {
            Ok(variants) => variants
                .into_iter()
                .map(|variant| with_parent(variant, product_id))
                .collect(),
            Err(e) => {
                error_logging::log_catalog_error(&e, "list_variations", Some(product_id), None);
                Vec::new()
            }
        }
    }

    async fn get_variation(&self, product_id: u64, variant_id: u64) -> Option<Variant> {
        let path = format!("products/{}/variations/{}", product_id, variant_id);

        match self
            .timed::<Variant, _>("get_variation", self.get(&path, &[]))
            .await
        {
            Ok(variant) => Some(with_parent(variant, product_id)),
            Err(e) => {
                error_logging::log_catalog_error(
                    &e,
                    "get_variation",
                    Some(product_id),
                    Some(variant_id),
                );
                None
            }
        }
    }
}

fn with_parent(mut variant: Variant, product_id: u64) -> Variant {
    if variant.product_id == 0 {
        variant.product_id = product_id;
    }
    variant
}
