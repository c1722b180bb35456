//! Per-channel selection state for the purchase flow.
//!
//! A selection records the product (and, for variable products, the
//! variant) chosen in one ticket channel. Entries are created lazily, cleared
//! when the flow ends, and expire after an idle TTL so abandoned tickets do
//! not accumulate.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::cache::{Cache, CacheStats, MemoryCache};
use crate::catalog::{Product, Variant};
use crate::observability;

/// Discord channel id the selection belongs to
pub type ChannelKey = u64;

/// Shared handle to one channel's selection
pub type SelectionHandle = Arc<Mutex<Selection>>;

/// The in-progress product/variant choice for a channel
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    pub product: Option<Product>,
    pub variant: Option<Variant>,
}

impl Selection {
    /// Line describing the chosen item, e.g. `CS2 Prime - EU`
    pub fn item_label(&self) -> Option<String> {
        let product = self.product.as_ref()?;
        Some(match &self.variant {
            Some(variant) => format!("{} - {}", product.name, variant.display_name()),
            None => product.name.clone(),
        })
    }

    /// Price of the variant when one is chosen, otherwise of the product
    pub fn price(&self) -> Option<&str> {
        self.variant
            .as_ref()
            .map(|v| v.price.as_str())
            .or_else(|| self.product.as_ref().map(|p| p.price.as_str()))
    }

    /// Checkout link of the variant when it has one, otherwise of the product
    pub fn permalink(&self) -> Option<&str> {
        self.variant
            .as_ref()
            .map(|v| v.permalink.as_str())
            .filter(|link| !link.is_empty())
            .or_else(|| self.product.as_ref().map(|p| p.permalink.as_str()))
    }
}

/// Partial update applied by [`SelectionStore::set`]
#[derive(Debug, Clone)]
pub enum SelectionUpdate {
    /// Choose a product; any previously chosen variant is dropped
    Product(Product),
    /// Choose a variant of the current product
    Variant(Variant),
}

/// Channel-keyed store of selections over an injectable cache backend
pub struct SelectionStore<B = MemoryCache<ChannelKey, SelectionHandle>> {
    backend: B,
    ttl: Duration,
}

impl SelectionStore {
    /// Store backed by an in-memory TTL cache
    pub fn in_memory(ttl: Duration) -> Self {
        Self::with_backend(MemoryCache::new(), ttl)
    }
}

impl<B> SelectionStore<B>
where
    B: Cache<ChannelKey, SelectionHandle>,
{
    pub fn with_backend(backend: B, ttl: Duration) -> Self {
        Self { backend, ttl }
    }

    /// Return the channel's selection, creating an empty one on first use.
    ///
    /// Repeated calls return the same handle until the entry is cleared or
    /// expires. Each call refreshes the entry's TTL.
    pub fn get_or_create(&self, channel: ChannelKey) -> SelectionHandle {
        self.backend
            .get_or_insert_with(channel, self.ttl, &|| Arc::new(Mutex::new(Selection::default())))
    }

    /// Snapshot of the channel's selection, if any
    pub fn get(&self, channel: ChannelKey) -> Option<Selection> {
        self.backend
            .get(&channel)
            .map(|handle| handle.lock().clone())
    }

    /// Apply a partial update, creating the entry when needed.
    ///
    /// A variant update is rejected (returns `false`) unless the stored
    /// product is the variant's parent.
    pub fn set(&self, channel: ChannelKey, update: SelectionUpdate) -> bool {
        let handle = self.get_or_create(channel);
        let mut selection = handle.lock();

        match update {
            SelectionUpdate::Product(product) => {
                selection.product = Some(product);
                selection.variant = None;
                true
            }
            SelectionUpdate::Variant(variant) => match &selection.product {
                Some(product) if product.has_variations() && product.id == variant.product_id => {
                    selection.variant = Some(variant);
                    true
                }
                _ => false,
            },
        }
    }

    /// Remove the channel's selection, returning whether one existed
    pub fn clear(&self, channel: ChannelKey) -> bool {
        self.backend.remove(&channel).is_some()
    }

    pub fn contains(&self, channel: ChannelKey) -> bool {
        self.backend.get(&channel).is_some()
    }

    /// Evict selections idle for longer than the TTL
    pub fn evict_expired(&self) -> usize {
        self.backend.cleanup()
    }

    pub fn len(&self) -> usize {
        self.backend.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backend.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.backend.stats()
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }
}

/// Periodically evict expired selections and report the store size.
pub fn spawn_sweeper<B>(store: Arc<SelectionStore<B>>, interval: Duration) -> JoinHandle<()>
where
    B: Cache<ChannelKey, SelectionHandle> + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The first tick completes immediately
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let evicted = store.evict_expired();
            if evicted > 0 {
                debug!(
                    evicted,
                    remaining = store.len(),
                    hit_rate = store.stats().hit_rate,
                    "Evicted idle selections"
                );
                observability::record_selection_evictions(evicted);
            }
            observability::record_selection_store_size(store.len());
        }
    })
}
