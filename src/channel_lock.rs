//! Per-channel mutual exclusion for interaction handling.
//!
//! Two clicks in the same ticket channel must not interleave their reads and
//! writes of that channel's selection while one of them is waiting on the
//! catalog. Each channel gets an async mutex; handlers for different channels
//! never wait on each other.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::selection::ChannelKey;

/// Registry of per-channel async locks
#[derive(Debug, Default)]
pub struct ChannelLocks {
    locks: Mutex<HashMap<ChannelKey, Arc<AsyncMutex<()>>>>,
}

/// Held for the duration of one interaction in one channel
pub type ChannelGuard = OwnedMutexGuard<()>;

impl ChannelLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until no other handler holds `channel`, then hold it.
    pub async fn acquire(&self, channel: ChannelKey) -> ChannelGuard {
        let lock = {
            let mut locks = self.locks.lock();
            // Drop locks nobody is holding or waiting on
            locks.retain(|key, lock| *key == channel || Arc::strong_count(lock) > 1);
            Arc::clone(locks.entry(channel).or_default())
        };
        lock.lock_owned().await
    }

    /// Number of channels with a live lock entry
    pub fn tracked_channels(&self) -> usize {
        self.locks.lock().len()
    }
}
