use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

/// base key -> stream address for the length of one run. Nothing is ever evicted and the first
/// address stored for a key is the one that sticks
#[derive(Default)]
pub struct ResolutionCache {
    entries: RwLock<HashMap<String, String>>,
    // one async lock per base key so mirrors of the same channel wait on a single resolution
    inflight: parking_lot::Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl ResolutionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, base_key: &str) -> Option<String> {
        self.entries.read().await.get(base_key).cloned()
    }

    pub async fn insert(&self, base_key: &str, stream_url: &str) {
        self.entries
            .write()
            .await
            .entry(base_key.to_string())
            .or_insert_with(|| stream_url.to_string());
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// held for the whole cache-miss path of a key
    pub async fn lock_key(&self, base_key: &str) -> OwnedMutexGuard<()> {
        let lock = self
            .inflight
            .lock()
            .entry(base_key.to_string())
            .or_default()
            .clone();
        lock.lock_owned().await
    }
}
