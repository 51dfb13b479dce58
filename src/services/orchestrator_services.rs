use std::sync::Arc;

use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::{
    cache::ResolutionCache,
    channel::{Channel, ResultSet},
};

use super::resolver_services::DynStreamResolver;

/// fans every channel out to its own task and folds whatever resolves into a deduplicated set.
/// One channel failing never affects the others
pub struct ResolutionOrchestrator {
    resolver: DynStreamResolver,
    cache: Arc<ResolutionCache>,
    limiter: Option<Arc<Semaphore>>,
}

impl ResolutionOrchestrator {
    /// `max_concurrent` gates only the cache misses, None keeps the fan-out unbounded
    pub fn new(
        resolver: DynStreamResolver,
        cache: Arc<ResolutionCache>,
        max_concurrent: Option<usize>,
    ) -> Self {
        Self {
            resolver,
            cache,
            limiter: max_concurrent
                .filter(|n| *n > 0)
                .map(|n| Arc::new(Semaphore::new(n))),
        }
    }

    pub async fn resolve_all(&self, channels: Vec<Channel>) -> ResultSet {
        let (tx, mut rx) = mpsc::unbounded_channel::<Channel>();
        let mut join_set = JoinSet::new();

        info!("resolving {} channels", channels.len());

        for channel in channels {
            let resolver = self.resolver.clone();
            let cache = self.cache.clone();
            let limiter = self.limiter.clone();
            let tx = tx.clone();

            join_set.spawn(async move {
                if let Some(resolved) = process_channel(channel, resolver, cache, limiter).await {
                    let _ = tx.send(resolved);
                }
            });
        }

        // the channel closes once the last task drops its sender
        drop(tx);

        let mut results = ResultSet::default();
        while let Some(channel) = rx.recv().await {
            let name = channel.name.clone();
            if !results.push(channel) {
                debug!("{} duplicates an address already in the playlist, skipped", name);
            }
        }

        while let Some(joined) = join_set.join_next().await {
            if let Err(e) = joined {
                error!("resolution task panicked: {}", e);
            }
        }

        info!("{} unique streams resolved", results.len());
        results
    }
}

async fn process_channel(
    channel: Channel,
    resolver: DynStreamResolver,
    cache: Arc<ResolutionCache>,
    limiter: Option<Arc<Semaphore>>,
) -> Option<Channel> {
    info!("-> {} ({})", channel.name, channel.page_url);

    if let Some(stream) = cache.get(&channel.base_key).await {
        info!("{} - cached", channel.name);
        return Some(channel.with_stream(stream));
    }

    // mirrors of this channel wait here for the first one to finish
    let _key_guard = cache.lock_key(&channel.base_key).await;
    if let Some(stream) = cache.get(&channel.base_key).await {
        info!("{} - cached", channel.name);
        return Some(channel.with_stream(stream));
    }

    let _permit = match limiter {
        Some(limiter) => Some(limiter.acquire_owned().await.ok()?),
        None => None,
    };

    match resolver.resolve(&channel.page_url).await {
        Ok(stream) => {
            info!("{} - found {}", channel.name, stream);
            cache.insert(&channel.base_key, &stream).await;
            Some(channel.with_stream(stream))
        }
        Err(e) => {
            warn!("{} - {}", channel.name, e);
            None
        }
    }
}
