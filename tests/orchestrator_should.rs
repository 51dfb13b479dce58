use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use hattrick::Error;
use hattrick::cache::ResolutionCache;
use hattrick::channel::Channel;
use hattrick::services::ResolutionOrchestrator;
use hattrick::services::resolver_services::{DynStreamResolver, MockStreamResolverTrait};

fn orchestrator(mock: MockStreamResolverTrait, cache: Arc<ResolutionCache>) -> ResolutionOrchestrator {
    ResolutionOrchestrator::new(Arc::new(mock) as DynStreamResolver, cache, None)
}

#[tokio::test]
async fn resolve_each_base_key_once() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut mock = MockStreamResolverTrait::new();
    mock.expect_resolve().times(1).returning({
        let calls = calls.clone();
        move |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok("https://cdn.example/uno/index.fmp4.m3u8?token=a".to_string())
        }
    });

    let cache = Arc::new(ResolutionCache::new());
    let results = orchestrator(mock, cache.clone())
        .resolve_all(vec![
            Channel::new("Sky Uno HD", "https://hattrick.ws/uno.htm"),
            Channel::new("Sky Uno (backup)", "https://hattrick.ws/uno2.htm"),
        ])
        .await;

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        cache.get("sky sport uno").await.as_deref(),
        Some("https://cdn.example/uno/index.fmp4.m3u8?token=a")
    );
    // both got the same address, only one survives
    assert_eq!(results.len(), 1);
}

#[tokio::test]
async fn serve_cache_hits_without_resolving() {
    let mut mock = MockStreamResolverTrait::new();
    mock.expect_resolve().times(0);

    let cache = Arc::new(ResolutionCache::new());
    cache
        .insert("sky sport calcio", "https://cdn.example/calcio/index.m3u8")
        .await;

    let results = orchestrator(mock, cache)
        .resolve_all(vec![Channel::new("calcio", "https://hattrick.ws/calcio.htm")])
        .await;

    assert_eq!(results.len(), 1);
    assert_eq!(
        results.channels()[0].stream_url.as_deref(),
        Some("https://cdn.example/calcio/index.m3u8")
    );
}

#[tokio::test]
async fn drop_duplicate_addresses_across_base_keys() {
    let mut mock = MockStreamResolverTrait::new();
    mock.expect_resolve()
        .times(3)
        .returning(|_| Ok("https://cdn.example/shared/index.m3u8".to_string()));

    let results = orchestrator(mock, Arc::new(ResolutionCache::new()))
        .resolve_all(vec![
            Channel::new("uno", "https://hattrick.ws/uno.htm"),
            Channel::new("calcio", "https://hattrick.ws/calcio.htm"),
            Channel::new("arena", "https://hattrick.ws/arena.htm"),
        ])
        .await;

    assert_eq!(results.len(), 1);
}

#[tokio::test]
async fn skip_failed_channels_and_keep_the_rest() {
    let mut mock = MockStreamResolverTrait::new();
    mock.expect_resolve().times(4).returning(|url| {
        if url.contains("calcio") {
            Err(Error::Timeout(Duration::from_secs(45)))
        } else if url.contains("arena") {
            Err(Error::NoStreamFound)
        } else if url.contains("tennis") {
            Err(Error::Context("target closed".to_string()))
        } else {
            Ok(format!("{}/index.m3u8", url))
        }
    });

    let results = orchestrator(mock, Arc::new(ResolutionCache::new()))
        .resolve_all(vec![
            Channel::new("uno", "https://hattrick.ws/uno"),
            Channel::new("calcio", "https://hattrick.ws/calcio"),
            Channel::new("arena", "https://hattrick.ws/arena"),
            Channel::new("tennis", "https://hattrick.ws/tennis"),
        ])
        .await;

    assert_eq!(results.len(), 1);
    assert_eq!(results.channels()[0].name, "Sky Sport Uno");
}

#[tokio::test]
async fn retry_a_base_key_when_its_first_resolution_failed() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut mock = MockStreamResolverTrait::new();
    mock.expect_resolve().times(2).returning({
        let calls = calls.clone();
        move |_| {
            if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(Error::NoStreamFound)
            } else {
                Ok("https://cdn.example/uno/index.m3u8".to_string())
            }
        }
    });

    let results = orchestrator(mock, Arc::new(ResolutionCache::new()))
        .resolve_all(vec![
            Channel::new("uno", "https://hattrick.ws/uno.htm"),
            Channel::new("uno hd", "https://hattrick.ws/uno-hd.htm"),
        ])
        .await;

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(results.len(), 1);
}

#[tokio::test]
async fn respect_the_concurrency_bound() {
    let running = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    struct SlowResolver {
        running: Arc<AtomicUsize>,
        peak: Arc<AtomicUsize>,
    }

    #[async_trait::async_trait]
    impl hattrick::services::resolver_services::StreamResolverTrait for SlowResolver {
        async fn resolve(&self, page_url: &str) -> hattrick::AppResult<String> {
            let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(30)).await;
            self.running.fetch_sub(1, Ordering::SeqCst);
            Ok(format!("{}/index.m3u8", page_url))
        }

        async fn shutdown(&self) {}
    }

    let resolver = Arc::new(SlowResolver {
        running: running.clone(),
        peak: peak.clone(),
    }) as DynStreamResolver;

    let channels = ["uno", "calcio", "arena", "tennis", "dazn", "max"]
        .iter()
        .map(|name| Channel::new(name, format!("https://hattrick.ws/{}", name)))
        .collect();

    let results = ResolutionOrchestrator::new(resolver, Arc::new(ResolutionCache::new()), Some(2))
        .resolve_all(channels)
        .await;

    assert_eq!(results.len(), 6);
    assert!(peak.load(Ordering::SeqCst) <= 2);
}

#[tokio::test]
async fn return_an_empty_set_for_no_channels() {
    let mut mock = MockStreamResolverTrait::new();
    mock.expect_resolve().times(0);

    let results = orchestrator(mock, Arc::new(ResolutionCache::new()))
        .resolve_all(Vec::new())
        .await;

    assert!(results.is_empty());
}
