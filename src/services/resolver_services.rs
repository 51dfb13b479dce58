// everything that turns a channel page into a stream address. The browser side lives in
// crate::browser, this is the part that decides what counts as the stream
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mockall::automock;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::{
    browser::{BrowserPool, BrowsingContext, RequestHook, find_chrome},
    config::AppConfig,
    error::{AppResult, Error},
    utils::stream_url_utils::{
        is_potential_stream, manifest_candidates, rewrite_host, transform,
    },
};

pub type DynStreamResolver = Arc<dyn StreamResolverTrait + Send + Sync>;
pub type DynResolverLauncher = Arc<dyn ResolverLauncherTrait + Send + Sync>;

/// the embeds only hand out the player to mobile safari
pub const MOBILE_USER_AGENT: &str =
    "Mozilla/5.0 (iPhone; CPU iPhone OS 16_0 like Mac OS X) AppleWebKit/605.1.15";

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

#[automock]
#[async_trait]
pub trait StreamResolverTrait {
    /// stream address for one channel page
    async fn resolve(&self, page_url: &str) -> AppResult<String>;

    /// release whatever the resolver holds, called once at the end of a run
    async fn shutdown(&self);
}

#[automock]
#[async_trait]
pub trait ResolverLauncherTrait {
    /// start the resolver backend, the pool in the real one
    async fn launch(&self) -> AppResult<DynStreamResolver>;
}

#[derive(Clone, Debug)]
pub struct ResolverSettings {
    pub navigation_timeout: Duration,
    pub grace_period: Duration,
    pub verify_manifests: bool,
    pub mirror_host: Option<String>,
}

impl From<&AppConfig> for ResolverSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            navigation_timeout: config.navigation_timeout(),
            grace_period: config.grace_period(),
            verify_manifests: config.verify_manifests,
            mirror_host: config.mirror_host.clone(),
        }
    }
}

/// plausible stream urls in the order they were seen, shared between the request hook and the
/// frame scan of one resolution
#[derive(Clone, Default)]
pub struct CandidateList(Arc<Mutex<Vec<String>>>);

impl CandidateList {
    pub fn push(&self, url: String) {
        self.0.lock().push(url);
    }

    pub fn len(&self) -> usize {
        self.0.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.lock().is_empty()
    }

    /// any manifest first, otherwise whatever showed up first
    pub fn select(&self) -> Option<String> {
        let candidates = self.0.lock();
        candidates
            .iter()
            .find(|url| url.contains(".m3u8"))
            .or_else(|| candidates.first())
            .cloned()
    }
}

/// manifest requests go straight to `found` (first one wins, the rest are dropped), anything else
/// that looks like a stream is kept as a candidate
pub fn request_observer(candidates: CandidateList, found: mpsc::Sender<String>) -> RequestHook {
    Arc::new(move |url: &str| {
        if url.contains(".m3u8") {
            let _ = found.try_send(url.to_string());
        } else if is_potential_stream(url) {
            candidates.push(url.to_string());
        }
    })
}

#[derive(Debug, PartialEq, Eq)]
pub enum RaceOutcome {
    Found(String),
    GraceElapsed,
    DeadlineReached,
}

/// waits for whichever comes first, an already queued manifest always wins
pub async fn race_early_exit(
    found: &mut mpsc::Receiver<String>,
    grace: Duration,
    deadline: Instant,
) -> RaceOutcome {
    tokio::select! {
        biased;
        Some(url) = found.recv() => RaceOutcome::Found(url),
        _ = tokio::time::sleep_until(deadline) => RaceOutcome::DeadlineReached,
        _ = tokio::time::sleep(grace) => RaceOutcome::GraceElapsed,
    }
}

/// frames on the provider's own cdn first, they're the ones carrying the real token
pub fn prioritize_frames(frames: Vec<String>) -> Vec<String> {
    let (mut preferred, rest): (Vec<String>, Vec<String>) = frames
        .into_iter()
        .filter(|url| !url.is_empty() && url != "about:blank")
        .partition(|url| url.contains("planetary") || url.contains("lovecdn"));
    preferred.extend(rest);
    preferred
}

pub struct BrowserStreamResolver {
    pool: Arc<BrowserPool>,
    settings: ResolverSettings,
    http_client: reqwest::Client,
}

impl BrowserStreamResolver {
    pub fn new(pool: Arc<BrowserPool>, settings: ResolverSettings) -> Self {
        let http_client = reqwest::Client::builder()
            .user_agent(MOBILE_USER_AGENT)
            .timeout(PROBE_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            pool,
            settings,
            http_client,
        }
    }

    async fn drive(
        &self,
        context: &BrowsingContext,
        page_url: &str,
        deadline: Instant,
    ) -> AppResult<String> {
        let candidates = CandidateList::default();
        let (found_tx, mut found_rx) = mpsc::channel(1);

        context
            .intercept(request_observer(candidates.clone(), found_tx))
            .await
            .map_err(Error::context)?;

        // a manifest request can show up long before the load event does
        tokio::select! {
            biased;
            Some(url) = found_rx.recv() => return Ok(url),
            navigation = context.navigate(page_url, self.settings.navigation_timeout) => {
                // not fatal, the hook may already have seen what we need
                if let Err(e) = navigation {
                    debug!("navigation to {} did not complete: {}", page_url, e);
                }
            }
        }

        match race_early_exit(&mut found_rx, self.settings.grace_period, deadline).await {
            RaceOutcome::Found(url) => return Ok(url),
            RaceOutcome::DeadlineReached => {
                return Err(Error::Timeout(self.settings.navigation_timeout));
            }
            RaceOutcome::GraceElapsed => {}
        }

        let frames = match context.frame_urls().await {
            Ok(frames) => frames,
            Err(e) => {
                warn!("could not list frames of {}: {}", page_url, e);
                Vec::new()
            }
        };

        for frame in prioritize_frames(frames.clone()) {
            debug!("frame: {}", frame);
            if is_potential_stream(&frame) {
                candidates.push(self.manifest_for(&frame).await);
            }
        }

        // iframes that are still blank or were blocked only show up in the document
        let sources = match context.iframe_sources().await {
            Ok(sources) => sources,
            Err(e) => {
                debug!("could not read iframes of {}: {}", page_url, e);
                Vec::new()
            }
        };

        for src in sources {
            if frames.contains(&src) || !is_potential_stream(&src) {
                continue;
            }
            debug!("iframe src: {}", src);
            candidates.push(self.manifest_for(&src).await);
        }

        debug!("{} candidates for {}", candidates.len(), page_url);
        candidates.select().ok_or(Error::NoStreamFound)
    }

    /// canonical manifest for a frame address, optionally checking which name actually answers
    async fn manifest_for(&self, frame_url: &str) -> String {
        if !self.settings.verify_manifests {
            return transform(frame_url);
        }

        let candidates = manifest_candidates(frame_url);
        for candidate in &candidates {
            if self.is_reachable(candidate).await {
                return candidate.clone();
            }
        }

        // nothing answered, keep the usual guess
        candidates
            .into_iter()
            .next()
            .unwrap_or_else(|| frame_url.to_string())
    }

    async fn is_reachable(&self, url: &str) -> bool {
        match self.http_client.get(url).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!("probe of {} failed: {}", url, e);
                false
            }
        }
    }
}

#[async_trait]
impl StreamResolverTrait for BrowserStreamResolver {
    async fn resolve(&self, page_url: &str) -> AppResult<String> {
        let deadline = Instant::now() + self.settings.navigation_timeout;
        let browser = self.pool.lend();
        debug!("resolving {} on browser {}", page_url, browser.id());

        let timed_out = || Error::Timeout(self.settings.navigation_timeout);

        let context = tokio::time::timeout_at(deadline, browser.new_context(MOBILE_USER_AGENT))
            .await
            .map_err(|_| timed_out())?
            .map_err(Error::context)?;

        // the deadline covers the frame scan and manifest checks too, closing happens regardless
        let outcome = tokio::time::timeout_at(deadline, self.drive(&context, page_url, deadline))
            .await
            .unwrap_or_else(|_| Err(timed_out()));
        context.close().await;
        let stream = outcome?;

        Ok(match &self.settings.mirror_host {
            Some(host) => rewrite_host(&stream, host),
            None => stream,
        })
    }

    async fn shutdown(&self) {
        self.pool.shutdown().await;
    }
}

pub struct BrowserResolverLauncher {
    config: Arc<AppConfig>,
}

impl BrowserResolverLauncher {
    pub fn new(config: Arc<AppConfig>) -> Self {
        Self { config }
    }
}

#[async_trait]
impl ResolverLauncherTrait for BrowserResolverLauncher {
    async fn launch(&self) -> AppResult<DynStreamResolver> {
        let chrome = find_chrome(self.config.chrome_path.as_deref()).map_err(Error::launch)?;
        let pool = BrowserPool::create(self.config.pool_size, &chrome)
            .await
            .map_err(Error::launch)?;

        info!("browser pool started with {} browsers", pool.size());

        Ok(Arc::new(BrowserStreamResolver::new(
            Arc::new(pool),
            ResolverSettings::from(self.config.as_ref()),
        )) as DynStreamResolver)
    }
}
