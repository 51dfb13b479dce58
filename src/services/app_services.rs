use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};

use crate::{
    cache::ResolutionCache,
    config::AppConfig,
    error::AppResult,
};

use super::{
    channel_list_services::{ChannelListService, DynChannelListService},
    orchestrator_services::ResolutionOrchestrator,
    playlist_services::PlaylistWriter,
    resolver_services::{BrowserResolverLauncher, DynResolverLauncher},
};

/// how a run ended when nothing fatal happened
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// the playlist holds `channels` entries
    Written { channels: usize, path: PathBuf },
    /// the list page had no channel buttons, no browser was started
    NoChannels,
    /// every channel failed, nothing was written
    NothingFound,
}

#[derive(Clone)]
pub struct AppServices {
    pub channels: DynChannelListService,
    pub launcher: DynResolverLauncher,
    pub playlist: Arc<PlaylistWriter>,
    pub config: Arc<AppConfig>,
}

impl AppServices {
    pub fn new(config: Arc<AppConfig>) -> AppResult<Self> {
        info!("starting services...");

        let channels = Arc::new(ChannelListService::new(
            &config.source_url,
            config.list_timeout(),
        )?) as DynChannelListService;

        let launcher = Arc::new(BrowserResolverLauncher::new(config.clone())) as DynResolverLauncher;

        let playlist = Arc::new(PlaylistWriter::new(
            config.output_path.clone(),
            &config.logo_url,
            &config.group_title,
        ));

        Ok(Self {
            channels,
            launcher,
            playlist,
            config,
        })
    }

    /// list -> resolve -> write. Only the list fetch, the browser launch and the final write can
    /// fail the run, channels that don't resolve are just left out
    pub async fn run(&self) -> AppResult<RunOutcome> {
        let channels = self.channels.fetch_channels().await?;

        if channels.is_empty() {
            warn!("no channels found, nothing to do");
            return Ok(RunOutcome::NoChannels);
        }

        info!("{} channels found, starting browser pool", channels.len());
        let resolver = self.launcher.launch().await?;

        let orchestrator = ResolutionOrchestrator::new(
            resolver.clone(),
            Arc::new(ResolutionCache::new()),
            self.config.max_concurrent_resolutions,
        );
        let results = orchestrator.resolve_all(channels).await;

        // nothing between launch and here returns early
        resolver.shutdown().await;

        if results.is_empty() {
            warn!("no valid stream found");
            return Ok(RunOutcome::NothingFound);
        }

        self.playlist.write(results.channels()).await?;

        Ok(RunOutcome::Written {
            channels: results.len(),
            path: self.playlist.path().to_path_buf(),
        })
    }
}
