use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::{
    channel::Channel,
    error::{AppResult, Error},
};

pub struct PlaylistWriter {
    path: PathBuf,
    logo_url: String,
    group_title: String,
}

impl PlaylistWriter {
    pub fn new(path: impl Into<PathBuf>, logo_url: &str, group_title: &str) -> Self {
        Self {
            path: path.into(),
            logo_url: logo_url.to_string(),
            group_title: group_title.to_string(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// extended m3u, ids count from 1 in playlist order. Channels without an address are skipped
    pub fn render(&self, channels: &[Channel]) -> String {
        let mut out = String::from("#EXTM3U\n\n");

        let resolved = channels
            .iter()
            .filter_map(|c| c.stream_url.as_deref().map(|stream| (c, stream)));

        for (idx, (channel, stream)) in resolved.enumerate() {
            let _ = write!(
                out,
                "#EXTINF:-1 tvg-id=\"{}\" group-title=\"{}\" tvg-logo=\"{}\", {}\n{}\n\n",
                idx + 1,
                self.group_title,
                self.logo_url,
                channel.name,
                stream
            );
        }

        out
    }

    /// creates or truncates the file
    pub async fn write(&self, channels: &[Channel]) -> AppResult<()> {
        tokio::fs::write(&self.path, self.render(channels))
            .await
            .map_err(|source| Error::Write {
                path: self.path.display().to_string(),
                source,
            })?;

        info!("playlist written to {}", self.path.display());
        Ok(())
    }
}
