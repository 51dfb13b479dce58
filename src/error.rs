use std::time::Duration;

use thiserror::Error;

use crate::browser::BrowserError;

pub type AppResult<T> = Result<T, Error>;

/// run-fatal: ListFetch, Launch, Write
/// per channel (logged and skipped): Context, Timeout, NoStreamFound
#[derive(Error, Debug)]
pub enum Error {
    #[error("channel list unavailable: {0}")]
    ListFetch(String),

    #[error("browser pool failed to start: {0}")]
    Launch(String),

    #[error("browsing context failed: {0}")]
    Context(String),

    #[error("no stream observed within {0:?}")]
    Timeout(Duration),

    #[error("no stream found")]
    NoStreamFound,

    #[error("could not write playlist {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// whether this error should stop the whole run instead of a single channel
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::ListFetch(_) | Self::Launch(_) | Self::Write { .. }
        )
    }

    pub fn context(err: BrowserError) -> Self {
        Self::Context(err.to_string())
    }

    pub fn launch(err: BrowserError) -> Self {
        Self::Launch(err.to_string())
    }
}
