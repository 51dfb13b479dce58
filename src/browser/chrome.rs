//! Chrome / Chromium binary discovery.

use std::path::{Path, PathBuf};

use tracing::debug;

use super::error::BrowserError;

/// absolute locations checked after PATH, linux first since that's where this runs
const KNOWN_PATHS: &[&str] = &[
    "/usr/bin/google-chrome-stable",
    "/usr/bin/google-chrome",
    "/usr/bin/chromium",
    "/usr/bin/chromium-browser",
    "/snap/bin/chromium",
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "/Applications/Chromium.app/Contents/MacOS/Chromium",
    "/opt/homebrew/bin/chromium",
];

const BINARY_NAMES: &[&str] = &[
    "google-chrome-stable",
    "google-chrome",
    "chromium",
    "chromium-browser",
    "chrome",
];

/// explicit path wins, then PATH, then the usual install locations
pub fn find_chrome(explicit: Option<&Path>) -> Result<PathBuf, BrowserError> {
    if let Some(path) = explicit {
        if path.is_file() {
            return Ok(path.to_path_buf());
        }
        debug!(path = %path.display(), "configured chrome path is not a file, searching instead");
    }

    if let Some(path) = search_path_env() {
        return Ok(path);
    }

    KNOWN_PATHS
        .iter()
        .map(PathBuf::from)
        .find(|p| p.is_file())
        .ok_or(BrowserError::ChromeNotFound)
}

fn search_path_env() -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var)
        .flat_map(|dir| BINARY_NAMES.iter().map(move |name| dir.join(name)))
        .find(|candidate| candidate.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_file_is_used_as_is() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let found = find_chrome(Some(file.path())).unwrap();
        assert_eq!(found, file.path());
    }
}
