use thiserror::Error;

/// errors coming out of the devtools layer, these get folded into the app errors by whoever
/// called into the browser
#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("failed to launch browser: {context}")]
    LaunchFailed { context: String },

    #[error("no chrome or chromium binary found, set CHROME_PATH")]
    ChromeNotFound,

    #[error("timed out after {timeout_ms}ms: {context}")]
    Timeout { timeout_ms: u64, context: String },

    #[error("CDP error: {0}")]
    Cdp(String),

    /// the websocket to the browser is gone, most likely because it was shut down
    #[error("browser connection closed")]
    Disconnected,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_message_names_the_wait() {
        let err = BrowserError::Timeout {
            timeout_ms: 1500,
            context: "CDP Target.createTarget".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "timed out after 1500ms: CDP Target.createTarget"
        );
    }
}
