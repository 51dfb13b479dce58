//! The handful of devtools payloads we actually read, everything else stays as raw json.
//!
//! Field names follow the protocol, see https://chromedevtools.github.io/devtools-protocol/

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBrowserContextResult {
    pub browser_context_id: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTargetResult {
    pub target_id: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachToTargetResult {
    pub session_id: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigateResult {
    /// missing for same-document navigations
    #[serde(default)]
    pub loader_id: Option<String>,
    #[serde(default)]
    pub error_text: Option<String>,
}

/// `Page.lifecycleEvent`, only sent once lifecycle events are enabled on the page
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LifecycleEvent {
    pub frame_id: String,
    pub loader_id: String,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateResult {
    pub result: RemoteObject,
    #[serde(default)]
    pub exception_details: Option<serde_json::Value>,
}

/// only what `returnByValue` gives back
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteObject {
    #[serde(default)]
    pub value: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestPaused {
    pub request_id: String,
    pub request: PausedRequest,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PausedRequest {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetFrameTreeResult {
    pub frame_tree: FrameTree,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameTree {
    pub frame: Frame,
    #[serde(default)]
    pub child_frames: Vec<FrameTree>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Frame {
    pub id: String,
    #[serde(default)]
    pub url: String,
}

impl FrameTree {
    /// every frame url, depth first with the main frame first
    pub fn urls(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_urls(&mut out);
        out
    }

    fn collect_urls(&self, out: &mut Vec<String>) {
        out.push(self.frame.url.clone());
        for child in &self.child_frames {
            child.collect_urls(out);
        }
    }
}
