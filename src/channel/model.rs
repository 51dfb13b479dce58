use std::collections::HashSet;

use super::normalizer::{base_key, normalize_display_name};

/// one anchor pulled off the channel list page before any renaming happens
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawChannel {
    pub label: String,
    pub href: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Channel {
    pub name: String,
    pub page_url: String,
    /// only set once the orchestrator has an address for it
    pub stream_url: Option<String>,
    pub base_key: String,
}

impl Channel {
    pub fn new(label: &str, page_url: impl Into<String>) -> Self {
        let name = normalize_display_name(label);
        let base_key = base_key(&name);

        Self {
            name,
            page_url: page_url.into(),
            stream_url: None,
            base_key,
        }
    }

    pub fn with_stream(self, stream_url: impl Into<String>) -> Self {
        Self {
            stream_url: Some(stream_url.into()),
            ..self
        }
    }
}

impl From<RawChannel> for Channel {
    fn from(raw: RawChannel) -> Self {
        Self::new(&raw.label, raw.href)
    }
}

/// resolved channels in arrival order, at most one per stream address
#[derive(Debug, Default)]
pub struct ResultSet {
    channels: Vec<Channel>,
    seen: HashSet<String>,
}

impl ResultSet {
    /// returns false when the channel has no address or the address was already taken
    pub fn push(&mut self, channel: Channel) -> bool {
        let Some(stream) = channel.stream_url.as_deref().filter(|s| !s.is_empty()) else {
            return false;
        };

        if !self.seen.insert(stream.to_string()) {
            return false;
        }

        self.channels.push(channel);
        true
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    pub fn into_channels(self) -> Vec<Channel> {
        self.channels
    }
}
