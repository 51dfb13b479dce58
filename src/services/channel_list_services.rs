use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mockall::automock;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use tracing::{error, info};
use url::Url;

use crate::{
    channel::{Channel, RawChannel},
    error::{AppResult, Error},
};

pub type DynChannelListService = Arc<dyn ChannelListServiceTrait + Send + Sync>;

/// desktop chrome, the list page is behind cloudflare and a plain client gets a challenge page
const DESKTOP_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36";

static CHANNEL_LINKS: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("button a[href$='.htm']").expect("Static selector should parse")
});

#[automock]
#[async_trait]
pub trait ChannelListServiceTrait {
    /// every channel button on the source page, already renamed and keyed
    async fn fetch_channels(&self) -> AppResult<Vec<Channel>>;
}

pub struct ChannelListService {
    source_url: Url,
    http_client: reqwest::Client,
}

impl ChannelListService {
    pub fn new(source_url: &str, timeout: Duration) -> AppResult<Self> {
        let source_url = Url::parse(source_url)
            .map_err(|e| Error::ListFetch(format!("invalid source url {}: {}", source_url, e)))?;

        let http_client = reqwest::Client::builder()
            .user_agent(DESKTOP_USER_AGENT)
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Ok(Self {
            source_url,
            http_client,
        })
    }
}

#[async_trait]
impl ChannelListServiceTrait for ChannelListService {
    async fn fetch_channels(&self) -> AppResult<Vec<Channel>> {
        info!("collecting channel list from {}", self.source_url);

        let response = self
            .http_client
            .get(self.source_url.clone())
            .header(
                "Accept",
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            )
            .header("Accept-Language", "it-IT,it;q=0.9,en-US;q=0.8,en;q=0.7")
            .header("Sec-Fetch-Dest", "document")
            .header("Sec-Fetch-Mode", "navigate")
            .header("Sec-Fetch-Site", "none")
            .header("Upgrade-Insecure-Requests", "1")
            .send()
            .await
            .map_err(|e| {
                error!("{} unreachable: {}", self.source_url, e);
                Error::ListFetch(format!("{} unreachable: {}", self.source_url, e))
            })?;

        if !response.status().is_success() {
            error!("{} returned status {}", self.source_url, response.status());
            return Err(Error::ListFetch(format!(
                "{} returned status {}",
                self.source_url,
                response.status()
            )));
        }

        let html = response.text().await.map_err(|e| {
            error!("failed to read channel list body: {}", e);
            Error::ListFetch(format!("failed to read channel list body: {}", e))
        })?;

        let channels: Vec<Channel> = parse_channel_list(&html, &self.source_url)
            .into_iter()
            .map(Channel::from)
            .collect();

        info!("found {} channels", channels.len());
        Ok(channels)
    }
}

/// anchors ending in .htm inside buttons, in page order. Relative links are resolved against the
/// page they came from
pub fn parse_channel_list(html: &str, base: &Url) -> Vec<RawChannel> {
    let document = Html::parse_document(html);

    document
        .select(&CHANNEL_LINKS)
        .filter_map(|anchor| {
            let href = anchor.value().attr("href")?;
            let label = anchor.text().collect::<String>().trim().to_string();
            let href = base
                .join(href)
                .map(String::from)
                .unwrap_or_else(|_| href.to_string());
            Some(RawChannel { label, href })
        })
        .collect()
}
