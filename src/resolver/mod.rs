//! Channel id resolution
//!
//! Resolution tries, in order, stopping at the first success:
//! 1. in-page state and embedded scripts, polled until the wait budget runs out
//! 2. the paginated page-list lookup for a `/video/` URL
//! 3. the season lookup for a `/bangumi/play/` URL
//!
//! Network lookups run at most once each; a failure falls through to the next
//! strategy.

mod lookup;
mod strategies;

pub use lookup::{clamp_page, episode_ref, page_index, video_slug};
pub use strategies::{first_match, Strategy, IN_PAGE_STRATEGIES};

use reqwest::Url;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::config::ResolverConfig;
use crate::data::ChannelId;
use crate::net::{Endpoints, HttpClient};

/// What the host page exposes at one instant
#[derive(Debug, Clone, Default)]
pub struct PageSnapshot {
    /// The page's serialized initial state object, if it has one yet
    pub initial_state: Option<Value>,
    /// Text of the page's embedded scripts, in document order
    pub scripts: Vec<String>,
}

/// The page hosting the player
pub trait PageHost: Send + Sync {
    /// Current in-page state. Called on every poll, since pages hydrate
    /// asynchronously.
    fn snapshot(&self) -> PageSnapshot;

    /// Current page URL
    fn location(&self) -> Url;
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("no channel id found for {url}")]
    NotFound { url: String },
}

/// Resolves the channel id of whatever video the page is showing
pub struct Resolver {
    client: Arc<dyn HttpClient>,
    endpoints: Endpoints,
    max_wait: Duration,
    poll_interval: Duration,
}

impl Resolver {
    pub fn new(client: Arc<dyn HttpClient>, endpoints: Endpoints, config: &ResolverConfig) -> Self {
        Self {
            client,
            endpoints,
            max_wait: config.max_wait(),
            poll_interval: config.poll_interval(),
        }
    }

    pub async fn resolve(&self, page: &dyn PageHost) -> Result<ChannelId, ResolveError> {
        if let Some(id) = self.poll_page(page).await {
            return Ok(id);
        }

        let location = page.location();
        debug!("No channel id in page after {:?}, trying lookups", self.max_wait);

        if let Some(slug) = video_slug(&location) {
            let page_index = page_index(&location);
            let url = self.endpoints.page_list(&slug);
            if let Some(id) = lookup::channel_by_video(self.client.as_ref(), url, page_index).await {
                info!(%id, %slug, page_index, "Channel id resolved from page list");
                return Ok(id);
            }
        }

        if let Some(episode) = episode_ref(&location) {
            let url = self.endpoints.season(&episode);
            if let Some(id) = lookup::channel_by_episode(self.client.as_ref(), url, &episode).await {
                info!(%id, ?episode, "Channel id resolved from season");
                return Ok(id);
            }
        }

        Err(ResolveError::NotFound {
            url: location.to_string(),
        })
    }

    /// Poll the in-page strategies until one hits or the wait budget is spent.
    /// The page is always checked at least once.
    async fn poll_page(&self, page: &dyn PageHost) -> Option<ChannelId> {
        let started = Instant::now();
        loop {
            if let Some((strategy, id)) = first_match(&page.snapshot()) {
                info!(%id, strategy, "Channel id resolved from page");
                return Some(id);
            }
            if started.elapsed() >= self.max_wait {
                return None;
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}
