//! URL parsing and network channel id lookups

use regex::Regex;
use reqwest::Url;
use serde::Deserialize;
use std::sync::OnceLock;
use tracing::{debug, warn};

use super::strategies::id_from_value;
use crate::data::ChannelId;
use crate::net::{EpisodeRef, HttpClient, HttpRequest};

/// Video slug from a `/video/BV…` path
pub fn video_slug(url: &Url) -> Option<String> {
    capture(video_pattern(), url.path())
}

/// Episode or season reference from a `/bangumi/play/ep…` or `ss…` path.
/// Episodes win when both are somehow present.
pub fn episode_ref(url: &Url) -> Option<EpisodeRef> {
    capture(episode_pattern(), url.path())
        .map(EpisodeRef::Episode)
        .or_else(|| capture(season_pattern(), url.path()).map(EpisodeRef::Season))
}

/// 1-based page index from the `p` query parameter (default 1).
pub fn page_index(url: &Url) -> i64 {
    url.query_pairs()
        .find(|(key, _)| key == "p")
        .and_then(|(_, value)| value.trim().parse::<i64>().ok())
        .unwrap_or(1)
}

/// Zero-based position for a 1-based page index, clamped into `0..len`.
pub fn clamp_page(page: i64, len: usize) -> Option<usize> {
    let last = len.checked_sub(1)?;
    let wanted = page.saturating_sub(1).max(0);
    Some(usize::try_from(wanted).map_or(last, |wanted| wanted.min(last)))
}

#[derive(Debug, Deserialize)]
struct PageListResponse {
    #[serde(default)]
    data: Option<Vec<PageEntry>>,
}

#[derive(Debug, Deserialize)]
struct PageEntry {
    #[serde(default)]
    cid: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct SeasonResponse {
    #[serde(default)]
    result: Option<SeasonResult>,
}

#[derive(Debug, Deserialize)]
struct SeasonResult {
    #[serde(default)]
    episodes: Vec<Episode>,
}

#[derive(Debug, Deserialize)]
struct Episode {
    #[serde(default)]
    id: serde_json::Value,
    #[serde(default)]
    cid: serde_json::Value,
}

/// Channel id of page `page` of a multi-part video.
pub async fn channel_by_video(client: &dyn HttpClient, url: Url, page: i64) -> Option<ChannelId> {
    let response: PageListResponse = fetch_json(client, url).await?;
    let pages = response.data.unwrap_or_default();
    let position = clamp_page(page, pages.len())?;
    debug!(page, position, pages = pages.len(), "selected page from page list");
    id_from_value(&pages[position].cid)
}

/// Channel id for an episode, or for the first episode of a season.
pub async fn channel_by_episode(
    client: &dyn HttpClient,
    url: Url,
    episode: &EpisodeRef,
) -> Option<ChannelId> {
    let response: SeasonResponse = fetch_json(client, url).await?;
    let episodes = response.result.map(|result| result.episodes).unwrap_or_default();

    if let EpisodeRef::Episode(wanted) = episode {
        let hit = episodes
            .iter()
            .find(|ep| id_from_value(&ep.id).is_some_and(|id| id.as_str() == wanted));
        if let Some(id) = hit.and_then(|ep| id_from_value(&ep.cid)) {
            return Some(id);
        }
    }

    episodes.first().and_then(|ep| id_from_value(&ep.cid))
}

/// GET and decode JSON. Any failure is logged and collapses to `None`; a
/// failed lookup is never retried.
async fn fetch_json<T: for<'de> Deserialize<'de>>(client: &dyn HttpClient, url: Url) -> Option<T> {
    let response = match client.get(HttpRequest::get(url.clone())).await {
        Ok(response) => response,
        Err(e) => {
            warn!("Lookup {} failed: {}", url, e);
            return None;
        }
    };

    if !response.is_success() {
        warn!("Lookup {} returned status {}", url, response.status);
        return None;
    }

    match serde_json::from_str(&response.body) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            warn!("Lookup {} returned unexpected JSON: {}", url, e);
            None
        }
    }
}

fn capture(pattern: &Regex, haystack: &str) -> Option<String> {
    pattern
        .captures(haystack)
        .map(|captures| captures[1].to_string())
}

fn video_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"/video/(BV[0-9A-Za-z]+)").expect("valid video pattern"))
}

fn episode_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"/bangumi/play/ep(\d+)").expect("valid episode pattern"))
}

fn season_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"/bangumi/play/ss(\d+)").expect("valid season pattern"))
}
