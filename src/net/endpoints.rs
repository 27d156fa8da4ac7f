//! Remote endpoint layout

use anyhow::{Context, Result};
use reqwest::Url;

use crate::config::EndpointConfig;
use crate::data::ChannelId;

/// Episode reference taken from a bangumi URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EpisodeRef {
    Episode(String),
    Season(String),
}

/// Parsed base URLs for every remote endpoint
#[derive(Debug, Clone)]
pub struct Endpoints {
    api_base: Url,
    comment_base: Url,
}

impl Endpoints {
    pub fn from_config(config: &EndpointConfig) -> Result<Self> {
        let api_base = Url::parse(&config.api_base)
            .with_context(|| format!("Invalid api_base URL: {}", config.api_base))?;
        let comment_base = Url::parse(&config.comment_base)
            .with_context(|| format!("Invalid comment_base URL: {}", config.comment_base))?;

        Ok(Self {
            api_base,
            comment_base,
        })
    }

    /// Page list for a video slug; each page carries its own channel id
    pub fn page_list(&self, slug: &str) -> Url {
        let mut url = with_path(&self.api_base, "x/player/pagelist");
        url.query_pairs_mut()
            .append_pair("bvid", slug)
            .append_pair("jsonp", "jsonp");
        url
    }

    /// Season details, including the episode list
    pub fn season(&self, episode: &EpisodeRef) -> Url {
        let mut url = with_path(&self.api_base, "pgc/view/web/season");
        match episode {
            EpisodeRef::Episode(id) => url.query_pairs_mut().append_pair("ep_id", id),
            EpisodeRef::Season(id) => url.query_pairs_mut().append_pair("season_id", id),
        };
        url
    }

    /// Equivalent comment stream sources, in the order they are tried
    pub fn comment_sources(&self, cid: &ChannelId) -> Vec<Url> {
        let mut binary = with_path(&self.api_base, "x/v1/dm/list.so");
        binary.query_pairs_mut().append_pair("oid", cid.as_str());

        let legacy = with_path(&self.comment_base, &format!("{}.xml", cid.as_str()));

        vec![binary, legacy]
    }
}

/// Append `path` to the base URL's path, keeping any prefix.
fn with_path(base: &Url, path: &str) -> Url {
    let mut url = base.clone();
    let joined = format!("{}/{}", base.path().trim_end_matches('/'), path);
    url.set_path(&joined);
    url.set_query(None);
    url
}
