//! Watch page fetched over HTTP

use regex::Regex;
use reqwest::Url;
use serde_json::Value;
use std::sync::OnceLock;
use thiserror::Error;
use tracing::debug;

use crate::net::{HttpClient, HttpRequest, TransportError};
use crate::resolver::{PageHost, PageSnapshot};

const PAGE_ACCEPT: &str = "text/html,application/xhtml+xml,*/*";
const INITIAL_STATE_MARKER: &str = "window.__INITIAL_STATE__";

#[derive(Debug, Error)]
pub enum PageError {
    #[error("page request failed: {0}")]
    Transport(#[from] TransportError),

    #[error("{url} returned status {status}")]
    Status { url: String, status: u16 },
}

/// A page as it was when fetched. Its snapshot never changes, so polling it
/// is equivalent to checking once.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    url: Url,
    snapshot: PageSnapshot,
}

impl FetchedPage {
    pub async fn fetch(client: &dyn HttpClient, url: Url) -> Result<Self, PageError> {
        let response = client
            .get(HttpRequest::get(url.clone()).accept(PAGE_ACCEPT))
            .await?;
        if !response.is_success() {
            return Err(PageError::Status {
                url: url.to_string(),
                status: response.status,
            });
        }

        let page = Self::from_html(url, &response.body);
        debug!(
            scripts = page.snapshot.scripts.len(),
            has_state = page.snapshot.initial_state.is_some(),
            "Fetched page {}",
            page.url
        );
        Ok(page)
    }

    pub fn from_html(url: Url, html: &str) -> Self {
        let scripts = extract_scripts(html);
        let initial_state = extract_initial_state(&scripts);
        Self {
            url,
            snapshot: PageSnapshot {
                initial_state,
                scripts,
            },
        }
    }
}

impl PageHost for FetchedPage {
    fn snapshot(&self) -> PageSnapshot {
        self.snapshot.clone()
    }

    fn location(&self) -> Url {
        self.url.clone()
    }
}

/// Bodies of the page's `<script>` elements, in document order
pub fn extract_scripts(html: &str) -> Vec<String> {
    static SCRIPT: OnceLock<Regex> = OnceLock::new();
    let script = SCRIPT.get_or_init(|| {
        Regex::new(r"(?is)<script\b[^>]*>(.*?)</script\s*>").expect("valid script pattern")
    });

    script
        .captures_iter(html)
        .map(|captures| captures[1].to_string())
        .filter(|body| !body.trim().is_empty())
        .collect()
}

/// The JSON literal assigned to `window.__INITIAL_STATE__`, if any script
/// carries one. Anything after the literal (usually `;(function(){...})()`)
/// is ignored.
pub fn extract_initial_state(scripts: &[String]) -> Option<Value> {
    scripts.iter().find_map(|script| {
        let start = script.find(INITIAL_STATE_MARKER)? + INITIAL_STATE_MARKER.len();
        let literal = script[start..].trim_start().strip_prefix('=')?;
        serde_json::Deserializer::from_str(literal)
            .into_iter::<Value>()
            .next()?
            .ok()
    })
}
