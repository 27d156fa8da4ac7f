//! Comment stream retrieval
//!
//! A channel id's comments are available from several equivalent endpoints
//! (binary API first, legacy XML file second). Each is tried in order until
//! one returns a body containing a comment record.

mod parse;

pub use parse::{parse_comments, ParseError};

use reqwest::Url;
use std::sync::{Mutex, PoisonError};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::data::{ChannelId, CommentTimeline};
use crate::net::{Endpoints, HttpClient, HttpRequest, HttpResponse, TransportError};
use std::sync::Arc;

/// `Accept` header for comment requests
pub const COMMENT_ACCEPT: &str = "text/xml,application/xml,text/plain,*/*";

/// Marker proving a body holds at least one comment record
pub const COMMENT_MARKER: &str = "<d";

#[derive(Debug, Error)]
pub enum LoadError {
    /// Every endpoint failed and the last failure was a transport error
    #[error("comment request failed: {0}")]
    Transport(#[from] TransportError),

    /// Every endpoint failed with a non-success status (0 when unknown)
    #[error("comment endpoints failed with status {0}")]
    Status(u16),

    #[error(transparent)]
    Malformed(#[from] ParseError),

    /// A newer load (or teardown) cancelled this one; its result must be
    /// ignored
    #[error("comment load superseded")]
    Superseded,
}

/// Loads comment timelines, keeping at most one request in flight
pub struct CommentLoader {
    client: Arc<dyn HttpClient>,
    endpoints: Endpoints,
    in_flight: Mutex<Option<CancellationToken>>,
}

impl CommentLoader {
    pub fn new(client: Arc<dyn HttpClient>, endpoints: Endpoints) -> Self {
        Self {
            client,
            endpoints,
            in_flight: Mutex::new(None),
        }
    }

    /// Load and parse the comments for `cid`.
    ///
    /// Starting a load cancels any load still in flight; the cancelled call
    /// returns [`LoadError::Superseded`].
    pub async fn load(
        &self,
        cid: &ChannelId,
        referrer: Option<Url>,
    ) -> Result<CommentTimeline, LoadError> {
        let token = self.begin();
        let sources = self.endpoints.comment_sources(cid);
        let body = fetch_first_comment_body(self.client.as_ref(), &sources, referrer, &token).await?;

        let timeline = parse_comments(&body)?;
        info!(%cid, comments = timeline.len(), "Comment timeline loaded");
        Ok(timeline)
    }

    /// Cancel the load in flight, if any.
    pub fn cancel(&self) {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(token) = in_flight.take() {
            token.cancel();
        }
    }

    fn begin(&self) -> CancellationToken {
        let token = CancellationToken::new();
        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = in_flight.replace(token.clone()) {
            debug!("Cancelling superseded comment load");
            previous.cancel();
        }
        token
    }
}

/// Try each source in order and return the first body that holds a comment
/// record. A body without a marker is kept but the search continues.
async fn fetch_first_comment_body(
    client: &dyn HttpClient,
    sources: &[Url],
    referrer: Option<Url>,
    token: &CancellationToken,
) -> Result<String, LoadError> {
    let mut body = String::new();
    let mut last_status: Option<u16> = None;
    let mut last_error: Option<TransportError> = None;

    for url in sources {
        if token.is_cancelled() {
            return Err(LoadError::Superseded);
        }

        let request = HttpRequest::get(url.clone())
            .accept(COMMENT_ACCEPT)
            .referrer(referrer.clone());

        match fetch(client, request, token).await {
            Ok(response) if !response.is_success() => {
                warn!("Comment endpoint {} returned status {}", url, response.status);
                last_status = Some(response.status);
            }
            Ok(response) => {
                body = response.body;
                if !body.is_empty() && body.contains(COMMENT_MARKER) {
                    debug!("Comment endpoint {} returned {} bytes", url, body.len());
                    break;
                }
                debug!("Comment endpoint {} returned no comment records", url);
            }
            Err(e) => {
                warn!("Comment endpoint {} failed: {}", url, e);
                last_error = Some(e);
            }
        }
    }

    if token.is_cancelled() {
        return Err(LoadError::Superseded);
    }

    if body.is_empty() {
        return Err(match last_error {
            Some(e) => LoadError::Transport(e),
            None => LoadError::Status(last_status.unwrap_or(0)),
        });
    }

    Ok(body)
}

async fn fetch(
    client: &dyn HttpClient,
    request: HttpRequest,
    token: &CancellationToken,
) -> Result<HttpResponse, TransportError> {
    tokio::select! {
        _ = token.cancelled() => Err(TransportError::Aborted),
        response = client.get(request) => response,
    }
}
