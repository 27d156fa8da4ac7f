//! HTTP transport seam
//!
//! Identifier lookups and comment retrieval only ever issue GET requests with
//! cookies included. The [`HttpClient`] trait keeps the engine independent of
//! the concrete client so fetch fallbacks can be exercised without a network.

mod client;
mod endpoints;

pub use client::ReqwestClient;
pub use endpoints::{Endpoints, EpisodeRef};

use async_trait::async_trait;
use reqwest::Url;
use thiserror::Error;

/// A GET request
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub url: Url,
    /// Value for the `Accept` header
    pub accept: Option<&'static str>,
    /// Page the request originates from, sent as `Referer`
    pub referrer: Option<Url>,
}

impl HttpRequest {
    pub fn get(url: Url) -> Self {
        Self {
            url,
            accept: None,
            referrer: None,
        }
    }

    pub fn accept(mut self, accept: &'static str) -> Self {
        self.accept = Some(accept);
        self
    }

    pub fn referrer(mut self, referrer: Option<Url>) -> Self {
        self.referrer = referrer;
        self
    }
}

/// A fully read response
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Transport-level failure (no HTTP status available)
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransportError {
    #[error("request aborted")]
    Aborted,
    #[error("network error: {0}")]
    Network(String),
}

/// Minimal async HTTP client
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn get(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}
