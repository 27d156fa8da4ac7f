//! `reqwest` implementation of [`HttpClient`]

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, REFERER};
use reqwest::Client;
use tracing::debug;

use super::{HttpClient, HttpRequest, HttpResponse, TransportError};
use crate::config::EndpointConfig;

/// HTTP client with a persistent cookie store, so credentials picked up from
/// one response are sent with the next request.
#[derive(Clone)]
pub struct ReqwestClient {
    client: Client,
}

impl ReqwestClient {
    pub fn new(endpoints: &EndpointConfig) -> Result<Self> {
        let client = Client::builder()
            .cookie_store(true)
            .user_agent(endpoints.user_agent.clone())
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self { client })
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn get(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        debug!("GET {}", request.url);

        let mut builder = self.client.get(request.url.clone());
        if let Some(accept) = request.accept {
            builder = builder.header(ACCEPT, accept);
        }
        if let Some(referrer) = &request.referrer {
            builder = builder.header(REFERER, referrer.as_str());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        debug!("GET {} -> {} ({} bytes)", request.url, status, body.len());
        Ok(HttpResponse { status, body })
    }
}
