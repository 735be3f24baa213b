//! reqwest-backed [`HttpFetch`].

use std::time::Duration;

use serde_json::Value;
use vista_core::config::PluginConfig;
use vista_core::plugin::{BoxFuture, HttpFetch};
use vista_core::{Result, VistaError};

/// Fetches JSON documents over HTTP.
///
/// Relative URLs (`/api/v1/plugins`) are resolved against `origin` when one
/// is set; without one they fail as transport errors.
#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    client: reqwest::Client,
    origin: Option<String>,
}

impl ReqwestFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| VistaError::Config(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self::with_client(client))
    }

    pub fn from_config(config: &PluginConfig) -> Result<Self> {
        Self::new(Duration::from_secs(config.request_timeout_secs))
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
            origin: None,
        }
    }

    /// Origin (`https://host:port`) that relative URLs are joined onto.
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    fn resolve(&self, url: &str) -> Result<String> {
        let origin = match &self.origin {
            Some(origin) if url.starts_with('/') => origin,
            _ => return Ok(url.to_string()),
        };
        let base = reqwest::Url::parse(origin)
            .map_err(|e| VistaError::Config(format!("invalid origin {}: {}", origin, e)))?;
        let resolved = base
            .join(url)
            .map_err(|e| VistaError::Config(format!("cannot resolve {} against {}: {}", url, origin, e)))?;
        Ok(resolved.to_string())
    }
}

impl HttpFetch for ReqwestFetcher {
    fn get_json<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Value>> {
        Box::pin(async move {
            let url = self.resolve(url)?;
            tracing::debug!(url = %url, "GET");

            let response = self
                .client
                .get(&url)
                .send()
                .await
                .map_err(|e| VistaError::Transport(format!("GET {} failed: {}", url, e)))?;

            let status = response.status();
            if !status.is_success() {
                return Err(VistaError::Transport(format!("HTTP {} for {}", status.as_u16(), url)));
            }

            let body = response
                .bytes()
                .await
                .map_err(|e| VistaError::Transport(format!("reading {} failed: {}", url, e)))?;
            serde_json::from_slice(&body).map_err(VistaError::from)
        })
    }
}
