//! HTTP relay transport.
//!
//! Endpoints, relative to the configured base URL:
//! - `POST store/push` with the bundle as the body, answering a JSON
//!   [`PushResponse`]
//! - `GET store/pull/{id}[?known=root]` answering the complete bundle
//! - `GET store/index/{id}?chunkSize=n` answering the index bundle
//!
//! A 404 on either pull endpoint means the relay does not know the store.

use crate::transport::{RelayError, RelayTransport};
use mediavc_core::Link;
use mediavc_proto::PushResponse;
use reqwest::{Client, RequestBuilder, StatusCode};
use std::time::Duration;
use url::Url;

/// HTTP relay configuration.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Base URL of the relay (e.g., <http://localhost:8787>)
    pub base_url: String,
    /// Request timeout
    pub timeout: Duration,
    /// Optional bearer token for authentication
    pub bearer_token: Option<String>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8787".to_string(),
            timeout: Duration::from_secs(30),
            bearer_token: None,
        }
    }
}

/// Relay reached over HTTP.
pub struct HttpRelay {
    client: Client,
    base: Url,
    config: RelayConfig,
}

impl HttpRelay {
    /// Create a new HTTP relay client.
    ///
    /// # Errors
    ///
    /// Returns error if the base URL is invalid or the HTTP client cannot be
    /// created.
    pub fn new(config: RelayConfig) -> Result<Self, RelayError> {
        let base = Url::parse(&config.base_url).map_err(|e| RelayError::Init(e.to_string()))?;
        if base.cannot_be_a_base() {
            return Err(RelayError::Init(format!(
                "relay URL cannot be a base: {}",
                config.base_url
            )));
        }

        let mut builder = Client::builder().timeout(config.timeout);
        if base.scheme() == "https" {
            builder = builder.use_rustls_tls();
        }
        let client = builder
            .build()
            .map_err(|e| RelayError::Init(e.to_string()))?;

        Ok(Self {
            client,
            base,
            config,
        })
    }

    /// Relay configuration.
    #[must_use]
    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Build an endpoint URL from path segments (each percent-encoded).
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Attach the authorization header if configured.
    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.config.bearer_token {
            Some(token) => request.header("Authorization", format!("Bearer {token}")),
            None => request,
        }
    }

    async fn fetch_optional(&self, url: Url) -> Result<Option<Vec<u8>>, RelayError> {
        let response = self
            .authorize(self.client.get(url))
            .send()
            .await
            .map_err(|e| RelayError::Request(e.to_string()))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(RelayError::ApiError {
                status: response.status().as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| RelayError::Parse(e.to_string()))?;
        Ok(Some(bytes.to_vec()))
    }

    fn pull_url(&self, store_id: &str, known_root: Option<&Link>) -> Url {
        let mut url = self.endpoint(&["store", "pull", store_id]);
        if let Some(root) = known_root {
            url.query_pairs_mut().append_pair("known", &root.to_string());
        }
        url
    }

    fn index_url(&self, chunk_hint: usize, store_id: &str) -> Url {
        let mut url = self.endpoint(&["store", "index", store_id]);
        url.query_pairs_mut()
            .append_pair("chunkSize", &chunk_hint.to_string());
        url
    }
}

impl RelayTransport for HttpRelay {
    async fn push_bundle(&self, bundle: Vec<u8>) -> Result<PushResponse, RelayError> {
        let url = self.endpoint(&["store", "push"]);
        tracing::debug!(url = %url, bytes = bundle.len(), "POST bundle");

        let request = self
            .client
            .post(url)
            .header("Content-Type", "application/octet-stream")
            .body(bundle);
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| RelayError::Request(e.to_string()))?;

        if !response.status().is_success() {
            return Err(RelayError::ApiError {
                status: response.status().as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| RelayError::Parse(e.to_string()))?;
        decode_ack(&body)
    }

    async fn pull_bundle(
        &self,
        store_id: &str,
        known_root: Option<&Link>,
    ) -> Result<Option<Vec<u8>>, RelayError> {
        let url = self.pull_url(store_id, known_root);
        tracing::debug!(store_id, url = %url, "GET bundle");
        self.fetch_optional(url).await
    }

    async fn pull_index(
        &self,
        chunk_hint: usize,
        store_id: &str,
    ) -> Result<Option<Vec<u8>>, RelayError> {
        let url = self.index_url(chunk_hint, store_id);
        tracing::debug!(store_id, url = %url, "GET index bundle");
        self.fetch_optional(url).await
    }
}

fn decode_ack(body: &[u8]) -> Result<PushResponse, RelayError> {
    PushResponse::from_json(body).map_err(|e| RelayError::Parse(e.to_string()))
}
