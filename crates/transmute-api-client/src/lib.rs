//! HTTP client for the Transmute API.
//!
//! Provides a minimal client with generic GET/POST/DELETE helpers and domain
//! methods (upload, completed-conversion listing, download, delete, conversion
//! requests, health). `ApiClient` implements [`transmute_core::ConversionApi`],
//! which is what the tracking client drives.

pub mod api;

use bytes::Bytes;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use transmute_core::{ClientConfig, ClientError};

/// HTTP client for the Transmute API.
#[derive(Clone, Debug)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    api_prefix: String,
}

impl ApiClient {
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(config.http_timeout())
            .connect_timeout(config.connect_timeout())
            .build()
            .map_err(|e| {
                ClientError::InvalidInput(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            api_prefix: config.api_prefix.trim_end_matches('/').to_string(),
        })
    }

    /// Create client from environment: TRANSMUTE_API_URL (or API_URL) and the
    /// other TRANSMUTE_* settings.
    pub fn from_env() -> anyhow::Result<Self> {
        let config = ClientConfig::from_env()?;
        Ok(Self::new(&config)?)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Full URL for an API path (the configured prefix is inserted).
    pub fn build_url(&self, path: &str) -> String {
        format!("{}{}{}", self.base_url, self.api_prefix, path)
    }

    /// Encode an opaque id as a single path segment.
    pub(crate) fn path_segment(id: &str) -> Result<String, ClientError> {
        let id = id.trim();
        if id.is_empty() {
            return Err(ClientError::InvalidInput("Empty id".to_string()));
        }
        Ok(urlencoding::encode(id).into_owned())
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, ClientError> {
        let response = request
            .send()
            .await
            .map_err(|e| ClientError::TransportFailure(e.to_string()))?;
        Self::ensure_success(response).await
    }

    async fn ensure_success(response: Response) -> Result<Response, ClientError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        Err(ClientError::rejected(status.as_u16(), error_text))
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
        let body = response
            .bytes()
            .await
            .map_err(|e| ClientError::TransportFailure(e.to_string()))?;
        serde_json::from_slice(&body).map_err(ClientError::from)
    }

    /// GET request. Deserializes JSON response.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let url = self.build_url(path);
        tracing::debug!(url = %url, "GET");
        let response = self.send(self.client.get(&url)).await?;
        Self::decode(response).await
    }

    /// GET request returning the raw body.
    pub async fn get_bytes(&self, path: &str) -> Result<Bytes, ClientError> {
        let url = self.build_url(path);
        tracing::debug!(url = %url, "GET (bytes)");
        let response = self.send(self.client.get(&url)).await?;
        response
            .bytes()
            .await
            .map_err(|e| ClientError::TransportFailure(e.to_string()))
    }

    /// POST JSON body and deserialize response.
    pub async fn post_json<T: DeserializeOwned, B: serde::Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        let url = self.build_url(path);
        tracing::debug!(url = %url, "POST (json)");
        let response = self.send(self.client.post(&url).json(body)).await?;
        Self::decode(response).await
    }

    /// POST multipart form and deserialize response.
    pub async fn post_multipart<T: DeserializeOwned>(
        &self,
        path: &str,
        form: reqwest::multipart::Form,
    ) -> Result<T, ClientError> {
        let url = self.build_url(path);
        tracing::debug!(url = %url, "POST (multipart)");
        let response = self.send(self.client.post(&url).multipart(form)).await?;
        Self::decode(response).await
    }

    /// DELETE request. Returns Ok(()) on any 2xx; the body is ignored.
    pub async fn delete(&self, path: &str) -> Result<(), ClientError> {
        let url = self.build_url(path);
        tracing::debug!(url = %url, "DELETE");
        self.send(self.client.delete(&url)).await?;
        Ok(())
    }

    /// Raw response for endpoints whose non-2xx bodies carry data.
    pub(crate) async fn get_raw(&self, path: &str) -> Result<Response, ClientError> {
        let url = self.build_url(path);
        self.client
            .get(&url)
            .send()
            .await
            .map_err(|e| ClientError::TransportFailure(e.to_string()))
    }
}
