//! REST client for the AI generation service.
//!
//! Wraps the service's HTTP API (image/video generation, health) using
//! [`reqwest`]. One instance is shared by every worker.

use std::time::Duration;

use serde::Deserialize;

use crate::request::{GenerationRequest, GenerationResponse};

/// Upper bound on a health probe; generation calls are bounded by the
/// caller's per-queue timeout instead.
const HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

/// HTTP client for the generation service.
#[derive(Debug, Clone)]
pub struct GenerationApi {
    client: reqwest::Client,
    api_url: String,
}

/// Body of `GET /health/`.
#[derive(Debug, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    #[serde(default)]
    pub service: Option<String>,
}

/// Errors from the generation service REST layer.
#[derive(Debug, thiserror::Error)]
pub enum GenerationApiError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The service returned a non-2xx status code.
    #[error("Generation service error ({status}): {body}")]
    ApiError {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// The service answered 2xx but the body was unusable.
    #[error("Invalid generation response: {0}")]
    InvalidResponse(String),
}

impl GenerationApi {
    /// Create a client for the service at `api_url`, e.g. `http://host:8000`.
    pub fn new(api_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), api_url)
    }

    /// Create a client reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, api_url: impl Into<String>) -> Self {
        let api_url = api_url.into().trim_end_matches('/').to_string();
        Self { client, api_url }
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Run one generation and return where the service stored the result.
    pub async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResponse, GenerationApiError> {
        let url = format!("{}{}", self.api_url, request.path());
        tracing::debug!(
            url = %url,
            output_id = request.output_id(),
            "Sending generation request",
        );

        let builder = self.client.post(url);
        let builder = match request {
            GenerationRequest::Image(body) => builder.json(body),
            GenerationRequest::Video(body) => builder.json(body),
        };
        let response = builder.send().await?;

        let parsed: GenerationResponse = Self::parse_response(response).await?;
        if parsed.file_path.trim().is_empty() {
            return Err(GenerationApiError::InvalidResponse(
                "file_path is empty".to_string(),
            ));
        }
        Ok(parsed)
    }

    /// Query the service's basic health endpoint.
    pub async fn health(&self) -> Result<HealthResponse, GenerationApiError> {
        let response = self
            .client
            .get(format!("{}/health/", self.api_url))
            .timeout(HEALTH_TIMEOUT)
            .send()
            .await?;
        Self::parse_response(response).await
    }

    // ---- private helpers ----

    /// Ensure the response has a success status code, otherwise capture
    /// the status and body text in a [`GenerationApiError::ApiError`].
    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, GenerationApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(GenerationApiError::ApiError {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Parse a successful JSON response body into the expected type.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, GenerationApiError> {
        let response = Self::ensure_success(response).await?;
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| GenerationApiError::InvalidResponse(e.to_string()))
    }
}
