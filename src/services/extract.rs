//! Client for the external document-intelligence service.
//!
//! Every pipeline stage delegates to a remote HTTP service speaking JSON.
//! The capability is a trait so pipeline and recovery logic can be tested
//! against scripted doubles; [`HttpExtractor`] is the production
//! implementation.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::models::{BasicInfo, ClauseAnalysis, ServiceInfo, StandardClause};

/// Errors that can occur while calling the extraction service.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// The service could not be reached at all.
    #[error("extraction service unavailable: {0}")]
    Unavailable(String),

    /// The request did not complete within the transport timeout.
    #[error("extraction request timed out")]
    Timeout,

    /// The service answered with an error status.
    #[error("extraction service error: {0}")]
    Api(String),

    /// The response body could not be decoded.
    #[error("invalid extraction response: {0}")]
    Parse(String),
}

/// External document-intelligence capability used by the pipeline.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Convert an uploaded binary into plain text.
    async fn convert(
        &self,
        file_name: &str,
        media_type: &str,
        content: &[u8],
    ) -> Result<String, ExtractionError>;

    /// Extract contract header fields from converted text.
    async fn basic_info(&self, text: &str) -> Result<BasicInfo, ExtractionError>;

    /// Detect non-standard clauses against the supplied reference clauses.
    async fn analyze_clauses(
        &self,
        text: &str,
        standard_clauses: &[StandardClause],
    ) -> Result<ClauseAnalysis, ExtractionError>;

    /// Extract device, maintenance, and training commitments.
    async fn service_info(&self, text: &str) -> Result<ServiceInfo, ExtractionError>;
}

/// HTTP client for the configured extraction service.
pub struct HttpExtractor {
    base_url: String,
    client: Client,
}

#[derive(Debug, Serialize)]
struct ConversionRequest<'a> {
    file_name: &'a str,
    media_type: &'a str,
    /// Raw bytes, base64-encoded.
    content: String,
}

#[derive(Debug, Deserialize)]
struct ConversionResponse {
    text: String,
}

#[derive(Debug, Serialize)]
struct ContentRequest<'a> {
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct AnalysisRequest<'a> {
    content: &'a str,
    standard_clauses: &'a [StandardClause],
}

impl HttpExtractor {
    /// Create a client for the service at `base_url` with a per-request
    /// transport timeout.
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post<Req, Resp>(&self, path: &str, body: &Req) -> Result<Resp, ExtractionError>
    where
        Req: Serialize + Sync,
        Resp: for<'de> Deserialize<'de>,
    {
        let url = format!("{}{}", self.base_url, path);
        debug!(url = %url, "calling extraction service");

        let resp = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(request_error)?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(ExtractionError::Api(format!("HTTP {}: {}", status, body)));
        }

        resp.json()
            .await
            .map_err(|e| ExtractionError::Parse(e.to_string()))
    }
}

fn request_error(e: reqwest::Error) -> ExtractionError {
    if e.is_timeout() {
        ExtractionError::Timeout
    } else if e.is_connect() {
        ExtractionError::Unavailable(e.to_string())
    } else {
        ExtractionError::Api(e.to_string())
    }
}

#[async_trait]
impl Extractor for HttpExtractor {
    async fn convert(
        &self,
        file_name: &str,
        media_type: &str,
        content: &[u8],
    ) -> Result<String, ExtractionError> {
        let request = ConversionRequest {
            file_name,
            media_type,
            content: base64::engine::general_purpose::STANDARD.encode(content),
        };
        let response: ConversionResponse = self.post("/api/v1/file_conversion", &request).await?;
        Ok(response.text)
    }

    async fn basic_info(&self, text: &str) -> Result<BasicInfo, ExtractionError> {
        self.post("/api/v1/basic_info_extraction", &ContentRequest { content: text })
            .await
    }

    async fn analyze_clauses(
        &self,
        text: &str,
        standard_clauses: &[StandardClause],
    ) -> Result<ClauseAnalysis, ExtractionError> {
        let request = AnalysisRequest {
            content: text,
            standard_clauses,
        };
        self.post("/api/v1/non_standard_detection", &request).await
    }

    async fn service_info(&self, text: &str) -> Result<ServiceInfo, ExtractionError> {
        self.post("/api/v1/service_info_extraction", &ContentRequest { content: text })
            .await
    }
}
