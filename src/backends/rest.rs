//! REST backend implementation for Guardchat
//!
//! Talks to the classification service's HTTP API:
//!
//! - `POST {base}/classify` with `{"prompt": ...}`
//! - `GET  {base}/stats`
//! - `POST {base}/flag` with `{"id": ...}`
//!
//! Error responses carry `{"error": "..."}` bodies; they are surfaced as
//! transport errors together with the HTTP status.

use crate::backends::{BackendKind, ClassificationResult, ClassifierBackend, Stats, Verdict};
use crate::config::RestConfig;
use crate::error::{GuardchatError, Result};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// REST service backend
///
/// # Examples
///
/// ```
/// use guardchat::backends::RestBackend;
/// use guardchat::config::RestConfig;
///
/// let backend = RestBackend::new(RestConfig::default()).unwrap();
/// assert_eq!(backend.endpoint("stats"), "http://localhost:5001/api/stats");
/// ```
pub struct RestBackend {
    client: Client,
    base_url: String,
}

/// Request body for `/classify`
#[derive(Debug, Serialize)]
struct ClassifyRequest<'a> {
    prompt: &'a str,
}

/// Request body for `/flag`
#[derive(Debug, Serialize)]
struct FlagRequest<'a> {
    id: &'a str,
}

/// Response body of `/classify`
#[derive(Debug, Deserialize)]
struct RestClassifyResponse {
    id: String,
    predicted_class: i64,
    #[serde(default)]
    label: Option<String>,
    confidence: f64,
    processing_time: f64,
}

/// Response body of `/stats`
///
/// `flagged_count` is missing when the service has no data yet.
#[derive(Debug, Deserialize)]
struct RestStatsResponse {
    total_prompts: u64,
    safe_count: u64,
    misuse_count: u64,
    #[serde(default)]
    flagged_count: u64,
}

/// Error body returned by the service
#[derive(Debug, Deserialize)]
struct RestErrorBody {
    error: String,
}

impl RestBackend {
    /// Create a new REST backend
    ///
    /// # Errors
    ///
    /// Returns error if HTTP client initialization fails
    pub fn new(config: RestConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(concat!("guardchat/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(GuardchatError::from)?;

        let base_url = config.base_url.trim_end_matches('/').to_string();
        tracing::info!("Initialized REST backend: base_url={}", base_url);

        Ok(Self { client, base_url })
    }

    /// Full URL of an operation path
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn error(message: impl Into<String>) -> anyhow::Error {
        GuardchatError::transport(BackendKind::Rest, message).into()
    }

    /// Turn a non-success response into a transport error, preferring the
    /// service's own `error` message over the raw body.
    async fn error_from_response(response: reqwest::Response) -> anyhow::Error {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let detail = serde_json::from_str::<RestErrorBody>(&body)
            .map(|b| b.error)
            .unwrap_or(body);
        tracing::error!("REST service returned error {}: {}", status, detail);
        Self::error(format!("service returned {}: {}", status, detail))
    }

    async fn send(&self, request: reqwest::RequestBuilder, what: &str) -> Result<reqwest::Response> {
        let response = request.send().await.map_err(|e| {
            tracing::warn!("REST {} request failed: {}", what, e);
            Self::error(format!("{} request failed: {}", what, e))
        })?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }
        Ok(response)
    }

    async fn send_json<T>(&self, request: reqwest::RequestBuilder, what: &str) -> Result<T>
    where
        T: for<'de> Deserialize<'de>,
    {
        let response = self.send(request, what).await?;
        response.json::<T>().await.map_err(|e| {
            tracing::error!("Failed to parse REST {} response: {}", what, e);
            Self::error(format!("malformed {} response: {}", what, e))
        })
    }
}

#[async_trait]
impl ClassifierBackend for RestBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Rest
    }

    async fn classify(&self, prompt: &str) -> Result<ClassificationResult> {
        let url = self.endpoint("classify");
        tracing::debug!("Sending REST classify request: {} chars", prompt.len());

        let body: RestClassifyResponse = self
            .send_json(
                self.client.post(&url).json(&ClassifyRequest { prompt }),
                "classify",
            )
            .await?;

        let predicted_class = Verdict::try_from(body.predicted_class).map_err(Self::error)?;
        let result = ClassificationResult {
            id: body.id,
            predicted_class,
            confidence: body.confidence,
            processing_time_seconds: body.processing_time,
            label: body.label,
        };

        if let Some(violation) = result.range_violation() {
            return Err(Self::error(format!("malformed classify response: {}", violation)));
        }

        tracing::debug!(
            "REST verdict: id={}, class={}, confidence={:.4}",
            result.id,
            result.predicted_class,
            result.confidence
        );
        Ok(result)
    }

    async fn fetch_stats(&self) -> Result<Stats> {
        let url = self.endpoint("stats");
        let body: RestStatsResponse = self.send_json(self.client.get(&url), "stats").await?;

        Ok(Stats {
            total_prompts: body.total_prompts,
            safe_count: body.safe_count,
            misuse_count: body.misuse_count,
            flagged_count: body.flagged_count,
        })
    }

    async fn flag(&self, id: &str) -> Result<()> {
        let url = self.endpoint("flag");
        self.send(self.client.post(&url).json(&FlagRequest { id }), "flag")
            .await?;
        tracing::debug!("REST flagged classification {}", id);
        Ok(())
    }
}
