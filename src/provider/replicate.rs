//! Replicate ControlNet (canny, SDXL) provider.

use crate::error::{sanitize_error_message, RenderError, Result};
use crate::provider::{ProviderInput, ProviderOutput, RenderProvider};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::{Duration, Instant};

/// Default Replicate API base URL.
pub const DEFAULT_API_BASE: &str = "https://api.replicate.com/v1";

/// Edge-conditioned SDXL model used for structure-preserving renders.
pub const MODEL_NAME: &str = "jagilley/controlnet-canny-sdxl";

/// Pinned model version.
pub const MODEL_VERSION: &str = "aff48af9c68d162388d230a2ab003f68d2638d88307bdaf1c2f1ac95079c9613";

/// Builder for [`ReplicateProvider`].
#[derive(Debug, Clone)]
pub struct ReplicateProviderBuilder {
    api_base: String,
    version: String,
    poll_interval: Duration,
    timeout: Duration,
}

impl Default for ReplicateProviderBuilder {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            version: MODEL_VERSION.to_string(),
            poll_interval: Duration::from_secs(1),
            timeout: Duration::from_secs(300),
        }
    }
}

impl ReplicateProviderBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the API base URL (no trailing slash needed).
    pub fn api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into();
        self
    }

    /// Overrides the pinned model version.
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Sets the polling interval while a prediction is running.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Sets the maximum time to wait for a prediction.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Builds the provider.
    pub fn build(self) -> Result<ReplicateProvider> {
        let api_base = self.api_base.trim().trim_end_matches('/').to_string();
        if api_base.is_empty() {
            return Err(RenderError::InvalidRequest("API base URL is empty".into()));
        }

        Ok(ReplicateProvider {
            client: reqwest::Client::new(),
            api_base,
            version: self.version,
            poll_interval: self.poll_interval,
            timeout: self.timeout,
        })
    }
}

/// Replicate prediction client.
///
/// Holds no credential: the token is resolved per request by the gateway.
pub struct ReplicateProvider {
    client: reqwest::Client,
    api_base: String,
    version: String,
    poll_interval: Duration,
    timeout: Duration,
}

impl ReplicateProvider {
    /// Creates a new [`ReplicateProviderBuilder`].
    pub fn builder() -> ReplicateProviderBuilder {
        ReplicateProviderBuilder::new()
    }

    /// The token is only ever sent to URLs under the configured API base.
    fn is_api_url(&self, url: &str) -> bool {
        url.strip_prefix(self.api_base.as_str())
            .is_some_and(|rest| rest.starts_with('/'))
    }

    fn parse_error(&self, status: u16, text: &str) -> RenderError {
        let message = match serde_json::from_str::<ReplicateErrorResponse>(text) {
            Ok(body) => body.detail.or(body.title).unwrap_or_else(|| text.to_string()),
            Err(_) => text.to_string(),
        };

        RenderError::Api {
            status,
            message: sanitize_error_message(&message),
        }
    }

    async fn create_prediction(
        &self,
        input: &ProviderInput,
        token: &str,
    ) -> Result<ReplicatePrediction> {
        let url = format!("{}/predictions", self.api_base);
        let body = ReplicatePredictionRequest {
            version: &self.version,
            input,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .header("Prefer", "wait")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(self.parse_error(status.as_u16(), &text));
        }

        Ok(response.json().await?)
    }

    async fn poll_until_done(
        &self,
        mut prediction: ReplicatePrediction,
        token: &str,
    ) -> Result<ReplicatePrediction> {
        let start = Instant::now();

        loop {
            match prediction.status.as_str() {
                "succeeded" => return Ok(prediction),
                "starting" | "processing" => {}
                "failed" | "canceled" => {
                    let reason = prediction
                        .error_message()
                        .unwrap_or_else(|| format!("prediction {}", prediction.status));
                    return Err(RenderError::UnexpectedResponse(sanitize_error_message(
                        &reason,
                    )));
                }
                other => {
                    return Err(RenderError::UnexpectedResponse(format!(
                        "Replicate returned unexpected status: {other}"
                    )));
                }
            }

            if start.elapsed() > self.timeout {
                return Err(RenderError::Timeout(self.timeout));
            }

            let poll_url = prediction
                .urls
                .as_ref()
                .and_then(|urls| urls.get.clone())
                .ok_or_else(|| {
                    RenderError::UnexpectedResponse("prediction is missing a poll URL".into())
                })?;
            if !self.is_api_url(&poll_url) {
                return Err(RenderError::UnexpectedResponse(format!(
                    "poll URL is outside the API base: {poll_url}"
                )));
            }

            tracing::debug!(
                prediction_id = %prediction.id,
                status = %prediction.status,
                elapsed_secs = start.elapsed().as_secs(),
                "polling Replicate prediction"
            );
            tokio::time::sleep(self.poll_interval).await;

            let response = self.client.get(&poll_url).bearer_auth(token).send().await?;
            let status = response.status();
            if !status.is_success() {
                let text = response.text().await.unwrap_or_default();
                return Err(self.parse_error(status.as_u16(), &text));
            }
            prediction = response.json().await?;
        }
    }

    /// Downloads a generated image.
    pub async fn download(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(RenderError::Api {
                status: response.status().as_u16(),
                message: "Failed to download image".into(),
            });
        }

        Ok(response.bytes().await?.to_vec())
    }
}

#[async_trait]
impl RenderProvider for ReplicateProvider {
    async fn run(&self, input: &ProviderInput, token: &str) -> Result<ProviderOutput> {
        let start = Instant::now();

        let prediction = self.create_prediction(input, token).await?;
        tracing::debug!(prediction_id = %prediction.id, status = %prediction.status, "created Replicate prediction");

        let prediction = self.poll_until_done(prediction, token).await?;
        tracing::debug!(
            prediction_id = %prediction.id,
            duration_ms = start.elapsed().as_millis() as u64,
            "Replicate prediction complete"
        );

        prediction.output.ok_or_else(|| {
            RenderError::UnexpectedResponse("Replicate prediction has no output".into())
        })
    }

    fn name(&self) -> &str {
        "Replicate (controlnet-canny-sdxl)"
    }
}

// -- Request types --

#[derive(Debug, Serialize)]
struct ReplicatePredictionRequest<'a> {
    version: &'a str,
    input: &'a ProviderInput,
}

// -- Response types --

#[derive(Debug, Deserialize)]
struct ReplicatePrediction {
    #[serde(default)]
    id: String,
    status: String,
    #[serde(default)]
    output: Option<ProviderOutput>,
    #[serde(default)]
    error: Option<Value>,
    #[serde(default)]
    urls: Option<PredictionUrls>,
}

impl ReplicatePrediction {
    fn error_message(&self) -> Option<String> {
        match self.error.as_ref()? {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct PredictionUrls {
    #[serde(default)]
    get: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ReplicateErrorResponse {
    #[serde(default)]
    detail: Option<String>,
    #[serde(default)]
    title: Option<String>,
}
