use std::time::Duration;

use async_trait::async_trait;
use ctxwatch_correlation::{GenerationRequest, GenerationResponse, ModelTransport, TransportError};
use reqwest::{Client, StatusCode};

use super::models::{GenerateContentRequest, GenerateContentResponse};

pub const DEFAULT_ATTEMPT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone)]
pub struct VertexClientConfig {
    pub base_url: String,
    pub project_id: String,
    pub location: String,
    pub model: String,
    pub access_token: String,
    pub max_retries: u32,
    pub timeout_secs: u64,
}

impl VertexClientConfig {
    /// Load Vertex AI config from environment.
    ///
    /// Returns `Ok(None)` if `VERTEX_PROJECT_ID` is not set (classifier disabled).
    /// Returns `Err` if a project is configured but `VERTEX_ACCESS_TOKEN` is missing.
    pub fn from_env() -> Result<Option<Self>, String> {
        let project_id = match std::env::var("VERTEX_PROJECT_ID").ok() {
            Some(v) if !v.trim().is_empty() => v,
            _ => return Ok(None),
        };

        let access_token = std::env::var("VERTEX_ACCESS_TOKEN").map_err(|_| {
            "VERTEX_ACCESS_TOKEN is required when VERTEX_PROJECT_ID is set, but not found"
                .to_string()
        })?;

        let location =
            std::env::var("VERTEX_LOCATION").unwrap_or_else(|_| "us-central1".to_string());
        let model =
            std::env::var("VERTEX_MODEL").unwrap_or_else(|_| "gemini-2.5-flash".to_string());
        let base_url = std::env::var("VERTEX_BASE_URL")
            .unwrap_or_else(|_| format!("https://{location}-aiplatform.googleapis.com"));

        let max_retries = std::env::var("VERTEX_MAX_RETRIES")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(2);
        // Per attempt. The classifier timeout bounds the whole retry loop.
        let timeout_secs = std::env::var("VERTEX_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_ATTEMPT_TIMEOUT_SECS);

        Ok(Some(Self {
            base_url,
            project_id,
            location,
            model,
            access_token,
            max_retries,
            timeout_secs,
        }))
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1/projects/{}/locations/{}/publishers/google/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.project_id,
            self.location,
            self.model
        )
    }
}

#[derive(Clone)]
pub struct VertexClient {
    client: Client,
    config: VertexClientConfig,
}

impl VertexClient {
    pub fn new(config: VertexClientConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client, config })
    }

    /// For testing: create a client pointing at a specific base URL (e.g., wiremock).
    #[cfg(test)]
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.config.base_url = base_url.to_string();
        self
    }

    async fn request_with_retry(
        &self,
        body: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, TransportError> {
        let url = self.config.endpoint();
        let mut last_error = String::new();

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                let backoff_secs = std::cmp::min(1u64 << attempt, 30);
                tracing::warn!(attempt, backoff_secs, "retrying model call after backoff");
                tokio::time::sleep(Duration::from_secs(backoff_secs)).await;
            }

            let response = match self
                .client
                .post(&url)
                .bearer_auth(&self.config.access_token)
                .json(body)
                .send()
                .await
            {
                Ok(resp) => resp,
                Err(e) => {
                    last_error = e.to_string();
                    if e.is_timeout() || e.is_connect() {
                        continue;
                    }
                    return Err(TransportError::Request(last_error));
                }
            };

            let status = response.status();

            if status.is_success() {
                return response
                    .json::<GenerateContentResponse>()
                    .await
                    .map_err(|e| TransportError::Request(e.to_string()));
            }

            if status == StatusCode::TOO_MANY_REQUESTS {
                if let Some(retry_after) = response
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                {
                    let wait = std::cmp::min(retry_after, 60);
                    tracing::warn!(wait, "rate-limited, waiting Retry-After");
                    tokio::time::sleep(Duration::from_secs(wait)).await;
                }
                last_error = "429 Too Many Requests".to_string();
                continue;
            }

            if status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                last_error = format!("{status}: {body}");
                continue;
            }

            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Http {
                status: status.as_u16(),
                body,
            });
        }

        Err(TransportError::MaxRetriesExceeded {
            attempts: self.config.max_retries + 1,
            last_error,
        })
    }
}

#[async_trait]
impl ModelTransport for VertexClient {
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResponse, TransportError> {
        let body = GenerateContentRequest::from(request);
        let response = self.request_with_retry(&body).await?;
        Ok(response.into())
    }
}
