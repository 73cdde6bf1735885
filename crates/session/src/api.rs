//! REST client for the studio generation service.
//!
//! Wraps the producer's HTTP endpoints (generation submission, operation
//! polling, artifact download, credential probe) using [`reqwest`]. All
//! requests authenticate with the session's bearer key.

use serde::Deserialize;

/// HTTP client for one studio account.
pub struct StudioApi {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

/// Response returned when a generation request is accepted.
#[derive(Debug, Deserialize)]
pub struct SubmitAccepted {
    /// Server-assigned identifier for the queued generation.
    pub operation_id: String,
}

/// Lifecycle state reported for a queued generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationState {
    Pending,
    Running,
    Succeeded,
    Failed,
    /// A state this client does not know; treated as still in flight.
    #[serde(other)]
    Unknown,
}

impl OperationState {
    pub fn is_terminal(self) -> bool {
        matches!(self, OperationState::Succeeded | OperationState::Failed)
    }
}

/// Response returned by the operation polling endpoint.
#[derive(Debug, Deserialize)]
pub struct OperationStatus {
    pub state: OperationState,
    /// Artifact location, present once the operation succeeded. May be
    /// absolute or relative to the API base.
    #[serde(default)]
    pub video_url: Option<String>,
    /// Producer-reported failure reason, present once failed.
    #[serde(default)]
    pub error: Option<String>,
}

/// Errors from the studio REST layer.
#[derive(Debug, thiserror::Error)]
pub enum StudioApiError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The service returned a non-2xx status code.
    #[error("studio API error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body for diagnosis.
        body: String,
    },
}

impl StudioApi {
    /// Create a client for one account.
    ///
    /// * `base_url` - service base, e.g. `https://studio.example.com`.
    /// * `api_key` - bearer credential for this account.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    /// Probe the credential without submitting work.
    ///
    /// Sends `GET /v1/account`; a 2xx means the key is usable.
    pub async fn verify_access(&self) -> Result<(), StudioApiError> {
        let response = self
            .client
            .get(format!("{}/v1/account", self.base_url))
            .bearer_auth(&self.api_key)
            .send()
            .await?;

        Self::check_status(response).await
    }

    /// Submit a generation request.
    ///
    /// Sends `POST /v1/generations`. With no reference images the body is
    /// JSON; with images it is a multipart form carrying the prompt and
    /// one part per image. Returns the server-assigned operation id.
    pub async fn submit_generation(
        &self,
        prompt: &str,
        client_id: &str,
        reference_images: Vec<(String, Vec<u8>)>,
    ) -> Result<SubmitAccepted, StudioApiError> {
        let url = format!("{}/v1/generations", self.base_url);
        let request = self.client.post(url).bearer_auth(&self.api_key);

        let response = if reference_images.is_empty() {
            let body = serde_json::json!({
                "prompt": prompt,
                "client_id": client_id,
            });
            request.json(&body).send().await?
        } else {
            let mut form = reqwest::multipart::Form::new()
                .text("prompt", prompt.to_string())
                .text("client_id", client_id.to_string());
            for (filename, bytes) in reference_images {
                let part = reqwest::multipart::Part::bytes(bytes).file_name(filename);
                form = form.part("reference_images", part);
            }
            request.multipart(form).send().await?
        };

        Self::parse_response(response).await
    }

    /// Poll a queued generation.
    ///
    /// Sends `GET /v1/operations/{operation_id}`.
    pub async fn operation_status(
        &self,
        operation_id: &str,
    ) -> Result<OperationStatus, StudioApiError> {
        let response = self
            .client
            .get(format!("{}/v1/operations/{}", self.base_url, operation_id))
            .bearer_auth(&self.api_key)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// Download a finished artifact.
    ///
    /// `url` may be absolute or relative to the API base.
    pub async fn download_artifact(&self, url: &str) -> Result<Vec<u8>, StudioApiError> {
        let absolute = self.resolve_url(url);
        let response = self
            .client
            .get(absolute)
            .bearer_auth(&self.api_key)
            .send()
            .await?;

        let response = Self::ensure_success(response).await?;
        Ok(response.bytes().await?.to_vec())
    }

    // ---- private helpers ----

    fn resolve_url(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") {
            url.to_string()
        } else {
            format!("{}{}", self.base_url, url)
        }
    }

    /// Ensure the response has a success status code. Returns the
    /// response unchanged on success, or a [`StudioApiError::Api`]
    /// carrying the status and body text on failure.
    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, StudioApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(StudioApiError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Parse a successful JSON response body into the expected type.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, StudioApiError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }

    /// Assert the response has a success status code, discarding the body.
    async fn check_status(response: reqwest::Response) -> Result<(), StudioApiError> {
        Self::ensure_success(response).await?;
        Ok(())
    }
}
