//! Litterbox temporary file host client.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client};
use tracing::{debug, info, instrument};

use super::TemporaryHost;
use crate::error::DeliveryError;
use crate::user_agent;

/// Public Litterbox upload endpoint.
pub const LITTERBOX_API_URL: &str = "https://litterbox.catbox.moe/resources/internals/api.php";

/// Retention periods the host accepts, in hours.
pub const SUPPORTED_RETENTION_HOURS: [u32; 4] = [1, 12, 24, 72];

const UPLOAD_TIMEOUT: Duration = Duration::from_secs(120);

/// Uploads artifacts to Litterbox.
#[derive(Debug, Clone)]
pub struct LitterboxClient {
    client: Client,
    endpoint: String,
}

impl LitterboxClient {
    /// Creates a client for the public endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryError::Network`] if the HTTP client cannot be built.
    pub fn new() -> Result<Self, DeliveryError> {
        Self::with_endpoint(LITTERBOX_API_URL)
    }

    /// Creates a client posting to `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryError::Network`] if the HTTP client cannot be built.
    pub fn with_endpoint(endpoint: impl Into<String>) -> Result<Self, DeliveryError> {
        let client = Client::builder()
            .user_agent(user_agent::default_upload_user_agent())
            .timeout(UPLOAD_TIMEOUT)
            .build()
            .map_err(|source| DeliveryError::Network { source })?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    /// Endpoint uploads are posted to.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

/// First non-blank line of a response body.
fn first_line(body: &str) -> Option<&str> {
    body.lines().map(str::trim).find(|line| !line.is_empty())
}

#[async_trait]
impl TemporaryHost for LitterboxClient {
    fn name(&self) -> &str {
        "litterbox"
    }

    #[instrument(skip(self), fields(host = "litterbox", path = %path.display()))]
    async fn upload(&self, path: &Path, retention_hours: u32) -> Result<String, DeliveryError> {
        if !SUPPORTED_RETENTION_HOURS.contains(&retention_hours) {
            return Err(DeliveryError::InvalidRetention {
                hours: retention_hours,
            });
        }

        let io_error = |source| DeliveryError::Io {
            path: path.to_path_buf(),
            source,
        };
        let file = tokio::fs::File::open(path).await.map_err(io_error)?;
        let length = file.metadata().await.map_err(io_error)?.len();
        let filename = path
            .file_name()
            .map_or_else(|| "upload".to_string(), |name| name.to_string_lossy().into_owned());

        let part = Part::stream_with_length(Body::from(file), length).file_name(filename);
        let form = Form::new()
            .text("reqtype", "fileupload")
            .text("time", format!("{retention_hours}h"))
            .part("fileToUpload", part);

        debug!(length, "uploading artifact");
        let response = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(DeliveryError::from_transport)?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(DeliveryError::from_transport)?;

        if status.is_success() || status.is_redirection() {
            let link = body.trim().to_string();
            info!(status = status.as_u16(), link = %link, "upload complete");
            Ok(link)
        } else {
            debug!(status = status.as_u16(), body = %body, "upload rejected");
            Err(DeliveryError::Host {
                message: first_line(&body)
                    .map_or_else(|| format!("Upload failed with HTTP {status}."), str::to_string),
            })
        }
    }
}
