//! Size-tiered delivery of produced artifacts.
//!
//! | Tier | Size | Action |
//! |------|------|--------|
//! | [`DeliveryTier::Inline`] | `<= inline cap` (25 MiB) | attached to the reply |
//! | [`DeliveryTier::RemoteTemporary`] | `<= remote cap` (1 GiB) | uploaded to a [`TemporaryHost`] |
//! | [`DeliveryTier::Rejected`] | above | nothing uploaded |

mod litterbox;

pub use litterbox::{LITTERBOX_API_URL, LitterboxClient, SUPPORTED_RETENTION_HOURS};

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use indicatif::HumanBytes;
use tracing::{info, instrument};

use crate::error::DeliveryError;
use crate::job::Artifact;
use crate::sink::ReplySink;

/// Delivery channel chosen from the final artifact size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryTier {
    /// Attach directly to the reply.
    Inline,
    /// Upload to a temporary host and reply with a link.
    RemoteTemporary,
    /// Too large for every channel.
    Rejected,
}

impl DeliveryTier {
    /// Picks the tier for an artifact of `size` bytes.
    #[must_use]
    pub fn for_size(size: u64, inline_cap: u64, remote_cap: u64) -> Self {
        if size <= inline_cap {
            Self::Inline
        } else if size <= remote_cap {
            Self::RemoteTemporary
        } else {
            Self::Rejected
        }
    }
}

/// Outcome of a successful delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveredResult {
    /// The file was attached to the reply.
    Inline {
        /// Attachment filename.
        filename: String,
        /// Size in bytes.
        size: u64,
    },
    /// The file was uploaded to a temporary host.
    RemoteTemporary {
        /// Download link returned by the host.
        url: String,
        /// When the host drops the file.
        expires_at: DateTime<Utc>,
        /// Filename of the artifact.
        filename: String,
        /// Size in bytes.
        size: u64,
    },
}

impl DeliveredResult {
    /// Tier this result was delivered through.
    #[must_use]
    pub fn tier(&self) -> DeliveryTier {
        match self {
            Self::Inline { .. } => DeliveryTier::Inline,
            Self::RemoteTemporary { .. } => DeliveryTier::RemoteTemporary,
        }
    }
}

/// External host keeping files for a bounded time.
///
/// # Object Safety
///
/// Uses `async_trait` so the selector can hold an `Arc<dyn TemporaryHost>`.
#[async_trait]
pub trait TemporaryHost: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Uploads `path`, kept for `retention_hours`, and returns its link.
    async fn upload(&self, path: &Path, retention_hours: u32) -> Result<String, DeliveryError>;
}

/// Ships artifacts through the tier matching their actual size.
#[derive(Clone)]
pub struct DeliveryTierSelector {
    inline_cap: u64,
    remote_cap: u64,
    retention_hours: u32,
    host: Arc<dyn TemporaryHost>,
}

impl std::fmt::Debug for DeliveryTierSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeliveryTierSelector")
            .field("inline_cap", &self.inline_cap)
            .field("remote_cap", &self.remote_cap)
            .field("retention_hours", &self.retention_hours)
            .field("host", &self.host.name())
            .finish()
    }
}

impl DeliveryTierSelector {
    /// Creates a selector with the given caps and remote retention.
    #[must_use]
    pub fn new(
        inline_cap: u64,
        remote_cap: u64,
        retention_hours: u32,
        host: Arc<dyn TemporaryHost>,
    ) -> Self {
        Self {
            inline_cap,
            remote_cap,
            retention_hours,
            host,
        }
    }

    /// Tier for `artifact`.
    #[must_use]
    pub fn tier_for(&self, artifact: &Artifact) -> DeliveryTier {
        DeliveryTier::for_size(artifact.size, self.inline_cap, self.remote_cap)
    }

    /// Delivers `artifact`, attaching it or posting the uploaded link to `sink`.
    ///
    /// # Errors
    ///
    /// - [`DeliveryError::TooLarge`] for the rejected tier
    /// - host errors from the remote upload
    /// - [`DeliveryError::Sink`] if the sink refuses the attachment or link
    #[instrument(skip_all, fields(size = artifact.size, filename = %artifact.filename))]
    pub async fn deliver(
        &self,
        artifact: &Artifact,
        sink: &dyn ReplySink,
    ) -> Result<DeliveredResult, DeliveryError> {
        let tier = self.tier_for(artifact);
        info!(tier = ?tier, "delivering artifact");

        match tier {
            DeliveryTier::Inline => {
                sink.send_attachment(&artifact.path, &artifact.filename)
                    .await
                    .map_err(|err| DeliveryError::Sink {
                        message: err.to_string(),
                    })?;
                Ok(DeliveredResult::Inline {
                    filename: artifact.filename.clone(),
                    size: artifact.size,
                })
            }
            DeliveryTier::RemoteTemporary => {
                let url = self.host.upload(&artifact.path, self.retention_hours).await?;
                let expires_at = Utc::now() + TimeDelta::hours(i64::from(self.retention_hours));
                let text = format!(
                    "{} ({}): {url}\nExpires {}",
                    artifact.filename,
                    HumanBytes(artifact.size),
                    expires_at.format("%Y-%m-%d %H:%M UTC"),
                );
                sink.send_message(&text)
                    .await
                    .map_err(|err| DeliveryError::Sink {
                        message: err.to_string(),
                    })?;
                Ok(DeliveredResult::RemoteTemporary {
                    url,
                    expires_at,
                    filename: artifact.filename.clone(),
                    size: artifact.size,
                })
            }
            DeliveryTier::Rejected => Err(DeliveryError::TooLarge {
                size: artifact.size,
                limit: self.remote_cap,
            }),
        }
    }
}
