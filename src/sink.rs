//! Reply surface supplied by the command layer.
//!
//! The engine never formats rich messages. It posts and edits one transient
//! status line while the job runs and hands the final artifact or link to
//! the sink; rendering is the caller's business.

use std::path::Path;

use async_trait::async_trait;
use thiserror::Error;

/// Opaque handle to a posted status message.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StatusHandle(pub String);

/// A sink operation failed.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct SinkError {
    /// Sink-provided reason.
    pub message: String,
}

impl SinkError {
    /// Creates a sink error from any displayable reason.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Where status updates and results are sent.
///
/// # Object Safety
///
/// Uses `async_trait` so the engine and monitor can share an
/// `Arc<dyn ReplySink>`.
#[async_trait]
pub trait ReplySink: Send + Sync {
    /// Posts a new transient status message.
    async fn post_status(&self, text: &str) -> Result<StatusHandle, SinkError>;

    /// Replaces the text of a status message.
    async fn edit_status(&self, handle: &StatusHandle, text: &str) -> Result<(), SinkError>;

    /// Removes a status message.
    async fn delete_status(&self, handle: &StatusHandle) -> Result<(), SinkError>;

    /// Sends `path` as an attachment named `filename`.
    async fn send_attachment(&self, path: &Path, filename: &str) -> Result<(), SinkError>;

    /// Sends a plain text message.
    async fn send_message(&self, text: &str) -> Result<(), SinkError>;
}
