//! Extraction tool process invocation.
//!
//! Both the resolver and the download executor drive the same external
//! binary. This module owns spawning it with piped output, collecting the
//! result without blocking the runtime, and killing the child if the awaiting
//! future is dropped.

use std::path::Path;
use std::process::{ExitStatus, Stdio};

use tokio::process::Command;
use tracing::{debug, instrument};

use crate::error::ExtractionError;

/// Collected output of one tool run.
#[derive(Debug)]
pub struct ToolOutput {
    /// Exit status.
    pub status: ExitStatus,
    /// Raw stdout bytes.
    pub stdout: Vec<u8>,
    /// Stderr decoded lossily.
    pub stderr: String,
}

impl ToolOutput {
    /// Whether the tool exited with status 0.
    #[must_use]
    pub fn success(&self) -> bool {
        self.status.success()
    }

    /// Stdout decoded lossily.
    #[must_use]
    pub fn stdout_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }
}

/// Runs `program` with `args` and waits for it to exit.
///
/// # Errors
///
/// Returns [`ExtractionError::ToolUnavailable`] when the process cannot be
/// spawned or awaited.
#[instrument(level = "debug", skip(args), fields(program = %program.display(), argc = args.len()))]
pub async fn run_tool(program: &Path, args: &[String]) -> Result<ToolOutput, ExtractionError> {
    let unavailable = |source| ExtractionError::ToolUnavailable {
        tool: program.display().to_string(),
        source,
    };

    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(unavailable)?;

    debug!(
        status = ?output.status.code(),
        stdout_bytes = output.stdout.len(),
        stderr_bytes = output.stderr.len(),
        "tool exited"
    );

    Ok(ToolOutput {
        status: output.status,
        stdout: output.stdout,
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

#[cfg(all(test, unix))]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_tool_collects_output() {
        let args = vec!["-c".to_string(), "printf out; printf err >&2; exit 3".to_string()];
        let output = run_tool(Path::new("sh"), &args).await.unwrap();
        assert!(!output.success());
        assert_eq!(output.status.code(), Some(3));
        assert_eq!(output.stdout_lossy(), "out");
        assert_eq!(output.stderr, "err");
    }

    #[tokio::test]
    async fn test_run_tool_missing_binary_is_unavailable() {
        let err = run_tool(Path::new("/nonexistent/definitely-not-a-tool"), &[])
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractionError::ToolUnavailable { .. }));
    }
}
