//! In-process fakes for engine integration tests: resolver, fetcher,
//! temporary host and reply sink, all recording how they were called.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use mediagrab_core::error::{DeliveryError, ExecutionError, ExtractionError, JobError};
use mediagrab_core::{
    EnginePolicy, ExecutorParams, FormatSelection, MediaDescriptor, MediaFetcher, MediaJobEngine,
    MediaResolver, ReplySink, SinkError, StatusHandle, TemporaryHost,
};
use tempfile::TempDir;
use tokio::sync::Notify;

pub const MIB: u64 = 1024 * 1024;

pub fn descriptor(id: &str, duration_secs: Option<u64>, filesize: Option<u64>) -> MediaDescriptor {
    MediaDescriptor {
        id: id.to_string(),
        ext: "mp4".to_string(),
        title: format!("Clip {id}"),
        duration: duration_secs.map(Duration::from_secs),
        filesize,
        is_live: false,
        stream_urls: vec![format!("https://cdn.test/{id}.mp4")],
    }
}

pub enum ResolverOutcome {
    Descriptor(MediaDescriptor),
    ProviderError(String),
}

pub struct FakeResolver {
    outcome: ResolverOutcome,
    pub calls: Mutex<Vec<(String, FormatSelection)>>,
}

impl FakeResolver {
    pub fn returning(descriptor: MediaDescriptor) -> Arc<Self> {
        Arc::new(Self {
            outcome: ResolverOutcome::Descriptor(descriptor),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            outcome: ResolverOutcome::ProviderError(message.to_string()),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl MediaResolver for FakeResolver {
    fn name(&self) -> &str {
        "fake-resolver"
    }

    async fn resolve(
        &self,
        url: &str,
        options: &FormatSelection,
    ) -> Result<MediaDescriptor, JobError> {
        self.calls
            .lock()
            .unwrap()
            .push((url.to_string(), options.clone()));
        match &self.outcome {
            ResolverOutcome::Descriptor(descriptor) => Ok(descriptor.clone()),
            ResolverOutcome::ProviderError(message) => Err(ExtractionError::Provider {
                message: message.clone(),
            }
            .into()),
        }
    }
}

/// Writes a sparse file of `output_size` bytes (or nothing when `None`).
pub struct FakeFetcher {
    output_size: Option<u64>,
    gate: Option<(Arc<Notify>, Arc<Notify>)>,
    fail_after_write: Option<String>,
    pub calls: Mutex<Vec<(ExecutorParams, PathBuf)>>,
}

impl FakeFetcher {
    pub fn writing(size: u64) -> Arc<Self> {
        Arc::new(Self {
            output_size: Some(size),
            gate: None,
            fail_after_write: None,
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn writing_nothing() -> Arc<Self> {
        Arc::new(Self {
            output_size: None,
            gate: None,
            fail_after_write: None,
            calls: Mutex::new(Vec::new()),
        })
    }

    /// Signals `started` once running, then waits for `release`.
    pub fn gated(size: u64, started: Arc<Notify>, release: Arc<Notify>) -> Arc<Self> {
        Arc::new(Self {
            output_size: Some(size),
            gate: Some((started, release)),
            fail_after_write: None,
            calls: Mutex::new(Vec::new()),
        })
    }

    /// Leaves a partial file of `size` bytes behind, then reports the stream
    /// as not viable.
    pub fn partial_then_not_viable(size: u64, reason: &str) -> Arc<Self> {
        Arc::new(Self {
            output_size: Some(size),
            gate: None,
            fail_after_write: Some(reason.to_string()),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn last_call(&self) -> (ExecutorParams, PathBuf) {
        self.calls.lock().unwrap().last().cloned().unwrap()
    }
}

#[async_trait]
impl MediaFetcher for FakeFetcher {
    fn name(&self) -> &str {
        "fake-fetcher"
    }

    async fn fetch(
        &self,
        _url: &str,
        params: &ExecutorParams,
        output: &Path,
    ) -> Result<(), JobError> {
        self.calls
            .lock()
            .unwrap()
            .push((params.clone(), output.to_path_buf()));
        if let Some(size) = self.output_size {
            let file = tokio::fs::File::create(output).await.unwrap();
            file.set_len(size).await.unwrap();
        }
        if let Some((started, release)) = &self.gate {
            started.notify_one();
            release.notified().await;
        }
        if let Some(reason) = &self.fail_after_write {
            return Err(ExecutionError::StreamNotViable {
                reason: reason.clone(),
            }
            .into());
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct UploadCall {
    pub path: PathBuf,
    pub retention_hours: u32,
    pub existed: bool,
}

pub struct FakeHost {
    pub uploads: Mutex<Vec<UploadCall>>,
    fail_with: Option<String>,
}

impl FakeHost {
    pub fn ok() -> Arc<Self> {
        Arc::new(Self {
            uploads: Mutex::new(Vec::new()),
            fail_with: None,
        })
    }

    pub fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            uploads: Mutex::new(Vec::new()),
            fail_with: Some(message.to_string()),
        })
    }

    pub fn upload_count(&self) -> usize {
        self.uploads.lock().unwrap().len()
    }
}

#[async_trait]
impl TemporaryHost for FakeHost {
    fn name(&self) -> &str {
        "fake-host"
    }

    async fn upload(&self, path: &Path, retention_hours: u32) -> Result<String, DeliveryError> {
        self.uploads.lock().unwrap().push(UploadCall {
            path: path.to_path_buf(),
            retention_hours,
            existed: path.exists(),
        });
        match &self.fail_with {
            Some(message) => Err(DeliveryError::Host {
                message: message.clone(),
            }),
            None => Ok("https://litter.test/abc123.mp4".to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkEvent {
    Post(String),
    Edit(String),
    Delete,
    Attachment { filename: String, existed: bool },
    Message(String),
}

#[derive(Default)]
pub struct RecordingSink {
    pub events: Mutex<Vec<SinkEvent>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<SinkEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReplySink for RecordingSink {
    async fn post_status(&self, text: &str) -> Result<StatusHandle, SinkError> {
        self.events
            .lock()
            .unwrap()
            .push(SinkEvent::Post(text.to_string()));
        Ok(StatusHandle("status".to_string()))
    }

    async fn edit_status(&self, _handle: &StatusHandle, text: &str) -> Result<(), SinkError> {
        self.events
            .lock()
            .unwrap()
            .push(SinkEvent::Edit(text.to_string()));
        Ok(())
    }

    async fn delete_status(&self, _handle: &StatusHandle) -> Result<(), SinkError> {
        self.events.lock().unwrap().push(SinkEvent::Delete);
        Ok(())
    }

    async fn send_attachment(&self, path: &Path, filename: &str) -> Result<(), SinkError> {
        self.events.lock().unwrap().push(SinkEvent::Attachment {
            filename: filename.to_string(),
            existed: path.exists(),
        });
        Ok(())
    }

    async fn send_message(&self, text: &str) -> Result<(), SinkError> {
        self.events
            .lock()
            .unwrap()
            .push(SinkEvent::Message(text.to_string()));
        Ok(())
    }
}

pub fn test_policy(scratch: &TempDir) -> EnginePolicy {
    EnginePolicy {
        scratch_dir: scratch.path().join("scratch"),
        poll_interval: Duration::from_millis(10),
        ..EnginePolicy::default()
    }
}

pub fn engine(
    policy: EnginePolicy,
    resolver: Arc<FakeResolver>,
    fetcher: Arc<FakeFetcher>,
    host: Arc<FakeHost>,
) -> MediaJobEngine {
    MediaJobEngine::new(policy, resolver, fetcher, host)
}

/// Files left in the scratch directory (empty if it does not exist).
pub fn scratch_files(policy: &EnginePolicy) -> Vec<PathBuf> {
    std::fs::read_dir(&policy.scratch_dir)
        .map(|entries| entries.filter_map(Result::ok).map(|e| e.path()).collect())
        .unwrap_or_default()
}
