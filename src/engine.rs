//! Job orchestration.
//!
//! [`MediaJobEngine::submit`] drives one request through the whole
//! lifecycle:
//!
//! 1. the [`JobManager`] admits it (global slot + cooldown)
//! 2. the URL is screened and the trim selection validated
//! 3. the resolver produces a descriptor, checked by the constraint evaluator
//! 4. the trim planner derives executor parameters
//! 5. the executor runs while the progress monitor reports
//! 6. the delivery selector ships the artifact
//!
//! The monitor starts once step 2 passes, so requests rejected up front never
//! post a status. Whatever happens in steps 2 to 6, the scratch file is
//! reclaimed, the monitor is stopped and awaited, and only then is the slot
//! released.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{Span, error, info, instrument, warn};

use crate::constraints::ConstraintEvaluator;
use crate::delivery::{DeliveredResult, DeliveryTierSelector, LitterboxClient, TemporaryHost};
use crate::error::{DeliveryError, JobError, SubmitError};
use crate::executor::{DownloadExecutor, MediaFetcher, YtDlpFetcher};
use crate::guard::JobManager;
use crate::job::{JobPhase, JobRequest, JobState};
use crate::monitor::ProgressMonitor;
use crate::policy::EnginePolicy;
use crate::resolver::{MediaResolver, YtDlpResolver, screen_url};
use crate::scratch::ensure_scratch_dir;
use crate::sink::ReplySink;
use crate::trim::TrimPlanner;

/// The media acquisition job engine.
pub struct MediaJobEngine {
    policy: EnginePolicy,
    manager: Arc<JobManager>,
    resolver: Arc<dyn MediaResolver>,
    executor: DownloadExecutor,
    delivery: DeliveryTierSelector,
    constraints: ConstraintEvaluator,
    planner: TrimPlanner,
}

impl std::fmt::Debug for MediaJobEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaJobEngine")
            .field("policy", &self.policy)
            .field("resolver", &self.resolver.name())
            .field("executor", &self.executor)
            .field("delivery", &self.delivery)
            .finish_non_exhaustive()
    }
}

impl MediaJobEngine {
    /// Creates an engine from explicit collaborators.
    #[must_use]
    pub fn new(
        policy: EnginePolicy,
        resolver: Arc<dyn MediaResolver>,
        fetcher: Arc<dyn MediaFetcher>,
        host: Arc<dyn TemporaryHost>,
    ) -> Self {
        Self {
            manager: JobManager::new(policy.cooldown),
            executor: DownloadExecutor::new(fetcher, policy.scratch_dir.clone()),
            delivery: DeliveryTierSelector::new(
                policy.inline_size_cap,
                policy.remote_size_cap,
                policy.retention_hours,
                host,
            ),
            constraints: ConstraintEvaluator::new(policy.max_duration, policy.remote_size_cap),
            planner: TrimPlanner::new(policy.max_duration, policy.remote_size_cap),
            resolver,
            policy,
        }
    }

    /// Creates an engine backed by the extraction tool and Litterbox.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryError`] if the upload client cannot be built.
    pub fn with_default_backends(policy: EnginePolicy) -> Result<Self, DeliveryError> {
        let resolver = Arc::new(YtDlpResolver::new(
            policy.tool_path.clone(),
            policy.socket_timeout,
        ));
        let fetcher = Arc::new(YtDlpFetcher::new(
            policy.tool_path.clone(),
            policy.socket_timeout,
        ));
        let host = Arc::new(LitterboxClient::new()?);
        Ok(Self::new(policy, resolver, fetcher, host))
    }

    /// Policy in force.
    #[must_use]
    pub fn policy(&self) -> &EnginePolicy {
        &self.policy
    }

    /// Admission manager, shared by every submission.
    #[must_use]
    pub fn manager(&self) -> &Arc<JobManager> {
        &self.manager
    }

    /// Runs one job end to end.
    ///
    /// # Errors
    ///
    /// - [`SubmitError::Rejected`] if the job was not admitted
    /// - [`SubmitError::Failed`] if the admitted job failed at any phase
    #[instrument(
        skip_all,
        fields(requester = %request.requester(), url = %request.url(), job_id = tracing::field::Empty)
    )]
    pub async fn submit(
        &self,
        request: JobRequest,
        sink: Arc<dyn ReplySink>,
    ) -> Result<DeliveredResult, SubmitError> {
        let permit = self.manager.admit(request.requester())?;
        Span::current().record("job_id", permit.id());

        let mut state = JobState::new(permit.id());
        let mut monitor = None;
        let trimmed = request.trim().is_some();
        let outcome = self
            .run(&request, &mut state, &sink, &mut monitor)
            .await
            .map_err(|err| err.for_trimmed_job(trimmed));

        if let Err(cleanup) = state.reclaim_scratch().await {
            error!(error = %cleanup, "scratch cleanup failed");
        }
        match &outcome {
            Ok(_) => {
                if let Err(transition) = state.advance(JobPhase::Done) {
                    error!(error = %transition, "failed to mark job done");
                }
            }
            Err(err) => state.fail(err.to_string()),
        }
        if let Some(monitor) = monitor
            && let Err(join) = monitor.await
        {
            warn!(error = %join, "progress monitor task ended abnormally");
        }

        match &outcome {
            Ok(delivered) => info!(tier = ?delivered.tier(), "job done"),
            Err(err) if err.is_internal() => {
                error!(class = err.class(), error = %err, "job failed with internal error");
            }
            Err(err) => info!(class = err.class(), error = %err, "job failed"),
        }

        permit.finish(outcome.is_ok());
        outcome.map_err(SubmitError::from)
    }

    async fn run(
        &self,
        request: &JobRequest,
        state: &mut JobState,
        sink: &Arc<dyn ReplySink>,
        monitor: &mut Option<JoinHandle<()>>,
    ) -> Result<DeliveredResult, JobError> {
        screen_url(request.url())?;
        let window = request
            .trim()
            .map(|spec| self.planner.window(spec))
            .transpose()?;
        let bypass = request.bypass_policy() && self.policy.is_operator(request.requester());
        if request.bypass_policy() && !bypass {
            warn!("policy bypass requested by a non-operator; ignored");
        }

        state.advance(JobPhase::Resolving)?;
        *monitor = Some(
            ProgressMonitor::new(
                self.policy.scratch_dir.clone(),
                self.policy.poll_interval,
                Arc::clone(sink),
            )
            .spawn(state.subscribe()),
        );

        let selection = self.planner.selection(request, window.as_ref());
        let descriptor = self.resolver.resolve(request.url(), &selection).await?;
        self.constraints
            .evaluate(&descriptor, window.is_some(), bypass)?;
        let params = self
            .planner
            .plan(request, &descriptor, window.as_ref(), bypass)?;

        state.advance(JobPhase::Downloading)?;
        ensure_scratch_dir(self.executor.scratch_dir()).await?;
        state.track_scratch(self.executor.expected_path(&descriptor, &params)?);
        let artifact = self
            .executor
            .execute(request.url(), &descriptor, &params)
            .await?;

        state.advance(JobPhase::Uploading)?;
        let delivered = self.delivery.deliver(&artifact, sink.as_ref()).await?;
        Ok(delivered)
    }
}
