//! One-shot job run for the command line.

use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use mediagrab_core::{
    DeliveredResult, EnginePolicy, JobRequest, MediaJobEngine, OutputFormat, SubmitError,
    TrimSpec, ValidationError,
};
use tracing::{debug, error, info};

use crate::app::config;
use crate::app::console::{ConsoleSink, should_use_spinner};
use crate::cli::Args;

/// Exit code for requests rejected before a job was admitted.
const EXIT_INVALID_REQUEST: u8 = 2;

/// Exit code for admission rejections (busy or cooling down).
const EXIT_REJECTED: u8 = 3;

/// Engine policy and output directory after layering config file and flags.
#[derive(Debug)]
pub(crate) struct ResolvedSettings {
    pub(crate) policy: EnginePolicy,
    pub(crate) output_dir: PathBuf,
}

pub(crate) fn resolve_settings(args: &Args, file: Option<&config::FileConfig>) -> ResolvedSettings {
    let mut policy = EnginePolicy::default();
    let mut output_dir = PathBuf::from(".");
    if let Some(file) = file {
        file.apply(&mut policy);
        if let Some(dir) = &file.output_dir {
            output_dir.clone_from(dir);
        }
    }
    if let Some(dir) = &args.scratch_dir {
        policy.scratch_dir.clone_from(dir);
    }
    if let Some(tool) = &args.tool {
        policy.tool_path.clone_from(tool);
    }
    if let Some(dir) = &args.output_dir {
        output_dir.clone_from(dir);
    }
    ResolvedSettings { policy, output_dir }
}

pub(crate) fn build_request(args: &Args) -> Result<JobRequest, ValidationError> {
    let mut builder = JobRequest::builder(&args.url, &args.requester)
        .audio_only(args.audio)
        .bypass_policy(args.bypass_policy);
    if let Some(format) = &args.format {
        builder = builder.format(format);
    }
    if let Some(selection) = &args.trim {
        builder = builder.trim(TrimSpec::parse(selection)?);
    }
    if args.mp3 {
        builder = builder.output_format(OutputFormat::Mp3);
    }
    builder.build()
}

pub(crate) async fn run(args: Args) -> Result<ExitCode> {
    let file_config = if args.no_config {
        None
    } else {
        config::load_config(args.config.as_deref())?
    };
    let settings = resolve_settings(&args, file_config.as_ref());
    debug!(policy = ?settings.policy, output_dir = %settings.output_dir.display(), "settings resolved");

    let request = match build_request(&args) {
        Ok(request) => request,
        Err(err) => {
            eprintln!("{err}");
            return Ok(ExitCode::from(EXIT_INVALID_REQUEST));
        }
    };

    let engine = MediaJobEngine::with_default_backends(settings.policy)
        .context("Failed to initialise the upload client")?;
    let sink = Arc::new(ConsoleSink::new(
        settings.output_dir,
        should_use_spinner(io::stderr().is_terminal(), args.quiet),
    ));

    match engine.submit(request, sink).await {
        Ok(DeliveredResult::Inline { filename, size }) => {
            info!(filename = %filename, size, "delivered inline");
            Ok(ExitCode::SUCCESS)
        }
        Ok(DeliveredResult::RemoteTemporary {
            url, expires_at, ..
        }) => {
            info!(url = %url, expires_at = %expires_at, "delivered via temporary host");
            Ok(ExitCode::SUCCESS)
        }
        Err(SubmitError::Rejected(err)) => {
            eprintln!("{err}");
            Ok(ExitCode::from(EXIT_REJECTED))
        }
        Err(SubmitError::Failed(err)) => {
            if err.is_internal() {
                error!(error = %err, "internal failure");
            }
            eprintln!("{err}");
            Ok(ExitCode::FAILURE)
        }
    }
}
