//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

/// Download remote media through the mediagrab job engine.
///
/// Resolves the URL with the extraction tool, optionally trims it, and
/// delivers the result into the output directory (small files) or as a
/// temporary link (large files).
#[derive(Parser, Debug)]
#[command(name = "mediagrab")]
#[command(author, version, about)]
pub struct Args {
    /// Media URL
    pub url: String,

    /// Format selector passed to the extraction tool (not combinable with --trim)
    #[arg(short = 'f', long)]
    pub format: Option<String>,

    /// Trim selection as START-END (e.g. 10-40, 01:15-01:27, 1m-1m30s)
    #[arg(short = 't', long, value_name = "START-END")]
    pub trim: Option<String>,

    /// Download audio only
    #[arg(short = 'a', long)]
    pub audio: bool,

    /// Convert audio to MP3 (implies --audio)
    #[arg(long)]
    pub mp3: bool,

    /// Requester identity used for cooldowns and operator checks
    #[arg(long, default_value = "local")]
    pub requester: String,

    /// Ask to bypass duration/size limits (honoured for the configured operator only)
    #[arg(long)]
    pub bypass_policy: bool,

    /// Scratch directory for in-progress artifacts
    #[arg(long)]
    pub scratch_dir: Option<PathBuf>,

    /// Directory inline deliveries are copied to
    #[arg(short = 'o', long)]
    pub output_dir: Option<PathBuf>,

    /// Extraction tool binary
    #[arg(long)]
    pub tool: Option<PathBuf>,

    /// Config file (defaults to $XDG_CONFIG_HOME/mediagrab/config.toml)
    #[arg(long, conflicts_with = "no_config")]
    pub config: Option<PathBuf>,

    /// Ignore config files
    #[arg(long)]
    pub no_config: bool,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_url_only() {
        let args = Args::try_parse_from(["mediagrab", "https://youtu.be/x"]).unwrap();
        assert_eq!(args.url, "https://youtu.be/x");
        assert_eq!(args.requester, "local");
        assert!(args.trim.is_none());
        assert!(!args.audio && !args.mp3 && !args.bypass_policy);
        assert_eq!(args.verbose, 0);
    }

    #[test]
    fn test_cli_requires_url() {
        let err = Args::try_parse_from(["mediagrab"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn test_cli_trim_and_audio_flags() {
        let args = Args::try_parse_from([
            "mediagrab",
            "https://youtu.be/x",
            "--trim",
            "10-40",
            "--mp3",
            "-vv",
        ])
        .unwrap();
        assert_eq!(args.trim.as_deref(), Some("10-40"));
        assert!(args.mp3);
        assert_eq!(args.verbose, 2);
    }

    #[test]
    fn test_cli_config_conflicts_with_no_config() {
        let err = Args::try_parse_from([
            "mediagrab",
            "https://youtu.be/x",
            "--config",
            "a.toml",
            "--no-config",
        ])
        .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn test_cli_help_flag_shows_usage() {
        let err = Args::try_parse_from(["mediagrab", "--help"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }
}
