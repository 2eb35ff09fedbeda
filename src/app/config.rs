//! File configuration for engine policy defaults.
//!
//! The file uses a flat `key = value` layout (TOML subset): strings are
//! double-quoted, integers bare, `#` starts a comment.
//!
//! ```text
//! scratch_dir = "data/temp"
//! tool_path = "/usr/local/bin/yt-dlp"
//! operator_id = "1234"
//! inline_size_cap_mib = 25
//! retention_hours = 24
//! ```

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use mediagrab_core::EnginePolicy;
use mediagrab_core::delivery::SUPPORTED_RETENTION_HOURS;
use mediagrab_core::policy::MIB;

/// Values read from the config file. Unset keys keep the policy default.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileConfig {
    /// Scratch directory for artifacts.
    pub scratch_dir: Option<PathBuf>,
    /// Where inline deliveries are copied to.
    pub output_dir: Option<PathBuf>,
    /// Extraction tool binary.
    pub tool_path: Option<PathBuf>,
    /// Identity allowed to bypass policy checks.
    pub operator_id: Option<String>,
    /// Inline delivery cap in MiB.
    pub inline_size_cap_mib: Option<u64>,
    /// Remote delivery cap in MiB.
    pub remote_size_cap_mib: Option<u64>,
    /// Maximum media duration in seconds.
    pub max_duration_secs: Option<u64>,
    /// Per-requester cooldown in seconds.
    pub cooldown_secs: Option<u64>,
    /// Progress sampling interval in milliseconds.
    pub poll_interval_ms: Option<u64>,
    /// Temporary host retention in hours.
    pub retention_hours: Option<u32>,
    /// Extraction tool socket timeout in seconds.
    pub socket_timeout_secs: Option<u64>,
}

impl FileConfig {
    /// Validates values against engine constraints.
    pub fn validate(&self) -> Result<()> {
        validate_range("inline_size_cap_mib", self.inline_size_cap_mib, 1, 1024 * 1024)?;
        validate_range("remote_size_cap_mib", self.remote_size_cap_mib, 1, 1024 * 1024)?;
        if let (Some(inline), Some(remote)) = (self.inline_size_cap_mib, self.remote_size_cap_mib)
            && inline > remote
        {
            bail!(
                "Invalid config: `inline_size_cap_mib` ({inline}) exceeds `remote_size_cap_mib` ({remote})"
            );
        }
        validate_range("max_duration_secs", self.max_duration_secs, 1, 86_400)?;
        validate_range("cooldown_secs", self.cooldown_secs, 0, 86_400)?;
        validate_range("poll_interval_ms", self.poll_interval_ms, 100, 60_000)?;
        validate_range("socket_timeout_secs", self.socket_timeout_secs, 1, 300)?;
        if let Some(hours) = self.retention_hours
            && !SUPPORTED_RETENTION_HOURS.contains(&hours)
        {
            bail!(
                "Invalid config value for `retention_hours`: {hours}. Expected one of: {SUPPORTED_RETENTION_HOURS:?}"
            );
        }
        if self.operator_id.as_deref().is_some_and(str::is_empty) {
            bail!("Invalid config value for `operator_id`: must not be empty");
        }
        Ok(())
    }

    /// Writes every set value into `policy`.
    pub fn apply(&self, policy: &mut EnginePolicy) {
        if let Some(dir) = &self.scratch_dir {
            policy.scratch_dir.clone_from(dir);
        }
        if let Some(tool) = &self.tool_path {
            policy.tool_path.clone_from(tool);
        }
        if let Some(operator) = &self.operator_id {
            policy.operator_id = Some(operator.clone());
        }
        if let Some(mib) = self.inline_size_cap_mib {
            policy.inline_size_cap = mib * MIB;
        }
        if let Some(mib) = self.remote_size_cap_mib {
            policy.remote_size_cap = mib * MIB;
        }
        if let Some(secs) = self.max_duration_secs {
            policy.max_duration = Duration::from_secs(secs);
        }
        if let Some(secs) = self.cooldown_secs {
            policy.cooldown = Duration::from_secs(secs);
        }
        if let Some(ms) = self.poll_interval_ms {
            policy.poll_interval = Duration::from_millis(ms);
        }
        if let Some(hours) = self.retention_hours {
            policy.retention_hours = hours;
        }
        if let Some(secs) = self.socket_timeout_secs {
            policy.socket_timeout = Duration::from_secs(secs);
        }
    }
}

fn validate_range(field: &str, value: Option<u64>, min: u64, max: u64) -> Result<()> {
    let Some(value) = value else {
        return Ok(());
    };
    if !(min..=max).contains(&value) {
        bail!("Invalid config value for `{field}`: {value}. Expected range: {min}..={max}");
    }
    Ok(())
}

/// Resolves the default config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/mediagrab/config.toml`
/// 2. `$HOME/.config/mediagrab/config.toml`
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    if let Some(xdg_config_home) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Some(
            PathBuf::from(xdg_config_home)
                .join("mediagrab")
                .join("config.toml"),
        );
    }

    let home = env_var_non_empty_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("mediagrab")
            .join("config.toml"),
    )
}

fn env_var_non_empty_os(name: &str) -> Option<std::ffi::OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

/// Loads `explicit` if given (it must exist), otherwise the default path if
/// a file is present there.
pub fn load_config(explicit: Option<&Path>) -> Result<Option<FileConfig>> {
    if let Some(path) = explicit {
        return load_file_config(path).map(Some);
    }
    match resolve_default_config_path() {
        Some(path) if path.exists() => load_file_config(&path).map(Some),
        _ => Ok(None),
    }
}

fn load_file_config(path: &Path) -> Result<FileConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
    parse_config_str(&raw)
        .with_context(|| format!("Failed to parse config file '{}'", path.display()))
}

fn parse_config_str(raw: &str) -> Result<FileConfig> {
    let mut cfg = FileConfig::default();
    for (line_index, raw_line) in raw.lines().enumerate() {
        let line_no = line_index + 1;
        let line = strip_inline_comment(raw_line).trim();
        if line.is_empty() {
            continue;
        }

        let Some((raw_key, raw_value)) = line.split_once('=') else {
            bail!("Invalid config syntax on line {line_no}: expected key = value");
        };
        let key = raw_key.trim();
        let value = raw_value.trim();
        let invalid = || format!("Invalid `{key}` value on line {line_no}");

        match key {
            "scratch_dir" => {
                cfg.scratch_dir = Some(PathBuf::from(
                    parse_string_literal(value).with_context(invalid)?,
                ));
            }
            "output_dir" => {
                cfg.output_dir = Some(PathBuf::from(
                    parse_string_literal(value).with_context(invalid)?,
                ));
            }
            "tool_path" => {
                cfg.tool_path = Some(PathBuf::from(
                    parse_string_literal(value).with_context(invalid)?,
                ));
            }
            "operator_id" => {
                cfg.operator_id = Some(parse_string_literal(value).with_context(invalid)?);
            }
            "inline_size_cap_mib" => {
                cfg.inline_size_cap_mib = Some(parse_integer_u64(value).with_context(invalid)?);
            }
            "remote_size_cap_mib" => {
                cfg.remote_size_cap_mib = Some(parse_integer_u64(value).with_context(invalid)?);
            }
            "max_duration_secs" => {
                cfg.max_duration_secs = Some(parse_integer_u64(value).with_context(invalid)?);
            }
            "cooldown_secs" => {
                cfg.cooldown_secs = Some(parse_integer_u64(value).with_context(invalid)?);
            }
            "poll_interval_ms" => {
                cfg.poll_interval_ms = Some(parse_integer_u64(value).with_context(invalid)?);
            }
            "socket_timeout_secs" => {
                cfg.socket_timeout_secs = Some(parse_integer_u64(value).with_context(invalid)?);
            }
            "retention_hours" => {
                let parsed = parse_integer_u64(value).with_context(invalid)?;
                let hours = u32::try_from(parsed)
                    .map_err(|_| anyhow::anyhow!("retention_hours out of range for u32"))?;
                cfg.retention_hours = Some(hours);
            }
            unknown => {
                bail!("Unknown configuration key: '{unknown}' on line {line_no}");
            }
        }
    }
    cfg.validate()?;
    Ok(cfg)
}

fn strip_inline_comment(line: &str) -> &str {
    let mut in_string = false;
    for (index, ch) in line.char_indices() {
        match ch {
            '"' => in_string = !in_string,
            '#' if !in_string => return &line[..index],
            _ => {}
        }
    }
    line
}

fn parse_string_literal(raw_value: &str) -> Result<String> {
    if raw_value.len() < 2 || !raw_value.starts_with('"') || !raw_value.ends_with('"') {
        bail!("Expected double-quoted string");
    }
    Ok(raw_value[1..raw_value.len() - 1].to_string())
}

fn parse_integer_u64(raw_value: &str) -> Result<u64> {
    let token = raw_value.trim();
    if token.is_empty() {
        bail!("Expected integer value");
    }
    let value = token.parse::<i128>()?;
    if value < 0 {
        bail!("Expected non-negative integer");
    }
    u64::try_from(value).map_err(|_| anyhow::anyhow!("Integer value out of range for u64"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config_partial_fields() {
        let cfg = parse_config_str(
            r#"
            # engine limits
            scratch_dir = "/var/tmp/mediagrab"  # fast disk
            operator_id = "1234"
            inline_size_cap_mib = 8
            retention_hours = 72
            "#,
        )
        .unwrap();
        assert_eq!(cfg.scratch_dir, Some(PathBuf::from("/var/tmp/mediagrab")));
        assert_eq!(cfg.operator_id.as_deref(), Some("1234"));
        assert_eq!(cfg.inline_size_cap_mib, Some(8));
        assert_eq!(cfg.retention_hours, Some(72));
        assert!(cfg.tool_path.is_none());
    }

    #[test]
    fn test_apply_overrides_policy() {
        let cfg = parse_config_str("inline_size_cap_mib = 8\ncooldown_secs = 5\npoll_interval_ms = 500\n")
            .unwrap();
        let mut policy = EnginePolicy::default();
        cfg.apply(&mut policy);
        assert_eq!(policy.inline_size_cap, 8 * MIB);
        assert_eq!(policy.cooldown, Duration::from_secs(5));
        assert_eq!(policy.poll_interval, Duration::from_millis(500));
        assert_eq!(policy.remote_size_cap, EnginePolicy::default().remote_size_cap);
    }

    #[test]
    fn test_unknown_key_reports_line() {
        let err = parse_config_str("scratch_dir = \"a\"\nbogus = 1\n").unwrap_err();
        assert!(err.to_string().contains("'bogus' on line 2"), "{err}");
    }

    #[test]
    fn test_missing_equals_is_syntax_error() {
        let err = parse_config_str("scratch_dir\n").unwrap_err();
        assert!(err.to_string().contains("line 1"), "{err}");
    }

    #[test]
    fn test_unquoted_string_rejected() {
        let err = parse_config_str("tool_path = /usr/bin/yt-dlp\n").unwrap_err();
        assert!(format!("{err:#}").contains("double-quoted"), "{err:#}");
    }

    #[test]
    fn test_retention_must_be_supported() {
        let err = parse_config_str("retention_hours = 48\n").unwrap_err();
        assert!(err.to_string().contains("retention_hours"), "{err}");
    }

    #[test]
    fn test_inline_cap_cannot_exceed_remote_cap() {
        let err =
            parse_config_str("inline_size_cap_mib = 100\nremote_size_cap_mib = 50\n").unwrap_err();
        assert!(err.to_string().contains("exceeds"), "{err}");
    }

    #[test]
    fn test_negative_integer_rejected() {
        assert!(parse_config_str("cooldown_secs = -1\n").is_err());
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        assert!(load_config(Some(Path::new("/nonexistent/mediagrab.toml"))).is_err());
    }
}
