//! Configuration system: TOML file + env var overrides + smart defaults.

#![allow(missing_docs)]

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::errors::{HarnessError, Result};

/// Full harness configuration model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub runner: RunnerConfig,
    pub verify: VerifyConfig,
    pub filter: FilterConfig,
    pub logging: LoggingConfig,
    pub paths: PathsConfig,
}

/// Sequencing and wait behavior.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RunnerConfig {
    /// Timeout applied by `wait_default` when a step does not pick one.
    pub default_wait_timeout_ms: u64,
    /// Upper bound for any single wait, explicit or default.
    pub max_wait_timeout_ms: u64,
    /// Longest the message loop blocks on the queue before rechecking timers.
    pub pump_slice_ms: u64,
    /// Keep running remaining scenarios after one fails.
    pub continue_after_failure: bool,
}

/// Comparison tolerances used by the verifier.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct VerifyConfig {
    pub float_tolerance: f64,
    /// Per-channel tolerance on the 0..=255 scale.
    pub color_tolerance: u8,
    pub geometry_tolerance: f64,
}

/// Scenario selection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct FilterConfig {
    /// Run only scenarios with `priority <= max_priority`.
    pub max_priority: Option<u32>,
    /// Run only scenarios whose area starts with this prefix.
    pub area: Option<String>,
    /// Regex matched against the expanded scenario name.
    pub name_pattern: Option<String>,
}

/// Result-sink output knobs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Write a JSONL transcript of every run.
    pub jsonl_enabled: bool,
    pub fallback_path: Option<PathBuf>,
    pub max_size_bytes: u64,
    pub max_rotated_files: u32,
    /// Echo debug-channel lines to the console sink.
    pub echo_debug: bool,
}

/// Filesystem paths used by drt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PathsConfig {
    pub config_file: PathBuf,
    pub jsonl_log: PathBuf,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            default_wait_timeout_ms: 5_000,
            max_wait_timeout_ms: 600_000,
            pump_slice_ms: 50,
            continue_after_failure: true,
        }
    }
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            float_tolerance: 1e-6,
            color_tolerance: 0,
            geometry_tolerance: 1e-6,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            jsonl_enabled: true,
            fallback_path: None,
            max_size_bytes: 16 * 1024 * 1024,
            max_rotated_files: 5,
            echo_debug: false,
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        let home_dir = env::var_os("HOME").map_or_else(
            || {
                eprintln!(
                    "[DRT-CONFIG] WARNING: HOME not set, falling back to /tmp for data paths"
                );
                PathBuf::from("/tmp")
            },
            PathBuf::from,
        );
        let cfg = home_dir.join(".config").join("drt").join("config.toml");
        let data = home_dir.join(".local").join("share").join("drt");
        Self {
            config_file: cfg,
            jsonl_log: data.join("results.jsonl"),
        }
    }
}

impl Config {
    /// Default configuration path.
    #[must_use]
    pub fn default_path() -> PathBuf {
        PathsConfig::default().config_file
    }

    /// Load config from default or explicit path, then apply env overrides.
    ///
    /// Missing config file is not an error when loading from default path; defaults are used.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path_buf = path.map_or_else(Self::default_path, Path::to_path_buf);
        let is_explicit_path = path.is_some();

        let mut cfg = if path_buf.exists() {
            let raw = fs::read_to_string(&path_buf).map_err(|source| HarnessError::Io {
                path: path_buf.clone(),
                source,
            })?;
            let parsed: Self = toml::from_str(&raw)?;
            parsed
        } else if is_explicit_path {
            return Err(HarnessError::MissingConfig { path: path_buf });
        } else {
            Self::default()
        };

        cfg.paths.config_file = path_buf;
        cfg.apply_env_overrides_from(env_var)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Deterministic hash of the effective config for run transcripts.
    ///
    /// FNV-1a over canonical JSON so the value is stable across processes.
    pub fn stable_hash(&self) -> Result<String> {
        let canonical = serde_json::to_string(self)?;
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in canonical.as_bytes() {
            hash ^= u64::from(*byte);
            hash = hash.wrapping_mul(0x0100_0000_01b3);
        }
        Ok(format!("{hash:016x}"))
    }

    fn apply_env_overrides_from<F>(&mut self, mut lookup: F) -> Result<()>
    where
        F: FnMut(&str) -> Option<String>,
    {
        if let Some(raw) = lookup("DRT_RUNNER_DEFAULT_WAIT_TIMEOUT_MS") {
            self.runner.default_wait_timeout_ms =
                parse_env("DRT_RUNNER_DEFAULT_WAIT_TIMEOUT_MS", &raw)?;
        }
        if let Some(raw) = lookup("DRT_RUNNER_MAX_WAIT_TIMEOUT_MS") {
            self.runner.max_wait_timeout_ms = parse_env("DRT_RUNNER_MAX_WAIT_TIMEOUT_MS", &raw)?;
        }
        if let Some(raw) = lookup("DRT_RUNNER_PUMP_SLICE_MS") {
            self.runner.pump_slice_ms = parse_env("DRT_RUNNER_PUMP_SLICE_MS", &raw)?;
        }
        if let Some(raw) = lookup("DRT_RUNNER_CONTINUE_AFTER_FAILURE") {
            self.runner.continue_after_failure =
                parse_env("DRT_RUNNER_CONTINUE_AFTER_FAILURE", &raw)?;
        }

        if let Some(raw) = lookup("DRT_VERIFY_FLOAT_TOLERANCE") {
            self.verify.float_tolerance = parse_env("DRT_VERIFY_FLOAT_TOLERANCE", &raw)?;
        }
        if let Some(raw) = lookup("DRT_VERIFY_COLOR_TOLERANCE") {
            self.verify.color_tolerance = parse_env("DRT_VERIFY_COLOR_TOLERANCE", &raw)?;
        }
        if let Some(raw) = lookup("DRT_VERIFY_GEOMETRY_TOLERANCE") {
            self.verify.geometry_tolerance = parse_env("DRT_VERIFY_GEOMETRY_TOLERANCE", &raw)?;
        }

        if let Some(raw) = lookup("DRT_FILTER_MAX_PRIORITY") {
            self.filter.max_priority = Some(parse_env("DRT_FILTER_MAX_PRIORITY", &raw)?);
        }
        if let Some(raw) = lookup("DRT_FILTER_AREA") {
            self.filter.area = Some(raw);
        }
        if let Some(raw) = lookup("DRT_FILTER_NAME_PATTERN") {
            self.filter.name_pattern = Some(raw);
        }

        if let Some(raw) = lookup("DRT_LOGGING_JSONL_ENABLED") {
            self.logging.jsonl_enabled = parse_env("DRT_LOGGING_JSONL_ENABLED", &raw)?;
        }
        if let Some(raw) = lookup("DRT_LOGGING_ECHO_DEBUG") {
            self.logging.echo_debug = parse_env("DRT_LOGGING_ECHO_DEBUG", &raw)?;
        }
        if let Some(raw) = lookup("DRT_PATHS_JSONL_LOG") {
            self.paths.jsonl_log = PathBuf::from(raw);
        }

        Ok(())
    }

    fn validate(&self) -> Result<()> {
        let runner = &self.runner;
        if runner.default_wait_timeout_ms == 0 || runner.max_wait_timeout_ms == 0 {
            return Err(HarnessError::InvalidConfig {
                details: "runner wait timeouts must be > 0".to_string(),
            });
        }
        if runner.default_wait_timeout_ms > runner.max_wait_timeout_ms {
            return Err(HarnessError::InvalidConfig {
                details: format!(
                    "runner.default_wait_timeout_ms ({}) must be <= runner.max_wait_timeout_ms ({})",
                    runner.default_wait_timeout_ms, runner.max_wait_timeout_ms
                ),
            });
        }
        if runner.pump_slice_ms == 0 {
            return Err(HarnessError::InvalidConfig {
                details: "runner.pump_slice_ms must be >= 1".to_string(),
            });
        }

        for (name, val) in [
            ("float_tolerance", self.verify.float_tolerance),
            ("geometry_tolerance", self.verify.geometry_tolerance),
        ] {
            if !val.is_finite() || val < 0.0 {
                return Err(HarnessError::InvalidConfig {
                    details: format!("verify.{name} must be a finite value >= 0.0, got {val}"),
                });
            }
        }

        if let Some(pattern) = &self.filter.name_pattern {
            regex::Regex::new(pattern).map_err(|error| HarnessError::InvalidConfig {
                details: format!("filter.name_pattern {pattern:?}: {error}"),
            })?;
        }

        if self.logging.jsonl_enabled && self.logging.max_size_bytes < 1024 {
            return Err(HarnessError::InvalidConfig {
                details: format!(
                    "logging.max_size_bytes ({}) must be >= 1024",
                    self.logging.max_size_bytes
                ),
            });
        }

        Ok(())
    }
}

fn env_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|raw| !raw.trim().is_empty())
}

fn parse_env<T>(name: &str, raw: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|error| HarnessError::ConfigParse {
            context: "env",
            details: format!("{name}={raw:?}: {error}"),
        })
}

#[cfg(test)]
mod tests {
    use super::{Config, HarnessError};
    use std::collections::HashMap;
    use std::path::Path;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(name, value)| ((*name).to_string(), (*value).to_string()))
            .collect()
    }

    #[test]
    fn default_config_is_valid() {
        let cfg = Config::default();
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn default_timeout_must_not_exceed_max() {
        let mut cfg = Config::default();
        cfg.runner.default_wait_timeout_ms = cfg.runner.max_wait_timeout_ms + 1;
        let err = cfg.validate().expect_err("expected validation error");
        assert!(err.to_string().contains("max_wait_timeout_ms"));
    }

    #[test]
    fn zero_wait_timeout_rejected() {
        let mut cfg = Config::default();
        cfg.runner.default_wait_timeout_ms = 0;
        let err = cfg.validate().expect_err("expected validation error");
        assert!(matches!(err, HarnessError::InvalidConfig { .. }));
    }

    #[test]
    fn negative_tolerance_rejected() {
        let mut cfg = Config::default();
        cfg.verify.float_tolerance = -0.5;
        let err = cfg.validate().expect_err("expected tolerance error");
        assert!(err.to_string().contains("float_tolerance"));
    }

    #[test]
    fn invalid_name_pattern_rejected() {
        let mut cfg = Config::default();
        cfg.filter.name_pattern = Some("(unclosed".to_string());
        let err = cfg.validate().expect_err("expected regex error");
        assert!(err.to_string().contains("name_pattern"));
    }

    #[test]
    fn stable_hash_changes_when_config_changes() {
        let cfg = Config::default();
        let hash_before = cfg.stable_hash().expect("hash should compute");
        let mut modified = Config::default();
        modified.runner.pump_slice_ms += 1;
        let hash_after = modified.stable_hash().expect("hash should compute");
        assert_ne!(hash_before, hash_after);
        assert_eq!(hash_before, cfg.stable_hash().expect("hash should compute"));
    }

    #[test]
    fn env_overrides_apply() {
        let mut cfg = Config::default();
        let overrides = vars(&[
            ("DRT_RUNNER_DEFAULT_WAIT_TIMEOUT_MS", "250"),
            ("DRT_VERIFY_COLOR_TOLERANCE", "3"),
            ("DRT_FILTER_MAX_PRIORITY", "1"),
            ("DRT_FILTER_AREA", "Animation"),
        ]);
        cfg.apply_env_overrides_from(|name| overrides.get(name).cloned())
            .expect("overrides should parse");
        assert_eq!(cfg.runner.default_wait_timeout_ms, 250);
        assert_eq!(cfg.verify.color_tolerance, 3);
        assert_eq!(cfg.filter.max_priority, Some(1));
        assert_eq!(cfg.filter.area.as_deref(), Some("Animation"));
    }

    #[test]
    fn env_override_parse_failure_is_reported() {
        let mut cfg = Config::default();
        let overrides = vars(&[("DRT_VERIFY_COLOR_TOLERANCE", "300")]);
        let err = cfg
            .apply_env_overrides_from(|name| overrides.get(name).cloned())
            .expect_err("u8 overflow should fail");
        match err {
            HarnessError::ConfigParse { context, details } => {
                assert_eq!(context, "env");
                assert!(details.contains("DRT_VERIFY_COLOR_TOLERANCE"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn load_explicit_missing_file_errors() {
        let err = Config::load(Some(Path::new("/nonexistent_drt_dir/config.toml")))
            .expect_err("missing explicit file should fail");
        assert_eq!(err.code(), "DRT-1002");
    }

    #[test]
    fn load_parses_partial_toml_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[runner]\ndefault_wait_timeout_ms = 1200\n\n[verify]\ncolor_tolerance = 2\n",
        )
        .unwrap();
        let cfg = Config::load(Some(&path)).expect("config should load");
        assert_eq!(cfg.runner.default_wait_timeout_ms, 1200);
        assert_eq!(cfg.runner.pump_slice_ms, 50);
        assert_eq!(cfg.verify.color_tolerance, 2);
        assert_eq!(cfg.paths.config_file, path);
    }
}
