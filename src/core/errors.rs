//! DRT-prefixed error types with structured error codes.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Shared `Result` alias for the project.
pub type Result<T> = std::result::Result<T, HarnessError>;

/// Top-level error type for the DRT harness.
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("[DRT-1001] invalid configuration: {details}")]
    InvalidConfig { details: String },

    #[error("[DRT-1002] missing configuration file: {path}")]
    MissingConfig { path: PathBuf },

    #[error("[DRT-1003] configuration parse failure in {context}: {details}")]
    ConfigParse {
        context: &'static str,
        details: String,
    },

    #[error("[DRT-2001] invalid scenario manifest {path}: {details}")]
    InvalidManifest { path: PathBuf, details: String },

    #[error("[DRT-2002] scenario {name} has already run")]
    ScenarioAlreadyRun { name: String },

    #[error("[DRT-2003] step {step} failed: {details}")]
    StepFailed { step: String, details: String },

    #[error("[DRT-2101] serialization failure in {context}: {details}")]
    Serialization {
        context: &'static str,
        details: String,
    },

    #[error("[DRT-3001] timed out waiting for signal {key} after {waited_ms}ms")]
    SignalTimeout { key: String, waited_ms: u64 },

    #[error("[DRT-3002] IO failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[DRT-3003] channel closed in component {component}")]
    ChannelClosed { component: &'static str },

    #[error("[DRT-3004] missing property {property}")]
    MissingProperty { property: String },
}

impl HarnessError {
    /// Stable machine-parseable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig { .. } => "DRT-1001",
            Self::MissingConfig { .. } => "DRT-1002",
            Self::ConfigParse { .. } => "DRT-1003",
            Self::InvalidManifest { .. } => "DRT-2001",
            Self::ScenarioAlreadyRun { .. } => "DRT-2002",
            Self::StepFailed { .. } => "DRT-2003",
            Self::Serialization { .. } => "DRT-2101",
            Self::SignalTimeout { .. } => "DRT-3001",
            Self::Io { .. } => "DRT-3002",
            Self::ChannelClosed { .. } => "DRT-3003",
            Self::MissingProperty { .. } => "DRT-3004",
        }
    }

    /// Whether this error is a wait timeout rather than an unexpected failure.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::SignalTimeout { .. })
    }

    /// Convenience constructor for IO errors with a known path.
    #[must_use]
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Convenience constructor for step-raised failures.
    #[must_use]
    pub fn step(step: impl Into<String>, details: impl Into<String>) -> Self {
        Self::StepFailed {
            step: step.into(),
            details: details.into(),
        }
    }
}

impl From<serde_json::Error> for HarnessError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization {
            context: "serde_json",
            details: value.to_string(),
        }
    }
}

impl From<toml::de::Error> for HarnessError {
    fn from(value: toml::de::Error) -> Self {
        Self::ConfigParse {
            context: "toml",
            details: value.to_string(),
        }
    }
}

impl From<toml::ser::Error> for HarnessError {
    fn from(value: toml::ser::Error) -> Self {
        Self::Serialization {
            context: "toml",
            details: value.to_string(),
        }
    }
}
