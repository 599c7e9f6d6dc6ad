//! Step outcomes, scenario status, and terminal verdicts.

#![allow(missing_docs)]

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::errors::HarnessError;

/// Value carried by a signal, mirroring the result a callback reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TestResult {
    Pass,
    Fail,
    Ignore,
    #[default]
    Unknown,
}

impl TestResult {
    /// `Pass` when `ok`, otherwise `Fail`.
    #[must_use]
    pub const fn from_bool(ok: bool) -> Self {
        if ok { Self::Pass } else { Self::Fail }
    }
}

impl fmt::Display for TestResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pass => "Pass",
            Self::Fail => "Fail",
            Self::Ignore => "Ignore",
            Self::Unknown => "Unknown",
        })
    }
}

/// What a single step reports back to the sequencer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Pass,
    Fail { reason: String },
    Skip { reason: String },
}

impl StepOutcome {
    #[must_use]
    pub fn fail(reason: impl Into<String>) -> Self {
        Self::Fail {
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn skip(reason: impl Into<String>) -> Self {
        Self::Skip {
            reason: reason.into(),
        }
    }

    /// `Pass` when `ok`, otherwise `Fail` with `reason`.
    #[must_use]
    pub fn check(ok: bool, reason: impl Into<String>) -> Self {
        if ok { Self::Pass } else { Self::fail(reason) }
    }

    /// Map a signalled `TestResult` onto a step outcome.
    #[must_use]
    pub fn from_signal(key: &str, result: TestResult) -> Self {
        match result {
            TestResult::Pass => Self::Pass,
            TestResult::Ignore => Self::skip(format!("signal {key} reported Ignore")),
            TestResult::Fail | TestResult::Unknown => {
                Self::fail(format!("signal {key} reported {result}"))
            }
        }
    }
}

impl fmt::Display for StepOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pass => f.write_str("pass"),
            Self::Fail { reason } => write!(f, "fail ({reason})"),
            Self::Skip { reason } => write!(f, "skip ({reason})"),
        }
    }
}

/// Result type returned by step actions. `Err` is an unexpected exception.
pub type StepResult = Result<StepOutcome, HarnessError>;

/// Scenario lifecycle: `NotRun -> Running -> {Passed, Failed}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioStatus {
    NotRun,
    Running,
    Passed,
    Failed,
}

impl ScenarioStatus {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Passed | Self::Failed)
    }
}

/// Why a scenario failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureCause {
    /// A verification mismatch or a step returning `Fail`.
    Assertion,
    /// A wait ran out of time before its signal arrived.
    Timeout,
    /// A step returned an error or panicked.
    Exception,
}

/// Terminal status of one scenario run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FinalStatus {
    Passed,
    Failed {
        step: String,
        cause: FailureCause,
        diagnostic: String,
    },
}

impl FinalStatus {
    #[must_use]
    pub const fn is_pass(&self) -> bool {
        matches!(self, Self::Passed)
    }

    #[must_use]
    pub const fn verdict(&self) -> Verdict {
        match self {
            Self::Passed => Verdict::Pass,
            Self::Failed {
                cause: FailureCause::Exception,
                ..
            } => Verdict::Exception,
            Self::Failed { .. } => Verdict::Fail,
        }
    }

    /// Diagnostic text for failures.
    #[must_use]
    pub fn diagnostic(&self) -> Option<&str> {
        match self {
            Self::Passed => None,
            Self::Failed { diagnostic, .. } => Some(diagnostic),
        }
    }
}

/// What the result sink records for a finished scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Pass,
    Fail,
    Exception,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pass => "PASS",
            Self::Fail => "FAIL",
            Self::Exception => "EXCEPTION",
        })
    }
}
