//! Convenience re-exports for library consumers.
//!
//! ```rust,no_run
//! use drt_harness::prelude::*;
//! ```

// Core
pub use crate::core::config::Config;
pub use crate::core::errors::{HarnessError, Result};

// Adapters
pub use crate::adapters::{InputEvent, InputSimulator, PropertyBag, PropertySource, Tagged};

// Harness
pub use crate::harness::combinatorial::{Combination, Dimension};
pub use crate::harness::context::{RunSettings, ScenarioContext};
pub use crate::harness::dispatcher::DispatcherHandle;
pub use crate::harness::outcome::{
    FailureCause, FinalStatus, ScenarioStatus, StepOutcome, StepResult, TestResult, Verdict,
};
pub use crate::harness::scenario::{Scenario, ScenarioBuilder, StepPhase};
pub use crate::harness::sequencer::{ScenarioReport, Sequencer};
pub use crate::harness::suite::{ScenarioFilter, Suite, SuiteReport};
pub use crate::harness::value::{Color, Point, Rect, Size, Tolerance, Value};
pub use crate::harness::verify::ExpectationTable;

// Logging
pub use crate::logger::sink::{JsonlSink, MemorySink, ResultSink, TeeSink};

// Manifests
pub use crate::manifest::Manifest;
