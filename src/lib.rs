#![forbid(unsafe_code)]

//! DRT harness: scenario-driven developer regression tests.
//!
//! A scenario is an ordered list of steps run fail-fast on a single
//! cooperative message loop:
//! 1. **Sequencer**: runs `Initialize` then `Run` steps, stops at the first failure
//! 2. **Signal/Wait**: steps wait on named signals while posted callbacks and timers run
//! 3. **Verifier**: compares actual and expected values, leaving `Act: X / Exp: Y` evidence
//!
//! Results go to an explicitly passed [`logger::sink::ResultSink`].
//!
//! # Library usage
//!
//! ```rust,no_run
//! use drt_harness::prelude::*;
//!
//! let mut scenario = Scenario::builder("Fill")
//!     .step("Verify", |ctx| {
//!         ctx.verify(Color::RED, Color::RED, "Fill");
//!         Ok(StepOutcome::Pass)
//!     })
//!     .build();
//! let mut sink = MemorySink::default();
//! let status = Sequencer::new(&Config::default()).run(&mut scenario, &mut sink);
//! ```

pub mod prelude;

pub mod adapters;
pub mod core;
pub mod harness;
#[cfg(feature = "cli")]
pub mod interrupt;
pub mod logger;
pub mod manifest;
