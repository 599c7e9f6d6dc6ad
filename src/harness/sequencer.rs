//! Fail-fast step sequencer.
//!
//! Runs a scenario's steps in order on the calling thread, stops at the
//! first failure, and reports the verdict plus the evidence trail to a
//! [`ResultSink`].

#![allow(missing_docs)]

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;

use serde::Serialize;

use crate::core::config::Config;
use crate::core::errors::{HarnessError, Result};
use crate::harness::context::{RunSettings, ScenarioContext};
use crate::harness::outcome::{FailureCause, FinalStatus, ScenarioStatus, StepOutcome};
use crate::harness::scenario::{Scenario, StepPhase};
use crate::logger::sink::ResultSink;

/// How a single step ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepState {
    Passed,
    Skipped,
    Failed,
    /// Never started because an earlier step failed.
    NotRun,
}

#[derive(Debug, Clone, Serialize)]
pub struct StepRecord {
    pub name: String,
    pub phase: StepPhase,
    pub state: StepState,
}

/// Full account of one scenario run.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    pub name: String,
    pub area: String,
    pub priority: u32,
    pub outcome: FinalStatus,
    pub duration_ms: u64,
    pub checks: usize,
    pub check_failures: usize,
    pub steps: Vec<StepRecord>,
}

impl ScenarioReport {
    #[must_use]
    pub fn passed(&self) -> bool {
        self.outcome.is_pass()
    }
}

struct Failure {
    step: String,
    cause: FailureCause,
    diagnostic: String,
}

/// Executes scenarios with one set of runner settings.
#[derive(Debug, Clone, Default)]
pub struct Sequencer {
    settings: RunSettings,
}

impl Sequencer {
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Self::with_settings(RunSettings::from_config(config))
    }

    #[must_use]
    pub fn with_settings(settings: RunSettings) -> Self {
        Self { settings }
    }

    #[must_use]
    pub fn settings(&self) -> &RunSettings {
        &self.settings
    }

    /// Run `scenario` and return its terminal status.
    pub fn run(&self, scenario: &mut Scenario, sink: &mut dyn ResultSink) -> Result<FinalStatus> {
        Ok(self.execute(scenario, sink)?.outcome)
    }

    /// Run `scenario` and return the full report.
    ///
    /// Errors only when the scenario has already been run; step failures of
    /// any kind are reported through the returned [`ScenarioReport`].
    pub fn execute(
        &self,
        scenario: &mut Scenario,
        sink: &mut dyn ResultSink,
    ) -> Result<ScenarioReport> {
        if scenario.status != ScenarioStatus::NotRun {
            return Err(HarnessError::ScenarioAlreadyRun {
                name: scenario.name().to_string(),
            });
        }
        scenario.status = ScenarioStatus::Running;
        let name = scenario.name().to_string();
        sink.begin_scenario(&name);

        let started = Instant::now();
        let mut ctx = ScenarioContext::new(
            name.clone(),
            scenario.variation().map(str::to_string),
            self.settings,
        )
        .with_combination(scenario.combination().cloned());
        if let Some(combination) = scenario.combination() {
            ctx.log_mut().debug(format!("combination {combination}"));
        }
        let mut failure: Option<Failure> = None;
        let mut records = Vec::with_capacity(scenario.steps().len());
        let mut current_phase: Option<StepPhase> = None;

        for step in scenario.steps_mut() {
            let step_name = step.name().to_string();
            let phase = step.phase();

            if failure.is_some() {
                ctx.log_mut().evidence(format!("step {step_name}: skipped"));
                records.push(StepRecord {
                    name: step_name,
                    phase,
                    state: StepState::NotRun,
                });
                continue;
            }

            if current_phase != Some(phase) {
                ctx.status(format!("---{phase}---"));
                current_phase = Some(phase);
            }

            ctx.evidence(format!("step {step_name}: start"));
            let result = panic::catch_unwind(AssertUnwindSafe(|| step.invoke(&mut ctx)));

            let outcome = match result {
                Ok(Ok(outcome)) => match outcome {
                    StepOutcome::Fail { reason } => Err((FailureCause::Assertion, reason)),
                    _ if !ctx.all_passed() => Err((
                        FailureCause::Assertion,
                        ctx.verifier()
                            .last_failure()
                            .unwrap_or("verification failed")
                            .to_string(),
                    )),
                    passed_or_skipped => Ok(passed_or_skipped),
                },
                Ok(Err(err)) if err.is_timeout() => Err((FailureCause::Timeout, err.to_string())),
                Ok(Err(err)) => Err((FailureCause::Exception, err.to_string())),
                Err(payload) => Err((
                    FailureCause::Exception,
                    format!("panic: {}", panic_message(payload.as_ref())),
                )),
            };

            let state = match outcome {
                Ok(StepOutcome::Skip { reason }) => {
                    ctx.evidence(format!("step {step_name}: skip ({reason})"));
                    StepState::Skipped
                }
                Ok(_) => {
                    ctx.evidence(format!("step {step_name}: pass"));
                    StepState::Passed
                }
                Err((cause, diagnostic)) => {
                    ctx.evidence(format!("step {step_name}: fail ({diagnostic})"));
                    failure = Some(Failure {
                        step: step_name.clone(),
                        cause,
                        diagnostic,
                    });
                    StepState::Failed
                }
            };
            records.push(StepRecord {
                name: step_name,
                phase,
                state,
            });
        }

        let outcome = match failure {
            None => FinalStatus::Passed,
            Some(f) => FinalStatus::Failed {
                step: f.step,
                cause: f.cause,
                diagnostic: f.diagnostic,
            },
        };
        let verdict = outcome.verdict();
        ctx.status(format!("verdict: {verdict}"));

        let elapsed = started.elapsed();
        ctx.log_mut().flush_to(&name, sink);
        sink.log_result(&name, verdict, elapsed, outcome.diagnostic());

        scenario.status = if outcome.is_pass() {
            ScenarioStatus::Passed
        } else {
            ScenarioStatus::Failed
        };

        Ok(ScenarioReport {
            name,
            area: scenario.area().to_string(),
            priority: scenario.priority(),
            outcome,
            duration_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
            checks: ctx.verifier().checks(),
            check_failures: ctx.verifier().failures(),
            steps: records,
        })
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harness::outcome::{TestResult, Verdict};
    use crate::harness::value::Color;
    use crate::logger::sink::MemorySink;
    use std::time::Duration;

    fn sequencer() -> Sequencer {
        Sequencer::with_settings(RunSettings {
            default_wait: Duration::from_millis(30),
            pump_slice: Duration::from_millis(5),
            ..RunSettings::default()
        })
    }

    fn fill_scenario(actual: Color) -> Scenario {
        Scenario::builder("Fill")
            .initialize("Init", |_| Ok(StepOutcome::Pass))
            .step("Animate", |ctx| {
                let h = ctx.handle();
                ctx.post_after(Duration::from_millis(5), move || {
                    h.signal("AnimationDone", TestResult::Pass);
                });
                ctx.expect_signal("AnimationDone", Duration::from_secs(2))
            })
            .step("Verify", move |ctx| {
                ctx.verify(actual, Color::RED, "Fill");
                Ok(StepOutcome::Pass)
            })
            .build()
    }

    #[test]
    fn matching_colors_pass() {
        let mut sink = MemorySink::default();
        let mut scenario = fill_scenario(Color::RED);
        let status = sequencer().run(&mut scenario, &mut sink).unwrap();
        assert_eq!(status, FinalStatus::Passed);
        assert_eq!(scenario.status(), ScenarioStatus::Passed);
        assert_eq!(sink.verdicts(), vec![("Fill".to_string(), Verdict::Pass)]);
    }

    #[test]
    fn mismatched_colors_fail_with_evidence() {
        let mut sink = MemorySink::default();
        let mut scenario = fill_scenario(Color::BLUE);
        let status = sequencer().run(&mut scenario, &mut sink).unwrap();
        match &status {
            FinalStatus::Failed { step, cause, diagnostic } => {
                assert_eq!(step, "Verify");
                assert_eq!(*cause, FailureCause::Assertion);
                assert!(diagnostic.contains("Act: Blue / Exp: Red"));
            }
            FinalStatus::Passed => panic!("expected failure"),
        }
        assert!(
            sink.evidence_for("Fill")
                .iter()
                .any(|line| line.contains("Act: Blue / Exp: Red"))
        );
        assert_eq!(scenario.status(), ScenarioStatus::Failed);
    }

    #[test]
    fn steps_after_failure_are_skipped() {
        let mut sink = MemorySink::default();
        let mut scenario = Scenario::builder("FailFast")
            .step("one", |_| Ok(StepOutcome::Pass))
            .step("two", |_| Ok(StepOutcome::fail("boom")))
            .step("three", |_| panic!("must not run"))
            .build();
        let report = sequencer().execute(&mut scenario, &mut sink).unwrap();
        let states: Vec<StepState> = report.steps.iter().map(|s| s.state).collect();
        assert_eq!(
            states,
            vec![StepState::Passed, StepState::Failed, StepState::NotRun]
        );
        assert!(sink.evidence_for("FailFast").contains(&"step three: skipped"));
    }

    #[test]
    fn timeout_is_reported_as_failure() {
        let mut sink = MemorySink::default();
        let mut scenario = Scenario::builder("Slow")
            .step("wait", |ctx| {
                ctx.wait_default("TestFinished")?;
                Ok(StepOutcome::Pass)
            })
            .build();
        let status = sequencer().run(&mut scenario, &mut sink).unwrap();
        assert_eq!(status.verdict(), Verdict::Fail);
        assert!(
            status
                .diagnostic()
                .unwrap()
                .contains("timed out waiting for signal TestFinished")
        );
    }

    #[test]
    fn errors_and_panics_are_exceptions() {
        let mut sink = MemorySink::default();
        let mut erroring = Scenario::builder("Err")
            .step("throw", |_| Err(HarnessError::step("throw", "null reference")))
            .build();
        let status = sequencer().run(&mut erroring, &mut sink).unwrap();
        assert_eq!(status.verdict(), Verdict::Exception);

        let mut panicking = Scenario::builder("Panic")
            .step("explode", |_| panic!("kaboom"))
            .build();
        let status = sequencer().run(&mut panicking, &mut sink).unwrap();
        assert_eq!(status.verdict(), Verdict::Exception);
        assert!(status.diagnostic().unwrap().contains("panic: kaboom"));
    }

    #[test]
    fn skip_does_not_fail_the_scenario() {
        let mut sink = MemorySink::default();
        let mut scenario = Scenario::builder("Skippy")
            .step("skip", |_| Ok(StepOutcome::skip("not on this platform")))
            .build();
        let report = sequencer().execute(&mut scenario, &mut sink).unwrap();
        assert!(report.passed());
        assert_eq!(report.steps[0].state, StepState::Skipped);
    }

    #[test]
    fn scenario_runs_only_once() {
        let mut sink = MemorySink::default();
        let mut scenario = Scenario::builder("Once").build();
        sequencer().run(&mut scenario, &mut sink).unwrap();
        let err = sequencer().run(&mut scenario, &mut sink).unwrap_err();
        assert_eq!(err.code(), "DRT-2002");
    }
}
