//! Per-run state handed to every step: evidence log, verifier, and the
//! cooperative dispatcher.

#![allow(missing_docs)]

use std::time::Duration;

use crate::adapters::PropertySource;
use crate::core::config::Config;
use crate::core::errors::Result;
use crate::harness::combinatorial::Combination;
use crate::harness::dispatcher::{Dispatcher, DispatcherHandle};
use crate::harness::evidence::EvidenceLog;
use crate::harness::outcome::{StepOutcome, StepResult, TestResult};
use crate::harness::value::{Tolerance, Value};
use crate::harness::verify::{ExpectationTable, Verifier};

/// Runner knobs resolved from [`Config`] once per batch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunSettings {
    pub default_wait: Duration,
    pub max_wait: Duration,
    pub pump_slice: Duration,
    pub tolerance: Tolerance,
}

impl RunSettings {
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            default_wait: Duration::from_millis(config.runner.default_wait_timeout_ms),
            max_wait: Duration::from_millis(config.runner.max_wait_timeout_ms),
            pump_slice: Duration::from_millis(config.runner.pump_slice_ms),
            tolerance: Tolerance::from(&config.verify),
        }
    }
}

impl Default for RunSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Everything a step can touch while it runs.
///
/// Created fresh by the sequencer for each scenario run and dropped when the
/// run ends, together with any timers still pending on its dispatcher.
pub struct ScenarioContext {
    scenario: String,
    variation: Option<String>,
    combination: Option<Combination>,
    settings: RunSettings,
    log: EvidenceLog,
    verifier: Verifier,
    dispatcher: Dispatcher,
}

impl ScenarioContext {
    #[must_use]
    pub fn new(scenario: impl Into<String>, variation: Option<String>, settings: RunSettings) -> Self {
        Self {
            scenario: scenario.into(),
            variation,
            combination: None,
            log: EvidenceLog::new(),
            verifier: Verifier::new(settings.tolerance),
            dispatcher: Dispatcher::new(settings.pump_slice),
            settings,
        }
    }

    /// Expanded scenario name, including any `(variation)` suffix.
    #[must_use]
    pub fn scenario(&self) -> &str {
        &self.scenario
    }

    #[must_use]
    pub fn variation(&self) -> Option<&str> {
        self.variation.as_deref()
    }

    #[must_use]
    pub fn with_combination(mut self, combination: Option<Combination>) -> Self {
        self.combination = combination;
        self
    }

    #[must_use]
    pub fn combination(&self) -> Option<&Combination> {
        self.combination.as_ref()
    }

    /// Value of one combinatorial dimension for this run.
    #[must_use]
    pub fn dimension(&self, name: &str) -> Option<&str> {
        self.combination.as_ref().and_then(|c| c.get(name))
    }

    #[must_use]
    pub fn settings(&self) -> &RunSettings {
        &self.settings
    }

    #[must_use]
    pub fn log(&self) -> &EvidenceLog {
        &self.log
    }

    pub(crate) fn log_mut(&mut self) -> &mut EvidenceLog {
        &mut self.log
    }

    #[must_use]
    pub fn verifier(&self) -> &Verifier {
        &self.verifier
    }

    // ──────────────────── log channels ────────────────────

    pub fn status(&mut self, text: impl Into<String>) {
        self.log.status(text);
    }

    pub fn evidence(&mut self, text: impl Into<String>) {
        self.log.evidence(text);
    }

    pub fn debug(&mut self, text: impl Into<String>) {
        self.log.debug(text);
    }

    // ──────────────────── verification ────────────────────

    pub fn verify(
        &mut self,
        actual: impl Into<Value>,
        expected: impl Into<Value>,
        message: &str,
    ) -> bool {
        self.verifier.verify(&mut self.log, actual, expected, message)
    }

    pub fn verify_with(
        &mut self,
        actual: impl Into<Value>,
        expected: impl Into<Value>,
        tolerance: Tolerance,
        message: &str,
    ) -> bool {
        self.verifier
            .verify_with(&mut self.log, actual, expected, tolerance, message)
    }

    /// Read `property` from `source` and compare it with the default tolerance.
    pub fn verify_property(
        &mut self,
        source: &dyn PropertySource,
        property: &str,
        expected: impl Into<Value>,
        message: &str,
    ) -> bool {
        let tolerance = self.verifier.tolerance();
        self.verifier.verify_property(
            &mut self.log,
            source,
            property,
            &expected.into(),
            tolerance,
            message,
        )
    }

    pub fn verify_property_with(
        &mut self,
        source: &dyn PropertySource,
        property: &str,
        expected: impl Into<Value>,
        tolerance: Tolerance,
        message: &str,
    ) -> bool {
        self.verifier.verify_property(
            &mut self.log,
            source,
            property,
            &expected.into(),
            tolerance,
            message,
        )
    }

    /// Pass when `actual` differs from `unexpected`.
    pub fn verify_different(
        &mut self,
        actual: impl Into<Value>,
        unexpected: impl Into<Value>,
        message: &str,
    ) -> bool {
        self.verifier
            .verify_different(&mut self.log, actual, unexpected, message)
    }

    pub fn verify_property_different(
        &mut self,
        source: &dyn PropertySource,
        property: &str,
        unexpected: impl Into<Value>,
        message: &str,
    ) -> bool {
        self.verifier.verify_property_different(
            &mut self.log,
            source,
            property,
            &unexpected.into(),
            message,
        )
    }

    pub fn verify_table(
        &mut self,
        source: &dyn PropertySource,
        table: &ExpectationTable,
        message: &str,
    ) -> bool {
        self.verifier
            .verify_table(&mut self.log, source, table, message)
    }

    /// Running AND over every verification in this run.
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.verifier.all_passed()
    }

    // ──────────────────── signals ────────────────────

    pub fn signal(&mut self, key: impl Into<String>, value: TestResult) {
        let key = key.into();
        self.log.debug(format!("signal {key} = {value}"));
        self.dispatcher.signal(key, value);
    }

    /// Signal `key` with the verifier's running AND so far.
    pub fn signal_verdict(&mut self, key: impl Into<String>) {
        let value = TestResult::from_bool(self.verifier.all_passed());
        self.signal(key, value);
    }

    /// Pump the dispatcher until `key` is signalled or `timeout` elapses.
    ///
    /// The timeout is clamped to `runner.max_wait_timeout_ms`.
    pub fn wait(&mut self, key: &str, timeout: Duration) -> Result<TestResult> {
        let timeout = timeout.min(self.settings.max_wait);
        self.log
            .debug(format!("wait {key} (timeout {}ms)", timeout.as_millis()));
        let value = self.dispatcher.wait(key, timeout)?;
        self.log.debug(format!("received {key} = {value}"));
        Ok(value)
    }

    /// [`wait`](Self::wait) with `runner.default_wait_timeout_ms`.
    pub fn wait_default(&mut self, key: &str) -> Result<TestResult> {
        let timeout = self.settings.default_wait;
        self.wait(key, timeout)
    }

    /// Wait for `key` and turn the received value into a step outcome.
    pub fn expect_signal(&mut self, key: &str, timeout: Duration) -> StepResult {
        let value = self.wait(key, timeout)?;
        Ok(StepOutcome::from_signal(key, value))
    }

    // ──────────────────── scheduling ────────────────────

    #[must_use]
    pub fn handle(&self) -> DispatcherHandle {
        self.dispatcher.handle()
    }

    pub fn post(&self, job: impl FnOnce() + Send + 'static) {
        self.dispatcher.handle().post(job);
    }

    pub fn post_after(&self, delay: Duration, job: impl FnOnce() + Send + 'static) {
        self.dispatcher.handle().post_after(delay, job);
    }

    /// Run callbacks and timers that are ready now without blocking.
    pub fn pump_pending(&mut self) -> usize {
        self.dispatcher.pump_pending()
    }

    #[must_use]
    pub fn pending_timers(&self) -> usize {
        self.dispatcher.pending_timers()
    }
}
