//! Actual-versus-expected comparison with an evidence trail.
//!
//! Every check appends exactly one evidence line of the form
//! `"<message> -- Act: <actual> / Exp: <expected> [PASS|FAIL]"` and folds its
//! outcome into a running AND for the scenario.

#![allow(missing_docs)]

use serde::{Deserialize, Serialize};

use crate::adapters::PropertySource;
use crate::harness::evidence::EvidenceLog;
use crate::harness::value::{Tolerance, Value};

/// One row of an expectation table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expectation {
    pub property: String,
    pub expected: Value,
}

/// Ordered `property -> expected value` rows checked together.
///
/// Replaces long chains of hand-written comparisons with data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExpectationTable {
    rows: Vec<Expectation>,
}

impl ExpectationTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn expect(mut self, property: impl Into<String>, expected: impl Into<Value>) -> Self {
        self.rows.push(Expectation {
            property: property.into(),
            expected: expected.into(),
        });
        self
    }

    #[must_use]
    pub fn rows(&self) -> &[Expectation] {
        &self.rows
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl From<Vec<Expectation>> for ExpectationTable {
    fn from(rows: Vec<Expectation>) -> Self {
        Self { rows }
    }
}

/// Running tally of verifications within one scenario.
#[derive(Debug)]
pub struct Verifier {
    tolerance: Tolerance,
    checks: usize,
    failures: usize,
    first_failure: Option<String>,
    last_failure: Option<String>,
}

impl Verifier {
    #[must_use]
    pub fn new(tolerance: Tolerance) -> Self {
        Self {
            tolerance,
            checks: 0,
            failures: 0,
            first_failure: None,
            last_failure: None,
        }
    }

    #[must_use]
    pub fn tolerance(&self) -> Tolerance {
        self.tolerance
    }

    /// Compare with the configured tolerance.
    pub fn verify(
        &mut self,
        log: &mut EvidenceLog,
        actual: impl Into<Value>,
        expected: impl Into<Value>,
        message: &str,
    ) -> bool {
        let tolerance = self.tolerance;
        self.verify_with(log, actual, expected, tolerance, message)
    }

    /// Compare with an explicit tolerance.
    pub fn verify_with(
        &mut self,
        log: &mut EvidenceLog,
        actual: impl Into<Value>,
        expected: impl Into<Value>,
        tolerance: Tolerance,
        message: &str,
    ) -> bool {
        let actual = actual.into();
        let expected = expected.into();
        let ok = actual.matches(&expected, tolerance);
        self.record(log, ok, &actual.to_string(), &expected.to_string(), message);
        ok
    }

    /// Pass when `actual` differs from `unexpected` beyond the configured
    /// tolerance. The evidence line reads `Exp: not <unexpected>`.
    pub fn verify_different(
        &mut self,
        log: &mut EvidenceLog,
        actual: impl Into<Value>,
        unexpected: impl Into<Value>,
        message: &str,
    ) -> bool {
        let actual = actual.into();
        let unexpected = unexpected.into();
        let ok = !actual.matches(&unexpected, self.tolerance);
        self.record(
            log,
            ok,
            &actual.to_string(),
            &format!("not {unexpected}"),
            message,
        );
        ok
    }

    /// Record a failed check for a value that could not be read.
    pub fn verify_missing(
        &mut self,
        log: &mut EvidenceLog,
        expected: &Value,
        message: &str,
    ) -> bool {
        self.record(log, false, "<missing>", &expected.to_string(), message);
        false
    }

    /// Read `property` from `source` and compare it.
    pub fn verify_property(
        &mut self,
        log: &mut EvidenceLog,
        source: &dyn PropertySource,
        property: &str,
        expected: &Value,
        tolerance: Tolerance,
        message: &str,
    ) -> bool {
        let message = if message.is_empty() { property } else { message };
        match source.get_value(property) {
            Some(actual) => self.verify_with(log, actual, expected.clone(), tolerance, message),
            None => self.verify_missing(log, expected, message),
        }
    }

    /// Read `property` from `source` and require it to differ from
    /// `unexpected`. A missing property fails.
    pub fn verify_property_different(
        &mut self,
        log: &mut EvidenceLog,
        source: &dyn PropertySource,
        property: &str,
        unexpected: &Value,
        message: &str,
    ) -> bool {
        let message = if message.is_empty() { property } else { message };
        match source.get_value(property) {
            Some(actual) => self.verify_different(log, actual, unexpected.clone(), message),
            None => {
                let expected = format!("not {unexpected}");
                self.record(log, false, "<missing>", &expected, message);
                false
            }
        }
    }

    /// Check every row of `table`; true only if all rows match.
    ///
    /// All rows are checked even after a mismatch so the evidence trail is
    /// complete.
    pub fn verify_table(
        &mut self,
        log: &mut EvidenceLog,
        source: &dyn PropertySource,
        table: &ExpectationTable,
        message: &str,
    ) -> bool {
        let tolerance = self.tolerance;
        table.rows().iter().fold(true, |all, row| {
            let label = if message.is_empty() {
                row.property.clone()
            } else {
                format!("{message}.{}", row.property)
            };
            let ok =
                self.verify_property(log, source, &row.property, &row.expected, tolerance, &label);
            all && ok
        })
    }

    /// Running AND over every check so far.
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.failures == 0
    }

    #[must_use]
    pub fn checks(&self) -> usize {
        self.checks
    }

    #[must_use]
    pub fn failures(&self) -> usize {
        self.failures
    }

    #[must_use]
    pub fn first_failure(&self) -> Option<&str> {
        self.first_failure.as_deref()
    }

    #[must_use]
    pub fn last_failure(&self) -> Option<&str> {
        self.last_failure.as_deref()
    }

    fn record(
        &mut self,
        log: &mut EvidenceLog,
        ok: bool,
        actual: &str,
        expected: &str,
        message: &str,
    ) {
        let line = evidence_line(message, actual, expected, ok);
        self.checks += 1;
        if !ok {
            self.failures += 1;
            if self.first_failure.is_none() {
                self.first_failure = Some(line.clone());
            }
            self.last_failure = Some(line.clone());
        }
        log.evidence(line);
    }
}

impl Default for Verifier {
    fn default() -> Self {
        Self::new(Tolerance::default())
    }
}

fn evidence_line(message: &str, actual: &str, expected: &str, ok: bool) -> String {
    let marker = if ok { "PASS" } else { "FAIL" };
    if message.is_empty() {
        format!("Act: {actual} / Exp: {expected} [{marker}]")
    } else {
        format!("{message} -- Act: {actual} / Exp: {expected} [{marker}]")
    }
}
