//! Result sinks: where scenario status, evidence, and verdicts end up.
//!
//! The sink is passed explicitly to the sequencer and suite; there is no
//! process-wide logger.

#![allow(missing_docs)]

use std::time::Duration;

use crate::core::config::Config;
use crate::harness::outcome::Verdict;
use crate::logger::jsonl::{EventType, JsonlConfig, JsonlWriter, LogEntry};

/// Receiver for everything a harness run reports.
pub trait ResultSink {
    fn log_status(&mut self, scenario: &str, text: &str);
    fn log_evidence(&mut self, scenario: &str, text: &str);
    fn log_debug(&mut self, scenario: &str, text: &str);

    /// Terminal verdict for one scenario.
    fn log_result(
        &mut self,
        scenario: &str,
        verdict: Verdict,
        elapsed: Duration,
        diagnostic: Option<&str>,
    );

    fn begin_batch(&mut self, _config_hash: &str, _scenario_count: usize) {}
    fn begin_scenario(&mut self, _scenario: &str) {}
    fn end_batch(&mut self, _passed: usize, _failed: usize) {}
}

// ──────────────────── memory ────────────────────

/// One recorded sink call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkRecord {
    Status {
        scenario: String,
        text: String,
    },
    Evidence {
        scenario: String,
        text: String,
    },
    Debug {
        scenario: String,
        text: String,
    },
    Result {
        scenario: String,
        verdict: Verdict,
        diagnostic: Option<String>,
    },
    BeginScenario {
        scenario: String,
    },
    EndBatch {
        passed: usize,
        failed: usize,
    },
}

/// Sink that keeps every call in memory, for assertions in tests.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub records: Vec<SinkRecord>,
}

impl MemorySink {
    /// Verdicts in the order they were logged.
    #[must_use]
    pub fn verdicts(&self) -> Vec<(String, Verdict)> {
        self.records
            .iter()
            .filter_map(|r| match r {
                SinkRecord::Result {
                    scenario, verdict, ..
                } => Some((scenario.clone(), *verdict)),
                _ => None,
            })
            .collect()
    }

    /// Evidence lines logged for `scenario`.
    #[must_use]
    pub fn evidence_for(&self, scenario: &str) -> Vec<&str> {
        self.records
            .iter()
            .filter_map(|r| match r {
                SinkRecord::Evidence { scenario: s, text } if s == scenario => {
                    Some(text.as_str())
                }
                _ => None,
            })
            .collect()
    }
}

impl ResultSink for MemorySink {
    fn log_status(&mut self, scenario: &str, text: &str) {
        self.records.push(SinkRecord::Status {
            scenario: scenario.to_string(),
            text: text.to_string(),
        });
    }

    fn log_evidence(&mut self, scenario: &str, text: &str) {
        self.records.push(SinkRecord::Evidence {
            scenario: scenario.to_string(),
            text: text.to_string(),
        });
    }

    fn log_debug(&mut self, scenario: &str, text: &str) {
        self.records.push(SinkRecord::Debug {
            scenario: scenario.to_string(),
            text: text.to_string(),
        });
    }

    fn log_result(
        &mut self,
        scenario: &str,
        verdict: Verdict,
        _elapsed: Duration,
        diagnostic: Option<&str>,
    ) {
        self.records.push(SinkRecord::Result {
            scenario: scenario.to_string(),
            verdict,
            diagnostic: diagnostic.map(str::to_string),
        });
    }

    fn begin_scenario(&mut self, scenario: &str) {
        self.records.push(SinkRecord::BeginScenario {
            scenario: scenario.to_string(),
        });
    }

    fn end_batch(&mut self, passed: usize, failed: usize) {
        self.records.push(SinkRecord::EndBatch { passed, failed });
    }
}

// ──────────────────── jsonl ────────────────────

/// Sink writing a JSONL transcript.
pub struct JsonlSink {
    writer: JsonlWriter,
}

impl JsonlSink {
    #[must_use]
    pub fn new(writer: JsonlWriter) -> Self {
        Self { writer }
    }

    /// Open the transcript configured in `cfg`.
    #[must_use]
    pub fn from_config(cfg: &Config) -> Self {
        Self::new(JsonlWriter::open(JsonlConfig::from_config(cfg)))
    }

    #[must_use]
    pub fn writer(&self) -> &JsonlWriter {
        &self.writer
    }

    fn line(&mut self, event: EventType, scenario: &str, text: &str) {
        self.writer
            .write_entry(&LogEntry::new(event).scenario(scenario).text(text));
    }
}

impl ResultSink for JsonlSink {
    fn log_status(&mut self, scenario: &str, text: &str) {
        self.line(EventType::Status, scenario, text);
    }

    fn log_evidence(&mut self, scenario: &str, text: &str) {
        self.line(EventType::Evidence, scenario, text);
    }

    fn log_debug(&mut self, scenario: &str, text: &str) {
        self.line(EventType::Debug, scenario, text);
    }

    fn log_result(
        &mut self,
        scenario: &str,
        verdict: Verdict,
        elapsed: Duration,
        diagnostic: Option<&str>,
    ) {
        let mut entry = LogEntry::new(EventType::ScenarioResult).scenario(scenario);
        entry.verdict = Some(verdict);
        entry.duration_ms = Some(u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX));
        entry.text = diagnostic.map(str::to_string);
        self.writer.write_entry(&entry);
    }

    fn begin_batch(&mut self, config_hash: &str, scenario_count: usize) {
        let mut entry = LogEntry::new(EventType::BatchStart);
        entry.config_hash = Some(config_hash.to_string());
        entry.text = Some(format!("{scenario_count} scenario(s)"));
        self.writer.write_entry(&entry);
    }

    fn begin_scenario(&mut self, scenario: &str) {
        self.writer
            .write_entry(&LogEntry::new(EventType::ScenarioStart).scenario(scenario));
    }

    fn end_batch(&mut self, passed: usize, failed: usize) {
        let mut entry = LogEntry::new(EventType::BatchSummary);
        entry.passed = Some(passed);
        entry.failed = Some(failed);
        self.writer.write_entry(&entry);
        self.writer.flush();
    }
}

// ──────────────────── fan-out ────────────────────

/// Forwards every call to each inner sink in order.
#[derive(Default)]
pub struct TeeSink<'a> {
    sinks: Vec<&'a mut dyn ResultSink>,
}

impl<'a> TeeSink<'a> {
    #[must_use]
    pub fn new() -> Self {
        Self { sinks: Vec::new() }
    }

    #[must_use]
    pub fn with(mut self, sink: &'a mut dyn ResultSink) -> Self {
        self.sinks.push(sink);
        self
    }
}

impl ResultSink for TeeSink<'_> {
    fn log_status(&mut self, scenario: &str, text: &str) {
        for s in &mut self.sinks {
            s.log_status(scenario, text);
        }
    }

    fn log_evidence(&mut self, scenario: &str, text: &str) {
        for s in &mut self.sinks {
            s.log_evidence(scenario, text);
        }
    }

    fn log_debug(&mut self, scenario: &str, text: &str) {
        for s in &mut self.sinks {
            s.log_debug(scenario, text);
        }
    }

    fn log_result(
        &mut self,
        scenario: &str,
        verdict: Verdict,
        elapsed: Duration,
        diagnostic: Option<&str>,
    ) {
        for s in &mut self.sinks {
            s.log_result(scenario, verdict, elapsed, diagnostic);
        }
    }

    fn begin_batch(&mut self, config_hash: &str, scenario_count: usize) {
        for s in &mut self.sinks {
            s.begin_batch(config_hash, scenario_count);
        }
    }

    fn begin_scenario(&mut self, scenario: &str) {
        for s in &mut self.sinks {
            s.begin_scenario(scenario);
        }
    }

    fn end_batch(&mut self, passed: usize, failed: usize) {
        for s in &mut self.sinks {
            s.end_batch(passed, failed);
        }
    }
}
