//! Append-only evidence trail for one scenario run.

#![allow(missing_docs)]

use serde::{Deserialize, Serialize};

use crate::logger::sink::ResultSink;

/// Which result-sink channel an entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceKind {
    /// Progress narration ("---Initialize---").
    Status,
    /// Comparison outcomes and failure diagnostics.
    Evidence,
    /// Verbose detail, not shown by default.
    Debug,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceEntry {
    pub seq: u64,
    pub kind: EvidenceKind,
    pub text: String,
    /// RFC 3339 UTC timestamp.
    pub ts: String,
}

/// Ordered diagnostic lines for the lifetime of one scenario run.
///
/// Entries are never removed or reordered; `flush_to` hands them to a sink
/// once the run completes.
#[derive(Debug, Default)]
pub struct EvidenceLog {
    entries: Vec<EvidenceEntry>,
    flushed: usize,
}

impl EvidenceLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, kind: EvidenceKind, text: impl Into<String>) -> u64 {
        let seq = self.entries.len() as u64;
        self.entries.push(EvidenceEntry {
            seq,
            kind,
            text: text.into(),
            ts: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        });
        seq
    }

    pub fn status(&mut self, text: impl Into<String>) -> u64 {
        self.push(EvidenceKind::Status, text)
    }

    pub fn evidence(&mut self, text: impl Into<String>) -> u64 {
        self.push(EvidenceKind::Evidence, text)
    }

    pub fn debug(&mut self, text: impl Into<String>) -> u64 {
        self.push(EvidenceKind::Debug, text)
    }

    #[must_use]
    pub fn entries(&self) -> &[EvidenceEntry] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries of one kind, in order.
    pub fn of_kind(&self, kind: EvidenceKind) -> impl Iterator<Item = &EvidenceEntry> {
        self.entries.iter().filter(move |e| e.kind == kind)
    }

    /// Whether any entry's text contains `needle`.
    #[must_use]
    pub fn contains(&self, needle: &str) -> bool {
        self.entries.iter().any(|e| e.text.contains(needle))
    }

    /// Send entries not yet flushed to `sink` under `scenario`.
    pub fn flush_to(&mut self, scenario: &str, sink: &mut dyn ResultSink) {
        for entry in &self.entries[self.flushed..] {
            match entry.kind {
                EvidenceKind::Status => sink.log_status(scenario, &entry.text),
                EvidenceKind::Evidence => sink.log_evidence(scenario, &entry.text),
                EvidenceKind::Debug => sink.log_debug(scenario, &entry.text),
            }
        }
        self.flushed = self.entries.len();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::sink::{MemorySink, SinkRecord};

    #[test]
    fn entries_are_sequenced_in_append_order() {
        let mut log = EvidenceLog::new();
        assert_eq!(log.status("---Initialize---"), 0);
        assert_eq!(log.evidence("Act: 1 / Exp: 1"), 1);
        assert_eq!(log.debug("tick"), 2);
        let seqs: Vec<u64> = log.entries().iter().map(|e| e.seq).collect();
        assert_eq!(seqs, vec![0, 1, 2]);
        assert_eq!(log.of_kind(EvidenceKind::Evidence).count(), 1);
    }

    #[test]
    fn flush_routes_by_kind_and_is_incremental() {
        let mut log = EvidenceLog::new();
        let mut sink = MemorySink::default();
        log.status("one");
        log.evidence("two");
        log.flush_to("S", &mut sink);
        log.debug("three");
        log.flush_to("S", &mut sink);

        assert_eq!(sink.records.len(), 3);
        assert!(matches!(&sink.records[0], SinkRecord::Status { text, .. } if text == "one"));
        assert!(matches!(&sink.records[1], SinkRecord::Evidence { text, .. } if text == "two"));
        assert!(matches!(&sink.records[2], SinkRecord::Debug { text, .. } if text == "three"));
    }
}
