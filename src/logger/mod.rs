//! Result reporting: the sink trait and a JSONL transcript with graceful degradation.

pub mod jsonl;
pub mod sink;
