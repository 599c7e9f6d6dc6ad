//! Scenario runner core: sequencing, signal rendezvous, and verification.

pub mod combinatorial;
pub mod context;
pub mod dispatcher;
pub mod evidence;
pub mod outcome;
pub mod scenario;
pub mod sequencer;
pub mod suite;
pub mod value;
pub mod verify;
