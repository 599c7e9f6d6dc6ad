//! SIGINT/SIGTERM handling for batch runs.
//!
//! Uses `signal-hook` to flip a shared flag. The suite polls the flag between
//! scenarios, so a scenario in progress always finishes and reports its
//! verdict before the batch stops.

#![allow(missing_docs)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use signal_hook::consts::{SIGINT, SIGTERM};

/// Shared cancellation flag.
///
/// `Ordering::Relaxed` is enough: the flag is only polled, never used to
/// publish other data.
#[derive(Clone, Debug, Default)]
pub struct InterruptFlag {
    flag: Arc<AtomicBool>,
}

impl InterruptFlag {
    /// Create a flag and register SIGINT and SIGTERM to set it.
    ///
    /// Registration is best-effort; failures are reported on stderr.
    #[must_use]
    pub fn install() -> Self {
        let handler = Self::default();
        for (name, signal) in [("SIGINT", SIGINT), ("SIGTERM", SIGTERM)] {
            if let Err(e) = signal_hook::flag::register(signal, Arc::clone(&handler.flag)) {
                eprintln!("[DRT-SIGNAL] failed to register {name}: {e}");
            }
        }
        handler
    }

    #[must_use]
    pub fn is_set(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    /// Request cancellation programmatically.
    pub fn request(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    /// The raw flag, for [`Suite::run`](crate::harness::suite::Suite::run).
    #[must_use]
    pub fn as_atomic(&self) -> &AtomicBool {
        &self.flag
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_is_visible_through_clones() {
        let flag = InterruptFlag::default();
        let other = flag.clone();
        assert!(!flag.is_set());
        other.request();
        assert!(flag.is_set());
        assert!(flag.as_atomic().load(Ordering::Relaxed));
    }
}
