//! Engine Signal Flags
//!
//! The engine polls one atomic flag per [`SignalKind`] at each safe point.
//! Requests are best-effort: setting the stop flag asks the engine to halt
//! at its next step boundary, not immediately.

use std::sync::atomic::{AtomicI32, AtomicUsize, Ordering};

use log::debug;

use crate::signals::SignalKind;

/// Flag value meaning "no request pending".
pub const SIGNAL_CLEAR: i32 = 0;

/// Flag value meaning "stop at the next step boundary".
pub const STOP_AT_NEXT_STEP: i32 = 1;

/// The engine's signal-flag array.
#[derive(Debug, Default)]
pub struct SimulationSignals {
    flags: [AtomicI32; SignalKind::COUNT],
    stop_requests: AtomicUsize,
}

impl SimulationSignals {
    /// Creates a flag array with every signal cleared.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the flag for `kind`.
    pub fn set(&self, kind: SignalKind, value: i32) {
        self.flags[kind.index()].store(value, Ordering::Release);
    }

    /// Reads the flag for `kind`.
    pub fn get(&self, kind: SignalKind) -> i32 {
        self.flags[kind.index()].load(Ordering::Acquire)
    }

    /// Asks the engine to stop at the next step boundary.
    pub fn request_stop(&self) {
        let previous = self.stop_requests.fetch_add(1, Ordering::AcqRel);
        debug!("Stop requested (request #{})", previous + 1);
        self.set(SignalKind::Stop, STOP_AT_NEXT_STEP);
    }

    /// Returns true if a stop request is pending.
    pub fn stop_requested(&self) -> bool {
        self.get(SignalKind::Stop) != SIGNAL_CLEAR
    }

    /// Number of times a stop was requested.
    pub fn stop_request_count(&self) -> usize {
        self.stop_requests.load(Ordering::Acquire)
    }

    /// Clears every flag. The request counter is kept.
    pub fn clear(&self) {
        for kind in SignalKind::ALL {
            self.set(kind, SIGNAL_CLEAR);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_signals_are_clear() {
        let signals = SimulationSignals::new();
        for kind in SignalKind::ALL {
            assert_eq!(signals.get(kind), SIGNAL_CLEAR);
        }
        assert!(!signals.stop_requested());
        assert_eq!(signals.stop_request_count(), 0);
    }

    #[test]
    fn test_request_stop() {
        let signals = SimulationSignals::new();
        signals.request_stop();

        assert!(signals.stop_requested());
        assert_eq!(signals.get(SignalKind::Stop), STOP_AT_NEXT_STEP);
        assert_eq!(signals.get(SignalKind::Checkpoint), SIGNAL_CLEAR);
        assert_eq!(signals.stop_request_count(), 1);
    }

    #[test]
    fn test_clear_keeps_counter() {
        let signals = SimulationSignals::new();
        signals.request_stop();
        signals.set(SignalKind::Checkpoint, 1);
        signals.clear();

        assert!(!signals.stop_requested());
        assert_eq!(signals.get(SignalKind::Checkpoint), SIGNAL_CLEAR);
        assert_eq!(signals.stop_request_count(), 1);
    }
}
