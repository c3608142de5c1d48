//! Cooperative Stop Signalling
//!
//! Several participants (restraint modules, external controllers) observe the
//! same running engine, but the engine accepts a single stop request. The
//! [`SignalAggregator`] combines their votes with a logical AND: the engine is
//! asked to stop exactly once, when the last registered participant votes.
//!
//! ```text
//! ┌──────────┐ vote  ┌──────────────────┐  all voted  ┌─────────────────────┐
//! │ Signal A │ ────► │                  │ ──────────► │  SimulationSignals  │
//! ├──────────┤       │ SignalAggregator │  (once)     │  Stop = next step   │
//! │ Signal B │ ────► │                  │             └─────────────────────┘
//! └──────────┘       └──────────────────┘
//! ```
//!
//! - [`aggregator`]: participant registration and consensus tracking
//! - [`handle`]: the per-participant [`Signal`] callable

pub mod aggregator;
pub mod handle;

use serde::{Deserialize, Serialize};

pub use aggregator::SignalAggregator;
pub use handle::Signal;

/// Kinds of engine-level simulation signals.
///
/// The engine keeps one flag per kind. Only [`SignalKind::Stop`] can be
/// requested through the aggregator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignalKind {
    /// Stop the simulation at the next safe point.
    Stop,
    /// Write a checkpoint at the next safe point.
    Checkpoint,
    /// Reset performance counters.
    ResetCounters,
}

impl SignalKind {
    /// Number of signal kinds.
    pub const COUNT: usize = 3;

    /// All signal kinds in flag-array order.
    pub const ALL: [SignalKind; Self::COUNT] = [
        SignalKind::Stop,
        SignalKind::Checkpoint,
        SignalKind::ResetCounters,
    ];

    /// Position of this kind in the engine's flag array.
    pub fn index(self) -> usize {
        match self {
            SignalKind::Stop => 0,
            SignalKind::Checkpoint => 1,
            SignalKind::ResetCounters => 2,
        }
    }
}

impl std::fmt::Display for SignalKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SignalKind::Stop => write!(f, "stop"),
            SignalKind::Checkpoint => write!(f, "checkpoint"),
            SignalKind::ResetCounters => write!(f, "reset-counters"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indices_are_distinct() {
        for (position, kind) in SignalKind::ALL.iter().enumerate() {
            assert_eq!(kind.index(), position);
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(SignalKind::Stop.to_string(), "stop");
        assert_eq!(SignalKind::ResetCounters.to_string(), "reset-counters");
    }
}
