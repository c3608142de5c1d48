//! Signal Handles
//!
//! A [`Signal`] is the callable a participant invokes to cast its stop vote.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::aggregator::Consensus;

/// One participant's ability to vote for stopping the simulation.
///
/// Handles are cheap to clone and may be invoked from any thread. Invoking a
/// handle more than once has no further effect.
#[derive(Debug, Clone)]
pub struct Signal {
    participant: String,
    vote: Arc<AtomicBool>,
    consensus: Arc<Consensus>,
}

impl Signal {
    pub(crate) fn new(participant: String, vote: Arc<AtomicBool>, consensus: Arc<Consensus>) -> Self {
        Self {
            participant,
            vote,
            consensus,
        }
    }

    /// Casts this participant's vote.
    ///
    /// Returns true if this call completed consensus and issued the engine
    /// stop request.
    pub fn call(&self) -> bool {
        if self.vote.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.consensus.record_vote(&self.participant)
    }

    /// Name of the participant this handle votes for.
    pub fn participant(&self) -> &str {
        &self.participant
    }

    /// Returns true if this participant has voted.
    pub fn has_voted(&self) -> bool {
        self.vote.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use crate::engine::SimulationSignals;
    use crate::signals::{SignalAggregator, SignalKind};
    use std::sync::Arc;

    #[test]
    fn test_call_reports_completing_vote() {
        let signals = Arc::new(SimulationSignals::new());
        let aggregator = SignalAggregator::new(Arc::downgrade(&signals));
        aggregator.add_signaller("A");
        aggregator.add_signaller("B");

        let a = aggregator.get_signal("A", SignalKind::Stop).unwrap();
        let b = aggregator.get_signal("B", SignalKind::Stop).unwrap();

        assert!(!a.call());
        assert!(b.call());
        assert!(!b.call());
    }

    #[test]
    fn test_clones_share_vote() {
        let signals = Arc::new(SimulationSignals::new());
        let aggregator = SignalAggregator::new(Arc::downgrade(&signals));
        aggregator.add_signaller("A");
        aggregator.add_signaller("B");

        let a = aggregator.get_signal("A", SignalKind::Stop).unwrap();
        let copy = a.clone();
        assert_eq!(copy.participant(), "A");

        a.call();
        assert!(copy.has_voted());
        assert!(!copy.call());
        assert_eq!(aggregator.pending_votes(), 1);
    }
}
