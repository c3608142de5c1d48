//! Logical-AND Signal Aggregation
//!
//! Participants register by name, then obtain a [`Signal`] to cast their
//! vote. Registration is serialized behind a mutex; voting is lock-free so
//! force callbacks on different worker threads can vote during the same step.
//!
//! The consensus counter tracks how many registered participants have not
//! voted yet. A participant's first vote decrements it, and the vote that
//! takes it to zero issues the engine stop request. A `fired` latch makes the
//! request happen at most once per aggregator.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Weak};

use log::{debug, info, warn};

use super::handle::Signal;
use super::SignalKind;
use crate::engine::SimulationSignals;
use crate::error::{Result, SessionError};

/// Shared consensus state between the aggregator and its signal handles.
#[derive(Debug)]
pub(crate) struct Consensus {
    pending: AtomicUsize,
    fired: AtomicBool,
    target: Weak<SimulationSignals>,
}

impl Consensus {
    /// Records that one more participant has voted.
    ///
    /// Returns true if this vote completed the set and issued the stop.
    pub(crate) fn record_vote(&self, participant: &str) -> bool {
        let before = self.pending.fetch_sub(1, Ordering::AcqRel);
        debug!(
            "Participant '{}' voted to stop ({} vote(s) outstanding)",
            participant,
            before.saturating_sub(1)
        );
        if before != 1 {
            return false;
        }
        self.fire(participant)
    }

    fn fire(&self, participant: &str) -> bool {
        if self
            .fired
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }

        match self.target.upgrade() {
            Some(signals) => {
                info!(
                    "All participants agreed to stop; final vote from '{}'",
                    participant
                );
                signals.request_stop();
            }
            None => warn!(
                "Stop consensus reached after '{}' voted, but the engine has been released",
                participant
            ),
        }
        true
    }
}

/// Coordinates cooperative stop among named participants.
#[derive(Debug)]
pub struct SignalAggregator {
    participants: Mutex<HashMap<String, Arc<AtomicBool>>>,
    consensus: Arc<Consensus>,
}

impl SignalAggregator {
    /// Creates an aggregator that stops the engine owning `target`.
    pub fn new(target: Weak<SimulationSignals>) -> Self {
        Self {
            participants: Mutex::new(HashMap::new()),
            consensus: Arc::new(Consensus {
                pending: AtomicUsize::new(0),
                fired: AtomicBool::new(false),
                target,
            }),
        }
    }

    /// Registers a participant that has not voted yet.
    ///
    /// Registering an existing name again has no effect.
    pub fn add_signaller(&self, name: impl Into<String>) {
        let name = name.into();
        let mut participants = self
            .participants
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if participants.contains_key(&name) {
            debug!("Participant '{}' is already registered", name);
            return;
        }

        self.consensus.pending.fetch_add(1, Ordering::AcqRel);
        participants.insert(name.clone(), Arc::new(AtomicBool::new(false)));
        debug!("Registered stop participant '{}'", name);
    }

    /// Returns a signal handle through which `name` casts its vote.
    ///
    /// # Errors
    ///
    /// * [`SessionError::NotImplemented`] for any kind other than `Stop`
    /// * [`SessionError::Protocol`] if `name` was never registered
    pub fn get_signal(&self, name: &str, kind: SignalKind) -> Result<Signal> {
        if kind != SignalKind::Stop {
            return Err(SessionError::NotImplemented(format!(
                "this signaller only handles stop signals, not {}",
                kind
            )));
        }

        let participants = self
            .participants
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let vote = participants.get(name).ok_or_else(|| {
            SessionError::Protocol(format!(
                "participant '{}' must be registered before requesting a signal",
                name
            ))
        })?;

        Ok(Signal::new(
            name.to_string(),
            Arc::clone(vote),
            Arc::clone(&self.consensus),
        ))
    }

    /// Returns true if `name` is a registered participant.
    pub fn is_registered(&self, name: &str) -> bool {
        self.participants
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .contains_key(name)
    }

    /// Returns whether `name` has voted, or `None` if it is not registered.
    pub fn has_voted(&self, name: &str) -> Option<bool> {
        self.participants
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(name)
            .map(|vote| vote.load(Ordering::Acquire))
    }

    /// Registered participant names, sorted.
    pub fn participants(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .participants
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    /// Number of registered participants that have not voted.
    pub fn pending_votes(&self) -> usize {
        self.consensus.pending.load(Ordering::Acquire)
    }

    /// Returns true once every participant has voted and the stop was issued.
    pub fn consensus_reached(&self) -> bool {
        self.consensus.fired.load(Ordering::Acquire)
    }
}
