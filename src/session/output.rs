//! Session Output Streams
//!
//! Work modules publish named values during a run; client code subscribes
//! consumers by name. The supported data kinds form a closed set, and each
//! kind has its own consumer table.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::status::Status;

/// Data kinds an output may carry.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputKind {
    Bool,
    Double,
}

/// A published value.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub enum OutputValue {
    Bool(bool),
    Double(f64),
}

impl OutputValue {
    pub fn kind(&self) -> OutputKind {
        match self {
            OutputValue::Bool(_) => OutputKind::Bool,
            OutputValue::Double(_) => OutputKind::Double,
        }
    }
}

type BoolConsumer = Arc<dyn Fn(bool) + Send + Sync>;
type DoubleConsumer = Arc<dyn Fn(f64) + Send + Sync>;

#[derive(Default)]
struct Consumers {
    bools: HashMap<String, Vec<BoolConsumer>>,
    doubles: HashMap<String, Vec<DoubleConsumer>>,
}

/// Named outputs of one session.
#[derive(Default)]
pub struct OutputStream {
    consumers: Mutex<Consumers>,
}

impl OutputStream {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes `consumer` to boolean values published as `name`.
    pub fn on_bool(&self, name: impl Into<String>, consumer: impl Fn(bool) + Send + Sync + 'static) {
        self.lock()
            .bools
            .entry(name.into())
            .or_default()
            .push(Arc::new(consumer));
    }

    /// Subscribes `consumer` to floating-point values published as `name`.
    pub fn on_double(&self, name: impl Into<String>, consumer: impl Fn(f64) + Send + Sync + 'static) {
        self.lock()
            .doubles
            .entry(name.into())
            .or_default()
            .push(Arc::new(consumer));
    }

    /// Delivers `value` to every consumer of `name` with a matching kind.
    ///
    /// Returns a failure status if nothing consumes that name and kind.
    pub fn set(&self, name: &str, value: OutputValue) -> Status {
        // Consumers run outside the lock so they may publish in turn.
        let delivered = match value {
            OutputValue::Bool(flag) => {
                let targets = self.lock().bools.get(name).cloned().unwrap_or_default();
                targets.iter().for_each(|consumer| consumer(flag));
                targets.len()
            }
            OutputValue::Double(number) => {
                let targets = self.lock().doubles.get(name).cloned().unwrap_or_default();
                targets.iter().for_each(|consumer| consumer(number));
                targets.len()
            }
        };

        if delivered == 0 {
            debug!("No {:?} consumer for output '{}'", value.kind(), name);
            return Status::failure();
        }
        Status::success()
    }

    /// Returns true if some consumer accepts `kind` values named `name`.
    pub fn has_consumer(&self, name: &str, kind: OutputKind) -> bool {
        let consumers = self.lock();
        match kind {
            OutputKind::Bool => consumers.bools.contains_key(name),
            OutputKind::Double => consumers.doubles.contains_key(name),
        }
    }

    /// All subscribed output names with their kinds, sorted by name.
    pub fn names(&self) -> Vec<(String, OutputKind)> {
        let consumers = self.lock();
        let mut names: Vec<(String, OutputKind)> = consumers
            .bools
            .keys()
            .map(|name| (name.clone(), OutputKind::Bool))
            .chain(
                consumers
                    .doubles
                    .keys()
                    .map(|name| (name.clone(), OutputKind::Double)),
            )
            .collect();
        names.sort_by(|a, b| a.0.cmp(&b.0));
        names
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Consumers> {
        self.consumers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl std::fmt::Debug for OutputStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputStream")
            .field("outputs", &self.names())
            .finish()
    }
}
