//! Execution Context
//!
//! A [`Context`] turns a [`Workflow`] into a running [`Session`]. It allows
//! at most one active session at a time and remembers the status of its
//! last launch attempt.

use std::sync::{Arc, Mutex};

use log::{error, info, warn};

use super::lifecycle::{ActiveSlot, Session, SessionId};
use crate::engine::{EngineBuilder, ReferenceEngineBuilder};
use crate::status::Status;
use crate::workflow::{Workflow, MD_NODE_KEY};

/// Compute resources able to launch sessions.
pub struct Context {
    builder: Arc<dyn EngineBuilder>,
    status: Status,
    active: ActiveSlot,
}

impl Context {
    /// Creates a context that starts engines with `builder`.
    pub fn new(builder: Arc<dyn EngineBuilder>) -> Self {
        Self {
            builder,
            status: Status::default(),
            active: Arc::new(Mutex::new(None)),
        }
    }

    /// Creates a context backed by the built-in reference engine.
    pub fn default_context() -> Self {
        Self::new(Arc::new(ReferenceEngineBuilder::new()))
    }

    /// Launches the workflow's `MD` node as a new session.
    ///
    /// Returns `None` and records a failure status if a session launched
    /// from this context is still open, the workflow has no `MD` node, or
    /// the engine fails to start.
    pub fn launch(&mut self, workflow: &Workflow) -> Option<Session> {
        let mut active = self
            .active
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(id) = *active {
            warn!("Cannot launch: {} is still active", id);
            self.status = Status::failure();
            return None;
        }

        let Some(node) = workflow.get_node(MD_NODE_KEY) else {
            warn!("Cannot launch: workflow has no '{}' node", MD_NODE_KEY);
            self.status = Status::failure();
            return None;
        };

        let engine = match self.builder.start(node.descriptor()) {
            Ok(engine) => engine,
            Err(e) => {
                error!("Failed to start engine for '{}': {}", node.key(), e);
                self.status = Status::failure();
                return None;
            }
        };

        let session = Session::open(engine, Arc::clone(&self.active));
        *active = Some(session.id());
        drop(active);

        info!("Launched {} from node '{}'", session.id(), node.key());
        self.status = Status::success();
        Some(session)
    }

    /// Status of the last launch attempt.
    pub fn status(&self) -> Status {
        self.status
    }

    /// Returns true while a session launched here is open.
    pub fn has_active_session(&self) -> bool {
        self.active_session().is_some()
    }

    /// Identifier of the open session, if any.
    pub fn active_session(&self) -> Option<SessionId> {
        *self
            .active
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::default_context()
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("status", &self.status)
            .field("active", &self.active_session())
            .finish()
    }
}
