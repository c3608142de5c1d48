//! Session Resource Handles
//!
//! A [`SessionResources`] is the capability a participant holds instead of
//! the session itself. It refers to the session weakly and checks the
//! session is still open on every use, so a handle that outlives its session
//! fails with a protocol error.

use std::sync::Weak;

use super::output::OutputValue;
use super::lifecycle::SessionCore;
use crate::error::{Result, SessionError};
use crate::signals::{Signal, SignalKind};
use crate::status::Status;

/// Per-participant handle to session-scoped facilities.
#[derive(Debug, Clone)]
pub struct SessionResources {
    name: String,
    session: Weak<SessionCore>,
}

impl SessionResources {
    pub(crate) fn new(name: impl Into<String>, session: Weak<SessionCore>) -> Self {
        Self {
            name: name.into(),
            session,
        }
    }

    /// Participant name this handle was issued to.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns true while the issuing session is open.
    pub fn is_valid(&self) -> bool {
        self.session
            .upgrade()
            .map_or(false, |core| core.is_open())
    }

    /// Obtains this participant's signal handle.
    ///
    /// # Errors
    ///
    /// * [`SessionError::NotImplemented`] for any kind other than `Stop`
    /// * [`SessionError::Protocol`] if the session is closed or gone
    pub fn get_mdrunner_signal(&self, kind: SignalKind) -> Result<Signal> {
        if kind != SignalKind::Stop {
            return Err(SessionError::NotImplemented(format!(
                "sessions only provide stop signals, not {}",
                kind
            )));
        }

        let core = self.open_session()?;
        core.aggregator().get_signal(&self.name, kind)
    }

    /// Publishes a value on the session's output stream.
    pub fn publish(&self, output: &str, value: OutputValue) -> Result<Status> {
        let core = self.open_session()?;
        Ok(core.outputs().set(output, value))
    }

    fn open_session(&self) -> Result<std::sync::Arc<SessionCore>> {
        let core = self.session.upgrade().ok_or_else(|| {
            SessionError::Protocol(format!(
                "resources for '{}' outlived their session",
                self.name
            ))
        })?;

        if !core.is_open() {
            return Err(SessionError::Protocol(format!(
                "resources for '{}' used after {} was closed",
                self.name,
                core.id()
            )));
        }
        Ok(core)
    }
}
