//! Session Lifecycle
//!
//! A [`Session`] owns one engine from launch until close:
//!
//! ```text
//!   Context::launch ──► Open ──close()/drop──► Closed
//!                        │ ▲
//!                 run()  └─┘  set_restraint(), add_participant()
//! ```
//!
//! `run()` borrows the session mutably, so it cannot overlap with `close()`.
//! Closing releases the engine, invalidates every resource handle issued by
//! the session, and frees the owning context's active-session slot.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};

use super::module::MdModule;
use super::output::OutputStream;
use super::resources::SessionResources;
use crate::engine::{Engine, SimulationSignals};
use crate::error::{Result, SessionError};
use crate::monitoring::{LifecycleEvent, SessionTimeline};
use crate::restraint::{RestraintForceProvider, RestraintRegistry};
use crate::signals::SignalAggregator;
use crate::status::Status;

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique session identifier.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl SessionId {
    fn next() -> Self {
        Self(NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

/// Slot through which a context tracks its active session.
pub(crate) type ActiveSlot = Arc<Mutex<Option<SessionId>>>;

/// State shared with resource handles.
#[derive(Debug)]
pub(crate) struct SessionCore {
    id: SessionId,
    open: AtomicBool,
    aggregator: SignalAggregator,
    outputs: OutputStream,
}

impl SessionCore {
    pub(crate) fn id(&self) -> SessionId {
        self.id
    }

    pub(crate) fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    pub(crate) fn aggregator(&self) -> &SignalAggregator {
        &self.aggregator
    }

    pub(crate) fn outputs(&self) -> &OutputStream {
        &self.outputs
    }
}

struct OpenSession {
    engine: Box<dyn Engine>,
    restraints: RestraintRegistry,
}

enum SessionState {
    Open(OpenSession),
    Closed,
}

/// Handle to one in-progress engine execution.
///
/// Created by [`Context::launch`](super::Context::launch).
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use simsession::restraint::{HarmonicRestraint, RestraintModule};
/// use simsession::{Context, Workflow};
///
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let mut context = Context::default_context();
///     let workflow = Workflow::create("topol.tpr");
///     let mut session = context.launch(&workflow).ok_or("launch failed")?;
///
///     let restraint = HarmonicRestraint::new([0, 1], 1.5, 100.0).with_stop_tolerance(0.01);
///     session.set_restraint(Arc::new(RestraintModule::new("pull", Arc::new(restraint))))?;
///
///     let status = session.run()?;
///     session.close();
///     println!("run: {}", status);
///     Ok(())
/// }
/// ```
pub struct Session {
    core: Arc<SessionCore>,
    state: SessionState,
    status: Option<Status>,
    slot: ActiveSlot,
    timeline: SessionTimeline,
}

impl Session {
    /// Wraps a freshly started engine. The caller fills the context slot.
    pub(crate) fn open(engine: Box<dyn Engine>, slot: ActiveSlot) -> Self {
        let id = SessionId::next();
        let aggregator = SignalAggregator::new(Arc::downgrade(&engine.signals()));
        let core = Arc::new(SessionCore {
            id,
            open: AtomicBool::new(true),
            aggregator,
            outputs: OutputStream::new(),
        });

        let mut timeline = SessionTimeline::new(id.to_string());
        timeline.add_event(LifecycleEvent::Opened);
        info!("Opened {}", id);

        Self {
            core,
            state: SessionState::Open(OpenSession {
                engine,
                restraints: RestraintRegistry::new(),
            }),
            status: Some(Status::success()),
            slot,
            timeline,
        }
    }

    pub fn id(&self) -> SessionId {
        self.core.id
    }

    /// Returns true until the session is closed.
    pub fn is_open(&self) -> bool {
        matches!(self.state, SessionState::Open(_))
    }

    /// Outcome of the most recent operation; `None` after close.
    pub fn status(&self) -> Option<Status> {
        self.status
    }

    /// Runs the engine until it finishes or is stopped.
    ///
    /// A non-zero engine exit code is reported as a failure status, not an
    /// error. Running again continues from the current step.
    ///
    /// # Errors
    ///
    /// [`SessionError::Usage`] if the session is closed.
    pub fn run(&mut self) -> Result<Status> {
        let id = self.core.id;
        if !self.is_open() {
            return Err(self.closed_error("run"));
        }
        self.timeline.add_event(LifecycleEvent::RunStarted);
        let open = self.open_mut("run")?;

        info!("Running {}", id);
        let code = open.engine.run();
        let steps = open.engine.completed_steps();
        let status = Status::from_exit_code(code);

        if status.is_success() {
            info!("{} finished after {} step(s)", id, steps);
        } else {
            error!("{} engine exited with code {} at step {}", id, code, steps);
        }

        self.timeline.add_event(LifecycleEvent::RunFinished {
            success: status.is_success(),
            steps,
        });
        self.status = Some(status);
        Ok(status)
    }

    /// Binds a work module's restraint into the engine.
    ///
    /// The module becomes a stop-vote participant under its name and
    /// receives its resource handle through
    /// [`RestraintPotential::bind_session`](crate::restraint::RestraintPotential::bind_session).
    /// A module without a restraint, a name already in use, or an engine
    /// refusing the contribution yields a failure status and binds nothing.
    ///
    /// # Errors
    ///
    /// [`SessionError::Usage`] if the session is closed.
    pub fn set_restraint(&mut self, module: Arc<dyn MdModule>) -> Result<Status> {
        let core = Arc::clone(&self.core);
        let open = self.open_mut("bind a module to")?;
        let name = module.name().to_string();

        if name.trim().is_empty() {
            warn!("Refusing to bind a module with an empty name");
            return Ok(self.record(Status::failure()));
        }

        if open.restraints.contains(&name) || core.aggregator.is_registered(&name) {
            warn!("A participant named '{}' is already bound to {}", name, core.id);
            return Ok(self.record(Status::failure()));
        }

        let Some(restraint) = module.restraint() else {
            warn!("Module '{}' has no restraint to bind", name);
            return Ok(self.record(Status::failure()));
        };

        let provider = Arc::new(RestraintForceProvider::new(Arc::clone(&restraint)));
        if let Err(e) = open.engine.register_force_contribution(provider, &name) {
            error!("Engine refused module '{}': {}", name, e);
            return Ok(self.record(Status::failure()));
        }

        core.aggregator.add_signaller(name.clone());
        restraint.bind_session(SessionResources::new(name.clone(), Arc::downgrade(&core)));
        let count = open.restraints.add(name.clone(), restraint)?;

        info!("Bound module '{}' to {} ({} restraint(s))", name, core.id, count);
        self.timeline
            .add_event(LifecycleEvent::ModuleBound { module: name });
        Ok(self.record(Status::success()))
    }

    /// Registers an external stop-vote participant.
    ///
    /// The simulation will not stop on consensus until this participant has
    /// also voted. Registering a name twice returns a second handle for the
    /// same participant.
    ///
    /// # Errors
    ///
    /// [`SessionError::Usage`] if the session is closed or the name is empty.
    pub fn add_participant(&mut self, name: &str) -> Result<SessionResources> {
        self.open_mut("add a participant to")?;
        let name = name.trim();
        if name.is_empty() {
            return Err(SessionError::Usage(
                "participant name must not be empty".to_string(),
            ));
        }

        if !self.core.aggregator.is_registered(name) {
            self.core.aggregator.add_signaller(name);
            self.timeline.add_event(LifecycleEvent::ParticipantAdded {
                participant: name.to_string(),
            });
            info!("Added participant '{}' to {}", name, self.core.id);
        }

        Ok(SessionResources::new(name, Arc::downgrade(&self.core)))
    }

    /// Issues a resource handle for an already registered participant.
    ///
    /// # Errors
    ///
    /// * [`SessionError::Usage`] if the session is closed
    /// * [`SessionError::Protocol`] if `name` is not a participant
    pub fn resources(&self, name: &str) -> Result<SessionResources> {
        if !self.is_open() {
            return Err(self.closed_error("issue resources from"));
        }
        if !self.core.aggregator.is_registered(name) {
            return Err(SessionError::Protocol(format!(
                "'{}' is not a participant of {}",
                name, self.core.id
            )));
        }
        Ok(SessionResources::new(name, Arc::downgrade(&self.core)))
    }

    /// Number of restraints bound so far; zero once closed.
    pub fn restraint_count(&self) -> usize {
        match &self.state {
            SessionState::Open(open) => open.restraints.len(),
            SessionState::Closed => 0,
        }
    }

    /// Names of bound restraints.
    pub fn restraint_names(&self) -> Vec<String> {
        match &self.state {
            SessionState::Open(open) => open.restraints.names(),
            SessionState::Closed => Vec::new(),
        }
    }

    /// The engine's signal flags, while open.
    pub fn simulation_signals(&self) -> Option<Arc<SimulationSignals>> {
        match &self.state {
            SessionState::Open(open) => Some(open.engine.signals()),
            SessionState::Closed => None,
        }
    }

    /// Steps the engine has completed, while open.
    pub fn completed_steps(&self) -> Option<u64> {
        match &self.state {
            SessionState::Open(open) => Some(open.engine.completed_steps()),
            SessionState::Closed => None,
        }
    }

    /// The session's stop-vote aggregator.
    pub fn aggregator(&self) -> &SignalAggregator {
        &self.core.aggregator
    }

    /// Named outputs published by participants.
    pub fn outputs(&self) -> &OutputStream {
        &self.core.outputs
    }

    pub fn timeline(&self) -> &SessionTimeline {
        &self.timeline
    }

    /// Releases the engine and ends the session.
    ///
    /// Returns the final status on the first call and `None` on every later
    /// call.
    pub fn close(&mut self) -> Option<Status> {
        let open = match std::mem::replace(&mut self.state, SessionState::Closed) {
            SessionState::Open(open) => open,
            SessionState::Closed => {
                debug!("{} is already closed", self.core.id);
                return None;
            }
        };

        self.core.open.store(false, Ordering::Release);

        let OpenSession {
            mut engine,
            mut restraints,
        } = open;
        restraints.clear();

        let mut status = self.status.take().unwrap_or_default();
        if let Err(e) = engine.terminate() {
            error!("Failed to release engine of {}: {}", self.core.id, e);
            status = Status::failure();
        }
        drop(engine);

        {
            let mut slot = self
                .slot
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            if *slot == Some(self.core.id) {
                *slot = None;
            }
        }

        self.timeline.add_event(LifecycleEvent::Closed {
            success: status.is_success(),
        });
        info!("Closed {} ({})", self.core.id, status);
        Some(status)
    }

    fn open_mut(&mut self, action: &str) -> Result<&mut OpenSession> {
        let id = self.core.id;
        match &mut self.state {
            SessionState::Open(open) => Ok(open),
            SessionState::Closed => Err(SessionError::Usage(format!(
                "cannot {} {}: it is closed",
                action, id
            ))),
        }
    }

    fn closed_error(&self, action: &str) -> SessionError {
        SessionError::Usage(format!(
            "cannot {} {}: it is closed",
            action, self.core.id
        ))
    }

    fn record(&mut self, status: Status) -> Status {
        self.status = Some(status);
        status
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.core.id)
            .field("open", &self.is_open())
            .field("status", &self.status)
            .field("restraints", &self.restraint_names())
            .finish()
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if !self.is_open() {
            return;
        }

        warn!("{} dropped while open; closing implicitly", self.core.id);
        self.timeline.add_event(LifecycleEvent::ImplicitClose);
        if let Some(status) = self.close() {
            if !status.is_success() {
                error!(
                    "Implicit close of {} failed; the failure cannot be reported to the caller",
                    self.core.id
                );
            }
        }
    }
}
