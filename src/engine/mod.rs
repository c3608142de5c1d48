//! Simulation Engine Boundary
//!
//! The session layer drives an engine only through the narrow interface in
//! this module: an [`EngineBuilder`] starts an [`Engine`] from an
//! [`EngineDescriptor`](crate::workflow::EngineDescriptor), force
//! contributions are registered before running, and stopping is requested
//! through the engine's [`SimulationSignals`].
//!
//! # Components
//!
//! - [`signals`]: per-kind atomic signal flags polled by the engine
//! - [`force`]: the force-provider pipeline
//! - [`reference`]: a small built-in engine used by the default context
//! - [`vector`]: position and force vectors

pub mod force;
pub mod reference;
pub mod signals;
pub mod vector;

use std::sync::Arc;

use crate::error::Result;
use crate::workflow::EngineDescriptor;

pub use force::{ForceInput, ForceOutput, ForceProvider};
pub use reference::{ReferenceEngine, ReferenceEngineBuilder};
pub use signals::{SimulationSignals, SIGNAL_CLEAR, STOP_AT_NEXT_STEP};
pub use vector::Vec3;

/// Exit code of a run that finished normally or stopped on request.
pub const EXIT_SUCCESS: i32 = 0;

/// A running simulation engine instance.
///
/// The engine is owned exclusively by one session.
pub trait Engine: Send {
    /// Runs the configured number of steps, blocking until done or stopped.
    ///
    /// Returns an exit code; zero means success.
    fn run(&mut self) -> i32;

    /// Advances at most `steps` steps.
    fn advance(&mut self, steps: u64) -> i32;

    /// Adds a named contribution to the force computation.
    ///
    /// Must be called before [`Engine::run`]. Contributions cannot be removed.
    fn register_force_contribution(
        &mut self,
        provider: Arc<dyn ForceProvider>,
        name: &str,
    ) -> Result<()>;

    /// The signal flags this engine polls.
    fn signals(&self) -> Arc<SimulationSignals>;

    /// Releases the engine's resources. No run may follow.
    fn terminate(&mut self) -> Result<()>;

    /// Steps completed so far.
    fn completed_steps(&self) -> u64;
}

/// Constructs engines from descriptors.
pub trait EngineBuilder: Send + Sync {
    /// Starts a new engine instance.
    fn start(&self, descriptor: &EngineDescriptor) -> Result<Box<dyn Engine>>;
}
