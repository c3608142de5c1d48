//! SimSession - Simulation Session Coordination
//!
//! Describes work for a simulation engine, launches it as a session, binds
//! client work modules (restraints) into the engine's force computation,
//! and lets those modules agree to stop the simulation cooperatively.
//!
//! # Architecture
//!
//! - [`workflow`]: work specifications, workflow graphs and YAML loading
//! - [`session`]: execution context, session lifecycle and resource handles
//! - [`signals`]: logical-AND stop voting among participants
//! - [`engine`]: the engine boundary and a built-in reference engine
//! - [`restraint`]: pair restraint potentials and their work modules
//! - [`monitoring`]: session timelines and run reports
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use simsession::restraint::{HarmonicRestraint, RestraintModule};
//! use simsession::{load_workflow, Context};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Load a workflow from YAML
//!     let workflow = load_workflow("simulation.yaml")?;
//!
//!     // Launch it on the built-in engine
//!     let mut context = Context::default_context();
//!     let mut session = context.launch(&workflow).ok_or("launch failed")?;
//!
//!     // Stop once the pair reaches its target distance
//!     let restraint = HarmonicRestraint::new([0, 1], 1.2, 500.0).with_stop_tolerance(0.001);
//!     session.set_restraint(Arc::new(RestraintModule::new("pull", Arc::new(restraint))))?;
//!
//!     let status = session.run()?;
//!     session.close();
//!     println!("Run finished: {}", status);
//!     Ok(())
//! }
//! ```

pub mod engine;
pub mod error;
pub mod monitoring;
pub mod restraint;
pub mod session;
pub mod signals;
pub mod status;
pub mod workflow;

// Re-export commonly used types
pub use error::{Result, SessionError};
pub use session::{Context, MdModule, Session, SessionResources};
pub use signals::{Signal, SignalAggregator, SignalKind};
pub use status::Status;
pub use workflow::model::{EngineDescriptor, NodeSpecification, Workflow};
pub use workflow::parser::load_workflow;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "SimSession";
