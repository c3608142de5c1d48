//! Session Management Module
//!
//! Launching, running and closing engine sessions, and the handles work
//! modules use to take part in them.
//!
//! # Structure
//!
//! - [`context`]: the [`Context`] that launches sessions
//! - [`lifecycle`]: the [`Session`] lifecycle
//! - [`resources`]: per-participant [`SessionResources`] handles
//! - [`module`]: the [`MdModule`] trait for client work
//! - [`output`]: named session outputs

pub mod context;
pub mod lifecycle;
pub mod module;
pub mod output;
pub mod resources;

pub use context::Context;
pub use module::MdModule;
pub use output::{OutputKind, OutputStream, OutputValue};
pub use resources::SessionResources;
pub use lifecycle::{Session, SessionId};
