//! Work Modules
//!
//! Client code contributes work to a session as [`MdModule`]s. A module is
//! named, and may carry a restraint that the session binds into the engine's
//! force computation.

use std::sync::Arc;

use crate::restraint::RestraintPotential;

/// A named unit of client work bound into a session before running.
pub trait MdModule: Send + Sync {
    /// Unique name of the module within a session.
    fn name(&self) -> &str;

    /// The module's restraint contribution, if it has one.
    fn restraint(&self) -> Option<Arc<dyn RestraintPotential>> {
        None
    }
}
