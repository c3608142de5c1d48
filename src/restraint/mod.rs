//! Restraint Potentials
//!
//! A restraint is a pair potential between two particle sites that client
//! code adds on top of the engine's own force field. Restraints reach the
//! engine through a [`RestraintForceProvider`] and reach the session through
//! a [`RestraintModule`], which also makes them stop-vote participants.
//!
//! # Components
//!
//! - [`harmonic`]: harmonic pair restraint with optional convergence stop
//! - [`provider`]: adapter from a restraint to an engine force provider
//! - [`module`]: named work module wrapping a restraint
//! - [`registry`]: session-owned record of bound restraints

pub mod harmonic;
pub mod module;
pub mod provider;
pub mod registry;

use crate::engine::Vec3;
use crate::session::SessionResources;

pub use harmonic::HarmonicRestraint;
pub use module::RestraintModule;
pub use provider::RestraintForceProvider;
pub use registry::RestraintRegistry;

/// Force and energy of a restraint evaluated at one configuration.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PotentialPointData {
    /// Force on the first site. The second site receives the opposite force.
    pub force: Vec3,
    pub energy: f64,
}

impl PotentialPointData {
    pub fn new(force: Vec3, energy: f64) -> Self {
        Self { force, energy }
    }
}

/// A pair potential applied between two particle sites.
pub trait RestraintPotential: Send + Sync {
    /// Evaluates the potential for site positions `r1`, `r2` at time `t`.
    fn evaluate(&self, r1: Vec3, r2: Vec3, t: f64) -> PotentialPointData;

    /// Indices of the two particles the restraint acts on.
    fn sites(&self) -> [usize; 2];

    /// Called once when the restraint is bound into an open session.
    ///
    /// Restraints that want to vote on stopping keep the handle.
    fn bind_session(&self, _resources: SessionResources) {}
}
