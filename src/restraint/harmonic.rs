//! Harmonic Pair Restraint
//!
//! `E = ½ k (d − r0)²` where `d` is the distance between the two sites.
//!
//! With a stop tolerance set, the restraint votes to stop the simulation the
//! first time `|d − r0| <= tolerance`. Its vote only counts toward the
//! session's stop consensus; the simulation halts once every participant has
//! voted.
//!
//! Binding the restraint into a new session replaces the previous binding
//! and re-arms the convergence check.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use log::{debug, info, warn};

use super::{PotentialPointData, RestraintPotential};
use crate::engine::Vec3;
use crate::session::{OutputValue, SessionResources};
use crate::signals::{Signal, SignalKind};

/// Handles from the session the restraint is currently bound to.
#[derive(Debug, Clone)]
struct Binding {
    stop: Option<Signal>,
    resources: SessionResources,
}

/// Harmonic restraint between two particle sites.
///
/// # Example
///
/// ```
/// use simsession::restraint::{HarmonicRestraint, RestraintPotential};
/// use simsession::engine::Vec3;
///
/// let restraint = HarmonicRestraint::new([0, 1], 1.0, 100.0).with_stop_tolerance(0.01);
/// let point = restraint.evaluate(Vec3::ZERO, Vec3::new(1.5, 0.0, 0.0), 0.0);
/// assert!((point.energy - 12.5).abs() < 1e-12);
/// ```
#[derive(Debug)]
pub struct HarmonicRestraint {
    sites: [usize; 2],
    r0: f64,
    k: f64,
    tolerance: Option<f64>,
    converged: AtomicBool,
    binding: Mutex<Option<Binding>>,
}

impl HarmonicRestraint {
    pub fn new(sites: [usize; 2], r0: f64, k: f64) -> Self {
        Self {
            sites,
            r0,
            k,
            tolerance: None,
            converged: AtomicBool::new(false),
            binding: Mutex::new(None),
        }
    }

    /// Votes for stop once the distance is within `tolerance` of `r0`.
    pub fn with_stop_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = Some(tolerance.abs());
        self
    }

    pub fn reference_distance(&self) -> f64 {
        self.r0
    }

    pub fn spring_constant(&self) -> f64 {
        self.k
    }

    pub fn stop_tolerance(&self) -> Option<f64> {
        self.tolerance
    }

    /// Returns true once the distance has come within tolerance.
    pub fn is_converged(&self) -> bool {
        self.converged.load(Ordering::Acquire)
    }

    /// Returns true if the restraint holds a stop signal from a session.
    pub fn has_stop_signal(&self) -> bool {
        self.current_binding()
            .is_some_and(|binding| binding.stop.is_some())
    }

    fn current_binding(&self) -> Option<Binding> {
        self.binding
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn on_converged(&self, distance: f64, t: f64) {
        info!(
            "Restraint {:?} converged at t = {:.4} (distance {:.6}, target {:.6})",
            self.sites, t, distance, self.r0
        );

        let Some(binding) = self.current_binding() else {
            return;
        };

        if let Some(signal) = &binding.stop {
            signal.call();
        }

        let resources = &binding.resources;
        let output = format!("{}.converged_distance", resources.name());
        match resources.publish(&output, OutputValue::Double(distance)) {
            Ok(status) if !status.is_success() => {
                debug!("No consumer registered for '{}'", output)
            }
            Ok(_) => {}
            Err(e) => warn!("Could not publish '{}': {}", output, e),
        }
    }
}

impl RestraintPotential for HarmonicRestraint {
    fn evaluate(&self, r1: Vec3, r2: Vec3, t: f64) -> PotentialPointData {
        let separation = r1 - r2;
        let distance = separation.norm();
        let deviation = distance - self.r0;

        let energy = 0.5 * self.k * deviation * deviation;
        let force = if distance > 0.0 {
            separation * (-self.k * deviation / distance)
        } else {
            Vec3::ZERO
        };

        if let Some(tolerance) = self.tolerance {
            if deviation.abs() <= tolerance && !self.converged.swap(true, Ordering::AcqRel) {
                self.on_converged(distance, t);
            }
        }

        PotentialPointData::new(force, energy)
    }

    fn sites(&self) -> [usize; 2] {
        self.sites
    }

    fn bind_session(&self, resources: SessionResources) {
        let stop = match self.tolerance {
            Some(_) => match resources.get_mdrunner_signal(SignalKind::Stop) {
                Ok(signal) => Some(signal),
                Err(e) => {
                    warn!("Restraint {:?} cannot vote to stop: {}", self.sites, e);
                    None
                }
            },
            None => None,
        };

        let mut binding = self
            .binding
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if binding.replace(Binding { stop, resources }).is_some() {
            debug!("Restraint {:?} rebound to a new session", self.sites);
        }
        self.converged.store(false, Ordering::Release);
    }
}
