//! Force Computation Pipeline
//!
//! Extra force contributions are plugged into the engine as
//! [`ForceProvider`]s. Each step the engine hands every provider a read-only
//! [`ForceInput`] and collects contributions into a [`ForceOutput`].

use super::vector::Vec3;

/// Read-only state a provider sees for one step.
#[derive(Debug, Clone, Copy)]
pub struct ForceInput<'a> {
    pub step: u64,
    pub time: f64,
    pub positions: &'a [Vec3],
}

/// Accumulated forces and potential energy for one step.
#[derive(Debug, Clone, PartialEq)]
pub struct ForceOutput {
    forces: Vec<Vec3>,
    energy: f64,
}

impl ForceOutput {
    /// Creates a zeroed buffer for `particles` particles.
    pub fn new(particles: usize) -> Self {
        Self {
            forces: vec![Vec3::ZERO; particles],
            energy: 0.0,
        }
    }

    /// Adds `force` to particle `index`.
    ///
    /// Returns false if the index is out of range.
    pub fn add_force(&mut self, index: usize, force: Vec3) -> bool {
        match self.forces.get_mut(index) {
            Some(slot) => {
                *slot += force;
                true
            }
            None => false,
        }
    }

    pub fn add_energy(&mut self, energy: f64) {
        self.energy += energy;
    }

    /// Folds another partial buffer into this one.
    pub fn merge(&mut self, other: &ForceOutput) {
        for (slot, force) in self.forces.iter_mut().zip(&other.forces) {
            *slot += *force;
        }
        self.energy += other.energy;
    }

    pub fn forces(&self) -> &[Vec3] {
        &self.forces
    }

    pub fn energy(&self) -> f64 {
        self.energy
    }
}

/// A contribution to the engine's force computation.
///
/// Providers are shared between the session that registered them and the
/// engine's worker threads for the duration of a run.
pub trait ForceProvider: Send + Sync {
    /// Adds this provider's forces for the current step.
    fn calculate_forces(&self, input: &ForceInput<'_>, output: &mut ForceOutput);

    /// Smallest particle count this provider can work with.
    fn required_particles(&self) -> usize {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_force_out_of_range() {
        let mut output = ForceOutput::new(2);
        assert!(output.add_force(1, Vec3::new(1.0, 0.0, 0.0)));
        assert!(!output.add_force(2, Vec3::new(1.0, 0.0, 0.0)));
        assert_eq!(output.forces()[1].x, 1.0);
    }

    #[test]
    fn test_merge() {
        let mut a = ForceOutput::new(2);
        a.add_force(0, Vec3::new(1.0, 0.0, 0.0));
        a.add_energy(0.5);

        let mut b = ForceOutput::new(2);
        b.add_force(0, Vec3::new(1.0, 1.0, 0.0));
        b.add_force(1, Vec3::new(0.0, 0.0, 2.0));
        b.add_energy(1.0);

        a.merge(&b);
        assert_eq!(a.forces()[0], Vec3::new(2.0, 1.0, 0.0));
        assert_eq!(a.forces()[1], Vec3::new(0.0, 0.0, 2.0));
        assert_eq!(a.energy(), 1.5);
    }
}
