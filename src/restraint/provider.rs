//! Adapter from [`RestraintPotential`] to the engine's force pipeline.

use std::sync::Arc;

use log::warn;

use super::RestraintPotential;
use crate::engine::{ForceInput, ForceOutput, ForceProvider};

/// Applies a restraint's force to its two sites each step.
pub struct RestraintForceProvider {
    restraint: Arc<dyn RestraintPotential>,
}

impl RestraintForceProvider {
    pub fn new(restraint: Arc<dyn RestraintPotential>) -> Self {
        Self { restraint }
    }
}

impl ForceProvider for RestraintForceProvider {
    fn calculate_forces(&self, input: &ForceInput<'_>, output: &mut ForceOutput) {
        let [first, second] = self.restraint.sites();
        let (Some(&r1), Some(&r2)) = (input.positions.get(first), input.positions.get(second))
        else {
            warn!(
                "Restraint sites {} and {} are outside the system; skipping",
                first, second
            );
            return;
        };

        let point = self.restraint.evaluate(r1, r2, input.time);
        output.add_force(first, point.force);
        output.add_force(second, -point.force);
        output.add_energy(point.energy);
    }

    fn required_particles(&self) -> usize {
        let [first, second] = self.restraint.sites();
        first.max(second) + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Vec3;
    use crate::restraint::PotentialPointData;

    struct Fixed;

    impl RestraintPotential for Fixed {
        fn evaluate(&self, _r1: Vec3, _r2: Vec3, _t: f64) -> PotentialPointData {
            PotentialPointData::new(Vec3::new(1.0, 2.0, 0.0), 0.25)
        }

        fn sites(&self) -> [usize; 2] {
            [0, 2]
        }
    }

    #[test]
    fn test_equal_and_opposite_forces() {
        let provider = RestraintForceProvider::new(Arc::new(Fixed));
        let positions = vec![Vec3::ZERO; 3];
        let input = ForceInput {
            step: 0,
            time: 0.0,
            positions: &positions,
        };
        let mut output = ForceOutput::new(3);

        provider.calculate_forces(&input, &mut output);

        assert_eq!(output.forces()[0], Vec3::new(1.0, 2.0, 0.0));
        assert_eq!(output.forces()[1], Vec3::ZERO);
        assert_eq!(output.forces()[2], Vec3::new(-1.0, -2.0, 0.0));
        assert_eq!(output.energy(), 0.25);
        assert_eq!(provider.required_particles(), 3);
    }

    #[test]
    fn test_missing_sites_are_skipped() {
        let provider = RestraintForceProvider::new(Arc::new(Fixed));
        let positions = vec![Vec3::ZERO; 2];
        let input = ForceInput {
            step: 0,
            time: 0.0,
            positions: &positions,
        };
        let mut output = ForceOutput::new(2);

        provider.calculate_forces(&input, &mut output);
        assert_eq!(output, ForceOutput::new(2));
    }
}
