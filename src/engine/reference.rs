//! Reference Engine
//!
//! A small overdamped particle integrator. Each step it evaluates every
//! registered force provider and moves particles along the summed force:
//! `x += dt * f`. It exists so that sessions, restraints and cooperative
//! stop can run end to end without an external simulation package.
//!
//! Particles start on the x axis, `spacing` apart. Recognised options:
//!
//! | option      | default | meaning                       |
//! |-------------|---------|-------------------------------|
//! | `particles` | 2       | number of particles           |
//! | `spacing`   | 1.0     | initial distance between them |
//!
//! The input file named in the descriptor is recorded but not read.

use std::panic::{self, AssertUnwindSafe};
use std::str::FromStr;
use std::sync::Arc;
use std::thread;

use log::{debug, error, info, warn};

use super::force::{ForceInput, ForceOutput, ForceProvider};
use super::signals::SimulationSignals;
use super::vector::Vec3;
use super::{Engine, EngineBuilder, EXIT_SUCCESS};
use crate::error::{Result, SessionError};
use crate::workflow::EngineDescriptor;

/// Exit code when running an engine that was already terminated.
pub const EXIT_TERMINATED: i32 = 2;

/// Exit code when particle positions stop being finite.
pub const EXIT_UNSTABLE: i32 = 3;

/// Exit code when a force provider panics during a step.
pub const EXIT_FORCE_FAILURE: i32 = 4;

const DEFAULT_PARTICLES: usize = 2;
const DEFAULT_SPACING: f64 = 1.0;

/// Builds [`ReferenceEngine`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReferenceEngineBuilder;

impl ReferenceEngineBuilder {
    pub fn new() -> Self {
        Self
    }
}

impl EngineBuilder for ReferenceEngineBuilder {
    fn start(&self, descriptor: &EngineDescriptor) -> Result<Box<dyn Engine>> {
        Ok(Box::new(ReferenceEngine::from_descriptor(descriptor)?))
    }
}

enum StepOutcome {
    Completed,
    Unstable,
    ForceFailure,
}

/// Built-in overdamped integrator.
pub struct ReferenceEngine {
    input: String,
    steps: u64,
    timestep: f64,
    threads: usize,
    positions: Vec<Vec3>,
    providers: Vec<(String, Arc<dyn ForceProvider>)>,
    signals: Arc<SimulationSignals>,
    completed: u64,
    energy: f64,
    terminated: bool,
}

impl ReferenceEngine {
    /// Starts an engine from a descriptor.
    ///
    /// Fails if the input is empty, the timestep is not positive, or an
    /// option cannot be parsed.
    pub fn from_descriptor(descriptor: &EngineDescriptor) -> Result<Self> {
        if descriptor.input.trim().is_empty() {
            return Err(SessionError::Engine(
                "no input file given to start the engine from".to_string(),
            ));
        }

        if descriptor.timestep.is_nan() || descriptor.timestep <= 0.0 {
            return Err(SessionError::Engine(format!(
                "timestep must be positive, got {}",
                descriptor.timestep
            )));
        }

        let particles: usize = parse_option(descriptor, "particles", DEFAULT_PARTICLES)?;
        let spacing: f64 = parse_option(descriptor, "spacing", DEFAULT_SPACING)?;

        if particles == 0 {
            return Err(SessionError::Engine(
                "engine needs at least one particle".to_string(),
            ));
        }

        let threads = match descriptor.threads {
            Some(0) => {
                return Err(SessionError::Engine(
                    "thread count must be at least 1".to_string(),
                ))
            }
            Some(n) => n,
            None => num_cpus::get(),
        };

        let positions = (0..particles)
            .map(|i| Vec3::new(i as f64 * spacing, 0.0, 0.0))
            .collect();

        info!(
            "Started reference engine from '{}' ({} particles, {} steps, {} thread(s))",
            descriptor.input, particles, descriptor.steps, threads
        );

        Ok(Self {
            input: descriptor.input.clone(),
            steps: descriptor.steps,
            timestep: descriptor.timestep,
            threads,
            positions,
            providers: Vec::new(),
            signals: Arc::new(SimulationSignals::new()),
            completed: 0,
            energy: 0.0,
            terminated: false,
        })
    }

    /// Current particle positions.
    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    /// Potential energy from the last completed step.
    pub fn energy(&self) -> f64 {
        self.energy
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    /// Names of registered force contributions, in registration order.
    pub fn contributions(&self) -> Vec<&str> {
        self.providers.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Sums every provider's contribution for the current step.
    ///
    /// Returns `None` if any provider panicked; the partial sum is discarded.
    fn compute_forces(&self) -> Option<ForceOutput> {
        let input = ForceInput {
            step: self.completed,
            time: self.completed as f64 * self.timestep,
            positions: &self.positions,
        };
        let particles = self.positions.len();

        if self.threads <= 1 || self.providers.len() <= 1 {
            let mut output = ForceOutput::new(particles);
            for (name, provider) in &self.providers {
                let result = panic::catch_unwind(AssertUnwindSafe(|| {
                    provider.calculate_forces(&input, &mut output)
                }));
                if result.is_err() {
                    error!("Force contribution '{}' panicked", name);
                    return None;
                }
            }
            return Some(output);
        }

        // Each worker fills its own buffer; buffers are summed afterwards.
        let chunk = self.providers.len().div_ceil(self.threads);
        let input = &input;
        let partials: Option<Vec<ForceOutput>> = thread::scope(|scope| {
            let workers: Vec<_> = self
                .providers
                .chunks(chunk)
                .map(|group| {
                    scope.spawn(move || {
                        let mut output = ForceOutput::new(particles);
                        for (_, provider) in group {
                            provider.calculate_forces(input, &mut output);
                        }
                        output
                    })
                })
                .collect();

            // Join every worker before deciding, so none outlives the scope unjoined.
            let joined: Vec<_> = workers.into_iter().map(|worker| worker.join()).collect();
            let failed = joined.iter().filter(|result| result.is_err()).count();
            if failed > 0 {
                error!("{} force worker(s) panicked", failed);
                return None;
            }
            joined.into_iter().collect::<std::result::Result<Vec<_>, _>>().ok()
        });

        let mut total = ForceOutput::new(particles);
        for partial in &partials? {
            total.merge(partial);
        }
        Some(total)
    }

    fn step(&mut self) -> StepOutcome {
        let Some(output) = self.compute_forces() else {
            return StepOutcome::ForceFailure;
        };
        for (position, force) in self.positions.iter_mut().zip(output.forces()) {
            *position += *force * self.timestep;
        }
        self.energy = output.energy();
        self.completed += 1;
        if self.positions.iter().all(|p| p.is_finite()) {
            StepOutcome::Completed
        } else {
            StepOutcome::Unstable
        }
    }
}

impl Engine for ReferenceEngine {
    fn run(&mut self) -> i32 {
        self.advance(self.steps)
    }

    fn advance(&mut self, steps: u64) -> i32 {
        if self.terminated {
            warn!("Cannot advance a terminated engine");
            return EXIT_TERMINATED;
        }

        for _ in 0..steps {
            if self.signals.stop_requested() {
                info!("Stop signal received at step {}", self.completed);
                break;
            }

            match self.step() {
                StepOutcome::Completed => {}
                StepOutcome::Unstable => {
                    error!(
                        "Particle positions became non-finite at step {}",
                        self.completed
                    );
                    return EXIT_UNSTABLE;
                }
                StepOutcome::ForceFailure => {
                    error!("Force computation failed at step {}", self.completed);
                    return EXIT_FORCE_FAILURE;
                }
            }
        }

        debug!(
            "Engine at step {} (potential energy {:.6})",
            self.completed, self.energy
        );
        EXIT_SUCCESS
    }

    fn register_force_contribution(
        &mut self,
        provider: Arc<dyn ForceProvider>,
        name: &str,
    ) -> Result<()> {
        if self.terminated {
            return Err(SessionError::Engine(
                "cannot register forces with a terminated engine".to_string(),
            ));
        }

        let required = provider.required_particles();
        if required > self.positions.len() {
            return Err(SessionError::Engine(format!(
                "contribution '{}' needs {} particles but the engine has {}",
                name,
                required,
                self.positions.len()
            )));
        }

        debug!("Registered force contribution '{}'", name);
        self.providers.push((name.to_string(), provider));
        Ok(())
    }

    fn signals(&self) -> Arc<SimulationSignals> {
        Arc::clone(&self.signals)
    }

    fn terminate(&mut self) -> Result<()> {
        if self.terminated {
            return Ok(());
        }
        self.terminated = true;
        self.providers.clear();
        info!("Reference engine released after {} step(s)", self.completed);
        Ok(())
    }

    fn completed_steps(&self) -> u64 {
        self.completed
    }
}

fn parse_option<T: FromStr>(descriptor: &EngineDescriptor, key: &str, default: T) -> Result<T> {
    match descriptor.option(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| {
            SessionError::Engine(format!("invalid value '{}' for option '{}'", raw, key))
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Pulls one particle along +x with a constant force.
    struct ConstantPull {
        particle: usize,
        magnitude: f64,
        calls: AtomicUsize,
    }

    impl ConstantPull {
        fn new(particle: usize, magnitude: f64) -> Self {
            Self {
                particle,
                magnitude,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl ForceProvider for ConstantPull {
        fn calculate_forces(&self, _input: &ForceInput<'_>, output: &mut ForceOutput) {
            self.calls.fetch_add(1, Ordering::SeqCst);
            output.add_force(self.particle, Vec3::new(self.magnitude, 0.0, 0.0));
            output.add_energy(1.0);
        }

        fn required_particles(&self) -> usize {
            self.particle + 1
        }
    }

    /// Requests a stop once the given step is reached.
    struct StopAt {
        step: u64,
        signals: Arc<SimulationSignals>,
    }

    impl ForceProvider for StopAt {
        fn calculate_forces(&self, input: &ForceInput<'_>, _output: &mut ForceOutput) {
            if input.step + 1 == self.step {
                self.signals.request_stop();
            }
        }
    }

    struct Explode;

    impl ForceProvider for Explode {
        fn calculate_forces(&self, _input: &ForceInput<'_>, output: &mut ForceOutput) {
            output.add_force(0, Vec3::new(f64::INFINITY, 0.0, 0.0));
        }
    }

    struct Panicking;

    impl ForceProvider for Panicking {
        fn calculate_forces(&self, _input: &ForceInput<'_>, _output: &mut ForceOutput) {
            panic!("force evaluation failed");
        }
    }

    fn descriptor(steps: u64, threads: usize) -> EngineDescriptor {
        EngineDescriptor::new("topol.tpr")
            .with_steps(steps)
            .with_timestep(0.1)
            .with_threads(threads)
    }

    #[test]
    fn test_initial_layout() {
        let engine =
            ReferenceEngine::from_descriptor(&descriptor(10, 1).with_option("particles", "3"))
                .unwrap();
        assert_eq!(engine.positions().len(), 3);
        assert_eq!(engine.positions()[2], Vec3::new(2.0, 0.0, 0.0));
        assert_eq!(engine.completed_steps(), 0);
        assert_eq!(engine.input(), "topol.tpr");
    }

    #[test]
    fn test_start_rejects_bad_descriptors() {
        let builder = ReferenceEngineBuilder::new();

        let mut empty = descriptor(10, 1);
        empty.input = String::new();
        assert!(matches!(builder.start(&empty), Err(SessionError::Engine(_))));

        let bad_option = descriptor(10, 1).with_option("particles", "many");
        assert!(matches!(
            builder.start(&bad_option),
            Err(SessionError::Engine(_))
        ));

        let zero = descriptor(10, 1).with_option("particles", "0");
        assert!(builder.start(&zero).is_err());

        assert!(builder.start(&descriptor(10, 0)).is_err());
        assert!(builder.start(&descriptor(10, 1).with_timestep(0.0)).is_err());
    }

    #[test]
    fn test_run_completes_all_steps() {
        let mut engine = ReferenceEngine::from_descriptor(&descriptor(25, 1)).unwrap();
        engine
            .register_force_contribution(Arc::new(ConstantPull::new(1, 1.0)), "pull")
            .unwrap();

        assert_eq!(engine.run(), EXIT_SUCCESS);
        assert_eq!(engine.completed_steps(), 25);
        assert!((engine.positions()[1].x - 3.5).abs() < 1e-9);
        assert_eq!(engine.positions()[0], Vec3::ZERO);
        assert_eq!(engine.energy(), 1.0);
    }

    #[test]
    fn test_stop_flag_halts_at_next_step() {
        let mut engine = ReferenceEngine::from_descriptor(&descriptor(100, 1)).unwrap();
        let signals = engine.signals();
        engine
            .register_force_contribution(
                Arc::new(StopAt {
                    step: 7,
                    signals: Arc::clone(&signals),
                }),
                "stopper",
            )
            .unwrap();

        assert_eq!(engine.run(), EXIT_SUCCESS);
        assert_eq!(engine.completed_steps(), 7);

        // Flag stays set, so a further run does no work.
        assert_eq!(engine.run(), EXIT_SUCCESS);
        assert_eq!(engine.completed_steps(), 7);
    }

    #[test]
    fn test_parallel_matches_serial() {
        let run_with = |threads: usize| {
            let mut engine = ReferenceEngine::from_descriptor(
                &descriptor(10, threads).with_option("particles", "4"),
            )
            .unwrap();
            for particle in 0..4 {
                engine
                    .register_force_contribution(
                        Arc::new(ConstantPull::new(particle, particle as f64)),
                        &format!("pull-{}", particle),
                    )
                    .unwrap();
            }
            assert_eq!(engine.run(), EXIT_SUCCESS);
            (engine.positions().to_vec(), engine.energy())
        };

        let (serial, serial_energy) = run_with(1);
        let (parallel, parallel_energy) = run_with(3);

        for (a, b) in serial.iter().zip(&parallel) {
            assert!((*a - *b).norm() < 1e-12);
        }
        assert_eq!(serial_energy, 4.0);
        assert_eq!(parallel_energy, serial_energy);
    }

    #[test]
    fn test_every_provider_called_each_step() {
        let mut engine = ReferenceEngine::from_descriptor(&descriptor(5, 2)).unwrap();
        let first = Arc::new(ConstantPull::new(0, 0.0));
        let second = Arc::new(ConstantPull::new(1, 0.0));
        engine
            .register_force_contribution(first.clone(), "first")
            .unwrap();
        engine
            .register_force_contribution(second.clone(), "second")
            .unwrap();

        engine.run();
        assert_eq!(first.calls.load(Ordering::SeqCst), 5);
        assert_eq!(second.calls.load(Ordering::SeqCst), 5);
        assert_eq!(engine.contributions(), vec!["first", "second"]);
    }

    #[test]
    fn test_register_checks_particle_count() {
        let mut engine = ReferenceEngine::from_descriptor(&descriptor(5, 1)).unwrap();
        let result =
            engine.register_force_contribution(Arc::new(ConstantPull::new(5, 1.0)), "far");
        assert!(matches!(result, Err(SessionError::Engine(_))));
        assert!(engine.contributions().is_empty());
    }

    #[test]
    fn test_unstable_run_fails() {
        let mut engine = ReferenceEngine::from_descriptor(&descriptor(5, 1)).unwrap();
        engine
            .register_force_contribution(Arc::new(Explode), "boom")
            .unwrap();
        assert_eq!(engine.run(), EXIT_UNSTABLE);
        assert_eq!(engine.completed_steps(), 1);
    }

    #[test]
    fn test_terminated_engine_refuses_work() {
        let mut engine = ReferenceEngine::from_descriptor(&descriptor(5, 1)).unwrap();
        engine.terminate().unwrap();
        engine.terminate().unwrap();

        assert_eq!(engine.run(), EXIT_TERMINATED);
        assert!(engine
            .register_force_contribution(Arc::new(Explode), "late")
            .is_err());
    }

    #[test]
    fn test_panicking_provider_fails_run() {
        for threads in [1, 2] {
            let mut engine = ReferenceEngine::from_descriptor(&descriptor(5, threads)).unwrap();
            let pull = Arc::new(ConstantPull::new(1, 1.0));
            engine
                .register_force_contribution(pull.clone(), "pull")
                .unwrap();
            engine
                .register_force_contribution(Arc::new(Panicking), "broken")
                .unwrap();

            assert_eq!(engine.run(), EXIT_FORCE_FAILURE, "threads = {}", threads);
            assert_eq!(engine.completed_steps(), 0);
            assert_eq!(engine.positions()[1], Vec3::new(1.0, 0.0, 0.0));
            assert_eq!(pull.calls.load(Ordering::SeqCst), 1);
        }
    }
}
