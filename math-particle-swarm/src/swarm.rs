use crate::iteration_controller::IterationController;
use crate::parallel_eval::{configure_thread_pool, evaluate_particles};
use crate::particle::{BestState, Particle, improves};
use crate::{PSOConfig, PSOError, PSOIntermediate, PSOReport, Result};
use log::Level;
use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// A fixed population of particles plus the swarm-wide best state.
///
/// Create one with [`Swarm::initialize`] (seeded from the config) or
/// [`Swarm::initialize_with_rng`] (any injected generator), then advance it
/// with [`step`](Self::step) or drive it to the end with [`run`](Self::run).
pub struct Swarm<'a, F, R = StdRng>
where
    F: Fn(&Array1<f64>) -> f64 + Sync,
    R: Rng,
{
    func: &'a F,
    particles: Vec<Particle>,
    global_best: Option<BestState>,
    lower: Array1<f64>,
    upper: Array1<f64>,
    iteration: usize,
    nfev: usize,
    config: PSOConfig,
    rng: R,
}

impl<'a, F> Swarm<'a, F, StdRng>
where
    F: Fn(&Array1<f64>) -> f64 + Sync,
{
    /// Creates `config.particles` particles at `x0`, using a `StdRng` seeded
    /// from `config.seed` (or from the thread RNG when no seed is set).
    ///
    /// # Errors
    ///
    /// See [`Swarm::initialize_with_rng`].
    pub fn initialize(
        func: &'a F,
        x0: &Array1<f64>,
        bounds: &[(f64, f64)],
        config: PSOConfig,
    ) -> Result<Self> {
        let rng: StdRng = match config.seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => {
                let mut thread_rng = rand::rng();
                StdRng::from_rng(&mut thread_rng)
            }
        };
        Self::initialize_with_rng(func, x0, bounds, config, rng)
    }
}

impl<'a, F, R> Swarm<'a, F, R>
where
    F: Fn(&Array1<f64>) -> f64 + Sync,
    R: Rng,
{
    /// Validates the inputs, then creates `config.particles` particles at
    /// `x0`, each with its own random velocity drawn from `rng`.
    ///
    /// No particle is created and the objective is never called when any
    /// input is invalid.
    ///
    /// # Errors
    ///
    /// Returns `PSOError::InvalidDimension` if `x0` and `bounds` differ in length,
    /// `PSOError::EmptySearchSpace` if both are empty,
    /// `PSOError::InvalidBounds` if some lower bound exceeds its upper bound,
    /// `PSOError::InvalidInitialPosition` if `x0` holds a NaN or infinity,
    /// and the errors of [`PSOConfig::validate`].
    pub fn initialize_with_rng(
        func: &'a F,
        x0: &Array1<f64>,
        bounds: &[(f64, f64)],
        config: PSOConfig,
        mut rng: R,
    ) -> Result<Self> {
        if x0.len() != bounds.len() {
            return Err(PSOError::InvalidDimension {
                expected: bounds.len(),
                got: x0.len(),
            });
        }
        if bounds.is_empty() {
            return Err(PSOError::EmptySearchSpace);
        }

        let n = bounds.len();
        let mut lower = Array1::<f64>::zeros(n);
        let mut upper = Array1::<f64>::zeros(n);
        for (i, &(lo, hi)) in bounds.iter().enumerate() {
            // Negated so that NaN bounds are rejected as well.
            if !(lo <= hi) {
                return Err(PSOError::InvalidBounds {
                    index: i,
                    lower: lo,
                    upper: hi,
                });
            }
            lower[i] = lo;
            upper[i] = hi;
        }
        if let Some((index, &value)) = x0.iter().enumerate().find(|(_, v)| !v.is_finite()) {
            return Err(PSOError::InvalidInitialPosition { index, value });
        }
        config.validate()?;

        let outside = (0..n).filter(|&i| !(lower[i]..=upper[i]).contains(&x0[i])).count();
        if outside > 0 {
            log::warn!(
                "PSO: initial position lies outside the bounds in {} dimension(s); \
                 it is evaluated as given and clamped on the first move",
                outside
            );
        }

        configure_thread_pool(&config.parallel);

        let particles: Vec<Particle> = (0..config.particles)
            .map(|_| Particle::new(x0, &mut rng))
            .collect();

        log::log!(
            progress_level(config.disp),
            "PSO init: {} dimensions, particles={}, maxiter={}, w={}, c1={}, c2={}",
            n,
            config.particles,
            config.maxiter,
            config.coefficients.inertia,
            config.coefficients.cognitive,
            config.coefficients.social
        );

        Ok(Self {
            func,
            particles,
            global_best: None,
            lower,
            upper,
            iteration: 0,
            nfev: 0,
            config,
            rng,
        })
    }

    /// Performs one optimization step.
    ///
    /// 1. Evaluation: every particle is evaluated once, then personal and
    ///    global bests are committed in particle order.
    /// 2. Motion: every particle updates its velocity against the global best
    ///    committed in phase 1 of this same step, then moves and is clamped.
    ///
    /// Phase 2 never starts before phase 1 has been fully committed, even
    /// when evaluation runs in parallel. The iteration counter is then
    /// incremented.
    pub fn step(&mut self) {
        let errors = evaluate_particles(&mut self.particles, self.func, &self.config.parallel);
        self.nfev += errors.len();

        let mut personal_improvements = 0usize;
        let mut global_improved = false;
        for (particle, &error) in self.particles.iter_mut().zip(&errors) {
            if particle.update_personal_best() {
                personal_improvements += 1;
            }
            if improves(self.global_best.as_ref(), error) {
                self.global_best = Some(BestState {
                    position: particle.position().clone(),
                    error,
                });
                global_improved = true;
            }
        }

        if let Some(best) = &self.global_best {
            for particle in self.particles.iter_mut() {
                particle.update_velocity(&best.position, &self.config.coefficients, &mut self.rng);
                particle.update_position(&self.lower, &self.upper);
            }
        }

        self.iteration += 1;

        let mean_error = errors.iter().sum::<f64>() / errors.len().max(1) as f64;
        if let Some(best) = &self.global_best {
            log::log!(
                progress_level(self.config.disp),
                "PSO iter {:4}  best_f={:.6e}  mean_f={:.6e}  improved={}/{}{}",
                self.iteration,
                best.error,
                mean_error,
                personal_improvements,
                self.particles.len(),
                if global_improved { "  *" } else { "" }
            );

            if let Some(ref mut cb) = self.config.callback {
                let intermediate = PSOIntermediate {
                    x: best.position.clone(),
                    fun: best.error,
                    mean_error,
                    iter: self.iteration,
                };
                cb(&intermediate);
            }
        }
    }

    /// Steps the swarm until the iteration counter exceeds `maxiter` and
    /// returns the global best position and error.
    ///
    /// The bound is checked after each step, so a fresh swarm performs
    /// `maxiter + 1` steps and ends with `iteration() == maxiter + 1`.
    ///
    /// # Errors
    ///
    /// Returns `PSOError::InvalidIterationBudget` if `maxiter < 1`, before any
    /// step is taken.
    pub fn run(&mut self, maxiter: usize) -> Result<(Array1<f64>, f64)> {
        let controller = IterationController::new(maxiter)?;
        controller.drive(self);

        log::log!(
            progress_level(self.config.disp),
            "PSO finished after {} iterations ({} evaluations)",
            self.iteration,
            self.nfev
        );

        match &self.global_best {
            Some(best) => Ok((best.position.clone(), best.error)),
            None => Err(PSOError::InvalidParticleCount {
                count: self.particles.len(),
            }),
        }
    }

    /// Runs with the configured budget and returns a full report.
    pub fn solve(&mut self) -> Result<PSOReport> {
        let (x, fun) = self.run(self.config.maxiter)?;
        Ok(self.finish_report(x, fun))
    }

    fn finish_report(&self, x: Array1<f64>, fun: f64) -> PSOReport {
        let n = self.particles.len();
        let d = self.lower.len();
        let positions = Array2::from_shape_fn((n, d), |(i, j)| self.particles[i].position()[j]);
        let errors = Array1::from_iter(
            self.particles
                .iter()
                .map(|p| p.current_error().unwrap_or(f64::NAN)),
        );
        PSOReport {
            x,
            fun,
            nit: self.iteration,
            nfev: self.nfev,
            message: format!("Iteration budget exhausted after {} steps", self.iteration),
            positions,
            errors,
        }
    }

    /// The particles, in creation order.
    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    /// Best position and error seen so far, unset before the first step.
    pub fn global_best(&self) -> Option<&BestState> {
        self.global_best.as_ref()
    }

    /// Number of completed steps.
    pub fn iteration(&self) -> usize {
        self.iteration
    }

    /// Number of objective evaluations so far.
    pub fn nfev(&self) -> usize {
        self.nfev
    }

    /// Number of dimensions.
    pub fn dim(&self) -> usize {
        self.lower.len()
    }

    /// Lower and upper bound vectors.
    pub fn bounds(&self) -> (&Array1<f64>, &Array1<f64>) {
        (&self.lower, &self.upper)
    }

    /// The configuration the swarm was created with.
    pub fn config(&self) -> &PSOConfig {
        &self.config
    }
}

fn progress_level(disp: bool) -> Level {
    if disp { Level::Info } else { Level::Debug }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Coefficients, PSOConfigBuilder};
    use approx::assert_relative_eq;
    use ndarray::array;
    use std::cell::Cell;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn sphere(x: &Array1<f64>) -> f64 {
        x.iter().map(|&xi| xi * xi).sum()
    }

    fn config(particles: usize, seed: u64) -> PSOConfig {
        PSOConfigBuilder::new()
            .particles(particles)
            .seed(seed)
            .build()
            .expect("valid config")
    }

    #[test]
    fn test_initialize_shares_start_position() {
        let swarm = Swarm::initialize(
            &sphere,
            &array![5.0, 5.0],
            &[(-10.0, 10.0), (-10.0, 10.0)],
            config(15, 42),
        )
        .unwrap();

        assert_eq!(swarm.particles().len(), 15);
        assert_eq!(swarm.iteration(), 0);
        assert_eq!(swarm.nfev(), 0);
        assert!(swarm.global_best().is_none());
        for p in swarm.particles() {
            assert_eq!(p.position(), &array![5.0, 5.0]);
            assert!(p.velocity().iter().all(|v| v.abs() <= 1.0));
        }
    }

    #[test]
    fn test_initialize_dimension_mismatch() {
        let err = Swarm::initialize(&sphere, &array![1.0, 2.0, 3.0], &[(-1.0, 1.0)], config(3, 0))
            .err()
            .unwrap();
        assert_eq!(
            err,
            PSOError::InvalidDimension {
                expected: 1,
                got: 3
            }
        );
    }

    #[test]
    fn test_initialize_rejects_inverted_and_nan_bounds() {
        let err = Swarm::initialize(
            &sphere,
            &array![0.0, 0.0],
            &[(-1.0, 1.0), (2.0, 1.0)],
            config(3, 0),
        )
        .err()
        .unwrap();
        assert!(err.is_bounds_error());

        let err = Swarm::initialize(&sphere, &array![0.0], &[(f64::NAN, 1.0)], config(3, 0))
            .err()
            .unwrap();
        assert!(matches!(err, PSOError::InvalidBounds { index: 0, .. }));
    }

    #[test]
    fn test_initialize_rejects_non_finite_start() {
        let err = Swarm::initialize(
            &sphere,
            &array![f64::NAN, 0.0],
            &[(-1.0, 1.0), (-1.0, 1.0)],
            config(3, 0),
        )
        .err()
        .unwrap();
        assert!(err.is_initial_position_error());
        assert!(matches!(
            err,
            PSOError::InvalidInitialPosition { index: 0, value } if value.is_nan()
        ));

        let err = Swarm::initialize(
            &sphere,
            &array![0.0, f64::NEG_INFINITY],
            &[(-1.0, 1.0), (-1.0, 1.0)],
            config(3, 0),
        )
        .err()
        .unwrap();
        assert_eq!(
            err,
            PSOError::InvalidInitialPosition {
                index: 1,
                value: f64::NEG_INFINITY
            }
        );

        // Finite but outside the box is still accepted.
        assert!(
            Swarm::initialize(&sphere, &array![5.0, 0.0], &[(-1.0, 1.0); 2], config(3, 0))
                .is_ok()
        );
    }

    #[test]
    fn test_motion_follows_best_found_in_same_step() {
        let coefficients = Coefficients {
            inertia: 0.0,
            cognitive: 0.0,
            social: 1.0,
        };
        let cfg = PSOConfigBuilder::new()
            .particles(2)
            .seed(8)
            .coefficients(coefficients)
            .enable_parallel(false)
            .build()
            .unwrap();
        let mut swarm =
            Swarm::initialize(&sphere, &array![5.0], &[(-10.0, 10.0)], cfg).unwrap();

        // State left behind by an earlier step: best at 5.0, second particle
        // now sitting on a better spot that is only found in the next step.
        swarm.global_best = Some(BestState {
            position: array![5.0],
            error: 25.0,
        });
        swarm.particles[0] = Particle::with_velocity(array![5.0], array![0.0]);
        swarm.particles[1] = Particle::with_velocity(array![1.0], array![0.0]);

        swarm.step();

        let best = swarm.global_best().unwrap();
        assert_eq!(best.position, array![1.0]);
        assert_relative_eq!(best.error, 1.0);

        // v = r2 * (gbest - x): zero against the stale best, negative against
        // the one committed in this step.
        let leader = &swarm.particles()[1];
        assert_eq!(leader.velocity()[0], 0.0);
        assert_eq!(leader.position()[0], 1.0);

        let follower = &swarm.particles()[0];
        let v = follower.velocity()[0];
        assert!(v < 0.0 && v >= -4.0, "velocity {v} should pull towards 1.0");
        assert_relative_eq!(follower.position()[0], 5.0 + v);
    }

    #[test]
    fn test_initialize_rejects_zero_particles_without_evaluating() {
        let calls = AtomicUsize::new(0);
        let counting = |x: &Array1<f64>| {
            calls.fetch_add(1, Ordering::Relaxed);
            sphere(x)
        };
        let cfg = PSOConfig {
            particles: 0,
            ..PSOConfig::default()
        };
        let err = Swarm::initialize(&counting, &array![0.0], &[(-1.0, 1.0)], cfg)
            .err()
            .unwrap();
        assert_eq!(err, PSOError::InvalidParticleCount { count: 0 });
        assert_eq!(calls.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_initialize_rejects_empty_search_space() {
        let empty: Array1<f64> = Array1::zeros(0);
        let err = Swarm::initialize(&sphere, &empty, &[], config(3, 0))
            .err()
            .unwrap();
        assert_eq!(err, PSOError::EmptySearchSpace);
    }

    #[test]
    fn test_first_step_sets_bests() {
        let mut swarm = Swarm::initialize(
            &sphere,
            &array![3.0, -4.0],
            &[(-10.0, 10.0), (-10.0, 10.0)],
            config(5, 9),
        )
        .unwrap();
        swarm.step();

        assert_eq!(swarm.iteration(), 1);
        assert_eq!(swarm.nfev(), 5);
        let best = swarm.global_best().expect("set after one step");
        assert_relative_eq!(best.error, 25.0);
        assert_eq!(best.position, array![3.0, -4.0]);
        for p in swarm.particles() {
            assert_eq!(p.personal_best().map(|b| b.error), Some(25.0));
        }
    }

    #[test]
    fn test_negative_objective_values() {
        let shifted = |x: &Array1<f64>| sphere(x) - 100.0;
        let mut swarm = Swarm::initialize(
            &shifted,
            &array![1.0, 1.0],
            &[(-5.0, 5.0), (-5.0, 5.0)],
            config(8, 3),
        )
        .unwrap();
        let (_, fun) = swarm.run(20).unwrap();
        assert!(fun <= -98.0, "best error {} should be close to -100", fun);
    }

    #[test]
    fn test_run_step_count() {
        let mut swarm = Swarm::initialize(
            &sphere,
            &array![1.0],
            &[(-2.0, 2.0)],
            config(4, 11),
        )
        .unwrap();
        swarm.run(10).unwrap();
        assert_eq!(swarm.iteration(), 11);
        assert_eq!(swarm.nfev(), 44);
    }

    #[test]
    fn test_run_rejects_zero_budget_before_stepping() {
        let mut swarm =
            Swarm::initialize(&sphere, &array![1.0], &[(-2.0, 2.0)], config(4, 11)).unwrap();
        let err = swarm.run(0).unwrap_err();
        assert_eq!(err, PSOError::InvalidIterationBudget { maxiter: 0 });
        assert_eq!(swarm.iteration(), 0);
        assert_eq!(swarm.nfev(), 0);
    }

    #[test]
    fn test_same_seed_same_result() {
        let bounds = [(-10.0, 10.0), (-10.0, 10.0)];
        let run = |parallel: bool| {
            let cfg = PSOConfigBuilder::new()
                .particles(15)
                .seed(1234)
                .enable_parallel(parallel)
                .build()
                .unwrap();
            let mut swarm = Swarm::initialize(&sphere, &array![5.0, 5.0], &bounds, cfg).unwrap();
            swarm.run(30).unwrap()
        };

        let (x_seq, f_seq) = run(false);
        let (x_par, f_par) = run(true);
        assert_eq!(x_seq, x_par);
        assert_eq!(f_seq, f_par);
    }

    #[test]
    fn test_injected_rng() {
        let cfg = PSOConfig {
            coefficients: Coefficients::default(),
            ..PSOConfig::default()
        };
        let rng = StdRng::seed_from_u64(5);
        let mut swarm =
            Swarm::initialize_with_rng(&sphere, &array![2.0, 2.0], &[(-3.0, 3.0); 2], cfg, rng)
                .unwrap();
        swarm.step();
        assert_eq!(swarm.iteration(), 1);
    }

    #[test]
    fn test_solve_report() {
        let cfg = PSOConfigBuilder::new()
            .maxiter(30)
            .particles(15)
            .seed(42)
            .build()
            .unwrap();
        let mut swarm = Swarm::initialize(
            &sphere,
            &array![5.0, 5.0],
            &[(-10.0, 10.0), (-10.0, 10.0)],
            cfg,
        )
        .unwrap();
        let report = swarm.solve().unwrap();

        assert_eq!(report.nit, 31);
        assert_eq!(report.nfev, 31 * 15);
        assert_eq!(report.positions.dim(), (15, 2));
        assert_eq!(report.errors.len(), 15);
        assert!(report.fun < 1e-2, "f={}", report.fun);
    }

    #[test]
    fn test_callback_sees_every_step() {
        use std::rc::Rc;
        let seen = Rc::new(Cell::new(0usize));
        let seen_cb = seen.clone();
        let cfg = PSOConfigBuilder::new()
            .particles(6)
            .seed(2)
            .callback(Box::new(move |inter| {
                seen_cb.set(seen_cb.get() + 1);
                assert_eq!(inter.iter, seen_cb.get());
            }))
            .build()
            .unwrap();
        let mut swarm =
            Swarm::initialize(&sphere, &array![1.0, 1.0], &[(-2.0, 2.0); 2], cfg).unwrap();
        swarm.run(5).unwrap();
        assert_eq!(seen.get(), 6);
    }
}
