//! Particle Swarm Optimization library.
//!
//! This crate provides a Rust implementation of the classic global-best
//! Particle Swarm Optimizer (PSO): a population of particles moves through a
//! box-bounded search space, each one pulled towards the best position it
//! has seen and towards the best position the whole swarm has seen.
//!
//! # Features
//!
//! - Explicit `Particle` / `Swarm` types with `initialize`, `step` and `run`
//! - Seedable, injectable random generator for reproducible runs
//! - Parallel evaluation phase (rayon) with a deterministic commit order
//! - Per-iteration callback and CSV convergence recorder
//!
//! # Example
//!
//! ```rust
//! use math_audio_particle_swarm::{particle_swarm, PSOConfigBuilder};
//! use ndarray::array;
//!
//! // Minimize the sphere function: f(x) = sum(x_i^2)
//! let bounds = vec![(-10.0, 10.0), (-10.0, 10.0)];
//! let config = PSOConfigBuilder::new()
//!     .maxiter(30)
//!     .particles(15)
//!     .seed(42)
//!     .build()
//!     .expect("invalid config");
//!
//! let result = particle_swarm(
//!     &|x: &ndarray::Array1<f64>| x.iter().map(|&xi| xi * xi).sum::<f64>(),
//!     &array![5.0, 5.0],
//!     &bounds,
//!     config,
//! ).expect("optimization should succeed");
//!
//! assert!(result.fun < 1e-2);
//! ```
#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

pub mod error;
pub use error::{PSOError, Result};

use std::fmt;

use ndarray::{Array1, Array2};

/// Velocity and position update rules for a single candidate.
pub mod particle;
/// Swarm state and the two-phase optimization step.
pub mod swarm;

/// Count-based driver for repeated swarm steps.
pub mod iteration_controller;
/// One-call entry point mirroring the other math-audio optimizers.
pub mod particle_swarm;

/// Parallel evaluation phase support.
pub mod parallel_eval;

/// Registry of standard benchmark objectives.
pub mod function_registry;
/// Per-iteration convergence recording.
pub mod recorder;

pub use iteration_controller::IterationController;
pub use parallel_eval::ParallelConfig;
pub use particle::{BestState, Particle};
pub use particle_swarm::particle_swarm;
pub use recorder::{
    ConvergenceRecorder, IterationRecord, run_recorded_particle_swarm,
    run_recorded_particle_swarm_in,
};
pub use swarm::Swarm;

/// Callback function type, invoked once per completed step.
pub type CallbackFn = Box<dyn FnMut(&PSOIntermediate)>;

/// Weights of the three velocity terms.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coefficients {
    /// Fraction of the previous velocity retained (w).
    pub inertia: f64,
    /// Pull towards the particle's own best position (c1).
    pub cognitive: f64,
    /// Pull towards the swarm's best position (c2).
    pub social: f64,
}

impl Default for Coefficients {
    fn default() -> Self {
        Self {
            inertia: 0.5,
            cognitive: 1.0,
            social: 2.0,
        }
    }
}

impl Coefficients {
    /// Rejects NaN or infinite weights.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("inertia", self.inertia),
            ("cognitive", self.cognitive),
            ("social", self.social),
        ] {
            if !value.is_finite() {
                return Err(PSOError::InvalidCoefficient { name, value });
            }
        }
        Ok(())
    }
}

/// Configuration for the Particle Swarm optimizer.
///
/// Termination is purely count based: there is no tolerance and no way to
/// stop a run early.
pub struct PSOConfig {
    /// Iteration budget handed to [`Swarm::run`].
    pub maxiter: usize,
    /// Number of particles in the swarm.
    pub particles: usize,
    /// Velocity update weights.
    pub coefficients: Coefficients,
    /// Optional random seed for reproducibility.
    pub seed: Option<u64>,
    /// Log progress at `info` level instead of `debug`.
    pub disp: bool,
    /// Optional per-iteration observer.
    pub callback: Option<CallbackFn>,
    /// Parallel evaluation configuration.
    pub parallel: ParallelConfig,
}

impl Default for PSOConfig {
    fn default() -> Self {
        Self {
            maxiter: 30,
            particles: 15,
            coefficients: Coefficients::default(),
            seed: None,
            disp: false,
            callback: None,
            parallel: ParallelConfig::default(),
        }
    }
}

impl fmt::Debug for PSOConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PSOConfig")
            .field("maxiter", &self.maxiter)
            .field("particles", &self.particles)
            .field("coefficients", &self.coefficients)
            .field("seed", &self.seed)
            .field("disp", &self.disp)
            .field("callback", &self.callback.is_some())
            .field("parallel", &self.parallel)
            .finish()
    }
}

impl PSOConfig {
    /// Checks particle count, iteration budget and coefficients.
    pub fn validate(&self) -> Result<()> {
        if self.particles < 1 {
            return Err(PSOError::InvalidParticleCount {
                count: self.particles,
            });
        }
        if self.maxiter < 1 {
            return Err(PSOError::InvalidIterationBudget {
                maxiter: self.maxiter,
            });
        }
        self.coefficients.validate()
    }
}

/// Fluent builder for `PSOConfig`.
///
/// # Example
///
/// ```rust
/// use math_audio_particle_swarm::PSOConfigBuilder;
///
/// let config = PSOConfigBuilder::new()
///     .maxiter(200)
///     .particles(40)
///     .inertia(0.7)
///     .cognitive(1.5)
///     .social(1.5)
///     .seed(42)
///     .build();
/// assert!(config.is_ok());
/// ```
pub struct PSOConfigBuilder {
    cfg: PSOConfig,
}

impl Default for PSOConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PSOConfigBuilder {
    /// Creates a new builder with default configuration.
    pub fn new() -> Self {
        Self {
            cfg: PSOConfig::default(),
        }
    }
    /// Sets the iteration budget.
    pub fn maxiter(mut self, v: usize) -> Self {
        self.cfg.maxiter = v;
        self
    }
    /// Sets the number of particles.
    pub fn particles(mut self, v: usize) -> Self {
        self.cfg.particles = v;
        self
    }
    /// Sets all three update weights at once.
    pub fn coefficients(mut self, v: Coefficients) -> Self {
        self.cfg.coefficients = v;
        self
    }
    /// Sets the inertia weight (w).
    pub fn inertia(mut self, v: f64) -> Self {
        self.cfg.coefficients.inertia = v;
        self
    }
    /// Sets the cognitive constant (c1).
    pub fn cognitive(mut self, v: f64) -> Self {
        self.cfg.coefficients.cognitive = v;
        self
    }
    /// Sets the social constant (c2).
    pub fn social(mut self, v: f64) -> Self {
        self.cfg.coefficients.social = v;
        self
    }
    /// Sets the random seed for reproducibility.
    pub fn seed(mut self, v: u64) -> Self {
        self.cfg.seed = Some(v);
        self
    }
    /// Enables/disables progress display.
    pub fn disp(mut self, v: bool) -> Self {
        self.cfg.disp = v;
        self
    }
    /// Sets a per-iteration callback function.
    pub fn callback(mut self, cb: CallbackFn) -> Self {
        self.cfg.callback = Some(cb);
        self
    }
    /// Sets the parallel evaluation configuration.
    pub fn parallel(mut self, parallel: ParallelConfig) -> Self {
        self.cfg.parallel = parallel;
        self
    }
    /// Enables/disables parallel evaluation.
    pub fn enable_parallel(mut self, enable: bool) -> Self {
        self.cfg.parallel.enabled = enable;
        self
    }
    /// Sets the number of parallel threads.
    pub fn parallel_threads(mut self, num_threads: usize) -> Self {
        self.cfg.parallel.num_threads = Some(num_threads);
        self
    }
    /// Builds and returns the configuration.
    ///
    /// # Errors
    ///
    /// Returns `PSOError::InvalidParticleCount` if `particles < 1`,
    /// `PSOError::InvalidIterationBudget` if `maxiter < 1` and
    /// `PSOError::InvalidCoefficient` for a non-finite weight.
    pub fn build(self) -> Result<PSOConfig> {
        self.cfg.validate()?;
        Ok(self.cfg)
    }
}

/// Result of a PSO run.
#[derive(Clone)]
pub struct PSOReport {
    /// Best position found by any particle.
    pub x: Array1<f64>,
    /// Objective value at `x`.
    pub fun: f64,
    /// Final value of the iteration counter.
    pub nit: usize,
    /// Number of objective evaluations performed.
    pub nfev: usize,
    /// Human-readable status message.
    pub message: String,
    /// Final particle positions (N x D).
    pub positions: Array2<f64>,
    /// Error of each particle at its last evaluation.
    pub errors: Array1<f64>,
}

impl fmt::Debug for PSOReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PSOReport")
            .field("x", &format!("len={}", self.x.len()))
            .field("fun", &self.fun)
            .field("nit", &self.nit)
            .field("nfev", &self.nfev)
            .field("message", &self.message)
            .field(
                "positions",
                &format!("{}x{}", self.positions.nrows(), self.positions.ncols()),
            )
            .field("errors", &format!("len={}", self.errors.len()))
            .finish()
    }
}

/// Information passed to the callback after each step.
pub struct PSOIntermediate {
    /// Current global best position.
    pub x: Array1<f64>,
    /// Current global best error.
    pub fun: f64,
    /// Mean of the errors evaluated during this step.
    pub mean_error: f64,
    /// Iteration counter after the step.
    pub iter: usize,
}
