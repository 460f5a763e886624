use crate::particle::Particle;
use ndarray::Array1;
use rayon::prelude::*;

/// Parallel evaluation configuration
#[derive(Debug, Clone)]
pub struct ParallelConfig {
    /// Enable parallel evaluation
    pub enabled: bool,
    /// Number of threads to use (None = use rayon default)
    pub num_threads: Option<usize>,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            num_threads: None, // Use rayon's default (typically num_cpus)
        }
    }
}

/// Below this many particles the evaluation phase always runs sequentially.
pub const MIN_PARALLEL_PARTICLES: usize = 4;

/// Configures the global rayon pool once if a thread count was requested.
pub fn configure_thread_pool(config: &ParallelConfig) {
    if let Some(n) = config.num_threads
        && let Err(e) = rayon::ThreadPoolBuilder::new()
            .num_threads(n)
            .build_global()
    {
        log::debug!("rayon global pool already configured: {}", e);
    }
}

/// Evaluate every particle at its current position
///
/// Each particle records its own current error; the returned vector holds
/// the same errors in particle order. The objective is called exactly once
/// per particle. Best-state bookkeeping is left to the caller so that it can
/// be committed in a fixed order after all evaluations have finished.
///
/// # Arguments
/// * `particles` - Particles to evaluate
/// * `eval_fn` - Objective function
/// * `config` - Parallel configuration
pub fn evaluate_particles<F>(
    particles: &mut [Particle],
    eval_fn: &F,
    config: &ParallelConfig,
) -> Vec<f64>
where
    F: Fn(&Array1<f64>) -> f64 + Sync,
{
    if !config.enabled || particles.len() < MIN_PARALLEL_PARTICLES {
        return particles.iter_mut().map(|p| p.evaluate(eval_fn)).collect();
    }

    // Always use global thread pool (configured once in the swarm)
    particles
        .par_iter_mut()
        .map(|p| p.evaluate(eval_fn))
        .collect()
}
