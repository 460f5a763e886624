use crate::{PSOConfig, PSOReport, Result, Swarm};
use ndarray::Array1;

/// Runs Particle Swarm Optimization on a function.
///
/// This is a convenience function in the style of the other math-audio
/// optimizers: it validates every input, builds a [`Swarm`] seeded from
/// `config.seed`, runs it for `config.maxiter` iterations and returns the
/// report.
///
/// # Arguments
///
/// * `func` - The objective function to minimize, mapping `&Array1<f64>` to `f64`
/// * `x0` - Shared starting position of every particle
/// * `bounds` - Vector of (lower, upper) bound pairs for each dimension
/// * `config` - PSO configuration (use `PSOConfigBuilder` to construct)
///
/// # Errors
///
/// Returns the first validation error found in `x0`, `bounds` or `config`;
/// in that case the objective is never called.
///
/// # Example
///
/// ```rust
/// use math_audio_particle_swarm::{particle_swarm, PSOConfigBuilder};
/// use ndarray::array;
///
/// let result = particle_swarm(
///     &|x: &ndarray::Array1<f64>| x[0].powi(2) + x[1].powi(2),
///     &array![5.0, 5.0],
///     &[(-10.0, 10.0), (-10.0, 10.0)],
///     PSOConfigBuilder::new().maxiter(50).seed(42).build().unwrap(),
/// ).expect("optimization failed");
///
/// assert!(result.fun < 0.01);
/// ```
pub fn particle_swarm<F>(
    func: &F,
    x0: &Array1<f64>,
    bounds: &[(f64, f64)],
    config: PSOConfig,
) -> Result<PSOReport>
where
    F: Fn(&Array1<f64>) -> f64 + Sync,
{
    let mut swarm = Swarm::initialize(func, x0, bounds, config)?;
    swarm.solve()
}
