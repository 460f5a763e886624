use crate::swarm::Swarm;
use crate::{PSOError, Result};
use ndarray::Array1;
use rand::Rng;

/// Owns the iteration budget of a run and nothing else.
///
/// Termination is decided by the swarm's iteration counter alone. The bound
/// is checked only after a step has completed, so the step that pushes the
/// counter past `max_iterations` is still fully executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IterationController {
    max_iterations: usize,
}

impl IterationController {
    /// # Errors
    ///
    /// Returns `PSOError::InvalidIterationBudget` if `max_iterations < 1`.
    pub fn new(max_iterations: usize) -> Result<Self> {
        if max_iterations < 1 {
            return Err(PSOError::InvalidIterationBudget {
                maxiter: max_iterations,
            });
        }
        Ok(Self { max_iterations })
    }

    /// The iteration budget.
    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    /// Whether another step is due after the counter reached `iteration`.
    pub fn should_continue(&self, iteration: usize) -> bool {
        iteration <= self.max_iterations
    }

    /// Steps `swarm` until the counter exceeds the budget; always takes at
    /// least one step. Returns the number of steps taken.
    pub fn drive<F, R>(&self, swarm: &mut Swarm<'_, F, R>) -> usize
    where
        F: Fn(&Array1<f64>) -> f64 + Sync,
        R: Rng,
    {
        let mut steps = 0;
        loop {
            swarm.step();
            steps += 1;
            if !self.should_continue(swarm.iteration()) {
                break;
            }
        }
        steps
    }
}
