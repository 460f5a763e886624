use crate::Coefficients;
use ndarray::{Array1, Zip};
use rand::Rng;

/// Half-width of the interval initial velocities are drawn from.
pub const INITIAL_VELOCITY_SPAN: f64 = 1.0;

/// A position together with the error the objective returned for it.
#[derive(Debug, Clone, PartialEq)]
pub struct BestState {
    /// Position that produced `error`.
    pub position: Array1<f64>,
    /// Objective value at `position`.
    pub error: f64,
}

impl BestState {
    /// Whether `error` should replace this record.
    ///
    /// Only a strictly lower error counts. A NaN record is always replaced so
    /// that one bad evaluation cannot freeze the best state forever.
    pub fn is_improved_by(&self, error: f64) -> bool {
        error < self.error || self.error.is_nan()
    }
}

/// `true` when `error` should become the new best, including the first time.
pub(crate) fn improves(best: Option<&BestState>, error: f64) -> bool {
    best.is_none_or(|b| b.is_improved_by(error))
}

/// One candidate solution of the swarm.
///
/// Both best-state slots use `Option`, so an objective that legitimately
/// returns negative values is never confused with "not evaluated yet".
#[derive(Debug, Clone)]
pub struct Particle {
    position: Array1<f64>,
    velocity: Array1<f64>,
    personal_best: Option<BestState>,
    current_error: Option<f64>,
}

impl Particle {
    /// Places a particle at `x0` with a velocity drawn uniformly in [-1, 1]
    /// for every dimension.
    pub fn new<R: Rng + ?Sized>(x0: &Array1<f64>, rng: &mut R) -> Self {
        let velocity = Array1::from_shape_fn(x0.len(), |_| {
            rng.random_range(-INITIAL_VELOCITY_SPAN..=INITIAL_VELOCITY_SPAN)
        });
        Self::with_velocity(x0.clone(), velocity)
    }

    /// Places a particle at `position` moving with `velocity`.
    ///
    /// # Panics
    ///
    /// Panics if the two vectors have different lengths.
    pub fn with_velocity(position: Array1<f64>, velocity: Array1<f64>) -> Self {
        assert_eq!(
            position.len(),
            velocity.len(),
            "position and velocity must have the same dimension"
        );
        Self {
            position,
            velocity,
            personal_best: None,
            current_error: None,
        }
    }

    /// Number of dimensions.
    pub fn dim(&self) -> usize {
        self.position.len()
    }

    /// Current position.
    pub fn position(&self) -> &Array1<f64> {
        &self.position
    }

    /// Current velocity.
    pub fn velocity(&self) -> &Array1<f64> {
        &self.velocity
    }

    /// Lowest error this particle has reached, with its position.
    pub fn personal_best(&self) -> Option<&BestState> {
        self.personal_best.as_ref()
    }

    /// Error of the most recent evaluation.
    pub fn current_error(&self) -> Option<f64> {
        self.current_error
    }

    /// Calls the objective once on the current position and records the
    /// result as the current error. Nothing else changes.
    pub fn evaluate<F>(&mut self, func: &F) -> f64
    where
        F: Fn(&Array1<f64>) -> f64 + ?Sized,
    {
        let error = func(&self.position);
        self.current_error = Some(error);
        error
    }

    /// Promotes the current position to personal best if it is the first
    /// evaluation or strictly better. Returns whether it was promoted.
    pub fn update_personal_best(&mut self) -> bool {
        let Some(error) = self.current_error else {
            return false;
        };
        if improves(self.personal_best.as_ref(), error) {
            self.personal_best = Some(BestState {
                position: self.position.clone(),
                error,
            });
            true
        } else {
            false
        }
    }

    /// Applies
    /// `v[i] = w v[i] + c1 r1 (pbest[i] - x[i]) + c2 r2 (gbest[i] - x[i])`
    /// with fresh `r1`, `r2` in [0, 1) per dimension, `r1` drawn first.
    ///
    /// Before the first evaluation the personal best is taken to be the
    /// current position, so the cognitive term is zero.
    ///
    /// # Panics
    ///
    /// Panics if `global_best` is shorter than the particle's dimension.
    pub fn update_velocity<R: Rng + ?Sized>(
        &mut self,
        global_best: &Array1<f64>,
        coefficients: &Coefficients,
        rng: &mut R,
    ) {
        let Coefficients {
            inertia,
            cognitive,
            social,
        } = *coefficients;
        let personal = match &self.personal_best {
            Some(best) => &best.position,
            None => &self.position,
        };

        for i in 0..self.velocity.len() {
            let r1: f64 = rng.random::<f64>();
            let r2: f64 = rng.random::<f64>();

            let v_cog = cognitive * r1 * (personal[i] - self.position[i]);
            let v_soc = social * r2 * (global_best[i] - self.position[i]);
            self.velocity[i] = inertia * self.velocity[i] + v_cog + v_soc;
        }
    }

    /// Moves by the current velocity, then clamps every coordinate to
    /// `[lower[i], upper[i]]`.
    ///
    /// The velocity is left untouched by clamping: a particle pushed into a
    /// wall keeps pushing until its attraction terms turn it around.
    ///
    /// # Panics
    ///
    /// Panics if `lower` or `upper` differ in length from the position, or
    /// if some `lower[i] > upper[i]` or either bound is NaN. Bounds checked
    /// by [`Swarm::initialize`](crate::Swarm::initialize) never trigger this.
    pub fn update_position(&mut self, lower: &Array1<f64>, upper: &Array1<f64>) {
        Zip::from(&mut self.position)
            .and(&self.velocity)
            .and(lower)
            .and(upper)
            .for_each(|x, &v, &lo, &hi| *x = (*x + v).clamp(lo, hi));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn sphere(x: &Array1<f64>) -> f64 {
        x.iter().map(|&xi| xi * xi).sum()
    }

    #[test]
    fn test_new_velocity_in_unit_box() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let p = Particle::new(&array![5.0, -3.0, 0.0], &mut rng);
            assert_eq!(p.position(), &array![5.0, -3.0, 0.0]);
            assert!(p.velocity().iter().all(|v| (-1.0..=1.0).contains(v)));
            assert!(p.personal_best().is_none());
            assert!(p.current_error().is_none());
        }
    }

    #[test]
    fn test_evaluate_only_records_error() {
        let mut p = Particle::with_velocity(array![1.0, 2.0], array![0.5, 0.5]);
        let err = p.evaluate(&sphere);

        assert_relative_eq!(err, 5.0);
        assert_eq!(p.current_error(), Some(5.0));
        assert!(p.personal_best().is_none());
        assert_eq!(p.position(), &array![1.0, 2.0]);
        assert_eq!(p.velocity(), &array![0.5, 0.5]);
    }

    #[test]
    fn test_personal_best_accepts_negative_first_error() {
        let mut p = Particle::with_velocity(array![0.0], array![0.0]);
        p.evaluate(&|_: &Array1<f64>| -1.0);
        assert!(p.update_personal_best());
        assert_eq!(p.personal_best().map(|b| b.error), Some(-1.0));

        // Equal error is not an improvement.
        p.evaluate(&|_: &Array1<f64>| -1.0);
        assert!(!p.update_personal_best());

        p.evaluate(&|_: &Array1<f64>| -2.5);
        assert!(p.update_personal_best());
        assert_eq!(p.personal_best().map(|b| b.error), Some(-2.5));
    }

    #[test]
    fn test_nan_personal_best_is_replaced() {
        let mut p = Particle::with_velocity(array![0.0], array![0.0]);
        p.evaluate(&|_: &Array1<f64>| f64::NAN);
        assert!(p.update_personal_best());
        p.evaluate(&|_: &Array1<f64>| 3.0);
        assert!(p.update_personal_best());
        assert_eq!(p.personal_best().map(|b| b.error), Some(3.0));
    }

    #[test]
    fn test_velocity_update_zero_coefficients() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut p = Particle::with_velocity(array![1.0, -1.0], array![0.7, -0.3]);
        p.evaluate(&sphere);
        p.update_personal_best();

        let zero = Coefficients {
            inertia: 0.0,
            cognitive: 0.0,
            social: 0.0,
        };
        p.update_velocity(&array![4.0, 4.0], &zero, &mut rng);
        assert_eq!(p.velocity(), &array![0.0, 0.0]);
    }

    #[test]
    fn test_velocity_update_inertia_only() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut p = Particle::with_velocity(array![1.0, -1.0], array![0.8, -0.4]);
        let coeffs = Coefficients {
            inertia: 0.5,
            cognitive: 0.0,
            social: 0.0,
        };
        p.update_velocity(&array![0.0, 0.0], &coeffs, &mut rng);
        assert_relative_eq!(p.velocity()[0], 0.4);
        assert_relative_eq!(p.velocity()[1], -0.2);
    }

    #[test]
    fn test_velocity_points_towards_global_best() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut p = Particle::with_velocity(array![2.0], array![0.0]);
        p.evaluate(&sphere);
        p.update_personal_best();

        let coeffs = Coefficients {
            inertia: 0.0,
            cognitive: 1.0,
            social: 2.0,
        };
        p.update_velocity(&array![-2.0], &coeffs, &mut rng);
        // pbest == x, so only the social pull remains: v = 2 r2 (-4) in (-8, 0].
        assert!(p.velocity()[0] <= 0.0 && p.velocity()[0] > -8.0);
    }

    #[test]
    fn test_update_position_clamps_without_touching_velocity() {
        let lower = array![-1.0, -1.0];
        let upper = array![1.0, 1.0];
        let mut p = Particle::with_velocity(array![0.5, -0.5], array![2.0, -2.0]);

        p.update_position(&lower, &upper);
        assert_eq!(p.position(), &array![1.0, -1.0]);
        assert_eq!(p.velocity(), &array![2.0, -2.0]);

        // Still pinned on the next move.
        p.update_position(&lower, &upper);
        assert_eq!(p.position(), &array![1.0, -1.0]);
    }

    #[test]
    fn test_update_position_inside_bounds() {
        let mut p = Particle::with_velocity(array![0.0, 0.0], array![0.25, -0.5]);
        p.update_position(&array![-10.0, -10.0], &array![10.0, 10.0]);
        assert_relative_eq!(p.position()[0], 0.25);
        assert_relative_eq!(p.position()[1], -0.5);
    }

    #[test]
    #[should_panic]
    fn test_update_position_panics_on_inverted_bounds() {
        let mut p = Particle::with_velocity(array![0.0], array![0.1]);
        p.update_position(&array![1.0], &array![-1.0]);
    }

    #[test]
    #[should_panic]
    fn test_update_position_panics_on_length_mismatch() {
        let mut p = Particle::with_velocity(array![0.0, 0.0], array![0.1, 0.1]);
        p.update_position(&array![-1.0], &array![1.0]);
    }
}
