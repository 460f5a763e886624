//! Error types for the Particle Swarm optimizer.
//!
//! Every variant describes caller misuse detected before the first particle
//! moves. Nothing in the optimization loop itself can fail.

use thiserror::Error;

/// Errors that can occur while setting up a Particle Swarm optimization.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PSOError {
    /// Initial position and bounds describe a different number of dimensions.
    #[error("dimension mismatch: initial position has {got} elements, bounds have {expected}")]
    InvalidDimension {
        /// Number of bound pairs
        expected: usize,
        /// Length of the initial position
        got: usize,
    },

    /// A lower bound exceeds its upper bound (or one of them is NaN).
    #[error("invalid bounds at index {index}: lower ({lower}) > upper ({upper})")]
    InvalidBounds {
        /// Index of the invalid bound pair
        index: usize,
        /// The lower bound value
        lower: f64,
        /// The upper bound value
        upper: f64,
    },

    /// A coordinate of the initial position is NaN or infinite.
    #[error("invalid initial position at index {index}: {value} (must be finite)")]
    InvalidInitialPosition {
        /// Index of the offending coordinate
        index: usize,
        /// The rejected value
        value: f64,
    },

    /// The swarm must hold at least one particle.
    #[error("particle count ({count}) must be >= 1")]
    InvalidParticleCount {
        /// The invalid particle count
        count: usize,
    },

    /// The run must be allowed at least one iteration.
    #[error("iteration budget ({maxiter}) must be >= 1")]
    InvalidIterationBudget {
        /// The invalid iteration budget
        maxiter: usize,
    },

    /// An update coefficient is NaN or infinite.
    #[error("invalid {name} coefficient: {value} (must be finite)")]
    InvalidCoefficient {
        /// Which coefficient (inertia, cognitive or social)
        name: &'static str,
        /// The rejected value
        value: f64,
    },

    /// Zero-dimensional search space.
    #[error("search space has no dimensions")]
    EmptySearchSpace,
}

/// A specialized `Result` type for PSO operations.
pub type Result<T> = std::result::Result<T, PSOError>;

impl PSOError {
    /// Returns `true` for `InvalidBounds`.
    pub fn is_bounds_error(&self) -> bool {
        matches!(self, PSOError::InvalidBounds { .. })
    }

    /// Returns `true` for `InvalidInitialPosition`.
    pub fn is_initial_position_error(&self) -> bool {
        matches!(self, PSOError::InvalidInitialPosition { .. })
    }

    /// Returns `true` if this is a configuration-related error.
    ///
    /// This includes `InvalidParticleCount`, `InvalidIterationBudget`
    /// and `InvalidCoefficient`.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            PSOError::InvalidParticleCount { .. }
                | PSOError::InvalidIterationBudget { .. }
                | PSOError::InvalidCoefficient { .. }
        )
    }

    /// Returns `true` for `InvalidDimension` and `EmptySearchSpace`.
    pub fn is_dimension_error(&self) -> bool {
        matches!(
            self,
            PSOError::InvalidDimension { .. } | PSOError::EmptySearchSpace
        )
    }
}
