//! # Aggregate Roots
//!
//! Consistency boundaries for the workout log.
//!
//! ## Workout Aggregate
//!
//! [`Workout`] - one calendar day, owning an ordered list of exercises
//!
//! **Business rules:**
//! - A persisted workout has at least one exercise
//! - Exercise `sort` values are exactly `1..=N` in collection order
//! - Every exercise id carries the workout's date key
//!
//! ## Exercise Entity
//!
//! [`Exercise`] - one exercise type performed on a day, owning its sets
//!
//! **Business rules:**
//! - A persisted exercise has at least one set
//! - Every set id is prefixed by the exercise id, and no id repeats
//! - `date` and `type` agree with what the id encodes
//!
//! **Usage:**
//! ```rust
//! use setlog_core::domain::{Exercise, ExerciseId, ExerciseSet, SetId};
//!
//! let id = ExerciseId::parse("2018-05-04_bench-press")?;
//! let sets = vec![
//!     ExerciseSet::new(SetId::new(id.clone(), 1)?, 6, 100.0),
//!     ExerciseSet::new(SetId::new(id.clone(), 2)?, 5, 100.0),
//! ];
//! let exercise = Exercise::new(id, 1, sets, None)?;
//! assert_eq!(exercise.sets.len(), 2);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! Both aggregates expose their fields publicly so the store and the cache can
//! move plain records around; the constructors and `validate` methods are the
//! boundary where the rules are checked.

mod exercise;
mod workout;

use thiserror::Error;

pub use exercise::{normalize_comments, Exercise, ExerciseSet};
pub use workout::Workout;

use super::identifiers::{ExerciseId, SetId, WorkoutId};

// ============================================================================
// DOMAIN ERRORS
// ============================================================================

/// Structural rule violations of the workout/exercise/set aggregate.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AggregateError {
    /// Exercise has no sets
    #[error("exercise {0} has no sets")]
    EmptyExercise(ExerciseId),

    /// Workout has no exercises
    #[error("workout {0} has no exercises")]
    EmptyWorkout(WorkoutId),

    /// Set id does not belong to the exercise holding it
    #[error("set {set} does not belong to exercise {exercise}")]
    ForeignSet { set: SetId, exercise: ExerciseId },

    /// Exercise id does not belong to the workout holding it
    #[error("exercise {exercise} does not belong to workout {workout}")]
    ForeignExercise {
        exercise: ExerciseId,
        workout: WorkoutId,
    },

    /// Set id appears more than once in one exercise
    #[error("duplicate set id {0}")]
    DuplicateSet(SetId),

    /// Exercise id appears more than once in one workout
    #[error("duplicate exercise id {0}")]
    DuplicateExercise(ExerciseId),

    /// Record date disagrees with the date encoded in its id
    #[error("{record} date {found} disagrees with its id")]
    DateMismatch { record: String, found: String },

    /// Record type disagrees with the type encoded in its id
    #[error("{record} type {found} disagrees with its id")]
    TypeMismatch { record: String, found: String },

    /// Weight is NaN, infinite or negative
    #[error("set {set} has invalid weight {weight}")]
    InvalidWeight { set: SetId, weight: String },

    /// Sort sequence is not dense `1..=N`
    #[error("exercise {exercise} has sort {found}, expected {expected}")]
    SortGap {
        exercise: ExerciseId,
        expected: u32,
        found: u32,
    },
}
