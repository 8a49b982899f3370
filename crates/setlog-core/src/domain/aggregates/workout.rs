//! Workout aggregate root.
//!
//! A workout is created lazily by the first exercise added on a day and
//! removed together with its last exercise, so a stored workout is never
//! empty. Exercise order in [`Workout::exercises`] is display order and the
//! `sort` field mirrors it as `1..=N`.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![forbid(unsafe_code)]

use chrono::NaiveDate;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use super::{AggregateError, Exercise};
use crate::domain::identifiers::{ExerciseId, WorkoutId};

/// One calendar day of training.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workout {
    pub id: WorkoutId,
    pub date: NaiveDate,
    #[serde(default)]
    pub exercises: Vec<Exercise>,
}

impl Workout {
    /// A workout shell with no exercises yet.
    ///
    /// Only valid transiently, between creation and the first exercise
    /// insertion inside one write plan.
    #[must_use]
    pub const fn empty(id: WorkoutId) -> Self {
        Self {
            date: id.date(),
            id,
            exercises: Vec::new(),
        }
    }

    // ========================================================================
    // QUERY METHODS
    // ========================================================================

    /// Typed lookup of an exercise by id.
    #[must_use]
    pub fn exercise(&self, id: &ExerciseId) -> Option<&Exercise> {
        self.exercises.iter().find(|e| &e.id == id)
    }

    /// Mutable typed lookup of an exercise by id.
    pub fn exercise_mut(&mut self, id: &ExerciseId) -> Option<&mut Exercise> {
        self.exercises.iter_mut().find(|e| &e.id == id)
    }

    /// Zero-based position of an exercise in display order.
    #[must_use]
    pub fn position_of(&self, id: &ExerciseId) -> Option<usize> {
        self.exercises.iter().position(|e| &e.id == id)
    }

    #[must_use]
    pub fn exercise_count(&self) -> usize {
        self.exercises.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.exercises.is_empty()
    }

    // ========================================================================
    // INVARIANTS
    // ========================================================================

    /// Every violated structural rule, in traversal order. Empty means valid.
    #[must_use]
    pub fn check_invariants(&self) -> Vec<AggregateError> {
        let mut violations = Vec::new();

        if self.date != self.id.date() {
            violations.push(AggregateError::DateMismatch {
                record: format!("workout {}", self.id),
                found: self.date.to_string(),
            });
        }

        if self.exercises.is_empty() {
            violations.push(AggregateError::EmptyWorkout(self.id));
        }

        violations.extend(
            self.exercises
                .iter()
                .map(|e| &e.id)
                .duplicates()
                .map(|id| AggregateError::DuplicateExercise(id.clone())),
        );

        for (expected, exercise) in (1_u32..).zip(&self.exercises) {
            if exercise.workout_id() != self.id {
                violations.push(AggregateError::ForeignExercise {
                    exercise: exercise.id.clone(),
                    workout: self.id,
                });
            }
            if exercise.sort != expected {
                violations.push(AggregateError::SortGap {
                    exercise: exercise.id.clone(),
                    expected,
                    found: exercise.sort,
                });
            }
            if let Err(e) = exercise.validate_persistable() {
                violations.push(e);
            }
        }

        violations
    }

    /// First violated structural rule, if any.
    ///
    /// # Errors
    ///
    /// Returns the first entry of [`Workout::check_invariants`].
    pub fn validate(&self) -> Result<(), AggregateError> {
        self.check_invariants()
            .into_iter()
            .next()
            .map_or(Ok(()), Err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ExerciseSet, SetId};

    fn exercise(key: &str, sort: u32) -> Exercise {
        let id = ExerciseId::parse(format!("2018-05-04_{key}")).expect("valid id");
        let set = ExerciseSet::new(SetId::new(id.clone(), 1).expect("valid"), 5, 60.0);
        Exercise::new(id, sort, vec![set], None).expect("valid exercise")
    }

    fn workout(exercises: Vec<Exercise>) -> Workout {
        let mut workout = Workout::empty(WorkoutId::parse("2018-05-04").expect("valid"));
        workout.exercises = exercises;
        workout
    }

    #[test]
    fn test_valid_workout_has_no_violations() {
        let w = workout(vec![exercise("bench-press", 1), exercise("squat", 2)]);
        assert!(w.check_invariants().is_empty());
        assert!(w.validate().is_ok());
    }

    #[test]
    fn test_empty_workout_is_a_violation() {
        let w = workout(Vec::new());
        assert_eq!(
            w.validate(),
            Err(AggregateError::EmptyWorkout(w.id))
        );
    }

    #[test]
    fn test_sort_gap_is_reported() {
        let w = workout(vec![exercise("bench-press", 1), exercise("squat", 3)]);
        let violations = w.check_invariants();
        assert_eq!(violations.len(), 1);
        assert!(matches!(
            violations[0],
            AggregateError::SortGap {
                expected: 2,
                found: 3,
                ..
            }
        ));
    }

    #[test]
    fn test_foreign_exercise_is_reported() {
        let mut w = workout(vec![exercise("bench-press", 1)]);
        let other_day = ExerciseId::parse("2018-05-05_squat").expect("valid id");
        let set = ExerciseSet::new(SetId::new(other_day.clone(), 1).expect("valid"), 5, 60.0);
        w.exercises
            .push(Exercise::new(other_day, 2, vec![set], None).expect("valid exercise"));

        assert!(w
            .check_invariants()
            .iter()
            .any(|v| matches!(v, AggregateError::ForeignExercise { .. })));
    }

    #[test]
    fn test_lookup_and_position() {
        let w = workout(vec![exercise("bench-press", 1), exercise("squat", 2)]);
        let squat = ExerciseId::parse("2018-05-04_squat").expect("valid id");
        assert_eq!(w.position_of(&squat), Some(1));
        assert_eq!(w.exercise(&squat).map(|e| e.sort), Some(2));
        assert_eq!(w.exercise_count(), 2);
        assert!(!w.is_empty());
    }
}
