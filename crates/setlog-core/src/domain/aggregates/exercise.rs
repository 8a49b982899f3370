//! Exercise entity and its sets.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![forbid(unsafe_code)]

use std::collections::HashSet;

use chrono::NaiveDate;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use super::AggregateError;
use crate::domain::identifiers::{ExerciseId, ExerciseTypeKey, SetId, WorkoutId};

/// Blank or whitespace-only comments are stored as no comment at all.
#[must_use]
pub fn normalize_comments(comments: Option<String>) -> Option<String> {
    comments
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
}

// ============================================================================
// SET
// ============================================================================

/// One performed set. Only `reps` and `weight` ever change after insertion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseSet {
    pub id: SetId,
    pub reps: u32,
    pub weight: f64,
    pub date: NaiveDate,
    #[serde(rename = "type")]
    pub exercise_type: ExerciseTypeKey,
}

impl ExerciseSet {
    /// Create a set; `date` and `type` are taken from the id.
    #[must_use]
    pub fn new(id: SetId, reps: u32, weight: f64) -> Self {
        let exercise = id.exercise_id();
        Self {
            date: exercise.workout_id().date(),
            exercise_type: exercise.exercise_type().clone(),
            id,
            reps,
            weight,
        }
    }
}

// ============================================================================
// EXERCISE
// ============================================================================

/// An exercise performed on one day, owning its sets in display order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exercise {
    pub id: ExerciseId,
    pub date: NaiveDate,
    #[serde(rename = "type")]
    pub exercise_type: ExerciseTypeKey,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comments: Option<String>,
    pub sort: u32,
    #[serde(default)]
    pub sets: Vec<ExerciseSet>,
}

impl Exercise {
    /// Create an exercise that can be persisted as-is.
    ///
    /// # Errors
    ///
    /// Returns `AggregateError::EmptyExercise` when `sets` is empty, or any
    /// structural error reported by [`Exercise::validate`].
    pub fn new(
        id: ExerciseId,
        sort: u32,
        sets: Vec<ExerciseSet>,
        comments: Option<String>,
    ) -> Result<Self, AggregateError> {
        let exercise = Self::proposed(id, sort, sets, comments)?;
        exercise.validate_persistable()?;
        Ok(exercise)
    }

    /// Create a proposed edit of an exercise. Unlike [`Exercise::new`] the set
    /// list may be empty, which asks the update path to remove the exercise.
    ///
    /// # Errors
    ///
    /// Returns any structural error reported by [`Exercise::validate`].
    pub fn proposed(
        id: ExerciseId,
        sort: u32,
        sets: Vec<ExerciseSet>,
        comments: Option<String>,
    ) -> Result<Self, AggregateError> {
        let exercise = Self {
            date: id.workout_id().date(),
            exercise_type: id.exercise_type().clone(),
            id,
            comments: normalize_comments(comments),
            sort,
            sets,
        };
        exercise.validate()?;
        Ok(exercise)
    }

    /// Id of the owning workout.
    #[must_use]
    pub const fn workout_id(&self) -> WorkoutId {
        self.id.workout_id()
    }

    /// Typed lookup of a set by id.
    #[must_use]
    pub fn set(&self, id: &SetId) -> Option<&ExerciseSet> {
        self.sets.iter().find(|s| &s.id == id)
    }

    /// Mutable typed lookup of a set by id.
    pub fn set_mut(&mut self, id: &SetId) -> Option<&mut ExerciseSet> {
        self.sets.iter_mut().find(|s| &s.id == id)
    }

    /// Check everything except the non-empty rule.
    ///
    /// # Errors
    ///
    /// Returns the first violated rule.
    pub fn validate(&self) -> Result<(), AggregateError> {
        if self.date != self.id.workout_id().date() {
            return Err(AggregateError::DateMismatch {
                record: format!("exercise {}", self.id),
                found: self.date.to_string(),
            });
        }

        if &self.exercise_type != self.id.exercise_type() {
            return Err(AggregateError::TypeMismatch {
                record: format!("exercise {}", self.id),
                found: self.exercise_type.to_string(),
            });
        }

        if let Some(duplicate) = self.sets.iter().map(|s| &s.id).duplicates().next() {
            return Err(AggregateError::DuplicateSet(duplicate.clone()));
        }

        self.sets.iter().try_for_each(|set| self.validate_set(set))
    }

    /// Check every rule, including that the exercise has at least one set.
    ///
    /// # Errors
    ///
    /// Returns the first violated rule.
    pub fn validate_persistable(&self) -> Result<(), AggregateError> {
        if self.sets.is_empty() {
            return Err(AggregateError::EmptyExercise(self.id.clone()));
        }
        self.validate()
    }

    fn validate_set(&self, set: &ExerciseSet) -> Result<(), AggregateError> {
        if set.id.exercise_id() != &self.id {
            return Err(AggregateError::ForeignSet {
                set: set.id.clone(),
                exercise: self.id.clone(),
            });
        }

        if set.date != self.date {
            return Err(AggregateError::DateMismatch {
                record: format!("set {}", set.id),
                found: set.date.to_string(),
            });
        }

        if set.exercise_type != self.exercise_type {
            return Err(AggregateError::TypeMismatch {
                record: format!("set {}", set.id),
                found: set.exercise_type.to_string(),
            });
        }

        if !set.weight.is_finite() || set.weight < 0.0 {
            return Err(AggregateError::InvalidWeight {
                set: set.id.clone(),
                weight: set.weight.to_string(),
            });
        }

        Ok(())
    }

    /// Ids of all sets, for membership tests.
    #[must_use]
    pub fn set_ids(&self) -> HashSet<&SetId> {
        self.sets.iter().map(|s| &s.id).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exercise_id() -> ExerciseId {
        ExerciseId::parse("2018-05-04_bench-press").expect("valid id")
    }

    fn set(ordinal: u16, reps: u32, weight: f64) -> ExerciseSet {
        ExerciseSet::new(
            SetId::new(exercise_id(), ordinal).expect("valid ordinal"),
            reps,
            weight,
        )
    }

    #[test]
    fn test_new_exercise_derives_date_and_type() {
        let exercise = Exercise::new(exercise_id(), 1, vec![set(1, 6, 100.0)], None)
            .expect("valid exercise");
        assert_eq!(exercise.date.to_string(), "2018-05-04");
        assert_eq!(exercise.exercise_type.as_str(), "bench-press");
        assert_eq!(exercise.sets[0].date, exercise.date);
    }

    #[test]
    fn test_new_exercise_requires_sets() {
        let result = Exercise::new(exercise_id(), 1, Vec::new(), None);
        assert!(matches!(result, Err(AggregateError::EmptyExercise(_))));
    }

    #[test]
    fn test_proposed_exercise_allows_empty_sets() {
        let proposed = Exercise::proposed(exercise_id(), 1, Vec::new(), None);
        assert!(proposed.is_ok());
    }

    #[test]
    fn test_rejects_foreign_set() {
        let other = ExerciseId::parse("2018-05-04_squat").expect("valid id");
        let foreign = ExerciseSet::new(SetId::new(other, 1).expect("valid"), 5, 80.0);
        let result = Exercise::new(exercise_id(), 1, vec![foreign], None);
        assert!(matches!(result, Err(AggregateError::ForeignSet { .. })));
    }

    #[test]
    fn test_rejects_duplicate_set_ids() {
        let result = Exercise::new(
            exercise_id(),
            1,
            vec![set(1, 6, 100.0), set(1, 5, 100.0)],
            None,
        );
        assert!(matches!(result, Err(AggregateError::DuplicateSet(_))));
    }

    #[test]
    fn test_rejects_invalid_weight() {
        let result = Exercise::new(exercise_id(), 1, vec![set(1, 6, f64::NAN)], None);
        assert!(matches!(result, Err(AggregateError::InvalidWeight { .. })));

        let result = Exercise::new(exercise_id(), 1, vec![set(1, 6, -2.5)], None);
        assert!(matches!(result, Err(AggregateError::InvalidWeight { .. })));
    }

    #[test]
    fn test_blank_comments_are_dropped() {
        let exercise = Exercise::new(
            exercise_id(),
            1,
            vec![set(1, 6, 100.0)],
            Some("   ".to_string()),
        )
        .expect("valid exercise");
        assert_eq!(exercise.comments, None);
        assert_eq!(
            normalize_comments(Some("  felt heavy ".to_string())),
            Some("felt heavy".to_string())
        );
    }

    #[test]
    fn test_set_lookup_by_id() {
        let mut exercise = Exercise::new(
            exercise_id(),
            1,
            vec![set(1, 6, 100.0), set(2, 5, 100.0)],
            None,
        )
        .expect("valid exercise");
        let second = SetId::new(exercise_id(), 2).expect("valid");

        assert_eq!(exercise.set(&second).map(|s| s.reps), Some(5));
        if let Some(s) = exercise.set_mut(&second) {
            s.reps = 4;
        }
        assert_eq!(exercise.set(&second).map(|s| s.reps), Some(4));
        assert!(exercise.set_ids().contains(&second));
    }

    #[test]
    fn test_serde_uses_type_field() {
        let exercise = Exercise::new(exercise_id(), 1, vec![set(1, 6, 100.0)], None)
            .expect("valid exercise");
        let json = serde_json::to_value(&exercise).expect("serialize");
        assert_eq!(json["type"], "bench-press");
        assert_eq!(json["sets"][0]["id"], "2018-05-04_bench-press_001");
        assert!(json.get("comments").is_none());
    }
}
