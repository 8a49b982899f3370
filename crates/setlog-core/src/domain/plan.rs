//! Write plans: the store-level operations one mutation performs inside a
//! single atomic scope.
//!
//! Planning is pure. A planner sees the workout as it is inside the scope and
//! returns a [`WritePlan`]; the store then applies the ops in order. The
//! reference semantics of every op live in [`WritePlan::apply`], which the
//! in-memory store uses directly and the `SQLite` store mirrors with SQL.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![forbid(unsafe_code)]

use super::{
    aggregates::{normalize_comments, Exercise, ExerciseSet, Workout},
    identifiers::{ExerciseId, SetId, WorkoutId},
    reconcile::{reconcile, ReconcileOutcome, SetUpsert},
};
use crate::{Error, Result};

/// One primitive store mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    /// Create the (still empty) workout for a day
    CreateWorkout(WorkoutId),
    /// Append an exercise, with its sets, to its workout
    InsertExercise(Exercise),
    /// Delete sets of one exercise; ids that are already gone are ignored
    DeleteSets {
        exercise: ExerciseId,
        sets: Vec<SetId>,
    },
    /// Change reps and weight of an existing set
    UpdateSet { id: SetId, reps: u32, weight: f64 },
    /// Append a set to the exercise its id names
    InsertSet(ExerciseSet),
    SetComments {
        exercise: ExerciseId,
        comments: Option<String>,
    },
    /// Delete an exercise and all its sets
    DeleteExercise(ExerciseId),
    SetSort { exercise: ExerciseId, sort: u32 },
    /// Delete a workout and everything it owns
    DeleteWorkout(WorkoutId),
}

/// Ordered list of ops applied inside one atomic scope.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WritePlan {
    ops: Vec<WriteOp>,
}

impl WritePlan {
    #[must_use]
    pub const fn new() -> Self {
        Self { ops: Vec::new() }
    }

    pub fn push(&mut self, op: WriteOp) {
        self.ops.push(op);
    }

    #[must_use]
    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Apply the plan to an in-memory aggregate.
    ///
    /// `None` means the workout does not exist (before) or was deleted (after).
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when an op references a missing record and
    /// `Conflict` when it would create one that already exists.
    pub fn apply(&self, workout: Option<Workout>) -> Result<Option<Workout>> {
        self.ops.iter().try_fold(workout, apply_op)
    }
}

impl Extend<WriteOp> for WritePlan {
    fn extend<I: IntoIterator<Item = WriteOp>>(&mut self, iter: I) {
        self.ops.extend(iter);
    }
}

impl IntoIterator for WritePlan {
    type Item = WriteOp;
    type IntoIter = std::vec::IntoIter<WriteOp>;

    fn into_iter(self) -> Self::IntoIter {
        self.ops.into_iter()
    }
}

fn require_workout(workout: Option<Workout>, id: &WorkoutId) -> Result<Workout> {
    workout
        .filter(|w| &w.id == id)
        .ok_or_else(|| Error::not_found("workout", id))
}

fn require_exercise<'a>(workout: &'a mut Workout, id: &ExerciseId) -> Result<&'a mut Exercise> {
    workout
        .exercise_mut(id)
        .ok_or_else(|| Error::not_found("exercise", id))
}

fn apply_op(workout: Option<Workout>, op: &WriteOp) -> Result<Option<Workout>> {
    match op {
        WriteOp::CreateWorkout(id) => match workout {
            Some(existing) => Err(Error::conflict(format!("workout {} already exists", existing.id))),
            None => Ok(Some(Workout::empty(*id))),
        },
        WriteOp::InsertExercise(exercise) => {
            let mut workout = require_workout(workout, &exercise.workout_id())?;
            if workout.exercise(&exercise.id).is_some() {
                return Err(Error::conflict(format!(
                    "exercise {} already exists",
                    exercise.id
                )));
            }
            workout.exercises.push(exercise.clone());
            Ok(Some(workout))
        }
        WriteOp::DeleteSets { exercise, sets } => {
            let mut workout = require_workout(workout, &exercise.workout_id())?;
            require_exercise(&mut workout, exercise)?
                .sets
                .retain(|s| !sets.contains(&s.id));
            Ok(Some(workout))
        }
        WriteOp::UpdateSet { id, reps, weight } => {
            let exercise_id = id.exercise_id();
            let mut workout = require_workout(workout, &exercise_id.workout_id())?;
            let set = require_exercise(&mut workout, exercise_id)?
                .set_mut(id)
                .ok_or_else(|| Error::not_found("set", id))?;
            set.reps = *reps;
            set.weight = *weight;
            Ok(Some(workout))
        }
        WriteOp::InsertSet(set) => {
            let exercise_id = set.id.exercise_id();
            let mut workout = require_workout(workout, &exercise_id.workout_id())?;
            let exercise = require_exercise(&mut workout, exercise_id)?;
            if exercise.set(&set.id).is_some() {
                return Err(Error::conflict(format!("set {} already exists", set.id)));
            }
            exercise.sets.push(set.clone());
            Ok(Some(workout))
        }
        WriteOp::SetComments { exercise, comments } => {
            let mut workout = require_workout(workout, &exercise.workout_id())?;
            require_exercise(&mut workout, exercise)?.comments = comments.clone();
            Ok(Some(workout))
        }
        WriteOp::DeleteExercise(id) => {
            let mut workout = require_workout(workout, &id.workout_id())?;
            let position = workout
                .position_of(id)
                .ok_or_else(|| Error::not_found("exercise", id))?;
            workout.exercises.remove(position);
            Ok(Some(workout))
        }
        WriteOp::SetSort { exercise, sort } => {
            let mut workout = require_workout(workout, &exercise.workout_id())?;
            require_exercise(&mut workout, exercise)?.sort = *sort;
            Ok(Some(workout))
        }
        WriteOp::DeleteWorkout(id) => {
            require_workout(workout, id)?;
            Ok(None)
        }
    }
}

// ============================================================================
// PLANNERS
// ============================================================================

/// 1-based dense sort value for a zero-based position.
fn dense_sort(position: usize) -> u32 {
    u32::try_from(position).map_or(u32::MAX, |p| p.saturating_add(1))
}

/// Plan the insertion of a new exercise.
///
/// The workout is created when `current` is `None`. The stored `sort` is the
/// next dense position regardless of what the caller put in the record.
///
/// # Errors
///
/// Returns `InvalidExercise` when the exercise is not persistable and
/// `Conflict` when its id is already present.
pub fn plan_add(current: Option<&Workout>, exercise: &Exercise) -> Result<WritePlan> {
    exercise.validate_persistable()?;

    let workout_id = exercise.workout_id();
    let mut plan = WritePlan::new();

    let existing_count = match current {
        Some(workout) => {
            if workout.exercise(&exercise.id).is_some() {
                return Err(Error::conflict(format!(
                    "exercise {} already exists in workout {workout_id}",
                    exercise.id
                )));
            }
            workout.exercise_count()
        }
        None => {
            plan.push(WriteOp::CreateWorkout(workout_id));
            0
        }
    };

    plan.push(WriteOp::InsertExercise(Exercise {
        sort: dense_sort(existing_count),
        comments: normalize_comments(exercise.comments.clone()),
        ..exercise.clone()
    }));

    Ok(plan)
}

/// Plan the removal of an exercise with its sets.
///
/// The workout goes too when this was its last exercise; otherwise the
/// survivors are renumbered `1..=N` in their current order.
///
/// # Errors
///
/// Returns `NotFound` when the workout or the exercise does not exist.
pub fn plan_delete(current: Option<&Workout>, exercise_id: &ExerciseId) -> Result<WritePlan> {
    let workout_id = exercise_id.workout_id();
    let workout = current
        .filter(|w| w.id == workout_id)
        .ok_or_else(|| Error::not_found("workout", workout_id))?;

    if workout.exercise(exercise_id).is_none() {
        return Err(Error::not_found("exercise", exercise_id));
    }

    let mut plan = WritePlan::new();
    plan.push(WriteOp::DeleteExercise(exercise_id.clone()));

    let remaining: Vec<&Exercise> = workout
        .exercises
        .iter()
        .filter(|e| &e.id != exercise_id)
        .collect();

    if remaining.is_empty() {
        plan.push(WriteOp::DeleteWorkout(workout_id));
    } else {
        plan.extend(
            remaining
                .iter()
                .enumerate()
                .filter(|(position, e)| e.sort != dense_sort(*position))
                .map(|(position, e)| WriteOp::SetSort {
                    exercise: e.id.clone(),
                    sort: dense_sort(position),
                }),
        );
    }

    Ok(plan)
}

/// Plan a set-level edit of a stored exercise.
///
/// Set deletions come first. A proposal without sets continues as
/// [`plan_delete`]; otherwise comments and sets are written. A proposal
/// identical to the stored exercise yields an empty plan.
///
/// # Errors
///
/// Returns `NotFound` when the workout or the exercise does not exist and
/// `InvalidExercise` when the proposal is structurally invalid.
pub fn plan_update(current: Option<&Workout>, proposed: &Exercise) -> Result<WritePlan> {
    proposed.validate()?;

    let workout_id = proposed.workout_id();
    let workout = current
        .filter(|w| w.id == workout_id)
        .ok_or_else(|| Error::not_found("workout", workout_id))?;
    let previous = workout
        .exercise(&proposed.id)
        .ok_or_else(|| Error::not_found("exercise", &proposed.id))?;

    let diff = reconcile(previous, proposed);
    let mut plan = WritePlan::new();
    if diff.is_noop(previous) {
        return Ok(plan);
    }

    if !diff.sets_to_delete.is_empty() {
        plan.push(WriteOp::DeleteSets {
            exercise: previous.id.clone(),
            sets: diff.sets_to_delete,
        });
    }

    match diff.outcome {
        ReconcileOutcome::DeleteExercise => {
            plan.extend(plan_delete(current, &previous.id)?);
        }
        ReconcileOutcome::Edit { comments, upserts } => {
            plan.push(WriteOp::SetComments {
                exercise: previous.id.clone(),
                comments,
            });
            plan.extend(upserts.into_iter().map(|upsert| match upsert {
                SetUpsert::Update { id, reps, weight } => WriteOp::UpdateSet { id, reps, weight },
                SetUpsert::Insert(set) => WriteOp::InsertSet(set),
            }));
        }
    }

    Ok(plan)
}

/// Plan saving an exercise whether or not it is already stored.
///
/// A stored exercise is updated (its `sort` is kept). An absent one is
/// added at the end of its workout, or ignored when the proposal has no
/// sets. The choice is made against `current`, so it holds inside the
/// atomic scope the plan is applied in.
///
/// # Errors
///
/// Propagates the errors of [`plan_add`] and [`plan_update`].
pub fn plan_save(current: Option<&Workout>, proposed: &Exercise) -> Result<WritePlan> {
    let stored = current
        .filter(|w| w.id == proposed.workout_id())
        .and_then(|w| w.exercise(&proposed.id));

    match stored {
        Some(_) => plan_update(current, proposed),
        None if proposed.sets.is_empty() => Ok(WritePlan::new()),
        None => plan_add(current, proposed),
    }
}
