//! Mutation entry points for exercises.
//!
//! Each mutation follows the same sequence:
//! 1. publish the optimistic change (when the caller passed a notifier)
//! 2. run the pure planner inside one atomic scope of the injected store
//! 3. confirm the change with the committed exercise, or roll it back
//!
//! Errors are returned to the caller; nothing is retried.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

use chrono::NaiveDate;
use tracing::{debug, instrument, warn};

use crate::{
    cache::{CacheNotifier, ChangeKind, PendingChange},
    domain::{
        plan_add, plan_delete, plan_save, plan_update, Exercise, ExerciseId, Workout, WorkoutId,
    },
    paper::Paper,
    store::WorkoutStore,
    Error, Result,
};

/// Routes exercise mutations to the store.
#[derive(Debug, Clone)]
pub struct ExerciseService<S> {
    store: S,
}

fn committed_exercise(workout: Option<&Workout>, id: &ExerciseId) -> Option<Exercise> {
    workout.and_then(|w| w.exercise(id)).cloned()
}

impl<S: WorkoutStore> ExerciseService<S> {
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Insert a new exercise, creating its workout when it is the first of
    /// the day.
    ///
    /// The stored `sort` is the next position in the workout; the returned
    /// exercise carries it.
    ///
    /// # Errors
    ///
    /// - `InvalidExercise` if the exercise has no sets or is inconsistent
    /// - `Conflict` if the exercise id is already stored
    /// - `TransactionAbort` if the store fails
    #[instrument(skip_all, fields(exercise = %exercise.id))]
    pub async fn add_exercise(
        &self,
        notify: &dyn CacheNotifier,
        exercise: Exercise,
    ) -> Result<Exercise> {
        let workout_id = exercise.workout_id();
        let exercise_id = exercise.id.clone();
        let pending = PendingChange::publish(notify, ChangeKind::Added, &exercise);

        let result = self
            .store
            .transact(
                "add",
                &workout_id,
                Box::new(move |current| plan_add(current, &exercise)),
            )
            .await;

        match result {
            Ok(workout) => {
                let stored = committed_exercise(workout.as_ref(), &exercise_id);
                debug!(sort = ?stored.as_ref().map(|e| e.sort), "exercise added");
                pending.confirm(stored.clone());
                stored.ok_or_else(|| Error::not_found("exercise", &exercise_id))
            }
            Err(e) => {
                warn!(error = %e, "add rolled back");
                pending.roll_back(&e);
                Err(e)
            }
        }
    }

    /// Remove an exercise with its sets. The workout goes with its last
    /// exercise; otherwise the remaining exercises are renumbered.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the workout or the exercise does not exist
    /// - `TransactionAbort` if the store fails
    #[instrument(skip_all, fields(exercise = %exercise.id))]
    pub async fn delete_exercise(&self, exercise: &Exercise) -> Result<()> {
        let workout_id = exercise.workout_id();
        let exercise_id = exercise.id.clone();

        let workout = self
            .store
            .transact(
                "delete",
                &workout_id,
                Box::new(move |current| plan_delete(current, &exercise_id)),
            )
            .await
            .inspect_err(|e| warn!(error = %e, "delete rolled back"))?;

        debug!(workout_deleted = workout.is_none(), "exercise deleted");
        Ok(())
    }

    /// Replace the sets and comments of a stored exercise with a proposal.
    ///
    /// Sets are matched by id: missing ones are deleted, matched ones take
    /// the proposed reps and weight, new ones are inserted. A proposal with
    /// no sets deletes the exercise (and the workout if it was the last one)
    /// and returns `None`.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the workout or the exercise does not exist
    /// - `InvalidExercise` if the proposal is inconsistent
    /// - `TransactionAbort` if the store fails
    #[instrument(skip_all, fields(exercise = %exercise.id))]
    pub async fn update_exercise_paper_for_workout(
        &self,
        notify: &dyn CacheNotifier,
        exercise: Exercise,
    ) -> Result<Option<Exercise>> {
        let workout_id = WorkoutId::from_date(exercise.date);
        let exercise_id = exercise.id.clone();
        let pending = PendingChange::publish(notify, ChangeKind::Updated, &exercise);

        let result = self
            .store
            .transact(
                "update",
                &workout_id,
                Box::new(move |current| plan_update(current, &exercise)),
            )
            .await;

        match result {
            Ok(workout) => {
                let stored = committed_exercise(workout.as_ref(), &exercise_id);
                debug!(removed = stored.is_none(), "exercise updated");
                pending.confirm(stored.clone());
                Ok(stored)
            }
            Err(e) => {
                warn!(error = %e, "update rolled back");
                pending.roll_back(&e);
                Err(e)
            }
        }
    }

    /// Save paper text for an exercise the way the edit screen does.
    ///
    /// A stored exercise is updated. A new exercise is added at the end of
    /// its workout when the paper has sets; an empty paper for a new
    /// exercise does nothing. Which of these happens is decided inside the
    /// atomic scope, so concurrent saves of a new exercise add it once and
    /// update it afterwards.
    ///
    /// # Errors
    ///
    /// Propagates the errors of the add or update it performs.
    #[instrument(skip_all, fields(exercise = %exercise_id))]
    pub async fn save_paper(
        &self,
        notify: &dyn CacheNotifier,
        exercise_id: ExerciseId,
        paper: Paper,
    ) -> Result<Option<Exercise>> {
        let workout_id = exercise_id.workout_id();
        let known = self
            .store
            .load_workout(&workout_id)
            .await?
            .is_some_and(|w| w.exercise(&exercise_id).is_some());
        let kind = if known {
            ChangeKind::Updated
        } else {
            ChangeKind::Added
        };

        let proposed = paper.into_exercise(exercise_id.clone(), 1)?;
        let pending = (known || !proposed.sets.is_empty())
            .then(|| PendingChange::publish(notify, kind, &proposed));

        let result = self
            .store
            .transact(
                "save",
                &workout_id,
                Box::new(move |current| plan_save(current, &proposed)),
            )
            .await;

        match result {
            Ok(workout) => {
                let stored = committed_exercise(workout.as_ref(), &exercise_id);
                debug!(saved = stored.is_some(), "paper saved");
                if let Some(pending) = pending {
                    pending.confirm(stored.clone());
                }
                Ok(stored)
            }
            Err(e) => {
                warn!(error = %e, "save rolled back");
                if let Some(pending) = pending {
                    pending.roll_back(&e);
                }
                Err(e)
            }
        }
    }

    // ========================================================================
    // READS
    // ========================================================================

    /// Workout of one day.
    ///
    /// # Errors
    ///
    /// Returns error if the store cannot be read.
    pub async fn workout(&self, date: NaiveDate) -> Result<Option<Workout>> {
        self.store.load_workout(&WorkoutId::from_date(date)).await
    }

    /// One exercise by id.
    ///
    /// # Errors
    ///
    /// Returns error if the store cannot be read.
    pub async fn exercise(&self, id: &ExerciseId) -> Result<Option<Exercise>> {
        let workout = self.store.load_workout(&id.workout_id()).await?;
        Ok(committed_exercise(workout.as_ref(), id))
    }
}
