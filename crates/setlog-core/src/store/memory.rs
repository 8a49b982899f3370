//! In-memory store for tests and isolated instances.
//!
//! A transaction clones the persistent map, applies the plan to the clone,
//! checks the aggregate invariants and swaps the clone in. Readers never see
//! a half-applied plan.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use std::{
    ops::RangeInclusive,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use async_trait::async_trait;
use im::OrdMap;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::{Planner, WorkoutStore};
use crate::{
    domain::{Exercise, ExerciseTypeKey, Workout, WorkoutId},
    Error, Result,
};

/// Workouts held in a persistent ordered map behind an async mutex.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    workouts: Arc<Mutex<OrdMap<WorkoutId, Workout>>>,
    fail_next_commit: Arc<AtomicBool>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next transaction fail at commit time.
    ///
    /// The plan is computed and applied to the staged copy, then discarded.
    pub fn fail_next_commit(&self) {
        self.fail_next_commit.store(true, Ordering::SeqCst);
    }

    /// Number of stored workouts.
    pub async fn workout_count(&self) -> usize {
        self.workouts.lock().await.len()
    }
}

#[async_trait]
impl WorkoutStore for MemoryStore {
    async fn load_workout(&self, id: &WorkoutId) -> Result<Option<Workout>> {
        Ok(self.workouts.lock().await.get(id).cloned())
    }

    async fn transact(
        &self,
        operation: &'static str,
        id: &WorkoutId,
        planner: Planner,
    ) -> Result<Option<Workout>> {
        let mut workouts = self.workouts.lock().await;
        let current = workouts.get(id).cloned();

        let plan = planner(current.as_ref()).map_err(|e| e.into_abort(operation))?;
        debug!(operation, workout = %id, ops = plan.len(), "applying write plan");

        let next = plan.apply(current).map_err(|e| e.into_abort(operation))?;
        if let Some(workout) = &next {
            workout
                .validate()
                .map_err(|e| Error::transaction_abort(operation, e))?;
        }

        let mut staged = workouts.clone();
        match &next {
            Some(workout) => {
                staged.insert(*id, workout.clone());
            }
            None => {
                staged.remove(id);
            }
        }

        if self.fail_next_commit.swap(false, Ordering::SeqCst) {
            warn!(operation, workout = %id, "commit failed, discarding staged changes");
            return Err(Error::transaction_abort(operation, "commit failed"));
        }

        *workouts = staged;
        Ok(next)
    }

    async fn list_workouts(&self, range: RangeInclusive<WorkoutId>) -> Result<Vec<Workout>> {
        Ok(self
            .workouts
            .lock()
            .await
            .range(range)
            .map(|(_, workout)| workout.clone())
            .collect())
    }

    async fn exercise_history(
        &self,
        exercise_type: &ExerciseTypeKey,
        before: WorkoutId,
        limit: usize,
    ) -> Result<Vec<Exercise>> {
        Ok(self
            .workouts
            .lock()
            .await
            .range(..before)
            .rev()
            .filter_map(|(_, workout)| {
                workout
                    .exercises
                    .iter()
                    .find(|e| &e.exercise_type == exercise_type)
                    .cloned()
            })
            .take(limit)
            .collect())
    }
}
