//! Store Abstraction - the injected persistence boundary.
//!
//! [`WorkoutStore`] is passed explicitly to the service instead of being
//! looked up globally, so several isolated stores can coexist (one per test,
//! one per database file).
//!
//! Every mutation goes through [`WorkoutStore::transact`]: one atomic scope in
//! which the current workout is loaded, a pure planner turns it into a
//! [`WritePlan`], the plan is applied, and the scope commits. If anything in
//! the scope fails, nothing in it is applied.

use std::{ops::RangeInclusive, sync::Arc};

use async_trait::async_trait;

use crate::{
    domain::{Exercise, ExerciseTypeKey, WritePlan, Workout, WorkoutId},
    Result,
};

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Pure planning step run inside an atomic scope.
///
/// Receives the workout as currently stored (`None` when absent). Must not
/// perform I/O.
pub type Planner = Box<dyn FnOnce(Option<&Workout>) -> Result<WritePlan> + Send>;

/// Trait defining the persistence boundary for workouts.
///
/// # Error Handling
///
/// Domain errors raised inside [`WorkoutStore::transact`] (`NotFound`,
/// `Conflict`, invalid input) are returned unchanged after the scope rolls
/// back. Any other failure is reported as `Error::TransactionAbort`.
#[async_trait]
pub trait WorkoutStore: Send + Sync {
    /// Fetch one workout with its exercises and sets.
    async fn load_workout(&self, id: &WorkoutId) -> Result<Option<Workout>>;

    /// Run `planner` and apply its plan in one atomic scope.
    ///
    /// `operation` names the mutation in abort errors and logs. Returns the
    /// workout as committed, or `None` when the plan deleted it.
    async fn transact(
        &self,
        operation: &'static str,
        id: &WorkoutId,
        planner: Planner,
    ) -> Result<Option<Workout>>;

    /// Workouts whose date falls in `range` (inclusive), oldest first.
    async fn list_workouts(&self, range: RangeInclusive<WorkoutId>) -> Result<Vec<Workout>>;

    /// Earlier exercises of one type, newest first.
    async fn exercise_history(
        &self,
        exercise_type: &ExerciseTypeKey,
        before: WorkoutId,
        limit: usize,
    ) -> Result<Vec<Exercise>>;
}

#[async_trait]
impl<T: WorkoutStore + ?Sized> WorkoutStore for Arc<T> {
    async fn load_workout(&self, id: &WorkoutId) -> Result<Option<Workout>> {
        (**self).load_workout(id).await
    }

    async fn transact(
        &self,
        operation: &'static str,
        id: &WorkoutId,
        planner: Planner,
    ) -> Result<Option<Workout>> {
        (**self).transact(operation, id, planner).await
    }

    async fn list_workouts(&self, range: RangeInclusive<WorkoutId>) -> Result<Vec<Workout>> {
        (**self).list_workouts(range).await
    }

    async fn exercise_history(
        &self,
        exercise_type: &ExerciseTypeKey,
        before: WorkoutId,
        limit: usize,
    ) -> Result<Vec<Exercise>> {
        (**self).exercise_history(exercise_type, before, limit).await
    }
}
