//! Common builders for setlog-core integration tests.

#![allow(
    dead_code,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::missing_panics_doc
)]

use setlog_core::{
    domain::{ExerciseSet, SetId},
    CacheChange, Exercise, ExerciseId, ExerciseService, MemoryStore, SqliteStore, Workout,
    WorkoutId,
};

/// Notifier that drops every change.
pub fn ignore(_: CacheChange) {}

pub fn exercise_id(id: &str) -> ExerciseId {
    ExerciseId::parse(id).expect("valid exercise id")
}

pub fn workout_id(id: &str) -> WorkoutId {
    WorkoutId::parse(id).expect("valid workout id")
}

pub fn set(exercise: &str, ordinal: u16, reps: u32, weight: f64) -> ExerciseSet {
    ExerciseSet::new(
        SetId::new(exercise_id(exercise), ordinal).expect("valid ordinal"),
        reps,
        weight,
    )
}

/// Proposed exercise with sets `(ordinal, reps, weight)`; may be empty.
pub fn exercise(id: &str, sort: u32, sets: &[(u16, u32, f64)]) -> Exercise {
    Exercise::proposed(
        exercise_id(id),
        sort,
        sets.iter()
            .map(|(ordinal, reps, weight)| set(id, *ordinal, *reps, *weight))
            .collect(),
        None,
    )
    .expect("valid exercise")
}

pub fn memory_service() -> ExerciseService<MemoryStore> {
    ExerciseService::new(MemoryStore::new())
}

pub async fn sqlite_service() -> ExerciseService<SqliteStore> {
    ExerciseService::new(SqliteStore::in_memory().await.expect("in-memory sqlite"))
}

/// `(exercise id, sort)` pairs in display order.
pub fn sorts(workout: &Workout) -> Vec<(String, u32)> {
    workout
        .exercises
        .iter()
        .map(|e| (e.id.to_string(), e.sort))
        .collect()
}

/// `(set id, reps, weight)` triples in display order.
pub fn loads(exercise: &Exercise) -> Vec<(String, u32, f64)> {
    exercise
        .sets
        .iter()
        .map(|s| (s.id.to_string(), s.reps, s.weight))
        .collect()
}
