//! `SQLite` implementation of [`WorkoutStore`].
//!
//! Schema: `workouts` ← `exercises` ← `sets`, each child referencing its
//! parent with `ON DELETE CASCADE`. Ids are the composite identifier strings,
//! so the foreign keys are derivable from the ids themselves. `seq` columns
//! record insertion order, which is the display order of sets.
//!
//! Each transaction runs under `BEGIN IMMEDIATE`, which takes the write lock
//! up front: the read, plan and write steps form one serialised unit.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use std::{fmt::Display, ops::RangeInclusive, str::FromStr, time::Duration};

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
    SqliteConnection, SqlitePool,
};
use tracing::{debug, warn};

use super::{Planner, WorkoutStore};
use crate::{
    config::DatabaseConfig,
    domain::{
        identifiers::DATE_KEY_FORMAT, Exercise, ExerciseId, ExerciseSet, ExerciseTypeKey,
        SetId, WorkoutId, WriteOp, Workout,
    },
    Error, Result,
};

const SCHEMA: [&str; 6] = [
    "CREATE TABLE IF NOT EXISTS workouts (
        id TEXT PRIMARY KEY NOT NULL,
        date TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS exercises (
        seq INTEGER PRIMARY KEY AUTOINCREMENT,
        id TEXT NOT NULL UNIQUE,
        workout_id TEXT NOT NULL REFERENCES workouts(id) ON DELETE CASCADE,
        date TEXT NOT NULL,
        type TEXT NOT NULL,
        comments TEXT,
        sort INTEGER NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_exercises_workout ON exercises(workout_id, sort)",
    "CREATE INDEX IF NOT EXISTS idx_exercises_type_date ON exercises(type, date)",
    "CREATE TABLE IF NOT EXISTS sets (
        seq INTEGER PRIMARY KEY AUTOINCREMENT,
        id TEXT NOT NULL UNIQUE,
        exercise_id TEXT NOT NULL REFERENCES exercises(id) ON DELETE CASCADE,
        reps INTEGER NOT NULL,
        weight REAL NOT NULL,
        date TEXT NOT NULL,
        type TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_sets_exercise ON sets(exercise_id)",
];

type ExerciseRow = (String, String, String, Option<String>, i64);
type SetRow = (String, i64, f64, String, String);

/// Workout store backed by an `SQLite` connection pool.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if needed) the database file named by `config`.
    ///
    /// # Errors
    ///
    /// Returns `IoError` when the parent directory cannot be created and
    /// `DatabaseError` when the database cannot be opened or migrated.
    pub async fn open(config: &DatabaseConfig) -> Result<Self> {
        if let Some(parent) = config
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
        {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                Error::io_error(format!(
                    "Failed to create database directory {}: {e}",
                    parent.display()
                ))
            })?;
        }

        let options = SqliteConnectOptions::new()
            .filename(&config.path)
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_millis(config.busy_timeout_ms));

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await
            .map_err(|e| {
                Error::database_error(format!(
                    "Failed to open database {}: {e}",
                    config.path.display()
                ))
            })?;

        debug!(path = %config.path.display(), "opened workout database");
        Self::with_pool(pool).await
    }

    /// Private in-memory database, alive as long as the store.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` when the database cannot be created.
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| Error::database_error(format!("Invalid in-memory options: {e}")))?
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| {
                Error::database_error(format!("Failed to create in-memory database: {e}"))
            })?;

        Self::with_pool(pool).await
    }

    /// Wrap an existing pool, creating the schema if missing.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` when a schema statement fails.
    pub async fn with_pool(pool: SqlitePool) -> Result<Self> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&pool)
                .await
                .map_err(|e| Error::database_error(format!("Failed to create schema: {e}")))?;
        }
        Ok(Self { pool })
    }

    async fn run_scope(
        conn: &mut SqliteConnection,
        id: &WorkoutId,
        planner: Planner,
    ) -> Result<Option<Workout>> {
        let current = fetch_workout(conn, id).await?;
        let plan = planner(current.as_ref())?;

        // Dry run first: domain errors surface before any statement executes.
        let expected = plan.apply(current)?;

        for op in plan.ops() {
            execute_op(conn, op).await?;
        }

        let stored = fetch_workout(conn, id).await?;
        if let Some(workout) = &stored {
            workout.validate().map_err(|e| {
                Error::database_error(format!("Stored workout {id} violates invariants: {e}"))
            })?;
        }
        if stored != expected {
            return Err(Error::database_error(format!(
                "Stored workout {id} diverged from the applied plan"
            )));
        }

        debug!(workout = %id, ops = plan.len(), "applied write plan");
        Ok(stored)
    }
}

#[async_trait]
impl WorkoutStore for SqliteStore {
    async fn load_workout(&self, id: &WorkoutId) -> Result<Option<Workout>> {
        // One read transaction: the workout, its exercises and their sets come
        // from the same snapshot.
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| Error::database_error(format!("Failed to begin read: {e}")))?;

        let workout = fetch_workout(&mut tx, id).await?;

        tx.commit()
            .await
            .map_err(|e| Error::database_error(format!("Failed to finish read: {e}")))?;
        Ok(workout)
    }

    async fn transact(
        &self,
        operation: &'static str,
        id: &WorkoutId,
        planner: Planner,
    ) -> Result<Option<Workout>> {
        // Dropping `tx` before commit rolls it back, including when the caller
        // drops this future.
        let mut tx = self.pool.begin_with("BEGIN IMMEDIATE").await.map_err(|e| {
            Error::transaction_abort(operation, format!("Failed to begin transaction: {e}"))
        })?;

        match Self::run_scope(&mut tx, id, planner).await {
            Ok(workout) => {
                tx.commit().await.map_err(|e| {
                    Error::transaction_abort(operation, format!("Failed to commit: {e}"))
                })?;
                Ok(workout)
            }
            Err(e) => {
                if let Err(rollback) = tx.rollback().await {
                    warn!(operation, error = %rollback, "rollback failed");
                } else {
                    warn!(operation, "transaction rolled back");
                }
                Err(e.into_abort(operation))
            }
        }
    }

    async fn list_workouts(&self, range: RangeInclusive<WorkoutId>) -> Result<Vec<Workout>> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| Error::database_error(format!("Failed to begin read: {e}")))?;

        let ids: Vec<(String,)> =
            sqlx::query_as("SELECT id FROM workouts WHERE id BETWEEN ?1 AND ?2 ORDER BY id")
                .bind(range.start().to_string())
                .bind(range.end().to_string())
                .fetch_all(&mut *tx)
                .await
                .map_err(|e| Error::database_error(format!("Failed to list workouts: {e}")))?;

        let mut workouts = Vec::with_capacity(ids.len());
        for (raw,) in ids {
            let id = WorkoutId::parse(&raw).map_err(|e| invalid_stored("workout id", &raw, e))?;
            if let Some(workout) = fetch_workout(&mut tx, &id).await? {
                workouts.push(workout);
            }
        }

        tx.commit()
            .await
            .map_err(|e| Error::database_error(format!("Failed to finish read: {e}")))?;
        Ok(workouts)
    }

    async fn exercise_history(
        &self,
        exercise_type: &ExerciseTypeKey,
        before: WorkoutId,
        limit: usize,
    ) -> Result<Vec<Exercise>> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| Error::database_error(format!("Failed to begin read: {e}")))?;

        let rows: Vec<ExerciseRow> = sqlx::query_as(
            "SELECT id, date, type, comments, sort FROM exercises
             WHERE type = ?1 AND date < ?2
             ORDER BY date DESC, seq DESC
             LIMIT ?3",
        )
        .bind(exercise_type.as_str())
        .bind(before.to_string())
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| Error::database_error(format!("Failed to query exercise history: {e}")))?;

        let mut history = Vec::with_capacity(rows.len());
        for row in rows {
            history.push(load_exercise(&mut tx, row).await?);
        }

        tx.commit()
            .await
            .map_err(|e| Error::database_error(format!("Failed to finish read: {e}")))?;
        Ok(history)
    }
}

// ============================================================================
// READS
// ============================================================================

fn invalid_stored(what: &str, value: &str, e: impl Display) -> Error {
    Error::parse_error(format!("Invalid stored {what} '{value}': {e}"))
}

fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, DATE_KEY_FORMAT).map_err(|e| invalid_stored("date", raw, e))
}

async fn fetch_workout(conn: &mut SqliteConnection, id: &WorkoutId) -> Result<Option<Workout>> {
    let row: Option<(String,)> = sqlx::query_as("SELECT date FROM workouts WHERE id = ?1")
        .bind(id.to_string())
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| Error::database_error(format!("Failed to load workout {id}: {e}")))?;

    let Some((date,)) = row else {
        return Ok(None);
    };

    let rows: Vec<ExerciseRow> = sqlx::query_as(
        "SELECT id, date, type, comments, sort FROM exercises
         WHERE workout_id = ?1
         ORDER BY sort, seq",
    )
    .bind(id.to_string())
    .fetch_all(&mut *conn)
    .await
    .map_err(|e| Error::database_error(format!("Failed to load exercises of {id}: {e}")))?;

    let mut exercises = Vec::with_capacity(rows.len());
    for row in rows {
        exercises.push(load_exercise(conn, row).await?);
    }

    Ok(Some(Workout {
        id: *id,
        date: parse_date(&date)?,
        exercises,
    }))
}

async fn load_exercise(conn: &mut SqliteConnection, row: ExerciseRow) -> Result<Exercise> {
    let (raw_id, date, exercise_type, comments, sort) = row;
    let id = ExerciseId::parse(&raw_id).map_err(|e| invalid_stored("exercise id", &raw_id, e))?;

    let set_rows: Vec<SetRow> = sqlx::query_as(
        "SELECT id, reps, weight, date, type FROM sets
         WHERE exercise_id = ?1
         ORDER BY seq",
    )
    .bind(&raw_id)
    .fetch_all(&mut *conn)
    .await
    .map_err(|e| Error::database_error(format!("Failed to load sets of {raw_id}: {e}")))?;

    let sets = set_rows
        .into_iter()
        .map(|(raw_set, reps, weight, set_date, set_type)| {
            Ok(ExerciseSet {
                id: SetId::parse(&raw_set).map_err(|e| invalid_stored("set id", &raw_set, e))?,
                reps: u32::try_from(reps)
                    .map_err(|e| invalid_stored("reps", &reps.to_string(), e))?,
                weight,
                date: parse_date(&set_date)?,
                exercise_type: ExerciseTypeKey::parse(&set_type)
                    .map_err(|e| invalid_stored("exercise type", &set_type, e))?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Exercise {
        id,
        date: parse_date(&date)?,
        exercise_type: ExerciseTypeKey::parse(&exercise_type)
            .map_err(|e| invalid_stored("exercise type", &exercise_type, e))?,
        comments,
        sort: u32::try_from(sort).map_err(|e| invalid_stored("sort", &sort.to_string(), e))?,
        sets,
    })
}

// ============================================================================
// WRITES
// ============================================================================

fn write_failed(what: &str, e: impl Display) -> Error {
    Error::database_error(format!("Failed to {what}: {e}"))
}

async fn insert_set(conn: &mut SqliteConnection, set: &ExerciseSet) -> Result<()> {
    sqlx::query(
        "INSERT INTO sets (id, exercise_id, reps, weight, date, type)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )
    .bind(set.id.to_string())
    .bind(set.id.exercise_id().to_string())
    .bind(i64::from(set.reps))
    .bind(set.weight)
    .bind(set.date.to_string())
    .bind(set.exercise_type.as_str())
    .execute(&mut *conn)
    .await
    .map_err(|e| write_failed(&format!("insert set {}", set.id), e))?;
    Ok(())
}

fn require_row(rows_affected: u64, entity: &'static str, id: impl Display) -> Result<()> {
    if rows_affected == 0 {
        return Err(Error::not_found(entity, id));
    }
    Ok(())
}

async fn execute_op(conn: &mut SqliteConnection, op: &WriteOp) -> Result<()> {
    match op {
        WriteOp::CreateWorkout(id) => {
            sqlx::query("INSERT INTO workouts (id, date) VALUES (?1, ?2)")
                .bind(id.to_string())
                .bind(id.date().to_string())
                .execute(&mut *conn)
                .await
                .map_err(|e| write_failed(&format!("create workout {id}"), e))?;
        }
        WriteOp::InsertExercise(exercise) => {
            sqlx::query(
                "INSERT INTO exercises (id, workout_id, date, type, comments, sort)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )
            .bind(exercise.id.to_string())
            .bind(exercise.workout_id().to_string())
            .bind(exercise.date.to_string())
            .bind(exercise.exercise_type.as_str())
            .bind(exercise.comments.as_deref())
            .bind(i64::from(exercise.sort))
            .execute(&mut *conn)
            .await
            .map_err(|e| write_failed(&format!("insert exercise {}", exercise.id), e))?;

            for set in &exercise.sets {
                insert_set(conn, set).await?;
            }
        }
        WriteOp::DeleteSets { exercise, sets } => {
            for set in sets {
                sqlx::query("DELETE FROM sets WHERE id = ?1 AND exercise_id = ?2")
                    .bind(set.to_string())
                    .bind(exercise.to_string())
                    .execute(&mut *conn)
                    .await
                    .map_err(|e| write_failed(&format!("delete set {set}"), e))?;
            }
        }
        WriteOp::UpdateSet { id, reps, weight } => {
            let result = sqlx::query("UPDATE sets SET reps = ?1, weight = ?2 WHERE id = ?3")
                .bind(i64::from(*reps))
                .bind(*weight)
                .bind(id.to_string())
                .execute(&mut *conn)
                .await
                .map_err(|e| write_failed(&format!("update set {id}"), e))?;
            require_row(result.rows_affected(), "set", id)?;
        }
        WriteOp::InsertSet(set) => insert_set(conn, set).await?,
        WriteOp::SetComments { exercise, comments } => {
            let result = sqlx::query("UPDATE exercises SET comments = ?1 WHERE id = ?2")
                .bind(comments.as_deref())
                .bind(exercise.to_string())
                .execute(&mut *conn)
                .await
                .map_err(|e| write_failed(&format!("update comments of {exercise}"), e))?;
            require_row(result.rows_affected(), "exercise", exercise)?;
        }
        WriteOp::DeleteExercise(id) => {
            let result = sqlx::query("DELETE FROM exercises WHERE id = ?1")
                .bind(id.to_string())
                .execute(&mut *conn)
                .await
                .map_err(|e| write_failed(&format!("delete exercise {id}"), e))?;
            require_row(result.rows_affected(), "exercise", id)?;
        }
        WriteOp::SetSort { exercise, sort } => {
            let result = sqlx::query("UPDATE exercises SET sort = ?1 WHERE id = ?2")
                .bind(i64::from(*sort))
                .bind(exercise.to_string())
                .execute(&mut *conn)
                .await
                .map_err(|e| write_failed(&format!("update sort of {exercise}"), e))?;
            require_row(result.rows_affected(), "exercise", exercise)?;
        }
        WriteOp::DeleteWorkout(id) => {
            let result = sqlx::query("DELETE FROM workouts WHERE id = ?1")
                .bind(id.to_string())
                .execute(&mut *conn)
                .await
                .map_err(|e| write_failed(&format!("delete workout {id}"), e))?;
            require_row(result.rows_affected(), "workout", id)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{plan_add, plan_delete};

    fn exercise(id: &str, sets: &[(u32, f64)]) -> Exercise {
        let id = ExerciseId::parse(id).expect("valid id");
        let sets = (1_u16..)
            .zip(sets)
            .map(|(ordinal, (reps, weight))| {
                ExerciseSet::new(SetId::new(id.clone(), ordinal).expect("valid"), *reps, *weight)
            })
            .collect();
        Exercise::new(id, 1, sets, None).expect("valid exercise")
    }

    async fn add(store: &SqliteStore, e: Exercise) -> Result<Option<Workout>> {
        let id = e.workout_id();
        store
            .transact("add", &id, Box::new(move |current| plan_add(current, &e)))
            .await
    }

    async fn count(store: &SqliteStore, table: &str) -> i64 {
        let (n,): (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(&store.pool)
            .await
            .expect("count query");
        n
    }

    #[tokio::test]
    async fn test_round_trips_workout() -> Result<()> {
        let store = SqliteStore::in_memory().await?;
        let committed = add(&store, exercise("2018-05-04_bench-press", &[(6, 100.0), (5, 102.5)]))
            .await?
            .expect("workout created");

        let loaded = store.load_workout(&committed.id).await?;
        assert_eq!(loaded.as_ref(), Some(&committed));
        assert_eq!(committed.exercises[0].sets[1].weight, 102.5);
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_workout_cascades() -> Result<()> {
        let store = SqliteStore::in_memory().await?;
        let e = exercise("2018-05-04_squat", &[(5, 80.0), (5, 80.0)]);
        let exercise_id = e.id.clone();
        add(&store, e).await?;

        let workout_id = exercise_id.workout_id();
        let after = store
            .transact(
                "delete",
                &workout_id,
                Box::new(move |current| plan_delete(current, &exercise_id)),
            )
            .await?;

        assert_eq!(after, None);
        assert_eq!(count(&store, "workouts").await, 0);
        assert_eq!(count(&store, "exercises").await, 0);
        assert_eq!(count(&store, "sets").await, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_failed_planner_rolls_back() -> Result<()> {
        let store = SqliteStore::in_memory().await?;
        add(&store, exercise("2018-05-04_squat", &[(5, 80.0)])).await?;

        let workout_id = WorkoutId::parse("2018-05-04")?;
        let result = store
            .transact(
                "update",
                &workout_id,
                Box::new(|_| Err(Error::database_error("planner exploded"))),
            )
            .await;
        assert!(matches!(
            result,
            Err(Error::TransactionAbort {
                operation: "update",
                ..
            })
        ));

        // The connection is usable again after rollback.
        add(&store, exercise("2018-05-04_deadlift", &[(3, 140.0)])).await?;
        assert_eq!(count(&store, "exercises").await, 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_cancelled_transact_leaves_store_usable() -> Result<()> {
        let store = SqliteStore::in_memory().await?;
        let workout_id = WorkoutId::parse("2018-05-04")?;

        for micros in [0_u64, 1, 5, 20, 50, 100, 250, 500, 1_000] {
            let bench = exercise("2018-05-04_bench-press", &[(6, 100.0)]);
            let _ = tokio::time::timeout(
                std::time::Duration::from_micros(micros),
                store.transact("add", &workout_id, Box::new(move |current| plan_add(current, &bench))),
            )
            .await;

            if let Some(workout) = store.load_workout(&workout_id).await? {
                assert!(workout.check_invariants().is_empty());
            }
        }

        let committed = add(&store, exercise("2018-05-04_squat", &[(5, 80.0)]))
            .await?
            .expect("workout kept");
        assert!(committed.check_invariants().is_empty());
        assert!(committed.exercise(&ExerciseId::parse("2018-05-04_squat")?).is_some());
        Ok(())
    }

    #[tokio::test]
    async fn test_list_workouts_in_range() -> Result<()> {
        let store = SqliteStore::in_memory().await?;
        for id in ["2018-05-01_squat", "2018-05-03_squat", "2018-05-07_squat"] {
            add(&store, exercise(id, &[(5, 80.0)])).await?;
        }

        let listed = store
            .list_workouts(WorkoutId::parse("2018-05-01")?..=WorkoutId::parse("2018-05-03")?)
            .await?;
        let ids: Vec<String> = listed.iter().map(|w| w.id.to_string()).collect();
        assert_eq!(ids, vec!["2018-05-01", "2018-05-03"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_open_creates_file_database() -> Result<()> {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = DatabaseConfig {
            path: dir.path().join("nested").join("setlog.db"),
            ..DatabaseConfig::default()
        };

        {
            let store = SqliteStore::open(&config).await?;
            add(&store, exercise("2018-05-04_squat", &[(5, 80.0)])).await?;
            store.pool.close().await;
        }

        let reopened = SqliteStore::open(&config).await?;
        let workout = reopened.load_workout(&WorkoutId::parse("2018-05-04")?).await?;
        assert_eq!(workout.map(|w| w.exercise_count()), Some(1));
        Ok(())
    }
}
