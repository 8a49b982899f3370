//! Command handlers: load config, open the store, call the service, print.

use std::path::Path;

use anyhow::{Context, Result};
use serde_json::json;
use setlog_core::{
    config::{load_config, Config},
    domain::{ExerciseTypeKey, WorkoutId},
    paper::{generate_summary, parse_paper},
    CacheChange, Exercise, ExerciseId, ExerciseService, SqliteStore, Workout, WorkoutStore,
};
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};

/// Initialize tracing on stderr; `RUST_LOG` overrides the configured level.
fn init_tracing(config: &Config) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log.level))
        .context("Invalid log filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize tracing subscriber: {e}"))
}

fn log_change(change: CacheChange) {
    tracing::debug!(
        exercise = %change.exercise_id,
        kind = ?change.kind,
        phase = ?change.phase,
        "cache change"
    );
}

async fn read_all(mut reader: impl AsyncRead + Unpin) -> Result<String> {
    let mut text = String::new();
    reader
        .read_to_string(&mut text)
        .await
        .context("Failed to read stdin")?;
    Ok(text)
}

async fn read_input(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        return read_all(tokio::io::stdin()).await;
    }
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))
}

async fn read_exercise(path: &Path) -> Result<Exercise> {
    let text = read_input(path).await?;
    serde_json::from_str(&text).with_context(|| format!("Invalid exercise JSON in {}", path.display()))
}

async fn find_exercise(service: &ExerciseService<SqliteStore>, id: &ExerciseId) -> Result<Exercise> {
    service
        .exercise(id)
        .await?
        .ok_or_else(|| setlog_core::Error::not_found("exercise", id).into())
}

// ============================================================================
// OUTPUT
// ============================================================================

fn print_json(value: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_exercise(exercise: &Exercise) {
    println!("{}. {}", exercise.sort, exercise.exercise_type);
    for line in generate_summary(&exercise.sets, exercise.comments.as_deref()).lines() {
        println!("   {line}");
    }
}

fn print_workout(workout: &Workout) {
    println!("{}", workout.id);
    for exercise in &workout.exercises {
        print_exercise(exercise);
    }
}

fn output_exercise(json_mode: bool, exercise: Option<&Exercise>, removed: &ExerciseId) -> Result<()> {
    match (json_mode, exercise) {
        (true, Some(e)) => print_json(&serde_json::to_value(e)?),
        (true, None) => print_json(&json!({ "removed": removed.to_string() })),
        (false, Some(e)) => {
            print_exercise(e);
            Ok(())
        }
        (false, None) => {
            println!("Removed {removed}");
            Ok(())
        }
    }
}

// ============================================================================
// DISPATCH
// ============================================================================

/// Run one command.
///
/// # Errors
///
/// Returns the first failure, with `setlog_core::Error` kept downcastable
/// for the exit code.
pub async fn run(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_deref()).await?;
    init_tracing(&config)?;

    let store = SqliteStore::open(&config.database).await?;
    let service = ExerciseService::new(store);
    let json_mode = cli.json;

    match cli.command {
        Commands::Add { input } => {
            let exercise = read_exercise(&input).await?;
            let stored = service.add_exercise(&log_change, exercise).await?;
            output_exercise(json_mode, Some(&stored), &stored.id)
        }
        Commands::Update { input } => {
            let exercise = read_exercise(&input).await?;
            let id = exercise.id.clone();
            let stored = service
                .update_exercise_paper_for_workout(&log_change, exercise)
                .await?;
            output_exercise(json_mode, stored.as_ref(), &id)
        }
        Commands::Edit { exercise_id, input } => {
            let id = ExerciseId::parse(&exercise_id)?;
            let paper = parse_paper(&read_input(&input).await?)?;
            let saved = service.save_paper(&log_change, id.clone(), paper).await?;
            output_exercise(json_mode, saved.as_ref(), &id)
        }
        Commands::Delete { exercise_id } => {
            let id = ExerciseId::parse(&exercise_id)?;
            let exercise = find_exercise(&service, &id).await?;
            service.delete_exercise(&exercise).await?;
            output_exercise(json_mode, None, &id)
        }
        Commands::Show { date } => {
            let id = WorkoutId::parse(&date)?;
            let workout = service
                .workout(id.date())
                .await?
                .ok_or_else(|| setlog_core::Error::not_found("workout", id))?;
            if json_mode {
                print_json(&serde_json::to_value(&workout)?)
            } else {
                print_workout(&workout);
                Ok(())
            }
        }
        Commands::List { from, to } => {
            let range = WorkoutId::parse(&from)?..=WorkoutId::parse(&to)?;
            let workouts = service.store().list_workouts(range).await?;
            if json_mode {
                print_json(&serde_json::to_value(&workouts)?)
            } else {
                for workout in &workouts {
                    print_workout(workout);
                }
                Ok(())
            }
        }
        Commands::History {
            exercise_type,
            before,
            limit,
        } => {
            let exercise_type = ExerciseTypeKey::parse(&exercise_type)?;
            let before = match before {
                Some(date) => WorkoutId::parse(&date)?,
                None => WorkoutId::from_date(chrono::Local::now().date_naive()),
            };
            let history = service
                .store()
                .exercise_history(&exercise_type, before, limit)
                .await?;
            if json_mode {
                print_json(&serde_json::to_value(&history)?)
            } else {
                for exercise in &history {
                    println!("{}", exercise.date);
                    for line in generate_summary(&exercise.sets, exercise.comments.as_deref()).lines() {
                        println!("   {line}");
                    }
                }
                Ok(())
            }
        }
        Commands::Paper { exercise_id } => {
            let id = ExerciseId::parse(&exercise_id)?;
            let exercise = find_exercise(&service, &id).await?;
            let paper = generate_summary(&exercise.sets, exercise.comments.as_deref());
            if json_mode {
                print_json(&json!({ "id": id.to_string(), "paper": paper }))
            } else {
                println!("{paper}");
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    #[tokio::test]
    async fn test_read_all_drains_async_reader() -> Result<()> {
        let text = read_all(&b"6x100\n5x100\n\nok"[..]).await?;
        assert_eq!(parse_paper(&text)?.lines.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_read_input_reads_files() -> Result<()> {
        let file = tempfile::NamedTempFile::new()?;
        tokio::fs::write(file.path(), "5x80").await?;
        assert_eq!(read_input(file.path()).await?, "5x80");
        Ok(())
    }
}
