//! Command-line arguments.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "setlog")]
#[command(about = "Workout log with set-level reconciliation of exercise edits")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file layered over the global config
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Print machine-readable JSON
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Add an exercise from a JSON record
    Add {
        /// JSON file, or `-` for stdin
        input: PathBuf,
    },
    /// Reconcile a stored exercise with a JSON record
    Update {
        /// JSON file, or `-` for stdin
        input: PathBuf,
    },
    /// Save exercise paper text, adding or updating as needed
    Edit {
        /// Exercise id, e.g. 2018-05-04_bench-press
        exercise_id: String,
        /// Paper file, or `-` for stdin
        input: PathBuf,
    },
    /// Delete an exercise and its sets
    Delete {
        /// Exercise id
        exercise_id: String,
    },
    /// Show the workout of one day
    Show {
        /// Date, YYYY-MM-DD
        date: String,
    },
    /// List workouts between two days (inclusive)
    List {
        /// First day, YYYY-MM-DD
        from: String,
        /// Last day, YYYY-MM-DD
        to: String,
    },
    /// Earlier exercises of one type, newest first
    History {
        /// Exercise type, e.g. bench-press
        exercise_type: String,
        /// Only days before this one (default: today)
        #[arg(long)]
        before: Option<String>,
        /// Maximum number of exercises
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },
    /// Print an exercise as paper text
    Paper {
        /// Exercise id
        exercise_id: String,
    },
}
