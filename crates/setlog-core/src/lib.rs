//! # Setlog Core
//!
//! Workout log storage with set-level reconciliation of exercise edits.
//!
//! ## Laws (Compiler Enforced)
//!
//! - No `unwrap()` - returns `Result` instead
//! - No `expect()` - returns `Result` instead
//! - No `panic!()` - returns `Result` instead
//! - No `unsafe` - safe Rust only
//!
//! ## Layout
//!
//! - [`domain`]: identifiers, aggregates, reconciliation and write plans (pure)
//! - [`store`]: the injected store handle and its `SQLite` and in-memory backends
//! - [`cache`]: two-phase optimistic change notifications
//! - [`service`]: the add / delete / update mutation entry points
//! - [`paper`]: plain-text exercise summaries
//! - [`config`]: layered configuration
//!
//! ## Error Handling
//!
//! All fallible operations return `Result<T, Error>`. Domain errors
//! (`NotFound`, `Conflict`, validation) reach the caller unchanged; store
//! failures inside an atomic scope surface as `TransactionAbort` after the
//! scope has rolled back.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![forbid(unsafe_code)]

pub mod cache;
pub mod config;
pub mod domain;
mod error;
pub mod paper;
pub mod service;
pub mod store;

pub use cache::{CacheChange, CacheNotifier, ChangeKind, ChangePhase, ExerciseCache};
pub use config::Config;
pub use domain::{Exercise, ExerciseId, ExerciseSet, SetId, Workout, WorkoutId};
pub use error::{Error, Result};
pub use service::ExerciseService;
pub use store::{MemoryStore, SqliteStore, WorkoutStore};
