//! Domain layer: identifiers, aggregates and the pure write planning rules.
//!
//! Nothing in this module performs I/O. Stores execute the plans built here.

pub mod aggregates;
pub mod identifiers;
pub mod plan;
pub mod reconcile;

pub use aggregates::{normalize_comments, AggregateError, Exercise, ExerciseSet, Workout};
pub use identifiers::{ExerciseId, ExerciseTypeKey, IdentifierError, SetId, WorkoutId};
pub use plan::{plan_add, plan_delete, plan_save, plan_update, WriteOp, WritePlan};
pub use reconcile::{reconcile, ReconcileOutcome, Reconciliation, SetUpsert};
