//! Set-level reconciliation between a stored exercise and a proposed edit.
//!
//! Pure: no I/O, no clock, no global state. The store applies the result.
//!
//! Sets are matched by [`SetId`] equality only, never by position, so the
//! order in which the proposal lists its sets does not change the diff.
//!
//! 1. Every stored set whose id is absent from the proposal is deleted.
//! 2. A proposal with no sets removes the whole exercise instead of editing it.
//! 3. Otherwise comments are replaced, matched sets take the proposed reps and
//!    weight, and unmatched proposed sets are inserted.
//!
//! Deletions are listed first and must be applied first.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![forbid(unsafe_code)]

use super::{
    aggregates::{normalize_comments, Exercise, ExerciseSet},
    identifiers::SetId,
};

/// Change to apply to one proposed set.
#[derive(Debug, Clone, PartialEq)]
pub enum SetUpsert {
    /// Existing set keeps its id; only reps and weight change.
    Update { id: SetId, reps: u32, weight: f64 },
    /// New child of the existing exercise.
    Insert(ExerciseSet),
}

impl SetUpsert {
    #[must_use]
    pub const fn id(&self) -> &SetId {
        match self {
            Self::Update { id, .. } => id,
            Self::Insert(set) => &set.id,
        }
    }
}

/// What happens to the exercise itself.
#[derive(Debug, Clone, PartialEq)]
pub enum ReconcileOutcome {
    /// The proposal has no sets: the exercise goes, possibly taking its workout.
    DeleteExercise,
    /// Set-level edit of the surviving exercise.
    Edit {
        comments: Option<String>,
        upserts: Vec<SetUpsert>,
    },
}

/// Diff between a stored exercise and a proposal.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation {
    /// Stored set ids missing from the proposal, in stored order.
    pub sets_to_delete: Vec<SetId>,
    pub outcome: ReconcileOutcome,
}

impl Reconciliation {
    #[must_use]
    pub const fn deletes_exercise(&self) -> bool {
        matches!(self.outcome, ReconcileOutcome::DeleteExercise)
    }

    /// True when applying the diff to `previous` would leave it unchanged.
    #[must_use]
    pub fn is_noop(&self, previous: &Exercise) -> bool {
        if !self.sets_to_delete.is_empty() {
            return false;
        }
        match &self.outcome {
            ReconcileOutcome::DeleteExercise => false,
            ReconcileOutcome::Edit { comments, upserts } => {
                comments == &previous.comments
                    && upserts.iter().all(|upsert| match upsert {
                        SetUpsert::Update { id, reps, weight } => {
                            previous.set(id).is_some_and(|s| {
                                s.reps == *reps && s.weight.to_bits() == weight.to_bits()
                            })
                        }
                        SetUpsert::Insert(_) => false,
                    })
            }
        }
    }
}

/// Compute the diff that turns `previous` into `proposed`.
#[must_use]
pub fn reconcile(previous: &Exercise, proposed: &Exercise) -> Reconciliation {
    let proposed_ids = proposed.set_ids();

    let sets_to_delete: Vec<SetId> = previous
        .sets
        .iter()
        .filter(|existing| !proposed_ids.contains(&existing.id))
        .map(|existing| existing.id.clone())
        .collect();

    if proposed.sets.is_empty() {
        return Reconciliation {
            sets_to_delete,
            outcome: ReconcileOutcome::DeleteExercise,
        };
    }

    let upserts = proposed
        .sets
        .iter()
        .map(|set| match previous.set(&set.id) {
            Some(existing) => SetUpsert::Update {
                id: existing.id.clone(),
                reps: set.reps,
                weight: set.weight,
            },
            None => SetUpsert::Insert(set.clone()),
        })
        .collect();

    Reconciliation {
        sets_to_delete,
        outcome: ReconcileOutcome::Edit {
            comments: normalize_comments(proposed.comments.clone()),
            upserts,
        },
    }
}
