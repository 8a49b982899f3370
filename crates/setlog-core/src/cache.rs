//! Optimistic cache notifications.
//!
//! Every mutation publishes its expected result before the atomic scope
//! opens, then resolves it exactly once: confirmed with what was committed,
//! or rolled back with the failure. The core never reverts an optimistic
//! value on its own; consumers decide what a rollback means for them.
//!
//! [`ExerciseCache`] is a ready-made consumer keyed by exercise id.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use std::sync::{PoisonError, RwLock};

use im::OrdMap;

use crate::{
    domain::{Exercise, ExerciseId},
    Error,
};

/// What a mutation does to an exercise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Added,
    Updated,
    Removed,
}

/// Where a change is in its lifecycle.
#[derive(Debug, Clone, PartialEq)]
pub enum ChangePhase {
    /// Published before the write; the exercise as the caller expects it
    Pending(Exercise),
    /// The write committed; `None` when the exercise no longer exists
    Confirmed(Option<Exercise>),
    /// The write failed and nothing was applied
    RolledBack { reason: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct CacheChange {
    pub exercise_id: ExerciseId,
    pub kind: ChangeKind,
    pub phase: ChangePhase,
}

/// Receiver of optimistic cache changes.
pub trait CacheNotifier: Send + Sync {
    fn notify(&self, change: CacheChange);
}

impl<F> CacheNotifier for F
where
    F: Fn(CacheChange) + Send + Sync,
{
    fn notify(&self, change: CacheChange) {
        self(change);
    }
}

/// A published change waiting for the write to resolve.
///
/// Consumed by [`PendingChange::confirm`] or [`PendingChange::roll_back`],
/// so a change resolves at most once.
#[must_use = "a pending change must be confirmed or rolled back"]
pub struct PendingChange<'a> {
    notifier: &'a dyn CacheNotifier,
    exercise_id: ExerciseId,
    kind: ChangeKind,
}

impl<'a> PendingChange<'a> {
    /// Publish the optimistic value.
    pub fn publish(notifier: &'a dyn CacheNotifier, kind: ChangeKind, exercise: &Exercise) -> Self {
        notifier.notify(CacheChange {
            exercise_id: exercise.id.clone(),
            kind,
            phase: ChangePhase::Pending(exercise.clone()),
        });
        Self {
            notifier,
            exercise_id: exercise.id.clone(),
            kind,
        }
    }

    /// Report the committed value. A missing exercise is reported as removed.
    pub fn confirm(self, committed: Option<Exercise>) {
        let kind = if committed.is_none() {
            ChangeKind::Removed
        } else {
            self.kind
        };
        self.notifier.notify(CacheChange {
            exercise_id: self.exercise_id,
            kind,
            phase: ChangePhase::Confirmed(committed),
        });
    }

    pub fn roll_back(self, error: &Error) {
        self.notifier.notify(CacheChange {
            exercise_id: self.exercise_id,
            kind: self.kind,
            phase: ChangePhase::RolledBack {
                reason: error.to_string(),
            },
        });
    }
}

// ============================================================================
// EXERCISE CACHE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryStatus {
    /// Optimistic value, write still in flight
    Pending,
    /// Matches what the store committed
    Confirmed,
    /// The write failed; the value may not match the store
    NeedsReconcile,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CachedExercise {
    pub exercise: Exercise,
    pub status: EntryStatus,
}

/// In-memory exercise cache fed by [`CacheNotifier`] changes.
#[derive(Debug, Default)]
pub struct ExerciseCache {
    entries: RwLock<OrdMap<ExerciseId, CachedExercise>>,
}

impl ExerciseCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &ExerciseId) -> Option<CachedExercise> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    /// Consistent copy of every entry, in id order.
    pub fn snapshot(&self) -> OrdMap<ExerciseId, CachedExercise> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn apply(&self, change: CacheChange) {
        let mut entries = self
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        match change.phase {
            ChangePhase::Pending(exercise) => {
                entries.insert(
                    change.exercise_id,
                    CachedExercise {
                        exercise,
                        status: EntryStatus::Pending,
                    },
                );
            }
            ChangePhase::Confirmed(Some(exercise)) => {
                entries.insert(
                    change.exercise_id,
                    CachedExercise {
                        exercise,
                        status: EntryStatus::Confirmed,
                    },
                );
            }
            ChangePhase::Confirmed(None) => {
                entries.remove(&change.exercise_id);
            }
            ChangePhase::RolledBack { .. } => {
                if let Some(entry) = entries.get_mut(&change.exercise_id) {
                    entry.status = EntryStatus::NeedsReconcile;
                }
            }
        }
    }
}

impl CacheNotifier for ExerciseCache {
    fn notify(&self, change: CacheChange) {
        self.apply(change);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::domain::{ExerciseSet, SetId};

    fn exercise(reps: u32) -> Exercise {
        let id = ExerciseId::parse("2018-05-04_squat").expect("valid id");
        let set = ExerciseSet::new(SetId::new(id.clone(), 1).expect("valid"), reps, 80.0);
        Exercise::new(id, 1, vec![set], None).expect("valid exercise")
    }

    #[test]
    fn test_closure_receives_both_phases() {
        let seen = Mutex::new(Vec::new());
        let notifier = |change: CacheChange| {
            seen.lock().expect("lock").push(change);
        };

        let e = exercise(5);
        PendingChange::publish(&notifier, ChangeKind::Added, &e).confirm(Some(e.clone()));

        let seen = seen.into_inner().expect("lock");
        assert_eq!(seen.len(), 2);
        assert!(matches!(seen[0].phase, ChangePhase::Pending(_)));
        assert!(matches!(seen[1].phase, ChangePhase::Confirmed(Some(_))));
        assert_eq!(seen[1].kind, ChangeKind::Added);
    }

    #[test]
    fn test_confirm_none_reports_removed() {
        let cache = ExerciseCache::new();
        let e = exercise(5);
        PendingChange::publish(&cache, ChangeKind::Updated, &e).confirm(None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_cache_tracks_status() {
        let cache = ExerciseCache::new();
        let e = exercise(5);

        let pending = PendingChange::publish(&cache, ChangeKind::Added, &e);
        assert_eq!(cache.get(&e.id).map(|c| c.status), Some(EntryStatus::Pending));

        pending.confirm(Some(e.clone()));
        assert_eq!(cache.get(&e.id).map(|c| c.status), Some(EntryStatus::Confirmed));
    }

    #[test]
    fn test_rollback_keeps_value_but_flags_it() {
        let cache = ExerciseCache::new();
        let e = exercise(5);
        PendingChange::publish(&cache, ChangeKind::Added, &e)
            .roll_back(&Error::transaction_abort("add", "disk full"));

        let entry = cache.get(&e.id).expect("entry kept");
        assert_eq!(entry.status, EntryStatus::NeedsReconcile);
        assert_eq!(entry.exercise, e);
        assert_eq!(cache.snapshot().len(), 1);
    }
}
