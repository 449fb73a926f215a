//! In-memory enrollment storage.
//!
//! Reference implementation: a map behind one async lock. The write lock is
//! the single mutual-exclusion point, so the pair-uniqueness check plus
//! insert, and the fenced status write, are each atomic to concurrent
//! callers.

use std::collections::HashMap;

use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::enrollment::{Enrollment, EnrollmentStatus};

use super::{EnrollmentStore, StoreError};

#[derive(Default)]
struct Inner {
    enrollments: HashMap<Uuid, Enrollment>,
    // Natural-key index: (student_id, course_id) -> enrollment id
    pairs: HashMap<(String, String), Uuid>,
}

/// In-memory enrollment store.
pub struct MemoryEnrollmentStore {
    inner: RwLock<Inner>,
}

impl MemoryEnrollmentStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
        }
    }

    /// Write `target` conditioned on the version observed at read time.
    ///
    /// Re-reads under the write lock; any mutation since the snapshot bumped
    /// the version, so the fence check subsumes a status re-check.
    async fn apply_fenced(
        &self,
        id: Uuid,
        observed_version: i64,
        target: EnrollmentStatus,
    ) -> Result<Enrollment, StoreError> {
        let mut inner = self.inner.write().await;
        let enrollment = inner
            .enrollments
            .get_mut(&id)
            .ok_or(StoreError::NotFound(id))?;

        if enrollment.version != observed_version {
            return Err(StoreError::VersionConflict {
                observed: observed_version,
                current: enrollment.version,
            });
        }

        enrollment.apply_transition(target);
        Ok(enrollment.clone())
    }
}

impl Default for MemoryEnrollmentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl EnrollmentStore for MemoryEnrollmentStore {
    async fn create(&self, student_id: &str, course_id: &str) -> Result<Enrollment, StoreError> {
        let mut inner = self.inner.write().await;

        let key = (student_id.to_string(), course_id.to_string());
        if inner.pairs.contains_key(&key) {
            return Err(StoreError::DuplicatePair {
                student_id: student_id.to_string(),
                course_id: course_id.to_string(),
            });
        }

        let enrollment = Enrollment::new(student_id, course_id);
        inner.pairs.insert(enrollment.pair(), enrollment.id);
        inner.enrollments.insert(enrollment.id, enrollment.clone());

        Ok(enrollment)
    }

    async fn get(&self, id: Uuid) -> Result<Enrollment, StoreError> {
        let inner = self.inner.read().await;
        inner
            .enrollments
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }

    async fn transition(
        &self,
        id: Uuid,
        expected_current: &[EnrollmentStatus],
        target: EnrollmentStatus,
    ) -> Result<Enrollment, StoreError> {
        // Read phase: snapshot status and version.
        let snapshot = self.get(id).await?;

        if !expected_current.contains(&snapshot.status) {
            return Err(StoreError::StateConflict {
                current: snapshot.status,
                target,
            });
        }

        // Write phase: conditional on the version observed above.
        self.apply_fenced(id, snapshot.version, target).await
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use futures_util::future::join_all;

    use crate::domain::enrollment::EnrollmentCommand;

    use super::*;

    async fn transition_cmd(
        store: &MemoryEnrollmentStore,
        id: Uuid,
        cmd: EnrollmentCommand,
    ) -> Result<Enrollment, StoreError> {
        store.transition(id, cmd.expected_current(), cmd.target()).await
    }

    #[tokio::test]
    async fn test_create_then_get() {
        let store = MemoryEnrollmentStore::new();
        let created = store.create("s-1", "c-1").await.unwrap();

        assert_eq!(created.status, EnrollmentStatus::Pending);
        assert_eq!(created.version, 0);

        let fetched = store.get(created.id).await.unwrap();
        assert_eq!(fetched.id, created.id);
        assert_eq!(fetched.student_id, "s-1");
        assert_eq!(fetched.course_id, "c-1");
    }

    #[tokio::test]
    async fn test_get_unknown_id_is_not_found() {
        let store = MemoryEnrollmentStore::new();
        let missing = Uuid::new_v4();

        match store.get(missing).await {
            Err(StoreError::NotFound(id)) => assert_eq!(id, missing),
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_duplicate_pair_is_rejected() {
        let store = MemoryEnrollmentStore::new();
        store.create("s-1", "c-1").await.unwrap();

        match store.create("s-1", "c-1").await {
            Err(StoreError::DuplicatePair { .. }) => {}
            other => panic!("expected DuplicatePair, got {other:?}"),
        }

        // Different pairs are unaffected
        store.create("s-1", "c-2").await.unwrap();
        store.create("s-2", "c-1").await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_concurrent_creates_yield_exactly_one_success() {
        let store = Arc::new(MemoryEnrollmentStore::new());

        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.create("s-race", "c-race").await })
            })
            .collect();

        let results = join_all(tasks).await;
        let mut successes = 0;
        let mut duplicates = 0;
        for result in results {
            match result.unwrap() {
                Ok(_) => successes += 1,
                Err(StoreError::DuplicatePair { .. }) => duplicates += 1,
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }

        assert_eq!(successes, 1);
        assert_eq!(duplicates, 15);
    }

    #[tokio::test]
    async fn test_confirm_moves_pending_to_confirmed() {
        let store = MemoryEnrollmentStore::new();
        let created = store.create("s-1", "c-1").await.unwrap();

        let confirmed = transition_cmd(&store, created.id, EnrollmentCommand::Confirm)
            .await
            .unwrap();

        assert_eq!(confirmed.status, EnrollmentStatus::Confirmed);
        assert_eq!(confirmed.version, 1);
    }

    #[tokio::test]
    async fn test_second_confirm_is_a_state_conflict() {
        let store = MemoryEnrollmentStore::new();
        let created = store.create("s-1", "c-1").await.unwrap();

        transition_cmd(&store, created.id, EnrollmentCommand::Confirm)
            .await
            .unwrap();

        match transition_cmd(&store, created.id, EnrollmentCommand::Confirm).await {
            Err(StoreError::StateConflict { current, .. }) => {
                assert_eq!(current, EnrollmentStatus::Confirmed)
            }
            other => panic!("expected StateConflict, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_cancel_after_confirm_then_cancel_again_conflicts() {
        let store = MemoryEnrollmentStore::new();
        let created = store.create("s-1", "c-1").await.unwrap();

        transition_cmd(&store, created.id, EnrollmentCommand::Confirm)
            .await
            .unwrap();
        let cancelled = transition_cmd(&store, created.id, EnrollmentCommand::Cancel)
            .await
            .unwrap();
        assert_eq!(cancelled.status, EnrollmentStatus::Cancelled);
        assert_eq!(cancelled.version, 2);

        match transition_cmd(&store, created.id, EnrollmentCommand::Cancel).await {
            Err(StoreError::StateConflict { .. }) => {}
            other => panic!("expected StateConflict, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_confirm_after_cancel_leaves_record_cancelled() {
        let store = MemoryEnrollmentStore::new();
        let created = store.create("s-1", "c-1").await.unwrap();

        transition_cmd(&store, created.id, EnrollmentCommand::Cancel)
            .await
            .unwrap();

        match transition_cmd(&store, created.id, EnrollmentCommand::Confirm).await {
            Err(StoreError::StateConflict { .. }) => {}
            other => panic!("expected StateConflict, got {other:?}"),
        }

        let current = store.get(created.id).await.unwrap();
        assert_eq!(current.status, EnrollmentStatus::Cancelled);
        assert_eq!(current.version, 1);
    }

    #[tokio::test]
    async fn test_transition_on_unknown_id_is_not_found() {
        let store = MemoryEnrollmentStore::new();

        match transition_cmd(&store, Uuid::new_v4(), EnrollmentCommand::Confirm).await {
            Err(StoreError::NotFound(_)) => {}
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_cancel_rejects_seeded_completed_row() {
        let store = MemoryEnrollmentStore::new();

        // A durable dataset may already hold the reserved terminal state.
        let mut completed = Enrollment::new("s-done", "c-done");
        completed.apply_transition(EnrollmentStatus::Completed);
        let id = completed.id;
        {
            let mut inner = store.inner.write().await;
            inner.pairs.insert(completed.pair(), id);
            inner.enrollments.insert(id, completed);
        }

        match transition_cmd(&store, id, EnrollmentCommand::Cancel).await {
            Err(StoreError::StateConflict { current, .. }) => {
                assert_eq!(current, EnrollmentStatus::Completed)
            }
            other => panic!("expected StateConflict, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_stale_version_write_is_fenced() {
        let store = MemoryEnrollmentStore::new();
        let created = store.create("s-1", "c-1").await.unwrap();

        // Another writer commits between our read and our write.
        transition_cmd(&store, created.id, EnrollmentCommand::Confirm)
            .await
            .unwrap();

        match store
            .apply_fenced(created.id, created.version, EnrollmentStatus::Cancelled)
            .await
        {
            Err(StoreError::VersionConflict { observed, current }) => {
                assert_eq!(observed, 0);
                assert_eq!(current, 1);
            }
            other => panic!("expected VersionConflict, got {other:?}"),
        }

        // The losing write left the record untouched.
        let unchanged = store.get(created.id).await.unwrap();
        assert_eq!(unchanged.status, EnrollmentStatus::Confirmed);
        assert_eq!(unchanged.version, 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_racing_confirms_yield_exactly_one_success() {
        let store = Arc::new(MemoryEnrollmentStore::new());
        let created = store.create("s-race", "c-race").await.unwrap();

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                let id = created.id;
                tokio::spawn(async move {
                    store
                        .transition(
                            id,
                            EnrollmentCommand::Confirm.expected_current(),
                            EnrollmentCommand::Confirm.target(),
                        )
                        .await
                })
            })
            .collect();

        let results = join_all(tasks).await;
        let mut successes = 0;
        for result in results {
            match result.unwrap() {
                Ok(e) => {
                    successes += 1;
                    assert_eq!(e.status, EnrollmentStatus::Confirmed);
                }
                Err(e) => assert!(e.is_conflict(), "unexpected error: {e:?}"),
            }
        }
        assert_eq!(successes, 1);

        // Final state is Confirmed at version 1, not corrupted by losers.
        let current = store.get(created.id).await.unwrap();
        assert_eq!(current.status, EnrollmentStatus::Confirmed);
        assert_eq!(current.version, 1);
    }
}
