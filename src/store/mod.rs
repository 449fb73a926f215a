use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::enrollment::{Enrollment, EnrollmentStatus};

// ============================================================================
// Enrollment Store - Persistence Contract
// ============================================================================
//
// The store is the sole writer of enrollment state. Implementations must
// make two things atomic to concurrent callers:
//
// 1. The (student_id, course_id) uniqueness check and the insert — two
//    racing creates for the same pair yield exactly one success.
// 2. The status transition conditioned on the version observed at read
//    time — two racing transitions from the same version yield exactly one
//    success; the loser sees a version conflict.
//
// The memory backend arbitrates both with a single write lock; the postgres
// backend delegates to the engine's unique index and conditional UPDATE.
//
// ============================================================================

mod memory;
mod postgres;

pub use memory::MemoryEnrollmentStore;
pub use postgres::PgEnrollmentStore;

/// Error type for store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("enrollment not found: {0}")]
    NotFound(Uuid),

    #[error("enrollment already exists for student {student_id} in course {course_id}")]
    DuplicatePair {
        student_id: String,
        course_id: String,
    },

    #[error("cannot transition to {target} from {current}")]
    StateConflict {
        current: EnrollmentStatus,
        target: EnrollmentStatus,
    },

    #[error("version conflict: observed {observed}, current {current}")]
    VersionConflict { observed: i64, current: i64 },

    #[error("storage backend failure")]
    Backend(#[from] anyhow::Error),
}

impl StoreError {
    /// Conflicts are guard or fence failures the caller may resolve by
    /// re-reading; everything else is not-found or a backend fault.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            Self::DuplicatePair { .. } | Self::StateConflict { .. } | Self::VersionConflict { .. }
        )
    }
}

/// Durable state for enrollment records.
///
/// `transition` reads the current record, verifies its status belongs to
/// `expected_current`, then writes `target` conditioned on the version
/// observed at read time. A successful write increments the version.
#[async_trait]
pub trait EnrollmentStore: Send + Sync {
    async fn create(&self, student_id: &str, course_id: &str) -> Result<Enrollment, StoreError>;

    async fn get(&self, id: Uuid) -> Result<Enrollment, StoreError>;

    async fn transition(
        &self,
        id: Uuid,
        expected_current: &[EnrollmentStatus],
        target: EnrollmentStatus,
    ) -> Result<Enrollment, StoreError>;
}
