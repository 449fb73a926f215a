use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::EnrollmentError;
use super::value_objects::EnrollmentStatus;

/// Longest accepted student/course identifier, in bytes.
pub const MAX_IDENTIFIER_LEN: usize = 128;

// ============================================================================
// Enrollment Entity - Domain State
// ============================================================================

/// One student's enrollment in one course.
///
/// `version` is the optimistic-concurrency fencing token: it starts at 0 and
/// increments on every successful status transition. The store is the sole
/// writer of this state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Enrollment {
    // Identity
    pub id: Uuid,
    pub student_id: String,
    pub course_id: String,

    // Current state
    pub status: EnrollmentStatus,
    pub version: i64,

    // Audit trail
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Enrollment {
    /// Construct a fresh Pending enrollment with a newly allocated id.
    ///
    /// Identifiers must already be validated; the store calls this after the
    /// uniqueness check has been arbitrated.
    pub fn new(student_id: &str, course_id: &str) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            student_id: student_id.to_string(),
            course_id: course_id.to_string(),
            status: EnrollmentStatus::Pending,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply a guarded transition target: set the status, bump the version,
    /// refresh the audit timestamp. Guard and fence checks happen in the
    /// store before this runs.
    pub fn apply_transition(&mut self, target: EnrollmentStatus) {
        self.status = target;
        self.version += 1;
        self.updated_at = Utc::now();
    }

    /// The (student_id, course_id) natural key.
    pub fn pair(&self) -> (String, String) {
        (self.student_id.clone(), self.course_id.clone())
    }
}

/// Validate caller-supplied identifiers before any storage round trip.
///
/// Well-formed means: non-empty after trimming ASCII whitespace, at most
/// `MAX_IDENTIFIER_LEN` bytes, no control characters.
pub fn validate_identifiers(student_id: &str, course_id: &str) -> Result<(), Vec<EnrollmentError>> {
    let mut errors = Vec::new();

    if let Err(e) = validate_identifier(student_id, "student_id", EnrollmentError::EmptyStudentId) {
        errors.push(e);
    }
    if let Err(e) = validate_identifier(course_id, "course_id", EnrollmentError::EmptyCourseId) {
        errors.push(e);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_identifier(
    value: &str,
    field: &'static str,
    empty_error: EnrollmentError,
) -> Result<(), EnrollmentError> {
    if value.trim().is_empty() {
        return Err(empty_error);
    }
    if value.len() > MAX_IDENTIFIER_LEN {
        return Err(EnrollmentError::IdentifierTooLong {
            field,
            limit: MAX_IDENTIFIER_LEN,
        });
    }
    if value.chars().any(|c| c.is_control()) {
        return Err(EnrollmentError::MalformedIdentifier { field });
    }
    Ok(())
}

// ============================================================================
// Unit Tests
// ============================================================================
