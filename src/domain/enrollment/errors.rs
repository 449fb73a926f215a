// ============================================================================
// Enrollment Business Rule Errors
// ============================================================================

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum EnrollmentError {
    #[error("student_id must be a non-empty identifier")]
    EmptyStudentId,

    #[error("course_id must be a non-empty identifier")]
    EmptyCourseId,

    #[error("{field} exceeds the {limit}-byte identifier limit")]
    IdentifierTooLong { field: &'static str, limit: usize },

    #[error("{field} contains control characters")]
    MalformedIdentifier { field: &'static str },
}
