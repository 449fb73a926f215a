use super::value_objects::EnrollmentStatus;

// ============================================================================
// Enrollment Commands - Represent caller intent
// ============================================================================
//
// Each command carries its transition guard: the set of statuses it may be
// applied from, and the status it produces. The store checks membership and
// performs the version-fenced write; the tables below are the single source
// of truth for the lifecycle state machine.
//
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnrollmentCommand {
    Confirm,
    Cancel,
}

impl EnrollmentCommand {
    /// Statuses this command may be applied from.
    pub fn expected_current(&self) -> &'static [EnrollmentStatus] {
        match self {
            // Confirm is not idempotent: only a Pending enrollment confirms.
            Self::Confirm => &[EnrollmentStatus::Pending],
            // Cancel admits every non-terminal state.
            Self::Cancel => &[EnrollmentStatus::Pending, EnrollmentStatus::Confirmed],
        }
    }

    /// Status a successful application produces.
    pub fn target(&self) -> EnrollmentStatus {
        match self {
            Self::Confirm => EnrollmentStatus::Confirmed,
            Self::Cancel => EnrollmentStatus::Cancelled,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Confirm => "confirm",
            Self::Cancel => "cancel",
        }
    }
}
