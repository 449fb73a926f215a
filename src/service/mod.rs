use std::sync::Arc;

use uuid::Uuid;

use crate::domain::enrollment::{
    validate_identifiers, Enrollment, EnrollmentCommand, EnrollmentError,
};
use crate::metrics::Metrics;
use crate::store::{EnrollmentStore, StoreError};

// ============================================================================
// Enrollment Service
// ============================================================================
//
// Thin orchestration over the store: validate identifiers before any storage
// round trip, invoke the store, translate outcomes. Every conflict kind
// (duplicate pair, wrong source state, lost version race) collapses into one
// caller-facing conflict class; the subtype survives only in logs and
// metrics, never in the public error shape.
//
// ============================================================================

/// Error type at the service boundary.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("invalid identifiers")]
    Validation(Vec<EnrollmentError>),

    #[error("enrollment not found: {0}")]
    NotFound(Uuid),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => Self::NotFound(id),
            StoreError::Backend(e) => Self::Internal(e),
            conflict => Self::Conflict(conflict.to_string()),
        }
    }
}

impl ServiceError {
    fn outcome(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::NotFound(_) => "not_found",
            Self::Conflict(_) => "conflict",
            Self::Internal(_) => "error",
        }
    }
}

pub struct EnrollmentService {
    store: Arc<dyn EnrollmentStore>,
    metrics: Arc<Metrics>,
}

impl EnrollmentService {
    pub fn new(store: Arc<dyn EnrollmentStore>, metrics: Arc<Metrics>) -> Self {
        Self { store, metrics }
    }

    /// Create a Pending enrollment for a (student, course) pair.
    pub async fn create(
        &self,
        student_id: &str,
        course_id: &str,
    ) -> Result<Enrollment, ServiceError> {
        // Fail fast on malformed input without a storage round trip.
        if let Err(errors) = validate_identifiers(student_id, course_id) {
            let err = ServiceError::Validation(errors);
            self.metrics.record_operation("create", err.outcome());
            return Err(err);
        }

        let result = self.store.create(student_id, course_id).await;
        self.finish("create", result.map_err(Into::into))
    }

    /// Fetch an enrollment snapshot by id.
    pub async fn get(&self, id: Uuid) -> Result<Enrollment, ServiceError> {
        let result = self.store.get(id).await;
        self.finish("get", result.map_err(Into::into))
    }

    /// Confirm a Pending enrollment.
    pub async fn confirm(&self, id: Uuid) -> Result<Enrollment, ServiceError> {
        self.apply(id, EnrollmentCommand::Confirm).await
    }

    /// Cancel a non-terminal enrollment.
    pub async fn cancel(&self, id: Uuid) -> Result<Enrollment, ServiceError> {
        self.apply(id, EnrollmentCommand::Cancel).await
    }

    async fn apply(&self, id: Uuid, command: EnrollmentCommand) -> Result<Enrollment, ServiceError> {
        let result = self
            .store
            .transition(id, command.expected_current(), command.target())
            .await;
        self.finish(command.name(), result.map_err(Into::into))
    }

    fn finish(
        &self,
        operation: &str,
        result: Result<Enrollment, ServiceError>,
    ) -> Result<Enrollment, ServiceError> {
        match &result {
            Ok(enrollment) => {
                self.metrics.record_operation(operation, "success");
                tracing::info!(
                    enrollment_id = %enrollment.id,
                    status = %enrollment.status,
                    version = enrollment.version,
                    "Enrollment {} succeeded",
                    operation
                );
            }
            Err(err) => {
                self.metrics.record_operation(operation, err.outcome());
                tracing::info!(outcome = err.outcome(), "Enrollment {} rejected: {}", operation, err);
            }
        }
        result
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
