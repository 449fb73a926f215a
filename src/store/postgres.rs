//! Durable enrollment storage on Postgres.
//!
//! Correctness under true concurrency is delegated to the engine: the
//! (student_id, course_id) unique index is the final arbiter for creates,
//! and the version-conditioned UPDATE is the compare-and-swap for
//! transitions. No in-process lock is held.

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPool;
use sqlx::Row;
use uuid::Uuid;

use crate::domain::enrollment::{Enrollment, EnrollmentStatus};

use super::{EnrollmentStore, StoreError};

const SCHEMA_DDL: &str = "CREATE TABLE IF NOT EXISTS enrollments (
    id UUID PRIMARY KEY,
    student_id TEXT NOT NULL,
    course_id TEXT NOT NULL,
    status TEXT NOT NULL,
    version BIGINT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL,
    UNIQUE (student_id, course_id)
)";

/// Postgres-backed enrollment store.
pub struct PgEnrollmentStore {
    pool: PgPool,
}

impl PgEnrollmentStore {
    /// Connect and ensure the enrollments table exists.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPool::connect(database_url).await.map_err(backend)?;
        sqlx::query(SCHEMA_DDL)
            .execute(&pool)
            .await
            .map_err(backend)?;

        tracing::info!("✅ Connected to Postgres enrollment store");
        Ok(Self { pool })
    }

    fn decode_row(row: &sqlx::postgres::PgRow) -> Result<Enrollment, StoreError> {
        let status_raw: String = row.try_get("status").map_err(backend)?;
        let status: EnrollmentStatus = status_raw
            .parse()
            .map_err(|e: String| StoreError::Backend(anyhow!(e)))?;

        Ok(Enrollment {
            id: row.try_get("id").map_err(backend)?,
            student_id: row.try_get("student_id").map_err(backend)?,
            course_id: row.try_get("course_id").map_err(backend)?,
            status,
            version: row.try_get("version").map_err(backend)?,
            created_at: row
                .try_get::<DateTime<Utc>, _>("created_at")
                .map_err(backend)?,
            updated_at: row
                .try_get::<DateTime<Utc>, _>("updated_at")
                .map_err(backend)?,
        })
    }
}

fn backend(e: sqlx::Error) -> StoreError {
    StoreError::Backend(e.into())
}

#[async_trait::async_trait]
impl EnrollmentStore for PgEnrollmentStore {
    async fn create(&self, student_id: &str, course_id: &str) -> Result<Enrollment, StoreError> {
        let enrollment = Enrollment::new(student_id, course_id);

        let result = sqlx::query(
            "INSERT INTO enrollments (id, student_id, course_id, status, version, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(enrollment.id)
        .bind(&enrollment.student_id)
        .bind(&enrollment.course_id)
        .bind(enrollment.status.as_str())
        .bind(enrollment.version)
        .bind(enrollment.created_at)
        .bind(enrollment.updated_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(enrollment),
            // The unique index is the arbiter for racing creates.
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(StoreError::DuplicatePair {
                    student_id: student_id.to_string(),
                    course_id: course_id.to_string(),
                })
            }
            Err(e) => Err(backend(e)),
        }
    }

    async fn get(&self, id: Uuid) -> Result<Enrollment, StoreError> {
        let row = sqlx::query(
            "SELECT id, student_id, course_id, status, version, created_at, updated_at
             FROM enrollments WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        match row {
            Some(row) => Self::decode_row(&row),
            None => Err(StoreError::NotFound(id)),
        }
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

        // Write phase: engine-native compare-and-swap on the version column.
        let row = sqlx::query(
            "UPDATE enrollments
             SET status = $1, version = version + 1, updated_at = now()
             WHERE id = $2 AND version = $3
             RETURNING id, student_id, course_id, status, version, created_at, updated_at",
        )
        .bind(target.as_str())
        .bind(id)
        .bind(snapshot.version)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        match row {
            Some(row) => Self::decode_row(&row),
            // Zero rows: either the record vanished or another writer won
            // the race. A follow-up read tells the two apart.
            None => match self.get(id).await {
                Ok(current) => Err(StoreError::VersionConflict {
                    observed: snapshot.version,
                    current: current.version,
                }),
                Err(StoreError::NotFound(id)) => Err(StoreError::NotFound(id)),
                Err(e) => Err(e),
            },
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_carries_the_uniqueness_constraint() {
        // The pair constraint must be engine-native, not a read-then-write
        // check in this process.
        assert!(SCHEMA_DDL.contains("UNIQUE (student_id, course_id)"));
        assert!(SCHEMA_DDL.contains("version BIGINT NOT NULL"));
    }

    #[test]
    fn test_status_codec_round_trips_every_state() {
        for status in [
            EnrollmentStatus::Pending,
            EnrollmentStatus::Confirmed,
            EnrollmentStatus::Cancelled,
            EnrollmentStatus::Completed,
        ] {
            let parsed: EnrollmentStatus = status.as_str().parse().unwrap();
            assert_eq!(parsed, status);
        }
    }

    // Note: the following require integration testing against a live
    // Postgres instance and are intentionally not mocked here:
    // - create racing the unique index (one success, one DuplicatePair)
    // - transition's conditional UPDATE losing to a concurrent writer
    // - NotFound vs VersionConflict disambiguation after zero rows affected
    //
    // The memory store exercises the identical contract in-process; see
    // store::memory tests.
}
