//! services/api/src/adapters/db.rs
//!
//! This module contains the Postgres report store, a concrete implementation
//! of the `ReportStore` port from the `core` crate, backed by `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use onboarding_core::domain::{CompletionStatus, Report};
use onboarding_core::ports::{PortError, PortResult, ReportStore};
use sqlx::types::Json;
use sqlx::PgPool;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `ReportStore` port.
#[derive(Clone)]
pub struct PgReportStore {
    pool: PgPool,
}

impl PgReportStore {
    /// Creates a new `PgReportStore`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

fn status_label(status: CompletionStatus) -> &'static str {
    match status {
        CompletionStatus::Complete => "COMPLETE",
        CompletionStatus::Partial => "PARTIAL",
        CompletionStatus::Incomplete => "INCOMPLETE",
    }
}

//=========================================================================================
// `ReportStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl ReportStore for PgReportStore {
    async fn persist(&self, report: &Report) -> PortResult<()> {
        let created_at: DateTime<Utc> = report.timestamp;

        let result = sqlx::query(
            "INSERT INTO onboarding_reports \
             (id, company_name, user_data, transcript, validation_result, completion_status, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             ON CONFLICT (id) DO NOTHING",
        )
        .bind(&report.id)
        .bind(report.user_data.company_name.as_deref())
        .bind(Json(&report.user_data))
        .bind(Json(&report.transcript))
        .bind(report.validation_result.as_ref().map(Json))
        .bind(status_label(report.completion_status))
        .bind(created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        ensure_inserted(result.rows_affected(), &report.id)
    }
}

/// A conflicting id means another report already holds the row; this one was not stored.
fn ensure_inserted(rows_affected: u64, report_id: &str) -> PortResult<()> {
    if rows_affected == 0 {
        return Err(PortError::Unexpected(format!(
            "Report {} was not stored: a report with the same id already exists",
            report_id
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflicting_insert_is_reported() {
        let result = ensure_inserted(0, "onboarding-1700000000000");
        assert!(
            matches!(result, Err(PortError::Unexpected(message)) if message.contains("onboarding-1700000000000"))
        );
    }

    #[test]
    fn single_row_insert_succeeds() {
        assert!(ensure_inserted(1, "onboarding-1700000000000").is_ok());
    }
}
