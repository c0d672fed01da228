//! services/api/src/adapters/file_store.rs
//!
//! A `ReportStore` that writes the latest report to a local JSON file, for
//! deployments without a database.

use async_trait::async_trait;
use onboarding_core::domain::Report;
use onboarding_core::ports::{PortError, PortResult, ReportStore};
use serde::Serialize;
use std::path::PathBuf;
use tracing::debug;

#[derive(Serialize)]
struct ReportDocument<'a> {
    report: &'a Report,
}

/// Overwrites `path` with `{"report": ...}` on every persist.
#[derive(Clone, Debug)]
pub struct JsonFileReportStore {
    path: PathBuf,
}

impl JsonFileReportStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

#[async_trait]
impl ReportStore for JsonFileReportStore {
    async fn persist(&self, report: &Report) -> PortResult<()> {
        let body = serde_json::to_vec(&ReportDocument { report })
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        tokio::fs::write(&self.path, body)
            .await
            .map_err(|e| PortError::Unexpected(format!("{}: {}", self.path.display(), e)))?;

        debug!("Wrote report {} to {}", report.id, self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use onboarding_core::domain::CompletionStatus;
    use onboarding_core::{DataField, OnboardingData};

    #[tokio::test]
    async fn report_is_wrapped_and_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileReportStore::new(dir.path().join("onboarding.json"));

        let first = Report::new(OnboardingData::new(), Vec::new(), None, CompletionStatus::Complete);
        store.persist(&first).await.unwrap();
        let second = Report::new(
            OnboardingData::new().with(DataField::CompanyName, "Ballymoyle"),
            Vec::new(),
            None,
            CompletionStatus::Complete,
        );
        store.persist(&second).await.unwrap();

        let written: serde_json::Value =
            serde_json::from_slice(&std::fs::read(store.path()).unwrap()).unwrap();
        assert_eq!(written["report"]["userData"]["companyName"], "Ballymoyle");
        assert_eq!(written["report"]["completionStatus"], "COMPLETE");
    }

    #[tokio::test]
    async fn unwritable_path_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileReportStore::new(dir.path().join("missing").join("onboarding.json"));

        let report = Report::new(OnboardingData::new(), Vec::new(), None, CompletionStatus::Complete);
        assert!(store.persist(&report).await.is_err());
    }
}
