use crate::modules::bulk_import::core::job::ImportMode;
use crate::shared::core::envelope::{EventPayload, PayloadError};
use serde::{Deserialize, Serialize};

/// Payload of `product.bulk.import.job.created`, published by this service when an import
/// is submitted or retried.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportJobCreated {
    pub job_id: String,
    #[serde(alias = "filePath")]
    pub source_ref: String,
    pub total_rows: u64,
    pub mode: ImportMode,
}

impl EventPayload for ImportJobCreated {
    fn validate(&self) -> Result<(), PayloadError> {
        if self.job_id.trim().is_empty() {
            return Err(PayloadError::InvalidField {
                field: "jobId",
                reason: "must not be empty".into(),
            });
        }
        if self.source_ref.trim().is_empty() {
            return Err(PayloadError::InvalidField {
                field: "sourceRef",
                reason: "must not be empty".into(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod import_job_created_tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn it_should_accept_a_file_path_as_source_reference() {
        let payload: ImportJobCreated = serde_json::from_value(serde_json::json!({
            "jobId": "job-1",
            "filePath": "/uploads/products.xlsx",
            "totalRows": 12,
            "mode": "all-or-nothing"
        }))
        .unwrap();
        assert_eq!(payload.source_ref, "/uploads/products.xlsx");
        assert_eq!(payload.mode, ImportMode::AllOrNothing);
        assert_eq!(payload.validate(), Ok(()));
    }

    #[rstest]
    fn it_should_reject_a_blank_job_id() {
        let payload = ImportJobCreated {
            job_id: " ".into(),
            source_ref: "staged/1".into(),
            total_rows: 1,
            mode: ImportMode::PartialImport,
        };
        assert!(matches!(
            payload.validate(),
            Err(PayloadError::InvalidField { field: "jobId", .. })
        ));
    }
}
