//! Assignment audit trail and its CSV export.
//!
//! The admission engine appends a record whenever a subject enters a
//! facility and closes it on release. The log is consumed by reporting
//! collaborators only; the admission algorithm never reads it.

use std::io::Write;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::admission::{FacilityId, SubjectId};

/// One subject-to-facility assignment with entry and release timestamps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentRecord {
    pub subject_id: SubjectId,
    pub facility_id: FacilityId,
    pub admitted_at: DateTime<Utc>,
    pub released_at: Option<DateTime<Utc>>,
}

impl AssignmentRecord {
    pub fn is_open(&self) -> bool {
        self.released_at.is_none()
    }
}

/// Error raised while serializing the assignment log.
#[derive(Debug, thiserror::Error)]
pub enum HistoryExportError {
    #[error("failed to write history csv: {0}")]
    Csv(#[from] csv::Error),
    #[error("history csv was not valid utf-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),
}

/// Write the assignment log as CSV to any writer. The record format is a
/// collaborator concern; this is the reference export used by the CLI and
/// the history endpoint.
pub fn write_history_csv<W: Write>(
    records: &[AssignmentRecord],
    writer: W,
) -> Result<(), HistoryExportError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(["subject_id", "facility_id", "admitted_at", "released_at"])?;
    for record in records {
        csv_writer.write_record([
            record.subject_id.0.as_str(),
            record.facility_id.0.as_str(),
            &record.admitted_at.to_rfc3339(),
            &record
                .released_at
                .map(|released| released.to_rfc3339())
                .unwrap_or_else(|| "still_held".to_string()),
        ])?;
    }
    csv_writer.flush().map_err(csv::Error::from)?;
    Ok(())
}

/// Render the assignment log as an in-memory CSV string.
pub fn history_csv(records: &[AssignmentRecord]) -> Result<String, HistoryExportError> {
    let mut buffer = Vec::new();
    write_history_csv(records, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}
