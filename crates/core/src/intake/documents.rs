//! Document upload and OCR extraction.

use crate::constants::{UNKNOWN, UNKNOWN_AGE};
use crate::error::ValidationError;
use crate::intake::PartialPatient;
use crate::patient::{IntakeSource, PatientDraft};
use crate::{WorkflowError, WorkflowResult};
use serde::{Deserialize, Serialize};
use trialos_ids::DocumentId;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedDocument {
    pub id: DocumentId,
    pub name: String,
    pub size: u64,
    pub media_type: String,
}

impl UploadedDocument {
    pub fn new(name: impl Into<String>, size: u64, media_type: impl Into<String>) -> Self {
        Self {
            id: DocumentId::new(),
            name: name.into(),
            size,
            media_type: media_type.into(),
        }
    }

    pub fn display_size(&self) -> String {
        format_file_size(self.size)
    }
}

/// Human-readable file size using 1024-byte units, at most two decimals.
///
/// `0` is `"0 Bytes"`, `1536` is `"1.5 KB"`. Sizes beyond gigabytes are still shown in GB.
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let rounded = format!("{value:.2}");
    let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
    format!("{trimmed} {}", UNITS[unit])
}

/// Files staged in the upload view plus the result of the last extraction.
///
/// Adding or removing a file discards any extraction, so the extracted patient always reflects
/// exactly the files currently staged.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentUpload {
    files: Vec<UploadedDocument>,
    extracted: Option<PartialPatient>,
}

impl DocumentUpload {
    pub fn files(&self) -> &[UploadedDocument] {
        &self.files
    }

    pub fn extracted(&self) -> Option<&PartialPatient> {
        self.extracted.as_ref()
    }

    pub fn add(&mut self, files: Vec<UploadedDocument>) {
        self.files.extend(files);
        self.extracted = None;
    }

    pub fn remove(&mut self, id: DocumentId) -> WorkflowResult<UploadedDocument> {
        let index = self
            .files
            .iter()
            .position(|f| f.id == id)
            .ok_or_else(|| WorkflowError::NotFound(format!("document {id}")))?;
        self.extracted = None;
        Ok(self.files.remove(index))
    }

    /// Files to send for extraction.
    pub fn ready_for_extraction(&self) -> Result<Vec<UploadedDocument>, ValidationError> {
        if self.files.is_empty() {
            return Err(ValidationError::NoDocuments);
        }
        Ok(self.files.clone())
    }

    pub(crate) fn set_extracted(&mut self, extracted: PartialPatient) {
        self.extracted = Some(extracted);
    }

    /// The draft to admit once extraction has run.
    pub fn to_draft(&self) -> Result<PatientDraft, ValidationError> {
        if self.files.is_empty() {
            return Err(ValidationError::NoDocuments);
        }
        let extracted = self
            .extracted
            .as_ref()
            .ok_or(ValidationError::DocumentsNotProcessed)?;

        let source = IntakeSource::DocumentUpload {
            extracted_from: self.files.iter().map(|f| f.name.clone()).collect(),
            document_count: self.files.len(),
        };
        Ok(PatientDraft::new(
            extracted.name.clone().unwrap_or_else(|| UNKNOWN.to_string()),
            extracted.age.unwrap_or(UNKNOWN_AGE),
            extracted
                .diagnosis
                .clone()
                .unwrap_or_else(|| UNKNOWN.to_string()),
            source,
        )
        .with_sex(extracted.sex.clone().unwrap_or_default()))
    }
}
