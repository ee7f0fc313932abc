//! The four intake paths.
//!
//! Every path ends with a [`PatientDraft`](crate::patient::PatientDraft) that the workflow
//! controller admits to the roster as a pending patient. What differs is the input each path
//! validates and the state it keeps while the user works through it.

pub mod documents;
pub mod ehr;
pub mod form;
pub mod quick_entry;

use serde::{Deserialize, Serialize};

pub use documents::{format_file_size, DocumentUpload, UploadedDocument};
pub use ehr::{EhrImport, EhrRecord, EhrSystem};
pub use form::{FormStep, FormWizard, PatientForm};

/// Which intake path the user picked from the add-patient options.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum IntakeKind {
    Form,
    EhrImport,
    DocUpload,
    QuickEntry,
}

/// Whatever an extractor managed to recover about a patient. Every field may be missing.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialPatient {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sex: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnosis: Option<String>,
}
