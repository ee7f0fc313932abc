//! Profile review: choosing which parts of a patient's record go to trial matching.
//!
//! The review starts with every data category and every timeline document included. The user
//! may switch any of them off, but matching can only proceed while at least one category or one
//! document is still selected.

use crate::error::ValidationError;
use crate::{WorkflowError, WorkflowResult};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use trialos_ids::PatientId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataCategory {
    Demographics,
    Diagnosis,
    Treatments,
    Labs,
    Genomics,
    ClinicalNotes,
}

impl DataCategory {
    pub const ALL: [DataCategory; 6] = [
        DataCategory::Demographics,
        DataCategory::Diagnosis,
        DataCategory::Treatments,
        DataCategory::Labs,
        DataCategory::Genomics,
        DataCategory::ClinicalNotes,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            DataCategory::Demographics => "Demographics",
            DataCategory::Diagnosis => "Diagnosis",
            DataCategory::Treatments => "Treatment History",
            DataCategory::Labs => "Laboratory Results",
            DataCategory::Genomics => "Genomic Profile",
            DataCategory::ClinicalNotes => "Clinical Notes",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    Note,
    Test,
    Procedure,
    Medication,
    Imaging,
}

/// One document on the patient's clinical timeline.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub id: String,
    #[serde(rename = "type")]
    pub entry_type: EntryType,
    pub title: String,
    pub description: String,
    pub date: NaiveDate,
    pub author: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    pub included: bool,
}

/// What the user chose to send to the matcher. Forwarded as-is.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchSelection {
    pub categories: Vec<DataCategory>,
    pub documents: Vec<String>,
}

impl MatchSelection {
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty() && self.documents.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileReview {
    patient: PatientId,
    categories: BTreeSet<DataCategory>,
    documents: Vec<TimelineEntry>,
}

impl ProfileReview {
    /// A review of `documents` with every category included. Each document keeps its own
    /// `included` flag.
    pub fn new(patient: PatientId, documents: Vec<TimelineEntry>) -> Self {
        Self {
            patient,
            categories: DataCategory::ALL.into_iter().collect(),
            documents,
        }
    }

    /// A review over the demo timeline.
    pub fn for_patient(patient: PatientId) -> Self {
        Self::new(patient, demo_timeline())
    }

    pub fn patient(&self) -> PatientId {
        self.patient
    }

    pub fn documents(&self) -> &[TimelineEntry] {
        &self.documents
    }

    pub fn is_category_included(&self, category: DataCategory) -> bool {
        self.categories.contains(&category)
    }

    pub fn set_category(&mut self, category: DataCategory, included: bool) {
        if included {
            self.categories.insert(category);
        } else {
            self.categories.remove(&category);
        }
    }

    /// Flips a category and returns its new state.
    pub fn toggle_category(&mut self, category: DataCategory) -> bool {
        let included = !self.is_category_included(category);
        self.set_category(category, included);
        included
    }

    /// Flips a document and returns its new state.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::NotFound`] if no document has this id.
    pub fn toggle_document(&mut self, id: &str) -> WorkflowResult<bool> {
        let entry = self
            .documents
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or_else(|| WorkflowError::NotFound(format!("document {id}")))?;
        entry.included = !entry.included;
        Ok(entry.included)
    }

    pub fn select_all(&mut self) {
        self.categories = DataCategory::ALL.into_iter().collect();
        self.documents.iter_mut().for_each(|d| d.included = true);
    }

    pub fn clear_all(&mut self) {
        self.categories.clear();
        self.documents.iter_mut().for_each(|d| d.included = false);
    }

    pub fn selection(&self) -> MatchSelection {
        MatchSelection {
            categories: self.categories.iter().copied().collect(),
            documents: self
                .documents
                .iter()
                .filter(|d| d.included)
                .map(|d| d.id.clone())
                .collect(),
        }
    }

    /// The selection to forward to matching.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptySelection`] when no category and no document is selected.
    pub fn proceed(&self) -> Result<MatchSelection, ValidationError> {
        let selection = self.selection();
        if selection.is_empty() {
            return Err(ValidationError::EmptySelection);
        }
        Ok(selection)
    }
}

fn entry(
    id: &str,
    entry_type: EntryType,
    title: &str,
    description: &str,
    date: (i32, u32, u32),
    author: &str,
    content: Option<&str>,
) -> Option<TimelineEntry> {
    Some(TimelineEntry {
        id: id.to_string(),
        entry_type,
        title: title.to_string(),
        description: description.to_string(),
        date: NaiveDate::from_ymd_opt(date.0, date.1, date.2)?,
        author: author.to_string(),
        content: content.map(str::to_string),
        included: true,
    })
}

/// The twelve-document demo timeline shown in profile review, newest first.
pub fn demo_timeline() -> Vec<TimelineEntry> {
    [
        entry(
            "medication-tamoxifen",
            EntryType::Medication,
            "Tamoxifen 20mg daily",
            "Adjuvant hormone therapy, current",
            (2024, 1, 8),
            "Dr. Smith, Oncology",
            None,
        ),
        entry(
            "medication-trastuzumab",
            EntryType::Medication,
            "Trastuzumab IV",
            "HER2-targeted therapy, completed",
            (2023, 12, 20),
            "Dr. Smith, Oncology",
            None,
        ),
        entry(
            "lab-cbc",
            EntryType::Test,
            "Complete Blood Count",
            "WBC: 5.2, RBC: 4.1, Hgb: 12.8, Plt: 210",
            (2023, 12, 4),
            "Oncology Lab",
            None,
        ),
        entry(
            "lab-chemistry",
            EntryType::Test,
            "Chemistry Panel and Tumor Markers",
            "Glucose: 92, Creatinine: 0.9, ALT: 25, AST: 28; CA 15-3: 22 (Normal range: <30)",
            (2023, 12, 4),
            "Oncology Lab",
            None,
        ),
        entry(
            "radiotherapy",
            EntryType::Procedure,
            "Radiotherapy",
            "Completed 30 sessions (2023-10-15 to 2023-11-25)",
            (2023, 11, 25),
            "Dr. Johnson, Radiation Oncology",
            None,
        ),
        entry(
            "clinicalNote1",
            EntryType::Note,
            "Oncology Follow-up",
            "Response to hormone therapy",
            (2023, 11, 15),
            "Dr. Smith, Oncology",
            Some(
                "Patient is responding well to hormone therapy. No significant side effects \
                 reported. Next follow-up scheduled in 3 months.",
            ),
        ),
        entry(
            "clinicalNote2",
            EntryType::Note,
            "Radiation Oncology Consult",
            "Radiotherapy plan and first session",
            (2023, 10, 5),
            "Dr. Johnson, Radiation Oncology",
            Some(
                "Radiotherapy initiated for right breast. Treatment plan: 30 sessions of 2 Gy \
                 each. Patient tolerated first session well with minimal skin reaction.",
            ),
        ),
        entry(
            "genomic-panel",
            EntryType::Test,
            "Tumor Genomic Profiling",
            "PIK3CA mutation positive; VUS PALB2 c.2748+1G>T; TMB low (3 mutations/Mb)",
            (2023, 9, 28),
            "Molecular Pathology",
            None,
        ),
        entry(
            "clinicalNote3",
            EntryType::Note,
            "Post-surgical Follow-up",
            "Healing and pathology review",
            (2023, 9, 15),
            "Dr. Miller, Surgical Oncology",
            Some(
                "Post-surgical follow-up shows good healing. Pathology confirmed clear margins. \
                 Sentinel lymph node negative for metastasis. Patient being referred to medical \
                 oncology for adjuvant therapy discussion.",
            ),
        ),
        entry(
            "procedure-lumpectomy",
            EntryType::Procedure,
            "Lumpectomy",
            "Right breast lumpectomy",
            (2023, 9, 10),
            "Dr. Miller, Surgical Oncology",
            None,
        ),
        entry(
            "procedure-slnb",
            EntryType::Procedure,
            "Sentinel Lymph Node Biopsy",
            "Performed with lumpectomy",
            (2023, 9, 10),
            "Dr. Miller, Surgical Oncology",
            None,
        ),
        entry(
            "imaging-mri",
            EntryType::Imaging,
            "Breast MRI",
            "Staging MRI, Stage II invasive ductal carcinoma, ER+/PR+/HER2+",
            (2023, 8, 15),
            "Radiology",
            None,
        ),
    ]
    .into_iter()
    .flatten()
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn review() -> ProfileReview {
        ProfileReview::for_patient(PatientId::from_number(12845))
    }

    #[test]
    fn test_demo_timeline_has_twelve_included_documents() {
        let timeline = demo_timeline();
        assert_eq!(timeline.len(), 12);
        assert!(timeline.iter().all(|d| d.included));
        assert!(timeline.windows(2).all(|w| w[0].date >= w[1].date));
        for kind in [
            EntryType::Note,
            EntryType::Test,
            EntryType::Procedure,
            EntryType::Medication,
            EntryType::Imaging,
        ] {
            assert!(timeline.iter().any(|d| d.entry_type == kind));
        }
    }

    #[test]
    fn test_everything_selected_by_default() {
        let selection = review().proceed().unwrap();
        assert_eq!(selection.categories, DataCategory::ALL.to_vec());
        assert_eq!(selection.documents.len(), 12);
    }

    #[test]
    fn test_nothing_selected_is_rejected() {
        let mut review = review();
        for category in DataCategory::ALL {
            assert!(!review.toggle_category(category));
        }
        for id in demo_timeline().iter().map(|d| d.id.clone()) {
            assert!(!review.toggle_document(&id).unwrap());
        }
        assert_eq!(review.proceed(), Err(ValidationError::EmptySelection));
    }

    #[test]
    fn test_one_document_is_enough() {
        let mut review = review();
        review.clear_all();
        assert!(review.proceed().is_err());

        review.toggle_document("clinicalNote2").unwrap();
        let selection = review.proceed().unwrap();
        assert!(selection.categories.is_empty());
        assert_eq!(selection.documents, vec!["clinicalNote2".to_string()]);
    }

    #[test]
    fn test_unknown_document() {
        assert!(matches!(
            review().toggle_document("nope"),
            Err(WorkflowError::NotFound(_))
        ));
    }

    #[test]
    fn test_select_all_restores_everything() {
        let mut review = review();
        review.clear_all();
        review.select_all();
        assert_eq!(review.selection().documents.len(), 12);
        assert!(review.is_category_included(DataCategory::Genomics));
    }

    #[test]
    fn test_entry_type_serializes_as_type() {
        let json = serde_json::to_value(&demo_timeline()[0]).unwrap();
        assert_eq!(json["type"], "medication");
        assert_eq!(json["date"], "2024-01-08");
    }
}
