//! EHR import: connect to a hospital system, search it, pick a record.

use crate::error::ValidationError;
use crate::patient::{age_on, IntakeSource, PatientDraft};
use crate::{WorkflowError, WorkflowResult};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EhrSystem {
    Epic,
    Cerner,
    Allscripts,
    Athenahealth,
}

impl EhrSystem {
    pub const ALL: [EhrSystem; 4] = [
        EhrSystem::Epic,
        EhrSystem::Cerner,
        EhrSystem::Allscripts,
        EhrSystem::Athenahealth,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            EhrSystem::Epic => "Epic",
            EhrSystem::Cerner => "Cerner",
            EhrSystem::Allscripts => "Allscripts",
            EhrSystem::Athenahealth => "Athenahealth",
        }
    }
}

impl fmt::Display for EhrSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EhrSystem {
    type Err = WorkflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|system| system.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| WorkflowError::InvalidInput(format!("unknown EHR system '{wanted}'")))
    }
}

/// A patient record as returned by an EHR search.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EhrRecord {
    pub ehr_id: String,
    pub name: String,
    pub date_of_birth: NaiveDate,
    pub gender: String,
    pub primary_diagnosis: String,
    pub mrn: String,
}

impl EhrRecord {
    /// Case-insensitive substring match on name, EHR id, MRN or diagnosis.
    pub fn matches(&self, query: &str) -> bool {
        let needle = query.trim().to_lowercase();
        [
            &self.name,
            &self.ehr_id,
            &self.mrn,
            &self.primary_diagnosis,
        ]
        .iter()
        .any(|field| field.to_lowercase().contains(&needle))
    }

    /// The draft admitted when this record is imported. Age is computed on `today`.
    pub fn to_draft(&self, today: NaiveDate) -> PatientDraft {
        PatientDraft::new(
            self.name.clone(),
            age_on(Some(self.date_of_birth), today),
            self.primary_diagnosis.clone(),
            IntakeSource::EhrImport {
                ehr_id: self.ehr_id.clone(),
                mrn: self.mrn.clone(),
            },
        )
        .with_sex(self.gender.clone())
    }
}

/// Trims a search query, rejecting blank ones.
pub fn validate_query(query: &str) -> Result<String, ValidationError> {
    let query = query.trim();
    if query.is_empty() {
        return Err(ValidationError::EmptyQuery);
    }
    Ok(query.to_string())
}

/// Progress through the EHR import view.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EhrImport {
    connected: Option<EhrSystem>,
    last_query: Option<String>,
    results: Vec<EhrRecord>,
}

impl EhrImport {
    pub fn connected(&self) -> Option<EhrSystem> {
        self.connected
    }

    pub fn last_query(&self) -> Option<&str> {
        self.last_query.as_deref()
    }

    pub fn results(&self) -> &[EhrRecord] {
        &self.results
    }

    /// Switching systems drops results from the previous one.
    pub(crate) fn set_connected(&mut self, system: EhrSystem) {
        if self.connected != Some(system) {
            self.last_query = None;
            self.results.clear();
        }
        self.connected = Some(system);
    }

    pub(crate) fn set_results(&mut self, query: String, results: Vec<EhrRecord>) {
        self.last_query = Some(query);
        self.results = results;
    }

    /// Looks up a record from the latest search results.
    pub fn record(&self, ehr_id: &str) -> WorkflowResult<&EhrRecord> {
        self.results
            .iter()
            .find(|r| r.ehr_id == ehr_id)
            .ok_or_else(|| WorkflowError::NotFound(format!("EHR record {ehr_id}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> EhrRecord {
        EhrRecord {
            ehr_id: "EHR-78912".into(),
            name: "Jennifer Martinez".into(),
            date_of_birth: NaiveDate::from_ymd_opt(1982, 4, 15).unwrap(),
            gender: "Female".into(),
            primary_diagnosis: "Triple Negative Breast Cancer".into(),
            mrn: "MRN-456123".into(),
        }
    }

    #[test]
    fn test_system_from_str_is_case_insensitive() {
        assert_eq!("epic".parse::<EhrSystem>().unwrap(), EhrSystem::Epic);
        assert_eq!(
            " ATHENAHEALTH ".parse::<EhrSystem>().unwrap(),
            EhrSystem::Athenahealth
        );
        assert!("meditech".parse::<EhrSystem>().is_err());
    }

    #[test]
    fn test_validate_query() {
        assert_eq!(validate_query("   "), Err(ValidationError::EmptyQuery));
        assert_eq!(validate_query(" martinez ").unwrap(), "martinez");
    }

    #[test]
    fn test_record_matching() {
        let record = record();
        assert!(record.matches("jennifer"));
        assert!(record.matches("mrn-456"));
        assert!(record.matches("triple negative"));
        assert!(!record.matches("wilson"));
    }

    #[test]
    fn test_draft_keeps_ehr_identifiers() {
        let today = NaiveDate::from_ymd_opt(2024, 4, 14).unwrap();
        let draft = record().to_draft(today);
        assert_eq!(draft.age, 41);
        assert_eq!(draft.sex, "Female");
        assert_eq!(
            draft.source,
            IntakeSource::EhrImport {
                ehr_id: "EHR-78912".into(),
                mrn: "MRN-456123".into()
            }
        );
    }

    #[test]
    fn test_reconnecting_elsewhere_clears_results() {
        let mut import = EhrImport::default();
        import.set_connected(EhrSystem::Epic);
        import.set_results("jen".into(), vec![record()]);
        assert!(import.record("EHR-78912").is_ok());

        import.set_connected(EhrSystem::Epic);
        assert_eq!(import.results().len(), 1);

        import.set_connected(EhrSystem::Cerner);
        assert!(import.results().is_empty());
        assert!(matches!(
            import.record("EHR-78912"),
            Err(WorkflowError::NotFound(_))
        ));
    }
}
