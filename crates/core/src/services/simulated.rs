//! Simulated services.
//!
//! These stand in for the real EHR, OCR, NLP and matching back ends. Each waits for a fixed
//! delay (cancellable through the operation token) and then returns fixture data.

use super::{
    ConsentDelivery, DocumentExtractor, EhrService, MatchingService, ProcessingStage,
    StageCallback, TextExtractor,
};
use crate::consent::{ConsentMethod, SignatureArtifact};
use crate::error::ValidationError;
use crate::intake::{EhrRecord, EhrSystem, PartialPatient, UploadedDocument};
use crate::patient::Patient;
use crate::profile::MatchSelection;
use crate::task::{simulate_delay, OperationToken};
use crate::trial::{Trial, TrialCatalogue};
use crate::{WorkflowError, WorkflowResult};
use async_trait::async_trait;
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use std::time::Duration;

fn ehr_record(
    ehr_id: &str,
    name: &str,
    born: (i32, u32, u32),
    gender: &str,
    diagnosis: &str,
    mrn: &str,
) -> Option<EhrRecord> {
    Some(EhrRecord {
        ehr_id: ehr_id.to_string(),
        name: name.to_string(),
        date_of_birth: NaiveDate::from_ymd_opt(born.0, born.1, born.2)?,
        gender: gender.to_string(),
        primary_diagnosis: diagnosis.to_string(),
        mrn: mrn.to_string(),
    })
}

/// The records every simulated EHR system holds.
pub fn fixture_ehr_records() -> Vec<EhrRecord> {
    [
        ehr_record(
            "EHR-78912",
            "Jennifer Martinez",
            (1982, 4, 15),
            "Female",
            "Triple Negative Breast Cancer",
            "MRN-456123",
        ),
        ehr_record(
            "EHR-65432",
            "David Wilson",
            (1975, 11, 23),
            "Male",
            "Stage III Colon Cancer",
            "MRN-789456",
        ),
        ehr_record(
            "EHR-34567",
            "Amanda Thompson",
            (1990, 7, 8),
            "Female",
            "Hodgkin's Lymphoma",
            "MRN-321654",
        ),
    ]
    .into_iter()
    .flatten()
    .collect()
}

#[derive(Clone, Debug)]
pub struct SimulatedEhr {
    connect_delay: Duration,
    search_delay: Duration,
    records: Vec<EhrRecord>,
}

impl SimulatedEhr {
    pub fn new(connect_delay: Duration, search_delay: Duration) -> Self {
        Self {
            connect_delay,
            search_delay,
            records: fixture_ehr_records(),
        }
    }

    pub fn with_records(mut self, records: Vec<EhrRecord>) -> Self {
        self.records = records;
        self
    }
}

#[async_trait]
impl EhrService for SimulatedEhr {
    async fn connect(&self, system: EhrSystem, token: &OperationToken) -> WorkflowResult<()> {
        simulate_delay(self.connect_delay, token).await?;
        tracing::debug!(%system, "simulated EHR connected");
        Ok(())
    }

    async fn search_ehr(
        &self,
        system: EhrSystem,
        query: &str,
        token: &OperationToken,
    ) -> WorkflowResult<Vec<EhrRecord>> {
        simulate_delay(self.search_delay, token).await?;
        let results: Vec<EhrRecord> = self
            .records
            .iter()
            .filter(|r| r.matches(query))
            .cloned()
            .collect();
        tracing::debug!(%system, %query, results = results.len(), "simulated EHR search");
        Ok(results)
    }
}

/// OCR stand-in. Whatever is uploaded, it "reads" the same patient.
#[derive(Clone, Debug)]
pub struct SimulatedOcr {
    delay: Duration,
}

impl SimulatedOcr {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl DocumentExtractor for SimulatedOcr {
    async fn extract_from_documents(
        &self,
        files: &[UploadedDocument],
        token: &OperationToken,
    ) -> WorkflowResult<PartialPatient> {
        if files.is_empty() {
            return Err(ValidationError::NoDocuments.into());
        }
        simulate_delay(self.delay, token).await?;
        tracing::debug!(documents = files.len(), "simulated OCR finished");
        Ok(PartialPatient {
            name: Some("Alex Johnson".to_string()),
            age: Some(62),
            sex: None,
            diagnosis: Some("Metastatic Colorectal Cancer".to_string()),
        })
    }
}

static AGE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(\d{1,3})[\s-]*(?:yo|y/o|years?[\s-]+old)\b").expect("valid age regex")
});

static FEMALE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:woman|female|girl|lady)\b").expect("valid sex regex")
});

static MALE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:man|male|boy|gentleman)\b").expect("valid sex regex")
});

static NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i:name)\s*[:\-]\s*([A-Z][a-z]+(?:\s+[A-Z][a-z]+)+)").expect("valid name regex")
});

static DIAGNOSIS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:consistent with|diagnosed with|diagnosis of)\s+([a-z0-9][a-z0-9 '()+/-]*?)\s*(?:[.,;]|$)",
    )
    .expect("valid diagnosis regex")
});

/// Pattern-based [`TextExtractor`].
///
/// Picks up an age ("32 yo", "45-year-old"), a sex word, a "Name: First Last" label and the
/// phrase after "consistent with", "diagnosed with" or "diagnosis of". Anything it cannot find
/// is left empty.
#[derive(Clone, Debug, Default)]
pub struct PatternTextExtractor {
    delay: Duration,
}

impl PatternTextExtractor {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    pub fn extract(text: &str) -> PartialPatient {
        let age = AGE_RE
            .captures(text)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse::<u32>().ok());

        let sex = if FEMALE_RE.is_match(text) {
            Some("Female".to_string())
        } else if MALE_RE.is_match(text) {
            Some("Male".to_string())
        } else {
            None
        };

        let name = NAME_RE
            .captures(text)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string());

        let diagnosis = DIAGNOSIS_RE
            .captures(text)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim().to_string())
            .filter(|d| !d.is_empty());

        PartialPatient {
            name,
            age,
            sex,
            diagnosis,
        }
    }
}

#[async_trait]
impl TextExtractor for PatternTextExtractor {
    async fn analyze_text(
        &self,
        text: &str,
        token: &OperationToken,
    ) -> WorkflowResult<PartialPatient> {
        simulate_delay(self.delay, token).await?;
        let partial = Self::extract(text);
        tracing::debug!(?partial, "summary analysed");
        Ok(partial)
    }
}

/// Matching stand-in. Walks the processing stages, then returns the catalogue ranked by score.
#[derive(Clone, Debug)]
pub struct SimulatedMatching {
    delay: Duration,
    catalogue: TrialCatalogue,
}

impl SimulatedMatching {
    pub fn new(delay: Duration, catalogue: TrialCatalogue) -> Self {
        Self { delay, catalogue }
    }
}

#[async_trait]
impl MatchingService for SimulatedMatching {
    async fn match_trials(
        &self,
        patient: &Patient,
        selection: &MatchSelection,
        on_stage: StageCallback<'_>,
        token: &OperationToken,
    ) -> WorkflowResult<Vec<Trial>> {
        let per_stage = self.delay / ProcessingStage::ALL.len() as u32;
        for stage in ProcessingStage::ALL {
            token.check()?;
            on_stage(stage);
            tracing::debug!(patient_id = %patient.id, %stage, "matching stage");
            simulate_delay(per_stage, token).await?;
        }

        let trials = self.catalogue.ranked();
        if trials.is_empty() {
            return Err(WorkflowError::Fixture("trial catalogue is empty".into()));
        }
        tracing::debug!(
            patient_id = %patient.id,
            categories = selection.categories.len(),
            documents = selection.documents.len(),
            trials = trials.len(),
            "simulated matching finished"
        );
        Ok(trials)
    }
}

#[derive(Clone, Debug)]
pub struct SimulatedConsentDelivery {
    send_delay: Duration,
    response_delay: Duration,
    save_delay: Duration,
}

impl SimulatedConsentDelivery {
    pub fn new(send_delay: Duration, response_delay: Duration, save_delay: Duration) -> Self {
        Self {
            send_delay,
            response_delay,
            save_delay,
        }
    }
}

#[async_trait]
impl ConsentDelivery for SimulatedConsentDelivery {
    async fn send_consent(
        &self,
        patient: &Patient,
        method: ConsentMethod,
        destination: &str,
        token: &OperationToken,
    ) -> WorkflowResult<()> {
        simulate_delay(self.send_delay, token).await?;
        tracing::debug!(patient_id = %patient.id, %method, %destination, "e-consent sent");
        Ok(())
    }

    async fn await_response(&self, patient: &Patient, token: &OperationToken) -> WorkflowResult<()> {
        simulate_delay(self.response_delay, token).await?;
        tracing::debug!(patient_id = %patient.id, "e-consent completed by patient");
        Ok(())
    }

    async fn save_signature(
        &self,
        patient: &Patient,
        signature: &SignatureArtifact,
        token: &OperationToken,
    ) -> WorkflowResult<()> {
        simulate_delay(self.save_delay, token).await?;
        tracing::debug!(patient_id = %patient.id, bytes = signature.len(), "signature saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intake::quick_entry::EXAMPLE_SUMMARY;
    use crate::patient::ConsentStatus;
    use chrono::Utc;
    use std::sync::Mutex;

    fn patient() -> Patient {
        Patient::seeded(
            12845,
            "Sarah Johnson",
            54,
            "Breast Cancer (HER2+)",
            ConsentStatus::Consented,
            Utc::now(),
        )
    }

    #[test]
    fn test_extract_example_summary() {
        let partial = PatternTextExtractor::extract(EXAMPLE_SUMMARY);
        assert_eq!(partial.age, Some(32));
        assert_eq!(partial.sex.as_deref(), Some("Female"));
        assert_eq!(partial.diagnosis.as_deref(), Some("AVM"));
        assert_eq!(partial.name, None);
    }

    #[test]
    fn test_extract_labelled_name_and_male() {
        let partial = PatternTextExtractor::extract(
            "Name: David Wilson. 48-year-old man diagnosed with stage III colon cancer, \
             currently on FOLFOX.",
        );
        assert_eq!(partial.name.as_deref(), Some("David Wilson"));
        assert_eq!(partial.age, Some(48));
        assert_eq!(partial.sex.as_deref(), Some("Male"));
        assert_eq!(partial.diagnosis.as_deref(), Some("stage III colon cancer"));
    }

    #[test]
    fn test_extract_finds_nothing() {
        assert_eq!(
            PatternTextExtractor::extract("follow-up visit, no complaints today"),
            PartialPatient::default()
        );
    }

    #[tokio::test]
    async fn test_ehr_search_filters_fixtures() {
        let ehr = SimulatedEhr::new(Duration::ZERO, Duration::ZERO);
        let token = OperationToken::new();
        let found = ehr
            .search_ehr(EhrSystem::Epic, "wilson", &token)
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].mrn, "MRN-789456");

        let none = ehr
            .search_ehr(EhrSystem::Epic, "nobody", &token)
            .await
            .unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_ocr_returns_fixture_patient() {
        let ocr = SimulatedOcr::new(Duration::ZERO);
        let files = vec![UploadedDocument::new("report.pdf", 10, "application/pdf")];
        let partial = ocr
            .extract_from_documents(&files, &OperationToken::new())
            .await
            .unwrap();
        assert_eq!(partial.name.as_deref(), Some("Alex Johnson"));
        assert_eq!(partial.age, Some(62));
    }

    #[tokio::test(start_paused = true)]
    async fn test_matching_walks_stages_and_ranks() {
        let matching = SimulatedMatching::new(
            Duration::from_millis(3_500),
            TrialCatalogue::dashboard().unwrap(),
        );
        let seen = Mutex::new(Vec::new());
        let on_stage = |stage: ProcessingStage| seen.lock().unwrap().push(stage);

        let trials = matching
            .match_trials(
                &patient(),
                &MatchSelection::default(),
                &on_stage,
                &OperationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(seen.into_inner().unwrap(), ProcessingStage::ALL.to_vec());
        assert_eq!(trials.len(), 5);
        assert!(trials.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[tokio::test]
    async fn test_cancelled_matching_stops() {
        let matching =
            SimulatedMatching::new(Duration::ZERO, TrialCatalogue::dashboard().unwrap());
        let token = OperationToken::new();
        token.cancel();
        let result = matching
            .match_trials(&patient(), &MatchSelection::default(), &|_| {}, &token)
            .await;
        assert!(matches!(result, Err(WorkflowError::Cancelled)));
    }
}
