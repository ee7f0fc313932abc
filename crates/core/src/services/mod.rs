//! External services the workflow depends on.
//!
//! Each service is an async trait so a session can run against the simulated implementations in
//! [`simulated`] or against deterministic fakes in tests. Every call takes the
//! [`OperationToken`] of the operation it belongs to and should stop early once that token is
//! cancelled.

pub mod simulated;

use crate::config::CoreConfig;
use crate::consent::{ConsentMethod, SignatureArtifact};
use crate::intake::{EhrRecord, EhrSystem, PartialPatient, UploadedDocument};
use crate::patient::Patient;
use crate::profile::MatchSelection;
use crate::task::OperationToken;
use crate::trial::{Trial, TrialCatalogue};
use crate::WorkflowResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

pub use simulated::{
    PatternTextExtractor, SimulatedConsentDelivery, SimulatedEhr, SimulatedMatching, SimulatedOcr,
};

#[async_trait]
pub trait EhrService: Send + Sync {
    async fn connect(&self, system: EhrSystem, token: &OperationToken) -> WorkflowResult<()>;

    async fn search_ehr(
        &self,
        system: EhrSystem,
        query: &str,
        token: &OperationToken,
    ) -> WorkflowResult<Vec<EhrRecord>>;
}

#[async_trait]
pub trait DocumentExtractor: Send + Sync {
    async fn extract_from_documents(
        &self,
        files: &[UploadedDocument],
        token: &OperationToken,
    ) -> WorkflowResult<PartialPatient>;
}

/// Turns a free-text summary into whatever patient details it can find.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn analyze_text(&self, text: &str, token: &OperationToken)
        -> WorkflowResult<PartialPatient>;
}

/// Called as the matcher moves from one stage to the next.
pub type StageCallback<'a> = &'a (dyn Fn(ProcessingStage) + Send + Sync);

/// Finds candidate trials for a patient.
///
/// Implementations must return a non-empty list sorted by descending score, each trial carrying
/// its full eligibility partition.
#[async_trait]
pub trait MatchingService: Send + Sync {
    async fn match_trials(
        &self,
        patient: &Patient,
        selection: &MatchSelection,
        on_stage: StageCallback<'_>,
        token: &OperationToken,
    ) -> WorkflowResult<Vec<Trial>>;
}

#[async_trait]
pub trait ConsentDelivery: Send + Sync {
    async fn send_consent(
        &self,
        patient: &Patient,
        method: ConsentMethod,
        destination: &str,
        token: &OperationToken,
    ) -> WorkflowResult<()>;

    /// Resolves once the patient has completed the form.
    async fn await_response(&self, patient: &Patient, token: &OperationToken)
        -> WorkflowResult<()>;

    async fn save_signature(
        &self,
        patient: &Patient,
        signature: &SignatureArtifact,
        token: &OperationToken,
    ) -> WorkflowResult<()>;
}

/// The four stages shown while matching runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStage {
    RetrievingEhrData,
    ChunkingData,
    SearchingTrials,
    CompilingResults,
}

impl ProcessingStage {
    pub const ALL: [ProcessingStage; 4] = [
        ProcessingStage::RetrievingEhrData,
        ProcessingStage::ChunkingData,
        ProcessingStage::SearchingTrials,
        ProcessingStage::CompilingResults,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            ProcessingStage::RetrievingEhrData => "Retrieving EHR Data",
            ProcessingStage::ChunkingData => "Breaking Down Data into Chunks",
            ProcessingStage::SearchingTrials => "Searching Clinical Trial Database",
            ProcessingStage::CompilingResults => "Compiling Trial Results",
        }
    }
}

impl fmt::Display for ProcessingStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// The full set of services a workflow session calls.
#[derive(Clone)]
pub struct Services {
    pub ehr: Arc<dyn EhrService>,
    pub documents: Arc<dyn DocumentExtractor>,
    pub text: Arc<dyn TextExtractor>,
    pub matching: Arc<dyn MatchingService>,
    pub consent: Arc<dyn ConsentDelivery>,
}

impl Services {
    /// Simulated services using the delays from `cfg` and trials from `catalogue`.
    pub fn simulated(cfg: &CoreConfig, catalogue: TrialCatalogue) -> Self {
        let delays = cfg.delays();
        Self {
            ehr: Arc::new(SimulatedEhr::new(delays.ehr_connect, delays.ehr_search)),
            documents: Arc::new(SimulatedOcr::new(delays.document_extraction)),
            text: Arc::new(PatternTextExtractor::new(delays.text_analysis)),
            matching: Arc::new(SimulatedMatching::new(delays.matching, catalogue)),
            consent: Arc::new(SimulatedConsentDelivery::new(
                delays.consent_send,
                delays.consent_response,
                delays.signature_save,
            )),
        }
    }

    pub fn with_ehr(mut self, ehr: Arc<dyn EhrService>) -> Self {
        self.ehr = ehr;
        self
    }

    pub fn with_matching(mut self, matching: Arc<dyn MatchingService>) -> Self {
        self.matching = matching;
        self
    }

    pub fn with_consent(mut self, consent: Arc<dyn ConsentDelivery>) -> Self {
        self.consent = consent;
        self
    }

    pub fn with_text_extractor(mut self, text: Arc<dyn TextExtractor>) -> Self {
        self.text = text;
        self
    }
}
