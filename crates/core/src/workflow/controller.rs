//! The patient matching workflow controller.
//!
//! [`WorkflowController`] is a synchronous store. It owns the current view, the back stack, the
//! roster, the selected patient and the per-view state, and every change goes through one of its
//! methods. Work that takes time is split in two: a `begin_*` method validates input, records the
//! operation as active and hands back a [`PendingOperation`]; once the service call returns, the
//! matching `complete_*` method applies the result. A completion whose operation was cancelled
//! or replaced in the meantime changes nothing and returns `Ok(None)`.

use crate::config::CoreConfig;
use crate::consent::ConsentRecord;
use crate::error::ValidationError;
use crate::intake::ehr::validate_query;
use crate::intake::quick_entry::{draft_from_partial, validate_summary};
use crate::intake::{
    DocumentUpload, EhrImport, EhrRecord, EhrSystem, FormStep, FormWizard, IntakeKind,
    PartialPatient, PatientForm, UploadedDocument,
};
use crate::notify::Notifier;
use crate::patient::{ConsentStatus, Patient, PatientDraft};
use crate::profile::{DataCategory, MatchSelection, ProfileReview};
use crate::roster::Roster;
use crate::services::ProcessingStage;
use crate::task::{OperationKind, PendingOperation};
use crate::trial::{Referral, Trial};
use crate::workflow::state::{next_step, Event, StepKind, View};
use crate::{WorkflowError, WorkflowResult};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use trialos_ids::{DocumentId, PatientId};
use trialos_types::NonEmptyText;

/// State kept by whichever intake view is open.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IntakeProgress {
    #[default]
    None,
    Form {
        wizard: FormWizard,
    },
    Ehr {
        import: EhrImport,
    },
    Documents {
        upload: DocumentUpload,
    },
    QuickEntry,
}

impl IntakeProgress {
    fn fresh(view: View) -> Self {
        match view {
            View::Form => IntakeProgress::Form {
                wizard: FormWizard::new(),
            },
            View::EhrImport => IntakeProgress::Ehr {
                import: EhrImport::default(),
            },
            View::DocUpload => IntakeProgress::Documents {
                upload: DocumentUpload::default(),
            },
            View::QuickEntry => IntakeProgress::QuickEntry,
            _ => IntakeProgress::None,
        }
    }
}

/// A started e-consent or signature operation and the patient it is for.
#[derive(Clone, Debug)]
pub struct ConsentTask {
    pub operation: PendingOperation,
    pub patient: Patient,
}

/// A started EHR search.
#[derive(Clone, Debug)]
pub struct EhrSearchRequest {
    pub operation: PendingOperation,
    pub system: EhrSystem,
    pub query: String,
}

/// A started matching run with everything the matcher needs.
#[derive(Clone, Debug)]
pub struct MatchRequest {
    pub operation: PendingOperation,
    pub patient: Patient,
    pub selection: MatchSelection,
}

/// Read-only view of the controller, suitable for rendering or serializing.
#[derive(Clone, Debug, Serialize)]
pub struct WorkflowSnapshot {
    pub view: View,
    pub history: Vec<View>,
    pub selected_patient: Option<Patient>,
    pub active_operation: Option<OperationKind>,
    pub processing_stage: Option<ProcessingStage>,
    pub intake: IntakeProgress,
    pub review: Option<ProfileReview>,
    pub results: Vec<Trial>,
    pub referrals: Vec<Referral>,
}

/// The view an operation belongs to. Leaving that view cancels the operation.
fn origin_view(kind: OperationKind) -> View {
    match kind {
        OperationKind::EhrConnect | OperationKind::EhrSearch => View::EhrImport,
        OperationKind::DocumentExtraction => View::DocUpload,
        OperationKind::TextAnalysis => View::QuickEntry,
        OperationKind::ConsentDelivery | OperationKind::SignatureSave => View::Consent,
        OperationKind::Matching => View::Processing,
    }
}

pub struct WorkflowController {
    config: Arc<CoreConfig>,
    notifier: Arc<dyn Notifier>,
    view: View,
    history: Vec<View>,
    roster: Roster,
    selected: Option<PatientId>,
    intake: IntakeProgress,
    review: Option<ProfileReview>,
    selection: Option<MatchSelection>,
    results: Vec<Trial>,
    referrals: Vec<Referral>,
    active: Option<PendingOperation>,
}

impl WorkflowController {
    pub fn new(config: Arc<CoreConfig>, notifier: Arc<dyn Notifier>, roster: Roster) -> Self {
        Self {
            config,
            notifier,
            view: View::List,
            history: Vec::new(),
            roster,
            selected: None,
            intake: IntakeProgress::None,
            review: None,
            selection: None,
            results: Vec::new(),
            referrals: Vec::new(),
            active: None,
        }
    }

    // ------------------------------------------------------------------
    // Read access
    // ------------------------------------------------------------------

    pub fn view(&self) -> View {
        self.view
    }

    pub fn history(&self) -> &[View] {
        &self.history
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    pub fn patients(&self) -> Vec<Patient> {
        self.roster.patients()
    }

    pub fn patient(&self, id: PatientId) -> Option<Patient> {
        self.roster.get(id)
    }

    /// Dashboard list filter.
    pub fn search_patients(&self, query: &str) -> Vec<Patient> {
        self.roster.search(query)
    }

    /// Patients offered in the matching selection list.
    pub fn matching_candidates(&self) -> Vec<Patient> {
        self.roster.consented()
    }

    pub fn selected_patient(&self) -> Option<Patient> {
        self.selected.and_then(|id| self.roster.get(id))
    }

    pub fn intake(&self) -> &IntakeProgress {
        &self.intake
    }

    pub fn review(&self) -> Option<&ProfileReview> {
        self.review.as_ref()
    }

    pub fn results(&self) -> &[Trial] {
        &self.results
    }

    pub fn referrals(&self) -> &[Referral] {
        &self.referrals
    }

    pub fn active_operation(&self) -> Option<&PendingOperation> {
        self.active.as_ref()
    }

    pub fn snapshot(&self) -> WorkflowSnapshot {
        WorkflowSnapshot {
            view: self.view,
            history: self.history.clone(),
            selected_patient: self.selected_patient(),
            active_operation: self.active.as_ref().map(PendingOperation::kind),
            processing_stage: None,
            intake: self.intake.clone(),
            review: self.review.clone(),
            results: self.results.clone(),
            referrals: self.referrals.clone(),
        }
    }

    // ------------------------------------------------------------------
    // Navigation
    // ------------------------------------------------------------------

    /// Opens the add-patient options from the list.
    pub fn add_patient(&mut self) -> WorkflowResult<View> {
        self.apply(Event::AddPatient)
    }

    pub fn choose_intake(&mut self, kind: IntakeKind) -> WorkflowResult<View> {
        self.apply(Event::ChooseIntake(kind))
    }

    /// Returns to the view that launched the current one, or to the list when the current view
    /// was reached by completing a step. Cancels any operation owned by the view being left.
    pub fn back(&mut self) -> View {
        let from = self.view;
        let to = self.history.pop().unwrap_or(View::List);
        self.enter(to);
        tracing::info!(%from, %to, event = Event::Back.name(), "workflow transition");
        to
    }

    /// Opens an existing patient from the list. Where it lands depends on the patient's status.
    pub fn select_patient(&mut self, id: PatientId) -> WorkflowResult<View> {
        self.require_view(View::List, Event::SelectPatient(ConsentStatus::Pending))?;
        let patient = self
            .roster
            .get(id)
            .ok_or(WorkflowError::UnknownPatient(id))?;

        let view = self.apply(Event::SelectPatient(patient.status))?;
        self.selected = Some(id);
        if view == View::ProfileReview {
            self.review = Some(ProfileReview::for_patient(id));
        }
        Ok(view)
    }

    pub fn start_matching(&mut self) -> WorkflowResult<View> {
        self.apply(Event::StartMatching)
    }

    /// Picks a patient from the matching selection list. Only consented or matched patients
    /// may be picked.
    pub fn select_for_matching(&mut self, id: PatientId) -> WorkflowResult<View> {
        self.require_view(
            View::PatientSelection,
            Event::SelectForMatching(ConsentStatus::Consented),
        )?;
        let patient = self
            .roster
            .get(id)
            .ok_or(WorkflowError::UnknownPatient(id))?;

        if !patient.status.can_enter_matching() {
            self.notifier.error(
                "Consent Required",
                &format!("{} must complete consent before trial matching.", patient.name),
            );
            tracing::warn!(patient_id = %id, status = %patient.status, "patient not consented");
            return Err(WorkflowError::ConsentRequired(id));
        }

        let view = self.apply(Event::SelectForMatching(patient.status))?;
        self.selected = Some(id);
        self.review = Some(ProfileReview::for_patient(id));
        Ok(view)
    }

    // ------------------------------------------------------------------
    // Manual form
    // ------------------------------------------------------------------

    pub fn form_next(&mut self) -> WorkflowResult<FormStep> {
        Ok(self.wizard_mut()?.next())
    }

    pub fn form_previous(&mut self) -> WorkflowResult<FormStep> {
        Ok(self.wizard_mut()?.previous())
    }

    pub fn form_jump_to(&mut self, step: FormStep) -> WorkflowResult<FormStep> {
        Ok(self.wizard_mut()?.jump_to(step))
    }

    /// Validates the form, admits the patient as pending and moves to consent.
    pub fn submit_form(&mut self, form: PatientForm) -> WorkflowResult<Patient> {
        self.require_view(View::Form, Event::PatientProduced)?;
        let today = Utc::now().date_naive();
        let draft = form.into_draft(today).map_err(|e| self.rejected(e))?;
        self.admit(draft)
    }

    // ------------------------------------------------------------------
    // EHR import
    // ------------------------------------------------------------------

    pub fn ehr_import(&self) -> Option<&EhrImport> {
        match &self.intake {
            IntakeProgress::Ehr { import } => Some(import),
            _ => None,
        }
    }

    pub fn begin_ehr_connect(&mut self) -> WorkflowResult<PendingOperation> {
        self.require_view(View::EhrImport, Event::PatientProduced)?;
        self.begin(OperationKind::EhrConnect)
    }

    pub fn complete_ehr_connect(
        &mut self,
        operation: &PendingOperation,
        system: EhrSystem,
    ) -> WorkflowResult<Option<EhrSystem>> {
        if !self.finish(operation) {
            return Ok(None);
        }
        self.ehr_import_mut()?.set_connected(system);
        self.notifier.success(
            "EHR Connected",
            &format!("Successfully connected to {system} EHR system."),
        );
        Ok(Some(system))
    }

    /// Starts a search of the connected EHR.
    ///
    /// # Errors
    ///
    /// Rejects a blank query with [`ValidationError::EmptyQuery`] and a search before any
    /// system is connected with [`WorkflowError::EhrNotConnected`].
    pub fn begin_ehr_search(&mut self, query: &str) -> WorkflowResult<EhrSearchRequest> {
        self.require_view(View::EhrImport, Event::PatientProduced)?;
        let query = validate_query(query).map_err(|e| self.rejected(e))?;
        let system = self
            .ehr_import()
            .and_then(EhrImport::connected)
            .ok_or(WorkflowError::EhrNotConnected)?;
        let operation = self.begin(OperationKind::EhrSearch)?;
        Ok(EhrSearchRequest {
            operation,
            system,
            query,
        })
    }

    /// Stores search results.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::NotFound`] (and notifies the user) when the search matched
    /// nobody. The previous results are kept in that case.
    pub fn complete_ehr_search(
        &mut self,
        operation: &PendingOperation,
        query: &str,
        records: Vec<EhrRecord>,
    ) -> WorkflowResult<Option<Vec<EhrRecord>>> {
        if !self.finish(operation) {
            return Ok(None);
        }
        if records.is_empty() {
            self.notifier.error(
                "No Patients Found",
                &format!("No patients matching '{query}' were found."),
            );
            tracing::warn!(%query, "EHR search returned no patients");
            return Err(WorkflowError::NotFound(format!(
                "no EHR patients match '{query}'"
            )));
        }
        self.ehr_import_mut()?
            .set_results(query.to_string(), records.clone());
        Ok(Some(records))
    }

    /// Imports a record from the latest search results.
    pub fn import_ehr_record(&mut self, ehr_id: &str) -> WorkflowResult<Patient> {
        self.require_view(View::EhrImport, Event::PatientProduced)?;
        let record = self
            .ehr_import()
            .ok_or(WorkflowError::EhrNotConnected)?
            .record(ehr_id)?
            .clone();

        self.notifier.success(
            "Patient Selected",
            &format!("{} has been selected for import.", record.name),
        );
        self.admit(record.to_draft(Utc::now().date_naive()))
    }

    // ------------------------------------------------------------------
    // Document upload
    // ------------------------------------------------------------------

    pub fn document_upload(&self) -> Option<&DocumentUpload> {
        match &self.intake {
            IntakeProgress::Documents { upload } => Some(upload),
            _ => None,
        }
    }

    /// Stages files and returns everything staged so far.
    pub fn upload_documents(
        &mut self,
        files: Vec<UploadedDocument>,
    ) -> WorkflowResult<Vec<UploadedDocument>> {
        let upload = self.document_upload_mut()?;
        upload.add(files);
        Ok(upload.files().to_vec())
    }

    pub fn remove_document(&mut self, id: DocumentId) -> WorkflowResult<UploadedDocument> {
        self.document_upload_mut()?.remove(id)
    }

    /// Starts OCR over the staged files and returns the files to process.
    pub fn begin_document_extraction(
        &mut self,
    ) -> WorkflowResult<(PendingOperation, Vec<UploadedDocument>)> {
        self.require_view(View::DocUpload, Event::PatientProduced)?;
        let files = self
            .document_upload()
            .map(DocumentUpload::ready_for_extraction)
            .unwrap_or(Err(ValidationError::NoDocuments))
            .map_err(|e| self.rejected(e))?;
        let operation = self.begin(OperationKind::DocumentExtraction)?;
        Ok((operation, files))
    }

    pub fn complete_document_extraction(
        &mut self,
        operation: &PendingOperation,
        extracted: PartialPatient,
    ) -> WorkflowResult<Option<PartialPatient>> {
        if !self.finish(operation) {
            return Ok(None);
        }
        let upload = self.document_upload_mut()?;
        upload.set_extracted(extracted.clone());
        let count = upload.files().len();
        self.notifier.success(
            "Documents Processed",
            &format!("Successfully extracted patient information from {count} document(s)."),
        );
        Ok(Some(extracted))
    }

    /// Admits the patient extracted from the staged documents.
    pub fn submit_documents(&mut self) -> WorkflowResult<Patient> {
        self.require_view(View::DocUpload, Event::PatientProduced)?;
        let draft = self
            .document_upload()
            .map(DocumentUpload::to_draft)
            .unwrap_or(Err(ValidationError::NoDocuments))
            .map_err(|e| self.rejected(e))?;
        self.admit(draft)
    }

    // ------------------------------------------------------------------
    // Quick entry
    // ------------------------------------------------------------------

    pub fn begin_text_analysis(
        &mut self,
        summary: &str,
    ) -> WorkflowResult<(PendingOperation, NonEmptyText)> {
        self.require_view(View::QuickEntry, Event::PatientProduced)?;
        let summary = validate_summary(summary, self.config.quick_entry_min_chars())
            .map_err(|e| self.rejected(e))?;
        let operation = self.begin(OperationKind::TextAnalysis)?;
        Ok((operation, summary))
    }

    pub fn complete_text_analysis(
        &mut self,
        operation: &PendingOperation,
        partial: PartialPatient,
    ) -> WorkflowResult<Option<Patient>> {
        if !self.finish(operation) {
            return Ok(None);
        }
        self.admit(draft_from_partial(partial)).map(Some)
    }

    // ------------------------------------------------------------------
    // Consent
    // ------------------------------------------------------------------

    pub fn begin_e_consent(&mut self) -> WorkflowResult<ConsentTask> {
        self.begin_consent(OperationKind::ConsentDelivery)
    }

    pub fn begin_manual_consent(&mut self) -> WorkflowResult<ConsentTask> {
        self.begin_consent(OperationKind::SignatureSave)
    }

    fn begin_consent(&mut self, kind: OperationKind) -> WorkflowResult<ConsentTask> {
        self.require_view(View::Consent, Event::ConsentCompleted)?;
        let patient = self
            .selected_patient()
            .ok_or(WorkflowError::NoPatientSelected)?;
        if !patient.status.can_transition_to(ConsentStatus::Consented) {
            return Err(WorkflowError::InvalidStatusTransition {
                id: patient.id,
                from: patient.status,
                to: ConsentStatus::Consented,
            });
        }
        let operation = self.begin(kind)?;
        Ok(ConsentTask { operation, patient })
    }

    /// Marks the patient consented and moves on according to the consent follow-up policy.
    pub fn complete_consent(
        &mut self,
        operation: &PendingOperation,
        record: &ConsentRecord,
    ) -> WorkflowResult<Option<Patient>> {
        if !self.finish(operation) {
            return Ok(None);
        }
        if operation.patient() != Some(record.patient) {
            return Err(WorkflowError::UnknownPatient(record.patient));
        }

        let patient = self.roster.mark_consented(record.patient)?;
        let view = self.apply(Event::ConsentCompleted)?;
        if view == View::ProfileReview {
            self.selected = Some(patient.id);
            self.review = Some(ProfileReview::for_patient(patient.id));
        }
        tracing::info!(patient_id = %patient.id, method = %record.method, "consent completed");
        Ok(Some(patient))
    }

    // ------------------------------------------------------------------
    // Profile review
    // ------------------------------------------------------------------

    pub fn toggle_category(&mut self, category: DataCategory) -> WorkflowResult<bool> {
        Ok(self.review_mut()?.toggle_category(category))
    }

    pub fn set_category(&mut self, category: DataCategory, included: bool) -> WorkflowResult<()> {
        self.review_mut()?.set_category(category, included);
        Ok(())
    }

    pub fn toggle_document(&mut self, id: &str) -> WorkflowResult<bool> {
        self.review_mut()?.toggle_document(id)
    }

    pub fn select_all(&mut self) -> WorkflowResult<()> {
        self.review_mut()?.select_all();
        Ok(())
    }

    pub fn clear_all(&mut self) -> WorkflowResult<()> {
        self.review_mut()?.clear_all();
        Ok(())
    }

    /// Leaves profile review for processing and starts the matching operation.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptySelection`] and stays in profile review when nothing is
    /// selected.
    pub fn proceed_to_matching(&mut self) -> WorkflowResult<MatchRequest> {
        self.require_view(View::ProfileReview, Event::Proceed)?;
        let selection = self
            .review
            .as_ref()
            .ok_or(WorkflowError::NoPatientSelected)?
            .proceed()
            .map_err(|e| self.rejected(e))?;
        let patient = self.matchable_patient()?;
        self.ensure_idle()?;

        self.apply(Event::Proceed)?;
        let operation = self.begin(OperationKind::Matching)?;
        self.selection = Some(selection.clone());
        Ok(MatchRequest {
            operation,
            patient,
            selection,
        })
    }

    /// Runs matching again from the results view with the last selection.
    pub fn rerun_matching(&mut self) -> WorkflowResult<MatchRequest> {
        self.require_view(View::MatchResults, Event::RerunMatching)?;
        let patient = self.matchable_patient()?;
        self.ensure_idle()?;

        let selection = self
            .selection
            .clone()
            .unwrap_or_else(|| ProfileReview::for_patient(patient.id).selection());
        self.apply(Event::RerunMatching)?;
        let operation = self.begin(OperationKind::Matching)?;
        self.selection = Some(selection.clone());
        Ok(MatchRequest {
            operation,
            patient,
            selection,
        })
    }

    /// Stores match results, marks the patient matched and shows the results.
    pub fn complete_matching(
        &mut self,
        operation: &PendingOperation,
        trials: Vec<Trial>,
    ) -> WorkflowResult<Option<Vec<Trial>>> {
        if !self.finish(operation) {
            return Ok(None);
        }
        let id = operation.patient().ok_or(WorkflowError::NoPatientSelected)?;
        let patient = self.roster.mark_matched(id)?;

        self.apply(Event::MatchingComplete)?;
        self.results = trials.clone();
        self.notifier.success(
            "Trial Matching Complete",
            &format!(
                "Found {} potential trials for {}",
                trials.len(),
                patient.name
            ),
        );
        Ok(Some(trials))
    }

    // ------------------------------------------------------------------
    // Referrals
    // ------------------------------------------------------------------

    /// Sends a referral for one of the displayed trials.
    pub fn send_referral(&mut self, trial_id: &str) -> WorkflowResult<Referral> {
        self.require_view(View::MatchResults, Event::RerunMatching)?;
        let patient = self
            .selected_patient()
            .ok_or(WorkflowError::NoPatientSelected)?;
        let trial = self
            .results
            .iter()
            .find(|t| t.id == trial_id)
            .cloned()
            .ok_or_else(|| WorkflowError::UnknownTrial(trial_id.to_string()))?;

        let referral = Referral {
            patient: patient.id,
            trial_id: trial.id.clone(),
            trial_title: trial.title.clone(),
            sent_at: Utc::now(),
        };
        self.referrals.push(referral.clone());
        self.notifier.success(
            "Referral Request Sent",
            &format!(
                "Referral request for {} has been sent to {} ({})",
                patient.name, trial.sponsor, trial.id
            ),
        );
        tracing::info!(patient_id = %patient.id, trial_id = %trial.id, "referral sent");
        Ok(referral)
    }

    // ------------------------------------------------------------------
    // Operations
    // ------------------------------------------------------------------

    /// Drops `operation` if it is still the active one. Used when the service call failed.
    pub fn abandon(&mut self, operation: &PendingOperation) {
        if self
            .active
            .as_ref()
            .is_some_and(|a| a.token().same_operation(operation.token()))
        {
            tracing::debug!(kind = %operation.kind(), "operation abandoned");
            self.active = None;
        }
    }

    fn ensure_idle(&self) -> WorkflowResult<()> {
        match &self.active {
            Some(active) => Err(WorkflowError::OperationInFlight(active.kind())),
            None => Ok(()),
        }
    }

    fn begin(&mut self, kind: OperationKind) -> WorkflowResult<PendingOperation> {
        self.ensure_idle()?;
        let operation = PendingOperation::new(kind, self.selected);
        self.active = Some(operation.clone());
        tracing::debug!(%kind, view = %self.view, "operation started");
        Ok(operation)
    }

    /// Clears `operation` if it is the active, uncancelled one. False means the result is stale.
    fn finish(&mut self, operation: &PendingOperation) -> bool {
        let current = self.active.as_ref().is_some_and(|a| {
            a.token().same_operation(operation.token()) && !a.token().is_cancelled()
        });
        if current {
            self.active = None;
        } else {
            tracing::warn!(kind = %operation.kind(), "discarding stale operation result");
        }
        current
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn apply(&mut self, event: Event) -> WorkflowResult<View> {
        let from = self.view;
        let step = next_step(from, event, self.config.consent_follow_up())
            .ok_or_else(|| self.invalid(event))?;

        match step.kind {
            StepKind::Launch => self.history.push(from),
            StepKind::Completion => self.history.clear(),
        }
        self.enter(step.to);
        tracing::info!(%from, to = %step.to, event = event.name(), "workflow transition");
        Ok(step.to)
    }

    fn enter(&mut self, to: View) {
        if let Some(active) = &self.active {
            if origin_view(active.kind()) != to {
                active.token().cancel();
                tracing::info!(kind = %active.kind(), "operation cancelled by navigation");
                self.active = None;
            }
        }

        if self.view == View::MatchResults && to != View::MatchResults {
            self.results.clear();
        }
        if to.is_intake() {
            self.intake = IntakeProgress::fresh(to);
        } else if self.view.is_intake() {
            self.intake = IntakeProgress::None;
        }
        if matches!(to, View::List | View::AddOptions | View::PatientSelection) {
            self.selected = None;
            self.review = None;
            self.selection = None;
        }

        self.view = to;
    }

    fn invalid(&self, event: Event) -> WorkflowError {
        tracing::warn!(view = %self.view, event = event.name(), "event rejected");
        out_of_view(self.view, event)
    }

    fn require_view(&self, view: View, event: Event) -> WorkflowResult<()> {
        if self.view == view {
            Ok(())
        } else {
            Err(self.invalid(event))
        }
    }

    /// Reports a validation failure to the user and turns it into a workflow error.
    fn rejected(&self, err: ValidationError) -> WorkflowError {
        let (title, message) = err.notice();
        self.notifier.error(title, &message);
        tracing::warn!(view = %self.view, error = %err, "input rejected");
        err.into()
    }

    fn admit(&mut self, draft: PatientDraft) -> WorkflowResult<Patient> {
        let patient = self.roster.admit(draft, Utc::now())?;
        self.notifier.success(
            "Patient Added Successfully",
            &format!("{} has been added to your patient list.", patient.name),
        );
        self.apply(Event::PatientProduced)?;
        self.selected = Some(patient.id);
        Ok(patient)
    }

    fn matchable_patient(&self) -> WorkflowResult<Patient> {
        let patient = self
            .selected_patient()
            .ok_or(WorkflowError::NoPatientSelected)?;
        if !patient.status.can_enter_matching() {
            return Err(WorkflowError::ConsentRequired(patient.id));
        }
        Ok(patient)
    }

    fn wizard_mut(&mut self) -> WorkflowResult<&mut FormWizard> {
        self.require_view(View::Form, Event::PatientProduced)?;
        match &mut self.intake {
            IntakeProgress::Form { wizard } => Ok(wizard),
            _ => Err(out_of_view(View::Form, Event::PatientProduced)),
        }
    }

    fn ehr_import_mut(&mut self) -> WorkflowResult<&mut EhrImport> {
        self.require_view(View::EhrImport, Event::PatientProduced)?;
        match &mut self.intake {
            IntakeProgress::Ehr { import } => Ok(import),
            _ => Err(out_of_view(View::EhrImport, Event::PatientProduced)),
        }
    }

    fn document_upload_mut(&mut self) -> WorkflowResult<&mut DocumentUpload> {
        self.require_view(View::DocUpload, Event::PatientProduced)?;
        self.ensure_idle()?;
        match &mut self.intake {
            IntakeProgress::Documents { upload } => Ok(upload),
            _ => Err(out_of_view(View::DocUpload, Event::PatientProduced)),
        }
    }

    fn review_mut(&mut self) -> WorkflowResult<&mut ProfileReview> {
        self.require_view(View::ProfileReview, Event::Proceed)?;
        self.review
            .as_mut()
            .ok_or_else(|| out_of_view(View::ProfileReview, Event::Proceed))
    }
}

fn out_of_view(view: View, event: Event) -> WorkflowError {
    WorkflowError::InvalidTransition {
        view,
        event: event.name(),
    }
}
