//! Async driver around [`WorkflowController`].
//!
//! A [`WorkflowSession`] pairs the controller with the services it waits on. Each long-running
//! action takes the lock to begin the operation, releases it while the service runs, then takes
//! it again to complete. The lock is never held across a service call, so `back` and reads stay
//! responsive while work is in flight.

use crate::config::CoreConfig;
use crate::consent::{ConsentCollaborator, ConsentMethod, SignatureArtifact};
use crate::intake::{EhrRecord, EhrSystem, PartialPatient};
use crate::notify::Notifier;
use crate::patient::Patient;
use crate::roster::Roster;
use crate::services::{ProcessingStage, Services};
use crate::task::PendingOperation;
use crate::trial::Trial;
use crate::workflow::controller::{MatchRequest, WorkflowController, WorkflowSnapshot};
use crate::workflow::state::View;
use crate::{WorkflowError, WorkflowResult};
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Clone)]
pub struct WorkflowSession {
    controller: Arc<Mutex<WorkflowController>>,
    services: Services,
    consent: ConsentCollaborator,
    stage: Arc<std::sync::Mutex<Option<ProcessingStage>>>,
}

impl WorkflowSession {
    pub fn new(
        config: Arc<CoreConfig>,
        services: Services,
        notifier: Arc<dyn Notifier>,
        roster: Roster,
    ) -> Self {
        let consent = ConsentCollaborator::new(services.consent.clone(), notifier.clone());
        Self {
            controller: Arc::new(Mutex::new(WorkflowController::new(
                config, notifier, roster,
            ))),
            services,
            consent,
            stage: Arc::new(std::sync::Mutex::new(None)),
        }
    }

    /// Runs `f` with exclusive access to the controller.
    ///
    /// Use this for the synchronous actions: navigation, form steps, toggles and the like.
    pub async fn with_controller<R>(&self, f: impl FnOnce(&mut WorkflowController) -> R) -> R {
        let mut controller = self.controller.lock().await;
        f(&mut controller)
    }

    pub async fn snapshot(&self) -> WorkflowSnapshot {
        let mut snapshot = self.controller.lock().await.snapshot();
        if snapshot.view == View::Processing {
            snapshot.processing_stage = self.processing_stage();
        }
        snapshot
    }

    pub fn processing_stage(&self) -> Option<ProcessingStage> {
        self.stage.lock().ok().and_then(|stage| *stage)
    }

    pub async fn back(&self) -> View {
        self.controller.lock().await.back()
    }

    pub async fn connect_ehr(&self, system: EhrSystem) -> WorkflowResult<Option<EhrSystem>> {
        let operation = self.controller.lock().await.begin_ehr_connect()?;
        let result = self.services.ehr.connect(system, operation.token()).await;
        self.settle(operation, result, |c, op, ()| {
            c.complete_ehr_connect(op, system)
        })
        .await
    }

    pub async fn search_ehr(&self, query: &str) -> WorkflowResult<Option<Vec<EhrRecord>>> {
        let request = self.controller.lock().await.begin_ehr_search(query)?;
        let result = self
            .services
            .ehr
            .search_ehr(request.system, &request.query, request.operation.token())
            .await;
        let query = request.query;
        self.settle(request.operation, result, |c, op, records| {
            c.complete_ehr_search(op, &query, records)
        })
        .await
    }

    pub async fn extract_documents(&self) -> WorkflowResult<Option<PartialPatient>> {
        let (operation, files) = self.controller.lock().await.begin_document_extraction()?;
        let result = self
            .services
            .documents
            .extract_from_documents(&files, operation.token())
            .await;
        self.settle(operation, result, |c, op, extracted| {
            c.complete_document_extraction(op, extracted)
        })
        .await
    }

    /// Analyses a quick-entry summary and admits the patient it describes.
    pub async fn quick_entry(&self, summary: &str) -> WorkflowResult<Option<Patient>> {
        let (operation, summary) = self.controller.lock().await.begin_text_analysis(summary)?;
        let result = self
            .services
            .text
            .analyze_text(summary.as_str(), operation.token())
            .await;
        self.settle(operation, result, |c, op, partial| {
            c.complete_text_analysis(op, partial)
        })
        .await
    }

    pub async fn request_consent(
        &self,
        method: ConsentMethod,
        destination: Option<&str>,
    ) -> WorkflowResult<Option<Patient>> {
        let task = self.controller.lock().await.begin_e_consent()?;
        let result = self
            .consent
            .request_consent(&task.patient, method, destination, task.operation.token())
            .await;
        self.settle(task.operation, result, |c, op, record| {
            c.complete_consent(op, &record)
        })
        .await
    }

    pub async fn record_manual_consent(
        &self,
        signature: Option<SignatureArtifact>,
    ) -> WorkflowResult<Option<Patient>> {
        let task = self.controller.lock().await.begin_manual_consent()?;
        let result = self
            .consent
            .record_manual_consent(&task.patient, signature, task.operation.token())
            .await;
        self.settle(task.operation, result, |c, op, record| {
            c.complete_consent(op, &record)
        })
        .await
    }

    /// Leaves profile review and runs matching to completion.
    pub async fn proceed_to_matching(&self) -> WorkflowResult<Option<Vec<Trial>>> {
        let request = self.controller.lock().await.proceed_to_matching()?;
        self.run_matching(request).await
    }

    pub async fn rerun_matching(&self) -> WorkflowResult<Option<Vec<Trial>>> {
        let request = self.controller.lock().await.rerun_matching()?;
        self.run_matching(request).await
    }

    async fn run_matching(&self, request: MatchRequest) -> WorkflowResult<Option<Vec<Trial>>> {
        let token = request.operation.token().clone();
        let stage = self.stage.clone();
        let on_stage = move |next: ProcessingStage| {
            if token.is_cancelled() {
                return;
            }
            tracing::debug!(stage = %next, "matching stage");
            if let Ok(mut current) = stage.lock() {
                *current = Some(next);
            }
        };

        if let Ok(mut current) = self.stage.lock() {
            *current = None;
        }

        let result = self
            .services
            .matching
            .match_trials(
                &request.patient,
                &request.selection,
                &on_stage,
                request.operation.token(),
            )
            .await;

        // A newer run may own the stage by now.
        let still_active = self
            .controller
            .lock()
            .await
            .active_operation()
            .is_some_and(|active| active.token().same_operation(request.operation.token()));
        if still_active {
            if let Ok(mut current) = self.stage.lock() {
                *current = None;
            }
        }

        self.settle(request.operation, result, |c, op, trials| {
            c.complete_matching(op, trials)
        })
        .await
    }

    /// Applies a service result. A cancelled call is a silent no-op; any other failure drops the
    /// operation and is returned.
    async fn settle<T, R>(
        &self,
        operation: PendingOperation,
        result: WorkflowResult<T>,
        complete: impl FnOnce(
            &mut WorkflowController,
            &PendingOperation,
            T,
        ) -> WorkflowResult<Option<R>>,
    ) -> WorkflowResult<Option<R>> {
        let mut controller = self.controller.lock().await;
        match result {
            Ok(value) => complete(&mut controller, &operation, value),
            Err(WorkflowError::Cancelled) => {
                tracing::info!(kind = %operation.kind(), "operation cancelled");
                controller.abandon(&operation);
                Ok(None)
            }
            Err(err) => {
                tracing::warn!(kind = %operation.kind(), error = %err, "operation failed");
                controller.abandon(&operation);
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConsentFollowUp;
    use crate::intake::{IntakeKind, PatientForm, UploadedDocument};
    use crate::notify::RecordingNotifier;
    use crate::patient::{age_on, parse_birth_date, ConsentStatus};
    use crate::profile::{DataCategory, MatchSelection};
    use crate::services::{
        ConsentDelivery, MatchingService, SimulatedEhr, StageCallback, TextExtractor,
    };
    use crate::task::OperationToken;
    use crate::trial::TrialCatalogue;
    use crate::ValidationError;
    use async_trait::async_trait;
    use chrono::{NaiveDate, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use trialos_ids::{PatientId, PatientIdGenerator};

    struct Harness {
        session: WorkflowSession,
        notifier: Arc<RecordingNotifier>,
    }

    fn harness_with(config: CoreConfig, adjust: impl FnOnce(Services) -> Services) -> Harness {
        let config = Arc::new(config);
        let notifier = Arc::new(RecordingNotifier::new());
        let services = adjust(Services::simulated(
            &config,
            TrialCatalogue::from_config(&config).unwrap(),
        ));
        let roster = Roster::with_demo_patients(PatientIdGenerator::starting_at(20_000));
        Harness {
            session: WorkflowSession::new(config, services, notifier.clone(), roster),
            notifier,
        }
    }

    fn harness() -> Harness {
        harness_with(CoreConfig::immediate(), |s| s)
    }

    fn sarah() -> PatientId {
        PatientId::from_number(12845)
    }

    fn michael() -> PatientId {
        PatientId::from_number(11438)
    }

    async fn status_of(session: &WorkflowSession, id: PatientId) -> ConsentStatus {
        session
            .with_controller(|c| c.patient(id).map(|p| p.status))
            .await
            .unwrap()
    }

    #[derive(Default)]
    struct CountingDelivery {
        sends: AtomicUsize,
        saves: AtomicUsize,
    }

    #[async_trait]
    impl ConsentDelivery for CountingDelivery {
        async fn send_consent(
            &self,
            _patient: &Patient,
            _method: ConsentMethod,
            _destination: &str,
            _token: &OperationToken,
        ) -> WorkflowResult<()> {
            self.sends.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn await_response(
            &self,
            _patient: &Patient,
            _token: &OperationToken,
        ) -> WorkflowResult<()> {
            Ok(())
        }

        async fn save_signature(
            &self,
            _patient: &Patient,
            _signature: &SignatureArtifact,
            _token: &OperationToken,
        ) -> WorkflowResult<()> {
            self.saves.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    /// Returns the catalogue after a delay, without looking at the token.
    struct StubbornMatching {
        delay: Duration,
        catalogue: TrialCatalogue,
    }

    #[async_trait]
    impl MatchingService for StubbornMatching {
        async fn match_trials(
            &self,
            _patient: &Patient,
            _selection: &MatchSelection,
            _on_stage: StageCallback<'_>,
            _token: &OperationToken,
        ) -> WorkflowResult<Vec<Trial>> {
            tokio::time::sleep(self.delay).await;
            Ok(self.catalogue.ranked())
        }
    }

    /// Reports one stage per call, then sleeps the call's delay without looking at the token.
    struct StagedMatching {
        runs: Vec<(ProcessingStage, Duration)>,
        calls: AtomicUsize,
        catalogue: TrialCatalogue,
    }

    #[async_trait]
    impl MatchingService for StagedMatching {
        async fn match_trials(
            &self,
            _patient: &Patient,
            _selection: &MatchSelection,
            on_stage: StageCallback<'_>,
            _token: &OperationToken,
        ) -> WorkflowResult<Vec<Trial>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            let (stage, delay) = self.runs[call.min(self.runs.len() - 1)];
            on_stage(stage);
            tokio::time::sleep(delay).await;
            Ok(self.catalogue.ranked())
        }
    }

    /// Always reports the same patient, whatever the text says.
    struct FixedTextExtractor(PartialPatient);

    #[async_trait]
    impl TextExtractor for FixedTextExtractor {
        async fn analyze_text(
            &self,
            _text: &str,
            token: &OperationToken,
        ) -> WorkflowResult<PartialPatient> {
            token.check()?;
            Ok(self.0.clone())
        }
    }

    #[tokio::test]
    async fn test_jane_doe_end_to_end() {
        let h = harness();
        let s = &h.session;

        s.with_controller(|c| {
            c.add_patient()?;
            c.choose_intake(IntakeKind::Form)
        })
        .await
        .unwrap();

        let form = PatientForm {
            first_name: "Jane".into(),
            last_name: "Doe".into(),
            date_of_birth: "1970-01-01".into(),
            primary_diagnosis: "Lung Cancer".into(),
            ..PatientForm::default()
        };
        let jane = s.with_controller(|c| c.submit_form(form)).await.unwrap();
        assert_eq!(jane.name, "Jane Doe");
        assert_eq!(jane.status, ConsentStatus::Pending);
        let expected_age = age_on(
            parse_birth_date("1970-01-01").unwrap(),
            Utc::now().date_naive(),
        );
        assert_eq!(jane.age, expected_age);
        assert_eq!(s.snapshot().await.view, View::Consent);

        let consented = s
            .request_consent(ConsentMethod::Sms, Some("5551234567"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(consented.status, ConsentStatus::Consented);
        assert_eq!(s.snapshot().await.view, View::List);

        let view = s
            .with_controller(|c| c.select_patient(jane.id))
            .await
            .unwrap();
        assert_eq!(view, View::ProfileReview);

        let review = s.snapshot().await.review.unwrap();
        assert!(DataCategory::ALL
            .iter()
            .all(|c| review.is_category_included(*c)));

        let trials = s.proceed_to_matching().await.unwrap().unwrap();
        assert!(!trials.is_empty());
        assert!(trials.windows(2).all(|w| w[0].score >= w[1].score));

        let snapshot = s.snapshot().await;
        assert_eq!(snapshot.view, View::MatchResults);
        assert_eq!(snapshot.results, trials);
        assert_eq!(status_of(s, jane.id).await, ConsentStatus::Matched);
        assert!(h
            .notifier
            .titles()
            .contains(&"Trial Matching Complete".to_string()));
    }

    #[tokio::test]
    async fn test_empty_email_never_reaches_delivery() {
        let delivery = Arc::new(CountingDelivery::default());
        let h = harness_with(CoreConfig::immediate(), {
            let delivery = delivery.clone();
            move |s| s.with_consent(delivery)
        });
        let s = &h.session;
        s.with_controller(|c| c.select_patient(michael()))
            .await
            .unwrap();

        let err = s
            .request_consent(ConsentMethod::Email, Some(""))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::Validation(ValidationError::MissingDestination { .. })
        ));
        assert_eq!(delivery.sends.load(Ordering::SeqCst), 0);
        assert_eq!(status_of(s, michael()).await, ConsentStatus::Pending);

        let snapshot = s.snapshot().await;
        assert_eq!(snapshot.view, View::Consent);
        assert!(snapshot.active_operation.is_none());
        assert_eq!(h.notifier.titles(), vec!["Email Required".to_string()]);
    }

    #[tokio::test]
    async fn test_manual_consent_requires_signature() {
        let delivery = Arc::new(CountingDelivery::default());
        let h = harness_with(CoreConfig::immediate(), {
            let delivery = delivery.clone();
            move |s| s.with_consent(delivery)
        });
        let s = &h.session;
        s.with_controller(|c| c.select_patient(michael()))
            .await
            .unwrap();

        let err = s.record_manual_consent(None).await.unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::Validation(ValidationError::MissingSignature)
        ));
        assert_eq!(delivery.saves.load(Ordering::SeqCst), 0);
        assert_eq!(status_of(s, michael()).await, ConsentStatus::Pending);

        let signature = SignatureArtifact::from_bytes("image/png", vec![1, 2, 3]).unwrap();
        let patient = s
            .record_manual_consent(Some(signature))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(patient.status, ConsentStatus::Consented);
        assert_eq!(delivery.saves.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_consent_follow_up_review_opens_profile() {
        let h = harness_with(
            CoreConfig::immediate().with_consent_follow_up(ConsentFollowUp::Review),
            |s| s,
        );
        let s = &h.session;
        s.with_controller(|c| c.select_patient(michael()))
            .await
            .unwrap();
        s.request_consent(ConsentMethod::Email, Some("m.chen@example.com"))
            .await
            .unwrap();

        let snapshot = s.snapshot().await;
        assert_eq!(snapshot.view, View::ProfileReview);
        assert_eq!(snapshot.selected_patient.unwrap().id, michael());
        assert!(snapshot.review.is_some());
    }

    #[tokio::test]
    async fn test_consented_patient_opens_profile_review_every_time() {
        let h = harness();
        let s = &h.session;
        for _ in 0..2 {
            let view = s
                .with_controller(|c| c.select_patient(sarah()))
                .await
                .unwrap();
            assert_eq!(view, View::ProfileReview);
            assert_eq!(s.back().await, View::List);
        }
        assert_eq!(status_of(s, sarah()).await, ConsentStatus::Consented);
    }

    #[tokio::test]
    async fn test_empty_selection_stays_in_profile_review() {
        let h = harness();
        let s = &h.session;
        s.with_controller(|c| {
            c.select_patient(sarah())?;
            c.clear_all()
        })
        .await
        .unwrap();

        let err = s.proceed_to_matching().await.unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::Validation(ValidationError::EmptySelection)
        ));
        let snapshot = s.snapshot().await;
        assert_eq!(snapshot.view, View::ProfileReview);
        assert!(snapshot.active_operation.is_none());
        assert_eq!(h.notifier.titles(), vec!["Selection Required".to_string()]);
    }

    #[tokio::test]
    async fn test_pending_patient_cannot_be_picked_for_matching() {
        let h = harness();
        let s = &h.session;
        let candidates = s
            .with_controller(|c| {
                c.start_matching()?;
                Ok::<_, WorkflowError>(c.matching_candidates())
            })
            .await
            .unwrap();
        assert!(candidates.iter().all(|p| p.status != ConsentStatus::Pending));

        let err = s
            .with_controller(|c| c.select_for_matching(michael()))
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::ConsentRequired(id) if id == michael()));
        assert_eq!(s.snapshot().await.view, View::PatientSelection);
    }

    #[tokio::test(start_paused = true)]
    async fn test_back_during_matching_cancels_without_mutation() {
        let h = harness_with(CoreConfig::dashboard(), |s| s);
        let s = h.session.clone();
        s.with_controller(|c| c.select_patient(sarah()))
            .await
            .unwrap();

        let running = tokio::spawn({
            let s = s.clone();
            async move { s.proceed_to_matching().await }
        });
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(s.snapshot().await.view, View::Processing);

        assert_eq!(s.back().await, View::ProfileReview);
        let outcome = running.await.unwrap().unwrap();
        assert!(outcome.is_none());

        let snapshot = s.snapshot().await;
        assert_eq!(snapshot.view, View::ProfileReview);
        assert!(snapshot.results.is_empty());
        assert_eq!(status_of(&s, sarah()).await, ConsentStatus::Consented);
        assert!(!h
            .notifier
            .titles()
            .contains(&"Trial Matching Complete".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_result_after_cancellation_is_ignored() {
        let config = CoreConfig::immediate();
        let catalogue = TrialCatalogue::from_config(&config).unwrap();
        let h = harness_with(config, move |s| {
            s.with_matching(Arc::new(StubbornMatching {
                delay: Duration::from_secs(5),
                catalogue,
            }))
        });
        let s = h.session.clone();
        s.with_controller(|c| c.select_patient(sarah()))
            .await
            .unwrap();

        let running = tokio::spawn({
            let s = s.clone();
            async move { s.proceed_to_matching().await }
        });
        tokio::time::sleep(Duration::from_secs(1)).await;
        s.back().await;

        assert!(running.await.unwrap().unwrap().is_none());
        assert_eq!(status_of(&s, sarah()).await, ConsentStatus::Consented);
        assert_eq!(s.snapshot().await.view, View::ProfileReview);
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_run_does_not_clear_the_stage_of_a_newer_run() {
        let config = CoreConfig::immediate();
        let catalogue = TrialCatalogue::from_config(&config).unwrap();
        let h = harness_with(config, move |s| {
            s.with_matching(Arc::new(StagedMatching {
                runs: vec![
                    (ProcessingStage::RetrievingEhrData, Duration::from_secs(5)),
                    (ProcessingStage::SearchingTrials, Duration::from_secs(10)),
                ],
                calls: AtomicUsize::new(0),
                catalogue,
            }))
        });
        let s = h.session.clone();
        s.with_controller(|c| c.select_patient(sarah()))
            .await
            .unwrap();

        let first = tokio::spawn({
            let s = s.clone();
            async move { s.proceed_to_matching().await }
        });
        tokio::time::sleep(Duration::from_secs(1)).await;
        s.back().await;

        let second = tokio::spawn({
            let s = s.clone();
            async move { s.proceed_to_matching().await }
        });
        assert!(first.await.unwrap().unwrap().is_none());
        assert_eq!(s.snapshot().await.view, View::Processing);
        assert_eq!(
            s.snapshot().await.processing_stage,
            Some(ProcessingStage::SearchingTrials)
        );

        assert!(second.await.unwrap().unwrap().is_some());
        assert_eq!(s.processing_stage(), None);
        assert_eq!(s.snapshot().await.view, View::MatchResults);
    }

    #[tokio::test(start_paused = true)]
    async fn test_processing_stage_is_visible_while_matching() {
        let h = harness_with(CoreConfig::dashboard(), |s| s);
        let s = h.session.clone();
        s.with_controller(|c| c.select_patient(sarah()))
            .await
            .unwrap();

        let running = tokio::spawn({
            let s = s.clone();
            async move { s.proceed_to_matching().await }
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(
            s.snapshot().await.processing_stage,
            Some(ProcessingStage::RetrievingEhrData)
        );

        assert!(running.await.unwrap().unwrap().is_some());
        assert_eq!(s.processing_stage(), None);
    }

    #[tokio::test]
    async fn test_quick_entry_admits_pending_patient() {
        let h = harness();
        let s = &h.session;
        s.with_controller(|c| {
            c.add_patient()?;
            c.choose_intake(IntakeKind::QuickEntry)
        })
        .await
        .unwrap();

        let err = s.quick_entry("too short").await.unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::Validation(ValidationError::TextTooShort { .. })
        ));

        let patient = s
            .quick_entry(crate::intake::quick_entry::EXAMPLE_SUMMARY)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(patient.status, ConsentStatus::Pending);
        assert_eq!(patient.age, 32);
        assert_eq!(s.snapshot().await.view, View::Consent);
    }

    #[tokio::test]
    async fn test_quick_entry_uses_injected_text_extractor() {
        let h = harness_with(CoreConfig::immediate(), |s| {
            s.with_text_extractor(Arc::new(FixedTextExtractor(PartialPatient {
                name: Some("Ada Lovelace".into()),
                age: Some(58),
                sex: Some("Female".into()),
                diagnosis: Some("Pancreatic Cancer".into()),
            })))
        });
        let s = &h.session;
        s.with_controller(|c| {
            c.add_patient()?;
            c.choose_intake(IntakeKind::QuickEntry)
        })
        .await
        .unwrap();

        let patient = s
            .quick_entry("Referred from oncology clinic, history attached.")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(patient.name, "Ada Lovelace");
        assert_eq!(patient.age, 58);
        assert_eq!(patient.sex, "Female");
        assert_eq!(patient.diagnosis, "Pancreatic Cancer");
        assert_eq!(patient.status, ConsentStatus::Pending);
    }

    #[tokio::test]
    async fn test_ehr_search_only_sees_configured_records() {
        let h = harness_with(CoreConfig::immediate(), |s| {
            s.with_ehr(Arc::new(
                SimulatedEhr::new(Duration::ZERO, Duration::ZERO).with_records(vec![EhrRecord {
                    ehr_id: "EHR-11111".into(),
                    name: "Grace Hopper".into(),
                    date_of_birth: NaiveDate::from_ymd_opt(1940, 12, 9).unwrap(),
                    gender: "Female".into(),
                    primary_diagnosis: "Melanoma".into(),
                    mrn: "MRN-111111".into(),
                }]),
            ))
        });
        let s = &h.session;
        s.with_controller(|c| {
            c.add_patient()?;
            c.choose_intake(IntakeKind::EhrImport)
        })
        .await
        .unwrap();
        s.connect_ehr(EhrSystem::Cerner).await.unwrap();

        assert!(matches!(
            s.search_ehr("Wilson").await,
            Err(WorkflowError::NotFound(_))
        ));
        let records = s.search_ehr("hopper").await.unwrap().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].ehr_id, "EHR-11111");
    }

    #[tokio::test]
    async fn test_ehr_import_flow() {
        let h = harness();
        let s = &h.session;
        s.with_controller(|c| {
            c.add_patient()?;
            c.choose_intake(IntakeKind::EhrImport)
        })
        .await
        .unwrap();

        assert!(matches!(
            s.search_ehr("Wilson").await,
            Err(WorkflowError::EhrNotConnected)
        ));
        s.connect_ehr(EhrSystem::Epic).await.unwrap();
        assert!(matches!(
            s.search_ehr("zzz-nobody").await,
            Err(WorkflowError::NotFound(_))
        ));

        let records = s.search_ehr("wilson").await.unwrap().unwrap();
        assert!(!records.is_empty());
        let patient = s
            .with_controller(|c| c.import_ehr_record(&records[0].ehr_id))
            .await
            .unwrap();
        assert_eq!(patient.status, ConsentStatus::Pending);
        assert_eq!(s.snapshot().await.view, View::Consent);
    }

    #[tokio::test]
    async fn test_document_upload_flow() {
        let h = harness();
        let s = &h.session;
        s.with_controller(|c| {
            c.add_patient()?;
            c.choose_intake(IntakeKind::DocUpload)
        })
        .await
        .unwrap();

        assert!(matches!(
            s.extract_documents().await,
            Err(WorkflowError::Validation(ValidationError::NoDocuments))
        ));
        s.with_controller(|c| {
            c.upload_documents(vec![UploadedDocument::new(
                "pathology.pdf",
                2048,
                "application/pdf",
            )])
        })
        .await
        .unwrap();
        assert!(matches!(
            s.with_controller(|c| c.submit_documents()).await,
            Err(WorkflowError::Validation(ValidationError::DocumentsNotProcessed))
        ));

        let extracted = s.extract_documents().await.unwrap().unwrap();
        assert!(extracted.name.is_some());
        let patient = s
            .with_controller(|c| c.submit_documents())
            .await
            .unwrap();
        assert_eq!(patient.status, ConsentStatus::Pending);
    }

    #[tokio::test]
    async fn test_referral_for_displayed_trial() {
        let h = harness();
        let s = &h.session;
        s.with_controller(|c| c.select_patient(sarah()))
            .await
            .unwrap();
        let trials = s.proceed_to_matching().await.unwrap().unwrap();

        let referral = s
            .with_controller(|c| c.send_referral(&trials[0].id))
            .await
            .unwrap();
        assert_eq!(referral.patient, sarah());
        assert!(matches!(
            s.with_controller(|c| c.send_referral("NCT-missing")).await,
            Err(WorkflowError::UnknownTrial(_))
        ));
        assert_eq!(s.snapshot().await.referrals.len(), 1);
    }
}
