//! # API REST
//!
//! REST API for the TrialOS patient matching workflow.
//!
//! Handles:
//! - HTTP endpoints with axum, one per workflow action
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (JSON bodies, status codes, CORS)
//!
//! All workflow rules live in `trialos-core`; handlers only translate between JSON and the
//! [`WorkflowSession`].

#![warn(rust_2018_idioms)]

pub mod dto;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{delete, get, post},
    Router,
};
use serde::Deserialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use dto::*;
use trialos_core::config::{
    consent_follow_up_from_env_value, delay_scale_from_env_value,
    quick_entry_min_chars_from_env_value, trial_fixtures_from_env_value,
};
use trialos_core::consent::SignatureArtifact;
use trialos_core::intake::{EhrSystem, FormStep, UploadedDocument};
use trialos_core::notify::RecordingNotifier;
use trialos_core::profile::DataCategory;
use trialos_core::roster::Roster;
use trialos_core::routing::{Destination, HistoryNavigator, Navigator};
use trialos_core::services::Services;
use trialos_core::{
    CoreConfig, DocumentId, PatientId, PatientIdGenerator, SimulatedDelays, TrialCatalogue,
    WorkflowError, WorkflowResult, WorkflowSession,
};

/// Application state for the REST API server
///
/// One workflow session is shared by every request; the session serialises access to the
/// controller itself.
#[derive(Clone)]
pub struct AppState {
    pub cfg: Arc<CoreConfig>,
    pub session: WorkflowSession,
    pub catalogue: TrialCatalogue,
    pub navigator: Arc<dyn Navigator>,
    pub notifications: Arc<RecordingNotifier>,
}

impl AppState {
    /// Builds state around the simulated services and the demo roster.
    ///
    /// # Errors
    ///
    /// Returns an error if the trial fixtures named by `cfg` cannot be loaded.
    pub fn new(cfg: Arc<CoreConfig>) -> WorkflowResult<Self> {
        let catalogue = TrialCatalogue::from_config(&cfg)?;
        let services = Services::simulated(&cfg, catalogue.clone());
        let roster = Roster::with_demo_patients(PatientIdGenerator::random_start());
        Ok(Self::with_services(cfg, services, catalogue, roster))
    }

    pub fn with_services(
        cfg: Arc<CoreConfig>,
        services: Services,
        catalogue: TrialCatalogue,
        roster: Roster,
    ) -> Self {
        let notifications = Arc::new(RecordingNotifier::new());
        let session = WorkflowSession::new(cfg.clone(), services, notifications.clone(), roster);
        Self {
            cfg,
            session,
            catalogue,
            navigator: Arc::new(HistoryNavigator::new()),
            notifications,
        }
    }
}

/// Resolves [`CoreConfig`] from `TRIALOS_*` environment variables.
///
/// # Environment Variables
/// - `TRIALOS_DELAY_SCALE`: multiplier for the simulated delays (default 1, 0 disables them)
/// - `TRIALOS_QUICK_ENTRY_MIN_CHARS`: minimum quick-entry summary length (default 20)
/// - `TRIALOS_CONSENT_FOLLOW_UP`: `list` or `review` (default `list`)
/// - `TRIALOS_TRIAL_FIXTURES`: YAML file replacing the embedded trial catalogue
///
/// # Errors
///
/// Returns an error if any variable is set to an unparseable value or the fixture file is
/// missing.
pub fn config_from_env() -> anyhow::Result<CoreConfig> {
    let scale = delay_scale_from_env_value(std::env::var("TRIALOS_DELAY_SCALE").ok())?;
    let min_chars =
        quick_entry_min_chars_from_env_value(std::env::var("TRIALOS_QUICK_ENTRY_MIN_CHARS").ok())?;
    let follow_up =
        consent_follow_up_from_env_value(std::env::var("TRIALOS_CONSENT_FOLLOW_UP").ok())?;
    let fixtures = trial_fixtures_from_env_value(std::env::var("TRIALOS_TRIAL_FIXTURES").ok());

    Ok(CoreConfig::new(
        SimulatedDelays::dashboard().scaled(scale),
        min_chars,
        follow_up,
        fixtures,
    )?)
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health,
        list_routes,
        navigate,
        workflow,
        back,
        add_patient,
        choose_intake,
        list_patients,
        select_patient,
        start_matching,
        matching_candidates,
        select_for_matching,
        form_next,
        form_previous,
        submit_form,
        ehr_connect,
        ehr_search,
        ehr_import,
        upload_documents,
        remove_document,
        process_documents,
        submit_documents,
        quick_entry,
        send_e_consent,
        record_manual_consent,
        profile,
        toggle_category,
        toggle_document,
        select_all,
        clear_all,
        proceed,
        rerun,
        list_trials,
        list_referrals,
        send_referral,
        notifications,
    ),
    components(schemas(
        HealthRes,
        ErrorRes,
        RouteRes,
        NavigateReq,
        PatientRes,
        ListPatientsRes,
        TrialRes,
        TrialsRes,
        ReferralReq,
        ReferralRes,
        ReferralsRes,
        WorkflowRes,
        ChooseIntakeReq,
        FormStepRes,
        CreatePatientReq,
        EhrConnectReq,
        EhrConnectRes,
        EhrSearchReq,
        EhrSearchRes,
        EhrRecordRes,
        EhrImportReq,
        DocumentReq,
        UploadDocumentsReq,
        DocumentRes,
        DocumentsRes,
        ExtractedRes,
        QuickEntryReq,
        EConsentReq,
        ManualConsentReq,
        CategoryRes,
        TimelineEntryRes,
        ProfileRes,
        NotificationRes,
        NotificationsRes,
    ))
)]
pub struct ApiDoc;

/// Builds the REST router with Swagger UI and permissive CORS.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/routes", get(list_routes))
        .route("/navigate", post(navigate))
        .route("/workflow", get(workflow))
        .route("/workflow/back", post(back))
        .route("/workflow/add-patient", post(add_patient))
        .route("/workflow/intake", post(choose_intake))
        .route("/workflow/start-matching", post(start_matching))
        .route("/patients", get(list_patients))
        .route("/patients/:id/select", post(select_patient))
        .route("/matching/candidates", get(matching_candidates))
        .route("/matching/candidates/:id/select", post(select_for_matching))
        .route("/matching/rerun", post(rerun))
        .route("/intake/form", post(submit_form))
        .route("/intake/form/next", post(form_next))
        .route("/intake/form/previous", post(form_previous))
        .route("/intake/ehr/connect", post(ehr_connect))
        .route("/intake/ehr/search", post(ehr_search))
        .route("/intake/ehr/import", post(ehr_import))
        .route("/intake/documents", post(upload_documents))
        .route("/intake/documents/:id", delete(remove_document))
        .route("/intake/documents/process", post(process_documents))
        .route("/intake/documents/submit", post(submit_documents))
        .route("/intake/quick-entry", post(quick_entry))
        .route("/consent/e-consent", post(send_e_consent))
        .route("/consent/manual", post(record_manual_consent))
        .route("/profile", get(profile))
        .route("/profile/categories/:category/toggle", post(toggle_category))
        .route("/profile/documents/:id/toggle", post(toggle_document))
        .route("/profile/select-all", post(select_all))
        .route("/profile/clear-all", post(clear_all))
        .route("/profile/proceed", post(proceed))
        .route("/trials", get(list_trials))
        .route("/referrals", get(list_referrals).post(send_referral))
        .route("/notifications", get(notifications))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

type ApiError = (StatusCode, Json<ErrorRes>);
type ApiResult<T> = Result<Json<T>, ApiError>;

/// Maps a workflow error to a status code.
///
/// Bad input is 400, unknown things are 404, and anything the current workflow state does not
/// allow is 409.
fn api_error(err: WorkflowError) -> ApiError {
    let status = match &err {
        WorkflowError::Validation(_) | WorkflowError::InvalidInput(_) | WorkflowError::Id(_) => {
            StatusCode::BAD_REQUEST
        }
        WorkflowError::NotFound(_)
        | WorkflowError::UnknownPatient(_)
        | WorkflowError::UnknownTrial(_) => StatusCode::NOT_FOUND,
        WorkflowError::InvalidTransition { .. }
        | WorkflowError::NoPatientSelected
        | WorkflowError::ConsentRequired(_)
        | WorkflowError::InvalidStatusTransition { .. }
        | WorkflowError::OperationInFlight(_)
        | WorkflowError::EhrNotConnected
        | WorkflowError::Cancelled => StatusCode::CONFLICT,
        WorkflowError::Fixture(_) | WorkflowError::FixtureRead(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    if status.is_server_error() {
        tracing::error!("request failed: {:?}", err);
    } else {
        tracing::debug!(%status, error = %err, "request rejected");
    }
    (
        status,
        Json(ErrorRes {
            error: err.to_string(),
        }),
    )
}

/// An operation that was cancelled while the request waited on it.
fn settled<T>(outcome: WorkflowResult<Option<T>>) -> Result<T, ApiError> {
    outcome
        .and_then(|value| value.ok_or(WorkflowError::Cancelled))
        .map_err(api_error)
}

async fn snapshot(state: &AppState) -> Json<WorkflowRes> {
    Json(state.session.snapshot().await.into())
}

fn parse_patient_id(id: &str) -> Result<PatientId, ApiError> {
    PatientId::parse(id).map_err(|e| api_error(e.into()))
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint for the REST API
#[axum::debug_handler]
async fn health(State(_state): State<AppState>) -> Json<HealthRes> {
    Json(HealthRes {
        ok: true,
        message: "TrialOS REST API is alive".into(),
    })
}

#[utoipa::path(
    get,
    path = "/routes",
    responses((status = 200, description = "Dashboard pages", body = [RouteRes]))
)]
#[axum::debug_handler]
async fn list_routes(State(_state): State<AppState>) -> Json<Vec<RouteRes>> {
    Json(Destination::ALL.into_iter().map(RouteRes::from).collect())
}

#[utoipa::path(
    post,
    path = "/navigate",
    request_body = NavigateReq,
    responses((status = 200, description = "Resolved page; unknown paths resolve to not-found", body = RouteRes))
)]
/// Navigate to a dashboard page. There are no guards.
#[axum::debug_handler]
async fn navigate(State(state): State<AppState>, Json(req): Json<NavigateReq>) -> Json<RouteRes> {
    Json(state.navigator.navigate(&req.path).into())
}

#[utoipa::path(
    get,
    path = "/workflow",
    responses((status = 200, description = "Current workflow state", body = WorkflowRes))
)]
#[axum::debug_handler]
async fn workflow(State(state): State<AppState>) -> Json<WorkflowRes> {
    snapshot(&state).await
}

#[utoipa::path(
    post,
    path = "/workflow/back",
    responses((status = 200, description = "Workflow after going back", body = WorkflowRes))
)]
/// Go back one view. Cancels any operation owned by the view being left.
#[axum::debug_handler]
async fn back(State(state): State<AppState>) -> Json<WorkflowRes> {
    state.session.back().await;
    snapshot(&state).await
}

#[utoipa::path(
    post,
    path = "/workflow/add-patient",
    responses(
        (status = 200, description = "Add-patient options shown", body = WorkflowRes),
        (status = 409, description = "Not valid in the current view", body = ErrorRes)
    )
)]
#[axum::debug_handler]
async fn add_patient(State(state): State<AppState>) -> ApiResult<WorkflowRes> {
    state
        .session
        .with_controller(|c| c.add_patient())
        .await
        .map_err(api_error)?;
    Ok(snapshot(&state).await)
}

#[utoipa::path(
    post,
    path = "/workflow/intake",
    request_body = ChooseIntakeReq,
    responses(
        (status = 200, description = "Intake view opened", body = WorkflowRes),
        (status = 409, description = "Not valid in the current view", body = ErrorRes)
    )
)]
#[axum::debug_handler]
async fn choose_intake(
    State(state): State<AppState>,
    Json(req): Json<ChooseIntakeReq>,
) -> ApiResult<WorkflowRes> {
    state
        .session
        .with_controller(|c| c.choose_intake(req.kind))
        .await
        .map_err(api_error)?;
    Ok(snapshot(&state).await)
}

#[utoipa::path(
    post,
    path = "/workflow/start-matching",
    responses(
        (status = 200, description = "Patient selection opened", body = WorkflowRes),
        (status = 409, description = "Not valid in the current view", body = ErrorRes)
    )
)]
#[axum::debug_handler]
async fn start_matching(State(state): State<AppState>) -> ApiResult<WorkflowRes> {
    state
        .session
        .with_controller(|c| c.start_matching())
        .await
        .map_err(api_error)?;
    Ok(snapshot(&state).await)
}

#[derive(Debug, Deserialize)]
struct PatientQuery {
    query: Option<String>,
}

#[utoipa::path(
    get,
    path = "/patients",
    params(("query" = Option<String>, Query, description = "Filter on name, diagnosis or id")),
    responses((status = 200, description = "Patients on the roster", body = ListPatientsRes))
)]
#[axum::debug_handler]
async fn list_patients(
    State(state): State<AppState>,
    Query(params): Query<PatientQuery>,
) -> Json<ListPatientsRes> {
    let query = params.query.unwrap_or_default();
    let patients = state
        .session
        .with_controller(|c| c.search_patients(&query))
        .await;
    Json(patients.into())
}

#[utoipa::path(
    post,
    path = "/patients/{id}/select",
    params(("id" = String, Path, description = "Patient id, e.g. PT-12845")),
    responses(
        (status = 200, description = "Patient opened", body = WorkflowRes),
        (status = 404, description = "Unknown patient", body = ErrorRes),
        (status = 409, description = "Not valid in the current view", body = ErrorRes)
    )
)]
/// Open a patient from the list. Pending patients go to consent, consented patients to profile
/// review and matched patients to their results.
#[axum::debug_handler]
async fn select_patient(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<WorkflowRes> {
    let id = parse_patient_id(&id)?;
    state
        .session
        .with_controller(|c| c.select_patient(id))
        .await
        .map_err(api_error)?;
    Ok(snapshot(&state).await)
}

#[utoipa::path(
    get,
    path = "/matching/candidates",
    responses((status = 200, description = "Patients eligible for matching", body = ListPatientsRes))
)]
#[axum::debug_handler]
async fn matching_candidates(State(state): State<AppState>) -> Json<ListPatientsRes> {
    let patients = state
        .session
        .with_controller(|c| c.matching_candidates())
        .await;
    Json(patients.into())
}

#[utoipa::path(
    post,
    path = "/matching/candidates/{id}/select",
    params(("id" = String, Path, description = "Patient id")),
    responses(
        (status = 200, description = "Profile review opened", body = WorkflowRes),
        (status = 409, description = "Patient has not consented", body = ErrorRes)
    )
)]
#[axum::debug_handler]
async fn select_for_matching(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<WorkflowRes> {
    let id = parse_patient_id(&id)?;
    state
        .session
        .with_controller(|c| c.select_for_matching(id))
        .await
        .map_err(api_error)?;
    Ok(snapshot(&state).await)
}

fn form_step_res(step: FormStep) -> Json<FormStepRes> {
    Json(FormStepRes {
        step: step.number(),
        title: step.title().to_string(),
    })
}

#[utoipa::path(
    post,
    path = "/intake/form/next",
    responses((status = 200, description = "Form step after moving forward", body = FormStepRes))
)]
#[axum::debug_handler]
async fn form_next(State(state): State<AppState>) -> ApiResult<FormStepRes> {
    let step = state
        .session
        .with_controller(|c| c.form_next())
        .await
        .map_err(api_error)?;
    Ok(form_step_res(step))
}

#[utoipa::path(
    post,
    path = "/intake/form/previous",
    responses((status = 200, description = "Form step after moving back", body = FormStepRes))
)]
#[axum::debug_handler]
async fn form_previous(State(state): State<AppState>) -> ApiResult<FormStepRes> {
    let step = state
        .session
        .with_controller(|c| c.form_previous())
        .await
        .map_err(api_error)?;
    Ok(form_step_res(step))
}

#[utoipa::path(
    post,
    path = "/intake/form",
    request_body = CreatePatientReq,
    responses(
        (status = 201, description = "Patient added as pending", body = PatientRes),
        (status = 400, description = "Missing required fields", body = ErrorRes)
    )
)]
#[axum::debug_handler]
async fn submit_form(
    State(state): State<AppState>,
    Json(req): Json<CreatePatientReq>,
) -> Result<(StatusCode, Json<PatientRes>), ApiError> {
    let patient = state
        .session
        .with_controller(|c| c.submit_form(req.into()))
        .await
        .map_err(api_error)?;
    Ok((StatusCode::CREATED, Json(patient.into())))
}

#[utoipa::path(
    post,
    path = "/intake/ehr/connect",
    request_body = EhrConnectReq,
    responses(
        (status = 200, description = "Connected", body = EhrConnectRes),
        (status = 400, description = "Unknown EHR system", body = ErrorRes)
    )
)]
#[axum::debug_handler]
async fn ehr_connect(
    State(state): State<AppState>,
    Json(req): Json<EhrConnectReq>,
) -> ApiResult<EhrConnectRes> {
    let system: EhrSystem = req.system.parse().map_err(api_error)?;
    let connected = settled(state.session.connect_ehr(system).await)?;
    Ok(Json(connected.into()))
}

#[utoipa::path(
    post,
    path = "/intake/ehr/search",
    request_body = EhrSearchReq,
    responses(
        (status = 200, description = "Matching EHR records", body = EhrSearchRes),
        (status = 400, description = "Empty query", body = ErrorRes),
        (status = 404, description = "No patients found", body = ErrorRes)
    )
)]
#[axum::debug_handler]
async fn ehr_search(
    State(state): State<AppState>,
    Json(req): Json<EhrSearchReq>,
) -> ApiResult<EhrSearchRes> {
    let records = settled(state.session.search_ehr(&req.query).await)?;
    Ok(Json(EhrSearchRes {
        records: records.into_iter().map(EhrRecordRes::from).collect(),
    }))
}

#[utoipa::path(
    post,
    path = "/intake/ehr/import",
    request_body = EhrImportReq,
    responses(
        (status = 201, description = "Patient imported as pending", body = PatientRes),
        (status = 404, description = "Record not in the search results", body = ErrorRes)
    )
)]
#[axum::debug_handler]
async fn ehr_import(
    State(state): State<AppState>,
    Json(req): Json<EhrImportReq>,
) -> Result<(StatusCode, Json<PatientRes>), ApiError> {
    let patient = state
        .session
        .with_controller(|c| c.import_ehr_record(&req.ehr_id))
        .await
        .map_err(api_error)?;
    Ok((StatusCode::CREATED, Json(patient.into())))
}

#[utoipa::path(
    post,
    path = "/intake/documents",
    request_body = UploadDocumentsReq,
    responses((status = 200, description = "All staged files", body = DocumentsRes))
)]
#[axum::debug_handler]
async fn upload_documents(
    State(state): State<AppState>,
    Json(req): Json<UploadDocumentsReq>,
) -> ApiResult<DocumentsRes> {
    let files = req
        .files
        .into_iter()
        .map(|f| UploadedDocument::new(f.name, f.size, f.media_type))
        .collect();
    let staged = state
        .session
        .with_controller(|c| c.upload_documents(files))
        .await
        .map_err(api_error)?;
    Ok(Json(staged.into()))
}

#[utoipa::path(
    delete,
    path = "/intake/documents/{id}",
    params(("id" = String, Path, description = "Document id")),
    responses(
        (status = 200, description = "Remaining staged files", body = DocumentsRes),
        (status = 404, description = "Unknown document", body = ErrorRes)
    )
)]
#[axum::debug_handler]
async fn remove_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<DocumentsRes> {
    let id = DocumentId::parse(&id).map_err(|e| api_error(e.into()))?;
    let remaining = state
        .session
        .with_controller(|c| {
            c.remove_document(id)?;
            Ok::<_, WorkflowError>(
                c.document_upload()
                    .map(|u| u.files().to_vec())
                    .unwrap_or_default(),
            )
        })
        .await
        .map_err(api_error)?;
    Ok(Json(remaining.into()))
}

#[utoipa::path(
    post,
    path = "/intake/documents/process",
    responses(
        (status = 200, description = "Extracted patient details", body = ExtractedRes),
        (status = 400, description = "No files staged", body = ErrorRes)
    )
)]
#[axum::debug_handler]
async fn process_documents(State(state): State<AppState>) -> ApiResult<ExtractedRes> {
    let extracted = settled(state.session.extract_documents().await)?;
    Ok(Json(extracted.into()))
}

#[utoipa::path(
    post,
    path = "/intake/documents/submit",
    responses(
        (status = 201, description = "Patient added as pending", body = PatientRes),
        (status = 400, description = "Documents not processed", body = ErrorRes)
    )
)]
#[axum::debug_handler]
async fn submit_documents(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<PatientRes>), ApiError> {
    let patient = state
        .session
        .with_controller(|c| c.submit_documents())
        .await
        .map_err(api_error)?;
    Ok((StatusCode::CREATED, Json(patient.into())))
}

#[utoipa::path(
    post,
    path = "/intake/quick-entry",
    request_body = QuickEntryReq,
    responses(
        (status = 201, description = "Patient added as pending", body = PatientRes),
        (status = 400, description = "Summary too short", body = ErrorRes)
    )
)]
#[axum::debug_handler]
async fn quick_entry(
    State(state): State<AppState>,
    Json(req): Json<QuickEntryReq>,
) -> Result<(StatusCode, Json<PatientRes>), ApiError> {
    let patient = settled(state.session.quick_entry(&req.summary).await)?;
    Ok((StatusCode::CREATED, Json(patient.into())))
}

#[utoipa::path(
    post,
    path = "/consent/e-consent",
    request_body = EConsentReq,
    responses(
        (status = 200, description = "Consent completed", body = PatientRes),
        (status = 400, description = "Missing destination", body = ErrorRes),
        (status = 409, description = "Cancelled or not valid in the current view", body = ErrorRes)
    )
)]
/// Send an e-consent form and wait for the patient to complete it.
#[axum::debug_handler]
async fn send_e_consent(
    State(state): State<AppState>,
    Json(req): Json<EConsentReq>,
) -> ApiResult<PatientRes> {
    let patient = settled(
        state
            .session
            .request_consent(req.method, req.destination.as_deref())
            .await,
    )?;
    Ok(Json(patient.into()))
}

#[utoipa::path(
    post,
    path = "/consent/manual",
    request_body = ManualConsentReq,
    responses(
        (status = 200, description = "Consent recorded", body = PatientRes),
        (status = 400, description = "Missing or malformed signature", body = ErrorRes)
    )
)]
#[axum::debug_handler]
async fn record_manual_consent(
    State(state): State<AppState>,
    Json(req): Json<ManualConsentReq>,
) -> ApiResult<PatientRes> {
    let signature = req
        .signature
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .map(SignatureArtifact::from_data_url)
        .transpose()
        .map_err(|e| api_error(e.into()))?;
    let patient = settled(state.session.record_manual_consent(signature).await)?;
    Ok(Json(patient.into()))
}

async fn profile_res(state: &AppState) -> ApiResult<ProfileRes> {
    state
        .session
        .with_controller(|c| {
            c.review()
                .map(ProfileRes::from)
                .ok_or(WorkflowError::NoPatientSelected)
        })
        .await
        .map(Json)
        .map_err(api_error)
}

#[utoipa::path(
    get,
    path = "/profile",
    responses(
        (status = 200, description = "Profile review selection", body = ProfileRes),
        (status = 409, description = "No profile review open", body = ErrorRes)
    )
)]
#[axum::debug_handler]
async fn profile(State(state): State<AppState>) -> ApiResult<ProfileRes> {
    profile_res(&state).await
}

#[utoipa::path(
    post,
    path = "/profile/categories/{category}/toggle",
    params(("category" = String, Path, description = "e.g. genomics, clinical_notes")),
    responses((status = 200, description = "Updated selection", body = ProfileRes))
)]
#[axum::debug_handler]
async fn toggle_category(
    State(state): State<AppState>,
    Path(category): Path<DataCategory>,
) -> ApiResult<ProfileRes> {
    state
        .session
        .with_controller(|c| c.toggle_category(category))
        .await
        .map_err(api_error)?;
    profile_res(&state).await
}

#[utoipa::path(
    post,
    path = "/profile/documents/{id}/toggle",
    params(("id" = String, Path, description = "Timeline document id")),
    responses(
        (status = 200, description = "Updated selection", body = ProfileRes),
        (status = 404, description = "Unknown document", body = ErrorRes)
    )
)]
#[axum::debug_handler]
async fn toggle_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<ProfileRes> {
    state
        .session
        .with_controller(|c| c.toggle_document(&id))
        .await
        .map_err(api_error)?;
    profile_res(&state).await
}

#[utoipa::path(
    post,
    path = "/profile/select-all",
    responses((status = 200, description = "Everything selected", body = ProfileRes))
)]
#[axum::debug_handler]
async fn select_all(State(state): State<AppState>) -> ApiResult<ProfileRes> {
    state
        .session
        .with_controller(|c| c.select_all())
        .await
        .map_err(api_error)?;
    profile_res(&state).await
}

#[utoipa::path(
    post,
    path = "/profile/clear-all",
    responses((status = 200, description = "Nothing selected", body = ProfileRes))
)]
#[axum::debug_handler]
async fn clear_all(State(state): State<AppState>) -> ApiResult<ProfileRes> {
    state
        .session
        .with_controller(|c| c.clear_all())
        .await
        .map_err(api_error)?;
    profile_res(&state).await
}

#[utoipa::path(
    post,
    path = "/profile/proceed",
    responses(
        (status = 200, description = "Matched trials, best first", body = TrialsRes),
        (status = 400, description = "Nothing selected", body = ErrorRes),
        (status = 409, description = "Cancelled by navigation", body = ErrorRes)
    )
)]
/// Run trial matching on the current selection. Waits until matching finishes.
#[axum::debug_handler]
async fn proceed(State(state): State<AppState>) -> ApiResult<TrialsRes> {
    let trials = settled(state.session.proceed_to_matching().await)?;
    Ok(Json(trials.into()))
}

#[utoipa::path(
    post,
    path = "/matching/rerun",
    responses(
        (status = 200, description = "Matched trials, best first", body = TrialsRes),
        (status = 409, description = "Not on the results view", body = ErrorRes)
    )
)]
#[axum::debug_handler]
async fn rerun(State(state): State<AppState>) -> ApiResult<TrialsRes> {
    let trials = settled(state.session.rerun_matching().await)?;
    Ok(Json(trials.into()))
}

#[utoipa::path(
    get,
    path = "/trials",
    responses((status = 200, description = "Trial catalogue, best score first", body = TrialsRes))
)]
#[axum::debug_handler]
async fn list_trials(State(state): State<AppState>) -> Json<TrialsRes> {
    Json(state.catalogue.ranked().into())
}

#[utoipa::path(
    get,
    path = "/referrals",
    responses((status = 200, description = "Referrals sent this session", body = ReferralsRes))
)]
#[axum::debug_handler]
async fn list_referrals(State(state): State<AppState>) -> Json<ReferralsRes> {
    let referrals = state
        .session
        .with_controller(|c| c.referrals().to_vec())
        .await;
    Json(ReferralsRes {
        referrals: referrals.into_iter().map(ReferralRes::from).collect(),
    })
}

#[utoipa::path(
    post,
    path = "/referrals",
    request_body = ReferralReq,
    responses(
        (status = 201, description = "Referral sent", body = ReferralRes),
        (status = 404, description = "Trial not among the results", body = ErrorRes)
    )
)]
#[axum::debug_handler]
async fn send_referral(
    State(state): State<AppState>,
    Json(req): Json<ReferralReq>,
) -> Result<(StatusCode, Json<ReferralRes>), ApiError> {
    let referral = state
        .session
        .with_controller(|c| c.send_referral(&req.trial_id))
        .await
        .map_err(api_error)?;
    Ok((StatusCode::CREATED, Json(referral.into())))
}

#[utoipa::path(
    get,
    path = "/notifications",
    responses((status = 200, description = "Notifications raised since the last call", body = NotificationsRes))
)]
#[axum::debug_handler]
async fn notifications(State(state): State<AppState>) -> Json<NotificationsRes> {
    Json(NotificationsRes {
        notifications: state
            .notifications
            .drain()
            .into_iter()
            .map(NotificationRes::from)
            .collect(),
    })
}
