//! Request and response bodies for the REST API.
//!
//! Core types stay free of OpenAPI concerns; everything the API exposes is mapped into one of
//! these schema types first.

use serde::{Deserialize, Serialize};
use trialos_core::consent::ConsentMethod;
use trialos_core::intake::{
    EhrRecord, EhrSystem, IntakeKind, PartialPatient, PatientForm, UploadedDocument,
};
use trialos_core::notify::Notification;
use trialos_core::profile::{DataCategory, ProfileReview};
use trialos_core::routing::{Destination, Route};
use trialos_core::trial::Referral;
use trialos_core::workflow::{IntakeProgress, WorkflowSnapshot};
use trialos_core::{Patient, Trial};
use utoipa::ToSchema;

/// The serialized name of a unit enum variant, e.g. `clinical_notes`.
fn wire_name<T: Serialize>(value: T) -> String {
    match serde_json::to_value(value) {
        Ok(serde_json::Value::String(name)) => name,
        _ => String::new(),
    }
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct ErrorRes {
    pub error: String,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct RouteRes {
    pub path: String,
    pub title: String,
    pub found: bool,
}

impl From<Destination> for RouteRes {
    fn from(destination: Destination) -> Self {
        Self {
            path: destination.path().to_string(),
            title: destination.title().to_string(),
            found: true,
        }
    }
}

impl From<Route> for RouteRes {
    fn from(route: Route) -> Self {
        match route {
            Route::Page { destination } => destination.into(),
            Route::NotFound { path } => Self {
                path,
                title: "Page Not Found".to_string(),
                found: false,
            },
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct NavigateReq {
    pub path: String,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct PatientRes {
    pub id: String,
    pub name: String,
    pub age: u32,
    pub diagnosis: String,
    pub sex: String,
    /// One of `pending`, `consented`, `matched`.
    pub status: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    /// The intake path that added the patient.
    pub source: String,
    pub created_at: String,
}

impl From<Patient> for PatientRes {
    fn from(p: Patient) -> Self {
        Self {
            id: p.id.to_string(),
            source: p.source.label().to_string(),
            name: p.name,
            age: p.age,
            diagnosis: p.diagnosis,
            sex: p.sex,
            status: p.status.to_string(),
            email: p.contact.email,
            phone: p.contact.phone,
            created_at: p.created_at.to_rfc3339(),
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct ListPatientsRes {
    pub patients: Vec<PatientRes>,
}

impl From<Vec<Patient>> for ListPatientsRes {
    fn from(patients: Vec<Patient>) -> Self {
        Self {
            patients: patients.into_iter().map(PatientRes::from).collect(),
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct TrialRes {
    pub id: String,
    pub title: String,
    pub phase: String,
    pub sponsor: String,
    pub status: String,
    pub score: u8,
    pub location: String,
    pub distance: String,
    pub start_date: String,
    pub end_date: String,
    pub enrollment_target: u32,
    pub enrollment_current: u32,
    pub criteria_met: Vec<String>,
    pub criteria_unmet: Vec<String>,
}

impl From<Trial> for TrialRes {
    fn from(t: Trial) -> Self {
        Self {
            id: t.id,
            title: t.title,
            phase: t.phase,
            sponsor: t.sponsor,
            status: t.status,
            score: t.score,
            location: t.location,
            distance: t.distance,
            start_date: t.start_date.to_string(),
            end_date: t.end_date.to_string(),
            enrollment_target: t.enrollment.target,
            enrollment_current: t.enrollment.current,
            criteria_met: t.criteria.met,
            criteria_unmet: t.criteria.unmet,
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct TrialsRes {
    pub trials: Vec<TrialRes>,
}

impl From<Vec<Trial>> for TrialsRes {
    fn from(trials: Vec<Trial>) -> Self {
        Self {
            trials: trials.into_iter().map(TrialRes::from).collect(),
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct ReferralRes {
    pub patient_id: String,
    pub trial_id: String,
    pub trial_title: String,
    pub sent_at: String,
}

impl From<Referral> for ReferralRes {
    fn from(r: Referral) -> Self {
        Self {
            patient_id: r.patient.to_string(),
            trial_id: r.trial_id,
            trial_title: r.trial_title,
            sent_at: r.sent_at.to_rfc3339(),
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct ReferralReq {
    pub trial_id: String,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct ReferralsRes {
    pub referrals: Vec<ReferralRes>,
}

/// Current state of the workflow.
#[derive(Serialize, Deserialize, ToSchema)]
pub struct WorkflowRes {
    pub view: String,
    pub history: Vec<String>,
    pub selected_patient: Option<PatientRes>,
    pub active_operation: Option<String>,
    pub processing_stage: Option<String>,
    /// Intake path in progress, if any: `form`, `ehr`, `documents` or `quick_entry`.
    pub intake: Option<String>,
    /// Current manual form step (1 to 5) while the form is open.
    pub form_step: Option<usize>,
    pub results: Vec<TrialRes>,
    pub referral_count: usize,
}

impl From<WorkflowSnapshot> for WorkflowRes {
    fn from(s: WorkflowSnapshot) -> Self {
        let (intake, form_step) = match &s.intake {
            IntakeProgress::None => (None, None),
            IntakeProgress::Form { wizard } => (Some("form"), Some(wizard.step().number())),
            IntakeProgress::Ehr { .. } => (Some("ehr"), None),
            IntakeProgress::Documents { .. } => (Some("documents"), None),
            IntakeProgress::QuickEntry => (Some("quick_entry"), None),
        };
        Self {
            view: s.view.to_string(),
            history: s.history.iter().map(ToString::to_string).collect(),
            selected_patient: s.selected_patient.map(PatientRes::from),
            active_operation: s.active_operation.map(|k| k.to_string()),
            processing_stage: s.processing_stage.map(|stage| stage.title().to_string()),
            intake: intake.map(str::to_string),
            form_step,
            results: s.results.into_iter().map(TrialRes::from).collect(),
            referral_count: s.referrals.len(),
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct ChooseIntakeReq {
    /// One of `form`, `ehrImport`, `docUpload`, `quickEntry`.
    #[schema(value_type = String)]
    pub kind: IntakeKind,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct FormStepRes {
    pub step: usize,
    pub title: String,
}

/// Manual add-patient form.
#[derive(Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct CreatePatientReq {
    pub first_name: String,
    pub last_name: String,
    /// `YYYY-MM-DD`; optional.
    pub date_of_birth: String,
    pub gender: String,
    pub contact_email: String,
    pub contact_phone: String,
    pub primary_diagnosis: String,
    pub diagnosis_date: String,
    pub cancer_stage: String,
    pub histology: String,
    pub previous_treatments: String,
    pub current_treatments: String,
    pub recent_lab_results: String,
    pub ecog_status: Option<String>,
    pub additional_notes: String,
}

impl From<CreatePatientReq> for PatientForm {
    fn from(req: CreatePatientReq) -> Self {
        let defaults = PatientForm::default();
        PatientForm {
            first_name: req.first_name,
            last_name: req.last_name,
            date_of_birth: req.date_of_birth,
            gender: req.gender,
            contact_email: req.contact_email,
            contact_phone: req.contact_phone,
            primary_diagnosis: req.primary_diagnosis,
            diagnosis_date: req.diagnosis_date,
            cancer_stage: req.cancer_stage,
            histology: req.histology,
            previous_treatments: req.previous_treatments,
            current_treatments: req.current_treatments,
            recent_lab_results: req.recent_lab_results,
            ecog_status: req.ecog_status.unwrap_or(defaults.ecog_status),
            additional_notes: req.additional_notes,
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct EhrConnectReq {
    /// `epic`, `cerner`, `allscripts` or `athenahealth`.
    pub system: String,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct EhrConnectRes {
    pub connected: String,
}

impl From<EhrSystem> for EhrConnectRes {
    fn from(system: EhrSystem) -> Self {
        Self {
            connected: system.name().to_string(),
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct EhrSearchReq {
    pub query: String,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct EhrRecordRes {
    pub ehr_id: String,
    pub name: String,
    pub date_of_birth: String,
    pub gender: String,
    pub primary_diagnosis: String,
    pub mrn: String,
}

impl From<EhrRecord> for EhrRecordRes {
    fn from(r: EhrRecord) -> Self {
        Self {
            ehr_id: r.ehr_id,
            name: r.name,
            date_of_birth: r.date_of_birth.to_string(),
            gender: r.gender,
            primary_diagnosis: r.primary_diagnosis,
            mrn: r.mrn,
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct EhrSearchRes {
    pub records: Vec<EhrRecordRes>,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct EhrImportReq {
    pub ehr_id: String,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct DocumentReq {
    pub name: String,
    pub size: u64,
    pub media_type: String,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct UploadDocumentsReq {
    pub files: Vec<DocumentReq>,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct DocumentRes {
    pub id: String,
    pub name: String,
    pub size: String,
    pub media_type: String,
}

impl From<UploadedDocument> for DocumentRes {
    fn from(d: UploadedDocument) -> Self {
        Self {
            id: d.id.to_string(),
            size: d.display_size(),
            name: d.name,
            media_type: d.media_type,
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct DocumentsRes {
    pub files: Vec<DocumentRes>,
}

impl From<Vec<UploadedDocument>> for DocumentsRes {
    fn from(files: Vec<UploadedDocument>) -> Self {
        Self {
            files: files.into_iter().map(DocumentRes::from).collect(),
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct ExtractedRes {
    pub name: Option<String>,
    pub age: Option<u32>,
    pub sex: Option<String>,
    pub diagnosis: Option<String>,
}

impl From<PartialPatient> for ExtractedRes {
    fn from(p: PartialPatient) -> Self {
        Self {
            name: p.name,
            age: p.age,
            sex: p.sex,
            diagnosis: p.diagnosis,
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct QuickEntryReq {
    pub summary: String,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct EConsentReq {
    /// `email` or `sms`.
    #[schema(value_type = String)]
    pub method: ConsentMethod,
    pub destination: Option<String>,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct ManualConsentReq {
    /// Signature image as a `data:image/png;base64,...` URL.
    pub signature: Option<String>,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct CategoryRes {
    pub category: String,
    pub title: String,
    pub included: bool,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct TimelineEntryRes {
    pub id: String,
    #[serde(rename = "type")]
    pub entry_type: String,
    pub title: String,
    pub description: String,
    pub date: String,
    pub author: String,
    pub content: Option<String>,
    pub included: bool,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct ProfileRes {
    pub patient_id: String,
    pub categories: Vec<CategoryRes>,
    pub documents: Vec<TimelineEntryRes>,
}

impl From<&ProfileReview> for ProfileRes {
    fn from(review: &ProfileReview) -> Self {
        let categories = DataCategory::ALL
            .into_iter()
            .map(|category| CategoryRes {
                category: wire_name(category),
                title: category.title().to_string(),
                included: review.is_category_included(category),
            })
            .collect();
        let documents = review
            .documents()
            .iter()
            .map(|d| TimelineEntryRes {
                id: d.id.clone(),
                entry_type: wire_name(d.entry_type),
                title: d.title.clone(),
                description: d.description.clone(),
                date: d.date.to_string(),
                author: d.author.clone(),
                content: d.content.clone(),
                included: d.included,
            })
            .collect();
        Self {
            patient_id: review.patient().to_string(),
            categories,
            documents,
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct NotificationRes {
    /// `info`, `success` or `error`.
    pub kind: String,
    pub title: String,
    pub message: String,
}

impl From<Notification> for NotificationRes {
    fn from(n: Notification) -> Self {
        Self {
            kind: wire_name(n.kind),
            title: n.title,
            message: n.message,
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct NotificationsRes {
    pub notifications: Vec<NotificationRes>,
}
