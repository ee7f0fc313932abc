use crate::consent::ConsentMethod;
use crate::patient::ConsentStatus;
use crate::task::OperationKind;
use crate::workflow::View;
use trialos_ids::PatientId;

/// A local, synchronous rejection of user input.
///
/// Validation errors never change workflow state. The originating step reports them through the
/// notification collaborator using [`ValidationError::notice`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),
    #[error("at least one data category or document must be selected")]
    EmptySelection,
    #[error("text must be at least {min} characters, got {actual}")]
    TextTooShort { min: usize, actual: usize },
    #[error("search query cannot be empty")]
    EmptyQuery,
    #[error("at least one document must be uploaded")]
    NoDocuments,
    #[error("uploaded documents have not been processed")]
    DocumentsNotProcessed,
    #[error("{method} consent requires {}", .method.destination_field())]
    MissingDestination { method: ConsentMethod },
    #[error("a captured signature is required")]
    MissingSignature,
    #[error("invalid signature artifact: {0}")]
    InvalidSignature(String),
    #[error("invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),
}

impl ValidationError {
    /// Title and message shown to the user for this rejection.
    pub fn notice(&self) -> (&'static str, String) {
        match self {
            ValidationError::MissingFields(_) => (
                "Missing Information",
                "Please fill in all required fields before proceeding.".into(),
            ),
            ValidationError::EmptySelection => (
                "Selection Required",
                "Please select at least one data category for trial matching.".into(),
            ),
            ValidationError::TextTooShort { min, .. } => (
                "Summary Too Short",
                format!("Please enter at least {min} characters describing the patient."),
            ),
            ValidationError::EmptyQuery => (
                "Search Query Required",
                "Please enter a patient name or ID to search.".into(),
            ),
            ValidationError::NoDocuments => (
                "No Files Selected",
                "Please upload at least one document to continue.".into(),
            ),
            ValidationError::DocumentsNotProcessed => (
                "Data Not Processed",
                "Please process the uploaded documents first.".into(),
            ),
            ValidationError::MissingDestination {
                method: ConsentMethod::Sms,
            } => (
                "Phone Number Required",
                "Please enter a phone number to send the e-consent form via SMS.".into(),
            ),
            ValidationError::MissingDestination { .. } => (
                "Email Required",
                "Please enter an email address to send the e-consent form.".into(),
            ),
            ValidationError::MissingSignature | ValidationError::InvalidSignature(_) => (
                "Signature Required",
                "Please sign the consent form before submitting.".into(),
            ),
            ValidationError::InvalidDate(value) => (
                "Invalid Date",
                format!("'{value}' is not a valid date. Use YYYY-MM-DD."),
            ),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("event '{event}' is not valid in view '{view}'")]
    InvalidTransition { view: View, event: &'static str },
    #[error("unknown patient: {0}")]
    UnknownPatient(PatientId),
    #[error("no patient is selected")]
    NoPatientSelected,
    #[error("patient {0} has not consented to trial matching")]
    ConsentRequired(PatientId),
    #[error("patient {id} cannot move from {from} to {to}")]
    InvalidStatusTransition {
        id: PatientId,
        from: ConsentStatus,
        to: ConsentStatus,
    },
    #[error("a {0} operation is already in progress")]
    OperationInFlight(OperationKind),
    #[error("no EHR system is connected")]
    EhrNotConnected,
    #[error("unknown trial: {0}")]
    UnknownTrial(String),
    #[error("operation cancelled")]
    Cancelled,
    #[error("fixture error: {0}")]
    Fixture(String),
    #[error("failed to read fixture file: {0}")]
    FixtureRead(std::io::Error),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("identifier error: {0}")]
    Id(#[from] trialos_ids::IdError),
}

impl WorkflowError {
    /// True for the user-facing rejections modelled by the dashboard.
    pub fn is_user_facing(&self) -> bool {
        matches!(self, WorkflowError::Validation(_) | WorkflowError::NotFound(_))
    }
}

pub type WorkflowResult<T> = std::result::Result<T, WorkflowError>;
