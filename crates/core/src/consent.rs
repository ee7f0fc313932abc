//! Consent capture.
//!
//! Consent is obtained either by sending an e-consent form (email or SMS) and waiting for the
//! patient to complete it, or by recording a signature captured in person. Both paths validate
//! their input before touching the delivery service; a rejected request never reaches it.

use crate::error::ValidationError;
use crate::notify::Notifier;
use crate::patient::Patient;
use crate::services::ConsentDelivery;
use crate::task::OperationToken;
use crate::WorkflowResult;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use trialos_ids::PatientId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsentMethod {
    Email,
    Sms,
    Manual,
}

impl ConsentMethod {
    /// What the method needs in order to go ahead, phrased for error messages.
    pub fn destination_field(&self) -> &'static str {
        match self {
            ConsentMethod::Email => "an email address",
            ConsentMethod::Sms => "a phone number",
            ConsentMethod::Manual => "a signature",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConsentMethod::Email => "email",
            ConsentMethod::Sms => "sms",
            ConsentMethod::Manual => "manual",
        }
    }
}

impl fmt::Display for ConsentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A captured signature image. The bytes are opaque to this crate.
#[derive(Clone, PartialEq, Eq)]
pub struct SignatureArtifact {
    media_type: String,
    bytes: Vec<u8>,
}

impl fmt::Debug for SignatureArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignatureArtifact")
            .field("media_type", &self.media_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl SignatureArtifact {
    /// # Errors
    ///
    /// Returns [`ValidationError::MissingSignature`] if `bytes` is empty.
    pub fn from_bytes(
        media_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Result<Self, ValidationError> {
        if bytes.is_empty() {
            return Err(ValidationError::MissingSignature);
        }
        Ok(Self {
            media_type: media_type.into(),
            bytes,
        })
    }

    /// Decodes a `data:<media type>;base64,<payload>` URL, the format a signature canvas exports.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::MissingSignature`] for a blank URL or an empty payload, and
    /// [`ValidationError::InvalidSignature`] for anything that is not a base64 data URL.
    pub fn from_data_url(url: &str) -> Result<Self, ValidationError> {
        let url = url.trim();
        if url.is_empty() {
            return Err(ValidationError::MissingSignature);
        }

        let rest = url
            .strip_prefix("data:")
            .ok_or_else(|| ValidationError::InvalidSignature("not a data URL".into()))?;
        let (header, payload) = rest
            .split_once(',')
            .ok_or_else(|| ValidationError::InvalidSignature("missing payload".into()))?;
        let media_type = header.strip_suffix(";base64").ok_or_else(|| {
            ValidationError::InvalidSignature("only base64 data URLs are supported".into())
        })?;
        if !media_type.starts_with("image/") {
            return Err(ValidationError::InvalidSignature(format!(
                "expected an image, got '{media_type}'"
            )));
        }

        let bytes = STANDARD
            .decode(payload)
            .map_err(|e| ValidationError::InvalidSignature(e.to_string()))?;
        Self::from_bytes(media_type, bytes)
    }

    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Proof that consent completed for a patient.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsentRecord {
    pub patient: PatientId,
    pub method: ConsentMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
    pub signature_captured: bool,
    pub completed_at: DateTime<Utc>,
}

/// Checks that `destination` is usable for an e-consent `method` and returns it trimmed.
///
/// Manual consent has no destination and is always rejected here; it goes through
/// [`validate_signature`] instead.
pub fn validate_destination(
    method: ConsentMethod,
    destination: Option<&str>,
) -> Result<String, ValidationError> {
    let destination = destination.map(str::trim).unwrap_or_default();
    if method == ConsentMethod::Manual || destination.is_empty() {
        return Err(ValidationError::MissingDestination { method });
    }
    Ok(destination.to_string())
}

pub fn validate_signature(
    signature: Option<SignatureArtifact>,
) -> Result<SignatureArtifact, ValidationError> {
    match signature {
        Some(signature) if !signature.is_empty() => Ok(signature),
        _ => Err(ValidationError::MissingSignature),
    }
}

/// Drives the consent step against a [`ConsentDelivery`] service.
#[derive(Clone)]
pub struct ConsentCollaborator {
    delivery: Arc<dyn ConsentDelivery>,
    notifier: Arc<dyn Notifier>,
}

impl ConsentCollaborator {
    pub fn new(delivery: Arc<dyn ConsentDelivery>, notifier: Arc<dyn Notifier>) -> Self {
        Self { delivery, notifier }
    }

    /// Sends an e-consent form and waits for the patient to complete it.
    ///
    /// # Errors
    ///
    /// Returns a validation error, without calling the delivery service, if the destination for
    /// `method` is missing. Returns [`crate::WorkflowError::Cancelled`] if `token` is cancelled
    /// while waiting.
    pub async fn request_consent(
        &self,
        patient: &Patient,
        method: ConsentMethod,
        destination: Option<&str>,
        token: &OperationToken,
    ) -> WorkflowResult<ConsentRecord> {
        let destination = validate_destination(method, destination).inspect_err(|err| {
            let (title, message) = err.notice();
            self.notifier.error(title, &message);
        })?;

        self.delivery
            .send_consent(patient, method, &destination, token)
            .await?;
        self.notifier.success(
            "E-Consent Sent",
            &format!(
                "E-consent form has been sent to {} via {method} ({destination}).",
                patient.name
            ),
        );

        self.delivery.await_response(patient, token).await?;
        self.notifier.success(
            "E-Consent Completed",
            &format!("{} has completed the e-consent form.", patient.name),
        );

        Ok(ConsentRecord {
            patient: patient.id,
            method,
            destination: Some(destination),
            signature_captured: false,
            completed_at: Utc::now(),
        })
    }

    /// Stores a signature captured in person.
    ///
    /// # Errors
    ///
    /// Returns a validation error, without calling the delivery service, if `signature` is
    /// absent or empty.
    pub async fn record_manual_consent(
        &self,
        patient: &Patient,
        signature: Option<SignatureArtifact>,
        token: &OperationToken,
    ) -> WorkflowResult<ConsentRecord> {
        let signature = validate_signature(signature).inspect_err(|err| {
            let (title, message) = err.notice();
            self.notifier.error(title, &message);
        })?;

        self.delivery
            .save_signature(patient, &signature, token)
            .await?;
        self.notifier.success(
            "Consent Recorded",
            &format!(
                "Manual consent for {} has been successfully recorded.",
                patient.name
            ),
        );

        Ok(ConsentRecord {
            patient: patient.id,
            method: ConsentMethod::Manual,
            destination: None,
            signature_captured: true,
            completed_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::RecordingNotifier;
    use crate::patient::ConsentStatus;
    use crate::WorkflowError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingDelivery {
        sends: AtomicUsize,
        responses: AtomicUsize,
        saves: AtomicUsize,
    }

    #[async_trait]
    impl ConsentDelivery for CountingDelivery {
        async fn send_consent(
            &self,
            _patient: &Patient,
            _method: ConsentMethod,
            _destination: &str,
            token: &OperationToken,
        ) -> WorkflowResult<()> {
            self.sends.fetch_add(1, Ordering::SeqCst);
            token.check()
        }

        async fn await_response(
            &self,
            _patient: &Patient,
            token: &OperationToken,
        ) -> WorkflowResult<()> {
            self.responses.fetch_add(1, Ordering::SeqCst);
            token.check()
        }

        async fn save_signature(
            &self,
            _patient: &Patient,
            _signature: &SignatureArtifact,
            token: &OperationToken,
        ) -> WorkflowResult<()> {
            self.saves.fetch_add(1, Ordering::SeqCst);
            token.check()
        }
    }

    fn patient() -> Patient {
        Patient::seeded(
            11438,
            "Michael Chen",
            42,
            "Colorectal Cancer",
            ConsentStatus::Pending,
            Utc::now(),
        )
    }

    fn collaborator() -> (ConsentCollaborator, Arc<CountingDelivery>, Arc<RecordingNotifier>) {
        let delivery = Arc::new(CountingDelivery::default());
        let notifier = Arc::new(RecordingNotifier::new());
        (
            ConsentCollaborator::new(delivery.clone(), notifier.clone()),
            delivery,
            notifier,
        )
    }

    #[tokio::test]
    async fn test_email_with_empty_destination_never_reaches_delivery() {
        let (consent, delivery, notifier) = collaborator();

        let err = consent
            .request_consent(&patient(), ConsentMethod::Email, Some(""), &OperationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            WorkflowError::Validation(ValidationError::MissingDestination {
                method: ConsentMethod::Email
            })
        ));
        assert_eq!(delivery.sends.load(Ordering::SeqCst), 0);
        assert_eq!(notifier.titles(), vec!["Email Required"]);
    }

    #[tokio::test]
    async fn test_sms_consent_sends_then_waits() {
        let (consent, delivery, notifier) = collaborator();

        let record = consent
            .request_consent(
                &patient(),
                ConsentMethod::Sms,
                Some(" 5551234567 "),
                &OperationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(record.destination.as_deref(), Some("5551234567"));
        assert!(!record.signature_captured);
        assert_eq!(delivery.sends.load(Ordering::SeqCst), 1);
        assert_eq!(delivery.responses.load(Ordering::SeqCst), 1);
        assert_eq!(
            notifier.titles(),
            vec!["E-Consent Sent", "E-Consent Completed"]
        );
    }

    #[tokio::test]
    async fn test_manual_consent_without_signature_is_rejected() {
        let (consent, delivery, notifier) = collaborator();

        let err = consent
            .record_manual_consent(&patient(), None, &OperationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            WorkflowError::Validation(ValidationError::MissingSignature)
        ));
        assert_eq!(delivery.saves.load(Ordering::SeqCst), 0);
        assert_eq!(notifier.titles(), vec!["Signature Required"]);
    }

    #[tokio::test]
    async fn test_manual_consent_records_signature() {
        let (consent, delivery, notifier) = collaborator();
        let signature = SignatureArtifact::from_bytes("image/png", vec![1, 2, 3]).unwrap();

        let record = consent
            .record_manual_consent(&patient(), Some(signature), &OperationToken::new())
            .await
            .unwrap();

        assert_eq!(record.method, ConsentMethod::Manual);
        assert!(record.signature_captured);
        assert_eq!(delivery.saves.load(Ordering::SeqCst), 1);
        assert_eq!(notifier.titles(), vec!["Consent Recorded"]);
    }

    #[test]
    fn test_signature_from_data_url() {
        let url = format!("data:image/png;base64,{}", STANDARD.encode([137u8, 80, 78, 71]));
        let signature = SignatureArtifact::from_data_url(&url).unwrap();
        assert_eq!(signature.media_type(), "image/png");
        assert_eq!(signature.as_bytes(), &[137, 80, 78, 71]);
    }

    #[test]
    fn test_signature_data_url_errors() {
        assert_eq!(
            SignatureArtifact::from_data_url("  "),
            Err(ValidationError::MissingSignature)
        );
        assert_eq!(
            SignatureArtifact::from_data_url("data:image/png;base64,"),
            Err(ValidationError::MissingSignature)
        );
        assert!(matches!(
            SignatureArtifact::from_data_url("https://example.com/sig.png"),
            Err(ValidationError::InvalidSignature(_))
        ));
        assert!(matches!(
            SignatureArtifact::from_data_url("data:text/plain;base64,aGk="),
            Err(ValidationError::InvalidSignature(_))
        ));
        assert!(matches!(
            SignatureArtifact::from_data_url("data:image/png;base64,!!!"),
            Err(ValidationError::InvalidSignature(_))
        ));
    }

    #[test]
    fn test_manual_method_has_no_destination() {
        assert!(validate_destination(ConsentMethod::Manual, Some("x")).is_err());
        assert_eq!(
            validate_destination(ConsentMethod::Email, Some(" a@b.org ")).unwrap(),
            "a@b.org"
        );
    }
}
