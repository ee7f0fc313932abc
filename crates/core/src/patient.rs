//! Patient data model.
//!
//! A [`Patient`] is always created with [`ConsentStatus::Pending`] from a [`PatientDraft`]. Only
//! the roster changes its status, and only along `pending -> consented -> matched`.

use crate::constants::{DATE_FORMAT, UNKNOWN, UNKNOWN_AGE};
use crate::error::ValidationError;
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use trialos_ids::PatientId;

/// Where a patient sits in the consent and matching lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsentStatus {
    Pending,
    Consented,
    Matched,
}

impl ConsentStatus {
    /// Returns true if a patient in this status may move to `next`.
    ///
    /// Re-running matching for a matched patient keeps it matched, so `Matched -> Matched` is
    /// allowed. Every other self-transition and every backwards step is rejected.
    pub fn can_transition_to(self, next: ConsentStatus) -> bool {
        matches!(
            (self, next),
            (ConsentStatus::Pending, ConsentStatus::Consented)
                | (ConsentStatus::Consented, ConsentStatus::Matched)
                | (ConsentStatus::Matched, ConsentStatus::Matched)
        )
    }

    /// Consented and matched patients may be sent to trial matching.
    pub fn can_enter_matching(self) -> bool {
        matches!(self, ConsentStatus::Consented | ConsentStatus::Matched)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConsentStatus::Pending => "pending",
            ConsentStatus::Consented => "consented",
            ConsentStatus::Matched => "matched",
        }
    }
}

impl fmt::Display for ConsentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The intake path that produced a patient record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IntakeSource {
    /// Part of the demo roster.
    Seeded,
    ManualForm,
    EhrImport {
        ehr_id: String,
        mrn: String,
    },
    DocumentUpload {
        extracted_from: Vec<String>,
        document_count: usize,
    },
    QuickEntry,
}

impl IntakeSource {
    pub fn label(&self) -> &'static str {
        match self {
            IntakeSource::Seeded => "seeded",
            IntakeSource::ManualForm => "manual form",
            IntakeSource::EhrImport { .. } => "EHR import",
            IntakeSource::DocumentUpload { .. } => "document upload",
            IntakeSource::QuickEntry => "quick entry",
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

impl ContactDetails {
    /// Builds contact details, dropping blank values.
    pub fn new(email: Option<&str>, phone: Option<&str>) -> Self {
        let clean = |v: Option<&str>| {
            v.map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };
        Self {
            email: clean(email),
            phone: clean(phone),
        }
    }
}

/// The uniform payload every intake path produces.
///
/// Unknown values are carried as explicit sentinels rather than left out. The identifier is not
/// part of the draft; the roster assigns it on admission.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientDraft {
    pub name: String,
    pub age: u32,
    pub diagnosis: String,
    pub sex: String,
    #[serde(default)]
    pub contact: ContactDetails,
    pub source: IntakeSource,
}

impl PatientDraft {
    /// Creates a draft, replacing blank name, diagnosis or sex with [`UNKNOWN`].
    pub fn new(
        name: impl Into<String>,
        age: u32,
        diagnosis: impl Into<String>,
        source: IntakeSource,
    ) -> Self {
        Self {
            name: or_unknown(name.into()),
            age,
            diagnosis: or_unknown(diagnosis.into()),
            sex: UNKNOWN.to_string(),
            contact: ContactDetails::default(),
            source,
        }
    }

    pub fn with_sex(mut self, sex: impl Into<String>) -> Self {
        self.sex = or_unknown(sex.into());
        self
    }

    pub fn with_contact(mut self, contact: ContactDetails) -> Self {
        self.contact = contact;
        self
    }
}

fn or_unknown(value: String) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        UNKNOWN.to_string()
    } else {
        trimmed.to_string()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patient {
    pub id: PatientId,
    pub name: String,
    pub age: u32,
    pub diagnosis: String,
    pub sex: String,
    pub status: ConsentStatus,
    #[serde(default)]
    pub contact: ContactDetails,
    pub source: IntakeSource,
    pub created_at: DateTime<Utc>,
}

impl Patient {
    /// A freshly admitted patient. Always pending.
    pub(crate) fn admitted(id: PatientId, draft: PatientDraft, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            name: draft.name,
            age: draft.age,
            diagnosis: draft.diagnosis,
            sex: draft.sex,
            status: ConsentStatus::Pending,
            contact: draft.contact,
            source: draft.source,
            created_at,
        }
    }

    /// A demo roster entry with a fixed status.
    pub(crate) fn seeded(
        id: u32,
        name: &str,
        age: u32,
        diagnosis: &str,
        status: ConsentStatus,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: PatientId::from_number(id),
            name: name.to_string(),
            age,
            diagnosis: diagnosis.to_string(),
            sex: UNKNOWN.to_string(),
            status,
            contact: ContactDetails::default(),
            source: IntakeSource::Seeded,
            created_at,
        }
    }
}

/// Parses a `YYYY-MM-DD` date of birth. Blank input means "not provided".
///
/// # Errors
///
/// Returns [`ValidationError::InvalidDate`] if the input is not blank and not a valid date.
pub fn parse_birth_date(input: &str) -> Result<Option<NaiveDate>, ValidationError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(trimmed, DATE_FORMAT)
        .map(Some)
        .map_err(|_| ValidationError::InvalidDate(trimmed.to_string()))
}

/// Age in whole years on `today`.
///
/// The year difference is decremented when the birthday has not yet occurred this year. A missing
/// date of birth, or one in the future, yields [`UNKNOWN_AGE`].
pub fn age_on(birth_date: Option<NaiveDate>, today: NaiveDate) -> u32 {
    let Some(birth) = birth_date else {
        return UNKNOWN_AGE;
    };

    let mut years = today.year() - birth.year();
    if (today.month(), today.day()) < (birth.month(), birth.day()) {
        years -= 1;
    }
    u32::try_from(years).unwrap_or(UNKNOWN_AGE)
}
