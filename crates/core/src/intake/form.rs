//! Manual patient form.

use crate::error::ValidationError;
use crate::patient::{age_on, parse_birth_date, ContactDetails, IntakeSource, PatientDraft};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Every field of the add-patient form. Only first name, last name and primary diagnosis are
/// required; the rest are free text kept as entered.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PatientForm {
    pub first_name: String,
    pub last_name: String,
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
    pub ecog_status: String,
    pub additional_notes: String,
}

impl Default for PatientForm {
    fn default() -> Self {
        Self {
            first_name: String::new(),
            last_name: String::new(),
            date_of_birth: String::new(),
            gender: String::new(),
            contact_email: String::new(),
            contact_phone: String::new(),
            primary_diagnosis: String::new(),
            diagnosis_date: String::new(),
            cancer_stage: String::new(),
            histology: String::new(),
            previous_treatments: String::new(),
            current_treatments: String::new(),
            recent_lab_results: String::new(),
            ecog_status: "0".to_string(),
            additional_notes: String::new(),
        }
    }
}

impl PatientForm {
    /// # Errors
    ///
    /// Returns [`ValidationError::MissingFields`] naming every blank required field, or
    /// [`ValidationError::InvalidDate`] if a date of birth was entered but cannot be parsed.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut missing = Vec::new();
        if self.first_name.trim().is_empty() {
            missing.push("first name");
        }
        if self.last_name.trim().is_empty() {
            missing.push("last name");
        }
        if self.primary_diagnosis.trim().is_empty() {
            missing.push("primary diagnosis");
        }
        if !missing.is_empty() {
            return Err(ValidationError::MissingFields(missing));
        }

        parse_birth_date(&self.date_of_birth)?;
        Ok(())
    }

    /// Validates the form and turns it into a draft. Age is computed on `today`.
    pub fn into_draft(self, today: NaiveDate) -> Result<PatientDraft, ValidationError> {
        self.validate()?;
        let birth_date = parse_birth_date(&self.date_of_birth)?;

        let name = format!("{} {}", self.first_name.trim(), self.last_name.trim());
        let contact = ContactDetails::new(Some(&self.contact_email), Some(&self.contact_phone));

        Ok(PatientDraft::new(
            name,
            age_on(birth_date, today),
            self.primary_diagnosis,
            IntakeSource::ManualForm,
        )
        .with_sex(self.gender)
        .with_contact(contact))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FormStep {
    Demographics,
    Diagnosis,
    Treatment,
    Labs,
    Review,
}

impl FormStep {
    pub const ALL: [FormStep; 5] = [
        FormStep::Demographics,
        FormStep::Diagnosis,
        FormStep::Treatment,
        FormStep::Labs,
        FormStep::Review,
    ];

    /// One-based position shown in the step indicator.
    pub fn number(&self) -> usize {
        *self as usize + 1
    }

    pub fn from_number(number: usize) -> Option<FormStep> {
        number
            .checked_sub(1)
            .and_then(|index| Self::ALL.get(index).copied())
    }

    pub fn title(&self) -> &'static str {
        match self {
            FormStep::Demographics => "Demographics",
            FormStep::Diagnosis => "Diagnosis",
            FormStep::Treatment => "Treatment History",
            FormStep::Labs => "Lab Results",
            FormStep::Review => "Review",
        }
    }
}

/// Position within the five-step form. Next and previous stop at the ends.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormWizard {
    step: FormStep,
}

impl Default for FormWizard {
    fn default() -> Self {
        Self {
            step: FormStep::Demographics,
        }
    }
}

impl FormWizard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn step(&self) -> FormStep {
        self.step
    }

    pub fn next(&mut self) -> FormStep {
        if let Some(next) = FormStep::from_number(self.step.number() + 1) {
            self.step = next;
        }
        self.step
    }

    pub fn previous(&mut self) -> FormStep {
        if let Some(previous) = FormStep::from_number(self.step.number() - 1) {
            self.step = previous;
        }
        self.step
    }

    pub fn jump_to(&mut self, step: FormStep) -> FormStep {
        self.step = step;
        self.step
    }

    pub fn is_last(&self) -> bool {
        self.step == FormStep::Review
    }
}
