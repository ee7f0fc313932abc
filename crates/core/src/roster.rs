//! The patient roster.
//!
//! The roster is owned by the workflow controller. Readers only ever get copies; every mutation
//! builds a new list and swaps it in, so a snapshot handed out earlier never changes underneath
//! its holder.

use crate::patient::{ConsentStatus, Patient, PatientDraft};
use crate::{WorkflowError, WorkflowResult};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use trialos_ids::{PatientId, PatientIdGenerator};

#[derive(Clone, Debug)]
pub struct Roster {
    patients: Arc<Vec<Patient>>,
    ids: PatientIdGenerator,
}

impl Default for Roster {
    fn default() -> Self {
        Self::new(PatientIdGenerator::random_start())
    }
}

impl Roster {
    /// An empty roster handing out ids from `ids`.
    pub fn new(ids: PatientIdGenerator) -> Self {
        Self {
            patients: Arc::new(Vec::new()),
            ids,
        }
    }

    /// The demo roster shown on the dashboard's patient list.
    ///
    /// The generator is moved past every seeded id so new patients never collide with them.
    pub fn with_demo_patients(mut ids: PatientIdGenerator) -> Self {
        let now = Utc::now();
        let patients = vec![
            Patient::seeded(
                12845,
                "Sarah Johnson",
                54,
                "Breast Cancer (HER2+)",
                ConsentStatus::Consented,
                now,
            ),
            Patient::seeded(10592, "Robert Lee", 67, "NSCLC", ConsentStatus::Matched, now),
            Patient::seeded(
                11438,
                "Michael Chen",
                42,
                "Colorectal Cancer",
                ConsentStatus::Pending,
                now,
            ),
            Patient::seeded(
                13501,
                "Emma Williams",
                36,
                "Ovarian Cancer",
                ConsentStatus::Consented,
                now,
            ),
        ];
        for patient in &patients {
            ids.reserve(patient.id);
        }
        Self {
            patients: Arc::new(patients),
            ids,
        }
    }

    pub fn len(&self) -> usize {
        self.patients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patients.is_empty()
    }

    /// Copy of every patient, in admission order.
    pub fn patients(&self) -> Vec<Patient> {
        self.patients.as_ref().clone()
    }

    pub fn get(&self, id: PatientId) -> Option<Patient> {
        self.patients.iter().find(|p| p.id == id).cloned()
    }

    /// Case-insensitive substring match on name, diagnosis or id. A blank query returns everyone.
    pub fn search(&self, query: &str) -> Vec<Patient> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return self.patients();
        }
        self.patients
            .iter()
            .filter(|p| {
                p.name.to_lowercase().contains(&needle)
                    || p.diagnosis.to_lowercase().contains(&needle)
                    || p.id.to_string().to_lowercase().contains(&needle)
            })
            .cloned()
            .collect()
    }

    /// Patients who may be sent to trial matching.
    pub fn consented(&self) -> Vec<Patient> {
        self.patients
            .iter()
            .filter(|p| p.status.can_enter_matching())
            .cloned()
            .collect()
    }

    /// Adds a new pending patient built from `draft` and returns a copy of it.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::Id`] if the id sequence is exhausted.
    pub fn admit(&mut self, draft: PatientDraft, now: DateTime<Utc>) -> WorkflowResult<Patient> {
        let id = self.ids.allocate()?;
        let patient = Patient::admitted(id, draft, now);

        let mut next = self.patients.as_ref().clone();
        next.push(patient.clone());
        self.patients = Arc::new(next);

        tracing::info!(patient_id = %id, source = patient.source.label(), "patient admitted");
        Ok(patient)
    }

    pub fn mark_consented(&mut self, id: PatientId) -> WorkflowResult<Patient> {
        self.set_status(id, ConsentStatus::Consented)
    }

    pub fn mark_matched(&mut self, id: PatientId) -> WorkflowResult<Patient> {
        self.set_status(id, ConsentStatus::Matched)
    }

    fn set_status(&mut self, id: PatientId, to: ConsentStatus) -> WorkflowResult<Patient> {
        let index = self
            .patients
            .iter()
            .position(|p| p.id == id)
            .ok_or(WorkflowError::UnknownPatient(id))?;

        let from = self.patients[index].status;
        if !from.can_transition_to(to) {
            return Err(WorkflowError::InvalidStatusTransition { id, from, to });
        }

        let mut next = self.patients.as_ref().clone();
        next[index].status = to;
        let updated = next[index].clone();
        self.patients = Arc::new(next);

        tracing::info!(patient_id = %id, %from, %to, "patient status changed");
        Ok(updated)
    }
}
