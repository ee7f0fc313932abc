//! # TrialOS Core
//!
//! Core business logic for the TrialOS patient matching workflow.
//!
//! This crate holds the workflow itself and nothing that talks to the outside world directly:
//! - The patient roster and the consent status each patient moves through
//! - The four intake paths that add a patient (form, EHR import, document upload, quick entry)
//! - Consent capture, profile review and trial matching
//! - The view controller and the async session that runs simulated services
//!
//! **No API concerns**: HTTP routing, request DTOs and the CLI belong in `api-rest` and
//! `trialos-cli`.

pub mod config;
pub mod consent;
pub mod constants;
pub mod error;
pub mod intake;
pub mod notify;
pub mod patient;
pub mod profile;
pub mod roster;
pub mod routing;
pub mod services;
pub mod task;
pub mod trial;
pub mod workflow;

pub use config::{ConsentFollowUp, CoreConfig, SimulatedDelays};
pub use error::{ValidationError, WorkflowError, WorkflowResult};
pub use patient::{ConsentStatus, Patient};
pub use roster::Roster;
pub use trial::{Trial, TrialCatalogue};
pub use workflow::{View, WorkflowController, WorkflowSession, WorkflowSnapshot};

pub use trialos_ids::{DocumentId, PatientId, PatientIdGenerator};
