//! Identifier types for the TrialOS workflow.
//!
//! Two kinds of identifier are used across the workspace:
//!
//! - **Patient ids** are human-facing, formatted sequence numbers: `PT-` followed by at least five
//!   decimal digits (for example `PT-12845`). They are allocated by a [`PatientIdGenerator`] at the
//!   moment a patient record is created, and are strictly increasing within one generator.
//! - **Document ids** identify uploaded files. They use the canonical UUID form: 32 lowercase
//!   hexadecimal characters without hyphens (the value of `Uuid::new_v4().simple()`).
//!
//! Externally supplied identifiers (REST paths, CLI arguments) must already be in canonical form;
//! use [`PatientId::parse`] or [`DocumentId::parse`] to validate them.

mod service;

pub use service::{DocumentId, PatientId, PatientIdGenerator, Uuid, PATIENT_ID_PREFIX};

/// Error type for identifier operations.
#[derive(Debug, thiserror::Error)]
pub enum IdError {
    /// Invalid input provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for identifier operations.
pub type IdResult<T> = Result<T, IdError>;
