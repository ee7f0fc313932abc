//! Constants used throughout the TrialOS core crate.
//!
//! Simulated delays mirror the timings of the dashboard prototype so that the simulated services
//! feel the same when run in real time.

/// Simulated time to establish an EHR connection, in milliseconds.
pub const DEFAULT_EHR_CONNECT_DELAY_MS: u64 = 2_000;

/// Simulated time for an EHR patient search, in milliseconds.
pub const DEFAULT_EHR_SEARCH_DELAY_MS: u64 = 1_500;

/// Simulated OCR time for uploaded documents, in milliseconds.
pub const DEFAULT_DOCUMENT_EXTRACTION_DELAY_MS: u64 = 3_000;

/// Simulated time for free-text analysis, in milliseconds.
pub const DEFAULT_TEXT_ANALYSIS_DELAY_MS: u64 = 0;

/// Simulated time to dispatch an e-consent message, in milliseconds.
pub const DEFAULT_CONSENT_SEND_DELAY_MS: u64 = 1_500;

/// Simulated time for the patient to complete an e-consent form, in milliseconds.
pub const DEFAULT_CONSENT_RESPONSE_DELAY_MS: u64 = 5_000;

/// Simulated time to store a captured signature, in milliseconds.
pub const DEFAULT_SIGNATURE_SAVE_DELAY_MS: u64 = 1_500;

/// Simulated trial matching time, in milliseconds.
pub const DEFAULT_MATCHING_DELAY_MS: u64 = 3_500;

/// Minimum number of characters accepted by quick-text entry.
pub const DEFAULT_QUICK_ENTRY_MIN_CHARS: usize = 20;

/// Sentinel for any intake field that could not be determined.
pub const UNKNOWN: &str = "Unknown";

/// Diagnosis sentinel used when free-text analysis finds no diagnosis.
pub const PENDING_ANALYSIS_DIAGNOSIS: &str = "Unknown - Pending Analysis";

/// Display name used when free-text analysis finds no patient name.
pub const QUICK_ENTRY_DEFAULT_NAME: &str = "New Patient";

/// Age sentinel used when no date of birth or age is available.
pub const UNKNOWN_AGE: u32 = 0;

/// Date format accepted for dates of birth.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Trial fixtures shipped with the crate.
pub const DEFAULT_TRIAL_FIXTURES: &str = include_str!("../fixtures/trials.yaml");

/// Most notifications a recording notifier keeps before dropping the oldest.
pub const NOTIFICATION_BUFFER_CAPACITY: usize = 200;

/// Most routes a navigator remembers, the current one included.
pub const NAVIGATION_HISTORY_CAPACITY: usize = 50;
