//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into the workflow session
//! and simulated services. Nothing in the core reads process-wide environment variables while
//! handling an event; binaries read the environment and hand the raw values to the
//! `*_from_env_value` helpers below.

use crate::constants::{
    DEFAULT_CONSENT_RESPONSE_DELAY_MS, DEFAULT_CONSENT_SEND_DELAY_MS,
    DEFAULT_DOCUMENT_EXTRACTION_DELAY_MS, DEFAULT_EHR_CONNECT_DELAY_MS,
    DEFAULT_EHR_SEARCH_DELAY_MS, DEFAULT_MATCHING_DELAY_MS, DEFAULT_QUICK_ENTRY_MIN_CHARS,
    DEFAULT_SIGNATURE_SAVE_DELAY_MS, DEFAULT_TEXT_ANALYSIS_DELAY_MS,
};
use crate::{WorkflowError, WorkflowResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Fixed delays used by the simulated services.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SimulatedDelays {
    pub ehr_connect: Duration,
    pub ehr_search: Duration,
    pub document_extraction: Duration,
    pub text_analysis: Duration,
    pub consent_send: Duration,
    pub consent_response: Duration,
    pub signature_save: Duration,
    pub matching: Duration,
}

impl SimulatedDelays {
    /// The timings of the dashboard prototype.
    pub fn dashboard() -> Self {
        Self {
            ehr_connect: Duration::from_millis(DEFAULT_EHR_CONNECT_DELAY_MS),
            ehr_search: Duration::from_millis(DEFAULT_EHR_SEARCH_DELAY_MS),
            document_extraction: Duration::from_millis(DEFAULT_DOCUMENT_EXTRACTION_DELAY_MS),
            text_analysis: Duration::from_millis(DEFAULT_TEXT_ANALYSIS_DELAY_MS),
            consent_send: Duration::from_millis(DEFAULT_CONSENT_SEND_DELAY_MS),
            consent_response: Duration::from_millis(DEFAULT_CONSENT_RESPONSE_DELAY_MS),
            signature_save: Duration::from_millis(DEFAULT_SIGNATURE_SAVE_DELAY_MS),
            matching: Duration::from_millis(DEFAULT_MATCHING_DELAY_MS),
        }
    }

    /// Every operation resolves immediately.
    pub fn none() -> Self {
        Self::dashboard().scaled(0.0)
    }

    /// Multiplies every delay by `factor`. Negative or non-finite factors are treated as zero.
    pub fn scaled(&self, factor: f64) -> Self {
        let factor = if factor.is_finite() && factor > 0.0 {
            factor
        } else {
            0.0
        };
        let scale = |d: Duration| d.mul_f64(factor);
        Self {
            ehr_connect: scale(self.ehr_connect),
            ehr_search: scale(self.ehr_search),
            document_extraction: scale(self.document_extraction),
            text_analysis: scale(self.text_analysis),
            consent_send: scale(self.consent_send),
            consent_response: scale(self.consent_response),
            signature_save: scale(self.signature_save),
            matching: scale(self.matching),
        }
    }
}

impl Default for SimulatedDelays {
    fn default() -> Self {
        Self::dashboard()
    }
}

/// Where the workflow goes once a patient's consent completes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsentFollowUp {
    /// Back to the patient list; matching is started later by selecting the patient.
    #[default]
    List,
    /// Straight into profile review for the newly consented patient.
    Review,
}

impl FromStr for ConsentFollowUp {
    type Err = WorkflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "list" => Ok(ConsentFollowUp::List),
            "review" => Ok(ConsentFollowUp::Review),
            other => Err(WorkflowError::InvalidInput(format!(
                "consent follow-up must be 'list' or 'review', got '{other}'"
            ))),
        }
    }
}

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    delays: SimulatedDelays,
    quick_entry_min_chars: usize,
    consent_follow_up: ConsentFollowUp,
    trial_fixtures: Option<PathBuf>,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::InvalidInput`] if `quick_entry_min_chars` is zero or
    /// `trial_fixtures` does not point at a regular file.
    pub fn new(
        delays: SimulatedDelays,
        quick_entry_min_chars: usize,
        consent_follow_up: ConsentFollowUp,
        trial_fixtures: Option<PathBuf>,
    ) -> WorkflowResult<Self> {
        if quick_entry_min_chars == 0 {
            return Err(WorkflowError::InvalidInput(
                "quick_entry_min_chars must be at least 1".into(),
            ));
        }

        if let Some(path) = &trial_fixtures {
            if !path.is_file() {
                return Err(WorkflowError::InvalidInput(format!(
                    "trial fixture file does not exist: {}",
                    path.display()
                )));
            }
        }

        Ok(Self {
            delays,
            quick_entry_min_chars,
            consent_follow_up,
            trial_fixtures,
        })
    }

    /// Dashboard timings, default policies, embedded trial fixtures.
    pub fn dashboard() -> Self {
        Self {
            delays: SimulatedDelays::dashboard(),
            quick_entry_min_chars: DEFAULT_QUICK_ENTRY_MIN_CHARS,
            consent_follow_up: ConsentFollowUp::default(),
            trial_fixtures: None,
        }
    }

    /// Same as [`dashboard`](Self::dashboard) but with every delay removed.
    pub fn immediate() -> Self {
        Self {
            delays: SimulatedDelays::none(),
            ..Self::dashboard()
        }
    }

    pub fn with_consent_follow_up(mut self, follow_up: ConsentFollowUp) -> Self {
        self.consent_follow_up = follow_up;
        self
    }

    pub fn delays(&self) -> &SimulatedDelays {
        &self.delays
    }

    pub fn quick_entry_min_chars(&self) -> usize {
        self.quick_entry_min_chars
    }

    pub fn consent_follow_up(&self) -> ConsentFollowUp {
        self.consent_follow_up
    }

    pub fn trial_fixtures(&self) -> Option<&Path> {
        self.trial_fixtures.as_deref()
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse a delay scale factor. `None` or blank means the dashboard timings (factor 1.0).
pub fn delay_scale_from_env_value(value: Option<String>) -> WorkflowResult<f64> {
    match non_blank(value) {
        None => Ok(1.0),
        Some(raw) => {
            let factor = raw.parse::<f64>().map_err(|e| {
                WorkflowError::InvalidInput(format!("invalid delay scale '{raw}': {e}"))
            })?;
            if !factor.is_finite() || factor < 0.0 {
                return Err(WorkflowError::InvalidInput(format!(
                    "delay scale must be a non-negative number, got '{raw}'"
                )));
            }
            Ok(factor)
        }
    }
}

/// Parse the consent follow-up policy. `None` or blank means [`ConsentFollowUp::List`].
pub fn consent_follow_up_from_env_value(value: Option<String>) -> WorkflowResult<ConsentFollowUp> {
    non_blank(value)
        .map(|v| v.parse::<ConsentFollowUp>())
        .transpose()
        .map(Option::unwrap_or_default)
}

/// Parse the quick-entry minimum length. `None` or blank means the default.
pub fn quick_entry_min_chars_from_env_value(value: Option<String>) -> WorkflowResult<usize> {
    match non_blank(value) {
        None => Ok(DEFAULT_QUICK_ENTRY_MIN_CHARS),
        Some(raw) => raw.parse::<usize>().map_err(|e| {
            WorkflowError::InvalidInput(format!("invalid quick entry minimum '{raw}': {e}"))
        }),
    }
}

/// Parse an optional trial fixture path. Blank values mean "use the embedded fixtures".
pub fn trial_fixtures_from_env_value(value: Option<String>) -> Option<PathBuf> {
    non_blank(value).map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_dashboard_delays_match_prototype() {
        let delays = SimulatedDelays::dashboard();
        assert_eq!(delays.ehr_connect, Duration::from_millis(2_000));
        assert_eq!(delays.consent_response, Duration::from_millis(5_000));
        assert_eq!(delays.matching, Duration::from_millis(3_500));
    }

    #[test]
    fn test_scaled_delays() {
        let half = SimulatedDelays::dashboard().scaled(0.5);
        assert_eq!(half.matching, Duration::from_millis(1_750));

        let none = SimulatedDelays::dashboard().scaled(-3.0);
        assert_eq!(none, SimulatedDelays::none());
        assert_eq!(none.document_extraction, Duration::ZERO);
    }

    #[test]
    fn test_new_rejects_zero_min_chars() {
        let result = CoreConfig::new(SimulatedDelays::none(), 0, ConsentFollowUp::List, None);
        assert!(matches!(result, Err(WorkflowError::InvalidInput(_))));
    }

    #[test]
    fn test_new_rejects_missing_fixture_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.yaml");
        let result = CoreConfig::new(
            SimulatedDelays::none(),
            20,
            ConsentFollowUp::List,
            Some(missing),
        );
        assert!(matches!(result, Err(WorkflowError::InvalidInput(_))));
    }

    #[test]
    fn test_new_accepts_existing_fixture_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "trials: []").unwrap();
        let cfg = CoreConfig::new(
            SimulatedDelays::none(),
            20,
            ConsentFollowUp::Review,
            Some(file.path().to_path_buf()),
        )
        .unwrap();
        assert_eq!(cfg.trial_fixtures(), Some(file.path()));
        assert_eq!(cfg.consent_follow_up(), ConsentFollowUp::Review);
    }

    #[test]
    fn test_env_value_parsers() {
        assert_eq!(delay_scale_from_env_value(None).unwrap(), 1.0);
        assert_eq!(delay_scale_from_env_value(Some(" 0 ".into())).unwrap(), 0.0);
        assert!(delay_scale_from_env_value(Some("-1".into())).is_err());
        assert!(delay_scale_from_env_value(Some("fast".into())).is_err());

        assert_eq!(
            consent_follow_up_from_env_value(None).unwrap(),
            ConsentFollowUp::List
        );
        assert_eq!(
            consent_follow_up_from_env_value(Some("Review".into())).unwrap(),
            ConsentFollowUp::Review
        );
        assert!(consent_follow_up_from_env_value(Some("matching".into())).is_err());

        assert_eq!(quick_entry_min_chars_from_env_value(Some("  ".into())).unwrap(), 20);
        assert_eq!(quick_entry_min_chars_from_env_value(Some("50".into())).unwrap(), 50);

        assert_eq!(trial_fixtures_from_env_value(Some("".into())), None);
    }
}
