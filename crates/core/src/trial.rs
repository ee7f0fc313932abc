//! Clinical trial records and the fixture catalogue the simulated matcher draws from.
//!
//! Trials are loaded from YAML. The on-disk shape is a private wire struct with
//! `deny_unknown_fields`; parsing goes through `serde_path_to_error` so that a malformed fixture
//! reports the exact field that failed, then the wire records are checked and converted into
//! [`Trial`] values.

use crate::config::CoreConfig;
use crate::constants::{DATE_FORMAT, DEFAULT_TRIAL_FIXTURES};
use crate::{WorkflowError, WorkflowResult};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use trialos_ids::PatientId;

/// Highest possible match score.
pub const MAX_MATCH_SCORE: u8 = 100;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enrollment {
    pub target: u32,
    pub current: u32,
}

/// Eligibility criteria split by whether the patient meets them.
///
/// Together `met` and `unmet` are the trial's full criteria list.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibilityCriteria {
    pub met: Vec<String>,
    pub unmet: Vec<String>,
}

impl EligibilityCriteria {
    pub fn total(&self) -> usize {
        self.met.len() + self.unmet.len()
    }
}

/// A candidate trial as shown in match results.
///
/// `score` is a presentational confidence value in `0..=100`. Nothing in this crate computes it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trial {
    pub id: String,
    pub title: String,
    pub phase: String,
    pub sponsor: String,
    pub status: String,
    pub score: u8,
    pub location: String,
    pub distance: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub enrollment: Enrollment,
    pub criteria: EligibilityCriteria,
}

/// The set of trials available to the simulated matcher.
#[derive(Clone, Debug)]
pub struct TrialCatalogue {
    trials: Arc<Vec<Trial>>,
}

impl TrialCatalogue {
    /// Parse a trial catalogue from YAML text.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::Fixture`] if:
    /// - the YAML does not match the fixture schema (the message names the failing path),
    /// - any unknown keys are present,
    /// - a score is above 100 or a date is not `YYYY-MM-DD`,
    /// - a trial id is blank or appears twice,
    /// - a trial has no eligibility criteria at all.
    pub fn parse(yaml_text: &str) -> WorkflowResult<Self> {
        let deserializer = serde_yaml::Deserializer::from_str(yaml_text);

        let wire = match serde_path_to_error::deserialize::<_, TrialFileWire>(deserializer) {
            Ok(parsed) => parsed,
            Err(err) => {
                let path = err.path().to_string();
                let source = err.into_inner();
                let path = if path.is_empty() || path == "." {
                    "<root>"
                } else {
                    path.as_str()
                };
                return Err(WorkflowError::Fixture(format!(
                    "trial fixture schema mismatch at {path}: {source}"
                )));
            }
        };

        let mut seen = HashSet::new();
        let mut trials = Vec::with_capacity(wire.trials.len());
        for (index, record) in wire.trials.into_iter().enumerate() {
            let trial = wire_to_domain(index, record)?;
            if !seen.insert(trial.id.clone()) {
                return Err(WorkflowError::Fixture(format!(
                    "duplicate trial id {}",
                    trial.id
                )));
            }
            trials.push(trial);
        }

        Ok(Self {
            trials: Arc::new(trials),
        })
    }

    /// Read and parse a fixture file.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::FixtureRead`] if the file cannot be read, otherwise the same
    /// errors as [`parse`](Self::parse).
    pub fn load(path: &Path) -> WorkflowResult<Self> {
        let text = std::fs::read_to_string(path).map_err(WorkflowError::FixtureRead)?;
        let catalogue = Self::parse(&text)?;
        tracing::info!(path = %path.display(), trials = catalogue.len(), "loaded trial fixtures");
        Ok(catalogue)
    }

    /// The five trials shipped with the crate.
    pub fn dashboard() -> WorkflowResult<Self> {
        Self::parse(DEFAULT_TRIAL_FIXTURES)
    }

    /// The configured fixture file, or the embedded fixtures when none is configured.
    pub fn from_config(cfg: &CoreConfig) -> WorkflowResult<Self> {
        match cfg.trial_fixtures() {
            Some(path) => Self::load(path),
            None => Self::dashboard(),
        }
    }

    pub fn len(&self) -> usize {
        self.trials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trials.is_empty()
    }

    /// Trials in fixture order.
    pub fn trials(&self) -> Vec<Trial> {
        self.trials.as_ref().clone()
    }

    /// Trials sorted by descending score. Ties keep fixture order.
    pub fn ranked(&self) -> Vec<Trial> {
        let mut ranked = self.trials();
        ranked.sort_by(|a, b| b.score.cmp(&a.score));
        ranked
    }

    pub fn get(&self, id: &str) -> Option<Trial> {
        self.trials.iter().find(|t| t.id == id).cloned()
    }
}

/// A referral request sent for a patient to a trial from the results view.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Referral {
    pub patient: PatientId,
    pub trial_id: String,
    pub trial_title: String,
    pub sent_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TrialFileWire {
    trials: Vec<TrialWire>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TrialWire {
    id: String,
    title: String,
    phase: String,
    score: u8,
    location: String,
    distance: String,
    sponsor: String,
    status: String,
    start_date: String,
    end_date: String,
    enrollment: EnrollmentWire,
    criteria: CriteriaWire,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct EnrollmentWire {
    target: u32,
    current: u32,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CriteriaWire {
    #[serde(default)]
    met: Vec<String>,
    #[serde(default)]
    unmet: Vec<String>,
}

fn wire_to_domain(index: usize, wire: TrialWire) -> WorkflowResult<Trial> {
    let id = wire.id.trim().to_string();
    if id.is_empty() {
        return Err(WorkflowError::Fixture(format!("trials[{index}].id is blank")));
    }
    if wire.score > MAX_MATCH_SCORE {
        return Err(WorkflowError::Fixture(format!(
            "trial {id} has score {} above {MAX_MATCH_SCORE}",
            wire.score
        )));
    }
    if wire.criteria.met.is_empty() && wire.criteria.unmet.is_empty() {
        return Err(WorkflowError::Fixture(format!(
            "trial {id} has no eligibility criteria"
        )));
    }

    let date = |field: &str, value: &str| {
        NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).map_err(|e| {
            WorkflowError::Fixture(format!("trial {id} has invalid {field} '{value}': {e}"))
        })
    };
    let start_date = date("start_date", &wire.start_date)?;
    let end_date = date("end_date", &wire.end_date)?;

    Ok(Trial {
        title: wire.title,
        phase: wire.phase,
        sponsor: wire.sponsor,
        status: wire.status,
        score: wire.score,
        location: wire.location,
        distance: wire.distance,
        start_date,
        end_date,
        enrollment: Enrollment {
            target: wire.enrollment.target,
            current: wire.enrollment.current,
        },
        criteria: EligibilityCriteria {
            met: wire.criteria.met,
            unmet: wire.criteria.unmet,
        },
        id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const ONE_TRIAL: &str = r#"
trials:
  - id: NCT00000001
    title: "Test Trial"
    phase: "Phase 1"
    score: 50
    location: "Somewhere"
    distance: "1 mile"
    sponsor: "Sponsor"
    status: "Recruiting"
    start_date: "2021-01-01"
    end_date: "2022-01-01"
    enrollment:
      target: 10
      current: 2
    criteria:
      met: ["Adult"]
"#;

    #[test]
    fn test_dashboard_fixtures_parse() {
        let catalogue = TrialCatalogue::dashboard().unwrap();
        assert_eq!(catalogue.len(), 5);

        let first = catalogue.get("NCT04276493").unwrap();
        assert_eq!(first.score, 92);
        assert_eq!(first.enrollment.target, 30);
        assert_eq!(
            first.start_date,
            NaiveDate::from_ymd_opt(2020, 3, 15).unwrap()
        );
    }

    #[test]
    fn test_ranked_is_descending() {
        let ranked = TrialCatalogue::dashboard().unwrap().ranked();
        let scores: Vec<u8> = ranked.iter().map(|t| t.score).collect();
        assert_eq!(scores, vec![92, 87, 81, 78, 75]);
        assert!(ranked.iter().all(|t| t.criteria.total() > 0));
    }

    #[test]
    fn test_unknown_field_reports_path() {
        let yaml = ONE_TRIAL.replace("    phase:", "    colour: red\n    phase:");
        let err = TrialCatalogue::parse(&yaml).unwrap_err();
        let WorkflowError::Fixture(message) = err else {
            panic!("expected fixture error");
        };
        assert!(message.contains("trials[0]"), "{message}");
        assert!(message.contains("colour"), "{message}");
    }

    #[test]
    fn test_score_above_hundred_is_rejected() {
        let yaml = ONE_TRIAL.replace("score: 50", "score: 101");
        assert!(matches!(
            TrialCatalogue::parse(&yaml),
            Err(WorkflowError::Fixture(_))
        ));
    }

    #[test]
    fn test_bad_date_is_rejected() {
        let yaml = ONE_TRIAL.replace("2022-01-01", "Jan 2022");
        let err = TrialCatalogue::parse(&yaml).unwrap_err();
        assert!(err.to_string().contains("end_date"));
    }

    #[test]
    fn test_duplicate_ids_are_rejected() {
        let body = ONE_TRIAL.trim_start().trim_start_matches("trials:\n");
        let yaml = format!("trials:\n{body}{body}");
        let err = TrialCatalogue::parse(&yaml).unwrap_err();
        assert!(err.to_string().contains("duplicate trial id NCT00000001"));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(ONE_TRIAL.as_bytes()).unwrap();

        let catalogue = TrialCatalogue::load(file.path()).unwrap();
        assert_eq!(catalogue.len(), 1);
        assert_eq!(catalogue.trials()[0].criteria.unmet.len(), 0);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            TrialCatalogue::load(&dir.path().join("missing.yaml")),
            Err(WorkflowError::FixtureRead(_))
        ));
    }
}
