//! Views and the transition table between them.
//!
//! The table is pure: given the current view and an event it says where to go and whether the
//! move *launches* a view (so "back" returns to the launcher) or *completes* a step (so "back"
//! goes to the list). Guards that need the roster, such as consent checks, live in the
//! controller.

use crate::config::ConsentFollowUp;
use crate::intake::IntakeKind;
use crate::patient::ConsentStatus;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum View {
    #[default]
    List,
    AddOptions,
    Form,
    EhrImport,
    DocUpload,
    QuickEntry,
    Consent,
    ProfileReview,
    Processing,
    MatchResults,
    PatientSelection,
}

impl View {
    pub fn as_str(&self) -> &'static str {
        match self {
            View::List => "list",
            View::AddOptions => "addOptions",
            View::Form => "form",
            View::EhrImport => "ehrImport",
            View::DocUpload => "docUpload",
            View::QuickEntry => "quickEntry",
            View::Consent => "consent",
            View::ProfileReview => "profileReview",
            View::Processing => "processing",
            View::MatchResults => "matchResults",
            View::PatientSelection => "patientSelection",
        }
    }

    pub fn is_intake(&self) -> bool {
        matches!(
            self,
            View::Form | View::EhrImport | View::DocUpload | View::QuickEntry
        )
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<IntakeKind> for View {
    fn from(kind: IntakeKind) -> Self {
        match kind {
            IntakeKind::Form => View::Form,
            IntakeKind::EhrImport => View::EhrImport,
            IntakeKind::DocUpload => View::DocUpload,
            IntakeKind::QuickEntry => View::QuickEntry,
        }
    }
}

/// Everything that can move the workflow.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Event {
    AddPatient,
    ChooseIntake(IntakeKind),
    PatientProduced,
    ConsentCompleted,
    /// An existing patient picked from the list, carrying their current status.
    SelectPatient(ConsentStatus),
    StartMatching,
    /// A patient picked from the matching selection list.
    SelectForMatching(ConsentStatus),
    Proceed,
    MatchingComplete,
    RerunMatching,
    Back,
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::AddPatient => "add patient",
            Event::ChooseIntake(_) => "choose intake",
            Event::PatientProduced => "patient produced",
            Event::ConsentCompleted => "consent completed",
            Event::SelectPatient(_) => "select patient",
            Event::StartMatching => "start matching",
            Event::SelectForMatching(_) => "select for matching",
            Event::Proceed => "proceed",
            Event::MatchingComplete => "matching complete",
            Event::RerunMatching => "re-run matching",
            Event::Back => "back",
        }
    }
}

/// How a transition affects the back stack.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepKind {
    /// The current view launched the next one; back returns to it.
    Launch,
    /// A step finished; back from the next view goes to the list.
    Completion,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Step {
    pub to: View,
    pub kind: StepKind,
}

impl Step {
    fn launch(to: View) -> Option<Step> {
        Some(Step {
            to,
            kind: StepKind::Launch,
        })
    }

    fn completion(to: View) -> Option<Step> {
        Some(Step {
            to,
            kind: StepKind::Completion,
        })
    }
}

/// Looks up the transition for `event` in `view`.
///
/// Returns `None` for any event not valid in `view`. [`Event::Back`] is not in the table; it
/// depends on history and is handled by the controller.
pub fn next_step(view: View, event: Event, follow_up: ConsentFollowUp) -> Option<Step> {
    use ConsentStatus::*;

    match (view, event) {
        (View::List, Event::AddPatient) => Step::launch(View::AddOptions),
        (View::AddOptions, Event::ChooseIntake(kind)) => Step::launch(kind.into()),
        (v, Event::PatientProduced) if v.is_intake() => Step::completion(View::Consent),
        (View::Consent, Event::ConsentCompleted) => match follow_up {
            ConsentFollowUp::List => Step::completion(View::List),
            ConsentFollowUp::Review => Step::completion(View::ProfileReview),
        },
        (View::List, Event::SelectPatient(Pending)) => Step::launch(View::Consent),
        (View::List, Event::SelectPatient(Consented)) => Step::launch(View::ProfileReview),
        (View::List, Event::SelectPatient(Matched)) => Step::launch(View::MatchResults),
        (View::List, Event::StartMatching) => Step::launch(View::PatientSelection),
        (View::PatientSelection, Event::SelectForMatching(Consented | Matched)) => {
            Step::launch(View::ProfileReview)
        }
        (View::ProfileReview, Event::Proceed) => Step::launch(View::Processing),
        (View::Processing, Event::MatchingComplete) => Step::completion(View::MatchResults),
        (View::MatchResults, Event::RerunMatching) => Step::launch(View::Processing),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_VIEWS: [View; 11] = [
        View::List,
        View::AddOptions,
        View::Form,
        View::EhrImport,
        View::DocUpload,
        View::QuickEntry,
        View::Consent,
        View::ProfileReview,
        View::Processing,
        View::MatchResults,
        View::PatientSelection,
    ];

    fn step(view: View, event: Event) -> Option<Step> {
        next_step(view, event, ConsentFollowUp::List)
    }

    #[test]
    fn test_add_patient_paths() {
        assert_eq!(step(View::List, Event::AddPatient).unwrap().to, View::AddOptions);
        for (kind, view) in [
            (IntakeKind::Form, View::Form),
            (IntakeKind::EhrImport, View::EhrImport),
            (IntakeKind::DocUpload, View::DocUpload),
            (IntakeKind::QuickEntry, View::QuickEntry),
        ] {
            assert_eq!(
                step(View::AddOptions, Event::ChooseIntake(kind)),
                Some(Step {
                    to: view,
                    kind: StepKind::Launch
                })
            );
            assert_eq!(
                step(view, Event::PatientProduced),
                Some(Step {
                    to: View::Consent,
                    kind: StepKind::Completion
                })
            );
        }
    }

    #[test]
    fn test_consent_follow_up_policy() {
        assert_eq!(
            next_step(View::Consent, Event::ConsentCompleted, ConsentFollowUp::List)
                .unwrap()
                .to,
            View::List
        );
        assert_eq!(
            next_step(View::Consent, Event::ConsentCompleted, ConsentFollowUp::Review)
                .unwrap()
                .to,
            View::ProfileReview
        );
    }

    #[test]
    fn test_select_patient_routes_by_status() {
        use ConsentStatus::*;
        assert_eq!(step(View::List, Event::SelectPatient(Pending)).unwrap().to, View::Consent);
        assert_eq!(
            step(View::List, Event::SelectPatient(Consented)).unwrap().to,
            View::ProfileReview
        );
        assert_eq!(
            step(View::List, Event::SelectPatient(Matched)).unwrap().to,
            View::MatchResults
        );
    }

    #[test]
    fn test_matching_selection_requires_consent() {
        use ConsentStatus::*;
        assert!(step(View::PatientSelection, Event::SelectForMatching(Pending)).is_none());
        assert!(step(View::PatientSelection, Event::SelectForMatching(Consented)).is_some());
        assert!(step(View::PatientSelection, Event::SelectForMatching(Matched)).is_some());
    }

    #[test]
    fn test_matching_cycle() {
        assert_eq!(step(View::ProfileReview, Event::Proceed).unwrap().to, View::Processing);
        assert_eq!(
            step(View::Processing, Event::MatchingComplete).unwrap(),
            Step {
                to: View::MatchResults,
                kind: StepKind::Completion
            }
        );
        assert_eq!(
            step(View::MatchResults, Event::RerunMatching).unwrap().to,
            View::Processing
        );
    }

    #[test]
    fn test_events_outside_their_view_are_rejected() {
        let valid = |view: View, event: Event| step(view, event).is_some();
        for view in ALL_VIEWS {
            assert_eq!(valid(view, Event::AddPatient), view == View::List);
            assert_eq!(valid(view, Event::Proceed), view == View::ProfileReview);
            assert_eq!(valid(view, Event::ConsentCompleted), view == View::Consent);
            assert_eq!(valid(view, Event::MatchingComplete), view == View::Processing);
            assert_eq!(valid(view, Event::PatientProduced), view.is_intake());
            assert!(!valid(view, Event::Back));
        }
    }

    #[test]
    fn test_view_serializes_camel_case() {
        assert_eq!(
            serde_json::to_value(View::PatientSelection).unwrap(),
            "patientSelection"
        );
        for view in ALL_VIEWS {
            assert_eq!(
                serde_json::to_value(view).unwrap(),
                serde_json::Value::String(view.to_string())
            );
        }
    }
}
