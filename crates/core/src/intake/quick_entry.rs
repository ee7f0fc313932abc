//! Quick summary entry: free text in, partial patient out.

use crate::constants::{PENDING_ANALYSIS_DIAGNOSIS, QUICK_ENTRY_DEFAULT_NAME, UNKNOWN_AGE};
use crate::error::ValidationError;
use crate::intake::PartialPatient;
use crate::patient::{IntakeSource, PatientDraft};
use trialos_types::{NonEmptyText, TextError};

/// The sample summary offered next to the quick-entry box.
pub const EXAMPLE_SUMMARY: &str = "A 32 yo woman who presents following a severe 'exploding' \
headache. She and her husband report that yesterday she was in the kitchen and stood up and hit \
her head on the corner of a cabinet. The next morning she developed a sudden 'exploding' \
headache. She came to the hospital where head CT showed a significant amount of blood in her \
right ventricle. NSGY evaluated her for spontaneous intraventricular hemorrhage with a concern \
for an underlying vascular malformation. Cerebral angiogram was done which showed abnormal \
vasculature with a draining vein from L temporal lobe penetrating deep white matter consistent \
with AVM. The patient did continue to have a headaches but they were improving with pain \
medication. The patient refused PT evaluation but was ambulating independently without \
difficulty.";

/// Checks that the summary holds at least `min_chars` characters after trimming.
pub fn validate_summary(text: &str, min_chars: usize) -> Result<NonEmptyText, ValidationError> {
    NonEmptyText::with_min_chars(text, min_chars).map_err(|err| match err {
        TextError::Empty => ValidationError::TextTooShort {
            min: min_chars,
            actual: 0,
        },
        TextError::TooShort { min, actual } => ValidationError::TextTooShort { min, actual },
    })
}

/// Completes whatever the text extractor recovered with the quick-entry sentinels.
pub fn draft_from_partial(partial: PartialPatient) -> PatientDraft {
    PatientDraft::new(
        partial
            .name
            .unwrap_or_else(|| QUICK_ENTRY_DEFAULT_NAME.to_string()),
        partial.age.unwrap_or(UNKNOWN_AGE),
        partial
            .diagnosis
            .unwrap_or_else(|| PENDING_ANALYSIS_DIAGNOSIS.to_string()),
        IntakeSource::QuickEntry,
    )
    .with_sex(partial.sex.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_summary_is_rejected() {
        assert_eq!(
            validate_summary("  too short  ", 20),
            Err(ValidationError::TextTooShort { min: 20, actual: 9 })
        );
        assert_eq!(
            validate_summary("", 20),
            Err(ValidationError::TextTooShort { min: 20, actual: 0 })
        );
    }

    #[test]
    fn test_example_summary_is_accepted() {
        let summary = validate_summary(EXAMPLE_SUMMARY, 20).unwrap();
        assert!(summary.as_str().starts_with("A 32 yo woman"));
    }

    #[test]
    fn test_empty_partial_gets_sentinels() {
        let draft = draft_from_partial(PartialPatient::default());
        assert_eq!(draft.name, "New Patient");
        assert_eq!(draft.age, 0);
        assert_eq!(draft.diagnosis, "Unknown - Pending Analysis");
        assert_eq!(draft.sex, "Unknown");
        assert_eq!(draft.source, IntakeSource::QuickEntry);
    }

    #[test]
    fn test_partial_values_are_kept() {
        let draft = draft_from_partial(PartialPatient {
            name: None,
            age: Some(32),
            sex: Some("Female".into()),
            diagnosis: Some("AVM".into()),
        });
        assert_eq!(draft.name, "New Patient");
        assert_eq!(draft.age, 32);
        assert_eq!(draft.diagnosis, "AVM");
        assert_eq!(draft.sex, "Female");
    }
}
