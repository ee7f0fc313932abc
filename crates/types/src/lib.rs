//! Small validated text primitives shared across the TrialOS crates.

/// Errors that can occur when creating validated text types.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TextError {
    /// The input text was empty or contained only whitespace
    #[error("Text cannot be empty")]
    Empty,
    /// The input text was shorter than the required minimum
    #[error("Text must be at least {min} characters, got {actual}")]
    TooShort { min: usize, actual: usize },
}

/// A string type that guarantees non-empty content.
///
/// The input is trimmed of leading and trailing whitespace during construction, so a
/// `NonEmptyText` always carries at least one visible character.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NonEmptyText(String);

impl NonEmptyText {
    /// Creates a new `NonEmptyText` from the given input.
    ///
    /// # Errors
    ///
    /// Returns `TextError::Empty` if the trimmed input is empty.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TextError::Empty);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Creates a `NonEmptyText` that must also hold at least `min` characters after trimming.
    ///
    /// Characters are counted as Unicode scalar values, not bytes.
    pub fn with_min_chars(input: impl AsRef<str>, min: usize) -> Result<Self, TextError> {
        let text = Self::new(input)?;
        let actual = text.0.chars().count();
        if actual < min {
            return Err(TextError::TooShort { min, actual });
        }
        Ok(text)
    }

    /// Creates a `NonEmptyText` from an optional input, treating `None` as empty.
    pub fn from_option(input: Option<&str>) -> Result<Self, TextError> {
        Self::new(input.unwrap_or_default())
    }

    /// Returns the inner string as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl std::fmt::Display for NonEmptyText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for NonEmptyText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl serde::Serialize for NonEmptyText {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for NonEmptyText {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        NonEmptyText::new(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_trims_input() {
        let text = NonEmptyText::new("  Lung Cancer \n").unwrap();
        assert_eq!(text.as_str(), "Lung Cancer");
    }

    #[test]
    fn test_new_rejects_whitespace_only() {
        assert_eq!(NonEmptyText::new("   "), Err(TextError::Empty));
        assert_eq!(NonEmptyText::new(""), Err(TextError::Empty));
    }

    #[test]
    fn test_with_min_chars_counts_after_trimming() {
        let err = NonEmptyText::with_min_chars("   short   ", 10).unwrap_err();
        assert_eq!(err, TextError::TooShort { min: 10, actual: 5 });

        assert!(NonEmptyText::with_min_chars("exactly ten", 10).is_ok());
    }

    #[test]
    fn test_from_option_none_is_empty() {
        assert_eq!(NonEmptyText::from_option(None), Err(TextError::Empty));
        assert_eq!(
            NonEmptyText::from_option(Some("Jane")).unwrap().as_str(),
            "Jane"
        );
    }

    #[test]
    fn test_deserialize_rejects_blank_string() {
        let result: Result<NonEmptyText, _> = serde_json::from_str("\"  \"");
        assert!(result.is_err());

        let ok: NonEmptyText = serde_json::from_str("\" Doe \"").unwrap();
        assert_eq!(ok.as_str(), "Doe");
    }
}
