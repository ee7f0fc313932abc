//! Internal implementation of the identifier types.

use crate::{IdError, IdResult};
use rand::Rng;
use std::{fmt, str::FromStr};

/// Re-exported for convenience.
pub use ::uuid::Uuid;

/// Prefix carried by every patient identifier.
pub const PATIENT_ID_PREFIX: &str = "PT-";

const MIN_PATIENT_DIGITS: usize = 5;
const RANDOM_START_RANGE: std::ops::RangeInclusive<u32> = 10_000..=99_999;

/// A formatted sequence identifier for a patient, e.g. `PT-12845`.
///
/// Once constructed, the identifier is guaranteed to be in canonical form: the `PT-` prefix
/// followed by at least five decimal digits. Numbers below 10000 are zero padded.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PatientId(u32);

impl PatientId {
    /// Builds an identifier from its sequence number.
    pub fn from_number(number: u32) -> Self {
        Self(number)
    }

    /// Returns the sequence number behind this identifier.
    pub fn number(&self) -> u32 {
        self.0
    }

    /// Validates and parses an identifier that must already be canonical.
    ///
    /// # Errors
    ///
    /// Returns [`IdError::InvalidInput`] if `input` lacks the `PT-` prefix, has fewer than five
    /// digits, contains non-digit characters, or does not fit the sequence range.
    pub fn parse(input: &str) -> IdResult<Self> {
        let digits = input.strip_prefix(PATIENT_ID_PREFIX).ok_or_else(|| {
            IdError::InvalidInput(format!(
                "patient id must start with '{}', got: '{}'",
                PATIENT_ID_PREFIX, input
            ))
        })?;

        if digits.len() < MIN_PATIENT_DIGITS || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(IdError::InvalidInput(format!(
                "patient id must be '{}' followed by at least {} digits, got: '{}'",
                PATIENT_ID_PREFIX, MIN_PATIENT_DIGITS, input
            )));
        }

        let number = digits.parse::<u32>().map_err(|e| {
            IdError::InvalidInput(format!("patient id '{}' is out of range: {}", input, e))
        })?;

        Ok(Self(number))
    }
}

impl fmt::Display for PatientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:05}", PATIENT_ID_PREFIX, self.0)
    }
}

impl FromStr for PatientId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PatientId::parse(s)
    }
}

/// Allocates strictly increasing patient identifiers.
///
/// The generator is owned by whichever component creates patient records; it is not shared
/// between threads.
#[derive(Clone, Debug)]
pub struct PatientIdGenerator {
    next: u32,
}

impl PatientIdGenerator {
    /// Starts the sequence at a fixed number. Used by tests and deterministic fixtures.
    pub fn starting_at(first: u32) -> Self {
        Self { next: first }
    }

    /// Starts the sequence at a random five-digit number.
    pub fn random_start() -> Self {
        let first = rand::thread_rng().gen_range(RANDOM_START_RANGE);
        Self::starting_at(first)
    }

    /// Returns the identifier the next call to [`allocate`](Self::allocate) will hand out.
    pub fn peek(&self) -> PatientId {
        PatientId(self.next)
    }

    /// Allocates the next identifier in the sequence.
    ///
    /// # Errors
    ///
    /// Returns [`IdError::InvalidInput`] once the sequence is exhausted.
    pub fn allocate(&mut self) -> IdResult<PatientId> {
        let id = PatientId(self.next);
        self.next = self
            .next
            .checked_add(1)
            .ok_or_else(|| IdError::InvalidInput("patient id sequence exhausted".into()))?;
        Ok(id)
    }

    /// Moves the sequence past `id` so that existing records never collide with new ones.
    pub fn reserve(&mut self, id: PatientId) {
        if id.0 >= self.next {
            self.next = id.0.saturating_add(1);
        }
    }
}

impl Default for PatientIdGenerator {
    fn default() -> Self {
        Self::random_start()
    }
}

/// Canonical identifier for an uploaded document (32 lowercase hex characters, no hyphens).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DocumentId(Uuid);

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentId {
    /// Generates a new random document identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Validates and parses a document identifier that must already be canonical.
    ///
    /// # Errors
    ///
    /// Returns [`IdError::InvalidInput`] if `input` is not 32 lowercase hex characters.
    pub fn parse(input: &str) -> IdResult<Self> {
        if !Self::is_canonical(input) {
            return Err(IdError::InvalidInput(format!(
                "document id must be 32 lowercase hex characters without hyphens, got: '{}'",
                input
            )));
        }
        Uuid::parse_str(input)
            .map(Self)
            .map_err(|e| IdError::InvalidInput(format!("invalid document id '{}': {}", input, e)))
    }

    /// Returns true if `input` is in canonical document id form.
    pub fn is_canonical(input: &str) -> bool {
        input.len() == 32
            && input
                .bytes()
                .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
    }

    pub fn uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

impl FromStr for DocumentId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DocumentId::parse(s)
    }
}

#[cfg(feature = "serde")]
mod serde_impls {
    use super::{DocumentId, PatientId};

    macro_rules! string_serde {
        ($ty:ty) => {
            impl serde::Serialize for $ty {
                fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
                where
                    S: serde::Serializer,
                {
                    serializer.collect_str(self)
                }
            }

            impl<'de> serde::Deserialize<'de> for $ty {
                fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
                where
                    D: serde::Deserializer<'de>,
                {
                    let s = String::deserialize(deserializer)?;
                    <$ty>::parse(&s).map_err(serde::de::Error::custom)
                }
            }
        };
    }

    string_serde!(PatientId);
    string_serde!(DocumentId);
}
