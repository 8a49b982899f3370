//! Semantic newtypes for workout, exercise and set identifiers
//!
//! # Id-Composition Scheme
//!
//! Identifiers are composite and double as derivable foreign keys:
//!
//! | Type             | Format                       | Example                        |
//! |------------------|------------------------------|--------------------------------|
//! | [`WorkoutId`]    | `{dateKey}`                  | `2018-05-04`                   |
//! | [`ExerciseId`]   | `{dateKey}_{exerciseType}`   | `2018-05-04_bench-press`       |
//! | [`SetId`]        | `{exerciseId}_{ordinal:03}`  | `2018-05-04_bench-press_002`   |
//!
//! Neither the date key nor the exercise type may contain `_`, so every
//! composite splits unambiguously. Parent ids are recovered with
//! [`ExerciseId::workout_id`] and [`SetId::exercise_id`] instead of slicing
//! strings at call sites.
//!
//! # Parse-at-Boundaries Pattern
//!
//! Each identifier type:
//! - Validates its input on construction (parse-once pattern)
//! - Trims whitespace before validation
//! - Cannot represent invalid states
//! - Serializes as its canonical string and validates on deserialization

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![forbid(unsafe_code)]

use std::{fmt, str::FromStr};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// `strftime` pattern of the canonical date key.
pub const DATE_KEY_FORMAT: &str = "%Y-%m-%d";

const DATE_KEY_LEN: usize = 10;

// ============================================================================
// UNIFIED IDENTIFIER ERROR
// ============================================================================

/// Unified error type for all identifier validation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdentifierError {
    /// Identifier is empty or contains only whitespace
    #[error("identifier cannot be empty")]
    Empty,

    /// Identifier exceeds maximum length
    #[error("identifier too long: {actual} characters (max {max})")]
    TooLong {
        /// The maximum allowed length
        max: usize,
        /// The actual length provided
        actual: usize,
    },

    /// Identifier contains invalid characters
    #[error("identifier contains invalid characters: {details}")]
    InvalidCharacters {
        /// Human-readable explanation of what's invalid
        details: String,
    },

    /// Identifier does not follow the composite layout
    #[error("invalid identifier format: {details}")]
    InvalidFormat {
        /// Human-readable explanation of format requirements
        details: String,
    },

    /// Date key is not a calendar date
    #[error("invalid date key '{value}': expected YYYY-MM-DD or an RFC 3339 timestamp")]
    InvalidDate {
        /// The value that failed to parse
        value: String,
    },

    /// Set ordinal is not a three digit number in `001..=999`
    #[error("invalid set ordinal '{value}': expected three digits between 001 and 999")]
    InvalidOrdinal {
        /// The value that failed to parse
        value: String,
    },
}

impl IdentifierError {
    /// Create a `TooLong` error variant
    #[must_use]
    pub const fn too_long(max: usize, actual: usize) -> Self {
        Self::TooLong { max, actual }
    }

    /// Create an `InvalidCharacters` error variant
    #[must_use]
    pub fn invalid_characters(details: impl Into<String>) -> Self {
        Self::InvalidCharacters {
            details: details.into(),
        }
    }

    /// Create an `InvalidFormat` error variant
    #[must_use]
    pub fn invalid_format(details: impl Into<String>) -> Self {
        Self::InvalidFormat {
            details: details.into(),
        }
    }

    /// Create an `InvalidDate` error variant
    #[must_use]
    pub fn invalid_date(value: impl Into<String>) -> Self {
        Self::InvalidDate {
            value: value.into(),
        }
    }

    /// Create an `InvalidOrdinal` error variant
    #[must_use]
    pub fn invalid_ordinal(value: impl Into<String>) -> Self {
        Self::InvalidOrdinal {
            value: value.into(),
        }
    }
}

// ============================================================================
// WORKOUT ID (DATE KEY)
// ============================================================================

/// Canonical date key of a workout; one workout exists per calendar day.
///
/// ```rust
/// use setlog_core::domain::WorkoutId;
///
/// let id = WorkoutId::parse("2018-05-04T00:00:00.000Z")?;
/// assert_eq!(id.to_string(), "2018-05-04");
/// # Ok::<(), setlog_core::domain::IdentifierError>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WorkoutId(NaiveDate);

impl WorkoutId {
    /// Build the key for a calendar day.
    #[must_use]
    pub const fn from_date(date: NaiveDate) -> Self {
        Self(date)
    }

    /// Parse a date key.
    ///
    /// Accepts `YYYY-MM-DD` or an RFC 3339 timestamp, in which case the UTC
    /// calendar day is kept.
    ///
    /// # Errors
    ///
    /// Returns `IdentifierError::Empty` or `IdentifierError::InvalidDate`.
    pub fn parse(s: impl AsRef<str>) -> Result<Self, IdentifierError> {
        let trimmed = s.as_ref().trim();
        if trimmed.is_empty() {
            return Err(IdentifierError::Empty);
        }

        let date = if trimmed.len() == DATE_KEY_LEN {
            NaiveDate::parse_from_str(trimmed, DATE_KEY_FORMAT).ok()
        } else {
            DateTime::parse_from_rfc3339(trimmed)
                .ok()
                .map(|dt| dt.with_timezone(&Utc).date_naive())
        };

        date.map(Self)
            .ok_or_else(|| IdentifierError::invalid_date(trimmed))
    }

    /// The calendar day this key names.
    #[must_use]
    pub const fn date(&self) -> NaiveDate {
        self.0
    }
}

impl fmt::Display for WorkoutId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(DATE_KEY_FORMAT))
    }
}

impl FromStr for WorkoutId {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for WorkoutId {
    type Error = IdentifierError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(s)
    }
}

impl From<WorkoutId> for String {
    #[allow(clippy::use_self)]
    fn from(id: WorkoutId) -> String {
        id.to_string()
    }
}

// ============================================================================
// EXERCISE TYPE KEY
// ============================================================================

/// Exercise-type identifier such as `bench-press`.
///
/// # Guarantees
///
/// - Lowercase ASCII letters, digits and single hyphens between words
/// - 1-64 characters
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ExerciseTypeKey(String);

impl ExerciseTypeKey {
    /// Maximum allowed length for an exercise type key
    pub const MAX_LENGTH: usize = 64;

    /// Parse and validate an exercise type key (trims whitespace first).
    ///
    /// # Errors
    ///
    /// Returns `IdentifierError` if the key is invalid.
    pub fn parse(s: impl AsRef<str>) -> Result<Self, IdentifierError> {
        let trimmed = s.as_ref().trim();
        validate_exercise_type(trimmed)?;
        Ok(Self(trimmed.to_string()))
    }

    /// Get the key as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Rules:
/// - Must be 1-64 characters
/// - Only `a-z`, `0-9` and `-`
/// - No leading, trailing or doubled hyphen
fn validate_exercise_type(s: &str) -> Result<(), IdentifierError> {
    if s.is_empty() {
        return Err(IdentifierError::Empty);
    }

    if s.len() > ExerciseTypeKey::MAX_LENGTH {
        return Err(IdentifierError::too_long(ExerciseTypeKey::MAX_LENGTH, s.len()));
    }

    if !s
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(IdentifierError::invalid_characters(format!(
            "exercise type '{s}' must contain only lowercase letters, digits, or hyphens"
        )));
    }

    if s.starts_with('-') || s.ends_with('-') || s.contains("--") {
        return Err(IdentifierError::invalid_format(format!(
            "exercise type '{s}' must separate words with single hyphens"
        )));
    }

    Ok(())
}

impl fmt::Display for ExerciseTypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ExerciseTypeKey {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ExerciseTypeKey {
    type Error = IdentifierError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(s)
    }
}

impl From<ExerciseTypeKey> for String {
    #[allow(clippy::use_self)]
    fn from(key: ExerciseTypeKey) -> String {
        key.0
    }
}

impl AsRef<str> for ExerciseTypeKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ============================================================================
// EXERCISE ID
// ============================================================================

/// Globally unique exercise id: `{dateKey}_{exerciseType}`.
///
/// ```rust
/// use setlog_core::domain::ExerciseId;
///
/// let id = ExerciseId::parse("2018-05-04_bench-press")?;
/// assert_eq!(id.workout_id().to_string(), "2018-05-04");
/// assert_eq!(id.exercise_type().as_str(), "bench-press");
/// # Ok::<(), setlog_core::domain::IdentifierError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ExerciseId {
    workout: WorkoutId,
    exercise_type: ExerciseTypeKey,
}

impl ExerciseId {
    /// Compose an exercise id from its parts.
    #[must_use]
    pub const fn new(workout: WorkoutId, exercise_type: ExerciseTypeKey) -> Self {
        Self {
            workout,
            exercise_type,
        }
    }

    /// Parse `{dateKey}_{exerciseType}`.
    ///
    /// The date key may also be given as an RFC 3339 timestamp; it is
    /// normalised to `YYYY-MM-DD`.
    ///
    /// # Errors
    ///
    /// Returns `IdentifierError` if either part is invalid or the separator is missing.
    pub fn parse(s: impl AsRef<str>) -> Result<Self, IdentifierError> {
        let trimmed = s.as_ref().trim();
        if trimmed.is_empty() {
            return Err(IdentifierError::Empty);
        }

        let (date_part, type_part) = trimmed.split_once('_').ok_or_else(|| {
            IdentifierError::invalid_format(format!(
                "exercise id '{trimmed}' must look like '{{date}}_{{exercise-type}}'"
            ))
        })?;

        Ok(Self {
            workout: WorkoutId::parse(date_part)?,
            exercise_type: ExerciseTypeKey::parse(type_part)?,
        })
    }

    /// Id of the owning workout (the derivable foreign key).
    #[must_use]
    pub const fn workout_id(&self) -> WorkoutId {
        self.workout
    }

    /// Exercise type encoded in the id.
    #[must_use]
    pub const fn exercise_type(&self) -> &ExerciseTypeKey {
        &self.exercise_type
    }
}

impl fmt::Display for ExerciseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.workout, self.exercise_type)
    }
}

impl FromStr for ExerciseId {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ExerciseId {
    type Error = IdentifierError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(s)
    }
}

impl From<ExerciseId> for String {
    #[allow(clippy::use_self)]
    fn from(id: ExerciseId) -> String {
        id.to_string()
    }
}

// ============================================================================
// SET ID
// ============================================================================

/// Globally unique set id: `{exerciseId}_{ordinal:03}`.
///
/// The id is the only correlation key between a stored set and an edited one,
/// so it never changes once assigned.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SetId {
    exercise: ExerciseId,
    ordinal: u16,
}

impl SetId {
    /// Largest ordinal that fits the three digit suffix
    pub const MAX_ORDINAL: u16 = 999;

    /// Compose a set id.
    ///
    /// # Errors
    ///
    /// Returns `IdentifierError::InvalidOrdinal` unless `1 <= ordinal <= 999`.
    pub fn new(exercise: ExerciseId, ordinal: u16) -> Result<Self, IdentifierError> {
        if ordinal == 0 || ordinal > Self::MAX_ORDINAL {
            return Err(IdentifierError::invalid_ordinal(ordinal.to_string()));
        }
        Ok(Self { exercise, ordinal })
    }

    /// Parse `{exerciseId}_{ordinal:03}`.
    ///
    /// # Errors
    ///
    /// Returns `IdentifierError` if the exercise part or the ordinal is invalid.
    pub fn parse(s: impl AsRef<str>) -> Result<Self, IdentifierError> {
        let trimmed = s.as_ref().trim();
        if trimmed.is_empty() {
            return Err(IdentifierError::Empty);
        }

        let (exercise_part, ordinal_part) = trimmed.rsplit_once('_').ok_or_else(|| {
            IdentifierError::invalid_format(format!(
                "set id '{trimmed}' must look like '{{exercise-id}}_{{ordinal}}'"
            ))
        })?;

        if ordinal_part.len() != 3 || !ordinal_part.chars().all(|c| c.is_ascii_digit()) {
            return Err(IdentifierError::invalid_ordinal(ordinal_part));
        }

        let ordinal = ordinal_part
            .parse::<u16>()
            .map_err(|_| IdentifierError::invalid_ordinal(ordinal_part))?;

        Self::new(ExerciseId::parse(exercise_part)?, ordinal)
    }

    /// Id of the owning exercise.
    #[must_use]
    pub const fn exercise_id(&self) -> &ExerciseId {
        &self.exercise
    }

    /// 1-based ordinal suffix.
    #[must_use]
    pub const fn ordinal(&self) -> u16 {
        self.ordinal
    }
}

impl fmt::Display for SetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{:03}", self.exercise, self.ordinal)
    }
}

impl FromStr for SetId {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for SetId {
    type Error = IdentifierError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(s)
    }
}

impl From<SetId> for String {
    #[allow(clippy::use_self)]
    fn from(id: SetId) -> String {
        id.to_string()
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    // ===== WorkoutId Tests =====

    #[test]
    fn test_workout_id_from_date_key() {
        let id = WorkoutId::parse("2018-05-04").expect("valid");
        assert_eq!(id.to_string(), "2018-05-04");
        assert_eq!(
            id.date(),
            NaiveDate::from_ymd_opt(2018, 5, 4).expect("valid date")
        );
    }

    #[test]
    fn test_workout_id_from_rfc3339_keeps_utc_day() {
        let id = WorkoutId::parse("2018-05-04T00:00:00.000Z").expect("valid");
        assert_eq!(id.to_string(), "2018-05-04");

        let shifted = WorkoutId::parse("2018-05-04T23:30:00-02:00").expect("valid");
        assert_eq!(shifted.to_string(), "2018-05-05");
    }

    #[test]
    fn test_workout_id_rejects_garbage() {
        assert_eq!(WorkoutId::parse("   "), Err(IdentifierError::Empty));
        assert!(matches!(
            WorkoutId::parse("2018-13-01"),
            Err(IdentifierError::InvalidDate { .. })
        ));
        assert!(matches!(
            WorkoutId::parse("yesterday"),
            Err(IdentifierError::InvalidDate { .. })
        ));
    }

    // ===== ExerciseTypeKey Tests =====

    #[test]
    fn test_exercise_type_valid() {
        assert!(ExerciseTypeKey::parse("bench-press").is_ok());
        assert!(ExerciseTypeKey::parse("squat").is_ok());
        assert!(ExerciseTypeKey::parse("21s").is_ok());
    }

    #[test]
    fn test_exercise_type_invalid() {
        assert!(ExerciseTypeKey::parse("Bench").is_err());
        assert!(ExerciseTypeKey::parse("bench_press").is_err());
        assert!(ExerciseTypeKey::parse("-bench").is_err());
        assert!(ExerciseTypeKey::parse("bench--press").is_err());
        assert!(matches!(
            ExerciseTypeKey::parse("a".repeat(65)),
            Err(IdentifierError::TooLong { max: 64, .. })
        ));
    }

    // ===== ExerciseId Tests =====

    #[test]
    fn test_exercise_id_derives_workout() {
        let id = ExerciseId::parse("2018-05-04_bench-press").expect("valid");
        assert_eq!(id.workout_id(), WorkoutId::parse("2018-05-04").expect("valid"));
        assert_eq!(id.exercise_type().as_str(), "bench-press");
        assert_eq!(id.to_string(), "2018-05-04_bench-press");
    }

    #[test]
    fn test_exercise_id_normalises_timestamp_prefix() {
        let id = ExerciseId::parse("2018-05-04T00:00:00.000Z_bench-press").expect("valid");
        assert_eq!(id.to_string(), "2018-05-04_bench-press");
    }

    #[test]
    fn test_exercise_id_requires_separator() {
        assert!(matches!(
            ExerciseId::parse("2018-05-04"),
            Err(IdentifierError::InvalidFormat { .. })
        ));
    }

    // ===== SetId Tests =====

    #[test]
    fn test_set_id_roundtrip() {
        let id = SetId::parse("2018-05-04_bench-press_002").expect("valid");
        assert_eq!(id.ordinal(), 2);
        assert_eq!(id.exercise_id().to_string(), "2018-05-04_bench-press");
        assert_eq!(id.to_string(), "2018-05-04_bench-press_002");
    }

    #[test]
    fn test_set_id_rejects_bad_ordinals() {
        for bad in [
            "2018-05-04_bench-press_000",
            "2018-05-04_bench-press_01",
            "2018-05-04_bench-press_0001",
            "2018-05-04_bench-press_abc",
        ] {
            assert!(
                matches!(SetId::parse(bad), Err(IdentifierError::InvalidOrdinal { .. })),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_set_id_new_bounds() {
        let exercise = ExerciseId::parse("2018-05-04_squat").expect("valid");
        assert!(SetId::new(exercise.clone(), 0).is_err());
        assert!(SetId::new(exercise.clone(), 1000).is_err());
        let last = SetId::new(exercise, 999).expect("valid");
        assert_eq!(last.to_string(), "2018-05-04_squat_999");
    }

    #[test]
    fn test_identifiers_serialize_as_strings() {
        let id = SetId::parse("2018-05-04_bench-press_001").expect("valid");
        let json = serde_json::to_string(&id).expect("serialize");
        assert_eq!(json, "\"2018-05-04_bench-press_001\"");

        let back: SetId = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, id);

        let bad: Result<ExerciseId, _> = serde_json::from_str("\"not an id\"");
        assert!(bad.is_err());
    }
}
