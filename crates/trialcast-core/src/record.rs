//! # Record Module
//!
//! The Input Collector: closed-set field types, the raw submitted form, and
//! the validated [`TrialRecord`] handed to the prediction adapter.
//!
//! A `TrialRecord` can only be obtained through validation, so every record
//! that reaches the adapter has all seven fields populated and both counts
//! at or above their minimum.

use crate::preprocess::Row;
use crate::primitives::{MIN_DURATION, MIN_ENROLLMENT};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// =============================================================================
// FIELD NAMES
// =============================================================================

pub const PHASE: &str = "phase";
pub const SPONSOR_TYPE: &str = "sponsor_type";
pub const GENDER: &str = "gender";
pub const CONDITION: &str = "condition";
pub const LOCATION: &str = "location";
pub const ENROLLMENT: &str = "enrollment";
pub const DURATION: &str = "duration";

/// Column order of the one-row table, matching the fitted preprocessor.
pub const COLUMNS: [&str; 7] = [
    PHASE,
    SPONSOR_TYPE,
    GENDER,
    CONDITION,
    LOCATION,
    ENROLLMENT,
    DURATION,
];

// =============================================================================
// INPUT ERROR
// =============================================================================

/// Rejection raised by the Input Collector before anything is predicted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("{field} is required")]
    MissingField { field: &'static str },

    #[error("{value:?} is not a valid choice for {field}")]
    InvalidChoice { field: &'static str, value: String },

    #[error("{field} must be a whole number, got {value:?}")]
    NotAnInteger { field: &'static str, value: String },

    #[error("{field} must be at least {min}, got {value}")]
    BelowMinimum {
        field: &'static str,
        min: u32,
        value: i64,
    },

    #[error("{field} must be at most {max}, got {value}")]
    TooLarge {
        field: &'static str,
        max: u32,
        value: i64,
    },
}

impl InputError {
    /// The offending field's wire name.
    #[must_use]
    pub fn field(&self) -> &'static str {
        match self {
            Self::MissingField { field }
            | Self::InvalidChoice { field, .. }
            | Self::NotAnInteger { field, .. }
            | Self::BelowMinimum { field, .. }
            | Self::TooLarge { field, .. } => field,
        }
    }
}

// =============================================================================
// CLOSED-SET CHOICES
// =============================================================================

/// Error from parsing a label outside a closed choice set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown choice {0:?}")]
pub struct UnknownChoice(pub String);

/// Declares a closed-set enum with its wire labels in widget order.
macro_rules! closed_choice {
    (
        $(#[$meta:meta])*
        $name:ident { $($variant:ident => $label:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $label)]
                $variant,
            )+
        }

        impl $name {
            /// Every choice, in the order the form offers them.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// The wire label the preprocessor was fitted on.
            #[must_use]
            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $label,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownChoice;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let s = s.trim();
                Self::ALL
                    .iter()
                    .copied()
                    .find(|choice| choice.as_str() == s)
                    .ok_or_else(|| UnknownChoice(s.to_string()))
            }
        }
    };
}

closed_choice! {
    /// Trial phase. Phase 1 trials are not covered by the model.
    Phase { Two => "2", Three => "3", Four => "4" }
}

closed_choice! {
    /// Who funds the trial.
    SponsorType { Industry => "INDUSTRY", Nih => "NIH", Other => "OTHER" }
}

closed_choice! {
    /// Eligible participant gender.
    Gender { Male => "MALE", Female => "FEMALE", All => "ALL" }
}

closed_choice! {
    /// Primary condition studied.
    Condition {
        CardiovascularDiseases => "Cardiovascular Diseases",
        CoronaryDisease => "Coronary Disease",
        DiabetesMellitus => "Diabetes Mellitus",
        DiabetesMellitusType2 => "Diabetes Mellitus, Type 2",
        Hypercholesterolemia => "Hypercholesterolemia",
        Hypertension => "Hypertension",
        ProstateCancer => "Prostate Cancer",
        Others => "others",
    }
}

closed_choice! {
    /// Country the trial runs in.
    Location { UnitedStates => "United States", Canada => "Canada" }
}

impl Phase {
    /// The phase as the integer the model was trained on.
    #[must_use]
    pub fn number(self) -> i64 {
        match self {
            Self::Two => 2,
            Self::Three => 3,
            Self::Four => 4,
        }
    }
}

// =============================================================================
// RAW FORM
// =============================================================================

/// A form submission exactly as received.
///
/// Every field is kept as text so validation can report what was actually
/// sent. Absent and `null` fields deserialize as empty strings; JSON numbers
/// and booleans are accepted for any field and kept in their textual form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrialForm {
    #[serde(deserialize_with = "text_or_number")]
    pub phase: String,
    #[serde(deserialize_with = "text_or_number")]
    pub sponsor_type: String,
    #[serde(deserialize_with = "text_or_number")]
    pub gender: String,
    #[serde(deserialize_with = "text_or_number")]
    pub condition: String,
    #[serde(deserialize_with = "text_or_number")]
    pub location: String,
    #[serde(deserialize_with = "text_or_number")]
    pub enrollment: String,
    #[serde(deserialize_with = "text_or_number")]
    pub duration: String,
}

#[derive(Deserialize)]
#[serde(untagged, expecting = "a text, number, boolean or null value")]
enum Scalar {
    Text(String),
    Number(serde_json::Number),
    Flag(bool),
    Null,
}

fn text_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Scalar::deserialize(deserializer)? {
        Scalar::Text(text) => text,
        Scalar::Number(number) => number.to_string(),
        Scalar::Flag(flag) => flag.to_string(),
        Scalar::Null => String::new(),
    })
}

impl From<&TrialRecord> for TrialForm {
    fn from(record: &TrialRecord) -> Self {
        Self {
            phase: record.phase.to_string(),
            sponsor_type: record.sponsor_type.to_string(),
            gender: record.gender.to_string(),
            condition: record.condition.to_string(),
            location: record.location.to_string(),
            enrollment: record.enrollment.to_string(),
            duration: record.duration.to_string(),
        }
    }
}

fn parse_choice<T: FromStr>(field: &'static str, raw: &str) -> Result<T, InputError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(InputError::MissingField { field });
    }
    raw.parse().map_err(|_| InputError::InvalidChoice {
        field,
        value: raw.to_string(),
    })
}

fn parse_count(field: &'static str, raw: &str, min: u32) -> Result<u32, InputError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(InputError::MissingField { field });
    }
    let value: i64 = raw.parse().map_err(|_| InputError::NotAnInteger {
        field,
        value: raw.to_string(),
    })?;
    check_count(field, value, min)
}

fn check_count(field: &'static str, value: i64, min: u32) -> Result<u32, InputError> {
    if value < i64::from(min) {
        return Err(InputError::BelowMinimum { field, min, value });
    }
    u32::try_from(value).map_err(|_| InputError::TooLarge {
        field,
        max: u32::MAX,
        value,
    })
}

// =============================================================================
// TRIAL RECORD
// =============================================================================

/// One complete, validated set of trial parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TrialRecord {
    phase: Phase,
    sponsor_type: SponsorType,
    gender: Gender,
    condition: Condition,
    location: Location,
    enrollment: u32,
    duration: u32,
}

impl TrialRecord {
    /// Build a record from typed values, enforcing the count minima.
    pub fn new(
        phase: Phase,
        sponsor_type: SponsorType,
        gender: Gender,
        condition: Condition,
        location: Location,
        enrollment: u32,
        duration: u32,
    ) -> Result<Self, InputError> {
        let enrollment = check_count(ENROLLMENT, i64::from(enrollment), MIN_ENROLLMENT)?;
        let duration = check_count(DURATION, i64::from(duration), MIN_DURATION)?;
        Ok(Self {
            phase,
            sponsor_type,
            gender,
            condition,
            location,
            enrollment,
            duration,
        })
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn sponsor_type(&self) -> SponsorType {
        self.sponsor_type
    }

    pub fn gender(&self) -> Gender {
        self.gender
    }

    pub fn condition(&self) -> Condition {
        self.condition
    }

    pub fn location(&self) -> Location {
        self.location
    }

    /// Number of participants.
    pub fn enrollment(&self) -> u32 {
        self.enrollment
    }

    /// Trial duration in days.
    pub fn duration(&self) -> u32 {
        self.duration
    }

    /// The one-row table the preprocessor expects.
    #[must_use]
    pub fn to_row(&self) -> Row {
        Row::new()
            .with_int(PHASE, self.phase.number())
            .with_text(SPONSOR_TYPE, self.sponsor_type.as_str())
            .with_text(GENDER, self.gender.as_str())
            .with_text(CONDITION, self.condition.as_str())
            .with_text(LOCATION, self.location.as_str())
            .with_int(ENROLLMENT, i64::from(self.enrollment))
            .with_int(DURATION, i64::from(self.duration))
    }
}

impl TryFrom<&TrialForm> for TrialRecord {
    type Error = InputError;

    /// Validate fields in form order; the first rejection wins.
    fn try_from(form: &TrialForm) -> Result<Self, Self::Error> {
        Ok(Self {
            phase: parse_choice(PHASE, &form.phase)?,
            sponsor_type: parse_choice(SPONSOR_TYPE, &form.sponsor_type)?,
            gender: parse_choice(GENDER, &form.gender)?,
            condition: parse_choice(CONDITION, &form.condition)?,
            location: parse_choice(LOCATION, &form.location)?,
            enrollment: parse_count(ENROLLMENT, &form.enrollment, MIN_ENROLLMENT)?,
            duration: parse_count(DURATION, &form.duration, MIN_DURATION)?,
        })
    }
}

impl TryFrom<TrialForm> for TrialRecord {
    type Error = InputError;

    fn try_from(form: TrialForm) -> Result<Self, Self::Error> {
        Self::try_from(&form)
    }
}

// =============================================================================
// TESTS
// =============================================================================
