//! Request and response bodies for the JSON API.
//!
//! Requests reuse [`TrialForm`](trialcast_core::TrialForm) directly, so a JSON
//! body and a form post go through the same validation.

use serde::{Deserialize, Serialize};
use trialcast_core::primitives::{MIN_DURATION, MIN_ENROLLMENT};
use trialcast_core::record::{
    CONDITION, DURATION, ENROLLMENT, GENDER, LOCATION, PHASE, SPONSOR_TYPE,
};
use trialcast_core::{
    Condition, Gender, InputError, Location, Phase, PredictError, Prediction, SponsorType, render,
};

/// A successful prediction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictResponse {
    /// Class value, 0 or 1.
    pub label: u8,
    /// "Success" or "Failure".
    pub outcome: String,
    pub success_probability_millionths: u64,
    pub failure_probability_millionths: u64,
    /// The rendered verdict line.
    pub message: String,
}

impl From<&Prediction> for PredictResponse {
    fn from(prediction: &Prediction) -> Self {
        Self {
            label: prediction.label.as_class(),
            outcome: prediction.label.outcome().to_string(),
            success_probability_millionths: prediction.probabilities.success_millionths,
            failure_probability_millionths: prediction.probabilities.failure_millionths,
            message: render(prediction.label).text,
        }
    }
}

/// An input or prediction error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    /// Offending field, for input errors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    /// "transform" or "prediction", for adapter errors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl From<&InputError> for ErrorResponse {
    fn from(err: &InputError) -> Self {
        Self {
            error: err.to_string(),
            field: Some(err.field().to_string()),
            kind: None,
        }
    }
}

impl From<&PredictError> for ErrorResponse {
    fn from(err: &PredictError) -> Self {
        Self {
            error: err.to_string(),
            field: None,
            kind: Some(err.kind().to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// One input field and its accepted values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSchema {
    pub name: String,
    /// "choice" or "integer".
    pub kind: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<u32>,
}

impl FieldSchema {
    fn choice<T: std::fmt::Display>(name: &str, all: &[T]) -> Self {
        Self {
            name: name.to_string(),
            kind: "choice".to_string(),
            choices: all.iter().map(ToString::to_string).collect(),
            min: None,
        }
    }

    fn integer(name: &str, min: u32) -> Self {
        Self {
            name: name.to_string(),
            kind: "integer".to_string(),
            choices: Vec::new(),
            min: Some(min),
        }
    }
}

/// The seven input fields in column order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaResponse {
    pub fields: Vec<FieldSchema>,
}

impl SchemaResponse {
    pub fn current() -> Self {
        Self {
            fields: vec![
                FieldSchema::choice(PHASE, Phase::ALL),
                FieldSchema::choice(SPONSOR_TYPE, SponsorType::ALL),
                FieldSchema::choice(GENDER, Gender::ALL),
                FieldSchema::choice(CONDITION, Condition::ALL),
                FieldSchema::choice(LOCATION, Location::ALL),
                FieldSchema::integer(ENROLLMENT, MIN_ENROLLMENT),
                FieldSchema::integer(DURATION, MIN_DURATION),
            ],
        }
    }
}
