//! # Trialcast Core
//!
//! The deterministic prediction contract behind the Trialcast form.
//!
//! A submission flows through three components:
//!
//! ```text
//! TrialForm ──► TrialRecord ──► PredictionAdapter ──► Label ──► StyledMessage
//!  (raw)      Input Collector   (Preprocessor +                Result Renderer
//!                                RandomForest)
//! ```
//!
//! ## Constraints
//!
//! - No async, no network, no logging: the app crate owns those.
//! - No floating point: features, thresholds and probabilities are integers
//!   (fixed-point with [`primitives::FIXED_POINT_SCALE`], millionths).
//! - Artifacts are loaded once and only ever borrowed immutably.

pub mod adapter;
pub mod forest;
pub mod formats;
pub mod preprocess;
pub mod primitives;
pub mod record;
pub mod render;

pub use adapter::{PredictError, Prediction, PredictionAdapter};
pub use forest::{ClassProbabilities, Classifier, DecisionTree, PredictionError, RandomForest, TreeNode};
pub use formats::{ArtifactBundle, ArtifactError};
pub use preprocess::{
    CellValue, ColumnEncoder, Encoding, FeatureEncoder, FeatureVector, HandleUnknown,
    Preprocessor, Row, TransformError,
};
pub use record::{
    Condition, Gender, InputError, Location, Phase, SponsorType, TrialForm, TrialRecord,
};
pub use render::{StyledMessage, Tone, render, render_error};

use serde::{Deserialize, Serialize};

// =============================================================================
// LABEL
// =============================================================================

/// Binary trial outcome predicted by the classifier.
///
/// The discriminants match the class values the classifier was trained on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Label {
    /// Class 0.
    Failure = 0,
    /// Class 1.
    Success = 1,
}

impl Label {
    /// The class value (0 or 1).
    #[must_use]
    pub fn as_class(self) -> u8 {
        self as u8
    }

    /// Human-readable outcome name.
    #[must_use]
    pub fn outcome(self) -> &'static str {
        match self {
            Self::Failure => "Failure",
            Self::Success => "Success",
        }
    }
}

impl From<bool> for Label {
    fn from(success: bool) -> Self {
        if success { Self::Success } else { Self::Failure }
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_class())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_class_values() {
        assert_eq!(Label::Failure.as_class(), 0);
        assert_eq!(Label::Success.as_class(), 1);
        assert_eq!(Label::from(true), Label::Success);
        assert_eq!(Label::from(false), Label::Failure);
    }

    #[test]
    fn label_serializes_snake_case() {
        let json = serde_json::to_string(&Label::Success).unwrap_or_default();
        assert_eq!(json, "\"success\"");
    }
}
