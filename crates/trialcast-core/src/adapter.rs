//! # Adapter Module
//!
//! The Prediction Adapter: one record in, one label out.
//!
//! The adapter borrows an encoder and a classifier that were constructed
//! once at startup. It holds no state of its own, so the same record always
//! yields the same label for the lifetime of the artifacts.
//!
//! Only the two recoverable failure kinds cross this boundary, wrapped in
//! [`PredictError`]. Anything else (a panic, a defect) is not intercepted.

use crate::forest::{ClassProbabilities, Classifier, PredictionError};
use crate::preprocess::{FeatureEncoder, Row, TransformError};
use crate::record::TrialRecord;
use crate::Label;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A recoverable prediction failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PredictError {
    /// The record could not be encoded.
    #[error(transparent)]
    Transform(#[from] TransformError),

    /// The classifier rejected the encoded record.
    #[error(transparent)]
    Prediction(#[from] PredictionError),
}

impl PredictError {
    /// Short machine-readable kind.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transform(_) => "transform",
            Self::Prediction(_) => "prediction",
        }
    }
}

/// A label together with the probabilities behind it.
///
/// The label is decided on the summed per-tree votes, before averaging.
/// The averaged millionths are truncated, so a narrow win can show equal
/// probabilities next to `Label::Success`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prediction {
    pub label: Label,
    pub probabilities: ClassProbabilities,
}

/// Wraps a fitted encoder and classifier behind `predict(record) -> label`.
#[derive(Debug, Clone, Copy)]
pub struct PredictionAdapter<'a, E, C> {
    encoder: &'a E,
    classifier: &'a C,
}

impl<'a, E: FeatureEncoder, C: Classifier> PredictionAdapter<'a, E, C> {
    /// Borrow the two artifacts.
    #[must_use]
    pub fn new(encoder: &'a E, classifier: &'a C) -> Self {
        Self {
            encoder,
            classifier,
        }
    }

    /// Predict the outcome label for a validated record.
    pub fn predict(&self, record: &TrialRecord) -> Result<Label, PredictError> {
        let features = self.encoder.transform(&record.to_row())?;
        Ok(self.classifier.predict(&features)?)
    }

    /// Predict with the averaged class probabilities.
    pub fn predict_detailed(&self, record: &TrialRecord) -> Result<Prediction, PredictError> {
        self.predict_row(&record.to_row())
    }

    /// Predict from a raw row, which may hold values no form could produce.
    pub fn predict_row(&self, row: &Row) -> Result<Prediction, PredictError> {
        let features = self.encoder.transform(row)?;
        let label = self.classifier.predict(&features)?;
        let probabilities = self.classifier.predict_proba(&features)?;
        Ok(Prediction {
            label,
            probabilities,
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::forest::{DecisionTree, RandomForest, TreeNode};
    use crate::preprocess::{ColumnEncoder, Encoding, FeatureVector, HandleUnknown, Preprocessor};
    use crate::primitives::FIXED_POINT_SCALE;
    use crate::record::{Condition, Gender, Location, Phase, SponsorType};
    use proptest::prelude::*;

    /// Encodes only the sponsor, so the trained category set is explicit.
    fn sponsor_only() -> Preprocessor {
        Preprocessor::new(vec![ColumnEncoder::new(
            "sponsor_type",
            Encoding::OneHot {
                categories: vec!["INDUSTRY".into(), "NIH".into()],
                handle_unknown: HandleUnknown::Error,
            },
        )])
    }

    /// Industry-sponsored trials succeed.
    fn industry_forest() -> RandomForest {
        RandomForest::new(
            2,
            vec![DecisionTree::new(vec![
                TreeNode::Split {
                    feature: 0,
                    threshold_q: FIXED_POINT_SCALE / 2,
                    left: 1,
                    right: 2,
                },
                TreeNode::Leaf { counts: [7, 3] },
                TreeNode::Leaf { counts: [2, 8] },
            ])],
        )
    }

    fn record(sponsor: SponsorType) -> TrialRecord {
        TrialRecord::new(
            Phase::Three,
            sponsor,
            Gender::All,
            Condition::Hypertension,
            Location::UnitedStates,
            500,
            365,
        )
        .unwrap()
    }

    #[test]
    fn predicts_label_through_both_artifacts() {
        let pre = sponsor_only();
        let forest = industry_forest();
        let adapter = PredictionAdapter::new(&pre, &forest);

        assert_eq!(adapter.predict(&record(SponsorType::Industry)), Ok(Label::Success));
        assert_eq!(adapter.predict(&record(SponsorType::Nih)), Ok(Label::Failure));
    }

    #[test]
    fn detailed_prediction_carries_probabilities() {
        let pre = sponsor_only();
        let forest = industry_forest();
        let adapter = PredictionAdapter::new(&pre, &forest);

        let prediction = adapter.predict_detailed(&record(SponsorType::Industry)).unwrap();
        assert_eq!(prediction.label, Label::Success);
        assert_eq!(prediction.probabilities.success_millionths, 800_000);
    }

    #[test]
    fn category_outside_trained_set_is_transform_error() {
        let pre = sponsor_only();
        let forest = industry_forest();
        let adapter = PredictionAdapter::new(&pre, &forest);

        let err = adapter.predict(&record(SponsorType::Other)).unwrap_err();
        assert_eq!(err.kind(), "transform");
        assert!(err.to_string().contains("OTHER"));
    }

    #[test]
    fn malformed_row_is_transform_error() {
        let pre = sponsor_only();
        let forest = industry_forest();
        let adapter = PredictionAdapter::new(&pre, &forest);

        let mut row = record(SponsorType::Nih).to_row();
        row.remove("sponsor_type");
        assert!(matches!(
            adapter.predict_row(&row),
            Err(PredictError::Transform(TransformError::MissingColumn { .. }))
        ));
    }

    #[test]
    fn width_mismatch_is_prediction_error() {
        let pre = sponsor_only();
        let forest = RandomForest::new(3, industry_forest().trees);
        let adapter = PredictionAdapter::new(&pre, &forest);

        let err = adapter.predict(&record(SponsorType::Nih)).unwrap_err();
        assert_eq!(err.kind(), "prediction");
    }

    struct FailingClassifier;

    impl Classifier for FailingClassifier {
        fn n_features(&self) -> usize {
            0
        }

        fn predict_proba(&self, _: &FeatureVector) -> Result<ClassProbabilities, PredictionError> {
            Err(PredictionError::EmptyForest)
        }
    }

    #[test]
    fn classifier_failure_is_surfaced() {
        let pre = sponsor_only();
        let adapter = PredictionAdapter::new(&pre, &FailingClassifier);
        assert_eq!(
            adapter.predict(&record(SponsorType::Nih)),
            Err(PredictError::Prediction(PredictionError::EmptyForest))
        );
    }

    fn any_record() -> impl Strategy<Value = TrialRecord> {
        (
            prop::sample::select(Phase::ALL),
            prop::sample::select(vec![SponsorType::Industry, SponsorType::Nih]),
            prop::sample::select(Gender::ALL),
            prop::sample::select(Condition::ALL),
            prop::sample::select(Location::ALL),
            1u32..1_000_000,
            1u32..10_000,
        )
            .prop_map(|(p, s, g, c, l, e, d)| {
                TrialRecord::new(p, s, g, c, l, e, d).unwrap()
            })
    }

    proptest! {
        #[test]
        fn prediction_is_deterministic(record in any_record()) {
            let pre = sponsor_only();
            let forest = industry_forest();
            let adapter = PredictionAdapter::new(&pre, &forest);
            let first = adapter.predict(&record);
            prop_assert!(first.is_ok());
            prop_assert_eq!(first, adapter.predict(&record));
        }

        #[test]
        fn detailed_label_matches_plain_label(record in any_record()) {
            let pre = sponsor_only();
            let forest = industry_forest();
            let adapter = PredictionAdapter::new(&pre, &forest);
            let plain = adapter.predict(&record).unwrap();
            let detailed = adapter.predict_detailed(&record).unwrap();
            prop_assert_eq!(plain, detailed.label);
        }
    }
}
