//! # Forest Module
//!
//! The trained classifier: a random forest of binary decision trees in flat
//! node layout, evaluated with integer arithmetic only.
//!
//! A sample goes left at a split when `features[feature] <= threshold_q`.
//! Each leaf stores the class counts it saw during training; a tree's
//! probability estimate is those counts normalized to millionths, and the
//! forest averages the estimates of all trees (soft voting).

use crate::preprocess::FeatureVector;
use crate::primitives::{FIXED_POINT_SCALE, MAX_NODES_PER_TREE, MAX_TREES, PROBABILITY_UNIT};
use crate::Label;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// =============================================================================
// CLASSIFIER TRAIT
// =============================================================================

/// A binary classifier over encoded feature vectors.
pub trait Classifier {
    /// Width of the feature vector this classifier accepts.
    fn n_features(&self) -> usize;

    /// Class probability estimates for one sample.
    fn predict_proba(&self, features: &FeatureVector) -> Result<ClassProbabilities, PredictionError>;

    /// The predicted label for one sample.
    fn predict(&self, features: &FeatureVector) -> Result<Label, PredictionError> {
        self.predict_proba(features).map(|p| p.label())
    }
}

// =============================================================================
// PREDICTION ERROR
// =============================================================================

/// The classifier could not produce a label.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PredictionError {
    #[error("classifier expects {expected} features, got {actual}")]
    FeatureCountMismatch { expected: usize, actual: usize },

    #[error("tree {tree} is malformed at node {node}")]
    MalformedTree { tree: usize, node: usize },

    #[error("tree {tree} reached a leaf with no training samples at node {node}")]
    EmptyLeaf { tree: usize, node: usize },

    #[error("classifier has no trees")]
    EmptyForest,
}

// =============================================================================
// PROBABILITIES
// =============================================================================

/// Class probabilities in millionths.
///
/// Integer truncation means the two values may sum to slightly less than
/// one million.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassProbabilities {
    pub failure_millionths: u64,
    pub success_millionths: u64,
}

impl ClassProbabilities {
    /// Argmax over the two classes; a tie goes to the first class.
    #[must_use]
    pub fn label(&self) -> Label {
        Label::from(self.success_millionths > self.failure_millionths)
    }
}

// =============================================================================
// TREE
// =============================================================================

/// One node of a decision tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TreeNode {
    /// Go to `left` if `features[feature] <= threshold_q`, else `right`.
    Split {
        feature: usize,
        threshold_q: i64,
        left: usize,
        right: usize,
    },
    /// Training class counts: `[failures, successes]`.
    Leaf { counts: [u64; 2] },
}

/// A binary decision tree. Node 0 is the root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionTree {
    pub nodes: Vec<TreeNode>,
}

impl DecisionTree {
    #[must_use]
    pub fn new(nodes: Vec<TreeNode>) -> Self {
        Self { nodes }
    }

    /// Check the structure against a feature width.
    ///
    /// Children must come strictly after their parent, which rules out
    /// cycles and bounds every walk by the node count.
    pub fn validate(&self, tree: usize, n_features: usize) -> Result<(), PredictionError> {
        if self.nodes.is_empty() || self.nodes.len() > MAX_NODES_PER_TREE {
            return Err(PredictionError::MalformedTree { tree, node: 0 });
        }
        for (index, node) in self.nodes.iter().enumerate() {
            match *node {
                TreeNode::Split {
                    feature,
                    left,
                    right,
                    ..
                } => {
                    let in_range = |child: usize| child > index && child < self.nodes.len();
                    if feature >= n_features || !in_range(left) || !in_range(right) {
                        return Err(PredictionError::MalformedTree { tree, node: index });
                    }
                }
                TreeNode::Leaf { counts } => {
                    if counts[0].saturating_add(counts[1]) == 0 {
                        return Err(PredictionError::EmptyLeaf { tree, node: index });
                    }
                }
            }
        }
        Ok(())
    }

    /// Walk from the root to a leaf and return its index.
    pub fn apply(&self, tree: usize, features: &FeatureVector) -> Result<usize, PredictionError> {
        let mut index = 0;
        // Children always have larger indices, so at most `len` steps.
        for _ in 0..self.nodes.len() {
            match self.nodes.get(index) {
                Some(TreeNode::Leaf { .. }) => return Ok(index),
                Some(TreeNode::Split {
                    feature,
                    threshold_q,
                    left,
                    right,
                }) => {
                    let value = features
                        .get(*feature)
                        .ok_or(PredictionError::MalformedTree { tree, node: index })?;
                    let next = if value <= *threshold_q { *left } else { *right };
                    if next <= index {
                        return Err(PredictionError::MalformedTree { tree, node: index });
                    }
                    index = next;
                }
                None => return Err(PredictionError::MalformedTree { tree, node: index }),
            }
        }
        Err(PredictionError::MalformedTree { tree, node: index })
    }

    /// Leaf class distribution for one sample, in millionths.
    pub fn predict_proba(
        &self,
        tree: usize,
        features: &FeatureVector,
    ) -> Result<ClassProbabilities, PredictionError> {
        let leaf = self.apply(tree, features)?;
        let Some(TreeNode::Leaf { counts }) = self.nodes.get(leaf) else {
            return Err(PredictionError::MalformedTree { tree, node: leaf });
        };
        let total = counts[0].saturating_add(counts[1]);
        if total == 0 {
            return Err(PredictionError::EmptyLeaf { tree, node: leaf });
        }
        Ok(ClassProbabilities {
            failure_millionths: millionths(counts[0], total),
            success_millionths: millionths(counts[1], total),
        })
    }
}

fn millionths(count: u64, total: u64) -> u64 {
    // u128 keeps the product exact for any u64 counts.
    let scaled = u128::from(count) * u128::from(PROBABILITY_UNIT) / u128::from(total);
    scaled as u64
}

// =============================================================================
// RANDOM FOREST
// =============================================================================

/// Artifact tag written into every classifier file.
pub const RANDOM_FOREST_FORMAT: &str = "trialcast.random_forest";

/// A soft-voting ensemble of decision trees.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RandomForest {
    pub format: String,
    pub version: u32,
    pub fixed_point_scale: i64,
    pub n_features: usize,
    pub trees: Vec<DecisionTree>,
}

impl RandomForest {
    /// Build a forest from trees (current format version).
    #[must_use]
    pub fn new(n_features: usize, trees: Vec<DecisionTree>) -> Self {
        Self {
            format: RANDOM_FOREST_FORMAT.to_string(),
            version: crate::formats::ARTIFACT_VERSION,
            fixed_point_scale: FIXED_POINT_SCALE,
            n_features,
            trees,
        }
    }

    /// Number of trees.
    #[must_use]
    pub fn len(&self) -> usize {
        self.trees.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }

    /// Total node count across all trees.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.trees.iter().map(|t| t.nodes.len()).sum()
    }

    /// Check every tree against `n_features` and the size bounds.
    pub fn validate(&self) -> Result<(), PredictionError> {
        if self.trees.is_empty() || self.trees.len() > MAX_TREES {
            return Err(PredictionError::EmptyForest);
        }
        for (index, tree) in self.trees.iter().enumerate() {
            tree.validate(index, self.n_features)?;
        }
        Ok(())
    }
}

impl RandomForest {
    /// Summed per-tree estimates, before averaging.
    fn vote(&self, features: &FeatureVector) -> Result<(u64, u64), PredictionError> {
        if features.len() != self.n_features {
            return Err(PredictionError::FeatureCountMismatch {
                expected: self.n_features,
                actual: features.len(),
            });
        }
        if self.trees.is_empty() {
            return Err(PredictionError::EmptyForest);
        }

        let mut failure: u64 = 0;
        let mut success: u64 = 0;
        for (index, tree) in self.trees.iter().enumerate() {
            let proba = tree.predict_proba(index, features)?;
            failure = failure.saturating_add(proba.failure_millionths);
            success = success.saturating_add(proba.success_millionths);
        }
        Ok((failure, success))
    }
}

impl Classifier for RandomForest {
    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict_proba(&self, features: &FeatureVector) -> Result<ClassProbabilities, PredictionError> {
        let (failure, success) = self.vote(features)?;
        let n = self.trees.len() as u64;
        Ok(ClassProbabilities {
            failure_millionths: failure / n,
            success_millionths: success / n,
        })
    }

    /// Compares the summed votes so averaging cannot turn a win into a tie.
    fn predict(&self, features: &FeatureVector) -> Result<Label, PredictionError> {
        let (failure, success) = self.vote(features)?;
        Ok(Label::from(success > failure))
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const S: i64 = FIXED_POINT_SCALE;

    fn leaf(failures: u64, successes: u64) -> TreeNode {
        TreeNode::Leaf {
            counts: [failures, successes],
        }
    }

    fn split(feature: usize, threshold_q: i64, left: usize, right: usize) -> TreeNode {
        TreeNode::Split {
            feature,
            threshold_q,
            left,
            right,
        }
    }

    /// Feature 0 is an indicator; feature 1 a count.
    fn stump_forest() -> RandomForest {
        RandomForest::new(
            2,
            vec![
                DecisionTree::new(vec![split(0, S / 2, 1, 2), leaf(8, 2), leaf(1, 9)]),
                DecisionTree::new(vec![split(1, 100 * S, 1, 2), leaf(3, 1), leaf(1, 3)]),
            ],
        )
    }

    #[test]
    fn threshold_is_inclusive_on_the_left() {
        let tree = DecisionTree::new(vec![split(0, 10, 1, 2), leaf(1, 0), leaf(0, 1)]);
        let at = FeatureVector::new(vec![10]);
        let above = FeatureVector::new(vec![11]);
        assert_eq!(tree.apply(0, &at), Ok(1));
        assert_eq!(tree.apply(0, &above), Ok(2));
    }

    #[test]
    fn leaf_probabilities_in_millionths() {
        let tree = DecisionTree::new(vec![leaf(1, 3)]);
        let proba = tree.predict_proba(0, &FeatureVector::new(vec![])).unwrap();
        assert_eq!(proba.failure_millionths, 250_000);
        assert_eq!(proba.success_millionths, 750_000);
    }

    #[test]
    fn forest_averages_tree_estimates() {
        let forest = stump_forest();
        // Indicator on, count above 100: 0.9 and 0.75 success.
        let features = FeatureVector::new(vec![S, 150 * S]);
        let proba = forest.predict_proba(&features).unwrap();
        assert_eq!(proba.success_millionths, 825_000);
        assert_eq!(proba.failure_millionths, 175_000);
        assert_eq!(forest.predict(&features), Ok(Label::Success));
    }

    #[test]
    fn forest_predicts_failure() {
        let forest = stump_forest();
        let features = FeatureVector::new(vec![0, 10 * S]);
        assert_eq!(forest.predict(&features), Ok(Label::Failure));
    }

    #[test]
    fn tie_resolves_to_failure() {
        let forest = RandomForest::new(1, vec![DecisionTree::new(vec![leaf(5, 5)])]);
        let features = FeatureVector::new(vec![0]);
        assert_eq!(forest.predict(&features), Ok(Label::Failure));
        assert_eq!(forest.predict_proba(&features).unwrap().label(), Label::Failure);
    }

    #[test]
    fn summed_votes_decide_narrow_wins() {
        // Sums are 1_499_998 against 1_499_999; the averages truncate to a tie.
        let forest = RandomForest::new(
            1,
            vec![
                DecisionTree::new(vec![leaf(1, 5)]),
                DecisionTree::new(vec![leaf(2, 1)]),
                DecisionTree::new(vec![leaf(2, 1)]),
            ],
        );
        let features = FeatureVector::new(vec![0]);
        let proba = forest.predict_proba(&features).unwrap();
        assert_eq!(proba.failure_millionths, 499_999);
        assert_eq!(proba.success_millionths, 499_999);
        assert_eq!(forest.predict(&features), Ok(Label::Success));
    }

    #[test]
    fn wrong_width_is_prediction_error() {
        let forest = stump_forest();
        let features = FeatureVector::new(vec![0, 0, 0]);
        assert_eq!(
            forest.predict(&features),
            Err(PredictionError::FeatureCountMismatch {
                expected: 2,
                actual: 3
            })
        );
    }

    #[test]
    fn empty_forest_errors() {
        let forest = RandomForest::new(1, vec![]);
        assert_eq!(forest.validate(), Err(PredictionError::EmptyForest));
        assert_eq!(
            forest.predict(&FeatureVector::new(vec![0])),
            Err(PredictionError::EmptyForest)
        );
    }

    #[test]
    fn validate_rejects_backward_child() {
        let forest = RandomForest::new(
            1,
            vec![DecisionTree::new(vec![leaf(1, 1), split(0, 0, 0, 0)])],
        );
        assert_eq!(
            forest.validate(),
            Err(PredictionError::MalformedTree { tree: 0, node: 1 })
        );
    }

    #[test]
    fn validate_rejects_out_of_range_feature() {
        let forest = RandomForest::new(
            1,
            vec![DecisionTree::new(vec![split(3, 0, 1, 2), leaf(1, 0), leaf(0, 1)])],
        );
        assert!(matches!(
            forest.validate(),
            Err(PredictionError::MalformedTree { .. })
        ));
    }

    #[test]
    fn validate_rejects_empty_leaf() {
        let forest = RandomForest::new(1, vec![DecisionTree::new(vec![leaf(0, 0)])]);
        assert_eq!(
            forest.validate(),
            Err(PredictionError::EmptyLeaf { tree: 0, node: 0 })
        );
    }

    #[test]
    fn validate_accepts_stumps() {
        assert_eq!(stump_forest().validate(), Ok(()));
    }

    #[test]
    fn unvalidated_cycle_terminates() {
        let tree = DecisionTree::new(vec![split(0, 0, 0, 0)]);
        assert!(tree.apply(0, &FeatureVector::new(vec![0])).is_err());
    }

    #[test]
    fn node_json_shape() {
        let json = r#"[{"split":{"feature":0,"threshold_q":2048,"left":1,"right":2}},
                       {"leaf":{"counts":[3,1]}},{"leaf":{"counts":[0,4]}}]"#;
        let nodes: Vec<TreeNode> = serde_json::from_str(json).unwrap();
        assert_eq!(nodes[0], split(0, 2048, 1, 2));
        assert_eq!(nodes[1], leaf(3, 1));
    }
}
