//! # Primitives
//!
//! Constants shared by the encoder, the classifier and the artifact loader.

/// Fixed-point scale: the integer 4096 represents 1.0.
///
/// Every feature value and every split threshold is expressed in this scale.
pub const FIXED_POINT_SCALE: i64 = 4096;

/// Probabilities are reported as integer millionths (1_000_000 = certain).
pub const PROBABILITY_UNIT: u64 = 1_000_000;

/// Smallest accepted enrollment (participants).
pub const MIN_ENROLLMENT: u32 = 1;

/// Smallest accepted trial duration (days).
pub const MIN_DURATION: u32 = 1;

/// Upper bound on trees accepted from a classifier artifact.
pub const MAX_TREES: usize = 4096;

/// Upper bound on nodes per tree accepted from a classifier artifact.
pub const MAX_NODES_PER_TREE: usize = 1 << 20;

/// Upper bound on features a preprocessor artifact may produce.
pub const MAX_FEATURES: usize = 1 << 16;
