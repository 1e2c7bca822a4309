//! # Preprocess Module
//!
//! The fitted feature preprocessor: turns a one-row table into the
//! fixed-point feature vector the classifier was trained on.
//!
//! The encoding itself is data, not code. An exported artifact declares, per
//! column, which encoder kind was fitted and with which learned parameters
//! (categories, mean, inverse standard deviation). This module only applies
//! them; it never re-fits.

use crate::primitives::{FIXED_POINT_SCALE, MAX_FEATURES};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

// =============================================================================
// FEATURE ENCODER TRAIT
// =============================================================================

/// Anything that can turn a [`Row`] into a classifier input.
pub trait FeatureEncoder {
    /// Number of features every successful `transform` produces.
    fn width(&self) -> usize;

    /// Encode one row.
    fn transform(&self, row: &Row) -> Result<FeatureVector, TransformError>;
}

// =============================================================================
// TRANSFORM ERROR
// =============================================================================

/// The row does not fit the encoding the preprocessor was fitted with.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransformError {
    #[error("column {column:?} is missing from the input")]
    MissingColumn { column: String },

    #[error("found unknown category {value:?} in column {column:?} during transform")]
    UnknownCategory { column: String, value: String },

    #[error("column {column:?} expects a number, got {value:?}")]
    NotNumeric { column: String, value: String },

    #[error("value {value} in column {column:?} is out of the encodable range")]
    Overflow { column: String, value: i64 },
}

// =============================================================================
// ROW
// =============================================================================

/// One table cell.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CellValue {
    Int(i64),
    Text(String),
}

impl CellValue {
    /// Canonical text used to match fitted categories.
    #[must_use]
    pub fn canonical(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(value) => write!(f, "{value}"),
            Self::Text(text) => f.write_str(text),
        }
    }
}

/// A single-row table keyed by column name.
///
/// Column lookup is by name, so insertion order does not matter; the
/// preprocessor decides the output order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    cells: BTreeMap<String, CellValue>,
}

impl Row {
    /// Create an empty row.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an integer cell.
    #[must_use]
    pub fn with_int(mut self, column: impl Into<String>, value: i64) -> Self {
        self.cells.insert(column.into(), CellValue::Int(value));
        self
    }

    /// Set a text cell.
    #[must_use]
    pub fn with_text(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.cells.insert(column.into(), CellValue::Text(value.into()));
        self
    }

    /// Remove a column, returning its value.
    pub fn remove(&mut self, column: &str) -> Option<CellValue> {
        self.cells.remove(column)
    }

    #[must_use]
    pub fn get(&self, column: &str) -> Option<&CellValue> {
        self.cells.get(column)
    }

    /// Column names (deterministic order).
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.cells.keys().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

// =============================================================================
// FEATURE VECTOR
// =============================================================================

/// Encoded classifier input, in fixed-point units.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FeatureVector(Vec<i64>);

impl FeatureVector {
    #[must_use]
    pub fn new(values: Vec<i64>) -> Self {
        Self(values)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<i64> {
        self.0.get(index).copied()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[i64] {
        &self.0
    }
}

// =============================================================================
// COLUMN ENCODERS
// =============================================================================

/// What to do with a category the encoder never saw while fitting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandleUnknown {
    /// Fail the transform.
    #[default]
    Error,
    /// Emit an all-zero block.
    Ignore,
}

/// The fitted encoding of one column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Encoding {
    /// One indicator feature per category.
    OneHot {
        categories: Vec<String>,
        #[serde(default)]
        handle_unknown: HandleUnknown,
    },
    /// A single feature holding the category index.
    Ordinal { categories: Vec<String> },
    /// Numeric value copied through.
    Passthrough,
    /// Standardized numeric value: `(x - mean) * std_inv`.
    ///
    /// `mean_q` and `std_inv_q` are in fixed-point units.
    Scaled { mean_q: i64, std_inv_q: i64 },
}

impl Encoding {
    /// Features this encoding contributes.
    #[must_use]
    pub fn width(&self) -> usize {
        match self {
            Self::OneHot { categories, .. } => categories.len(),
            Self::Ordinal { .. } | Self::Passthrough | Self::Scaled { .. } => 1,
        }
    }
}

/// One input column and how it is encoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnEncoder {
    pub column: String,
    pub encoding: Encoding,
}

impl ColumnEncoder {
    #[must_use]
    pub fn new(column: impl Into<String>, encoding: Encoding) -> Self {
        Self {
            column: column.into(),
            encoding,
        }
    }

    /// Append this column's features to `out`.
    fn encode_into(&self, row: &Row, out: &mut Vec<i64>) -> Result<(), TransformError> {
        let cell = row
            .get(&self.column)
            .ok_or_else(|| TransformError::MissingColumn {
                column: self.column.clone(),
            })?;

        match &self.encoding {
            Encoding::OneHot {
                categories,
                handle_unknown,
            } => {
                let value = cell.canonical();
                let hit = categories.iter().position(|c| *c == value);
                if hit.is_none() && *handle_unknown == HandleUnknown::Error {
                    return Err(self.unknown(value));
                }
                out.extend(
                    (0..categories.len())
                        .map(|i| if Some(i) == hit { FIXED_POINT_SCALE } else { 0 }),
                );
            }
            Encoding::Ordinal { categories } => {
                let value = cell.canonical();
                let index = categories
                    .iter()
                    .position(|c| *c == value)
                    .ok_or_else(|| self.unknown(value))?;
                let index = i64::try_from(index).map_err(|_| self.overflow(0))?;
                out.push(self.fixed(index)?);
            }
            Encoding::Passthrough => {
                let value = self.numeric(cell)?;
                out.push(self.fixed(value)?);
            }
            Encoding::Scaled { mean_q, std_inv_q } => {
                let value = self.numeric(cell)?;
                let scaled = self
                    .fixed(value)?
                    .checked_sub(*mean_q)
                    .and_then(|centered| centered.checked_mul(*std_inv_q))
                    .map(|product| product.div_euclid(FIXED_POINT_SCALE))
                    .ok_or_else(|| self.overflow(value))?;
                out.push(scaled);
            }
        }
        Ok(())
    }

    fn numeric(&self, cell: &CellValue) -> Result<i64, TransformError> {
        match cell {
            CellValue::Int(value) => Ok(*value),
            CellValue::Text(text) => Err(TransformError::NotNumeric {
                column: self.column.clone(),
                value: text.clone(),
            }),
        }
    }

    fn fixed(&self, value: i64) -> Result<i64, TransformError> {
        value
            .checked_mul(FIXED_POINT_SCALE)
            .ok_or_else(|| self.overflow(value))
    }

    fn unknown(&self, value: String) -> TransformError {
        TransformError::UnknownCategory {
            column: self.column.clone(),
            value,
        }
    }

    fn overflow(&self, value: i64) -> TransformError {
        TransformError::Overflow {
            column: self.column.clone(),
            value,
        }
    }
}

// =============================================================================
// PREPROCESSOR
// =============================================================================

/// Artifact tag written into every preprocessor file.
pub const PREPROCESSOR_FORMAT: &str = "trialcast.preprocessor";

/// The fitted column transformer.
///
/// Output features are the concatenation of each column's block, in the
/// order the columns are declared. Columns present in the row but not
/// declared here are dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preprocessor {
    pub format: String,
    pub version: u32,
    pub fixed_point_scale: i64,
    pub columns: Vec<ColumnEncoder>,
}

impl Preprocessor {
    /// Build a preprocessor from column encoders (current format version).
    #[must_use]
    pub fn new(columns: Vec<ColumnEncoder>) -> Self {
        Self {
            format: PREPROCESSOR_FORMAT.to_string(),
            version: crate::formats::ARTIFACT_VERSION,
            fixed_point_scale: FIXED_POINT_SCALE,
            columns,
        }
    }

    /// Structural problems that make the artifact unusable, if any.
    pub fn validate(&self) -> Result<(), String> {
        if self.columns.is_empty() {
            return Err("preprocessor declares no columns".to_string());
        }
        let mut seen = std::collections::BTreeSet::new();
        for encoder in &self.columns {
            if !seen.insert(encoder.column.as_str()) {
                return Err(format!("column {:?} is declared twice", encoder.column));
            }
            match &encoder.encoding {
                Encoding::OneHot { categories, .. } | Encoding::Ordinal { categories } => {
                    if categories.is_empty() {
                        return Err(format!("column {:?} has no categories", encoder.column));
                    }
                    let distinct: std::collections::BTreeSet<_> = categories.iter().collect();
                    if distinct.len() != categories.len() {
                        return Err(format!(
                            "column {:?} repeats a category",
                            encoder.column
                        ));
                    }
                }
                Encoding::Scaled { std_inv_q, .. } if *std_inv_q <= 0 => {
                    return Err(format!(
                        "column {:?} has a non-positive inverse std",
                        encoder.column
                    ));
                }
                Encoding::Passthrough | Encoding::Scaled { .. } => {}
            }
        }
        if self.width() > MAX_FEATURES {
            return Err(format!(
                "preprocessor produces {} features (limit {})",
                self.width(),
                MAX_FEATURES
            ));
        }
        Ok(())
    }

    /// Names of the input columns this preprocessor reads.
    pub fn input_columns(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.column.as_str())
    }
}

impl FeatureEncoder for Preprocessor {
    fn width(&self) -> usize {
        self.columns.iter().map(|c| c.encoding.width()).sum()
    }

    fn transform(&self, row: &Row) -> Result<FeatureVector, TransformError> {
        let mut out = Vec::with_capacity(self.width());
        for encoder in &self.columns {
            encoder.encode_into(row, &mut out)?;
        }
        Ok(FeatureVector::new(out))
    }
}

// =============================================================================
// TESTS
// =============================================================================
