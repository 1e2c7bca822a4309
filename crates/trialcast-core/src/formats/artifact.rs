//! Artifact decoding, encoding and startup loading.
//!
//! Binary layout:
//!
//! ```text
//! ┌──────────┬─────────┬──────┬──────────────────────────┐
//! │ "TCAF"   │ version │ kind │ postcard(artifact)       │
//! │ 4 bytes  │ u8      │ u8   │ rest of file             │
//! └──────────┴─────────┴──────┴──────────────────────────┘
//! ```

use crate::adapter::PredictionAdapter;
use crate::forest::{Classifier, RANDOM_FOREST_FORMAT, RandomForest};
use crate::preprocess::{FeatureEncoder, PREPROCESSOR_FORMAT, Preprocessor};
use crate::primitives::FIXED_POINT_SCALE;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

// =============================================================================
// CONSTANTS
// =============================================================================

/// Version carried inside every artifact (JSON and binary).
pub const ARTIFACT_VERSION: u32 = 1;

/// Magic bytes opening a binary artifact.
pub const MAGIC: [u8; 4] = *b"TCAF";

/// Version of the binary envelope.
pub const BINARY_VERSION: u8 = 1;

const HEADER_LEN: usize = MAGIC.len() + 2;

/// Preprocessor location, relative to the artifacts directory.
pub const PREPROCESSOR_FILE: &str = "model/preprocessor.json";

/// Classifier location, relative to the artifacts directory.
pub const CLASSIFIER_FILE: &str = "model/random_forest.json";

/// Packed preprocessor, used when the JSON file is absent.
pub const PREPROCESSOR_BINARY_FILE: &str = "model/preprocessor.bin";

/// Packed classifier, used when the JSON file is absent.
pub const CLASSIFIER_BINARY_FILE: &str = "model/random_forest.bin";

// =============================================================================
// ERRORS
// =============================================================================

/// Fatal startup failure: an artifact could not be turned into a usable model.
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("artifact not found: {}", path.display())]
    Missing { path: PathBuf },

    #[error("failed to read artifact {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt artifact {}: {reason}", path.display())]
    Corrupt { path: PathBuf, reason: String },

    #[error("artifacts are incompatible: {reason}")]
    Incompatible { reason: String },

    #[error("failed to encode artifact: {reason}")]
    Encode { reason: String },
}

impl ArtifactError {
    fn corrupt(path: &Path, reason: impl Into<String>) -> Self {
        Self::Corrupt {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }
}

// =============================================================================
// ARTIFACT TRAIT
// =============================================================================

/// Which artifact a binary file holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ArtifactKind {
    Preprocessor = 1,
    RandomForest = 2,
}

impl ArtifactKind {
    fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            1 => Some(Self::Preprocessor),
            2 => Some(Self::RandomForest),
            _ => None,
        }
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Preprocessor => "preprocessor",
            Self::RandomForest => "random forest",
        }
    }
}

/// A fitted artifact that can be stored and checked.
pub trait Artifact: Serialize + DeserializeOwned {
    const KIND: ArtifactKind;
    const FORMAT: &'static str;

    /// `(format, version, fixed_point_scale)` as stored.
    fn header(&self) -> (&str, u32, i64);

    /// Structural validation after decoding.
    fn check(&self) -> Result<(), String>;
}

impl Artifact for Preprocessor {
    const KIND: ArtifactKind = ArtifactKind::Preprocessor;
    const FORMAT: &'static str = PREPROCESSOR_FORMAT;

    fn header(&self) -> (&str, u32, i64) {
        (self.format.as_str(), self.version, self.fixed_point_scale)
    }

    fn check(&self) -> Result<(), String> {
        self.validate()
    }
}

impl Artifact for RandomForest {
    const KIND: ArtifactKind = ArtifactKind::RandomForest;
    const FORMAT: &'static str = RANDOM_FOREST_FORMAT;

    fn header(&self) -> (&str, u32, i64) {
        (self.format.as_str(), self.version, self.fixed_point_scale)
    }

    fn check(&self) -> Result<(), String> {
        self.validate().map_err(|e| e.to_string())
    }
}

// =============================================================================
// ENCODING
// =============================================================================

/// Storage encoding, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactFormat {
    Json,
    Binary,
}

impl ArtifactFormat {
    /// `.json` is JSON; anything else is binary.
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Binary,
        }
    }
}

/// Encode an artifact as pretty JSON.
pub fn encode_json<A: Artifact>(artifact: &A) -> Result<Vec<u8>, ArtifactError> {
    serde_json::to_vec_pretty(artifact).map_err(|e| ArtifactError::Encode {
        reason: e.to_string(),
    })
}

/// Encode an artifact in the binary envelope.
pub fn encode_binary<A: Artifact>(artifact: &A) -> Result<Vec<u8>, ArtifactError> {
    let payload = postcard::to_allocvec(artifact).map_err(|e| ArtifactError::Encode {
        reason: e.to_string(),
    })?;
    let mut out = Vec::with_capacity(HEADER_LEN + payload.len());
    out.extend_from_slice(&MAGIC);
    out.push(BINARY_VERSION);
    out.push(A::KIND as u8);
    out.extend_from_slice(&payload);
    Ok(out)
}

/// Decode and validate an artifact. `path` is only used in error messages.
pub fn decode<A: Artifact>(
    bytes: &[u8],
    format: ArtifactFormat,
    path: &Path,
) -> Result<A, ArtifactError> {
    let artifact: A = match format {
        ArtifactFormat::Json => {
            serde_json::from_slice(bytes).map_err(|e| ArtifactError::corrupt(path, e.to_string()))?
        }
        ArtifactFormat::Binary => decode_binary(bytes, path)?,
    };

    let (format_tag, version, scale) = artifact.header();
    if format_tag != A::FORMAT {
        return Err(ArtifactError::corrupt(
            path,
            format!("expected format {:?}, found {:?}", A::FORMAT, format_tag),
        ));
    }
    if version != ARTIFACT_VERSION {
        return Err(ArtifactError::corrupt(
            path,
            format!("unsupported artifact version {version} (expected {ARTIFACT_VERSION})"),
        ));
    }
    if scale != FIXED_POINT_SCALE {
        return Err(ArtifactError::corrupt(
            path,
            format!("fixed-point scale {scale} does not match {FIXED_POINT_SCALE}"),
        ));
    }
    artifact
        .check()
        .map_err(|reason| ArtifactError::corrupt(path, reason))?;
    Ok(artifact)
}

fn decode_binary<A: Artifact>(bytes: &[u8], path: &Path) -> Result<A, ArtifactError> {
    if bytes.len() < HEADER_LEN || bytes[..MAGIC.len()] != MAGIC {
        return Err(ArtifactError::corrupt(path, "missing TCAF header"));
    }
    let version = bytes[MAGIC.len()];
    if version != BINARY_VERSION {
        return Err(ArtifactError::corrupt(
            path,
            format!("unsupported binary version {version}"),
        ));
    }
    match ArtifactKind::from_byte(bytes[MAGIC.len() + 1]) {
        Some(kind) if kind == A::KIND => {}
        Some(kind) => {
            return Err(ArtifactError::corrupt(
                path,
                format!("expected {} artifact, found {}", A::KIND.name(), kind.name()),
            ));
        }
        None => return Err(ArtifactError::corrupt(path, "unknown artifact kind")),
    }
    postcard::from_bytes(&bytes[HEADER_LEN..]).map_err(|e| ArtifactError::corrupt(path, e.to_string()))
}

/// Read an artifact file whole, mapping a missing file to `Missing`.
pub fn read_artifact_bytes(path: &Path) -> Result<Vec<u8>, ArtifactError> {
    std::fs::read(path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            ArtifactError::Missing {
                path: path.to_path_buf(),
            }
        } else {
            ArtifactError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    })
}

/// Read and decode one artifact file.
pub fn load<A: Artifact>(path: &Path) -> Result<A, ArtifactError> {
    let bytes = read_artifact_bytes(path)?;
    decode(&bytes, ArtifactFormat::from_path(path), path)
}

// =============================================================================
// BUNDLE
// =============================================================================

/// The two artifacts, loaded and checked against each other.
///
/// Constructed once at startup and only ever borrowed afterwards.
#[derive(Debug, Clone)]
pub struct ArtifactBundle {
    preprocessor: Preprocessor,
    classifier: RandomForest,
}

/// What was loaded, for status output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactSummary {
    pub columns: Vec<String>,
    pub feature_width: usize,
    pub trees: usize,
    pub nodes: usize,
}

impl ArtifactBundle {
    /// Pair two decoded artifacts, checking that their feature widths agree.
    pub fn from_parts(
        preprocessor: Preprocessor,
        classifier: RandomForest,
    ) -> Result<Self, ArtifactError> {
        let width = preprocessor.width();
        let expected = classifier.n_features();
        if width != expected {
            return Err(ArtifactError::Incompatible {
                reason: format!(
                    "preprocessor produces {width} features but the classifier expects {expected}"
                ),
            });
        }
        Ok(Self {
            preprocessor,
            classifier,
        })
    }

    /// Load both artifacts from explicit paths.
    pub fn load_files(preprocessor: &Path, classifier: &Path) -> Result<Self, ArtifactError> {
        let preprocessor = load::<Preprocessor>(preprocessor)?;
        let classifier = load::<RandomForest>(classifier)?;
        Self::from_parts(preprocessor, classifier)
    }

    /// Load both artifacts from their fixed locations under `dir`.
    ///
    /// Each artifact is read from its `.json` file, or from the packed `.bin`
    /// file when no JSON file exists.
    pub fn load_dir(dir: &Path) -> Result<Self, ArtifactError> {
        Self::load_files(
            &locate(dir, PREPROCESSOR_FILE, PREPROCESSOR_BINARY_FILE),
            &locate(dir, CLASSIFIER_FILE, CLASSIFIER_BINARY_FILE),
        )
    }

    #[must_use]
    pub fn preprocessor(&self) -> &Preprocessor {
        &self.preprocessor
    }

    #[must_use]
    pub fn classifier(&self) -> &RandomForest {
        &self.classifier
    }

    /// An adapter borrowing both artifacts.
    #[must_use]
    pub fn adapter(&self) -> PredictionAdapter<'_, Preprocessor, RandomForest> {
        PredictionAdapter::new(&self.preprocessor, &self.classifier)
    }

    #[must_use]
    pub fn summary(&self) -> ArtifactSummary {
        ArtifactSummary {
            columns: self.preprocessor.input_columns().map(String::from).collect(),
            feature_width: self.preprocessor.width(),
            trees: self.classifier.len(),
            nodes: self.classifier.node_count(),
        }
    }
}

/// The JSON path if it exists, else the binary path if that exists, else the
/// JSON path so a missing artifact is reported under its primary name.
fn locate(dir: &Path, json: &str, binary: &str) -> PathBuf {
    let json = dir.join(json);
    if json.exists() {
        return json;
    }
    let binary = dir.join(binary);
    if binary.exists() { binary } else { json }
}

// =============================================================================
// TESTS
// =============================================================================
