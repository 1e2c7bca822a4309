//! Command implementations.

use crate::AppError;
use crate::api::types::PredictResponse;
use crate::api::{AppState, Outcome, create_router, evaluate};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tracing::{error, info};
use trialcast_core::formats::{
    ArtifactFormat, ArtifactKind, ArtifactSummary, decode, encode_binary, read_artifact_bytes,
};
use trialcast_core::preprocess::PREPROCESSOR_FORMAT;
use trialcast_core::forest::RANDOM_FOREST_FORMAT;
use trialcast_core::{
    ArtifactBundle, ArtifactError, Prediction, Preprocessor, RandomForest, TrialForm, render,
};

/// Settings for `serve`.
#[derive(Debug, Clone)]
pub struct ServeConfig {
    pub bind: SocketAddr,
    pub artifacts: PathBuf,
    pub rate_limit: u32,
}

/// Load the artifacts, build the router, and serve until Ctrl-C.
pub async fn cmd_serve(config: ServeConfig) -> Result<(), AppError> {
    let bundle = ArtifactBundle::load_dir(&config.artifacts).inspect_err(|e| {
        error!(artifacts = %config.artifacts.display(), error = %e, "failed to load artifacts");
    })?;
    let summary = bundle.summary();
    info!(
        features = summary.feature_width,
        trees = summary.trees,
        "artifacts loaded"
    );

    let state = AppState::new(bundle).with_rate_limit(config.rate_limit);
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    info!(addr = %config.bind, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for shutdown signal");
    }
}

/// Predict one trial. Prints the verdict line, or the JSON body with `json`.
pub fn cmd_predict(artifacts: &Path, form: &TrialForm, json: bool) -> Result<Prediction, AppError> {
    let bundle = ArtifactBundle::load_dir(artifacts)?;
    let prediction = match evaluate(&bundle, form) {
        Outcome::Predicted(prediction) => prediction,
        Outcome::Rejected(err) => return Err(err.into()),
        Outcome::Failed(err) => return Err(err.into()),
    };

    if json {
        let body = serde_json::to_string_pretty(&PredictResponse::from(&prediction))
            .map_err(|e| AppError::Usage(e.to_string()))?;
        println!("{body}");
    } else {
        println!("{}", render(prediction.label).to_text());
    }
    Ok(prediction)
}

/// Load both artifacts and report what they contain.
pub fn cmd_check(artifacts: &Path, json: bool) -> Result<ArtifactSummary, AppError> {
    let summary = ArtifactBundle::load_dir(artifacts)?.summary();

    if json {
        let body =
            serde_json::to_string_pretty(&summary).map_err(|e| AppError::Usage(e.to_string()))?;
        println!("{body}");
    } else {
        println!("Artifacts OK");
        println!("  Columns:  {}", summary.columns.join(", "));
        println!("  Features: {}", summary.feature_width);
        println!("  Trees:    {}", summary.trees);
        println!("  Nodes:    {}", summary.nodes);
    }
    Ok(summary)
}

#[derive(Deserialize)]
struct FormatTag {
    format: String,
}

/// Re-encode a JSON artifact in the binary envelope.
///
/// The artifact kind is taken from its `format` field; the artifact is fully
/// validated before anything is written.
pub fn cmd_pack(input: &Path, output: &Path) -> Result<ArtifactKind, AppError> {
    if ArtifactFormat::from_path(input) != ArtifactFormat::Json {
        return Err(AppError::Usage(format!(
            "pack expects a .json artifact, got {}",
            input.display()
        )));
    }
    let bytes = read_artifact_bytes(input)?;
    let tag: FormatTag = serde_json::from_slice(&bytes).map_err(|e| ArtifactError::Corrupt {
        path: input.to_path_buf(),
        reason: e.to_string(),
    })?;

    let (kind, packed) = match tag.format.as_str() {
        PREPROCESSOR_FORMAT => {
            let artifact: Preprocessor = decode(&bytes, ArtifactFormat::Json, input)?;
            (ArtifactKind::Preprocessor, encode_binary(&artifact)?)
        }
        RANDOM_FOREST_FORMAT => {
            let artifact: RandomForest = decode(&bytes, ArtifactFormat::Json, input)?;
            (ArtifactKind::RandomForest, encode_binary(&artifact)?)
        }
        other => {
            return Err(AppError::Usage(format!("unknown artifact format {other:?}")));
        }
    };

    std::fs::write(output, &packed).map_err(|source| AppError::Write {
        path: output.to_path_buf(),
        source,
    })?;
    println!(
        "Packed {} artifact: {} -> {} ({} bytes)",
        kind.name(),
        input.display(),
        output.display(),
        packed.len()
    );
    Ok(kind)
}
