//! # API Module
//!
//! HTTP surface for the predictor.
//!
//! | Method | Path           | Body                | Response            |
//! |--------|----------------|---------------------|---------------------|
//! | GET    | `/`            | -                   | form page           |
//! | POST   | `/`            | urlencoded form     | form page + block   |
//! | POST   | `/api/predict` | JSON [`TrialForm`]  | [`types::PredictResponse`] |
//! | GET    | `/api/schema`  | -                   | [`types::SchemaResponse`]  |
//! | GET    | `/health`      | -                   | [`types::HealthResponse`]  |
//!
//! Artifacts are loaded before the router is built and shared read-only
//! through [`AppState`].

mod handlers;
pub mod page;
pub mod types;

use axum::Router;
use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use trialcast_core::{
    ArtifactBundle, InputError, PredictError, Prediction, TrialForm, TrialRecord,
};

/// Shared state for all handlers.
#[derive(Clone)]
pub struct AppState {
    bundle: Arc<ArtifactBundle>,
    limiter: Option<Arc<DefaultDirectRateLimiter>>,
}

impl AppState {
    pub fn new(bundle: ArtifactBundle) -> Self {
        Self {
            bundle: Arc::new(bundle),
            limiter: None,
        }
    }

    /// Limit all routes to `per_second` requests. Zero disables the limit.
    #[must_use]
    pub fn with_rate_limit(mut self, per_second: u32) -> Self {
        self.limiter = NonZeroU32::new(per_second)
            .map(|n| Arc::new(RateLimiter::direct(Quota::per_second(n))));
        self
    }

    pub fn bundle(&self) -> &ArtifactBundle {
        &self.bundle
    }
}

/// Build the router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::form_page).post(handlers::submit_form))
        .route("/api/predict", post(handlers::predict))
        .route("/api/schema", get(handlers::schema))
        .route("/health", get(handlers::health))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(middleware::from_fn_with_state(state.clone(), rate_limit)),
        )
        .with_state(state)
}

async fn rate_limit(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if let Some(limiter) = &state.limiter {
        if limiter.check().is_err() {
            tracing::warn!(path = %request.uri().path(), "rate limit exceeded");
            return (StatusCode::TOO_MANY_REQUESTS, "rate limit exceeded").into_response();
        }
    }
    next.run(request).await
}

/// Where a submission ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// A field failed validation; the model was not consulted.
    Rejected(InputError),
    /// The preprocessor or classifier raised a recoverable error.
    Failed(PredictError),
    Predicted(Prediction),
}

/// Validate a raw form and run it through the adapter.
pub fn evaluate(bundle: &ArtifactBundle, form: &TrialForm) -> Outcome {
    let record = match TrialRecord::try_from(form) {
        Ok(record) => record,
        Err(err) => return Outcome::Rejected(err),
    };
    match bundle.adapter().predict_detailed(&record) {
        Ok(prediction) => Outcome::Predicted(prediction),
        Err(err) => Outcome::Failed(err),
    }
}
