//! Route handlers.

use super::page::{Notice, initial_form, render_page};
use super::types::{ErrorResponse, HealthResponse, PredictResponse, SchemaResponse};
use super::{AppState, Outcome, evaluate};
use axum::Form;
use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use tracing::{info, warn};
use trialcast_core::{TrialForm, render, render_error};

pub(super) async fn form_page() -> Html<String> {
    Html(render_page(&initial_form(), None))
}

/// Always answers 200; problems are shown on the page.
pub(super) async fn submit_form(
    State(state): State<AppState>,
    Form(form): Form<TrialForm>,
) -> Html<String> {
    let notice = match evaluate(state.bundle(), &form) {
        Outcome::Predicted(prediction) => {
            info!(label = prediction.label.as_class(), "prediction served");
            Notice::Message(render(prediction.label))
        }
        Outcome::Failed(err) => {
            warn!(kind = err.kind(), error = %err, "prediction failed");
            Notice::Message(render_error(&err))
        }
        Outcome::Rejected(err) => {
            info!(field = err.field(), error = %err, "submission rejected");
            Notice::Invalid(err)
        }
    };
    Html(render_page(&form, Some(&notice)))
}

pub(super) async fn predict(
    State(state): State<AppState>,
    payload: Result<Json<TrialForm>, JsonRejection>,
) -> Response {
    let form = match payload {
        Ok(Json(form)) => form,
        Err(rejection) => {
            info!(status = %rejection.status(), "unreadable prediction body");
            let body = ErrorResponse {
                error: rejection.body_text(),
                field: None,
                kind: None,
            };
            return (rejection.status(), Json(body)).into_response();
        }
    };
    match evaluate(state.bundle(), &form) {
        Outcome::Predicted(prediction) => {
            info!(label = prediction.label.as_class(), "prediction served");
            Json(PredictResponse::from(&prediction)).into_response()
        }
        Outcome::Failed(err) => {
            warn!(kind = err.kind(), error = %err, "prediction failed");
            (StatusCode::UNPROCESSABLE_ENTITY, Json(ErrorResponse::from(&err))).into_response()
        }
        Outcome::Rejected(err) => {
            info!(field = err.field(), error = %err, "submission rejected");
            (StatusCode::UNPROCESSABLE_ENTITY, Json(ErrorResponse::from(&err))).into_response()
        }
    }
}

pub(super) async fn schema() -> Json<SchemaResponse> {
    Json(SchemaResponse::current())
}

pub(super) async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
