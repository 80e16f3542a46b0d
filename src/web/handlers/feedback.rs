// POST /check-feedback — decide whether a piece of feedback is offensive.
//
// Request:  { "content": "<text>" }   (content optional, defaults to "")
// Response: { "offensive": true|false }
//
// Malformed bodies get the JSON extractor's 4xx status. A classifier error
// is 500 and a timeout is 504; neither ever answers `offensive: false`.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::moderation::{self, ModerationError};
use crate::web::{api_error, AppState};

#[derive(Debug, Deserialize)]
pub struct FeedbackRequest {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct FeedbackResponse {
    pub offensive: bool,
}

pub async fn check_feedback(
    State(state): State<AppState>,
    body: Result<Json<FeedbackRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match body {
        Ok(body) => body,
        Err(rejection) => {
            warn!(
                status = %rejection.status(),
                error = %rejection.body_text(),
                "Rejected feedback request"
            );
            return api_error(rejection.status(), &rejection.body_text());
        }
    };

    let content = request.content.unwrap_or_default();

    match moderation::check(state.classifier.as_ref(), &content, state.classify_timeout).await {
        Ok(verdict) => {
            debug!(
                offensive = verdict.offensive,
                content_chars = content.chars().count(),
                "Feedback checked"
            );
            Json(FeedbackResponse {
                offensive: verdict.offensive,
            })
            .into_response()
        }
        Err(e @ ModerationError::Timeout(_)) => {
            error!(backend = state.classifier.name(), error = %e, "Feedback check timed out");
            api_error(StatusCode::GATEWAY_TIMEOUT, "classification timed out")
        }
        Err(e @ ModerationError::Classifier(_)) => {
            error!(backend = state.classifier.name(), error = %e, "Feedback check failed");
            api_error(StatusCode::INTERNAL_SERVER_ERROR, "classification failed")
        }
    }
}
