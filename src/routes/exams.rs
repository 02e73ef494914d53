use axum::extract::State;
use axum::routing::post;
use axum::Router;
use serde::{Deserialize, Serialize};

use crate::auth::AuthUser;
use crate::constants::MAX_EXAM_BATCH_SIZE;
use crate::extractors::JsonBody;
use crate::progress::weak_points::QuestionOutcome;
use crate::response::{ok, AppError};
use crate::state::AppState;
use crate::store::operations::weak_points::WeakPoint;
use crate::subjects;

pub fn router() -> Router<AppState> {
    Router::new().route("/complete", post(complete_exam))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CompleteExamRequest {
    subject_id: String,
    results: Vec<QuestionOutcome>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CompleteExamResponse {
    subject_id: String,
    subject_name: String,
    topics_updated: usize,
    weak_points: Vec<WeakPoint>,
}

/// Fold one completed exam attempt into the caller's weak points. The raw
/// attempt itself is persisted by the exam service before it calls here;
/// each attempt must be submitted exactly once.
async fn complete_exam(
    auth: AuthUser,
    State(state): State<AppState>,
    JsonBody(req): JsonBody<CompleteExamRequest>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    if req.results.len() > MAX_EXAM_BATCH_SIZE {
        return Err(AppError::bad_request(
            "BATCH_TOO_LARGE",
            &format!("An exam submission may contain at most {MAX_EXAM_BATCH_SIZE} questions"),
        ));
    }

    let subject_name = subjects::subject_name(&req.subject_id).ok_or_else(|| {
        AppError::bad_request(
            "UNKNOWN_SUBJECT",
            &format!("'{}' is not a known CPL subject", req.subject_id),
        )
    })?;

    let weak_points = state.store().record_exam_result(
        &auth.user_id,
        &req.subject_id,
        subject_name,
        &req.results,
    )?;

    tracing::info!(
        user_id = %auth.user_id,
        subject_id = %req.subject_id,
        questions = req.results.len(),
        topics = weak_points.len(),
        "Exam attempt folded into weak points"
    );

    Ok(ok(CompleteExamResponse {
        subject_id: req.subject_id,
        subject_name: subject_name.to_string(),
        topics_updated: weak_points.len(),
        weak_points,
    }))
}
