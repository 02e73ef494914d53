use axum::extract::{Path, State};
use axum::routing::get;
use axum::Router;

use crate::auth::AuthUser;
use crate::response::{ok, AppError};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_weak_points))
        .route("/:subject_id", get(list_subject_weak_points))
}

/// All of the caller's weak points, weakest topic first.
async fn list_weak_points(
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let points = state.store().list_weak_points(&auth.user_id)?;
    Ok(ok(points))
}

async fn list_subject_weak_points(
    auth: AuthUser,
    Path(subject_id): Path<String>,
    State(state): State<AppState>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let points = state
        .store()
        .list_subject_weak_points(&auth.user_id, &subject_id)?;
    Ok(ok(points))
}
