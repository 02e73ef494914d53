//! Course-content administration: module and lesson management, including
//! the drag-and-drop lesson move endpoint.

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::Router;
use serde::Deserialize;

use crate::auth::AdminStaff;
use crate::extractors::JsonBody;
use crate::response::{created, ok, AppError};
use crate::state::AppState;

pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/modules", post(create_module))
        .route(
            "/modules/:module_id/lessons",
            get(list_lessons).post(create_lesson),
        )
        .route("/lessons/:lesson_id/move", post(move_lesson))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateModuleRequest {
    title: String,
}

async fn create_module(
    _admin: AdminStaff,
    State(state): State<AppState>,
    JsonBody(req): JsonBody<CreateModuleRequest>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let module = state.store().create_module(&req.title)?;
    Ok(created(module))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateLessonRequest {
    title: String,
}

async fn create_lesson(
    _admin: AdminStaff,
    Path(module_id): Path<String>,
    State(state): State<AppState>,
    JsonBody(req): JsonBody<CreateLessonRequest>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let lesson = state.store().create_lesson(&module_id, &req.title)?;
    Ok(created(lesson))
}

async fn list_lessons(
    _admin: AdminStaff,
    Path(module_id): Path<String>,
    State(state): State<AppState>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    if state.store().get_module(&module_id)?.is_none() {
        return Err(AppError::not_found("module not found"));
    }
    let lessons = state.store().list_module_lessons(&module_id)?;
    Ok(ok(lessons))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MoveLessonRequest {
    target_module_id: String,
    target_order: u32,
}

/// Reposition a lesson, within its module or into another one. The target
/// position comes straight from the admin UI's drop location.
async fn move_lesson(
    admin: AdminStaff,
    Path(lesson_id): Path<String>,
    State(state): State<AppState>,
    JsonBody(req): JsonBody<MoveLessonRequest>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let lesson =
        state
            .store()
            .move_lesson(&lesson_id, &req.target_module_id, req.target_order)?;

    tracing::info!(
        admin_id = %admin.admin_id,
        lesson_id = %lesson.id,
        module_id = %lesson.module_id,
        order = lesson.order,
        "Lesson moved"
    );

    Ok(ok(lesson))
}
