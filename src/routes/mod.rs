pub mod courses;
pub mod exams;
pub mod health;
pub mod weak_points;

use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Json, Router};

use crate::middleware::{rate_limit, request_id};
use crate::response::ErrorBody;
use crate::state::AppState;

/// Maximum request body size: 2 MiB.
const MAX_BODY_SIZE: usize = 2 * 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .nest("/exams", exams::router())
        .nest("/weak-points", weak_points::router())
        .nest("/admin", courses::admin_router())
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            rate_limit::rate_limit_middleware,
        ))
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE));

    Router::new()
        .nest("/api", api_routes)
        .nest("/health", health::router())
        .fallback(fallback_404)
        .layer(axum::middleware::from_fn(request_id::request_id_middleware))
        .with_state(state)
}

async fn fallback_404() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorBody {
            success: false,
            code: "NOT_FOUND".to_string(),
            message: "Not found".to_string(),
            trace_id: None,
        }),
    )
}
