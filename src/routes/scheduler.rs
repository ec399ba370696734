use crate::AppState;
use crate::db::models::{ApiResponse, AuthUser};
use crate::error::AppError;
use crate::scheduler::JobKind;
use crate::services::context::RequestContext;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use std::sync::Arc;

pub async fn get_status(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> impl IntoResponse {
    if let Err(err) = RequestContext::from(&user).require_cycle_admin() {
        return err.into_response();
    }
    let response = ApiResponse::success(state.scheduler.status(), "Scheduler status");
    (StatusCode::OK, Json(response)).into_response()
}

/// Runs one sweep immediately.
pub async fn run_job(
    State(state): State<Arc<AppState>>,
    Path(job): Path<String>,
    user: AuthUser,
) -> impl IntoResponse {
    if let Err(err) = RequestContext::from(&user).require_cycle_admin() {
        return err.into_response();
    }
    let Some(kind) = JobKind::parse(&job) else {
        return AppError::not_found("job").into_response();
    };
    match state.scheduler.run_once(kind).await {
        Ok(report) => {
            let response = ApiResponse::success(report, "Sweep finished");
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(err) => err.into_response(),
    }
}
