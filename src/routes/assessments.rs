use crate::AppState;
use crate::db::models::{ApiResponse, AuthUser};
use crate::services::{
    ProgressService, RespondentsService, ResponsesService,
    context::RequestContext,
    responses_service::RecordResponse,
};
use crate::validation::ValidatedJson;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RecordResponseRequest {
    pub question_id: Uuid,
    pub score: i32,
    #[validate(length(max = 2000, message = "Comment must be at most 2000 characters"))]
    pub comment: Option<String>,
}

/// Assessments the caller has to fill in, across running cycles.
pub async fn list_assessments(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> impl IntoResponse {
    let ctx = RequestContext::from(&user);
    match RespondentsService::list_assessments(state.store.as_ref(), &ctx) {
        Ok(list) => {
            let response = ApiResponse::success(list, "Assessments retrieved successfully");
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(err) => err.into_response(),
    }
}

pub async fn start_assessment(
    State(state): State<Arc<AppState>>,
    Path(respondent_id): Path<Uuid>,
    user: AuthUser,
) -> impl IntoResponse {
    let ctx = RequestContext::from(&user);
    match RespondentsService::start(state.store.as_ref(), &ctx, respondent_id) {
        Ok(outcome) => {
            let response = ApiResponse::success(outcome, "Assessment started");
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(err) => err.into_response(),
    }
}

pub async fn get_questions(
    State(state): State<Arc<AppState>>,
    Path(respondent_id): Path<Uuid>,
    user: AuthUser,
) -> impl IntoResponse {
    let ctx = RequestContext::from(&user);
    match RespondentsService::list_questions(state.store.as_ref(), &ctx, respondent_id) {
        Ok(questions) => {
            let response = ApiResponse::success(questions, "Questions retrieved successfully");
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(err) => err.into_response(),
    }
}

pub async fn record_response(
    State(state): State<Arc<AppState>>,
    Path(respondent_id): Path<Uuid>,
    user: AuthUser,
    ValidatedJson(payload): ValidatedJson<RecordResponseRequest>,
) -> impl IntoResponse {
    let ctx = RequestContext::from(&user);
    let req = RecordResponse {
        question_id: payload.question_id,
        score: payload.score,
        comment: payload.comment,
    };
    match ResponsesService::record(state.store.as_ref(), &ctx, respondent_id, &req) {
        Ok(saved) => {
            let response = ApiResponse::success(saved, "Response saved");
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(err) => err.into_response(),
    }
}

pub async fn get_progress(
    State(state): State<Arc<AppState>>,
    Path(respondent_id): Path<Uuid>,
    user: AuthUser,
) -> impl IntoResponse {
    let ctx = RequestContext::from(&user);
    match ProgressService::get_progress(state.store.as_ref(), &ctx, respondent_id) {
        Ok(progress) => {
            let response = ApiResponse::success(progress, "Progress retrieved successfully");
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(err) => err.into_response(),
    }
}

pub async fn complete_assessment(
    State(state): State<Arc<AppState>>,
    Path(respondent_id): Path<Uuid>,
    user: AuthUser,
) -> impl IntoResponse {
    let ctx = RequestContext::from(&user);
    match RespondentsService::complete(state.store.as_ref(), &state.cascade, &ctx, respondent_id).await {
        Ok(outcome) => {
            let response = ApiResponse::success(outcome, "Assessment completed");
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(err) => err.into_response(),
    }
}
