use crate::AppState;
use crate::db::models::{ApiResponse, AuthUser};
use crate::services::{
    CyclesService,
    context::RequestContext,
    cycles_service::CreateCycle,
};
use crate::validation::ValidatedJson;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::NaiveDate;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateCycleRequest {
    #[validate(length(min = 1, max = 255, message = "Cycle name must be between 1 and 255 characters"))]
    pub name: String,
    pub description: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddParticipantsRequest {
    #[validate(length(min = 1, message = "At least one user is required"))]
    pub user_ids: Vec<Uuid>,
}

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddRespondentsRequest {
    #[validate(length(min = 1, message = "At least one respondent is required"))]
    pub respondent_ids: Vec<Uuid>,
}

pub async fn list_cycles(State(state): State<Arc<AppState>>, user: AuthUser) -> impl IntoResponse {
    let ctx = RequestContext::from(&user);
    match CyclesService::list(state.store.as_ref(), &ctx) {
        Ok(cycles) => {
            let response = ApiResponse::success(cycles, "Cycles retrieved successfully");
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(err) => err.into_response(),
    }
}

pub async fn create_cycle(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ValidatedJson(payload): ValidatedJson<CreateCycleRequest>,
) -> impl IntoResponse {
    let ctx = RequestContext::from(&user);
    let req = CreateCycle {
        name: payload.name,
        description: payload.description,
        start_date: payload.start_date,
        end_date: payload.end_date,
    };
    match CyclesService::create(state.store.as_ref(), &ctx, &req) {
        Ok(cycle) => {
            let response = ApiResponse::created(cycle, "Cycle created successfully");
            (StatusCode::CREATED, Json(response)).into_response()
        }
        Err(err) => err.into_response(),
    }
}

pub async fn get_cycle(
    State(state): State<Arc<AppState>>,
    Path(cycle_id): Path<Uuid>,
    user: AuthUser,
) -> impl IntoResponse {
    let ctx = RequestContext::from(&user);
    match CyclesService::get(state.store.as_ref(), &ctx, cycle_id) {
        Ok(details) => {
            let response = ApiResponse::success(details, "Cycle retrieved successfully");
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(err) => err.into_response(),
    }
}

pub async fn update_cycle(
    State(state): State<Arc<AppState>>,
    Path(cycle_id): Path<Uuid>,
    user: AuthUser,
    ValidatedJson(payload): ValidatedJson<CreateCycleRequest>,
) -> impl IntoResponse {
    let ctx = RequestContext::from(&user);
    let req = CreateCycle {
        name: payload.name,
        description: payload.description,
        start_date: payload.start_date,
        end_date: payload.end_date,
    };
    match CyclesService::update(state.store.as_ref(), &ctx, cycle_id, &req) {
        Ok(cycle) => {
            let response = ApiResponse::success(cycle, "Cycle updated successfully");
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(err) => err.into_response(),
    }
}

pub async fn remove_participant(
    State(state): State<Arc<AppState>>,
    Path((cycle_id, participant_id)): Path<(Uuid, Uuid)>,
    user: AuthUser,
) -> impl IntoResponse {
    let ctx = RequestContext::from(&user);
    match CyclesService::remove_participant(state.store.as_ref(), &ctx, cycle_id, participant_id) {
        Ok(()) => {
            let response = ApiResponse::<()>::ok("Participant removed");
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(err) => err.into_response(),
    }
}

pub async fn pending_respondent_selection(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> impl IntoResponse {
    let ctx = RequestContext::from(&user);
    match CyclesService::pending_respondent_selection(state.store.as_ref(), &ctx) {
        Ok(pending) => {
            let response = ApiResponse::success(pending, "Pending respondent selections retrieved");
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(err) => err.into_response(),
    }
}

pub async fn add_participants(
    State(state): State<Arc<AppState>>,
    Path(cycle_id): Path<Uuid>,
    user: AuthUser,
    ValidatedJson(payload): ValidatedJson<AddParticipantsRequest>,
) -> impl IntoResponse {
    let ctx = RequestContext::from(&user);
    match CyclesService::add_participants(state.store.as_ref(), &ctx, cycle_id, &payload.user_ids) {
        Ok(added) => {
            let response = ApiResponse::success(added, "Participants added");
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(err) => err.into_response(),
    }
}

pub async fn add_respondents(
    State(state): State<Arc<AppState>>,
    Path((cycle_id, participant_id)): Path<(Uuid, Uuid)>,
    user: AuthUser,
    ValidatedJson(payload): ValidatedJson<AddRespondentsRequest>,
) -> impl IntoResponse {
    let ctx = RequestContext::from(&user);
    let result = CyclesService::add_respondents(
        state.store.as_ref(),
        state.notifier.as_ref(),
        &state.templates,
        &ctx,
        cycle_id,
        participant_id,
        &payload.respondent_ids,
    )
    .await;
    match result {
        Ok(added) => {
            let response = ApiResponse::success(added, "Respondents added");
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(err) => err.into_response(),
    }
}

pub async fn start_cycle(
    State(state): State<Arc<AppState>>,
    Path(cycle_id): Path<Uuid>,
    user: AuthUser,
) -> impl IntoResponse {
    let ctx = RequestContext::from(&user);
    let result = CyclesService::activate(
        state.store.as_ref(),
        state.notifier.as_ref(),
        &state.templates,
        &ctx,
        cycle_id,
    )
    .await;
    match result {
        Ok(report) => {
            let response = ApiResponse::success(report, "Cycle started");
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(err) => err.into_response(),
    }
}

pub async fn complete_cycle(
    State(state): State<Arc<AppState>>,
    Path(cycle_id): Path<Uuid>,
    user: AuthUser,
) -> impl IntoResponse {
    let ctx = RequestContext::from(&user);
    let result = CyclesService::complete(
        state.store.as_ref(),
        state.notifier.as_ref(),
        &state.templates,
        &ctx,
        cycle_id,
    )
    .await;
    match result {
        Ok(cycle) => {
            let response = ApiResponse::success(cycle, "Cycle completed");
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(err) => err.into_response(),
    }
}

pub async fn cancel_cycle(
    State(state): State<Arc<AppState>>,
    Path(cycle_id): Path<Uuid>,
    user: AuthUser,
) -> impl IntoResponse {
    let ctx = RequestContext::from(&user);
    match CyclesService::cancel(state.store.as_ref(), &ctx, cycle_id) {
        Ok(cycle) => {
            let response = ApiResponse::success(cycle, "Cycle cancelled");
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(err) => err.into_response(),
    }
}

pub async fn get_cycle_progress(
    State(state): State<Arc<AppState>>,
    Path(cycle_id): Path<Uuid>,
    user: AuthUser,
) -> impl IntoResponse {
    let ctx = RequestContext::from(&user);
    match CyclesService::progress(state.store.as_ref(), &ctx, cycle_id) {
        Ok(progress) => {
            let response = ApiResponse::success(progress, "Cycle progress retrieved successfully");
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(err) => err.into_response(),
    }
}
