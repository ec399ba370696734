pub mod assessments;
pub mod cycles;
pub mod health;
pub mod scheduler;

use crate::AppState;
use crate::middleware::auth::auth_middleware;
use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{delete, get, post},
};
use std::sync::Arc;

pub fn create_router(state: Arc<AppState>) -> Router {
    let protected = Router::new()
        .route("/assessments", get(assessments::list_assessments))
        .route(
            "/respondents/:respondent_id/start",
            post(assessments::start_assessment),
        )
        .route(
            "/respondents/:respondent_id/questions",
            get(assessments::get_questions),
        )
        .route(
            "/respondents/:respondent_id/responses",
            post(assessments::record_response),
        )
        .route(
            "/respondents/:respondent_id/progress",
            get(assessments::get_progress),
        )
        .route(
            "/respondents/:respondent_id/complete",
            post(assessments::complete_assessment),
        )
        .route("/cycles", get(cycles::list_cycles).post(cycles::create_cycle))
        .route(
            "/cycles/participants-pending-respondents",
            get(cycles::pending_respondent_selection),
        )
        .route(
            "/cycles/:cycle_id",
            get(cycles::get_cycle).put(cycles::update_cycle),
        )
        .route("/cycles/:cycle_id/start", post(cycles::start_cycle))
        .route("/cycles/:cycle_id/complete", post(cycles::complete_cycle))
        .route("/cycles/:cycle_id/cancel", post(cycles::cancel_cycle))
        .route("/cycles/:cycle_id/progress", get(cycles::get_cycle_progress))
        .route(
            "/cycles/:cycle_id/participants",
            post(cycles::add_participants),
        )
        .route(
            "/cycles/:cycle_id/participants/:participant_id",
            delete(cycles::remove_participant),
        )
        .route(
            "/cycles/:cycle_id/participants/:participant_id/respondents",
            post(cycles::add_respondents),
        )
        .route("/scheduler/status", get(scheduler::get_status))
        .route("/scheduler/:job/run", post(scheduler::run_job))
        .route_layer(from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state);

    Router::new()
        .route("/health", get(health::health))
        .merge(protected)
}
