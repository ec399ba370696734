use uuid::Uuid;

use crate::{
    db::models::{NewResponse, Response},
    error::AppError,
    services::{context::RequestContext, respondents_service::RespondentsService},
    store::AssessmentStore,
    validation::response::validate_record_response,
};

#[derive(Clone, Debug)]
pub struct RecordResponse {
    pub question_id: Uuid,
    pub score: i32,
    pub comment: Option<String>,
}

pub struct ResponsesService;

impl ResponsesService {
    /// Saves one rating. Recording the same question again overwrites the
    /// previous answer; it never creates a second row and never completes the
    /// respondent.
    pub fn record(
        store: &dyn AssessmentStore,
        ctx: &RequestContext,
        respondent_id: Uuid,
        req: &RecordResponse,
    ) -> Result<Response, AppError> {
        RespondentsService::load_owned(store, ctx, respondent_id)?;

        store
            .find_active_question(req.question_id)?
            .ok_or_else(|| AppError::not_found("question"))?;

        let comment = req
            .comment
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty());
        validate_record_response(req.score, comment)?;

        let response = store.upsert_response(&NewResponse {
            respondent_id,
            question_id: req.question_id,
            score: req.score,
            comment: comment.map(str::to_string),
        })?;
        tracing::debug!(
            respondent_id = %respondent_id,
            question_id = %req.question_id,
            score = req.score,
            "Response recorded"
        );
        Ok(response)
    }
}
