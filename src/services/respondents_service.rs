use std::collections::HashMap;

use chrono::Utc;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::{
    db::enums::RespondentStatus,
    db::models::{AssessmentSummary, RespondentAssignment},
    error::AppError,
    services::{
        cascade::{CascadeDispatcher, CascadeOutcome},
        context::RequestContext,
        progress_service::ProgressService,
    },
    store::AssessmentStore,
};

#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CompletionStatus {
    Completed,
    AlreadyCompleted,
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct CompletionOutcome {
    pub respondent_id: Uuid,
    pub status: CompletionStatus,
    /// Present only when the cascade ran inline.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cascade: Option<CascadeOutcome>,
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct StartOutcome {
    pub respondent_id: Uuid,
    pub status: RespondentStatus,
    pub started: bool,
}

/// A question as shown to the evaluator, with any answer they already gave.
#[derive(Serialize, Clone, Debug)]
pub struct SurveyQuestion {
    pub id: Uuid,
    pub question_text: String,
    pub sort_order: i32,
    pub category_id: Uuid,
    pub category_name: String,
    pub category_color: Option<String>,
    pub score: Option<i32>,
    pub comment: Option<String>,
}

pub struct RespondentsService;

impl RespondentsService {
    /// Resolves a respondent the caller is allowed to act as. Missing rows and
    /// rows owned by someone else are reported identically.
    pub fn load_owned(
        store: &dyn AssessmentStore,
        ctx: &RequestContext,
        respondent_id: Uuid,
    ) -> Result<RespondentAssignment, AppError> {
        store
            .find_assignment(respondent_id)?
            .filter(|a| a.respondent.respondent_user_id == ctx.user_id)
            .ok_or_else(|| AppError::not_found("assessment"))
    }

    pub fn list_assessments(
        store: &dyn AssessmentStore,
        ctx: &RequestContext,
    ) -> Result<Vec<AssessmentSummary>, AppError> {
        let assignments = store.assignments_for_evaluator(ctx.user_id)?;
        let subject_ids: Vec<Uuid> = assignments.iter().map(|a| a.participant.user_id).collect();
        let names: HashMap<Uuid, String> = store
            .find_users(&subject_ids)?
            .into_iter()
            .map(|u| (u.id, u.full_name()))
            .collect();

        Ok(assignments
            .into_iter()
            .map(|a| AssessmentSummary {
                respondent_id: a.respondent.id,
                participant_id: a.participant.id,
                participant_name: names.get(&a.participant.user_id).cloned().unwrap_or_default(),
                cycle_id: a.cycle.id,
                cycle_name: a.cycle.name,
                cycle_description: a.cycle.description,
                end_date: a.cycle.end_date,
                status: a.respondent.status,
                started_at: a.respondent.started_at,
                completed_at: a.respondent.completed_at,
            })
            .collect())
    }

    pub fn list_questions(
        store: &dyn AssessmentStore,
        ctx: &RequestContext,
        respondent_id: Uuid,
    ) -> Result<Vec<SurveyQuestion>, AppError> {
        let assignment = Self::load_owned(store, ctx, respondent_id)?;
        let answers: HashMap<Uuid, (i32, Option<String>)> = store
            .responses_for(assignment.respondent.id)?
            .into_iter()
            .map(|r| (r.question_id, (r.score, r.comment)))
            .collect();

        Ok(store
            .active_questions()?
            .into_iter()
            .map(|entry| {
                let answer = answers.get(&entry.question.id);
                SurveyQuestion {
                    id: entry.question.id,
                    question_text: entry.question.question_text,
                    sort_order: entry.question.sort_order,
                    category_id: entry.category.id,
                    category_name: entry.category.name,
                    category_color: entry.category.color,
                    score: answer.map(|(score, _)| *score),
                    comment: answer.and_then(|(_, comment)| comment.clone()),
                }
            })
            .collect())
    }

    /// Marks the survey as opened. Repeated calls are harmless, and rows that
    /// are already past `in_progress` keep their status.
    pub fn start(
        store: &dyn AssessmentStore,
        ctx: &RequestContext,
        respondent_id: Uuid,
    ) -> Result<StartOutcome, AppError> {
        let assignment = Self::load_owned(store, ctx, respondent_id)?;
        let started = store.mark_respondent_started(respondent_id, Utc::now())?;
        let status = if started {
            RespondentStatus::InProgress
        } else {
            store
                .find_assignment(respondent_id)?
                .map(|a| a.respondent.status)
                .unwrap_or(assignment.respondent.status)
        };
        Ok(StartOutcome {
            respondent_id,
            status,
            started,
        })
    }

    /// Completes the respondent iff every active question is answered. Only the
    /// call that performs the transition dispatches the cascade.
    pub async fn complete(
        store: &dyn AssessmentStore,
        dispatcher: &CascadeDispatcher,
        ctx: &RequestContext,
        respondent_id: Uuid,
    ) -> Result<CompletionOutcome, AppError> {
        let assignment = Self::load_owned(store, ctx, respondent_id)?;
        if assignment.respondent.status == RespondentStatus::Completed {
            return Ok(CompletionOutcome {
                respondent_id,
                status: CompletionStatus::AlreadyCompleted,
                cascade: None,
            });
        }

        let progress = ProgressService::progress_for(store, respondent_id)?;
        if !progress.is_complete() {
            return Err(AppError::Incomplete {
                answered: progress.answered,
                total: progress.total,
            });
        }

        if !store.mark_respondent_completed(respondent_id, Utc::now())? {
            return Ok(CompletionOutcome {
                respondent_id,
                status: CompletionStatus::AlreadyCompleted,
                cascade: None,
            });
        }
        info!(
            respondent_id = %respondent_id,
            participant_id = %assignment.participant.id,
            "Respondent completed assessment"
        );

        let cascade = dispatcher.dispatch(respondent_id).await;
        Ok(CompletionOutcome {
            respondent_id,
            status: CompletionStatus::Completed,
            cascade,
        })
    }
}
