use std::collections::HashSet;

use serde::Serialize;
use uuid::Uuid;

use crate::{
    db::models::{QuestionWithCategory, Response},
    error::AppError,
    services::{context::RequestContext, respondents_service::RespondentsService},
    store::AssessmentStore,
};

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct CategoryProgress {
    pub category_id: Uuid,
    pub category_name: String,
    pub answered: i64,
    pub total: i64,
    pub percentage: i64,
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct Progress {
    pub answered: i64,
    pub total: i64,
    pub percentage: i64,
    pub per_category: Vec<CategoryProgress>,
}

impl Progress {
    pub fn is_complete(&self) -> bool {
        self.answered == self.total
    }
}

fn percentage(answered: i64, total: i64) -> i64 {
    if total == 0 {
        return 0;
    }
    (answered as f64 * 100.0 / total as f64).round() as i64
}

/// Counts answered questions against the active catalog. Answers to
/// questions that are no longer active are ignored; `questions` must already
/// be in display order.
pub fn compute_progress(questions: &[QuestionWithCategory], responses: &[Response]) -> Progress {
    let answered_ids: HashSet<Uuid> = responses.iter().map(|r| r.question_id).collect();

    let mut per_category: Vec<CategoryProgress> = Vec::new();
    let mut answered = 0;
    for entry in questions {
        let is_answered = answered_ids.contains(&entry.question.id);
        if is_answered {
            answered += 1;
        }
        let index = match per_category
            .iter()
            .position(|c| c.category_id == entry.category.id)
        {
            Some(index) => index,
            None => {
                per_category.push(CategoryProgress {
                    category_id: entry.category.id,
                    category_name: entry.category.name.clone(),
                    answered: 0,
                    total: 0,
                    percentage: 0,
                });
                per_category.len() - 1
            }
        };
        let bucket = &mut per_category[index];
        bucket.total += 1;
        if is_answered {
            bucket.answered += 1;
        }
    }

    for bucket in &mut per_category {
        bucket.percentage = percentage(bucket.answered, bucket.total);
    }

    let total = questions.len() as i64;
    Progress {
        answered,
        total,
        percentage: percentage(answered, total),
        per_category,
    }
}

pub struct ProgressService;

impl ProgressService {
    pub fn get_progress(
        store: &dyn AssessmentStore,
        ctx: &RequestContext,
        respondent_id: Uuid,
    ) -> Result<Progress, AppError> {
        let assignment = RespondentsService::load_owned(store, ctx, respondent_id)?;
        Self::progress_for(store, assignment.respondent.id)
    }

    pub(crate) fn progress_for(store: &dyn AssessmentStore, respondent_id: Uuid) -> Result<Progress, AppError> {
        let questions = store.active_questions()?;
        let responses = store.responses_for(respondent_id)?;
        Ok(compute_progress(&questions, &responses))
    }
}
