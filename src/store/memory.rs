//! In-memory store.
//!
//! Holds every table behind one `Mutex`, so each trait call is atomic the same
//! way a single conditional UPDATE is. Used by the test-suite and for running
//! the service without a database.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::db::enums::{CycleStatus, ParticipantStatus, RespondentStatus, RespondentType, UserRole};
use crate::db::models::{
    ActivationCounts, Category, Cycle, CycleChanges, CycleSummary, NewCycle, NewParticipant, NewRespondent, NewResponse,
    Participant, Question, QuestionWithCategory, Respondent, RespondentAssignment,
    RespondentCounts, Response, User,
};
use crate::error::AppResult;
use crate::store::AssessmentStore;

#[derive(Default)]
struct MemoryState {
    users: HashMap<Uuid, User>,
    categories: HashMap<Uuid, Category>,
    questions: Vec<Question>,
    cycles: HashMap<Uuid, Cycle>,
    participants: Vec<Participant>,
    respondents: Vec<Respondent>,
    responses: Vec<Response>,
}

impl MemoryState {
    fn assignment(&self, respondent: &Respondent) -> Option<RespondentAssignment> {
        let participant = self
            .participants
            .iter()
            .find(|p| p.id == respondent.participant_id)?;
        let cycle = self.cycles.get(&participant.cycle_id)?;
        Some(RespondentAssignment {
            respondent: respondent.clone(),
            participant: participant.clone(),
            cycle: cycle.clone(),
        })
    }
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // Seeding helpers for the read-only collaborator tables and for setting
    // up states the service itself never produces.

    pub fn seed_user(
        &self,
        first_name: &str,
        last_name: &str,
        role: UserRole,
        manager_id: Option<Uuid>,
        chat_username: Option<&str>,
    ) -> User {
        let user = User {
            id: Uuid::new_v4(),
            email: format!(
                "{}.{}@example.com",
                first_name.to_lowercase(),
                last_name.to_lowercase()
            ),
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            role,
            manager_id,
            mattermost_username: chat_username.map(str::to_string),
            is_active: true,
        };
        self.state().users.insert(user.id, user.clone());
        user
    }

    pub fn set_user_active(&self, user_id: Uuid, active: bool) {
        if let Some(user) = self.state().users.get_mut(&user_id) {
            user.is_active = active;
        }
    }

    pub fn seed_category(&self, name: &str, sort_order: i32) -> Category {
        let category = Category {
            id: Uuid::new_v4(),
            name: name.to_string(),
            color: None,
            sort_order,
        };
        self.state().categories.insert(category.id, category.clone());
        category
    }

    pub fn seed_question(&self, category_id: Uuid, text: &str, sort_order: i32) -> Question {
        let question = Question {
            id: Uuid::new_v4(),
            category_id,
            question_text: text.to_string(),
            sort_order,
            is_active: true,
        };
        self.state().questions.push(question.clone());
        question
    }

    pub fn set_question_active(&self, question_id: Uuid, active: bool) {
        if let Some(question) = self
            .state()
            .questions
            .iter_mut()
            .find(|q| q.id == question_id)
        {
            question.is_active = active;
        }
    }

    pub fn seed_participant(&self, cycle_id: Uuid, user_id: Uuid, status: ParticipantStatus) -> Participant {
        let now = Utc::now();
        let participant = Participant {
            id: Uuid::new_v4(),
            cycle_id,
            user_id,
            status,
            completed_notification_sent: false,
            completed_at: None,
            created_at: now,
            updated_at: now,
        };
        self.state().participants.push(participant.clone());
        participant
    }

    pub fn seed_respondent(
        &self,
        participant_id: Uuid,
        respondent_user_id: Uuid,
        respondent_type: RespondentType,
        status: RespondentStatus,
    ) -> Respondent {
        let now = Utc::now();
        let respondent = Respondent {
            id: Uuid::new_v4(),
            participant_id,
            respondent_user_id,
            respondent_type,
            status,
            started_at: None,
            completed_at: if status == RespondentStatus::Completed {
                Some(now)
            } else {
                None
            },
            created_at: now,
            updated_at: now,
        };
        self.state().respondents.push(respondent.clone());
        respondent
    }

    /// Writes a respondent status directly, bypassing the cascade.
    pub fn force_respondent_status(&self, respondent_id: Uuid, status: RespondentStatus) {
        let mut state = self.state();
        if let Some(respondent) = state.respondents.iter_mut().find(|r| r.id == respondent_id) {
            respondent.status = status;
            respondent.updated_at = Utc::now();
        }
    }

    pub fn force_cycle_status(&self, cycle_id: Uuid, status: CycleStatus) {
        if let Some(cycle) = self.state().cycles.get_mut(&cycle_id) {
            cycle.status = status;
        }
    }

    pub fn participant(&self, participant_id: Uuid) -> Option<Participant> {
        self.state()
            .participants
            .iter()
            .find(|p| p.id == participant_id)
            .cloned()
    }

    pub fn respondent(&self, respondent_id: Uuid) -> Option<Respondent> {
        self.state()
            .respondents
            .iter()
            .find(|r| r.id == respondent_id)
            .cloned()
    }

    pub fn cycle(&self, cycle_id: Uuid) -> Option<Cycle> {
        self.state().cycles.get(&cycle_id).cloned()
    }

    pub fn response_count(&self) -> usize {
        self.state().responses.len()
    }
}

impl AssessmentStore for MemoryStore {
    fn find_user(&self, user_id: Uuid) -> AppResult<Option<User>> {
        Ok(self.state().users.get(&user_id).cloned())
    }

    fn find_users(&self, user_ids: &[Uuid]) -> AppResult<Vec<User>> {
        let state = self.state();
        Ok(user_ids
            .iter()
            .filter_map(|id| state.users.get(id).cloned())
            .collect())
    }

    fn active_questions(&self) -> AppResult<Vec<QuestionWithCategory>> {
        let state = self.state();
        let mut rows: Vec<QuestionWithCategory> = state
            .questions
            .iter()
            .filter(|q| q.is_active)
            .filter_map(|q| {
                state.categories.get(&q.category_id).map(|c| QuestionWithCategory {
                    question: q.clone(),
                    category: c.clone(),
                })
            })
            .collect();
        rows.sort_by(|a, b| {
            (a.category.sort_order, &a.category.name, a.question.sort_order).cmp(&(
                b.category.sort_order,
                &b.category.name,
                b.question.sort_order,
            ))
        });
        Ok(rows)
    }

    fn find_active_question(&self, question_id: Uuid) -> AppResult<Option<Question>> {
        Ok(self
            .state()
            .questions
            .iter()
            .find(|q| q.id == question_id && q.is_active)
            .cloned())
    }

    fn upsert_response(&self, response: &NewResponse) -> AppResult<Response> {
        let mut state = self.state();
        let now = Utc::now();
        if let Some(existing) = state.responses.iter_mut().find(|r| {
            r.respondent_id == response.respondent_id && r.question_id == response.question_id
        }) {
            existing.score = response.score;
            existing.comment = response.comment.clone();
            existing.updated_at = now;
            return Ok(existing.clone());
        }
        let created = Response {
            id: Uuid::new_v4(),
            respondent_id: response.respondent_id,
            question_id: response.question_id,
            score: response.score,
            comment: response.comment.clone(),
            created_at: now,
            updated_at: now,
        };
        state.responses.push(created.clone());
        Ok(created)
    }

    fn responses_for(&self, respondent_id: Uuid) -> AppResult<Vec<Response>> {
        Ok(self
            .state()
            .responses
            .iter()
            .filter(|r| r.respondent_id == respondent_id)
            .cloned()
            .collect())
    }

    fn find_assignment(&self, respondent_id: Uuid) -> AppResult<Option<RespondentAssignment>> {
        let state = self.state();
        Ok(state
            .respondents
            .iter()
            .find(|r| r.id == respondent_id)
            .and_then(|r| state.assignment(r)))
    }

    fn assignments_for_evaluator(&self, user_id: Uuid) -> AppResult<Vec<RespondentAssignment>> {
        let state = self.state();
        let mut rows: Vec<RespondentAssignment> = state
            .respondents
            .iter()
            .filter(|r| r.respondent_user_id == user_id)
            .filter_map(|r| state.assignment(r))
            .filter(|a| a.cycle.status == CycleStatus::Active)
            .collect();
        rows.sort_by(|a, b| b.cycle.start_date.cmp(&a.cycle.start_date));
        Ok(rows)
    }

    fn outstanding_assignments(
        &self,
        today: NaiveDate,
        statuses: &[RespondentStatus],
    ) -> AppResult<Vec<RespondentAssignment>> {
        let state = self.state();
        Ok(state
            .respondents
            .iter()
            .filter(|r| statuses.contains(&r.status))
            .filter_map(|r| state.assignment(r))
            .filter(|a| a.cycle.status == CycleStatus::Active && a.cycle.end_date > today)
            .collect())
    }

    fn respondents_for_participants(&self, participant_ids: &[Uuid]) -> AppResult<Vec<Respondent>> {
        Ok(self
            .state()
            .respondents
            .iter()
            .filter(|r| participant_ids.contains(&r.participant_id))
            .cloned()
            .collect())
    }

    fn add_respondents(&self, rows: &[NewRespondent]) -> AppResult<usize> {
        let mut state = self.state();
        let now = Utc::now();
        let mut inserted = 0;
        for row in rows {
            let exists = state.respondents.iter().any(|r| {
                r.participant_id == row.participant_id
                    && r.respondent_user_id == row.respondent_user_id
            });
            if exists {
                continue;
            }
            state.respondents.push(Respondent {
                id: Uuid::new_v4(),
                participant_id: row.participant_id,
                respondent_user_id: row.respondent_user_id,
                respondent_type: row.respondent_type,
                status: row.status,
                started_at: None,
                completed_at: None,
                created_at: now,
                updated_at: now,
            });
            inserted += 1;
        }
        Ok(inserted)
    }

    fn mark_respondent_started(&self, respondent_id: Uuid, now: DateTime<Utc>) -> AppResult<bool> {
        let mut state = self.state();
        match state.respondents.iter_mut().find(|r| {
            r.id == respondent_id
                && matches!(r.status, RespondentStatus::Pending | RespondentStatus::Active)
        }) {
            Some(respondent) => {
                respondent.status = RespondentStatus::InProgress;
                respondent.started_at = Some(now);
                respondent.updated_at = now;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn mark_respondent_completed(
        &self,
        respondent_id: Uuid,
        now: DateTime<Utc>,
    ) -> AppResult<bool> {
        let mut state = self.state();
        match state
            .respondents
            .iter_mut()
            .find(|r| r.id == respondent_id && r.status != RespondentStatus::Completed)
        {
            Some(respondent) => {
                respondent.status = RespondentStatus::Completed;
                respondent.completed_at = Some(now);
                respondent.updated_at = now;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn find_participant(&self, participant_id: Uuid) -> AppResult<Option<Participant>> {
        Ok(self.participant(participant_id))
    }

    fn participants_in_cycle(&self, cycle_id: Uuid) -> AppResult<Vec<Participant>> {
        Ok(self
            .state()
            .participants
            .iter()
            .filter(|p| p.cycle_id == cycle_id)
            .cloned()
            .collect())
    }

    fn add_participants(&self, rows: &[NewParticipant]) -> AppResult<usize> {
        let mut state = self.state();
        let now = Utc::now();
        let mut inserted = 0;
        for row in rows {
            let exists = state
                .participants
                .iter()
                .any(|p| p.cycle_id == row.cycle_id && p.user_id == row.user_id);
            if exists {
                continue;
            }
            state.participants.push(Participant {
                id: Uuid::new_v4(),
                cycle_id: row.cycle_id,
                user_id: row.user_id,
                status: row.status,
                completed_notification_sent: false,
                completed_at: None,
                created_at: now,
                updated_at: now,
            });
            inserted += 1;
        }
        Ok(inserted)
    }

    fn participations_in_active_cycles(
        &self,
        user_id: Uuid,
    ) -> AppResult<Vec<(Participant, Cycle)>> {
        let state = self.state();
        let mut rows: Vec<(Participant, Cycle)> = state
            .participants
            .iter()
            .filter(|p| p.user_id == user_id)
            .filter_map(|p| {
                state
                    .cycles
                    .get(&p.cycle_id)
                    .filter(|c| c.status == CycleStatus::Active)
                    .map(|c| (p.clone(), c.clone()))
            })
            .collect();
        rows.sort_by(|a, b| b.1.start_date.cmp(&a.1.start_date));
        Ok(rows)
    }

    fn remove_participant_from_draft(
        &self,
        cycle_id: Uuid,
        participant_id: Uuid,
    ) -> AppResult<bool> {
        let mut state = self.state();
        let is_draft = state
            .cycles
            .get(&cycle_id)
            .is_some_and(|c| c.status == CycleStatus::Draft);
        let owned = state
            .participants
            .iter()
            .any(|p| p.id == participant_id && p.cycle_id == cycle_id);
        if !is_draft || !owned {
            return Ok(false);
        }

        let respondent_ids: Vec<Uuid> = state
            .respondents
            .iter()
            .filter(|r| r.participant_id == participant_id)
            .map(|r| r.id)
            .collect();
        state
            .responses
            .retain(|r| !respondent_ids.contains(&r.respondent_id));
        state.respondents.retain(|r| r.participant_id != participant_id);
        state.participants.retain(|p| p.id != participant_id);
        Ok(true)
    }

    fn respondent_counts(&self, participant_id: Uuid) -> AppResult<RespondentCounts> {
        let state = self.state();
        let (total, completed) = state
            .respondents
            .iter()
            .filter(|r| r.participant_id == participant_id)
            .fold((0, 0), |(total, completed), r| {
                let done = i64::from(r.status == RespondentStatus::Completed);
                (total + 1, completed + done)
            });
        Ok(RespondentCounts { total, completed })
    }

    fn claim_completion_notification(
        &self,
        participant_id: Uuid,
        now: DateTime<Utc>,
    ) -> AppResult<bool> {
        let mut state = self.state();
        let mut owned = state
            .respondents
            .iter()
            .filter(|r| r.participant_id == participant_id)
            .peekable();
        let all_completed =
            owned.peek().is_some() && owned.all(|r| r.status == RespondentStatus::Completed);
        if !all_completed {
            return Ok(false);
        }
        match state
            .participants
            .iter_mut()
            .find(|p| p.id == participant_id && !p.completed_notification_sent)
        {
            Some(participant) => {
                participant.completed_notification_sent = true;
                participant.status = ParticipantStatus::Completed;
                participant.completed_at = Some(now);
                participant.updated_at = now;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn participants_awaiting_notification(&self) -> AppResult<Vec<Uuid>> {
        let state = self.state();
        Ok(state
            .participants
            .iter()
            .filter(|p| !p.completed_notification_sent)
            .filter(|p| {
                state
                    .cycles
                    .get(&p.cycle_id)
                    .is_some_and(|c| c.status == CycleStatus::Active)
            })
            .filter(|p| {
                let mut owned = state
                    .respondents
                    .iter()
                    .filter(|r| r.participant_id == p.id)
                    .peekable();
                owned.peek().is_some() && owned.all(|r| r.status == RespondentStatus::Completed)
            })
            .map(|p| p.id)
            .collect())
    }

    fn insert_cycle(&self, cycle: &NewCycle) -> AppResult<Cycle> {
        let now = Utc::now();
        let created = Cycle {
            id: Uuid::new_v4(),
            name: cycle.name.clone(),
            description: cycle.description.clone(),
            created_by: cycle.created_by,
            start_date: cycle.start_date,
            end_date: cycle.end_date,
            status: cycle.status,
            created_at: now,
            updated_at: now,
        };
        self.state().cycles.insert(created.id, created.clone());
        Ok(created)
    }

    fn find_cycle(&self, cycle_id: Uuid) -> AppResult<Option<Cycle>> {
        Ok(self.cycle(cycle_id))
    }

    fn list_cycles(&self) -> AppResult<Vec<CycleSummary>> {
        let state = self.state();
        let mut cycles: Vec<CycleSummary> = state
            .cycles
            .values()
            .map(|cycle| CycleSummary {
                participants_count: state
                    .participants
                    .iter()
                    .filter(|p| p.cycle_id == cycle.id)
                    .count() as i64,
                cycle: cycle.clone(),
            })
            .collect();
        cycles.sort_by(|a, b| b.cycle.created_at.cmp(&a.cycle.created_at));
        Ok(cycles)
    }

    fn update_draft_cycle(
        &self,
        cycle_id: Uuid,
        changes: &CycleChanges,
    ) -> AppResult<Option<Cycle>> {
        let mut state = self.state();
        match state.cycles.get_mut(&cycle_id) {
            Some(cycle) if cycle.status == CycleStatus::Draft => {
                cycle.name = changes.name.clone();
                cycle.description = changes.description.clone();
                cycle.start_date = changes.start_date;
                cycle.end_date = changes.end_date;
                cycle.updated_at = Utc::now();
                Ok(Some(cycle.clone()))
            }
            _ => Ok(None),
        }
    }

    fn transition_cycle(
        &self,
        cycle_id: Uuid,
        from: &[CycleStatus],
        to: CycleStatus,
    ) -> AppResult<bool> {
        let mut state = self.state();
        match state.cycles.get_mut(&cycle_id) {
            Some(cycle) if from.contains(&cycle.status) => {
                cycle.status = to;
                cycle.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn activate_cycle(
        &self,
        cycle_id: Uuid,
        today: NaiveDate,
    ) -> AppResult<Option<ActivationCounts>> {
        let mut state = self.state();
        let now = Utc::now();
        match state.cycles.get_mut(&cycle_id) {
            Some(cycle) if cycle.status == CycleStatus::Draft => {
                cycle.status = CycleStatus::Active;
                cycle.start_date = today;
                cycle.updated_at = now;
            }
            _ => return Ok(None),
        }

        let mut counts = ActivationCounts::default();
        let mut participant_ids = Vec::new();
        for participant in state.participants.iter_mut().filter(|p| p.cycle_id == cycle_id) {
            participant_ids.push(participant.id);
            if participant.status == ParticipantStatus::Pending {
                participant.status = ParticipantStatus::Active;
                participant.updated_at = now;
                counts.participants += 1;
            }
        }
        for respondent in state.respondents.iter_mut().filter(|r| {
            participant_ids.contains(&r.participant_id) && r.status == RespondentStatus::Pending
        }) {
            respondent.status = RespondentStatus::Active;
            respondent.updated_at = now;
            counts.respondents += 1;
        }
        Ok(Some(counts))
    }
}
