use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::db::DbPool;
use crate::db::enums::{CycleStatus, RespondentStatus};
use crate::db::models::{
    ActivationCounts, Cycle, CycleChanges, CycleSummary, NewCycle, NewParticipant, NewRespondent, NewResponse, Participant,
    Question, QuestionWithCategory, Respondent, RespondentAssignment, RespondentCounts, Response,
    User,
};
use crate::db::repositories::{
    CyclesRepo, ParticipantsRepo, QuestionsRepo, RespondentsRepo, ResponsesRepo, UsersRepo,
};
use crate::error::AppResult;
use crate::store::AssessmentStore;

/// PostgreSQL-backed store. Each call checks a connection out of the r2d2 pool.
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn into_assignment((respondent, participant, cycle): (Respondent, Participant, Cycle)) -> RespondentAssignment {
    RespondentAssignment {
        respondent,
        participant,
        cycle,
    }
}

impl AssessmentStore for PgStore {
    fn find_user(&self, user_id: Uuid) -> AppResult<Option<User>> {
        let mut conn = self.pool.get()?;
        Ok(UsersRepo::find_by_id(&mut conn, user_id)?)
    }

    fn find_users(&self, user_ids: &[Uuid]) -> AppResult<Vec<User>> {
        if user_ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = self.pool.get()?;
        Ok(UsersRepo::list_by_ids(&mut conn, user_ids)?)
    }

    fn active_questions(&self) -> AppResult<Vec<QuestionWithCategory>> {
        let mut conn = self.pool.get()?;
        let rows = QuestionsRepo::list_active_with_categories(&mut conn)?;
        Ok(rows
            .into_iter()
            .map(|(question, category)| QuestionWithCategory { question, category })
            .collect())
    }

    fn find_active_question(&self, question_id: Uuid) -> AppResult<Option<Question>> {
        let mut conn = self.pool.get()?;
        Ok(QuestionsRepo::find_active(&mut conn, question_id)?)
    }

    fn upsert_response(&self, response: &NewResponse) -> AppResult<Response> {
        let mut conn = self.pool.get()?;
        Ok(ResponsesRepo::upsert(&mut conn, response)?)
    }

    fn responses_for(&self, respondent_id: Uuid) -> AppResult<Vec<Response>> {
        let mut conn = self.pool.get()?;
        Ok(ResponsesRepo::list_by_respondent(&mut conn, respondent_id)?)
    }

    fn find_assignment(&self, respondent_id: Uuid) -> AppResult<Option<RespondentAssignment>> {
        let mut conn = self.pool.get()?;
        Ok(RespondentsRepo::find_with_owners(&mut conn, respondent_id)?.map(into_assignment))
    }

    fn assignments_for_evaluator(&self, user_id: Uuid) -> AppResult<Vec<RespondentAssignment>> {
        let mut conn = self.pool.get()?;
        let rows = RespondentsRepo::list_active_for_user(&mut conn, user_id)?;
        Ok(rows.into_iter().map(into_assignment).collect())
    }

    fn outstanding_assignments(
        &self,
        today: NaiveDate,
        statuses: &[RespondentStatus],
    ) -> AppResult<Vec<RespondentAssignment>> {
        let mut conn = self.pool.get()?;
        let rows = RespondentsRepo::list_outstanding_in_running_cycles(&mut conn, today, statuses)?;
        Ok(rows.into_iter().map(into_assignment).collect())
    }

    fn respondents_for_participants(&self, participant_ids: &[Uuid]) -> AppResult<Vec<Respondent>> {
        if participant_ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = self.pool.get()?;
        Ok(RespondentsRepo::list_by_participants(&mut conn, participant_ids)?)
    }

    fn add_respondents(&self, rows: &[NewRespondent]) -> AppResult<usize> {
        if rows.is_empty() {
            return Ok(0);
        }
        let mut conn = self.pool.get()?;
        Ok(RespondentsRepo::upsert_many(&mut conn, rows)?)
    }

    fn mark_respondent_started(&self, respondent_id: Uuid, now: DateTime<Utc>) -> AppResult<bool> {
        let mut conn = self.pool.get()?;
        Ok(RespondentsRepo::mark_started(&mut conn, respondent_id, now)?)
    }

    fn mark_respondent_completed(
        &self,
        respondent_id: Uuid,
        now: DateTime<Utc>,
    ) -> AppResult<bool> {
        let mut conn = self.pool.get()?;
        Ok(RespondentsRepo::mark_completed(&mut conn, respondent_id, now)?)
    }

    fn find_participant(&self, participant_id: Uuid) -> AppResult<Option<Participant>> {
        let mut conn = self.pool.get()?;
        Ok(ParticipantsRepo::find_by_id(&mut conn, participant_id)?)
    }

    fn participants_in_cycle(&self, cycle_id: Uuid) -> AppResult<Vec<Participant>> {
        let mut conn = self.pool.get()?;
        Ok(ParticipantsRepo::list_by_cycle(&mut conn, cycle_id)?)
    }

    fn add_participants(&self, rows: &[NewParticipant]) -> AppResult<usize> {
        if rows.is_empty() {
            return Ok(0);
        }
        let mut conn = self.pool.get()?;
        Ok(ParticipantsRepo::upsert_many(&mut conn, rows)?)
    }

    fn participations_in_active_cycles(
        &self,
        user_id: Uuid,
    ) -> AppResult<Vec<(Participant, Cycle)>> {
        let mut conn = self.pool.get()?;
        Ok(ParticipantsRepo::list_active_for_subject(&mut conn, user_id)?)
    }

    fn remove_participant_from_draft(
        &self,
        cycle_id: Uuid,
        participant_id: Uuid,
    ) -> AppResult<bool> {
        let mut conn = self.pool.get()?;
        Ok(ParticipantsRepo::delete_from_draft(
            &mut conn,
            cycle_id,
            participant_id,
        )?)
    }

    fn respondent_counts(&self, participant_id: Uuid) -> AppResult<RespondentCounts> {
        let mut conn = self.pool.get()?;
        Ok(ParticipantsRepo::respondent_counts(&mut conn, participant_id)?)
    }

    fn claim_completion_notification(
        &self,
        participant_id: Uuid,
        now: DateTime<Utc>,
    ) -> AppResult<bool> {
        let mut conn = self.pool.get()?;
        Ok(ParticipantsRepo::claim_completion_notification(
            &mut conn,
            participant_id,
            now,
        )?)
    }

    fn participants_awaiting_notification(&self) -> AppResult<Vec<Uuid>> {
        let mut conn = self.pool.get()?;
        Ok(ParticipantsRepo::awaiting_notification(&mut conn)?)
    }

    fn insert_cycle(&self, cycle: &NewCycle) -> AppResult<Cycle> {
        let mut conn = self.pool.get()?;
        Ok(CyclesRepo::insert(&mut conn, cycle)?)
    }

    fn find_cycle(&self, cycle_id: Uuid) -> AppResult<Option<Cycle>> {
        let mut conn = self.pool.get()?;
        Ok(CyclesRepo::find_by_id(&mut conn, cycle_id)?)
    }

    fn list_cycles(&self) -> AppResult<Vec<CycleSummary>> {
        let mut conn = self.pool.get()?;
        Ok(CyclesRepo::list_with_participant_counts(&mut conn)?)
    }

    fn update_draft_cycle(
        &self,
        cycle_id: Uuid,
        changes: &CycleChanges,
    ) -> AppResult<Option<Cycle>> {
        let mut conn = self.pool.get()?;
        Ok(CyclesRepo::update_draft(&mut conn, cycle_id, changes, Utc::now())?)
    }

    fn transition_cycle(
        &self,
        cycle_id: Uuid,
        from: &[CycleStatus],
        to: CycleStatus,
    ) -> AppResult<bool> {
        let mut conn = self.pool.get()?;
        Ok(CyclesRepo::transition_status(&mut conn, cycle_id, from, to)?)
    }

    fn activate_cycle(
        &self,
        cycle_id: Uuid,
        today: NaiveDate,
    ) -> AppResult<Option<ActivationCounts>> {
        let mut conn = self.pool.get()?;
        Ok(CyclesRepo::activate(&mut conn, cycle_id, today)?)
    }
}
