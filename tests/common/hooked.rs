use chrono::{DateTime, NaiveDate, Utc};
use feedback_backend::{
    db::enums::{CycleStatus, RespondentStatus},
    db::models::{
        ActivationCounts, Cycle, CycleChanges, CycleSummary, NewCycle, NewParticipant,
        NewRespondent, NewResponse, Participant, Question, QuestionWithCategory, Respondent,
        RespondentAssignment, RespondentCounts, Response, User,
    },
    error::AppResult,
    store::{AssessmentStore, MemoryStore},
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

type Hook = Box<dyn FnOnce(&MemoryStore) + Send>;

/// Memory store that can run a one-shot hook right before the completion
/// claim, or panic inside the reminder query. Everything else is delegated.
pub struct HookedStore {
    pub inner: Arc<MemoryStore>,
    before_claim: Mutex<Option<Hook>>,
    panic_on_outstanding: AtomicBool,
}

impl HookedStore {
    pub fn new(inner: Arc<MemoryStore>) -> Self {
        Self {
            inner,
            before_claim: Mutex::new(None),
            panic_on_outstanding: AtomicBool::new(false),
        }
    }

    pub fn before_claim(&self, hook: impl FnOnce(&MemoryStore) + Send + 'static) {
        *self.before_claim.lock().unwrap() = Some(Box::new(hook));
    }

    pub fn panic_on_outstanding(&self, enabled: bool) {
        self.panic_on_outstanding.store(enabled, Ordering::SeqCst);
    }
}

impl AssessmentStore for HookedStore {
    fn find_user(&self, user_id: Uuid) -> AppResult<Option<User>> {
        self.inner.find_user(user_id)
    }

    fn find_users(&self, user_ids: &[Uuid]) -> AppResult<Vec<User>> {
        self.inner.find_users(user_ids)
    }

    fn active_questions(&self) -> AppResult<Vec<QuestionWithCategory>> {
        self.inner.active_questions()
    }

    fn find_active_question(&self, question_id: Uuid) -> AppResult<Option<Question>> {
        self.inner.find_active_question(question_id)
    }

    fn upsert_response(&self, response: &NewResponse) -> AppResult<Response> {
        self.inner.upsert_response(response)
    }

    fn responses_for(&self, respondent_id: Uuid) -> AppResult<Vec<Response>> {
        self.inner.responses_for(respondent_id)
    }

    fn find_assignment(&self, respondent_id: Uuid) -> AppResult<Option<RespondentAssignment>> {
        self.inner.find_assignment(respondent_id)
    }

    fn assignments_for_evaluator(&self, user_id: Uuid) -> AppResult<Vec<RespondentAssignment>> {
        self.inner.assignments_for_evaluator(user_id)
    }

    fn outstanding_assignments(
        &self,
        today: NaiveDate,
        statuses: &[RespondentStatus],
    ) -> AppResult<Vec<RespondentAssignment>> {
        if self.panic_on_outstanding.load(Ordering::SeqCst) {
            panic!("reminder query blew up");
        }
        self.inner.outstanding_assignments(today, statuses)
    }

    fn respondents_for_participants(&self, participant_ids: &[Uuid]) -> AppResult<Vec<Respondent>> {
        self.inner.respondents_for_participants(participant_ids)
    }

    fn add_respondents(&self, rows: &[NewRespondent]) -> AppResult<usize> {
        self.inner.add_respondents(rows)
    }

    fn mark_respondent_started(&self, respondent_id: Uuid, now: DateTime<Utc>) -> AppResult<bool> {
        self.inner.mark_respondent_started(respondent_id, now)
    }

    fn mark_respondent_completed(
        &self,
        respondent_id: Uuid,
        now: DateTime<Utc>,
    ) -> AppResult<bool> {
        self.inner.mark_respondent_completed(respondent_id, now)
    }

    fn find_participant(&self, participant_id: Uuid) -> AppResult<Option<Participant>> {
        self.inner.find_participant(participant_id)
    }

    fn participants_in_cycle(&self, cycle_id: Uuid) -> AppResult<Vec<Participant>> {
        self.inner.participants_in_cycle(cycle_id)
    }

    fn add_participants(&self, rows: &[NewParticipant]) -> AppResult<usize> {
        self.inner.add_participants(rows)
    }

    fn participations_in_active_cycles(
        &self,
        user_id: Uuid,
    ) -> AppResult<Vec<(Participant, Cycle)>> {
        self.inner.participations_in_active_cycles(user_id)
    }

    fn remove_participant_from_draft(
        &self,
        cycle_id: Uuid,
        participant_id: Uuid,
    ) -> AppResult<bool> {
        self.inner.remove_participant_from_draft(cycle_id, participant_id)
    }

    fn respondent_counts(&self, participant_id: Uuid) -> AppResult<RespondentCounts> {
        self.inner.respondent_counts(participant_id)
    }

    fn claim_completion_notification(
        &self,
        participant_id: Uuid,
        now: DateTime<Utc>,
    ) -> AppResult<bool> {
        let hook = self.before_claim.lock().unwrap().take();
        if let Some(hook) = hook {
            hook(&self.inner);
        }
        self.inner.claim_completion_notification(participant_id, now)
    }

    fn participants_awaiting_notification(&self) -> AppResult<Vec<Uuid>> {
        self.inner.participants_awaiting_notification()
    }

    fn insert_cycle(&self, cycle: &NewCycle) -> AppResult<Cycle> {
        self.inner.insert_cycle(cycle)
    }

    fn find_cycle(&self, cycle_id: Uuid) -> AppResult<Option<Cycle>> {
        self.inner.find_cycle(cycle_id)
    }

    fn list_cycles(&self) -> AppResult<Vec<CycleSummary>> {
        self.inner.list_cycles()
    }

    fn update_draft_cycle(
        &self,
        cycle_id: Uuid,
        changes: &CycleChanges,
    ) -> AppResult<Option<Cycle>> {
        self.inner.update_draft_cycle(cycle_id, changes)
    }

    fn transition_cycle(
        &self,
        cycle_id: Uuid,
        from: &[CycleStatus],
        to: CycleStatus,
    ) -> AppResult<bool> {
        self.inner.transition_cycle(cycle_id, from, to)
    }

    fn activate_cycle(
        &self,
        cycle_id: Uuid,
        today: NaiveDate,
    ) -> AppResult<Option<ActivationCounts>> {
        self.inner.activate_cycle(cycle_id, today)
    }
}
