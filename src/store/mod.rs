//! Persistence port for the assessment lifecycle.
//!
//! Every state transition that can race (respondent completion, the
//! completion-notification flag, cycle activation) is a conditional write
//! returning whether *this* call performed it. Callers branch on that boolean
//! instead of re-reading state.

pub mod memory;
pub mod postgres;

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::db::enums::{CycleStatus, RespondentStatus};
use crate::db::models::{
    ActivationCounts, Cycle, CycleChanges, CycleSummary, NewCycle, NewParticipant, NewRespondent, NewResponse, Participant,
    Question, QuestionWithCategory, Respondent, RespondentAssignment, RespondentCounts, Response,
    User,
};
use crate::error::AppResult;

pub use memory::MemoryStore;
pub use postgres::PgStore;

pub trait AssessmentStore: Send + Sync {
    // Users (read-only)
    fn find_user(&self, user_id: Uuid) -> AppResult<Option<User>>;
    fn find_users(&self, user_ids: &[Uuid]) -> AppResult<Vec<User>>;

    // Question catalog (read-only)

    /// Active questions in display order.
    fn active_questions(&self) -> AppResult<Vec<QuestionWithCategory>>;
    fn find_active_question(&self, question_id: Uuid) -> AppResult<Option<Question>>;

    // Responses

    /// Insert or overwrite the answer for (respondent, question).
    fn upsert_response(&self, response: &NewResponse) -> AppResult<Response>;
    fn responses_for(&self, respondent_id: Uuid) -> AppResult<Vec<Response>>;

    // Respondents
    fn find_assignment(&self, respondent_id: Uuid) -> AppResult<Option<RespondentAssignment>>;

    /// Assignments of an evaluator in cycles that are currently active.
    fn assignments_for_evaluator(&self, user_id: Uuid) -> AppResult<Vec<RespondentAssignment>>;

    /// Assignments in active cycles ending after `today`, filtered by status.
    fn outstanding_assignments(
        &self,
        today: NaiveDate,
        statuses: &[RespondentStatus],
    ) -> AppResult<Vec<RespondentAssignment>>;
    fn respondents_for_participants(&self, participant_ids: &[Uuid]) -> AppResult<Vec<Respondent>>;

    /// Returns the number of rows actually inserted; existing pairs are kept.
    fn add_respondents(&self, rows: &[NewRespondent]) -> AppResult<usize>;

    /// `pending | active -> in_progress`. True only for the call that flipped it.
    fn mark_respondent_started(&self, respondent_id: Uuid, now: DateTime<Utc>) -> AppResult<bool>;

    /// `* -> completed` guarded by `status != completed`.
    fn mark_respondent_completed(&self, respondent_id: Uuid, now: DateTime<Utc>)
    -> AppResult<bool>;

    // Participants
    fn find_participant(&self, participant_id: Uuid) -> AppResult<Option<Participant>>;
    fn participants_in_cycle(&self, cycle_id: Uuid) -> AppResult<Vec<Participant>>;
    fn add_participants(&self, rows: &[NewParticipant]) -> AppResult<usize>;

    /// The user's participations in cycles that are currently active.
    fn participations_in_active_cycles(&self, user_id: Uuid)
    -> AppResult<Vec<(Participant, Cycle)>>;

    /// Removes a participant, with its respondents and answers, while the
    /// cycle is a draft. False when nothing was removed.
    fn remove_participant_from_draft(&self, cycle_id: Uuid, participant_id: Uuid)
    -> AppResult<bool>;

    fn respondent_counts(&self, participant_id: Uuid) -> AppResult<RespondentCounts>;

    /// Flips `completed_notification_sent` false -> true and marks the
    /// participant completed, provided it has respondents and all of them are
    /// completed at the moment of the write. True for exactly one caller per
    /// participant.
    fn claim_completion_notification(
        &self,
        participant_id: Uuid,
        now: DateTime<Utc>,
    ) -> AppResult<bool>;

    /// Participants of active cycles whose respondents are all completed but
    /// whose notification flag is still false.
    fn participants_awaiting_notification(&self) -> AppResult<Vec<Uuid>>;

    // Cycles
    fn insert_cycle(&self, cycle: &NewCycle) -> AppResult<Cycle>;
    fn find_cycle(&self, cycle_id: Uuid) -> AppResult<Option<Cycle>>;

    /// Newest first.
    fn list_cycles(&self) -> AppResult<Vec<CycleSummary>>;

    /// `None` when the cycle is missing or no longer a draft.
    fn update_draft_cycle(&self, cycle_id: Uuid, changes: &CycleChanges)
    -> AppResult<Option<Cycle>>;
    fn transition_cycle(&self, cycle_id: Uuid, from: &[CycleStatus], to: CycleStatus)
    -> AppResult<bool>;

    /// Draft -> active for the cycle, its participants and respondents, atomically.
    /// `None` when the cycle was not a draft any more.
    fn activate_cycle(&self, cycle_id: Uuid, today: NaiveDate)
    -> AppResult<Option<ActivationCounts>>;
}
