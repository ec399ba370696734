use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::db::enums::{CycleStatus, RespondentStatus};
use crate::db::models::cycle::Cycle;
use crate::db::models::participant::Participant;
use crate::db::models::respondent::{NewRespondent, Respondent};

pub struct RespondentsRepo;

impl RespondentsRepo {
    /// Respondent row joined with its owning participant and cycle.
    pub fn find_with_owners(
        conn: &mut PgConnection,
        respondent_id: Uuid,
    ) -> Result<Option<(Respondent, Participant, Cycle)>, diesel::result::Error> {
        use crate::schema::{assessment_cycles, assessment_participants, assessment_respondents};
        assessment_respondents::table
            .inner_join(assessment_participants::table.inner_join(assessment_cycles::table))
            .filter(assessment_respondents::id.eq(respondent_id))
            .select((
                Respondent::as_select(),
                Participant::as_select(),
                Cycle::as_select(),
            ))
            .first(conn)
            .optional()
    }

    /// Everything the user is asked to evaluate in currently running cycles.
    pub fn list_active_for_user(
        conn: &mut PgConnection,
        user: Uuid,
    ) -> Result<Vec<(Respondent, Participant, Cycle)>, diesel::result::Error> {
        use crate::schema::{assessment_cycles, assessment_participants, assessment_respondents};
        assessment_respondents::table
            .inner_join(assessment_participants::table.inner_join(assessment_cycles::table))
            .filter(assessment_respondents::respondent_user_id.eq(user))
            .filter(assessment_cycles::status.eq(CycleStatus::Active))
            .select((
                Respondent::as_select(),
                Participant::as_select(),
                Cycle::as_select(),
            ))
            .order(assessment_cycles::start_date.desc())
            .load(conn)
    }

    pub fn list_by_participants(
        conn: &mut PgConnection,
        participant_ids: &[Uuid],
    ) -> Result<Vec<Respondent>, diesel::result::Error> {
        use crate::schema::assessment_respondents::dsl::*;
        assessment_respondents
            .filter(participant_id.eq_any(participant_ids.to_vec()))
            .select(Respondent::as_select())
            .order(created_at.asc())
            .load::<Respondent>(conn)
    }

    /// Outstanding respondents of active cycles whose end date is still ahead.
    pub fn list_outstanding_in_running_cycles(
        conn: &mut PgConnection,
        today: NaiveDate,
        statuses: &[RespondentStatus],
    ) -> Result<Vec<(Respondent, Participant, Cycle)>, diesel::result::Error> {
        use crate::schema::{assessment_cycles, assessment_participants, assessment_respondents};
        assessment_respondents::table
            .inner_join(assessment_participants::table.inner_join(assessment_cycles::table))
            .filter(assessment_cycles::status.eq(CycleStatus::Active))
            .filter(assessment_cycles::end_date.gt(today))
            .filter(assessment_respondents::status.eq_any(statuses.to_vec()))
            .select((
                Respondent::as_select(),
                Participant::as_select(),
                Cycle::as_select(),
            ))
            .order(assessment_respondents::created_at.asc())
            .load(conn)
    }

    /// Inserts respondents, leaving existing (participant, evaluator) pairs untouched.
    pub fn upsert_many(
        conn: &mut PgConnection,
        rows: &[NewRespondent],
    ) -> Result<usize, diesel::result::Error> {
        use crate::schema::assessment_respondents::dsl::*;
        diesel::insert_into(assessment_respondents)
            .values(rows)
            .on_conflict((participant_id, respondent_user_id))
            .do_nothing()
            .execute(conn)
    }

    pub fn mark_started(
        conn: &mut PgConnection,
        respondent_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<bool, diesel::result::Error> {
        use crate::schema::assessment_respondents::dsl::*;
        let updated = diesel::update(
            assessment_respondents
                .filter(id.eq(respondent_id))
                .filter(status.eq_any(vec![RespondentStatus::Pending, RespondentStatus::Active])),
        )
        .set((
            status.eq(RespondentStatus::InProgress),
            started_at.eq(Some(now)),
            updated_at.eq(now),
        ))
        .execute(conn)?;
        Ok(updated == 1)
    }

    /// Conditional completion: only the call that actually flips the row
    /// gets `true` back.
    pub fn mark_completed(
        conn: &mut PgConnection,
        respondent_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<bool, diesel::result::Error> {
        use crate::schema::assessment_respondents::dsl::*;
        let updated = diesel::update(
            assessment_respondents
                .filter(id.eq(respondent_id))
                .filter(status.ne(RespondentStatus::Completed)),
        )
        .set((
            status.eq(RespondentStatus::Completed),
            completed_at.eq(Some(now)),
            updated_at.eq(now),
        ))
        .execute(conn)?;
        Ok(updated == 1)
    }
}
