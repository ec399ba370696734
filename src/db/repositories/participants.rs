use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::sql_types;
use uuid::Uuid;

use crate::db::enums::{CycleStatus, ParticipantStatus, RespondentStatus};
use crate::db::models::cycle::Cycle;
use crate::db::models::participant::{NewParticipant, Participant, RespondentCounts};

pub struct ParticipantsRepo;

#[derive(QueryableByName)]
struct ParticipantIdRow {
    #[diesel(sql_type = sql_types::Uuid)]
    participant_id: Uuid,
}

// Participants in active cycles whose respondents all finished but whose
// completion notification never went out.
const AWAITING_NOTIFICATION_SQL: &str = r#"
SELECT ap.id AS participant_id
FROM assessment_participants ap
JOIN assessment_cycles ac ON ac.id = ap.cycle_id
WHERE ac.status = 'active'
  AND ap.completed_notification_sent = FALSE
  AND EXISTS (
    SELECT 1 FROM assessment_respondents ar
    WHERE ar.participant_id = ap.id
  )
  AND NOT EXISTS (
    SELECT 1 FROM assessment_respondents ar
    WHERE ar.participant_id = ap.id
      AND ar.status <> 'completed'
  )
ORDER BY ap.created_at ASC
"#;

impl ParticipantsRepo {
    pub fn find_by_id(
        conn: &mut PgConnection,
        participant_id: Uuid,
    ) -> Result<Option<Participant>, diesel::result::Error> {
        use crate::schema::assessment_participants::dsl::*;
        assessment_participants
            .filter(id.eq(participant_id))
            .select(Participant::as_select())
            .first::<Participant>(conn)
            .optional()
    }

    pub fn list_by_cycle(
        conn: &mut PgConnection,
        cycle: Uuid,
    ) -> Result<Vec<Participant>, diesel::result::Error> {
        use crate::schema::assessment_participants::dsl::*;
        assessment_participants
            .filter(cycle_id.eq(cycle))
            .select(Participant::as_select())
            .order(created_at.asc())
            .load::<Participant>(conn)
    }

    /// The user's own participations in running cycles.
    pub fn list_active_for_subject(
        conn: &mut PgConnection,
        user: Uuid,
    ) -> Result<Vec<(Participant, Cycle)>, diesel::result::Error> {
        use crate::schema::{assessment_cycles, assessment_participants};
        assessment_participants::table
            .inner_join(assessment_cycles::table)
            .filter(assessment_participants::user_id.eq(user))
            .filter(assessment_cycles::status.eq(CycleStatus::Active))
            .select((Participant::as_select(), Cycle::as_select()))
            .order(assessment_cycles::start_date.desc())
            .load(conn)
    }

    /// Deletes a participant of a draft cycle; its respondents and their
    /// answers go with it through the foreign keys. Returns whether a row was
    /// removed.
    pub fn delete_from_draft(
        conn: &mut PgConnection,
        cycle: Uuid,
        participant: Uuid,
    ) -> Result<bool, diesel::result::Error> {
        use crate::schema::assessment_cycles::dsl as c;
        use crate::schema::assessment_participants::dsl as p;

        conn.transaction::<_, diesel::result::Error, _>(|conn| {
            let draft = c::assessment_cycles
                .filter(c::id.eq(cycle))
                .filter(c::status.eq(CycleStatus::Draft))
                .select(c::id)
                .for_update()
                .first::<Uuid>(conn)
                .optional()?;
            if draft.is_none() {
                return Ok(false);
            }
            let deleted = diesel::delete(
                p::assessment_participants
                    .filter(p::id.eq(participant))
                    .filter(p::cycle_id.eq(cycle)),
            )
            .execute(conn)?;
            Ok(deleted == 1)
        })
    }

    /// Inserts participants, leaving rows that already exist for the same
    /// (cycle, user) pair untouched.
    pub fn upsert_many(
        conn: &mut PgConnection,
        rows: &[NewParticipant],
    ) -> Result<usize, diesel::result::Error> {
        use crate::schema::assessment_participants::dsl::*;
        diesel::insert_into(assessment_participants)
            .values(rows)
            .on_conflict((cycle_id, user_id))
            .do_nothing()
            .execute(conn)
    }

    pub fn respondent_counts(
        conn: &mut PgConnection,
        participant: Uuid,
    ) -> Result<RespondentCounts, diesel::result::Error> {
        use crate::schema::assessment_respondents::dsl::*;
        let total: i64 = assessment_respondents
            .filter(participant_id.eq(participant))
            .count()
            .get_result(conn)?;
        let completed: i64 = assessment_respondents
            .filter(participant_id.eq(participant))
            .filter(status.eq(RespondentStatus::Completed))
            .count()
            .get_result(conn)?;
        Ok(RespondentCounts { total, completed })
    }

    /// Compare-and-set on `completed_notification_sent`, taken only while the
    /// participant has respondents and every one of them is completed.
    /// Exactly one caller ever observes `true` for a given participant.
    pub fn claim_completion_notification(
        conn: &mut PgConnection,
        participant: Uuid,
        now: DateTime<Utc>,
    ) -> Result<bool, diesel::result::Error> {
        use crate::schema::assessment_participants::dsl as p;
        use crate::schema::assessment_respondents::dsl as r;
        use diesel::dsl::{exists, not};

        let owned = r::assessment_respondents.filter(r::participant_id.eq(participant));
        let updated = diesel::update(
            p::assessment_participants
                .filter(p::id.eq(participant))
                .filter(p::completed_notification_sent.eq(false))
                .filter(exists(owned.clone()))
                .filter(not(exists(
                    owned.filter(r::status.ne(RespondentStatus::Completed)),
                ))),
        )
        .set((
            p::completed_notification_sent.eq(true),
            p::status.eq(ParticipantStatus::Completed),
            p::completed_at.eq(Some(now)),
            p::updated_at.eq(now),
        ))
        .execute(conn)?;
        Ok(updated == 1)
    }

    pub fn awaiting_notification(
        conn: &mut PgConnection,
    ) -> Result<Vec<Uuid>, diesel::result::Error> {
        let rows = diesel::sql_query(AWAITING_NOTIFICATION_SQL).load::<ParticipantIdRow>(conn)?;
        Ok(rows.into_iter().map(|row| row.participant_id).collect())
    }
}
