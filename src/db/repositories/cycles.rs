use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::db::enums::{CycleStatus, ParticipantStatus, RespondentStatus};
use crate::db::models::cycle::{ActivationCounts, Cycle, CycleChanges, CycleSummary, NewCycle};

pub struct CyclesRepo;

impl CyclesRepo {
    pub fn insert(
        conn: &mut PgConnection,
        new_cycle: &NewCycle,
    ) -> Result<Cycle, diesel::result::Error> {
        diesel::insert_into(crate::schema::assessment_cycles::table)
            .values(new_cycle)
            .get_result(conn)
    }

    pub fn find_by_id(
        conn: &mut PgConnection,
        cycle_id: Uuid,
    ) -> Result<Option<Cycle>, diesel::result::Error> {
        use crate::schema::assessment_cycles::dsl::*;
        assessment_cycles
            .filter(id.eq(cycle_id))
            .select(Cycle::as_select())
            .first::<Cycle>(conn)
            .optional()
    }

    /// Newest first, each with its participant count.
    pub fn list_with_participant_counts(
        conn: &mut PgConnection,
    ) -> Result<Vec<CycleSummary>, diesel::result::Error> {
        use crate::schema::assessment_cycles::dsl as c;
        use crate::schema::assessment_participants::dsl as p;

        let cycles = c::assessment_cycles
            .select(Cycle::as_select())
            .order(c::created_at.desc())
            .load::<Cycle>(conn)?;
        let counts: HashMap<Uuid, i64> = p::assessment_participants
            .group_by(p::cycle_id)
            .select((p::cycle_id, diesel::dsl::count(p::id)))
            .load::<(Uuid, i64)>(conn)?
            .into_iter()
            .collect();

        Ok(cycles
            .into_iter()
            .map(|cycle| CycleSummary {
                participants_count: counts.get(&cycle.id).copied().unwrap_or(0),
                cycle,
            })
            .collect())
    }

    /// Applies `changes` only while the cycle is still a draft.
    pub fn update_draft(
        conn: &mut PgConnection,
        cycle_id: Uuid,
        changes: &CycleChanges,
        now: DateTime<Utc>,
    ) -> Result<Option<Cycle>, diesel::result::Error> {
        use crate::schema::assessment_cycles::dsl as c;
        diesel::update(
            c::assessment_cycles
                .filter(c::id.eq(cycle_id))
                .filter(c::status.eq(CycleStatus::Draft)),
        )
        .set((changes, c::updated_at.eq(now)))
        .returning(Cycle::as_returning())
        .get_result(conn)
        .optional()
    }

    /// Moves a cycle to `to` only if it is currently in one of `from`.
    /// Returns whether this call performed the transition.
    pub fn transition_status(
        conn: &mut PgConnection,
        cycle_id: Uuid,
        from: &[CycleStatus],
        to: CycleStatus,
    ) -> Result<bool, diesel::result::Error> {
        use crate::schema::assessment_cycles::dsl as c;
        let updated = diesel::update(
            c::assessment_cycles
                .filter(c::id.eq(cycle_id))
                .filter(c::status.eq_any(from.to_vec())),
        )
        .set((c::status.eq(to), c::updated_at.eq(Utc::now())))
        .execute(conn)?;
        Ok(updated == 1)
    }

    /// Draft -> active for the cycle and everything it owns, in one transaction.
    /// Returns `None` when the cycle was no longer a draft.
    pub fn activate(
        conn: &mut PgConnection,
        cycle_id: Uuid,
        today: NaiveDate,
    ) -> Result<Option<ActivationCounts>, diesel::result::Error> {
        use crate::schema::assessment_cycles::dsl as c;
        use crate::schema::assessment_participants::dsl as p;
        use crate::schema::assessment_respondents::dsl as r;

        conn.transaction::<_, diesel::result::Error, _>(|conn| {
            let now = Utc::now();
            let flipped = diesel::update(
                c::assessment_cycles
                    .filter(c::id.eq(cycle_id))
                    .filter(c::status.eq(CycleStatus::Draft)),
            )
            .set((
                c::status.eq(CycleStatus::Active),
                c::start_date.eq(today),
                c::updated_at.eq(now),
            ))
            .execute(conn)?;

            if flipped == 0 {
                return Ok(None);
            }

            let participant_ids: Vec<Uuid> = p::assessment_participants
                .filter(p::cycle_id.eq(cycle_id))
                .select(p::id)
                .load(conn)?;

            let participants = diesel::update(
                p::assessment_participants
                    .filter(p::cycle_id.eq(cycle_id))
                    .filter(p::status.eq(ParticipantStatus::Pending)),
            )
            .set((p::status.eq(ParticipantStatus::Active), p::updated_at.eq(now)))
            .execute(conn)?;

            let respondents = diesel::update(
                r::assessment_respondents
                    .filter(r::participant_id.eq_any(&participant_ids))
                    .filter(r::status.eq(RespondentStatus::Pending)),
            )
            .set((r::status.eq(RespondentStatus::Active), r::updated_at.eq(now)))
            .execute(conn)?;

            Ok(Some(ActivationCounts {
                participants,
                respondents,
            }))
        })
    }
}
