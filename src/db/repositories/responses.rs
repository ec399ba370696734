use chrono::Utc;
use diesel::prelude::*;
use diesel::upsert::excluded;
use uuid::Uuid;

use crate::db::models::response::{NewResponse, Response};

pub struct ResponsesRepo;

impl ResponsesRepo {
    /// Single-statement upsert keyed on (respondent_id, question_id).
    pub fn upsert(
        conn: &mut PgConnection,
        new_response: &NewResponse,
    ) -> Result<Response, diesel::result::Error> {
        use crate::schema::assessment_responses::dsl::*;
        diesel::insert_into(assessment_responses)
            .values(new_response)
            .on_conflict((respondent_id, question_id))
            .do_update()
            .set((
                score.eq(excluded(score)),
                comment.eq(excluded(comment)),
                updated_at.eq(Utc::now()),
            ))
            .get_result(conn)
    }

    pub fn list_by_respondent(
        conn: &mut PgConnection,
        respondent: Uuid,
    ) -> Result<Vec<Response>, diesel::result::Error> {
        use crate::schema::assessment_responses::dsl::*;
        assessment_responses
            .filter(respondent_id.eq(respondent))
            .select(Response::as_select())
            .load::<Response>(conn)
    }
}
