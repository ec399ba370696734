use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Queryable, Selectable, Identifiable, Serialize, Deserialize, Clone, Debug)]
#[diesel(table_name = crate::schema::assessment_responses)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Response {
    pub id: Uuid,
    pub respondent_id: Uuid,
    pub question_id: Uuid,
    pub score: i32,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Clone, Debug)]
#[diesel(table_name = crate::schema::assessment_responses)]
pub struct NewResponse {
    pub respondent_id: Uuid,
    pub question_id: Uuid,
    pub score: i32,
    pub comment: Option<String>,
}
