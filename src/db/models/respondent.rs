use crate::db::enums::{RespondentStatus, RespondentType};
use crate::db::models::{Cycle, Participant};
use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Queryable, Selectable, Identifiable, Serialize, Deserialize, Clone, Debug)]
#[diesel(table_name = crate::schema::assessment_respondents)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Respondent {
    pub id: Uuid,
    pub participant_id: Uuid,
    pub respondent_user_id: Uuid,
    pub respondent_type: RespondentType,
    pub status: RespondentStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Clone, Debug)]
#[diesel(table_name = crate::schema::assessment_respondents)]
pub struct NewRespondent {
    pub participant_id: Uuid,
    pub respondent_user_id: Uuid,
    pub respondent_type: RespondentType,
    pub status: RespondentStatus,
}

/// A respondent row together with the participant and cycle that own it.
#[derive(Clone, Debug)]
pub struct RespondentAssignment {
    pub respondent: Respondent,
    pub participant: Participant,
    pub cycle: Cycle,
}

/// One line of the evaluator's "my assessments" list.
#[derive(Serialize, Clone, Debug)]
pub struct AssessmentSummary {
    pub respondent_id: Uuid,
    pub participant_id: Uuid,
    pub participant_name: String,
    pub cycle_id: Uuid,
    pub cycle_name: String,
    pub cycle_description: Option<String>,
    pub end_date: NaiveDate,
    pub status: RespondentStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}
