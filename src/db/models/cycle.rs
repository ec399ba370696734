use crate::db::enums::CycleStatus;
use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Queryable, Selectable, Identifiable, Serialize, Deserialize, Clone, Debug)]
#[diesel(table_name = crate::schema::assessment_cycles)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Cycle {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_by: Option<Uuid>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: CycleStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Clone, Debug)]
#[diesel(table_name = crate::schema::assessment_cycles)]
pub struct NewCycle {
    pub name: String,
    pub description: Option<String>,
    pub created_by: Option<Uuid>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: CycleStatus,
}

/// Editable cycle fields. Only draft cycles accept changes.
#[derive(AsChangeset, Clone, Debug)]
#[diesel(table_name = crate::schema::assessment_cycles)]
pub struct CycleChanges {
    pub name: String,
    pub description: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// Cycle list entry.
#[derive(Serialize, Clone, Debug)]
pub struct CycleSummary {
    #[serde(flatten)]
    pub cycle: Cycle,
    pub participants_count: i64,
}

/// Informational aggregate over a cycle's participants and respondents.
#[derive(Serialize, Clone, Debug, Default, PartialEq)]
pub struct CycleProgress {
    pub cycle_id: Uuid,
    pub participants_total: i64,
    pub participants_completed: i64,
    pub respondents_total: i64,
    pub respondents_completed: i64,
    pub percentage: i64,
}

/// Row counts touched by the activation transaction.
#[derive(Serialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ActivationCounts {
    pub participants: usize,
    pub respondents: usize,
}
