use crate::db::enums::ParticipantStatus;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Queryable, Selectable, Identifiable, Serialize, Deserialize, Clone, Debug)]
#[diesel(table_name = crate::schema::assessment_participants)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Participant {
    pub id: Uuid,
    pub cycle_id: Uuid,
    pub user_id: Uuid,
    pub status: ParticipantStatus,
    pub completed_notification_sent: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Clone, Debug)]
#[diesel(table_name = crate::schema::assessment_participants)]
pub struct NewParticipant {
    pub cycle_id: Uuid,
    pub user_id: Uuid,
    pub status: ParticipantStatus,
}

#[derive(Serialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RespondentCounts {
    pub total: i64,
    pub completed: i64,
}

impl RespondentCounts {
    /// Empty respondent sets never count as fully evaluated.
    pub fn all_completed(&self) -> bool {
        self.total > 0 && self.completed == self.total
    }
}

/// A running-cycle participation whose subject has not picked enough evaluators yet.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PendingRespondentSelection {
    pub participant_id: Uuid,
    pub cycle_id: Uuid,
    pub cycle_name: String,
    pub cycle_description: Option<String>,
    pub respondents_count: i64,
    pub min_required: i64,
}
