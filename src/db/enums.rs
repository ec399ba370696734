use diesel::backend::Backend;
use diesel::deserialize::{self, FromSql};
use diesel::pg::Pg;
use diesel::serialize::{self, IsNull, Output, ToSql};
use diesel::sql_types::Text;
use diesel::{AsExpression, FromSqlRow};
use serde::{Deserialize, Serialize};
use std::io::Write;

/// Lifecycle of an assessment cycle. Moves forward only; `Cancelled` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsExpression, FromSqlRow)]
#[diesel(sql_type = Text)]
#[serde(rename_all = "lowercase")]
pub enum CycleStatus {
    Draft,
    Active,
    Completed,
    Cancelled,
}

impl CycleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CycleStatus::Draft => "draft",
            CycleStatus::Active => "active",
            CycleStatus::Completed => "completed",
            CycleStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, CycleStatus::Completed | CycleStatus::Cancelled)
    }
}

impl FromSql<Text, Pg> for CycleStatus {
    fn from_sql(bytes: <Pg as Backend>::RawValue<'_>) -> deserialize::Result<Self> {
        let s = <String as FromSql<Text, Pg>>::from_sql(bytes)?;
        match s.as_str() {
            "draft" => Ok(CycleStatus::Draft),
            "active" => Ok(CycleStatus::Active),
            "completed" => Ok(CycleStatus::Completed),
            "cancelled" => Ok(CycleStatus::Cancelled),
            _ => Err("Unrecognized cycle status".into()),
        }
    }
}

impl ToSql<Text, Pg> for CycleStatus {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        out.write_all(self.as_str().as_bytes())?;
        Ok(IsNull::No)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsExpression, FromSqlRow)]
#[diesel(sql_type = Text)]
#[serde(rename_all = "lowercase")]
pub enum ParticipantStatus {
    Pending,
    Active,
    Completed,
}

impl ParticipantStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParticipantStatus::Pending => "pending",
            ParticipantStatus::Active => "active",
            ParticipantStatus::Completed => "completed",
        }
    }
}

impl FromSql<Text, Pg> for ParticipantStatus {
    fn from_sql(bytes: <Pg as Backend>::RawValue<'_>) -> deserialize::Result<Self> {
        let s = <String as FromSql<Text, Pg>>::from_sql(bytes)?;
        match s.as_str() {
            "pending" => Ok(ParticipantStatus::Pending),
            "active" => Ok(ParticipantStatus::Active),
            "completed" => Ok(ParticipantStatus::Completed),
            _ => Err("Unrecognized participant status".into()),
        }
    }
}

impl ToSql<Text, Pg> for ParticipantStatus {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        out.write_all(self.as_str().as_bytes())?;
        Ok(IsNull::No)
    }
}

/// `Active` means the cycle is running and the evaluator has not opened the
/// survey yet; `InProgress` is set once they do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsExpression, FromSqlRow)]
#[diesel(sql_type = Text)]
#[serde(rename_all = "snake_case")]
pub enum RespondentStatus {
    Pending,
    Active,
    InProgress,
    Completed,
    Declined,
}

impl RespondentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RespondentStatus::Pending => "pending",
            RespondentStatus::Active => "active",
            RespondentStatus::InProgress => "in_progress",
            RespondentStatus::Completed => "completed",
            RespondentStatus::Declined => "declined",
        }
    }

    /// Statuses that still owe answers.
    pub fn is_outstanding(&self) -> bool {
        matches!(
            self,
            RespondentStatus::Pending | RespondentStatus::Active | RespondentStatus::InProgress
        )
    }
}

impl FromSql<Text, Pg> for RespondentStatus {
    fn from_sql(bytes: <Pg as Backend>::RawValue<'_>) -> deserialize::Result<Self> {
        let s = <String as FromSql<Text, Pg>>::from_sql(bytes)?;
        match s.as_str() {
            "pending" => Ok(RespondentStatus::Pending),
            "active" => Ok(RespondentStatus::Active),
            "in_progress" => Ok(RespondentStatus::InProgress),
            "completed" => Ok(RespondentStatus::Completed),
            "declined" => Ok(RespondentStatus::Declined),
            _ => Err("Unrecognized respondent status".into()),
        }
    }
}

impl ToSql<Text, Pg> for RespondentStatus {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        out.write_all(self.as_str().as_bytes())?;
        Ok(IsNull::No)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsExpression, FromSqlRow)]
#[diesel(sql_type = Text)]
#[serde(rename_all = "lowercase")]
pub enum RespondentType {
    #[serde(rename = "self")]
    SelfReview,
    Manager,
    Peer,
    Subordinate,
}

impl RespondentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RespondentType::SelfReview => "self",
            RespondentType::Manager => "manager",
            RespondentType::Peer => "peer",
            RespondentType::Subordinate => "subordinate",
        }
    }
}

impl FromSql<Text, Pg> for RespondentType {
    fn from_sql(bytes: <Pg as Backend>::RawValue<'_>) -> deserialize::Result<Self> {
        let s = <String as FromSql<Text, Pg>>::from_sql(bytes)?;
        match s.as_str() {
            "self" => Ok(RespondentType::SelfReview),
            "manager" => Ok(RespondentType::Manager),
            "peer" => Ok(RespondentType::Peer),
            "subordinate" => Ok(RespondentType::Subordinate),
            _ => Err("Unrecognized respondent type".into()),
        }
    }
}

impl ToSql<Text, Pg> for RespondentType {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        out.write_all(self.as_str().as_bytes())?;
        Ok(IsNull::No)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsExpression, FromSqlRow)]
#[diesel(sql_type = Text)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    Hr,
    Manager,
    User,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "admin",
            UserRole::Hr => "hr",
            UserRole::Manager => "manager",
            UserRole::User => "user",
        }
    }

    /// Roles allowed to run cycle administration (create, start, close).
    pub fn can_manage_cycles(&self) -> bool {
        matches!(self, UserRole::Admin | UserRole::Hr)
    }
}

impl FromSql<Text, Pg> for UserRole {
    fn from_sql(bytes: <Pg as Backend>::RawValue<'_>) -> deserialize::Result<Self> {
        let s = <String as FromSql<Text, Pg>>::from_sql(bytes)?;
        match s.as_str() {
            "admin" => Ok(UserRole::Admin),
            "hr" => Ok(UserRole::Hr),
            "manager" => Ok(UserRole::Manager),
            "user" => Ok(UserRole::User),
            _ => Err("Unrecognized user role".into()),
        }
    }
}

impl ToSql<Text, Pg> for UserRole {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        out.write_all(self.as_str().as_bytes())?;
        Ok(IsNull::No)
    }
}
