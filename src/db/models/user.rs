use crate::db::enums::UserRole;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Queryable, Selectable, Identifiable, Serialize, Deserialize, Clone, Debug)]
#[diesel(table_name = crate::schema::users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: UserRole,
    pub manager_id: Option<Uuid>,
    pub mattermost_username: Option<String>,
    pub is_active: bool,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_string()
    }

    /// Chat handle used as the notification recipient, if the user linked one.
    pub fn chat_username(&self) -> Option<&str> {
        self.mattermost_username
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }
}

// Authenticated caller placed into request extensions by the auth middleware
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: UserRole,
}

impl From<&User> for AuthUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            name: user.full_name(),
            role: user.role,
        }
    }
}
