use uuid::Uuid;

use crate::db::enums::UserRole;
use crate::db::models::AuthUser;
use crate::error::AppError;

#[derive(Clone, Debug)]
pub struct RequestContext {
    pub user_id: Uuid,
    pub role: UserRole,
}

impl RequestContext {
    pub fn new(user_id: Uuid, role: UserRole) -> Self {
        Self { user_id, role }
    }

    pub fn require_cycle_admin(&self) -> Result<(), AppError> {
        if self.role.can_manage_cycles() {
            Ok(())
        } else {
            Err(AppError::forbidden("Only administrators and HR can manage cycles"))
        }
    }
}

impl From<&AuthUser> for RequestContext {
    fn from(user: &AuthUser) -> Self {
        Self::new(user.id, user.role)
    }
}
