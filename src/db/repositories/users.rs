use diesel::prelude::*;
use uuid::Uuid;

use crate::db::models::user::User;

pub struct UsersRepo;

impl UsersRepo {
    pub fn find_by_id(
        conn: &mut PgConnection,
        user_id: Uuid,
    ) -> Result<Option<User>, diesel::result::Error> {
        use crate::schema::users::dsl::*;
        users
            .filter(id.eq(user_id))
            .select(User::as_select())
            .first::<User>(conn)
            .optional()
    }

    pub fn list_by_ids(
        conn: &mut PgConnection,
        user_ids: &[Uuid],
    ) -> Result<Vec<User>, diesel::result::Error> {
        use crate::schema::users::dsl::*;
        users
            .filter(id.eq_any(user_ids.to_vec()))
            .select(User::as_select())
            .load::<User>(conn)
    }
}
