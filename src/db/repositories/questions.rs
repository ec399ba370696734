use diesel::prelude::*;
use uuid::Uuid;

use crate::db::models::question::{Category, Question};

pub struct QuestionsRepo;

impl QuestionsRepo {
    /// Active questions in display order: category order first, then question order.
    pub fn list_active_with_categories(
        conn: &mut PgConnection,
    ) -> Result<Vec<(Question, Category)>, diesel::result::Error> {
        use crate::schema::{categories, questions};
        questions::table
            .inner_join(categories::table)
            .filter(questions::is_active.eq(true))
            .select((Question::as_select(), Category::as_select()))
            .order((
                categories::sort_order.asc(),
                categories::name.asc(),
                questions::sort_order.asc(),
            ))
            .load(conn)
    }

    pub fn find_active(
        conn: &mut PgConnection,
        question_id: Uuid,
    ) -> Result<Option<Question>, diesel::result::Error> {
        use crate::schema::questions::dsl::*;
        questions
            .filter(id.eq(question_id))
            .filter(is_active.eq(true))
            .select(Question::as_select())
            .first::<Question>(conn)
            .optional()
    }
}
