use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Queryable, Selectable, Identifiable, Serialize, Deserialize, Clone, Debug)]
#[diesel(table_name = crate::schema::categories)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub color: Option<String>,
    pub sort_order: i32,
}

#[derive(Queryable, Selectable, Identifiable, Serialize, Deserialize, Clone, Debug)]
#[diesel(table_name = crate::schema::questions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Question {
    pub id: Uuid,
    pub category_id: Uuid,
    pub question_text: String,
    pub sort_order: i32,
    pub is_active: bool,
}

#[derive(Serialize, Clone, Debug)]
pub struct QuestionWithCategory {
    pub question: Question,
    pub category: Category,
}
