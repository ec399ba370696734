use chrono::NaiveDate;

use crate::error::AppError;

pub fn validate_create_cycle(name: &str, start_date: NaiveDate, end_date: NaiveDate) -> Result<(), AppError> {
    if name.trim().is_empty() {
        return Err(AppError::validation("Cycle name is required"));
    }
    if end_date < start_date {
        return Err(AppError::validation("End date cannot be before start date"));
    }
    Ok(())
}
