use crate::error::AppError;
use crate::validation::rules;

pub fn validate_record_response(score: i32, comment: Option<&str>) -> Result<(), AppError> {
    if rules::validate_score(score).is_err() {
        return Err(AppError::validation(format!(
            "Rating must be between {} and {}",
            rules::MIN_SCORE,
            rules::MAX_SCORE
        )));
    }
    if let Some(comment) = comment {
        if rules::validate_comment(comment).is_err() {
            return Err(AppError::validation(format!(
                "Comment must be at most {} characters",
                rules::MAX_COMMENT_CHARS
            )));
        }
    }
    Ok(())
}
