pub mod cycle;
pub mod response;

use axum::{
    Json, async_trait,
    extract::FromRequest,
    http::Request,
};
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::{db::models::api::ErrorDetail, error::AppError};

/// JSON extractor that runs `validator` rules before the handler sees the body.
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S, axum::body::Body> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request<axum::body::Body>, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| AppError::validation(format!("Invalid JSON body: {}", rejection)))?;

        value.validate().map_err(|errors| {
            let details: Vec<ErrorDetail> = errors
                .field_errors()
                .iter()
                .flat_map(|(field, field_errors)| {
                    field_errors.iter().map(move |error| ErrorDetail {
                        field: Some(field.to_string()),
                        code: error.code.to_string(),
                        message: error
                            .message
                            .as_ref()
                            .map(|m| m.to_string())
                            .unwrap_or_else(|| format!("Validation failed for field: {}", field)),
                    })
                })
                .collect();

            let summary = details
                .iter()
                .map(|d| d.message.as_str())
                .collect::<Vec<_>>()
                .join("; ");
            AppError::validation(summary)
        })?;

        Ok(ValidatedJson(value))
    }
}

/// Shared validation rules
pub mod rules {
    use validator::ValidationError;

    pub const MIN_SCORE: i32 = 1;
    pub const MAX_SCORE: i32 = 5;
    pub const MAX_COMMENT_CHARS: usize = 2000;

    pub fn validate_score(score: i32) -> Result<(), ValidationError> {
        if !(MIN_SCORE..=MAX_SCORE).contains(&score) {
            return Err(ValidationError::new("score_out_of_range"));
        }
        Ok(())
    }

    /// Counted in characters, not bytes.
    pub fn validate_comment(comment: &str) -> Result<(), ValidationError> {
        if comment.chars().count() > MAX_COMMENT_CHARS {
            return Err(ValidationError::new("comment_too_long"));
        }
        Ok(())
    }
}
