use serde::Serialize;

// Unified API response envelope
#[derive(Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub code: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<ErrorDetail>>,
    pub timestamp: String,
}

#[derive(Serialize, Debug, Clone)]
pub struct ErrorDetail {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub code: String,
    pub message: String,
}

impl ErrorDetail {
    fn general(code: &str, message: &str) -> Self {
        Self {
            field: None,
            code: code.to_string(),
            message: message.to_string(),
        }
    }
}

impl<T> ApiResponse<T> {
    pub fn success(data: T, message: &str) -> Self {
        Self {
            success: true,
            code: 200,
            message: message.to_string(),
            data: Some(data),
            errors: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Success without a payload.
    pub fn ok(message: &str) -> Self {
        Self {
            success: true,
            code: 200,
            message: message.to_string(),
            data: None,
            errors: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn created(data: T, message: &str) -> Self {
        Self {
            success: true,
            code: 201,
            message: message.to_string(),
            data: Some(data),
            errors: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn error(code: u16, message: &str, errors: Vec<ErrorDetail>) -> Self {
        Self {
            success: false,
            code,
            message: message.to_string(),
            data: None,
            errors: Some(errors),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Error envelope that still carries a payload the caller can act on,
    /// e.g. current progress for an incomplete submission.
    pub fn error_with_data(code: u16, error_code: &str, message: &str, data: T) -> Self {
        Self {
            success: false,
            code,
            message: message.to_string(),
            data: Some(data),
            errors: Some(vec![ErrorDetail::general(error_code, message)]),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn bad_request(message: &str) -> Self {
        Self::error(400, message, vec![ErrorDetail::general("BAD_REQUEST", message)])
    }

    pub fn precondition_failed(message: &str, error_code: &str) -> Self {
        Self::error(400, message, vec![ErrorDetail::general(error_code, message)])
    }

    pub fn unauthorized(message: &str) -> Self {
        Self::error(401, message, vec![ErrorDetail::general("UNAUTHORIZED", message)])
    }

    pub fn forbidden(message: &str) -> Self {
        Self::error(403, message, vec![ErrorDetail::general("FORBIDDEN", message)])
    }

    pub fn not_found(message: &str) -> Self {
        Self::error(404, message, vec![ErrorDetail::general("NOT_FOUND", message)])
    }

    pub fn conflict(message: &str, field: Option<String>, error_code: &str) -> Self {
        Self::error(
            409,
            message,
            vec![ErrorDetail {
                field,
                code: error_code.to_string(),
                message: message.to_string(),
            }],
        )
    }

    pub fn internal_error(message: &str) -> Self {
        Self::error(500, message, vec![ErrorDetail::general("INTERNAL_ERROR", message)])
    }
}

// Business error codes
pub mod error_codes {
    // Assessment flow
    pub const ASSESSMENT_INCOMPLETE: &str = "ASSESSMENT_001";

    // Cycle lifecycle
    pub const CYCLE_ALREADY_ACTIVE: &str = "CYCLE_001";
    pub const CYCLE_NO_PARTICIPANTS: &str = "CYCLE_002";

    // Scheduler
    pub const SCHEDULER_JOB_RUNNING: &str = "SCHEDULER_001";

    // General preconditions
    pub const PRECONDITION_FAILED: &str = "PRECONDITION_001";
}
