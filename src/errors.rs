use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Test unavailable: {0}")]
    TestUnavailable(String),

    #[error("Not eligible: {0}")]
    NotEligible(String),

    #[error("Attempt limit exceeded: {0}")]
    AttemptLimitExceeded(String),

    #[error("Attempt not in progress: {0}")]
    AttemptNotInProgress(String),

    #[error("Question out of order: {0}")]
    QuestionOutOfOrder(String),

    #[error("Invalid answer option: {0}")]
    InvalidAnswerOption(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Internal server error: {0}")]
    InternalError(String),
}

impl AppError {
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::TestUnavailable(_) => "TEST_UNAVAILABLE",
            AppError::NotEligible(_) => "NOT_ELIGIBLE",
            AppError::AttemptLimitExceeded(_) => "ATTEMPT_LIMIT_EXCEEDED",
            AppError::AttemptNotInProgress(_) => "ATTEMPT_NOT_IN_PROGRESS",
            AppError::QuestionOutOfOrder(_) => "QUESTION_OUT_OF_ORDER",
            AppError::InvalidAnswerOption(_) => "INVALID_ANSWER_OPTION",
            AppError::AlreadyExists(_) => "ALREADY_EXISTS",
            AppError::ValidationError(_) => "VALIDATION_ERROR",
            AppError::DatabaseError(_) => "DATABASE_ERROR",
            AppError::InternalError(_) => "INTERNAL_ERROR",
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
    pub status: u16,
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) | AppError::TestUnavailable(_) => StatusCode::NOT_FOUND,
            AppError::NotEligible(_) => StatusCode::FORBIDDEN,
            AppError::AttemptLimitExceeded(_)
            | AppError::AttemptNotInProgress(_)
            | AppError::QuestionOutOfOrder(_)
            | AppError::AlreadyExists(_) => StatusCode::CONFLICT,
            AppError::InvalidAnswerOption(_) | AppError::ValidationError(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::DatabaseError(_) | AppError::InternalError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        if matches!(
            self,
            AppError::NotFound(_)
                | AppError::InvalidAnswerOption(_)
                | AppError::DatabaseError(_)
                | AppError::InternalError(_)
        ) {
            log::warn!("request failed: {}", self);
        }

        HttpResponse::build(self.status_code()).json(ErrorResponse {
            error: self.to_string(),
            code: self.error_code(),
            status: self.status_code().as_u16(),
        })
    }
}

impl From<mongodb::error::Error> for AppError {
    fn from(err: mongodb::error::Error) -> Self {
        AppError::DatabaseError(err.to_string())
    }
}

impl From<mongodb::bson::ser::Error> for AppError {
    fn from(err: mongodb::bson::ser::Error) -> Self {
        AppError::InternalError(format!("BSON serialization error: {}", err))
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::ValidationError(err.to_string())
    }
}

pub type AppResult<T> = Result<T, AppError>;
