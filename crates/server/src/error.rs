//! Application error handling

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use hims_core::{HimsError, IssueType, Outcome};
use tokio_postgres::error::SqlState;

/// Application error type
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Conflict(String),
    /// Request was well-formed but breaks a business rule (stock, status flow)
    #[error("{0}")]
    BusinessRule(String),
    /// Rejected by a database constraint
    #[error("{0}")]
    Unprocessable(String),
    #[error("{0}")]
    Internal(String),
}

impl AppError {
    pub fn not_found(kind: &str, id: impl std::fmt::Display) -> Self {
        AppError::NotFound(format!("{kind}/{id} not found"))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, outcome) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, Outcome::not_found(&msg)),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, Outcome::invalid(&msg)),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, Outcome::conflict(&msg)),
            AppError::BusinessRule(msg) => (
                StatusCode::CONFLICT,
                Outcome::error(IssueType::BusinessRule, &msg),
            ),
            AppError::Unprocessable(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Outcome::error(IssueType::Processing, &msg),
            ),
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Outcome::error(IssueType::Exception, &msg),
                )
            }
        };

        (status, Json(outcome)).into_response()
    }
}

impl From<HimsError> for AppError {
    fn from(err: HimsError) -> Self {
        let msg = err.to_string();
        match err {
            HimsError::NotFound(_) => AppError::NotFound(msg),
            HimsError::Invalid(_) => AppError::BadRequest(msg),
            HimsError::Conflict(_) => AppError::Conflict(msg),
            HimsError::InsufficientStock { .. } | HimsError::InvalidTransition { .. } => {
                AppError::BusinessRule(msg)
            }
        }
    }
}

impl From<deadpool_postgres::PoolError> for AppError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        AppError::Internal(format!("Database pool error: {}", err))
    }
}

impl From<tokio_postgres::Error> for AppError {
    fn from(err: tokio_postgres::Error) -> Self {
        let Some(db) = err.as_db_error() else {
            return AppError::Internal(format!("Database error: {}", err));
        };
        let code = db.code();
        if *code == SqlState::UNIQUE_VIOLATION {
            AppError::Conflict(format!(
                "Duplicate record ({})",
                db.constraint().unwrap_or("unique constraint")
            ))
        } else if *code == SqlState::FOREIGN_KEY_VIOLATION
            || *code == SqlState::CHECK_VIOLATION
            || *code == SqlState::NUMERIC_VALUE_OUT_OF_RANGE
        {
            AppError::Unprocessable(db.message().to_string())
        } else {
            AppError::Internal(format!("Database error: {}", db.message()))
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}
