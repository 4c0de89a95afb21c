use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    InvalidTimeZone(String),
    #[error("{0}")]
    InvalidInterval(String),
    #[error("{0}")]
    PastStart(String),
    #[error("{0}")]
    Overlap(String),
    #[error("{0}")]
    EntityNotFound(String),
    #[error("{0}")]
    ConcurrencyConflict(String),
    #[error("{0}")]
    UnprocessableEntity(String),
    #[error("{0}")]
    ValidationError(#[from] garde::Report),
    // ボディ・クエリ・パスが読み取れなかった
    #[error("{0}")]
    MalformedRequest(String),
    // sqlx::Error を引数にするヴァリアントが複数あるので、[from] は使えず [source] で代用している
    #[error("Could not run the transaction.")]
    TransactionError(#[source] sqlx::Error),
    #[error("An error occurred while running a database operation.")]
    SpecificOperationError(#[source] sqlx::Error),
    #[error("{0}")]
    ConversionEntityError(String),
}

impl AppError {
    /// Machine-readable name of the failure, sent to clients next to the message.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::InvalidTimeZone(_) => "InvalidTimeZone",
            AppError::InvalidInterval(_) => "InvalidInterval",
            AppError::PastStart(_) => "PastStart",
            AppError::Overlap(_) => "Overlap",
            AppError::EntityNotFound(_) => "NotFound",
            AppError::ConcurrencyConflict(_) => "ConcurrencyConflict",
            AppError::UnprocessableEntity(_) => "UnprocessableEntity",
            AppError::ValidationError(_) | AppError::MalformedRequest(_) => "InvalidRequest",
            AppError::TransactionError(_)
            | AppError::SpecificOperationError(_)
            | AppError::ConversionEntityError(_) => "InternalError",
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::ConcurrencyConflict(_))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status_code = match self {
            AppError::InvalidTimeZone(_)
            | AppError::InvalidInterval(_)
            | AppError::PastStart(_)
            | AppError::ValidationError(_)
            | AppError::MalformedRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Overlap(_) | AppError::ConcurrencyConflict(_) => StatusCode::CONFLICT,
            AppError::EntityNotFound(_) => StatusCode::NOT_FOUND,
            AppError::UnprocessableEntity(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ref e @ (AppError::TransactionError(_)
            | AppError::SpecificOperationError(_)
            | AppError::ConversionEntityError(_)) => {
                tracing::error!(
                    error.cause_chain = ?e,
                    error.message = %e,
                    "Unexpected error happened"
                );
                // 内部エラーの詳細はクライアントに返さない
                let body = json!({
                    "kind": self.kind(),
                    "message": "The service is temporarily unavailable.",
                });
                return (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response();
            }
        };
        let body = json!({
            "kind": self.kind(),
            "message": self.to_string(),
        });
        (status_code, Json(body)).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(value: JsonRejection) -> Self {
        AppError::MalformedRequest(value.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(value: QueryRejection) -> Self {
        AppError::MalformedRequest(value.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(value: PathRejection) -> Self {
        AppError::MalformedRequest(value.body_text())
    }
}

pub type AppResult<T> = Result<T, AppError>;
