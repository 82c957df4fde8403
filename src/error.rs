use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::repository::RepositoryError;

/// Fixed message returned for any gateway failure. The cause is logged, never returned.
pub const DATABASE_ERROR: &str = "database error";
/// Fixed message returned when finding, creating or associating tags fails.
pub const TAG_OPERATION_FAILED: &str = "tag operation failed";

/// ApiError
///
/// The error taxonomy shared by every workflow. Handlers return it directly and axum
/// serializes it through the `IntoResponse` impl below.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// Actor missing, lacking the ADMIN grant, or not the owner of the resource.
    #[error("{0}")]
    Authorization(String),
    /// A referenced entity does not exist.
    #[error("{0}")]
    NotFound(String),
    /// Malformed or inconsistent input.
    #[error("{0}")]
    Validation(String),
    /// Any persistence failure. Deliberately opaque.
    #[error("{0}")]
    Persistence(&'static str),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Authorization(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Logs the repository failure and replaces it with `message`.
    pub fn persistence(message: &'static str, source: RepositoryError) -> Self {
        tracing::error!(error = %source, "{message}");
        ApiError::Persistence(message)
    }
}

impl From<RepositoryError> for ApiError {
    fn from(source: RepositoryError) -> Self {
        ApiError::persistence(DATABASE_ERROR, source)
    }
}

/// ErrorResponse
///
/// JSON body sent for every failed request.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub status: u16,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        tracing::warn!(error = %self, %status, "Replying with error");

        let body = ErrorResponse {
            status: status.as_u16(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
