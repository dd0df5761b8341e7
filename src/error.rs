use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ApiResponse;

/// Rejection of a malformed `(table_id, event_type, timestamp)` triple.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EventError {
    #[error("Missing table or event")]
    MissingField,
    #[error("table must be int, got '{0}'")]
    InvalidTableId(String),
    #[error("table must be non-negative, got {0}")]
    NegativeTableId(i64),
    #[error("event type {0:?} contains control characters")]
    ControlCharacter(String),
    #[error("event type is {len} characters, limit is {max}")]
    EventTypeTooLong { len: usize, max: usize },
    #[error("unparseable timestamp '{0}'")]
    InvalidTimestamp(String),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Invalid(EventError),
    #[error("call_log row {id}: {source}")]
    CorruptRow { id: i64, source: EventError },
    #[error("event store lock poisoned")]
    Poisoned,
    #[error("{path}:{line}: {source}")]
    MalformedLine {
        path: String,
        line: usize,
        source: EventError,
    },
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Errors surfaced by HTTP handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Invalid(#[from] EventError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Invalid(_) | ApiError::Store(StoreError::Invalid(_)) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "store access failed");
        }
        let body = ApiResponse::error(self.to_string());
        (status, Json(body)).into_response()
    }
}
