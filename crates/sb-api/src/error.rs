use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sb_db::StoreError;
use sb_srs::SrsError;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Cannot schedule: {0}")]
    Unprocessable(String),
    #[error("Store error: {0}")]
    Store(StoreError),
}

/// JSON body of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::InvalidArgument(message) => Self::Validation(message),
            err @ StoreError::NotFound { .. } => Self::NotFound(err.to_string()),
            StoreError::Scheduler(err @ SrsError::IntervalOverflow { .. }) => {
                Self::Unprocessable(err.to_string())
            }
            other => Self::Store(other),
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::Validation(errors.to_string())
    }
}

impl ApiError {
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            Self::Store(err) => {
                tracing::error!(error = %err, "Store operation failed");
                // Paths and OS errors stay in the logs.
                "Internal server error".to_string()
            }
            other => {
                tracing::debug!(error = %other, "Request rejected");
                other.to_string()
            }
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sb_db::PersistenceError;

    #[test]
    fn test_store_errors_map_to_status() {
        let invalid = ApiError::from(StoreError::InvalidArgument("bad score".to_string()));
        assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);

        let missing = ApiError::from(StoreError::NotFound {
            kind: "progress",
            topic: "Graphs".to_string(),
        });
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
        assert!(missing.to_string().contains("Graphs"));

        let persistence = ApiError::from(StoreError::Persistence(PersistenceError::InvalidDocument {
            location: "memory://alice/progress".to_string(),
            reason: "bad".to_string(),
        }));
        assert_eq!(persistence.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let overflow = ApiError::from(StoreError::Scheduler(SrsError::IntervalOverflow {
            days: 3_433_000.0,
        }));
        assert_eq!(overflow.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(overflow.to_string().contains("3433000 days"));
    }
}
