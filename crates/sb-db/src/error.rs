use sb_srs::SrsError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Persistence failure: {0}")]
    Persistence(#[from] PersistenceError),
    #[error("No {kind} record for topic '{topic}'")]
    NotFound { kind: &'static str, topic: String },
    #[error("Scheduling error: {0}")]
    Scheduler(SrsError),
}

impl From<SrsError> for StoreError {
    fn from(err: SrsError) -> Self {
        match err {
            SrsError::InvalidArgument(message) => Self::InvalidArgument(message),
            other => Self::Scheduler(other),
        }
    }
}

/// Failure to read or write one of a student's documents.
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("IO error at {location}: {source}")]
    Io {
        location: String,
        #[source]
        source: std::io::Error,
    },
    #[error("JSON error in {location}: {source}")]
    Json {
        location: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Invalid document {location}: {reason}")]
    InvalidDocument { location: String, reason: String },
    #[error("Loading documents of {student} did not complete: {source}")]
    Load {
        student: String,
        #[source]
        source: tokio::task::JoinError,
    },
}
