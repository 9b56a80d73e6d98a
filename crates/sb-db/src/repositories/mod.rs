// Repository functions work on a student's in-memory documents and take "now" as an
// argument; loading and saving is the job of `ProgressStore`.

pub mod progress;
pub mod schedule;

use crate::error::StoreError;

/// Validate a topic name and return it trimmed.
pub(crate) fn validate_topic(topic: &str) -> Result<&str, StoreError> {
    let topic = topic.trim();
    if topic.is_empty() {
        return Err(StoreError::InvalidArgument(
            "topic cannot be empty".to_string(),
        ));
    }
    Ok(topic)
}
