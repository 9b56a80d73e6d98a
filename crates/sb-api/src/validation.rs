use sb_db::StudentId;
use validator::Validate;

use crate::error::ApiError;

/// Validate the student identifier of a request path
///
/// # Examples
/// ```
/// use sb_api::validation::parse_student_id;
///
/// assert!(parse_student_id("alice").is_ok());
/// assert!(parse_student_id("../alice").is_err());
/// ```
pub fn parse_student_id(raw: &str) -> Result<StudentId, ApiError> {
    StudentId::parse(raw).map_err(ApiError::from)
}

/// Run the `validator` rules of a request payload.
pub fn validate_payload<T: Validate>(payload: &T) -> Result<(), ApiError> {
    payload.validate().map_err(ApiError::from)
}

/// Validate a memory strength passed as a query parameter.
pub fn validate_strength(strength: f64) -> Result<f64, ApiError> {
    if !strength.is_finite() || strength <= 0.0 {
        return Err(ApiError::Validation(format!(
            "strength must be a positive number, got {strength}"
        )));
    }
    Ok(strength)
}
