use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use sb_db::models::{ProgressSummary, QuizOutcome, QuizResult, TopicPerformanceRecord};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{ApiState, error::ApiError, metrics::observe, validation};

/// Create the progress routes
pub fn routes() -> Router<ApiState> {
    Router::new()
        .route("/students/{student}/quiz-results", post(record_quiz_result))
        .route("/students/{student}/progress", get(get_progress_summary))
        .route(
            "/students/{student}/progress/{topic}",
            get(get_topic_progress),
        )
}

/// A finished quiz, as reported by the quiz agent.
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct QuizResultPayload {
    #[validate(length(min = 1, max = 200))]
    pub topic: String,
    /// Percentage in [0, 100]
    #[validate(range(min = 0.0, max = 100.0))]
    pub score: f64,
    pub total_questions: u32,
    #[serde(default)]
    #[validate(length(max = 2000))]
    pub notes: String,
}

impl From<QuizResultPayload> for QuizResult {
    fn from(payload: QuizResultPayload) -> Self {
        Self {
            topic: payload.topic,
            score: payload.score,
            total_questions: payload.total_questions,
            notes: payload.notes,
        }
    }
}

async fn record_quiz_result(
    State(state): State<ApiState>,
    Path(student): Path<String>,
    Json(payload): Json<QuizResultPayload>,
) -> Result<Json<QuizOutcome>, ApiError> {
    validation::validate_payload(&payload)?;

    let (student, store) = state.store(&student).await?;
    let outcome = observe(
        "record_quiz_result",
        store.lock().await.record_quiz_result(&payload.into()),
    )?;

    tracing::info!(
        student = %student,
        topic = %outcome.topic,
        score = outcome.topic_stats.last_score,
        trend = ?outcome.trend,
        "Quiz result recorded"
    );

    Ok(Json(outcome))
}

async fn get_progress_summary(
    State(state): State<ApiState>,
    Path(student): Path<String>,
) -> Result<Json<ProgressSummary>, ApiError> {
    let (_, store) = state.store(&student).await?;
    let summary = store.lock().await.progress_summary();
    Ok(Json(summary))
}

async fn get_topic_progress(
    State(state): State<ApiState>,
    Path((student, topic)): Path<(String, String)>,
) -> Result<Json<TopicPerformanceRecord>, ApiError> {
    let (_, store) = state.store(&student).await?;
    let store = store.lock().await;
    let record = observe("topic_progress", store.topic_progress(&topic).cloned())?;
    Ok(Json(record))
}
