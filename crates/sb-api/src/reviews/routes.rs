use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use sb_db::models::{ReviewSchedule, ReviewScheduleRecord, ScheduleUpdate};
use sb_srs::DEFAULT_STRENGTH;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{ApiState, error::ApiError, metrics::observe, validation};

/// Create the review schedule routes
pub fn routes() -> Router<ApiState> {
    Router::new()
        .route(
            "/students/{student}/reviews",
            get(get_review_schedule).post(advance_review_schedule),
        )
        .route("/students/{student}/reviews/due", get(get_due_topics))
        .route("/students/{student}/reviews/{topic}", get(get_topic_schedule))
        .route(
            "/students/{student}/reviews/{topic}/retention",
            get(get_retention),
        )
}

/// A completed review with a normalized performance.
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct ReviewPayload {
    #[validate(length(min = 1, max = 200))]
    pub topic: String,
    /// Score in [0, 1]
    #[validate(range(min = 0.0, max = 1.0))]
    pub performance: f64,
}

#[derive(Debug, Deserialize)]
pub struct RetentionQuery {
    #[serde(default = "default_strength")]
    pub strength: f64,
}

const fn default_strength() -> f64 {
    DEFAULT_STRENGTH
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RetentionResponse {
    pub topic: String,
    pub strength: f64,
    pub retention: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DueTopicsResponse {
    /// Most urgent first
    pub topics: Vec<String>,
    pub total: usize,
}

async fn advance_review_schedule(
    State(state): State<ApiState>,
    Path(student): Path<String>,
    Json(payload): Json<ReviewPayload>,
) -> Result<Json<ScheduleUpdate>, ApiError> {
    validation::validate_payload(&payload)?;

    let (student, store) = state.store(&student).await?;
    let update = observe(
        "advance_review_schedule",
        store
            .lock()
            .await
            .advance_review_schedule(&payload.topic, payload.performance),
    )?;

    tracing::info!(
        student = %student,
        topic = %update.topic,
        repetition_number = update.repetition_number,
        days_until_review = update.days_until_review,
        "Review schedule advanced"
    );

    Ok(Json(update))
}

async fn get_review_schedule(
    State(state): State<ApiState>,
    Path(student): Path<String>,
) -> Result<Json<ReviewSchedule>, ApiError> {
    let (_, store) = state.store(&student).await?;
    let schedule = store.lock().await.review_schedule();
    Ok(Json(schedule))
}

async fn get_due_topics(
    State(state): State<ApiState>,
    Path(student): Path<String>,
) -> Result<Json<DueTopicsResponse>, ApiError> {
    let (_, store) = state.store(&student).await?;
    let topics = store.lock().await.due_topics();
    Ok(Json(DueTopicsResponse {
        total: topics.len(),
        topics,
    }))
}

async fn get_topic_schedule(
    State(state): State<ApiState>,
    Path((student, topic)): Path<(String, String)>,
) -> Result<Json<ReviewScheduleRecord>, ApiError> {
    let (_, store) = state.store(&student).await?;
    let store = store.lock().await;
    let record = observe("topic_schedule", store.topic_schedule(&topic).cloned())?;
    Ok(Json(record))
}

async fn get_retention(
    State(state): State<ApiState>,
    Path((student, topic)): Path<(String, String)>,
    Query(query): Query<RetentionQuery>,
) -> Result<Json<RetentionResponse>, ApiError> {
    let strength = validation::validate_strength(query.strength)?;

    let (_, store) = state.store(&student).await?;
    let retention = observe("retention", store.lock().await.retention(&topic, strength))?;

    Ok(Json(RetentionResponse {
        topic: topic.trim().to_string(),
        strength,
        retention,
    }))
}
