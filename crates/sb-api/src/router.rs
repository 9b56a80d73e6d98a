use axum::{Json, Router, http::StatusCode, response::IntoResponse, routing::get};

use crate::{error::ErrorBody, state::ApiState, v1};

pub fn router() -> Router<ApiState> {
    Router::new()
        .route("/health", get(health))
        .nest("/v1", v1::routes())
        .fallback(handler_404)
}

async fn health() -> StatusCode {
    StatusCode::OK
}

async fn handler_404() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorBody {
            error: "The requested resource was not found".to_string(),
        }),
    )
}
