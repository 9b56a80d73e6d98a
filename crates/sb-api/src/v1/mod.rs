use axum::Router;

use crate::{progress, reviews, state::ApiState};

/// V1 API routes
pub fn routes() -> Router<ApiState> {
    Router::new()
        .merge(progress::routes())
        .merge(reviews::routes())
}
