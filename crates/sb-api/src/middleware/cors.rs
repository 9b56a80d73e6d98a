use axum::http::{HeaderValue, Method, header};
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::config::Environment;

/// Creates the CORS layer for the agent-facing API
///
/// # Arguments
/// * `allowed_origins` - Origin URLs allowed to call the API
/// * `environment` - Deployment environment
///
/// # Returns
/// - With no configured origin in development: a permissive layer, so local tools can
///   call the API from any port
/// - Otherwise: only the listed origins (invalid entries are skipped and logged), with
///   `GET`, `POST` and `OPTIONS` and the JSON headers
pub fn create_cors_layer(allowed_origins: &[String], environment: Environment) -> CorsLayer {
    if allowed_origins.is_empty() && environment.is_development() {
        return CorsLayer::very_permissive();
    }

    let origins = allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect::<Vec<_>>();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Router, body::Body, http::Request, routing::get};
    use tower::ServiceExt;

    async fn call_with_origin(layer: CorsLayer, origin: &str) -> Option<HeaderValue> {
        let app = Router::new().route("/health", get(|| async { "OK" })).layer(layer);
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .header(header::ORIGIN, origin)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .cloned()
    }

    #[tokio::test]
    async fn test_listed_origin_is_allowed() {
        let layer = create_cors_layer(
            &["https://tutor.example".to_string()],
            Environment::Production,
        );
        assert_eq!(
            call_with_origin(layer, "https://tutor.example").await,
            Some(HeaderValue::from_static("https://tutor.example"))
        );
    }

    #[tokio::test]
    async fn test_unlisted_origin_is_rejected() {
        let layer = create_cors_layer(
            &["https://tutor.example".to_string()],
            Environment::Production,
        );
        assert_eq!(call_with_origin(layer, "https://evil.example").await, None);
    }

    #[tokio::test]
    async fn test_development_without_origins_is_permissive() {
        let layer = create_cors_layer(&[], Environment::Development);
        assert!(call_with_origin(layer, "http://localhost:5173").await.is_some());
    }
}
