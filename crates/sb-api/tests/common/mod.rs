use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use chrono::{DateTime, TimeZone, Utc};
use http_body_util::BodyExt;
use sb_api::{config::Environment, router, state::ApiState};
use sb_db::{DocumentBackend, ManualClock, MemoryBackend, StoreRegistry};
use sb_srs::ReviewScheduler;
use serde::Deserialize;
use tower::ServiceExt;

/// Start of every test clock
pub fn test_start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 9, 1, 8, 0, 0).unwrap()
}

/// Test state builder for creating an ApiState with a controllable clock
pub struct TestStateBuilder {
    scheduler: ReviewScheduler,
    backend: Arc<dyn DocumentBackend>,
    clock: Arc<ManualClock>,
}

impl TestStateBuilder {
    pub fn new() -> Self {
        Self {
            scheduler: ReviewScheduler::default(),
            backend: Arc::new(MemoryBackend::new()),
            clock: Arc::new(ManualClock::new(test_start())),
        }
    }

    /// Use another document backend, e.g. JSON files in a temp dir
    pub fn with_backend(mut self, backend: Arc<dyn DocumentBackend>) -> Self {
        self.backend = backend;
        self
    }

    /// Build the state and return the clock driving it
    pub fn build(self) -> (ApiState, Arc<ManualClock>) {
        let registry = StoreRegistry::new(self.scheduler, self.clock.clone(), self.backend);
        let state = ApiState {
            registry,
            environment: Environment::Development,
        };
        (state, self.clock)
    }
}

impl Default for TestStateBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Build a client over the full router, returning the clock to move time
pub fn test_app() -> (TestClient, Arc<ManualClock>) {
    let (state, clock) = TestStateBuilder::new().build();
    (TestClient::new(router::router().with_state(state)), clock)
}

/// Helper to make requests to the test app
pub struct TestClient {
    router: Router,
}

impl TestClient {
    pub fn new(router: Router) -> Self {
        Self { router }
    }

    /// Send a request and get the response
    pub async fn request(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to execute request");

        let status = response.status();
        let headers = response.headers().clone();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to read response body")
            .to_bytes();

        TestResponse {
            status,
            body: body_bytes.to_vec(),
            headers,
        }
    }

    /// Send a GET request
    pub async fn get(&self, uri: &str) -> TestResponse {
        let request = Request::builder()
            .method("GET")
            .uri(uri)
            .body(Body::empty())
            .expect("Failed to build request");

        self.request(request).await
    }

    /// Send a POST request with JSON body
    pub async fn post_json<T: serde::Serialize>(&self, uri: &str, body: &T) -> TestResponse {
        let json_body = serde_json::to_string(body).expect("Failed to serialize body");

        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(json_body))
            .expect("Failed to build request");

        self.request(request).await
    }

    /// Send a POST request with a raw body
    pub async fn post_raw(&self, uri: &str, body: &'static str) -> TestResponse {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body))
            .expect("Failed to build request");

        self.request(request).await
    }
}

/// Test response wrapper
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Vec<u8>,
    #[allow(dead_code)]
    pub headers: axum::http::HeaderMap,
}

impl TestResponse {
    /// Get response body as string
    pub fn text(&self) -> String {
        String::from_utf8(self.body.clone()).expect("Response body is not valid UTF-8")
    }

    /// Parse response body as JSON
    pub fn json<T: for<'de> Deserialize<'de>>(&self) -> T {
        serde_json::from_slice(&self.body).expect("Failed to parse JSON response")
    }

    /// Assert status code
    pub fn assert_status(&self, expected: StatusCode) {
        assert_eq!(
            self.status,
            expected,
            "Expected status {}, got {}. Body: {}",
            expected,
            self.status,
            self.text()
        );
    }
}
