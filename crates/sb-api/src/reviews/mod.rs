mod routes;

pub use routes::{DueTopicsResponse, RetentionQuery, RetentionResponse, ReviewPayload, routes};
