pub mod config;
pub mod error;
pub mod metrics;
pub mod middleware;
pub mod progress;
pub mod reviews;
pub mod router;
pub mod state;
pub mod tracing;
pub mod v1;
pub mod validation;

pub use config::ApiConfig;
pub use state::ApiState;
