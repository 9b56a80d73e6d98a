use std::sync::Arc;

use sb_db::{
    DocumentBackend, JsonFileBackend, MemoryBackend, StoreHandle, StoreRegistry, StudentId,
    SystemClock,
};
use sb_srs::ReviewScheduler;

use crate::{ApiConfig, config::Environment, error::ApiError, metrics, validation};

#[derive(Clone, Debug)]
pub struct ApiState {
    pub registry: StoreRegistry,
    pub environment: Environment,
}

impl ApiState {
    pub fn new(config: &ApiConfig) -> anyhow::Result<Self> {
        let scheduler = ReviewScheduler::new(config.scheduler_config())?;

        let backend: Arc<dyn DocumentBackend> = if config.use_file_persistence {
            tracing::info!(data_dir = %config.data_dir.display(), "Using JSON file persistence");
            Arc::new(JsonFileBackend::new(&config.data_dir))
        } else {
            tracing::warn!("File persistence disabled, progress is kept in memory only");
            Arc::new(MemoryBackend::new())
        };

        Ok(Self {
            registry: StoreRegistry::new(scheduler, Arc::new(SystemClock), backend),
            environment: config.env,
        })
    }

    /// Get the store of the student named in a request path.
    pub async fn store(&self, student: &str) -> Result<(StudentId, StoreHandle), ApiError> {
        let student = validation::parse_student_id(student)?;
        let handle = metrics::observe("open_store", self.registry.open(&student).await)?;
        Ok((student, handle))
    }
}
