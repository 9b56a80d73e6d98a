//! Per-student progress and review-schedule storage for Study Buddy.
//!
//! A [`ProgressStore`] owns one student's topic statistics and spaced repetition
//! schedules, delegates all timing math to [`sb_srs::ReviewScheduler`] and writes
//! both documents through a [`DocumentBackend`] before a mutation returns.

pub mod clock;
pub mod error;
pub mod models;
pub mod persistence;
pub mod registry;
pub mod repositories;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{PersistenceError, StoreError};
pub use models::StudentId;
pub use persistence::{DocumentBackend, DocumentKind, JsonFileBackend, MemoryBackend};
pub use registry::{StoreHandle, StoreRegistry};
pub use store::ProgressStore;
