use std::collections::BTreeMap;
use std::sync::Arc;

use sb_srs::ReviewScheduler;

use crate::clock::Clock;
use crate::error::{PersistenceError, StoreError};
use crate::models::{
    ProgressDocument, ProgressSummary, QuizOutcome, QuizResult, ReviewSchedule,
    ReviewScheduleRecord, ScheduleDocument, ScheduleUpdate, StudentId, TopicPerformanceRecord,
};
use crate::persistence::{DocumentBackend, DocumentKind, load_document, save_document};
use crate::repositories::{progress, schedule};

/// One student's progress and review schedules.
///
/// Every mutation writes the affected document before returning. When that write
/// fails the in-memory state keeps the update and [`ProgressStore::flush`] can be
/// used to retry.
#[derive(Debug)]
pub struct ProgressStore {
    student: StudentId,
    scheduler: Arc<ReviewScheduler>,
    clock: Arc<dyn Clock>,
    backend: Arc<dyn DocumentBackend>,
    progress: ProgressDocument,
    schedule: ScheduleDocument,
}

impl ProgressStore {
    /// Load a student's documents, starting empty when none exist yet.
    ///
    /// # Errors
    ///
    /// A document that cannot be read, parsed or validated fails the whole load.
    pub fn open(
        student: StudentId,
        scheduler: Arc<ReviewScheduler>,
        clock: Arc<dyn Clock>,
        backend: Arc<dyn DocumentBackend>,
    ) -> Result<Self, StoreError> {
        let progress: ProgressDocument =
            load_document(backend.as_ref(), &student, DocumentKind::Progress)?.unwrap_or_default();
        validate_records(&progress, TopicPerformanceRecord::validate).map_err(|reason| {
            invalid_document(backend.as_ref(), &student, DocumentKind::Progress, reason)
        })?;

        let schedule: ScheduleDocument =
            load_document(backend.as_ref(), &student, DocumentKind::Schedule)?.unwrap_or_default();
        validate_records(&schedule, ReviewScheduleRecord::validate).map_err(|reason| {
            invalid_document(backend.as_ref(), &student, DocumentKind::Schedule, reason)
        })?;

        tracing::info!(
            student = %student,
            topics = progress.len(),
            scheduled = schedule.len(),
            "Loaded student documents"
        );

        Ok(Self {
            student,
            scheduler,
            clock,
            backend,
            progress,
            schedule,
        })
    }

    pub const fn student(&self) -> &StudentId {
        &self.student
    }

    pub const fn progress(&self) -> &ProgressDocument {
        &self.progress
    }

    pub const fn schedule(&self) -> &ScheduleDocument {
        &self.schedule
    }

    /// Record a quiz outcome and persist the progress document.
    pub fn record_quiz_result(&mut self, quiz: &QuizResult) -> Result<QuizOutcome, StoreError> {
        let now = self.clock.now();
        let outcome = progress::record_quiz_result(&mut self.progress, quiz, now)?;
        self.save(DocumentKind::Progress)?;
        Ok(outcome)
    }

    /// Record a review with a normalized performance and persist the schedule.
    pub fn advance_review_schedule(
        &mut self,
        topic: &str,
        performance: f64,
    ) -> Result<ScheduleUpdate, StoreError> {
        let now = self.clock.now();
        let update = schedule::advance(&mut self.schedule, &self.scheduler, topic, performance, now)?;
        self.save(DocumentKind::Schedule)?;
        Ok(update)
    }

    pub fn review_schedule(&self) -> ReviewSchedule {
        schedule::review_schedule(&self.schedule, self.clock.now())
    }

    pub fn progress_summary(&self) -> ProgressSummary {
        progress::summarize(&self.progress)
    }

    pub fn topic_progress(&self, topic: &str) -> Result<&TopicPerformanceRecord, StoreError> {
        progress::get_topic(&self.progress, topic)
    }

    pub fn topic_schedule(&self, topic: &str) -> Result<&ReviewScheduleRecord, StoreError> {
        schedule::get_schedule(&self.schedule, topic)
    }

    /// Topics due for review now, most urgent first.
    pub fn due_topics(&self) -> Vec<String> {
        schedule::due_topics(&self.progress, &self.schedule, self.clock.now())
    }

    /// Estimated retention of a reviewed topic.
    pub fn retention(&self, topic: &str, strength: f64) -> Result<f64, StoreError> {
        schedule::retention(&self.schedule, topic, strength, self.clock.now())
    }

    /// Write both documents again.
    pub fn flush(&self) -> Result<(), StoreError> {
        self.save(DocumentKind::Progress)?;
        self.save(DocumentKind::Schedule)?;
        Ok(())
    }

    fn save(&self, kind: DocumentKind) -> Result<(), StoreError> {
        let result = match kind {
            DocumentKind::Progress => {
                save_document(self.backend.as_ref(), &self.student, kind, &self.progress)
            }
            DocumentKind::Schedule => {
                save_document(self.backend.as_ref(), &self.student, kind, &self.schedule)
            }
        };

        result.map_err(|e| {
            tracing::error!(
                student = %self.student,
                document = %kind,
                error = %e,
                "Failed to save document"
            );
            StoreError::from(e)
        })
    }
}

fn validate_records<R>(
    doc: &BTreeMap<String, R>,
    validate: impl Fn(&R) -> Result<(), String>,
) -> Result<(), String> {
    for (topic, record) in doc {
        if topic.trim().is_empty() {
            return Err("topic names cannot be empty".to_string());
        }
        validate(record).map_err(|reason| format!("topic '{topic}': {reason}"))?;
    }
    Ok(())
}

fn invalid_document(
    backend: &dyn DocumentBackend,
    student: &StudentId,
    kind: DocumentKind,
    reason: String,
) -> PersistenceError {
    PersistenceError::InvalidDocument {
        location: backend.location(student, kind),
        reason,
    }
}
