use std::collections::HashMap;
use std::sync::{Arc, PoisonError};

use sb_srs::ReviewScheduler;
use tokio::sync::{Mutex, OnceCell};

use crate::clock::Clock;
use crate::error::{PersistenceError, StoreError};
use crate::models::StudentId;
use crate::persistence::DocumentBackend;
use crate::store::ProgressStore;

/// Shared handle to one student's store.
pub type StoreHandle = Arc<Mutex<ProgressStore>>;

type StoreSlot = Arc<OnceCell<StoreHandle>>;

/// Hands out one [`ProgressStore`] per student.
///
/// Stores are loaded on first use and kept for the lifetime of the registry. Each
/// one sits behind its own async mutex, so a student has a single writer while
/// different students never wait on each other. Documents are read on the blocking
/// pool with the registry map unlocked.
#[derive(Debug, Clone)]
pub struct StoreRegistry {
    scheduler: Arc<ReviewScheduler>,
    clock: Arc<dyn Clock>,
    backend: Arc<dyn DocumentBackend>,
    stores: Arc<std::sync::Mutex<HashMap<StudentId, StoreSlot>>>,
}

impl StoreRegistry {
    pub fn new(
        scheduler: ReviewScheduler,
        clock: Arc<dyn Clock>,
        backend: Arc<dyn DocumentBackend>,
    ) -> Self {
        Self {
            scheduler: Arc::new(scheduler),
            clock,
            backend,
            stores: Arc::default(),
        }
    }

    pub fn scheduler(&self) -> &ReviewScheduler {
        &self.scheduler
    }

    /// Get the store of a student, loading it on first access.
    ///
    /// Concurrent first accesses of one student share a single load. A failed load
    /// is not cached; the next call tries again.
    pub async fn open(&self, student: &StudentId) -> Result<StoreHandle, StoreError> {
        let slot = self.slot(student);
        let handle = slot.get_or_try_init(|| self.load(student.clone())).await?;
        Ok(Arc::clone(handle))
    }

    /// Number of students loaded so far.
    pub fn loaded(&self) -> usize {
        self.stores
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|slot| slot.initialized())
            .count()
    }

    fn slot(&self, student: &StudentId) -> StoreSlot {
        let mut stores = self.stores.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(stores.entry(student.clone()).or_default())
    }

    async fn load(&self, student: StudentId) -> Result<StoreHandle, StoreError> {
        let scheduler = Arc::clone(&self.scheduler);
        let clock = Arc::clone(&self.clock);
        let backend = Arc::clone(&self.backend);
        let name = student.to_string();

        let store = tokio::task::spawn_blocking(move || {
            ProgressStore::open(student, scheduler, clock, backend)
        })
        .await
        .map_err(|source| PersistenceError::Load {
            student: name,
            source,
        })??;

        Ok(Arc::new(Mutex::new(store)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::models::QuizResult;
    use crate::persistence::{DocumentKind, MemoryBackend};
    use chrono::{TimeZone, Utc};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::mpsc;
    use std::time::Duration;

    fn registry<B: DocumentBackend + 'static>(backend: Arc<B>) -> StoreRegistry {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2025, 2, 3, 4, 5, 6).unwrap());
        StoreRegistry::new(ReviewScheduler::default(), Arc::new(clock), backend)
    }

    /// Backend whose reads for one student block until released.
    #[derive(Debug)]
    struct GatedBackend {
        inner: MemoryBackend,
        gated: StudentId,
        started: AtomicBool,
        release: std::sync::Mutex<mpsc::Receiver<()>>,
        reads: AtomicUsize,
    }

    impl GatedBackend {
        fn new(gated: &str) -> (Self, mpsc::Sender<()>) {
            let (tx, rx) = mpsc::channel();
            let backend = Self {
                inner: MemoryBackend::new(),
                gated: StudentId::parse(gated).unwrap(),
                started: AtomicBool::new(false),
                release: std::sync::Mutex::new(rx),
                reads: AtomicUsize::new(0),
            };
            (backend, tx)
        }
    }

    impl DocumentBackend for GatedBackend {
        fn location(&self, student: &StudentId, kind: DocumentKind) -> String {
            self.inner.location(student, kind)
        }

        fn read(
            &self,
            student: &StudentId,
            kind: DocumentKind,
        ) -> Result<Option<String>, PersistenceError> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            if *student == self.gated && kind == DocumentKind::Progress {
                self.started.store(true, Ordering::SeqCst);
                let _ = self.release.lock().unwrap().recv();
            }
            self.inner.read(student, kind)
        }

        fn write(
            &self,
            student: &StudentId,
            kind: DocumentKind,
            contents: &str,
        ) -> Result<(), PersistenceError> {
            self.inner.write(student, kind, contents)
        }
    }

    #[tokio::test]
    async fn test_open_returns_same_store() {
        let registry = registry(Arc::new(MemoryBackend::new()));
        let alice = StudentId::parse("alice").unwrap();

        let first = registry.open(&alice).await.unwrap();
        let second = registry.open(&alice).await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.loaded(), 1);
    }

    #[tokio::test]
    async fn test_students_are_isolated() {
        let registry = registry(Arc::new(MemoryBackend::new()));
        let alice = StudentId::parse("alice").unwrap();
        let bob = StudentId::parse("bob").unwrap();

        registry
            .open(&alice)
            .await
            .unwrap()
            .lock()
            .await
            .record_quiz_result(&QuizResult {
                topic: "Recursion".to_string(),
                score: 80.0,
                total_questions: 4,
                notes: String::new(),
            })
            .unwrap();

        let bob_store = registry.open(&bob).await.unwrap();
        assert!(bob_store.lock().await.progress().is_empty());
        assert_eq!(registry.loaded(), 2);
    }

    #[tokio::test]
    async fn test_failed_load_is_retried() {
        let backend = Arc::new(MemoryBackend::new());
        let registry = registry(backend.clone());
        let alice = StudentId::parse("alice").unwrap();
        backend
            .write(&alice, DocumentKind::Schedule, "not json")
            .unwrap();

        assert!(matches!(
            registry.open(&alice).await,
            Err(StoreError::Persistence(_))
        ));
        assert_eq!(registry.loaded(), 0);

        backend.write(&alice, DocumentKind::Schedule, "{}").unwrap();
        assert!(registry.open(&alice).await.is_ok());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_slow_load_does_not_block_other_students() {
        let (backend, release) = GatedBackend::new("slow");
        let backend = Arc::new(backend);
        let registry = registry(backend.clone());

        let slow = {
            let registry = registry.clone();
            tokio::spawn(async move {
                let slow = StudentId::parse("slow").unwrap();
                registry.open(&slow).await.map(|_| ())
            })
        };
        while !backend.started.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        let fast = StudentId::parse("fast").unwrap();
        let opened = tokio::time::timeout(Duration::from_secs(5), registry.open(&fast)).await;
        assert!(matches!(opened, Ok(Ok(_))));
        assert_eq!(registry.loaded(), 1);

        release.send(()).unwrap();
        slow.await.unwrap().unwrap();
        assert_eq!(registry.loaded(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_opens_share_one_load() {
        let (backend, release) = GatedBackend::new("alice");
        let backend = Arc::new(backend);
        let registry = registry(backend.clone());
        let alice = StudentId::parse("alice").unwrap();

        let first = {
            let registry = registry.clone();
            let alice = alice.clone();
            tokio::spawn(async move { registry.open(&alice).await })
        };
        while !backend.started.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        let second = {
            let registry = registry.clone();
            let alice = alice.clone();
            tokio::spawn(async move { registry.open(&alice).await })
        };

        release.send(()).unwrap();
        let first = first.await.unwrap().unwrap();
        let second = second.await.unwrap().unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        // One progress read and one schedule read.
        assert_eq!(backend.reads.load(Ordering::SeqCst), 2);
    }
}
