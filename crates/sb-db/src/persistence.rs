//! Document persistence.
//!
//! Each student has two JSON documents:
//! ```text
//! {data_dir}/
//! ├── progress/
//! │   └── {student}_progress.json         # topic -> performance statistics
//! └── spaced_repetition/
//!     └── {student}_reviews.json          # topic -> review schedule
//! ```
//!
//! Backends move raw document text; (de)serialization and validation happen in
//! [`load_document`] and [`save_document`] so every backend behaves the same way.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::PersistenceError;
use crate::models::StudentId;

/// The two documents kept per student.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentKind {
    Progress,
    Schedule,
}

impl DocumentKind {
    const fn directory(self) -> &'static str {
        match self {
            Self::Progress => "progress",
            Self::Schedule => "spaced_repetition",
        }
    }

    const fn suffix(self) -> &'static str {
        match self {
            Self::Progress => "progress",
            Self::Schedule => "reviews",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Progress => write!(f, "progress"),
            Self::Schedule => write!(f, "schedule"),
        }
    }
}

/// Storage for raw document text.
pub trait DocumentBackend: Send + Sync + fmt::Debug {
    /// Human readable location of a document, used in errors and logs.
    fn location(&self, student: &StudentId, kind: DocumentKind) -> String;

    /// Read a document, `None` if it was never written.
    fn read(&self, student: &StudentId, kind: DocumentKind)
    -> Result<Option<String>, PersistenceError>;

    /// Replace a document.
    fn write(
        &self,
        student: &StudentId,
        kind: DocumentKind,
        contents: &str,
    ) -> Result<(), PersistenceError>;
}

/// Load and deserialize a document.
pub fn load_document<T>(
    backend: &dyn DocumentBackend,
    student: &StudentId,
    kind: DocumentKind,
) -> Result<Option<T>, PersistenceError>
where
    T: DeserializeOwned,
{
    let Some(contents) = backend.read(student, kind)? else {
        return Ok(None);
    };
    serde_json::from_str(&contents)
        .map(Some)
        .map_err(|source| PersistenceError::Json {
            location: backend.location(student, kind),
            source,
        })
}

/// Serialize and write a document.
pub fn save_document<T>(
    backend: &dyn DocumentBackend,
    student: &StudentId,
    kind: DocumentKind,
    document: &T,
) -> Result<(), PersistenceError>
where
    T: Serialize,
{
    let contents =
        serde_json::to_string_pretty(document).map_err(|source| PersistenceError::Json {
            location: backend.location(student, kind),
            source,
        })?;
    backend.write(student, kind, &contents)
}

/// Stores documents as pretty-printed JSON files under a data directory.
#[derive(Debug, Clone)]
pub struct JsonFileBackend {
    data_dir: PathBuf,
}

impl JsonFileBackend {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Get the path of a student's document
    pub fn path(&self, student: &StudentId, kind: DocumentKind) -> PathBuf {
        self.data_dir
            .join(kind.directory())
            .join(format!("{}_{}.json", student, kind.suffix()))
    }

    fn io_error(path: &Path, source: io::Error) -> PersistenceError {
        PersistenceError::Io {
            location: path.display().to_string(),
            source,
        }
    }
}

impl DocumentBackend for JsonFileBackend {
    fn location(&self, student: &StudentId, kind: DocumentKind) -> String {
        self.path(student, kind).display().to_string()
    }

    fn read(
        &self,
        student: &StudentId,
        kind: DocumentKind,
    ) -> Result<Option<String>, PersistenceError> {
        let path = self.path(student, kind);
        match fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Self::io_error(&path, e)),
        }
    }

    fn write(
        &self,
        student: &StudentId,
        kind: DocumentKind,
        contents: &str,
    ) -> Result<(), PersistenceError> {
        let path = self.path(student, kind);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| Self::io_error(parent, e))?;
        }

        // Write next to the target and rename so readers never see a partial file.
        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, contents).map_err(|e| Self::io_error(&tmp_path, e))?;
        fs::rename(&tmp_path, &path).map_err(|e| Self::io_error(&path, e))?;

        tracing::trace!(path = %path.display(), bytes = contents.len(), "Document written");
        Ok(())
    }
}

/// Keeps documents in memory only, for when file persistence is turned off.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    documents: Mutex<HashMap<(StudentId, DocumentKind), String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DocumentBackend for MemoryBackend {
    fn location(&self, student: &StudentId, kind: DocumentKind) -> String {
        format!("memory://{student}/{kind}")
    }

    fn read(
        &self,
        student: &StudentId,
        kind: DocumentKind,
    ) -> Result<Option<String>, PersistenceError> {
        let documents = self.documents.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(documents.get(&(student.clone(), kind)).cloned())
    }

    fn write(
        &self,
        student: &StudentId,
        kind: DocumentKind,
        contents: &str,
    ) -> Result<(), PersistenceError> {
        let mut documents = self.documents.lock().unwrap_or_else(PoisonError::into_inner);
        documents.insert((student.clone(), kind), contents.to_string());
        Ok(())
    }
}
