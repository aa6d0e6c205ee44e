//! Repository traits every storage backend must implement.
//!
//! Implementations must be thread-safe (`Send + Sync`). All reads are
//! lock-free from the caller's perspective; no trait method holds locks
//! across awaits.

use std::path::PathBuf;

use async_trait::async_trait;

use pacsview_core::{Instance, Patient, Person, Project, ProjectAssociation, Series, Study};
use pacsview_search::StudyQuery;

use crate::error::StorageError;
use crate::types::StudyPage;

/// Read access to the imaging archive (patients, studies, series,
/// instances). Search consumes the compiled query emitted by
/// `pacsview_search::compile`.
#[async_trait]
pub trait StudyRepository: Send + Sync {
    /// Executes a compiled study search: one page of studies plus the total
    /// matching count.
    async fn search_studies(&self, query: &StudyQuery) -> Result<StudyPage, StorageError>;

    /// Fetch one patient; `None` if absent.
    async fn patient(&self, pk: i64) -> Result<Option<Patient>, StorageError>;

    /// Fetch one study; `None` if absent.
    async fn study(&self, pk: i64) -> Result<Option<Study>, StorageError>;

    /// Fetch one series; `None` if absent.
    async fn series(&self, pk: i64) -> Result<Option<Series>, StorageError>;

    /// All studies of a patient.
    async fn studies_of(&self, patient_pk: i64) -> Result<Vec<Study>, StorageError>;

    /// All series of a study.
    async fn series_of(&self, study_pk: i64) -> Result<Vec<Series>, StorageError>;

    /// All instances of a series, ordered by instance number.
    async fn instances_of(&self, series_pk: i64) -> Result<Vec<Instance>, StorageError>;

    /// Resolve one instance's stored imaging object to a readable file in
    /// the archive.
    async fn instance_file(&self, instance: &Instance) -> Result<PathBuf, StorageError>;
}

/// Access to user records and their persisted clipboard.
#[async_trait]
pub trait PersonRepository: Send + Sync {
    async fn find_by_username(&self, username: &str) -> Result<Option<Person>, StorageError>;

    /// Overwrite the user's persisted clipboard string.
    ///
    /// Read-modify-write with no optimistic concurrency check: concurrent
    /// edits from two sessions are last-writer-wins.
    async fn save_clipboard(&self, username: &str, clipboard: &str) -> Result<(), StorageError>;
}

/// Access to projects and study-project associations.
#[async_trait]
pub trait ProjectRepository: Send + Sync {
    async fn find_project(&self, pk: i64) -> Result<Option<Project>, StorageError>;

    /// Create a new project owned by `owner_pk`.
    async fn create_project(&self, name: &str, owner_pk: i64) -> Result<Project, StorageError>;

    /// The association for (study, project owner), if any. The reconciler
    /// guarantees at most one exists.
    async fn find_association(
        &self,
        study_pk: i64,
        owner_pk: i64,
    ) -> Result<Option<ProjectAssociation>, StorageError>;

    /// Insert (pk == 0) or update an association.
    async fn save_association(
        &self,
        association: ProjectAssociation,
    ) -> Result<ProjectAssociation, StorageError>;

    async fn delete_association(&self, pk: i64) -> Result<(), StorageError>;
}

/// Persistent audit trail of downloads and exports.
#[async_trait]
pub trait AuditLog: Send + Sync {
    /// Record that `actor` performed `action`. Timestamped by the backend.
    async fn record(&self, actor: &str, action: &str) -> Result<(), StorageError>;
}
