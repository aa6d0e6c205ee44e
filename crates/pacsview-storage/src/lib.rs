//! Repository abstraction layer for pacsview.
//!
//! The query compiler emits a [`pacsview_search::StudyQuery`]; repositories
//! consume it. Entities are plain data; persistence is behind these traits
//! (no active-record `save()` on entities anywhere).

pub mod error;
pub mod traits;
pub mod types;

pub use error::StorageError;
pub use traits::{AuditLog, PersonRepository, ProjectRepository, StudyRepository};
pub use types::StudyPage;
