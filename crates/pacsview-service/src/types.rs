//! Request and response types of the service surface.

use serde::{Deserialize, Serialize};

use pacsview_core::ItemKind;
use pacsview_jobs::Format;

/// Clipboard mutation, dispatched exhaustively by a single handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum ClipboardCommand {
    Add { kind: ItemKind, id: i64 },
    Remove { kind: ItemKind, id: i64 },
    Clear,
}

/// One series download request.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DownloadRequest {
    pub series_pk: i64,
    #[serde(default)]
    pub format: Format,
}

/// Association request for one study. `new_project_name`, when non-blank,
/// takes precedence over `project_id`; both absent means disassociate.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssociateRequest {
    pub study_pk: i64,
    pub project_id: Option<i64>,
    #[serde(default)]
    pub participation_id: String,
    pub new_project_name: Option<String>,
}

impl AssociateRequest {
    /// The new project name, blank treated as absent.
    pub fn new_project_name(&self) -> Option<&str> {
        self.new_project_name
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// False when the request carries no project at all, which means the
    /// existing association (if any) is to be removed.
    pub fn wants_project(&self) -> bool {
        self.project_id.is_some() || self.new_project_name().is_some()
    }
}

/// Rendering metadata for one preview image of a series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviewFrame {
    /// Object identifier of the instance to render.
    pub sop_iuid: String,
    /// One-based frame index within that instance.
    pub frame: u32,
    /// Optional column-count resize hint, passed through untouched.
    pub columns: Option<u32>,
}
