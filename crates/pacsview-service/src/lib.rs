//! Application facade for the study browser.
//!
//! [`PacsviewService`] wires the repositories, the query compiler, the job
//! pipeline and the event bus behind one typed surface. Each method here is
//! one logical endpoint: search, entity fetch, preview, download, export,
//! clipboard mutation and project association. Errors cross this boundary
//! as [`pacsview_core::CoreError`]; [`PacsviewService::report_failure`]
//! handles anything the caller did not.

pub mod notify;
pub mod service;
pub mod types;

pub use notify::{OperatorNotifier, TracingNotifier};
pub use service::PacsviewService;
pub use types::{AssociateRequest, ClipboardCommand, DownloadRequest, PreviewFrame};
