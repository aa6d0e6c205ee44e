//! Asynchronous job pipeline: series format conversion and clipboard
//! export.
//!
//! Jobs run on the tokio worker pool via [`JobRunner`]. Each job owns a
//! freshly created, uniquely named working directory under the configured
//! downloads root for its whole lifetime; nothing else reads or writes it.
//! A download flow awaits its [`JobHandle`] synchronously; an export flow
//! submits and returns, with the artifact registered for later retrieval
//! by token.

pub mod convert;
pub mod error;
pub mod export;
pub mod runner;

pub use convert::{ConcatAssembler, ConversionJob, Format, MedconTool, SourceInstance,
    VolumeAssembler, preview_frame_index};
pub use error::JobError;
pub use export::{ExportEntry, ExportJob, ExportManifest, ExportRegistry, ExportState};
pub use runner::{JobHandle, JobRunner};
