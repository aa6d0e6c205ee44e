//! Clipboard export: bundle converted artifacts into one password
//! protected archive and track the artifact for later retrieval.

use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use dashmap::DashMap;
use tracing::info;
use zip::unstable::write::FileOptionsExt;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::JobError;

/// One file to be placed into the export archive.
#[derive(Debug, Clone)]
pub struct ExportEntry {
    /// Path of the entry inside the archive.
    pub archive_path: String,
    /// Converted artifact on disk.
    pub source: PathBuf,
}

/// The set of artifacts one export bundles, plus the clipboard text that
/// produced it.
#[derive(Debug, Clone, Default)]
pub struct ExportManifest {
    pub entries: Vec<ExportEntry>,
    /// Serialized clipboard contents, written into the archive as
    /// `manifest.txt` so the recipient can see what was exported.
    pub clipboard_text: String,
}

impl ExportManifest {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Writes one export archive. The archive is encrypted with the zip legacy
/// scheme, which is what common desktop unzip tools accept.
pub struct ExportJob {
    manifest: ExportManifest,
    password: String,
}

impl ExportJob {
    pub fn new(manifest: ExportManifest, password: impl Into<String>) -> Self {
        Self {
            manifest,
            password: password.into(),
        }
    }

    /// Write `<username>-<job_id>.zip` into `work_dir` and return its path.
    pub fn run(self, work_dir: &Path, username: &str, job_id: &str) -> Result<PathBuf, JobError> {
        let archive_path = work_dir.join(format!("{username}-{job_id}.zip"));
        let file = File::create(&archive_path)?;
        let mut writer = ZipWriter::new(file);
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .with_deprecated_encryption(self.password.as_bytes());

        writer.start_file("manifest.txt", options)?;
        writer.write_all(self.manifest.clipboard_text.as_bytes())?;

        for entry in &self.manifest.entries {
            writer.start_file(entry.archive_path.as_str(), options)?;
            let mut source = File::open(&entry.source)?;
            let mut buf = Vec::new();
            source.read_to_end(&mut buf)?;
            writer.write_all(&buf)?;
        }
        writer.finish()?;

        info!(path = %archive_path.display(), entries = self.manifest.entries.len(),
            "export archive written");
        Ok(archive_path)
    }
}

/// Lifecycle of one registered export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportState {
    Pending,
    Ready(PathBuf),
    Failed(String),
}

/// Tracks export artifacts per session. Retrieval is not consuming: the
/// same token can be fetched repeatedly until the session's entries are
/// dropped.
#[derive(Default)]
pub struct ExportRegistry {
    exports: DashMap<(String, String), ExportState>,
}

impl ExportRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_pending(&self, session: &str, token: &str) {
        self.exports
            .insert((session.to_string(), token.to_string()), ExportState::Pending);
    }

    pub fn mark_ready(&self, session: &str, token: &str, artifact: PathBuf) {
        self.exports.insert(
            (session.to_string(), token.to_string()),
            ExportState::Ready(artifact),
        );
    }

    pub fn mark_failed(&self, session: &str, token: &str, reason: impl Into<String>) {
        self.exports.insert(
            (session.to_string(), token.to_string()),
            ExportState::Failed(reason.into()),
        );
    }

    /// The artifact path if the export completed. Pending, failed, and
    /// unknown tokens all answer `None`; callers map that to not-found.
    pub fn get(&self, session: &str, token: &str) -> Option<PathBuf> {
        match self
            .exports
            .get(&(session.to_string(), token.to_string()))
            .map(|entry| entry.value().clone())
        {
            Some(ExportState::Ready(path)) => Some(path),
            _ => None,
        }
    }

    /// State of a token regardless of phase.
    pub fn state(&self, session: &str, token: &str) -> Option<ExportState> {
        self.exports
            .get(&(session.to_string(), token.to_string()))
            .map(|entry| entry.value().clone())
    }

    /// All tokens registered for a session, with their states.
    pub fn exports_for(&self, session: &str) -> Vec<(String, ExportState)> {
        self.exports
            .iter()
            .filter(|entry| entry.key().0 == session)
            .map(|entry| (entry.key().1.clone(), entry.value().clone()))
            .collect()
    }

    /// Drop every export registered for a session.
    pub fn clear_session(&self, session: &str) {
        self.exports.retain(|key, _| key.0 != session);
    }
}
