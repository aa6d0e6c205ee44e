//! Series format conversion.
//!
//! Converts one series into one requested output format inside the job's
//! working directory. Multi-instance series requesting the raw capture
//! format go through the normalized interchange format first and then
//! through the external medcon converter.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::{debug, info, warn};

use pacsview_core::{Instance, Series};

use crate::error::JobError;

/// Requested output format.
///
/// `Dcm` is the raw capture format the viewer stores natively; `Nii` is the
/// normalized interchange format produced for portable consumption.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    #[default]
    Dcm,
    Nii,
}

impl Format {
    pub fn extension(self) -> &'static str {
        match self {
            Format::Dcm => "dcm",
            Format::Nii => "nii",
        }
    }
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.extension())
    }
}

/// Location of the external xmedcon converter.
#[derive(Debug, Clone)]
pub struct MedconTool {
    /// `<install>/bin/medcon`.
    pub bin: PathBuf,
    /// `<install>/lib`, exported as `LD_LIBRARY_PATH` for the subprocess.
    pub lib_dir: PathBuf,
}

/// Builds the normalized interchange volume out of a series' instance
/// objects. Decoding the imaging objects themselves is outside this crate;
/// implementations own that concern.
pub trait VolumeAssembler: Send + Sync {
    fn assemble(&self, sources: &[PathBuf], dest: &Path) -> Result<(), JobError>;
}

/// Default assembler: stacks the instance objects in instance order into
/// one interchange container.
pub struct ConcatAssembler;

impl VolumeAssembler for ConcatAssembler {
    fn assemble(&self, sources: &[PathBuf], dest: &Path) -> Result<(), JobError> {
        let mut out = std::fs::File::create(dest)?;
        for source in sources {
            let mut input = std::fs::File::open(source)?;
            std::io::copy(&mut input, &mut out)?;
        }
        Ok(())
    }
}

/// One instance of the series plus its resolved archive file.
#[derive(Debug, Clone)]
pub struct SourceInstance {
    pub instance: Instance,
    pub path: PathBuf,
}

/// Representative frame index for single-frame preview paths. Not used for
/// exported artifacts.
pub fn preview_frame_index(num_frames: u32, echo: u32) -> u32 {
    num_frames / 2 + echo + 1
}

/// Converts one series into one output file in `work_dir`.
pub struct ConversionJob {
    series: Series,
    instances: Vec<SourceInstance>,
    format: Format,
    work_dir: PathBuf,
    medcon: Option<MedconTool>,
    assembler: Box<dyn VolumeAssembler>,
}

impl ConversionJob {
    pub fn new(
        series: Series,
        instances: Vec<SourceInstance>,
        format: Format,
        work_dir: PathBuf,
        medcon: Option<MedconTool>,
    ) -> Self {
        Self {
            series,
            instances,
            format,
            work_dir,
            medcon,
            assembler: Box::new(ConcatAssembler),
        }
    }

    /// Replace the interchange assembler (tests inject a fixture writer).
    pub fn with_assembler(mut self, assembler: Box<dyn VolumeAssembler>) -> Self {
        self.assembler = assembler;
        self
    }

    /// File stem shared by every artifact of this series.
    fn download_name(&self) -> String {
        let protocol: String = self
            .series
            .protocol
            .chars()
            .map(|c| if c.is_alphanumeric() { c } else { '_' })
            .collect();
        if protocol.is_empty() {
            format!("series_{}", self.series.pk)
        } else {
            format!("{protocol}_{}", self.series.pk)
        }
    }

    /// Run the conversion. Returns the produced artifact path.
    pub async fn run(self) -> Result<PathBuf, JobError> {
        let count = self.instances.len();
        debug!(series = self.series.pk, format = %self.format, count, "conversion starting");

        match (count, self.format) {
            (0, format) => Err(JobError::unsupported(format.extension(), 0)),

            // A single-instance series is available directly in either
            // format without transformation.
            (1, format) => {
                let dest = self.artifact_path(format);
                tokio::fs::copy(&self.instances[0].path, &dest).await?;
                Ok(dest)
            }

            (_, Format::Nii) => {
                let dest = self.artifact_path(Format::Nii);
                self.assemble(&dest)?;
                Ok(dest)
            }

            (_, Format::Dcm) => {
                let interchange = self.artifact_path(Format::Nii);
                self.assemble(&interchange)?;
                let dest = self.artifact_path(Format::Dcm);
                self.run_medcon(&interchange, &dest).await?;
                Ok(dest)
            }
        }
    }

    fn artifact_path(&self, format: Format) -> PathBuf {
        self.work_dir
            .join(format!("{}.{}", self.download_name(), format.extension()))
    }

    fn assemble(&self, dest: &Path) -> Result<(), JobError> {
        let sources: Vec<PathBuf> = self.instances.iter().map(|s| s.path.clone()).collect();
        self.assembler.assemble(&sources, dest)
    }

    /// Invoke the external converter and block this job until it exits.
    /// Nonzero exit fails the job and removes any partial output.
    async fn run_medcon(&self, input: &Path, output: &Path) -> Result<(), JobError> {
        let Some(medcon) = &self.medcon else {
            return Err(JobError::conversion_failed(
                "external converter is not configured",
            ));
        };

        info!(series = self.series.pk, tool = %medcon.bin.display(), "invoking external converter");
        let status = Command::new(&medcon.bin)
            .arg("-c")
            .arg("dicom")
            .arg("-noprefix")
            .arg("-anon")
            .arg("-fv")
            .arg("-o")
            .arg(output)
            .arg("-f")
            .arg(input)
            .env("LD_LIBRARY_PATH", &medcon.lib_dir)
            .status()
            .await
            .map_err(|err| JobError::conversion_failed(format!("failed to spawn medcon: {err}")))?;

        if !status.success() {
            // Never expose a partial output file.
            if output.exists() {
                if let Err(err) = std::fs::remove_file(output) {
                    warn!(path = %output.display(), error = %err, "could not remove partial output");
                }
            }
            return Err(JobError::conversion_failed(format!(
                "medcon exited with {status}"
            )));
        }
        if !output.exists() {
            return Err(JobError::conversion_failed(
                "medcon reported success but produced no output",
            ));
        }
        Ok(())
    }
}
