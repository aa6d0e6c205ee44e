//! Typed configuration for pacsview.
//!
//! Configuration is merged from an optional TOML file and `PACSVIEW_`-prefixed
//! environment variables, then validated before anything else starts.

use std::path::{Path, PathBuf};

use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Error types for configuration operations.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] config::ConfigError),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl ConfigError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

fn default_page_size() -> usize {
    20
}

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Fixed result page size for study search.
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Root directory under which every job creates its working directory.
    pub downloads_dir: PathBuf,

    /// Install directory of the external xmedcon converter. The binary is
    /// expected at `<xmedcon_dir>/bin/medcon` with its shared libraries in
    /// `<xmedcon_dir>/lib`.
    pub xmedcon_dir: Option<PathBuf>,

    /// Operator address for best-effort failure notifications. When unset,
    /// boundary failures are only logged.
    pub operator_notify: Option<String>,
}

impl AppConfig {
    /// Load configuration from a TOML file merged with `PACSVIEW_`-prefixed
    /// environment variables (environment wins).
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).format(FileFormat::Toml));
        }
        let settings = builder
            .add_source(Environment::with_prefix("PACSVIEW"))
            .build()?;

        let app: AppConfig = settings.try_deserialize()?;
        app.validate()?;
        debug!(
            page_size = app.page_size,
            downloads_dir = %app.downloads_dir.display(),
            "configuration loaded"
        );
        Ok(app)
    }

    /// Validate invariants that the type system cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            return Err(ConfigError::validation("page_size must be positive"));
        }
        if self.downloads_dir.as_os_str().is_empty() {
            return Err(ConfigError::validation("downloads_dir must be set"));
        }
        if let Some(dir) = &self.xmedcon_dir
            && dir.as_os_str().is_empty()
        {
            return Err(ConfigError::validation("xmedcon_dir must not be empty"));
        }
        Ok(())
    }

    /// Path to the external converter binary, when configured.
    pub fn medcon_bin(&self) -> Option<PathBuf> {
        self.xmedcon_dir.as_ref().map(|dir| dir.join("bin/medcon"))
    }

    /// Shared-library directory for the external converter, when configured.
    pub fn medcon_lib(&self) -> Option<PathBuf> {
        self.xmedcon_dir.as_ref().map(|dir| dir.join("lib"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_full_config() {
        let file = write_config(
            r#"
page_size = 50
downloads_dir = "/var/pacsview/downloads"
xmedcon_dir = "/opt/xmedcon"
operator_notify = "ops@example.org"
"#,
        );
        let config = AppConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.page_size, 50);
        assert_eq!(
            config.medcon_bin().unwrap(),
            PathBuf::from("/opt/xmedcon/bin/medcon")
        );
        assert_eq!(
            config.medcon_lib().unwrap(),
            PathBuf::from("/opt/xmedcon/lib")
        );
        assert_eq!(config.operator_notify.as_deref(), Some("ops@example.org"));
    }

    #[test]
    fn test_page_size_defaults() {
        let file = write_config(r#"downloads_dir = "/tmp/downloads""#);
        let config = AppConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.page_size, 20);
        assert!(config.xmedcon_dir.is_none());
        assert!(config.medcon_bin().is_none());
    }

    #[test]
    fn test_zero_page_size_rejected() {
        let file = write_config(
            r#"
page_size = 0
downloads_dir = "/tmp/downloads"
"#,
        );
        let err = AppConfig::load(Some(file.path())).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_missing_downloads_dir_rejected() {
        let file = write_config(r#"page_size = 10"#);
        assert!(AppConfig::load(Some(file.path())).is_err());
    }
}
