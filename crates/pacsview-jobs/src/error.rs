use thiserror::Error;

use pacsview_core::CoreError;

/// Job pipeline errors. Failures are terminal per request; nothing retries.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("Unsupported conversion: {format} for a series with {instances} instance(s)")]
    UnsupportedConversion { format: String, instances: usize },

    #[error("Conversion failed: {0}")]
    ConversionFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Archive error: {0}")]
    Zip(#[from] zip::result::ZipError),
}

impl JobError {
    pub fn unsupported(format: impl Into<String>, instances: usize) -> Self {
        Self::UnsupportedConversion {
            format: format.into(),
            instances,
        }
    }

    pub fn conversion_failed(message: impl Into<String>) -> Self {
        Self::ConversionFailed(message.into())
    }
}

impl From<JobError> for CoreError {
    fn from(err: JobError) -> Self {
        match err {
            JobError::UnsupportedConversion { format, instances } => {
                CoreError::UnsupportedConversion { format, instances }
            }
            JobError::ConversionFailed(message) => CoreError::ConversionFailed(message),
            JobError::Io(err) => CoreError::ConversionFailed(err.to_string()),
            JobError::Zip(err) => CoreError::ConversionFailed(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pacsview_core::ErrorCategory;

    #[test]
    fn test_unsupported_maps_to_client_error() {
        let core: CoreError = JobError::unsupported("nii", 1).into();
        assert!(core.is_client_error());
        assert_eq!(core.category(), ErrorCategory::UnsupportedConversion);
    }

    #[test]
    fn test_conversion_failed_maps_to_server_error() {
        let core: CoreError = JobError::conversion_failed("exit status 1").into();
        assert!(!core.is_client_error());
        assert_eq!(core.category(), ErrorCategory::ConversionFailed);
    }
}
