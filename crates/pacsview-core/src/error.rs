use thiserror::Error;

/// Core error taxonomy shared by every pacsview crate.
///
/// Each variant maps to exactly one [`ErrorCategory`]; the request boundary
/// uses the category to decide how a failure is reported.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("{kind} not found: {id}")]
    NotFound { kind: String, id: String },

    #[error("Unsupported conversion: {format} for a series with {instances} instance(s)")]
    UnsupportedConversion { format: String, instances: usize },

    #[error("Conversion failed: {0}")]
    ConversionFailed(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl CoreError {
    /// Create a new Validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a new NotFound error.
    pub fn not_found(kind: impl Into<String>, id: impl ToString) -> Self {
        Self::NotFound {
            kind: kind.into(),
            id: id.to_string(),
        }
    }

    /// Create a new UnsupportedConversion error.
    pub fn unsupported_conversion(format: impl Into<String>, instances: usize) -> Self {
        Self::UnsupportedConversion {
            format: format.into(),
            instances,
        }
    }

    /// Create a new ConversionFailed error.
    pub fn conversion_failed(message: impl Into<String>) -> Self {
        Self::ConversionFailed(message.into())
    }

    /// Create a new Persistence error.
    pub fn persistence(message: impl Into<String>) -> Self {
        Self::Persistence(message.into())
    }

    /// Check if this error is the caller's fault (reported directly, no retry).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::NotFound { .. } | Self::UnsupportedConversion { .. }
        )
    }

    /// Get error category for logging/monitoring.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Validation(_) => ErrorCategory::Validation,
            Self::NotFound { .. } => ErrorCategory::NotFound,
            Self::UnsupportedConversion { .. } => ErrorCategory::UnsupportedConversion,
            Self::ConversionFailed(_) => ErrorCategory::ConversionFailed,
            Self::Persistence(_) | Self::JsonError(_) => ErrorCategory::Persistence,
        }
    }
}

/// Error categories for monitoring and classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    NotFound,
    UnsupportedConversion,
    ConversionFailed,
    Persistence,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation => write!(f, "validation"),
            Self::NotFound => write!(f, "not_found"),
            Self::UnsupportedConversion => write!(f, "unsupported_conversion"),
            Self::ConversionFailed => write!(f, "conversion_failed"),
            Self::Persistence => write!(f, "persistence"),
        }
    }
}

/// Convenience result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
