use thiserror::Error;

use pacsview_core::CoreError;

/// Errors surfaced by storage backends.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: String, id: String },

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StorageError {
    pub fn not_found(kind: impl Into<String>, id: impl ToString) -> Self {
        Self::NotFound {
            kind: kind.into(),
            id: id.to_string(),
        }
    }

    pub fn persistence(message: impl Into<String>) -> Self {
        Self::Persistence(message.into())
    }
}

impl From<StorageError> for CoreError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound { kind, id } => CoreError::NotFound { kind, id },
            StorageError::Persistence(message) => CoreError::Persistence(message),
            StorageError::Serialization(err) => CoreError::Persistence(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pacsview_core::ErrorCategory;

    #[test]
    fn test_not_found_maps_to_core_not_found() {
        let core: CoreError = StorageError::not_found("Series", 9).into();
        assert_eq!(core.category(), ErrorCategory::NotFound);
        assert!(core.is_client_error());
    }

    #[test]
    fn test_persistence_maps_to_core_persistence() {
        let core: CoreError = StorageError::persistence("disk full").into();
        assert_eq!(core.category(), ErrorCategory::Persistence);
    }
}
