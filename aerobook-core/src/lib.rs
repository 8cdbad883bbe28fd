pub mod search;
pub mod repository;

use aerobook_shared::CabinClass;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    ValidationError(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("No seats available in {class} class")]
    NoSeatsAvailable { class: CabinClass },
    #[error("Invalid state: {0}")]
    InvalidState(String),
    #[error("Storage error: {0}")]
    StorageError(String),
    #[error("Cache error: {0}")]
    CacheError(String),
    #[error("Collaborator unavailable: {0}")]
    Unavailable(String),
}

impl CoreError {
    /// Whether retrying the same call may succeed
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            CoreError::StorageError(_) | CoreError::CacheError(_) | CoreError::Unavailable(_)
        )
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
