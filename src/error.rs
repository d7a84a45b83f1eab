use thiserror::Error;

#[derive(Error, Debug)]
pub enum TrellisError {
    #[error("Not a trellis data directory. Run 'trellis init' first.")]
    NotInitialized,

    #[error("Already initialized. Remove .trellis/ to reinitialize.")]
    AlreadyInitialized,

    #[error("Entity not found: {0}")]
    EntityNotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<rusqlite::Error> for TrellisError {
    fn from(e: rusqlite::Error) -> Self {
        TrellisError::Storage(format!("SQLite error: {}", e))
    }
}

pub type Result<T> = std::result::Result<T, TrellisError>;
