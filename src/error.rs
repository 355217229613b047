use thiserror::Error;

/// Main error type for the mobility engine
#[derive(Error, Debug)]
pub enum MobilityError {
    /// Database errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Malformed trip CSV
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Negative ranking limit
    #[error("Invalid limit: {0} (must be zero or positive)")]
    InvalidLimit(i64),

    /// Malformed request parameter
    #[error("Invalid value '{value}' for parameter '{name}'")]
    InvalidParameter { name: String, value: String },

    /// Requested entity does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Store errors that are not plain SQL failures (poisoned lock, bad row data)
    #[error("Store error: {0}")]
    Store(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl MobilityError {
    /// Whether the error was caused by the caller's input
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            MobilityError::InvalidLimit(_) | MobilityError::InvalidParameter { .. }
        )
    }
}

impl From<String> for MobilityError {
    fn from(s: String) -> Self {
        MobilityError::Other(s)
    }
}

impl From<&str> for MobilityError {
    fn from(s: &str) -> Self {
        MobilityError::Other(s.to_string())
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, MobilityError>;
